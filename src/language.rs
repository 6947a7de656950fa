//! # Query Language Definition
//!
//! One table of every construct the constrained query language supports.
//! The grammar compiler derives its productions from these lists and the
//! verifier derives its whitelists from the same lists, so extending the
//! language is a single edit here.
//!
//! | Item | Grammar use | Verifier use |
//! |------|-------------|--------------|
//! | [`AggregateFunction`] | `agg_item` alternatives | select/order whitelist |
//! | [`ScalarFunction`] | time window and duration terminals | WHERE whitelist |
//! | [`ClauseKind`] | statement skeleton order | normalized SQL clause order |
//! | [`IntervalUnit`] | `interval_unit` | `INTERVAL n <unit>` check |
//! | [`DurationUnit`] | `duration_unit` | `dateDiff('<unit>', ..)` check |
//! | [`Comparator`] | duration `comparator` | comparison whitelist |
//! | [`FORBIDDEN_KEYWORDS`] | never emitted | statement and token denylist |
//!
//! Function names follow ClickHouse spelling (`count()`, `dateDiff`) and are
//! matched case-insensitively by the verifier; the normalizer emits the
//! canonical spelling returned by `name()`.

use crate::sql::Keyword;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    pub const ALL: [AggregateFunction; 5] = [
        AggregateFunction::Count,
        AggregateFunction::Sum,
        AggregateFunction::Avg,
        AggregateFunction::Min,
        AggregateFunction::Max,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|agg| agg.name().eq_ignore_ascii_case(name))
    }

    /// Whether the aggregate requires a metric column argument.
    /// `count` takes no argument in the grammar.
    pub fn takes_metric(&self) -> bool {
        !matches!(self, AggregateFunction::Count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarFunction {
    Now,
    Today,
    DateDiff,
}

impl ScalarFunction {
    pub const ALL: [ScalarFunction; 3] = [
        ScalarFunction::Now,
        ScalarFunction::Today,
        ScalarFunction::DateDiff,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScalarFunction::Now => "now",
            ScalarFunction::Today => "today",
            ScalarFunction::DateDiff => "dateDiff",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|func| func.name().eq_ignore_ascii_case(name))
    }
}

/// Clauses of the supported statement, in the order they must appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClauseKind {
    Select,
    From,
    Where,
    GroupBy,
    OrderBy,
    Limit,
}

impl ClauseKind {
    pub const ALL: [ClauseKind; 6] = [
        ClauseKind::Select,
        ClauseKind::From,
        ClauseKind::Where,
        ClauseKind::GroupBy,
        ClauseKind::OrderBy,
        ClauseKind::Limit,
    ];

    pub fn keyword(&self) -> &'static str {
        match self {
            ClauseKind::Select => "SELECT",
            ClauseKind::From => "FROM",
            ClauseKind::Where => "WHERE",
            ClauseKind::GroupBy => "GROUP BY",
            ClauseKind::OrderBy => "ORDER BY",
            ClauseKind::Limit => "LIMIT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntervalUnit {
    Hour,
    Day,
}

impl IntervalUnit {
    pub const ALL: [IntervalUnit; 2] = [IntervalUnit::Hour, IntervalUnit::Day];

    pub fn keyword(&self) -> &'static str {
        match self {
            IntervalUnit::Hour => "HOUR",
            IntervalUnit::Day => "DAY",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|unit| unit.keyword().eq_ignore_ascii_case(name))
    }
}

/// Units accepted as the first `dateDiff` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationUnit {
    Minute,
    Hour,
    Day,
}

impl DurationUnit {
    pub const ALL: [DurationUnit; 3] = [DurationUnit::Minute, DurationUnit::Hour, DurationUnit::Day];

    pub fn name(&self) -> &'static str {
        match self {
            DurationUnit::Minute => "minute",
            DurationUnit::Hour => "hour",
            DurationUnit::Day => "day",
        }
    }

    /// Exact match: the unit is a string literal and ClickHouse is
    /// case-sensitive about it.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|unit| unit.name() == name)
    }
}

/// Comparison operators of the duration predicate. Equality predicates use
/// `=` and are not listed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    GtEq,
    Gt,
    LtEq,
    Lt,
}

impl Comparator {
    pub const ALL: [Comparator; 4] = [Comparator::GtEq, Comparator::Gt, Comparator::LtEq, Comparator::Lt];

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::GtEq => ">=",
            Comparator::Gt => ">",
            Comparator::LtEq => "<=",
            Comparator::Lt => "<",
        }
    }
}

/// Statement keywords that may never appear in a query, leading or not.
pub const FORBIDDEN_KEYWORDS: [Keyword; 21] = [
    Keyword::Insert,
    Keyword::Update,
    Keyword::Delete,
    Keyword::Drop,
    Keyword::Create,
    Keyword::Alter,
    Keyword::Truncate,
    Keyword::Grant,
    Keyword::Revoke,
    Keyword::Attach,
    Keyword::Detach,
    Keyword::Rename,
    Keyword::Optimize,
    Keyword::Kill,
    Keyword::System,
    Keyword::Admin,
    Keyword::Set,
    Keyword::Use,
    Keyword::Exchange,
    Keyword::Into,
    Keyword::Outfile,
];

pub fn is_forbidden(keyword: Keyword) -> bool {
    FORBIDDEN_KEYWORDS.contains(&keyword)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_lookup_is_case_insensitive() {
        assert_eq!(AggregateFunction::from_name("SUM"), Some(AggregateFunction::Sum));
        assert_eq!(AggregateFunction::from_name("Count"), Some(AggregateFunction::Count));
        assert_eq!(AggregateFunction::from_name("median"), None);
    }

    #[test]
    fn only_count_takes_no_metric() {
        let without: Vec<_> = AggregateFunction::ALL
            .iter()
            .filter(|agg| !agg.takes_metric())
            .collect();
        assert_eq!(without, vec![&AggregateFunction::Count]);
    }

    #[test]
    fn scalar_canonical_spelling() {
        assert_eq!(ScalarFunction::from_name("DATEDIFF"), Some(ScalarFunction::DateDiff));
        assert_eq!(ScalarFunction::DateDiff.name(), "dateDiff");
    }

    #[test]
    fn clause_order_is_sorted() {
        let mut sorted = ClauseKind::ALL;
        sorted.sort();
        assert_eq!(sorted, ClauseKind::ALL);
    }

    #[test]
    fn duration_unit_is_case_sensitive() {
        assert_eq!(DurationUnit::from_name("minute"), Some(DurationUnit::Minute));
        assert_eq!(DurationUnit::from_name("MINUTE"), None);
    }

    #[test]
    fn forbidden_keywords_exclude_query_keywords() {
        assert!(is_forbidden(Keyword::Drop));
        assert!(is_forbidden(Keyword::Into));
        assert!(!is_forbidden(Keyword::Select));
        assert!(!is_forbidden(Keyword::With));
    }
}
