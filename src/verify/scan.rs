//! Token-level screening that runs before parsing.
//!
//! Both checks work on lexer tokens, so comments, string literals and
//! quoted identifiers can never trigger or hide a keyword:
//!
//! ```text
//! "/* hi */ drop table trips"          → FORBIDDEN_STATEMENT (DROP)
//! "SELECT count() FROM trips; DROP .." → FORBIDDEN_TOKEN (DROP)
//! "SELECT count() FROM trips -- DROP"  → clean
//! "... WHERE note = 'DROP'"            → clean
//! ```

use super::{Violation, ViolationCode};
use crate::language::is_forbidden;
use crate::sql::{Keyword, Lexer, Token};

pub(super) fn scan(sql: &str) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut lexer = Lexer::new(sql);

    match lexer.next_token() {
        Token::Eof => {
            violations.push(Violation::new(ViolationCode::SyntaxError, "query is empty"));
            return violations;
        }
        Token::Keyword(Keyword::Select) => {}
        Token::Error(message) => {
            violations.push(Violation::at(ViolationCode::SyntaxError, message, lexer.span()));
        }
        other => {
            violations.push(Violation::at(
                ViolationCode::ForbiddenStatement,
                format!("only SELECT statements are allowed, found {}", other),
                lexer.span(),
            ));
        }
    }

    loop {
        let before = lexer.position();
        match lexer.next_token() {
            Token::Eof => break,
            Token::Keyword(keyword) if is_forbidden(keyword) => {
                violations.push(Violation::at(
                    ViolationCode::ForbiddenToken,
                    format!("forbidden keyword {}", keyword),
                    lexer.span(),
                ));
            }
            _ => {}
        }
        if lexer.position() == before {
            break;
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(sql: &str) -> Vec<ViolationCode> {
        scan(sql).into_iter().map(|v| v.code).collect()
    }

    #[test]
    fn clean_select_has_no_findings() {
        assert!(scan("SELECT count() FROM trips").is_empty());
        assert!(scan("  select count() from trips").is_empty());
    }

    #[test]
    fn leading_statement_keyword_is_forbidden_statement() {
        assert_eq!(codes("DROP TABLE trips"), vec![ViolationCode::ForbiddenStatement]);
        assert_eq!(codes("insert INTO trips VALUES (1)").len(), 2);
        assert_eq!(codes("WITH x AS (SELECT 1) SELECT * FROM x"), vec![ViolationCode::ForbiddenStatement]);
    }

    #[test]
    fn leading_comments_do_not_hide_statement() {
        let violations = scan("/* note */ -- another\n  DeLeTe FROM trips");
        assert_eq!(violations[0].code, ViolationCode::ForbiddenStatement);
        assert!(violations[0].message.contains("DELETE"));
    }

    #[test]
    fn stacked_statement_is_forbidden_token_with_span() {
        let sql = "SELECT count() FROM trips; DROP TABLE trips";
        let violations = scan(sql);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, ViolationCode::ForbiddenToken);
        assert!(violations[0].message.contains("DROP"));
        let (start, end) = violations[0].span.unwrap();
        assert_eq!(&sql[start..end], "DROP");
    }

    #[test]
    fn keywords_inside_strings_and_comments_are_ignored() {
        assert!(scan("SELECT count() FROM trips WHERE note = 'DROP TABLE'").is_empty());
        assert!(scan("SELECT count() FROM trips -- DROP TABLE trips").is_empty());
        assert!(scan("SELECT count() FROM trips /* TRUNCATE */").is_empty());
    }

    #[test]
    fn empty_input_is_syntax_error() {
        assert_eq!(codes(""), vec![ViolationCode::SyntaxError]);
        assert_eq!(codes("  -- just a comment"), vec![ViolationCode::SyntaxError]);
    }

    #[test]
    fn into_outfile_is_caught() {
        assert_eq!(
            codes("SELECT count() FROM trips INTO OUTFILE 'x.csv'"),
            vec![ViolationCode::ForbiddenToken, ViolationCode::ForbiddenToken]
        );
    }
}
