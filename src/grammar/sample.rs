//! # Bounded Random Derivation
//!
//! Draws sentences from a compiled grammar. Used by the CLI `.sample`
//! command, the determinism evals and the soundness tests, which check
//! that everything the grammar derives is accepted by the verifier.
//!
//! ## Algorithm
//!
//! Each rule has a minimum derivation height: the fewest nested rule
//! expansions needed to reach terminals.
//!
//! ```text
//! height(literal)     = 0
//! height(alternative) = 1 + max(height(symbol) for symbol in alternative)
//! height(rule)        = min(height(alternative))
//! ```
//!
//! Heights are computed once per artifact by fixpoint iteration. Expansion
//! picks uniformly among alternatives that fit the remaining depth budget
//! and falls back to the shallowest alternative when none fit, so every
//! draw terminates even with a budget of zero.

use super::{GrammarArtifact, Production, Rule, Symbol};
use hashbrown::HashMap;
use rand::seq::SliceRandom;
use rand::Rng;

const UNREACHABLE: usize = usize::MAX;

pub(super) fn min_heights(rules: &[Rule], index: &HashMap<String, usize>) -> Vec<usize> {
    let mut heights = vec![UNREACHABLE; rules.len()];
    let mut changed = true;
    while changed {
        changed = false;
        for (position, rule) in rules.iter().enumerate() {
            let best = rule
                .alternatives
                .iter()
                .map(|alt| alternative_height(alt, &heights, index))
                .min()
                .unwrap_or(UNREACHABLE);
            if best < heights[position] {
                heights[position] = best;
                changed = true;
            }
        }
    }
    heights
}

fn alternative_height(alt: &Production, heights: &[usize], index: &HashMap<String, usize>) -> usize {
    let mut deepest = 0;
    for symbol in alt {
        if let Symbol::Rule(name) = symbol {
            match index.get(name.as_str()) {
                Some(&position) if heights[position] != UNREACHABLE => {
                    deepest = deepest.max(heights[position]);
                }
                _ => return UNREACHABLE,
            }
        }
    }
    deepest + 1
}

impl GrammarArtifact {
    /// Derives one random sentence from the start symbol, preferring
    /// derivations no deeper than `max_depth`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, max_depth: usize) -> String {
        let mut out = String::new();
        if let Some(start) = self.rule_index(&self.start_symbol) {
            self.expand(start, max_depth, rng, &mut out);
        }
        out
    }

    fn expand<R: Rng + ?Sized>(&self, position: usize, budget: usize, rng: &mut R, out: &mut String) {
        let rule = &self.rules[position];
        let heights: Vec<usize> = rule
            .alternatives
            .iter()
            .map(|alt| alternative_height(alt, &self.min_heights, &self.index))
            .collect();

        let fitting: Vec<usize> = (0..rule.alternatives.len())
            .filter(|&i| heights[i] <= budget)
            .collect();
        let chosen = match fitting.choose(rng) {
            Some(&i) => i,
            None => match (0..heights.len()).min_by_key(|&i| heights[i]) {
                Some(i) => i,
                None => return,
            },
        };

        for symbol in &rule.alternatives[chosen] {
            match symbol {
                Symbol::Literal(text) => out.push_str(text),
                Symbol::Rule(name) => {
                    if let Some(child) = self.rule_index(name) {
                        self.expand(child, budget.saturating_sub(1), rng, out);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::grammar::compile;
    use crate::schema::TableSchema;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn heights_of_leaf_rules() {
        let grammar = compile(&TableSchema::trips().unwrap()).unwrap();
        let height = |name: &str| grammar.min_heights[grammar.rule_index(name).unwrap()];
        assert_eq!(height("digit"), 1);
        assert_eq!(height("positive_int"), 2);
        assert_eq!(height("limit_clause"), 1);
        assert!(height("start") > height("aggregate_query"));
    }

    #[test]
    fn samples_start_with_select_and_name_the_table() {
        let grammar = compile(&TableSchema::trips().unwrap()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let sentence = grammar.sample(&mut rng, 12);
            assert!(sentence.starts_with("SELECT "), "{sentence}");
            assert!(sentence.contains(" FROM trips"), "{sentence}");
        }
    }

    #[test]
    fn zero_budget_still_terminates() {
        let grammar = compile(&TableSchema::trips().unwrap()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let sentence = grammar.sample(&mut rng, 0);
        assert!(sentence.starts_with("SELECT "));
    }

    #[test]
    fn same_seed_same_sentence() {
        let grammar = compile(&TableSchema::trips().unwrap()).unwrap();
        let a = grammar.sample(&mut StdRng::seed_from_u64(42), 12);
        let b = grammar.sample(&mut StdRng::seed_from_u64(42), 12);
        assert_eq!(a, b);
    }
}
