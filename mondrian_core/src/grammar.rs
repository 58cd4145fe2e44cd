// Stochastic rewriting grammar (the "L-system" half of the pipeline).
//
// A `Grammar` maps nonterminal characters to weighted alternatives. Each
// expansion round rewrites every character of the current string in
// parallel: nonterminals with usable rules are replaced by one alternative
// drawn in proportion to its weight, everything else is copied through.
// Replacements produced in round `n` are only rewritten in round `n + 1`.
//
// The rule table is a `BTreeMap` so that serialization order, validation
// order and therefore error messages are stable.
//
// **Critical constraint: determinism.** Same axiom, rules, iteration count
// and rng state give the same string. The only randomness is one
// `weighted_index` draw per rewritten nonterminal.

use crate::error::{ComposeError, Result};
use mondrian_prng::MondrianRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One weighted alternative for a nonterminal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Production {
    pub weight: f64,
    pub replacement: String,
}

impl Production {
    pub fn new(weight: f64, replacement: impl Into<String>) -> Self {
        Self {
            weight,
            replacement: replacement.into(),
        }
    }
}

pub type RuleTable = BTreeMap<char, Vec<Production>>;

/// Axiom plus rule table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grammar {
    pub axiom: String,
    pub rules: RuleTable,
}

impl Grammar {
    pub fn new(axiom: impl Into<String>, rules: RuleTable) -> Self {
        Self {
            axiom: axiom.into(),
            rules,
        }
    }

    /// The early Mondrian seed grammar: split horizontally, split
    /// vertically, or stop with a fill.
    ///
    /// `S -> 0.40 H[S][S] | 0.40 V[S][S] | 0.20 F`
    pub fn mondrian() -> Self {
        Self::seed_grammar(0.40, 0.40, 0.20)
    }

    /// A shallower variant with a higher stopping weight.
    ///
    /// `S -> 0.35 H[S][S] | 0.35 V[S][S] | 0.30 F`
    pub fn mondrian_shallow() -> Self {
        Self::seed_grammar(0.35, 0.35, 0.30)
    }

    fn seed_grammar(horizontal: f64, vertical: f64, fill: f64) -> Self {
        let mut rules = RuleTable::new();
        rules.insert(
            'S',
            vec![
                Production::new(horizontal, "H[S][S]"),
                Production::new(vertical, "V[S][S]"),
                Production::new(fill, "F"),
            ],
        );
        Self::new("S", rules)
    }

    /// Reject weights that cannot be sampled. A nonterminal whose weights
    /// are all zero is allowed; it simply never rewrites.
    pub fn validate(&self) -> Result<()> {
        if self.axiom.is_empty() {
            return Err(ComposeError::InvalidGrammar("axiom is empty".into()));
        }
        for (symbol, productions) in &self.rules {
            for production in productions {
                if !production.weight.is_finite() || production.weight < 0.0 {
                    return Err(ComposeError::InvalidGrammar(format!(
                        "rule '{symbol}' -> \"{}\" has weight {}",
                        production.replacement, production.weight
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn expand(&self, iterations: u32, rng: &mut MondrianRng) -> String {
        expand(&self.axiom, &self.rules, iterations, rng)
    }
}

/// Rewrite `axiom` for `iterations` rounds.
pub fn expand(axiom: &str, rules: &RuleTable, iterations: u32, rng: &mut MondrianRng) -> String {
    // Weights are looked up once rather than per character.
    let weights: BTreeMap<char, Vec<f64>> = rules
        .iter()
        .map(|(&symbol, productions)| (symbol, productions.iter().map(|p| p.weight).collect()))
        .collect();

    let mut current = axiom.to_string();
    for _ in 0..iterations {
        let mut next = String::with_capacity(current.len() * 2);
        for c in current.chars() {
            let chosen = rules.get(&c).and_then(|productions| {
                rng.weighted_index(&weights[&c])
                    .map(|index| productions[index].replacement.as_str())
            });
            match chosen {
                Some(replacement) => next.push_str(replacement),
                None => next.push(c),
            }
        }
        current = next;
    }
    current
}
