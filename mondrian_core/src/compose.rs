// Composition pipeline and its configuration.
//
// `CompositionConfig` bundles everything one composition needs: the grammar
// and its expansion parameters, the constraint policy, the palette and the
// root rectangle. It round-trips through JSON so a CLI or renderer can load
// or dump it; the core itself never touches the filesystem.
//
// `compose` runs the whole pipeline against a caller-owned rng:
//
// 1. Validate the config (grammar weights, length range, policy, palette).
// 2. Expand the grammar, re-rolling while the string length falls outside
//    `length_range`, up to `max_rerolls` extra attempts. When the budget is
//    spent the last string is used anyway.
// 3. Build a fresh `ColorAllocator` (this is where `required_pick` draws).
// 4. Interpret the string inside `root`.
//
// Named presets follow the generator's historical profiles; see
// `policy.rs` and `palette.rs` for their per-part values.
//
// **Critical constraint: determinism.** A config and an rng seed fully
// determine the returned `Composition`, including `rerolls` and the
// unplaced required colors.

use crate::error::{ComposeError, Result};
use crate::geometry::{Primitive, PrimitiveKind, Rect};
use crate::grammar::Grammar;
use crate::palette::{ColorAllocator, ColorToken, Palette};
use crate::policy::{ConstraintPolicy, LineRenderMode};
use crate::subdivide::Interpreter;
use crate::symbol::tokenize;
use mondrian_prng::MondrianRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Grammar plus how to expand it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrammarConfig {
    #[serde(flatten)]
    pub grammar: Grammar,
    pub iterations: u32,
    /// Inclusive `(min, max)` accepted string length, in characters.
    pub length_range: (usize, usize),
    /// Extra expansions allowed when a string falls outside `length_range`.
    pub max_rerolls: u32,
}

impl GrammarConfig {
    pub fn validate(&self) -> Result<()> {
        self.grammar.validate()?;
        let (min, max) = self.length_range;
        if min > max {
            return Err(ComposeError::InvalidGrammar(format!(
                "length_range ({min}, {max}) is empty"
            )));
        }
        Ok(())
    }

    pub fn accepts(&self, length: usize) -> bool {
        let (min, max) = self.length_range;
        (min..=max).contains(&length)
    }

    /// Expand until the length is accepted or the re-roll budget runs out.
    /// Returns the string and how many re-rolls were spent.
    pub fn generate(&self, rng: &mut MondrianRng) -> (String, u32) {
        let mut symbols = self.grammar.expand(self.iterations, rng);
        let mut rerolls = 0;
        while !self.accepts(symbols.chars().count()) && rerolls < self.max_rerolls {
            rerolls += 1;
            symbols = self.grammar.expand(self.iterations, rng);
        }
        if !self.accepts(symbols.chars().count()) {
            warn!(
                length = symbols.chars().count(),
                min = self.length_range.0,
                max = self.length_range.1,
                rerolls,
                "re-roll budget exhausted, using last expansion"
            );
        }
        (symbols, rerolls)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompositionConfig {
    pub grammar: GrammarConfig,
    pub policy: ConstraintPolicy,
    pub palette: Palette,
    #[serde(default = "unit_root")]
    pub root: Rect,
}

fn unit_root() -> Rect {
    Rect::UNIT
}

impl CompositionConfig {
    pub const PRESETS: &'static [&'static str] = &["classic", "balanced", "boogie_woogie"];

    /// Thin black grid over a deep tree, no re-rolls.
    pub fn classic() -> Self {
        Self {
            grammar: GrammarConfig {
                grammar: Grammar::mondrian(),
                iterations: 5,
                length_range: (1, usize::MAX),
                max_rerolls: 0,
            },
            policy: ConstraintPolicy::classic(),
            palette: Palette::classic(),
            root: Rect::UNIT,
        }
    }

    /// Shallow tree, damped narrow splits, two guaranteed primaries.
    /// Rejects the bare-fill string.
    pub fn balanced() -> Self {
        Self {
            grammar: GrammarConfig {
                grammar: Grammar::mondrian_shallow(),
                iterations: 3,
                length_range: (2, usize::MAX),
                max_rerolls: 100,
            },
            policy: ConstraintPolicy::balanced(),
            palette: Palette::balanced(),
            root: Rect::UNIT,
        }
    }

    /// Deep tree bounded to 10..=1000 symbols, small capped cells and
    /// segmented colored dividers.
    pub fn boogie_woogie() -> Self {
        Self {
            grammar: GrammarConfig {
                grammar: Grammar::mondrian(),
                iterations: 8,
                length_range: (10, 1000),
                max_rerolls: 100,
            },
            policy: ConstraintPolicy::boogie_woogie(),
            palette: Palette::boogie_woogie(),
            root: Rect::UNIT,
        }
    }

    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "classic" => Some(Self::classic()),
            "balanced" => Some(Self::balanced()),
            "boogie_woogie" => Some(Self::boogie_woogie()),
            _ => None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.grammar.validate()?;
        self.policy.validate()?;
        self.palette.validate()?;
        let draws_secondary = self.policy.line_mode == LineRenderMode::SegmentedGrid
            && self.policy.segment_neutral_probability < 1.0;
        if draws_secondary && !self.palette.has_secondary() {
            return Err(ComposeError::EmptyPalette("secondary palette"));
        }
        Ok(())
    }
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self::balanced()
    }
}

/// Primitive counts by kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub fills: usize,
    pub neutral: usize,
    pub lines: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    /// The expanded grammar string that was interpreted.
    pub symbols: String,
    pub rerolls: u32,
    pub primitives: Vec<Primitive>,
    /// Required colors that never found a fill.
    pub unplaced_required: Vec<ColorToken>,
}

impl Composition {
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for primitive in &self.primitives {
            match primitive.kind {
                PrimitiveKind::Fill => summary.fills += 1,
                PrimitiveKind::Neutral => summary.neutral += 1,
                PrimitiveKind::Line => summary.lines += 1,
            }
        }
        summary
    }

    pub fn total_area(&self) -> f64 {
        self.primitives.iter().map(|p| p.rect.area()).sum()
    }
}

/// Generate one composition.
pub fn compose(config: &CompositionConfig, rng: &mut MondrianRng) -> Result<Composition> {
    config.validate()?;
    let interpreter = Interpreter::new(&config.policy)?;

    let (symbols, rerolls) = config.grammar.generate(rng);
    let tokens = tokenize(&symbols);
    debug!(length = tokens.len(), rerolls, "grammar expanded");

    let mut allocator = ColorAllocator::new(&config.palette, rng)?;
    let subdivision = interpreter.subdivide(&tokens, 0, config.root, &mut allocator, rng);
    if subdivision.next_cursor < tokens.len() {
        debug!(
            consumed = subdivision.next_cursor,
            length = tokens.len(),
            "trailing symbols ignored"
        );
    }

    let composition = Composition {
        symbols,
        rerolls,
        primitives: subdivision.primitives,
        unplaced_required: allocator.into_unplaced(),
    };
    let summary = composition.summary();
    debug!(
        fills = summary.fills,
        neutral = summary.neutral,
        lines = summary.lines,
        unplaced = composition.unplaced_required.len(),
        "composition complete"
    );
    Ok(composition)
}
