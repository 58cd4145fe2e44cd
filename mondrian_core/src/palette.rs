// Color tokens, palettes and the per-composition allocator.
//
// Color tokens are opaque strings: the core compares and copies them but
// never interprets them. A `Palette` is configuration (weighted fill
// colors, a required list, a secondary list for divider segments, plus the
// neutral and line tokens). A `ColorAllocator` is the mutable state built
// from a palette for exactly one composition: it owns the pending required
// tokens, which shrink as fills are placed and never grow back.
//
// Weighted sampling goes through `MondrianRng::weighted_index`, so a palette
// written as a repetition list (`["white", "white", "red"]`) and the same
// palette written with explicit weights (`white: 2, red: 1`) draw the same
// distribution. `Palette::from_repeated` converts the former into the latter.

use crate::error::{ComposeError, Result};
use mondrian_prng::MondrianRng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Opaque color identifier handed through to renderers.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorToken(pub String);

impl ColorToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ColorToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightedColor {
    pub color: ColorToken,
    pub weight: f64,
}

impl WeightedColor {
    pub fn new(color: impl Into<ColorToken>, weight: f64) -> Self {
        Self {
            color: color.into(),
            weight,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    /// Fill colors sampled once the required list is used up.
    pub weighted: Vec<WeightedColor>,
    /// Colors each placed at most once, ahead of weighted sampling.
    #[serde(default)]
    pub required: Vec<ColorToken>,
    /// When set, only this many of `required` (picked with the rng at
    /// composition start) are actually required.
    #[serde(default)]
    pub required_pick: Option<usize>,
    /// Divider segment colors for `SegmentedGrid`.
    #[serde(default)]
    pub secondary: Vec<WeightedColor>,
    /// Forced-fill color for guard terminations and neutral segments.
    pub neutral: ColorToken,
    /// Solid divider bar color.
    pub line: ColorToken,
}

impl Palette {
    /// Tally a list with repeats into weights, keeping first-seen order.
    pub fn from_repeated<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Vec<WeightedColor> {
        let mut tally: Vec<WeightedColor> = Vec::new();
        for token in tokens {
            match tally.iter_mut().find(|w| w.color.as_str() == token) {
                Some(entry) => entry.weight += 1.0,
                None => tally.push(WeightedColor::new(token, 1.0)),
            }
        }
        tally
    }

    /// Primaries on a mostly white field with thin black dividers.
    pub fn classic() -> Self {
        let mut tokens = vec!["white"; 10];
        for _ in 0..4 {
            tokens.extend(["red", "yellow", "blue"]);
        }
        Self {
            weighted: Self::from_repeated(tokens),
            required: vec![],
            required_pick: None,
            secondary: vec![],
            neutral: "white".into(),
            line: "black".into(),
        }
    }

    /// Mostly neutral fills, two of the three primaries guaranteed.
    pub fn balanced() -> Self {
        let mut tokens = vec!["white"; 60];
        for _ in 0..4 {
            tokens.extend(["red", "yellow", "blue"]);
        }
        tokens.extend(["lightgray"; 20]);
        Self {
            weighted: Self::from_repeated(tokens),
            required: vec!["red".into(), "yellow".into(), "blue".into()],
            required_pick: Some(2),
            secondary: vec![],
            neutral: "white".into(),
            line: "black".into(),
        }
    }

    /// Gold and silver accents, four-color segmented dividers.
    pub fn boogie_woogie() -> Self {
        let mut tokens = vec!["white"; 50];
        for _ in 0..2 {
            tokens.extend(["red", "#FFD700", "blue"]);
        }
        tokens.extend(["#C0C0C0"; 15]);
        Self {
            weighted: Self::from_repeated(tokens),
            required: vec!["red".into(), "#FFD700".into(), "blue".into()],
            required_pick: Some(2),
            secondary: Self::from_repeated(["red", "#FFD700", "blue", "#C0C0C0"]),
            neutral: "white".into(),
            line: "black".into(),
        }
    }

    /// Check that the weighted list can be sampled and that the other
    /// lists are well formed. The secondary list is only required to be
    /// non-empty by callers that will draw from it.
    pub fn validate(&self) -> Result<()> {
        for (list, entries) in [("weighted", &self.weighted), ("secondary", &self.secondary)] {
            if let Some(bad) = entries
                .iter()
                .find(|w| !w.weight.is_finite() || w.weight < 0.0)
            {
                return Err(ComposeError::InvalidPalette(format!(
                    "{list} color {} has weight {}",
                    bad.color, bad.weight
                )));
            }
        }
        if total_weight(&self.weighted) <= 0.0 {
            return Err(ComposeError::EmptyPalette("weighted palette"));
        }
        if let Some(pick) = self.required_pick.filter(|&k| k > self.required.len()) {
            return Err(ComposeError::InvalidPalette(format!(
                "required_pick {pick} exceeds {} required colors",
                self.required.len()
            )));
        }
        Ok(())
    }

    pub fn has_secondary(&self) -> bool {
        total_weight(&self.secondary) > 0.0
    }
}

fn total_weight(entries: &[WeightedColor]) -> f64 {
    entries.iter().map(|w| w.weight).filter(|w| *w > 0.0).sum()
}

/// Per-composition color source.
///
/// Created once before the traversal starts and passed by `&mut` through
/// it; the interpreter is its only writer.
#[derive(Clone, Debug)]
pub struct ColorAllocator {
    pending: VecDeque<ColorToken>,
    weighted: Vec<ColorToken>,
    weights: Vec<f64>,
    secondary: Vec<ColorToken>,
    secondary_weights: Vec<f64>,
    neutral: ColorToken,
    line: ColorToken,
}

impl ColorAllocator {
    /// Validate `palette` and resolve its required list. With
    /// `required_pick = Some(k)` the `k` required colors are chosen here,
    /// consuming rng draws; otherwise no draws are made.
    pub fn new(palette: &Palette, rng: &mut MondrianRng) -> Result<Self> {
        palette.validate()?;

        let pending: VecDeque<ColorToken> = match palette.required_pick {
            Some(k) => rng
                .sample_indices(palette.required.len(), k)
                .into_iter()
                .map(|i| palette.required[i].clone())
                .collect(),
            None => palette.required.iter().cloned().collect(),
        };

        let (weighted, weights) = unzip(&palette.weighted);
        let (secondary, secondary_weights) = unzip(&palette.secondary);
        Ok(Self {
            pending,
            weighted,
            weights,
            secondary,
            secondary_weights,
            neutral: palette.neutral.clone(),
            line: palette.line.clone(),
        })
    }

    /// Next fill color: the oldest pending required color if any remain,
    /// otherwise a weighted draw. Taking a required color makes no draw.
    pub fn draw(&mut self, rng: &mut MondrianRng) -> ColorToken {
        if let Some(required) = self.pending.pop_front() {
            return required;
        }
        match rng.weighted_index(&self.weights) {
            Some(i) => self.weighted[i].clone(),
            // Only reachable if the palette changed after validation.
            None => self.neutral.clone(),
        }
    }

    /// Divider segment color from the secondary list, or neutral when the
    /// list has nothing to draw.
    pub fn draw_secondary(&self, rng: &mut MondrianRng) -> ColorToken {
        match rng.weighted_index(&self.secondary_weights) {
            Some(i) => self.secondary[i].clone(),
            None => self.neutral.clone(),
        }
    }

    pub fn neutral(&self) -> &ColorToken {
        &self.neutral
    }

    pub fn line(&self) -> &ColorToken {
        &self.line
    }

    /// Required colors not yet placed.
    pub fn pending_required(&self) -> impl Iterator<Item = &ColorToken> {
        self.pending.iter()
    }

    /// Consume the allocator, returning the required colors never placed.
    pub fn into_unplaced(self) -> Vec<ColorToken> {
        self.pending.into()
    }
}

fn unzip(entries: &[WeightedColor]) -> (Vec<ColorToken>, Vec<f64>) {
    entries.iter().map(|w| (w.color.clone(), w.weight)).unzip()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_palette() -> Palette {
        Palette {
            weighted: vec![WeightedColor::new("white", 3.0), WeightedColor::new("gray", 1.0)],
            required: vec!["red".into(), "blue".into()],
            required_pick: None,
            secondary: vec![],
            neutral: "white".into(),
            line: "black".into(),
        }
    }

    #[test]
    fn from_repeated_tallies_in_order() {
        let tally = Palette::from_repeated(["white", "red", "white", "blue", "white"]);
        assert_eq!(
            tally,
            vec![
                WeightedColor::new("white", 3.0),
                WeightedColor::new("red", 1.0),
                WeightedColor::new("blue", 1.0),
            ]
        );
    }

    #[test]
    fn required_colors_come_first_then_weighted() {
        let mut rng = MondrianRng::new(7);
        let mut allocator = ColorAllocator::new(&plain_palette(), &mut rng).unwrap();
        assert_eq!(allocator.draw(&mut rng).as_str(), "red");
        assert_eq!(allocator.draw(&mut rng).as_str(), "blue");
        assert_eq!(allocator.pending_required().count(), 0);
        for _ in 0..50 {
            let color = allocator.draw(&mut rng);
            assert!(color.as_str() == "white" || color.as_str() == "gray");
        }
        assert!(allocator.into_unplaced().is_empty());
    }

    #[test]
    fn required_draws_do_not_touch_rng() {
        let mut rng = MondrianRng::new(11);
        let mut allocator = ColorAllocator::new(&plain_palette(), &mut rng).unwrap();
        let before = rng.clone();
        allocator.draw(&mut rng);
        assert_eq!(rng, before);
    }

    #[test]
    fn required_pick_selects_distinct_subset() {
        for seed in 0..50 {
            let mut rng = MondrianRng::new(seed);
            let palette = Palette::balanced();
            let allocator = ColorAllocator::new(&palette, &mut rng).unwrap();
            let mut picked: Vec<String> = allocator
                .into_unplaced()
                .into_iter()
                .map(|c| c.0)
                .collect();
            assert_eq!(picked.len(), 2);
            picked.sort();
            picked.dedup();
            assert_eq!(picked.len(), 2);
            assert!(picked.iter().all(|c| ["red", "yellow", "blue"].contains(&c.as_str())));
        }
    }

    #[test]
    fn empty_weighted_palette_is_rejected() {
        let palette = Palette {
            weighted: vec![WeightedColor::new("white", 0.0)],
            ..plain_palette()
        };
        let mut rng = MondrianRng::new(0);
        assert!(matches!(
            ColorAllocator::new(&palette, &mut rng),
            Err(ComposeError::EmptyPalette(_))
        ));
    }

    #[test]
    fn negative_weight_and_oversized_pick_are_rejected() {
        let negative = Palette {
            weighted: vec![WeightedColor::new("white", -1.0)],
            ..plain_palette()
        };
        assert!(matches!(
            negative.validate(),
            Err(ComposeError::InvalidPalette(_))
        ));
        let pick = Palette {
            required_pick: Some(3),
            ..plain_palette()
        };
        assert!(matches!(pick.validate(), Err(ComposeError::InvalidPalette(_))));
    }

    #[test]
    fn secondary_falls_back_to_neutral_when_empty() {
        let mut rng = MondrianRng::new(4);
        let allocator = ColorAllocator::new(&plain_palette(), &mut rng).unwrap();
        assert_eq!(allocator.draw_secondary(&mut rng).as_str(), "white");

        let boogie = ColorAllocator::new(&Palette::boogie_woogie(), &mut rng).unwrap();
        let color = boogie.draw_secondary(&mut rng);
        assert!(["red", "#FFD700", "blue", "#C0C0C0"].contains(&color.as_str()));
    }

    #[test]
    fn presets_validate() {
        for palette in [Palette::classic(), Palette::balanced(), Palette::boogie_woogie()] {
            assert!(palette.validate().is_ok());
        }
        assert!(Palette::boogie_woogie().has_secondary());
        assert!(!Palette::classic().has_secondary());
    }

    #[test]
    fn color_token_serializes_as_plain_string() {
        let json = serde_json::to_string(&ColorToken::new("#FFD700")).unwrap();
        assert_eq!(json, "\"#FFD700\"");
    }
}
