// Geometric and stochastic thresholds for one composition.
//
// `ConstraintPolicy` is plain data: the interpreter reads it and never
// writes it, so recursive frames only share state through the allocator
// and the rng. The predicates here (`guard`, `is_narrow`, `admits`) are the
// only logic, and they are pure.
//
// Named presets mirror the generator's evolution:
// - `classic()`: thin fixed black dividers, no size caps, no damping.
// - `balanced()`: wider jittered dividers plus narrow-split damping.
// - `boogie_woogie()`: segmented colored dividers, every fill capped at
//   1/12 of the page with aspect at most 1.5, checked at fill time.
//
// See also: `subdivide.rs` (the only consumer), `compose.rs` for how the
// policy travels inside `CompositionConfig`.

use crate::error::{ComposeError, Result};
use crate::geometry::Rect;
use serde::{Deserialize, Serialize};

/// How a divider's line region is rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineRenderMode {
    /// One bar primitive in the palette's line color.
    SolidBar,
    /// A row or column of short segments, each colored independently from
    /// the secondary palette or falling back to neutral.
    SegmentedGrid,
}

/// Where the `max_dimension` / `max_aspect_ratio` checks apply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardScope {
    /// On entry to every node, before its symbol is read. An oversize or
    /// misshapen rectangle becomes one neutral fill and is not subdivided.
    #[default]
    Entry,
    /// Only where a terminal fill would be emitted. Splits proceed on
    /// oversize rectangles; an oversize or misshapen `F` becomes neutral.
    Fill,
}

/// Why a rectangle failed the guard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Violation {
    /// A side below `min_size`; nothing is emitted.
    Undersized,
    /// A side above `max_dimension`.
    Oversized,
    /// Aspect ratio above `max_aspect_ratio`.
    Misshapen,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstraintPolicy {
    /// Smallest side any fill may have.
    pub min_size: f64,
    /// Largest side any fill may have, if capped.
    #[serde(default)]
    pub max_dimension: Option<f64>,
    /// Largest `max(w/h, h/w)` any fill may have, if capped.
    #[serde(default)]
    pub max_aspect_ratio: Option<f64>,
    #[serde(default)]
    pub guard_scope: GuardScope,
    /// Inclusive `(low, high)` range divider widths are drawn from.
    pub line_width_range: (f64, f64),
    /// Discrete set split ratios are drawn from uniformly.
    pub split_ratios: Vec<f64>,
    /// A split is narrow when `min(r, 1 - r) * extent` falls below this.
    /// Zero disables damping.
    pub narrow_split_threshold: f64,
    /// Maximum resamples of a narrow ratio.
    pub retry_budget: u32,
    /// Chance that a narrow ratio is resampled at all.
    pub retry_probability: f64,
    pub line_mode: LineRenderMode,
    /// Target divider segment length in `SegmentedGrid` mode, capped at
    /// `max_dimension`.
    pub segment_length: f64,
    /// Chance a segment takes the neutral color instead of a secondary one.
    pub segment_neutral_probability: f64,
}

impl ConstraintPolicy {
    pub fn classic() -> Self {
        Self {
            min_size: 0.005,
            max_dimension: None,
            max_aspect_ratio: None,
            guard_scope: GuardScope::Entry,
            line_width_range: (0.005, 0.005),
            split_ratios: vec![0.33, 0.4, 0.5, 0.6, 0.67],
            narrow_split_threshold: 0.0,
            retry_budget: 0,
            retry_probability: 0.0,
            line_mode: LineRenderMode::SolidBar,
            segment_length: 0.005,
            segment_neutral_probability: 0.0,
        }
    }

    pub fn balanced() -> Self {
        Self {
            min_size: 0.005,
            max_dimension: None,
            max_aspect_ratio: None,
            guard_scope: GuardScope::Entry,
            line_width_range: (0.018, 0.022),
            split_ratios: vec![0.25, 0.33, 0.4, 0.6, 0.67, 0.75],
            narrow_split_threshold: 0.2,
            retry_budget: 5,
            retry_probability: 0.9,
            line_mode: LineRenderMode::SolidBar,
            segment_length: 0.02,
            segment_neutral_probability: 0.0,
        }
    }

    pub fn boogie_woogie() -> Self {
        Self {
            min_size: 0.005,
            max_dimension: Some(1.0 / 12.0),
            max_aspect_ratio: Some(1.5),
            guard_scope: GuardScope::Fill,
            line_width_range: (0.008, 0.012),
            split_ratios: vec![0.25, 0.33, 0.4, 0.6, 0.67, 0.75],
            narrow_split_threshold: 0.0,
            retry_budget: 0,
            retry_probability: 0.0,
            line_mode: LineRenderMode::SegmentedGrid,
            segment_length: 0.010,
            segment_neutral_probability: 0.15,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(ComposeError::InvalidPolicy(msg));

        if !(self.min_size.is_finite() && self.min_size > 0.0) {
            return invalid(format!("min_size must be positive, got {}", self.min_size));
        }
        let (low, high) = self.line_width_range;
        if !(low.is_finite() && high.is_finite()) || low < 0.0 || low > high {
            return invalid(format!("line_width_range ({low}, {high}) is empty"));
        }
        if self.split_ratios.is_empty() {
            return invalid("split_ratios is empty".into());
        }
        if let Some(&bad) = self
            .split_ratios
            .iter()
            .find(|r| !(r.is_finite() && **r > 0.0 && **r < 1.0))
        {
            return invalid(format!("split ratio {bad} is outside (0, 1)"));
        }
        if !(self.narrow_split_threshold.is_finite() && self.narrow_split_threshold >= 0.0) {
            return invalid(format!(
                "narrow_split_threshold must be non-negative, got {}",
                self.narrow_split_threshold
            ));
        }
        for (name, p) in [
            ("retry_probability", self.retry_probability),
            ("segment_neutral_probability", self.segment_neutral_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return invalid(format!("{name} must be within [0, 1], got {p}"));
            }
        }
        if let Some(max) = self
            .max_dimension
            .filter(|m| !(m.is_finite() && *m >= self.min_size))
        {
            return invalid(format!(
                "max_dimension must be at least min_size {}, got {max}",
                self.min_size
            ));
        }
        // Written as a negation so NaN is rejected too.
        if let Some(max) = self.max_aspect_ratio.filter(|m| !(*m >= 1.0)) {
            return invalid(format!("max_aspect_ratio must be at least 1, got {max}"));
        }
        // Bounds the segment count per divider.
        if !(self.segment_length.is_finite() && self.segment_length >= self.min_size) {
            return invalid(format!(
                "segment_length must be at least min_size {}, got {}",
                self.min_size, self.segment_length
            ));
        }
        Ok(())
    }

    /// Entry guard for a node. Under `GuardScope::Fill` only the min-size
    /// check applies here; the caps are checked by `fill_violation`.
    pub fn guard(&self, rect: &Rect) -> Option<Violation> {
        match self.guard_scope {
            GuardScope::Entry => self.violation(rect),
            GuardScope::Fill => self.undersized(rect).then_some(Violation::Undersized),
        }
    }

    /// Cap check for a rectangle about to receive an allocated fill. Only
    /// reports anything under `GuardScope::Fill`; under `Entry` the node
    /// already passed the full guard.
    pub fn fill_violation(&self, rect: &Rect) -> Option<Violation> {
        match self.guard_scope {
            GuardScope::Entry => None,
            GuardScope::Fill => self.violation(rect),
        }
    }

    /// Whether `rect` satisfies every bound (used for divider segments).
    pub fn admits(&self, rect: &Rect) -> bool {
        self.violation(rect).is_none()
    }

    /// Whether `rect` satisfies `max_dimension` and `max_aspect_ratio`
    /// (used for solid divider bars, whose width may sit below `min_size`).
    pub fn within_caps(&self, rect: &Rect) -> bool {
        self.cap_violation(rect).is_none()
    }

    fn violation(&self, rect: &Rect) -> Option<Violation> {
        if self.undersized(rect) {
            return Some(Violation::Undersized);
        }
        self.cap_violation(rect)
    }

    fn cap_violation(&self, rect: &Rect) -> Option<Violation> {
        if self
            .max_dimension
            .is_some_and(|max| rect.w > max || rect.h > max)
        {
            return Some(Violation::Oversized);
        }
        if self
            .max_aspect_ratio
            .is_some_and(|max| rect.aspect_ratio() > max)
        {
            return Some(Violation::Misshapen);
        }
        None
    }

    fn undersized(&self, rect: &Rect) -> bool {
        rect.w < self.min_size || rect.h < self.min_size
    }

    /// Whether cutting `extent` at `ratio` leaves a share below
    /// `narrow_split_threshold`.
    pub fn is_narrow(&self, ratio: f64, extent: f64) -> bool {
        ratio.min(1.0 - ratio) * extent < self.narrow_split_threshold
    }

    /// Segment length actually used for `SegmentedGrid` dividers.
    pub fn effective_segment_length(&self) -> f64 {
        match self.max_dimension {
            Some(max) => self.segment_length.min(max),
            None => self.segment_length,
        }
    }
}

impl Default for ConstraintPolicy {
    fn default() -> Self {
        Self::balanced()
    }
}
