// Subdivision interpreter: symbol string + root rectangle -> primitives.
//
// Reads the tokenized grammar string left to right with a single cursor and
// carves the current rectangle accordingly:
//
// - `F` fills the rectangle with an allocated color.
// - `H` / `V` draw a divider of random width at a (damped) random ratio,
//   render the divider, then descend into up to two `[...]` child groups:
//   the first for the low side, the second for the high side.
// - `]`, a stray `[`, and any other character are skipped one at a time.
//
// Before a node's symbol is read, the policy's entry guard may terminate it
// degenerately: undersized rectangles emit nothing, oversize or misshapen
// ones (under `GuardScope::Entry`) emit a single neutral fill. Either way
// the node's whole subtree is skipped so the parent resumes at its own
// closing bracket.
//
// Descent uses an explicit frame stack; nesting depth is bounded by memory,
// not by the call stack. Frames are pushed in reverse so output stays
// pre-order: a node's divider precedes its first child's primitives, which
// precede its second child's.
//
// Malformed strings are never an error. A missing `]` is tolerated and an
// unmatched `[` runs to the end of input. Trailing symbols are left for the
// caller; `next_cursor` reports where reading stopped.
//
// **Critical constraint: determinism.** Draw order per split is fixed:
// line width, split ratio, retry gate and resamples, then segment colors.
// Changing that order changes every composition for a given seed.

use crate::error::Result;
use crate::geometry::{Axis, Primitive, PrimitiveKind, Rect};
use crate::palette::{ColorAllocator, ColorToken};
use crate::policy::{ConstraintPolicy, LineRenderMode, Violation};
use crate::symbol::{Symbol, skip_node};
use mondrian_prng::MondrianRng;
use tracing::trace;

/// Interpreter output.
#[derive(Clone, Debug, PartialEq)]
pub struct Subdivision {
    /// Position just past the last symbol consumed.
    pub next_cursor: usize,
    /// Primitives in pre-order.
    pub primitives: Vec<Primitive>,
}

/// Pending work on the frame stack.
#[derive(Clone, Copy, Debug)]
enum Frame {
    /// Interpret the node at the cursor inside this rectangle.
    Node(Rect),
    /// Child slot: descend into this rectangle if the cursor is at `[`.
    Child(Rect),
    /// Consume a `]` if the cursor is at one.
    Close,
}

struct Walk<'s> {
    symbols: &'s [Symbol],
    cursor: usize,
    stack: Vec<Frame>,
    primitives: Vec<Primitive>,
}

impl Walk<'_> {
    fn peek(&self) -> Option<Symbol> {
        self.symbols.get(self.cursor).copied()
    }

    fn emit(&mut self, rect: Rect, color: ColorToken, kind: PrimitiveKind) {
        self.primitives.push(Primitive::new(rect, color, kind));
    }
}

/// Interpreter bound to one validated policy.
#[derive(Clone, Copy, Debug)]
pub struct Interpreter<'p> {
    policy: &'p ConstraintPolicy,
}

impl<'p> Interpreter<'p> {
    pub fn new(policy: &'p ConstraintPolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self { policy })
    }

    /// Interpret the node starting at `cursor` inside `rect`.
    pub fn subdivide(
        &self,
        symbols: &[Symbol],
        cursor: usize,
        rect: Rect,
        allocator: &mut ColorAllocator,
        rng: &mut MondrianRng,
    ) -> Subdivision {
        let mut walk = Walk {
            symbols,
            cursor,
            stack: vec![Frame::Node(rect)],
            primitives: Vec::new(),
        };

        while let Some(frame) = walk.stack.pop() {
            match frame {
                Frame::Node(rect) => self.visit(&mut walk, rect, allocator, rng),
                Frame::Child(rect) => {
                    if walk.peek() == Some(Symbol::Open) {
                        walk.cursor += 1;
                        walk.stack.push(Frame::Close);
                        walk.stack.push(Frame::Node(rect));
                    }
                }
                Frame::Close => {
                    if walk.peek() == Some(Symbol::Close) {
                        walk.cursor += 1;
                    }
                }
            }
        }

        Subdivision {
            next_cursor: walk.cursor,
            primitives: walk.primitives,
        }
    }

    fn visit(
        &self,
        walk: &mut Walk<'_>,
        rect: Rect,
        allocator: &mut ColorAllocator,
        rng: &mut MondrianRng,
    ) {
        if let Some(violation) = self.policy.guard(&rect) {
            walk.cursor = skip_node(walk.symbols, walk.cursor);
            trace!(?violation, next_cursor = walk.cursor, "degenerate termination");
            if violation != Violation::Undersized {
                walk.emit(rect, allocator.neutral().clone(), PrimitiveKind::Neutral);
            }
            return;
        }

        let Some(symbol) = walk.peek() else {
            return;
        };
        match symbol {
            Symbol::Fill => {
                walk.cursor += 1;
                self.fill(walk, rect, allocator, rng);
            }
            Symbol::Split(axis) => self.split(walk, rect, axis, allocator, rng),
            Symbol::Open | Symbol::Close | Symbol::Other(_) => {
                trace!(symbol = %symbol.as_char(), cursor = walk.cursor, "stray symbol skipped");
                walk.cursor += 1;
            }
        }
    }

    /// Allocated fill, or neutral when a fill-scope cap rejects `rect`.
    fn fill(
        &self,
        walk: &mut Walk<'_>,
        rect: Rect,
        allocator: &mut ColorAllocator,
        rng: &mut MondrianRng,
    ) {
        match self.policy.fill_violation(&rect) {
            Some(violation) => {
                trace!(?violation, "fill forced neutral");
                walk.emit(rect, allocator.neutral().clone(), PrimitiveKind::Neutral);
            }
            None => {
                let color = allocator.draw(rng);
                walk.emit(rect, color, PrimitiveKind::Fill);
            }
        }
    }

    fn split(
        &self,
        walk: &mut Walk<'_>,
        rect: Rect,
        axis: Axis,
        allocator: &mut ColorAllocator,
        rng: &mut MondrianRng,
    ) {
        let min_size = self.policy.min_size;
        let (low, high) = self.policy.line_width_range;
        let line_width = rng.range_f64(low, high);
        let extent = rect.extent(axis);

        // No ratio can leave both children at least `min_size`.
        if extent < 2.0 * min_size + line_width {
            self.degrade(walk, rect, allocator, rng);
            return;
        }

        let ratio = self.choose_ratio(extent, rng);
        let (first, line, second) = rect.split(axis, ratio, line_width);
        if first.extent(axis) < min_size || second.extent(axis) < min_size {
            self.degrade(walk, rect, allocator, rng);
            return;
        }

        walk.cursor += 1;
        self.render_line(walk, line, axis, allocator, rng);
        walk.stack.push(Frame::Child(second));
        walk.stack.push(Frame::Child(first));
    }

    /// Replace a split that cannot fit with a fill of the whole rectangle,
    /// skipping the split's children.
    fn degrade(
        &self,
        walk: &mut Walk<'_>,
        rect: Rect,
        allocator: &mut ColorAllocator,
        rng: &mut MondrianRng,
    ) {
        walk.cursor = skip_node(walk.symbols, walk.cursor);
        trace!(w = rect.w, h = rect.h, "split degraded to fill");
        self.fill(walk, rect, allocator, rng);
    }

    /// Draw a ratio, resampling narrow ones up to `retry_budget` times when
    /// the retry gate passes. A ratio still narrow after the budget is kept.
    fn choose_ratio(&self, extent: f64, rng: &mut MondrianRng) -> f64 {
        let ratios = &self.policy.split_ratios;
        let mut ratio = ratios[rng.range_usize(0, ratios.len())];

        if self.policy.is_narrow(ratio, extent) && rng.random_bool(self.policy.retry_probability)
        {
            let mut attempts = 0;
            while attempts < self.policy.retry_budget && self.policy.is_narrow(ratio, extent) {
                ratio = ratios[rng.range_usize(0, ratios.len())];
                attempts += 1;
            }
        }
        ratio
    }

    fn render_line(
        &self,
        walk: &mut Walk<'_>,
        line: Rect,
        axis: Axis,
        allocator: &mut ColorAllocator,
        rng: &mut MondrianRng,
    ) {
        match self.policy.line_mode {
            LineRenderMode::SolidBar => {
                if self.policy.within_caps(&line) {
                    walk.emit(line, allocator.line().clone(), PrimitiveKind::Line);
                } else {
                    trace!(w = line.w, h = line.h, "divider bar forced neutral");
                    walk.emit(line, allocator.neutral().clone(), PrimitiveKind::Neutral);
                }
            }
            LineRenderMode::SegmentedGrid => {
                let count = (line.span(axis) / self.policy.effective_segment_length()).floor();
                for segment in line.segments(axis, count as usize) {
                    let colored = self.policy.admits(&segment)
                        && !rng.random_bool(self.policy.segment_neutral_probability);
                    if colored {
                        let color = allocator.draw_secondary(rng);
                        walk.emit(segment, color, PrimitiveKind::Line);
                    } else {
                        walk.emit(segment, allocator.neutral().clone(), PrimitiveKind::Neutral);
                    }
                }
            }
        }
    }
}

/// Validate `policy`, then interpret the node at `cursor` inside `rect`.
pub fn subdivide(
    symbols: &[Symbol],
    cursor: usize,
    rect: Rect,
    allocator: &mut ColorAllocator,
    policy: &ConstraintPolicy,
    rng: &mut MondrianRng,
) -> Result<Subdivision> {
    let interpreter = Interpreter::new(policy)?;
    Ok(interpreter.subdivide(symbols, cursor, rect, allocator, rng))
}
