// Rectangles, split axes and output primitives.
//
// All geometry lives in the root rectangle's coordinate space, canonically
// the unit square. Rectangles are small `Copy` values: the interpreter
// creates new ones for children and dividers and never mutates a rectangle
// after construction.
//
// See also: `subdivide.rs` for the traversal that produces `Primitive`s,
// `policy.rs` for the size/aspect predicates evaluated against `Rect`s.

use crate::palette::ColorToken;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle `(x, y, w, h)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Orientation of a divider.
///
/// `Horizontal` is the `H` operator: a horizontal line cuts the height, the
/// first child sits below the line (smaller `y`) and the second above it.
/// `Vertical` is `V`: a vertical line cuts the width, first child on the left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Rect {
    pub const UNIT: Rect = Rect {
        x: 0.0,
        y: 0.0,
        w: 1.0,
        h: 1.0,
    };

    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    /// `max(w/h, h/w)`. Infinite for a rectangle with a zero side.
    pub fn aspect_ratio(&self) -> f64 {
        if self.w <= 0.0 || self.h <= 0.0 {
            return f64::INFINITY;
        }
        (self.w / self.h).max(self.h / self.w)
    }

    /// The dimension a divider on `axis` cuts.
    pub fn extent(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.h,
            Axis::Vertical => self.w,
        }
    }

    /// The dimension a divider on `axis` runs along.
    pub fn span(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.w,
            Axis::Vertical => self.h,
        }
    }

    /// Cut at `ratio` of the extent, reserving `line_width` centred on the
    /// cut. Returns `(first, line, second)`; the three pieces tile `self`.
    pub fn split(&self, axis: Axis, ratio: f64, line_width: f64) -> (Rect, Rect, Rect) {
        let half = line_width / 2.0;
        match axis {
            Axis::Horizontal => {
                let cut = self.h * ratio;
                (
                    Rect::new(self.x, self.y, self.w, cut - half),
                    Rect::new(self.x, self.y + cut - half, self.w, line_width),
                    Rect::new(self.x, self.y + cut + half, self.w, self.h - cut - half),
                )
            }
            Axis::Vertical => {
                let cut = self.w * ratio;
                (
                    Rect::new(self.x, self.y, cut - half, self.h),
                    Rect::new(self.x + cut - half, self.y, line_width, self.h),
                    Rect::new(self.x + cut + half, self.y, self.w - cut - half, self.h),
                )
            }
        }
    }

    /// Cut `self` into `count` equal pieces along its span on `axis`
    /// (a divider's run direction). `count` of zero is treated as one.
    pub fn segments(&self, axis: Axis, count: usize) -> Vec<Rect> {
        let count = count.max(1);
        let step = self.span(axis) / count as f64;
        (0..count)
            .map(|i| {
                let offset = i as f64 * step;
                match axis {
                    Axis::Horizontal => Rect::new(self.x + offset, self.y, step, self.h),
                    Axis::Vertical => Rect::new(self.x, self.y + offset, self.w, step),
                }
            })
            .collect()
    }
}

/// What produced a primitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimitiveKind {
    /// A color drawn from the allocator (terminal `F` or a degraded split).
    Fill,
    /// A forced neutral fill from a size/aspect guard, or a divider segment
    /// that fell back to neutral.
    Neutral,
    /// A divider bar or a colored divider segment.
    Line,
}

/// One colored rectangle of the output sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    #[serde(flatten)]
    pub rect: Rect,
    pub color: ColorToken,
    pub kind: PrimitiveKind,
}

impl Primitive {
    pub fn new(rect: Rect, color: ColorToken, kind: PrimitiveKind) -> Self {
        Self { rect, color, kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn horizontal_split_stacks_in_y() {
        let (first, line, second) = Rect::UNIT.split(Axis::Horizontal, 0.5, 0.1);
        assert!(approx(first.h, 0.45));
        assert!(approx(line.y, 0.45) && approx(line.h, 0.1) && approx(line.w, 1.0));
        assert!(approx(second.y, 0.55) && approx(second.h, 0.45));
        assert!(approx(first.area() + line.area() + second.area(), 1.0));
    }

    #[test]
    fn vertical_split_stacks_in_x() {
        let rect = Rect::new(0.2, 0.1, 0.6, 0.4);
        let (first, line, second) = rect.split(Axis::Vertical, 0.25, 0.02);
        assert!(approx(first.x, 0.2) && approx(first.w, 0.14));
        assert!(approx(line.x, 0.34) && approx(line.w, 0.02));
        assert!(approx(second.x, 0.36) && approx(second.w, 0.44));
        assert!(approx(second.x + second.w, rect.x + rect.w));
        for piece in [first, line, second] {
            assert!(approx(piece.h, 0.4));
        }
    }

    #[test]
    fn segments_tile_the_span() {
        let bar = Rect::new(0.0, 0.45, 1.0, 0.01);
        let pieces = bar.segments(Axis::Horizontal, 4);
        assert_eq!(pieces.len(), 4);
        assert!(approx(pieces[3].x + pieces[3].w, 1.0));
        assert!(pieces.iter().all(|p| approx(p.w, 0.25) && approx(p.h, 0.01)));

        let column = Rect::new(0.3, 0.0, 0.01, 0.5);
        assert_eq!(column.segments(Axis::Vertical, 0).len(), 1);
    }

    #[test]
    fn aspect_ratio_is_symmetric() {
        assert!(approx(Rect::new(0.0, 0.0, 0.2, 0.1).aspect_ratio(), 2.0));
        assert!(approx(Rect::new(0.0, 0.0, 0.1, 0.2).aspect_ratio(), 2.0));
        assert!(Rect::new(0.0, 0.0, 0.0, 0.2).aspect_ratio().is_infinite());
    }
}
