// Mondrian Composition Engine
//
// Procedural generator for compositions in the style of Piet Mondrian's
// grid paintings. A stochastic rewriting grammar produces a bracketed
// symbol string; a constrained interpreter then carves a root rectangle
// into colored fills and divider primitives that tile it.
//
// Architecture:
// - grammar.rs: Weighted production rules and parallel expansion
// - symbol.rs: Interpreter alphabet, tokenizer, subtree skipping
// - geometry.rs: Rect, Axis, split/segment arithmetic, output Primitive
// - policy.rs: ConstraintPolicy (size caps, aspect, narrow-split damping,
//   divider rendering mode) plus named presets
// - palette.rs: Color tokens, weighted palettes, per-composition allocator
//   with required colors
// - subdivide.rs: The interpreter (explicit frame stack, degenerate
//   termination, split degradation, segmented dividers)
// - compose.rs: CompositionConfig (JSON-loadable), re-roll loop, compose()
// - error.rs: ComposeError
//
// No I/O happens here; rendering and file handling belong to callers such
// as `mondrian_cli`. Output is deterministic given the config and a seed.

pub mod compose;
pub mod error;
pub mod geometry;
pub mod grammar;
pub mod palette;
pub mod policy;
pub mod subdivide;
pub mod symbol;

pub use compose::{Composition, CompositionConfig, GrammarConfig, Summary, compose};
pub use error::{ComposeError, Result};
pub use geometry::{Axis, Primitive, PrimitiveKind, Rect};
pub use mondrian_prng as prng;
