//! The `ColorTransform` family: color-space / color-primary conversion,
//! including the closed-loop luma adjustment that is this crate's signature
//! algorithm.

pub mod cl;
pub mod closed_loop;
pub mod fvdo;
pub mod generic;
pub mod matrices;

pub use cl::{ColorTransformCl, LumaWeights};
pub use closed_loop::{ClosedLoop, FinalObjective};
pub use fvdo::{ColorTransformFvdo, FvdoMode};
pub use generic::ColorTransformGeneric;
pub use matrices::{matrix_pair, MatrixMode};
