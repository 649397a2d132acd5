//! `hdrcore` is a frame-processing toolkit for HDR/WCG still images and
//! video: format conversion (chroma resampling, spatial scaling, color
//! transforms including the closed-loop luma adjustment), tone mapping, and
//! a distortion-metric suite.
//!
//! The crate is organized the way the pipeline itself is: a universal
//! [`frame::Frame`] container flows through a declaration-ordered chain of
//! operators (`transfer`, `chroma`, `scale`, `color`, `tonemap`,
//! `framefilter`), and [`metrics`] reports distortion between two frames
//! without mutating either.

#![allow(clippy::cast_lossless)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::wrong_self_convention)]
#![deny(missing_docs)]

pub mod chroma;
pub mod color;
pub mod error;
pub mod filter1d;
pub mod frame;
pub mod framefilter;
pub mod metrics;
pub mod numeric;
pub mod params;
pub mod pipeline;
pub mod scale;
pub mod tonemap;
pub mod transfer;

pub use error::{HdrCoreError, Result};
pub use frame::{Frame, FrameFormat, Plane};
pub use params::Params;
