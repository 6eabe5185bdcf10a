//! Software implementation of a mobile-class GPU vertex pipeline: a
//! microcode vertex shader interpreter, a clipping software rasterizer
//! with perspective-correct interpolation, and a tiled texture unit
//! with packed color codecs.
//!
//! The crate is presentation-agnostic. Fragments leave through the
//! [`rasterizer::PixelSink`] trait; wiring that to a window lives in
//! the runtime crate.

pub mod color;
pub mod error;
pub mod math;
pub mod rasterizer;
pub mod shader;
pub mod texture;

pub use error::PipelineError;
