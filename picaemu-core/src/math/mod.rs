// Custom numeric types used throughout the pipeline: hardware
// reduced-precision floats, 12.4 fixed-point screen coordinates, and
// small generic vectors that can carry either of them (or plain u8
// color channels).

pub mod fixed;
pub mod float;
pub mod vec;

pub use fixed::Fix12P4;
pub use float::{Float, Float16, Float20, Float24};
pub use vec::{Vec2, Vec3, Vec4};
