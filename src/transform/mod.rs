//! # Frame Transforms
//!
//! Pure per-frame transforms parameterized by clip progress.
//!
//! ## Built-in Transforms
//!
//! - **Contrast**: global contrast stretch around the frame mean, following a
//!   linear ramp or a sine pulse
//! - **Rotation**: gradual rotation about the frame center, either plain
//!   (corners clipped) or scaled down so the whole frame stays visible
//!
//! ## Usage
//!
//! ```rust
//! use frame_sweep::transform::{ContrastAdjuster, ContrastCurve, FrameTransform};
//! use frame_sweep::video::GrayFrame;
//! use image::Luma;
//!
//! let frame = GrayFrame::new_filled(8, 8, Luma([128]));
//! let adjuster = ContrastAdjuster::new(ContrastCurve::Linear);
//! let out = adjuster.apply(&frame, 0.5).unwrap();
//! assert_eq!(out.dimensions(), frame.dimensions());
//! ```

pub mod affine;
pub mod contrast;
pub mod progress;
pub mod rotation;
pub mod traits;

pub use affine::{is_quarter_turn, warp_affine, AffineMatrix};
pub use contrast::{adjust_contrast, ContrastAdjuster, ContrastCurve};
pub use progress::ProgressConvention;
pub use rotation::{
    default_center, rotate_frame, rotation_angle, scale_to_fit, RotationScaler, RotationStep,
    RotationVariant, DEFAULT_FINAL_ANGLE,
};
pub use traits::FrameTransform;
