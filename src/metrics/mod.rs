//! The distortion-metric family. Every metric here operates on two
//! equal-typed `Frame`s and reports through [`crate::numeric::StatRecord`]
//! for running aggregation, with one module per metric.

pub mod blockiness;
pub mod de2000;
pub mod deltae;
pub mod mpsnr;
pub mod psnr;
pub mod ssim;
pub mod tf_ssim;
pub mod vqm;

pub use blockiness::{calculate_block_activity, calculate_blockiness_j341};
pub use deltae::calculate_delta_e;
pub use mpsnr::calculate_mpsnr;
pub use psnr::{calculate_frame_psnr, calculate_psnr, regional_psnr_worst_block, PlanarPsnr, PsnrAccumulator};
pub use ssim::calculate_frame_ssim;
pub use tf_ssim::calculate_tf_ssim;
pub use vqm::calculate_hdrvqm;
