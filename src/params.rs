//! Configuration record consumed by every component.
//!
//! A single `Params` value is threaded explicitly through every
//! constructor rather than relying on process-wide state. This is the
//! typed equivalent of a key/value table — every key becomes a field,
//! with `Default` giving the table's documented defaults.

use crate::frame::{ChromaFormat, ChromaLocation, ColorPrimaries, ColorSpace, SampleRange, TransferFunctionKind};

/// Which `ColorTransform` variant the closed-loop luma
/// search should run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClosedLoopType {
    /// No closed-loop search; use `ColorTransformGeneric`.
    Off,
    /// Iterate on Y' only (the canonical variant).
    Luma,
    /// Iterate on Cb/Cr in addition to Y'.
    LumaChroma,
    /// Iterate directly in RGB space.
    Rgb,
    /// Iterate in XYZ space.
    Xyz,
}

impl Default for ClosedLoopType {
    fn default() -> Self {
        ClosedLoopType::Off
    }
}

/// Selects the search bracket used by the closed-loop bisection.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClosedLoopSearch {
    /// A single midpoint evaluation, no further bisection.
    Fast,
    /// Full bisection up to `max_iterations`.
    Full,
}

impl Default for ClosedLoopSearch {
    fn default() -> Self {
        ClosedLoopSearch::Full
    }
}

/// `forceRange` selector for `ColorTransformCL`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UseMinMax {
    /// Derive `NB`/`PB`/`NR`/`PR` independently (may produce a kink at zero
    /// chroma).
    Independent,
    /// Force a fixed 1.0 scale.
    Fixed,
    /// `NB = PB = max(NB, PB)` and symmetrically for R, avoiding the kink.
    Symmetric,
}

impl Default for UseMinMax {
    fn default() -> Self {
        UseMinMax::Independent
    }
}

/// High-precision BT.2020 matrix direction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HighPrecision {
    Off,
    Forward,
    Inverse,
}

impl Default for HighPrecision {
    fn default() -> Self {
        HighPrecision::Off
    }
}

/// Chroma downsample/upsample filter family selector.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChromaFilterKind {
    Bilinear,
    Tap3_121,
    Tap3_161,
    Tap11Mpeg2,
    Tap12Mpeg2Tm5,
    DualPhase,
}

impl Default for ChromaFilterKind {
    fn default() -> Self {
        ChromaFilterKind::Bilinear
    }
}

/// Spatial resampler family selector.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScaleMode {
    Null,
    Nearest,
    Half,
    Bilinear,
    BiCubic,
    Lanczos,
}

impl Default for ScaleMode {
    fn default() -> Self {
        ScaleMode::Null
    }
}

/// Tone-mapping operator selector.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ToneMapMode {
    None,
    Roll,
    Cie1931,
    Bt2390,
    Bt2390Ipt,
}

impl Default for ToneMapMode {
    fn default() -> Self {
        ToneMapMode::None
    }
}

/// Per-metric enable flags ( `EnableMetric{...}`).
#[derive(Copy, Clone, Debug, Default)]
pub struct MetricFlags {
    pub psnr: bool,
    pub ssim: bool,
    pub tf_ssim: bool,
    pub mpsnr: bool,
    pub delta_e: bool,
    pub vqm: bool,
    pub blockiness: bool,
    pub regional_psnr: bool,
}

/// Crop/pad window, in pixels; negative values pad rather than crop
/// ( `CropOffset{Left,Top,Right,Bottom}`).
#[derive(Copy, Clone, Debug, Default)]
pub struct CropOffsets {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// Tone-mapping sub-parameters ( `ToneMap{...}`).
#[derive(Copy, Clone, Debug)]
pub struct ToneMapParams {
    pub mode: ToneMapMode,
    pub min_value: f64,
    pub max_value: f64,
    pub target_value: f64,
    pub gamma: f64,
    pub scale_gamut: bool,
}

impl Default for ToneMapParams {
    fn default() -> Self {
        ToneMapParams {
            mode: ToneMapMode::None,
            min_value: 0.0,
            max_value: 1.0,
            target_value: 1.0,
            gamma: 1.0,
            scale_gamut: false,
        }
    }
}

/// Passed once at startup and threaded explicitly through every operator
/// constructor.
#[derive(Clone, Debug)]
pub struct Params {
    pub width: usize,
    pub height: usize,
    pub chroma_format: ChromaFormat,
    pub bit_depth: [usize; 3],
    pub color_space: ColorSpace,
    pub color_primaries: ColorPrimaries,
    pub transfer_function: TransferFunctionKind,
    pub sample_range: SampleRange,
    pub chroma_location_top: ChromaLocation,
    pub chroma_location_bottom: ChromaLocation,

    pub use_closed_loop: bool,
    pub closed_loop_type: ClosedLoopType,
    pub closed_loop_search: ClosedLoopSearch,
    pub tf_distance: bool,
    pub max_iterations: u32,
    pub use_min_max: UseMinMax,
    pub use_high_precision: HighPrecision,
    pub transform_precision: bool,

    pub chroma_downsample_filter: ChromaFilterKind,
    pub chroma_upsample_filter: ChromaFilterKind,
    pub use_adaptive_downsampler: bool,
    pub use_adaptive_upsampler: bool,
    pub edge_classifier: f64,

    pub enable_tf_luts: bool,

    pub number_of_frames: Option<usize>,
    pub start_frame: usize,
    pub frame_skip: usize,

    pub crop_offset: CropOffsets,

    pub metrics: MetricFlags,
    pub ssim_block_size: (usize, usize),
    pub ssim_block_distance: usize,
    pub rpsnr_block_size: (usize, usize),
    pub rpsnr_block_distance: (usize, usize),
    pub delta_e_points_enable: u8,
    pub max_sample_value: f64,

    pub tone_map: ToneMapParams,

    pub scale_mode: ScaleMode,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            width: 0,
            height: 0,
            chroma_format: ChromaFormat::default(),
            bit_depth: [10, 10, 10],
            color_space: ColorSpace::YCbCr,
            color_primaries: ColorPrimaries::Bt709,
            transfer_function: TransferFunctionKind::Bt709,
            sample_range: SampleRange::default(),
            chroma_location_top: ChromaLocation::default(),
            chroma_location_bottom: ChromaLocation::default(),

            use_closed_loop: false,
            closed_loop_type: ClosedLoopType::default(),
            closed_loop_search: ClosedLoopSearch::default(),
            tf_distance: true,
            max_iterations: 30,
            use_min_max: UseMinMax::default(),
            use_high_precision: HighPrecision::default(),
            transform_precision: false,

            chroma_downsample_filter: ChromaFilterKind::default(),
            chroma_upsample_filter: ChromaFilterKind::default(),
            use_adaptive_downsampler: false,
            use_adaptive_upsampler: false,
            edge_classifier: 0.10,

            enable_tf_luts: false,

            number_of_frames: None,
            start_frame: 0,
            frame_skip: 0,

            crop_offset: CropOffsets::default(),

            metrics: MetricFlags::default(),
            ssim_block_size: (8, 8),
            ssim_block_distance: 8,
            rpsnr_block_size: (8, 8),
            rpsnr_block_distance: (8, 8),
            delta_e_points_enable: 0b0000_0001,
            max_sample_value: 1.0,

            tone_map: ToneMapParams::default(),

            scale_mode: ScaleMode::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let p = Params::default();
        assert_eq!(p.max_iterations, 30);
        assert_eq!(p.closed_loop_type, ClosedLoopType::Off);
        assert!(!p.enable_tf_luts);
        assert!(!p.use_adaptive_downsampler);
    }
}
