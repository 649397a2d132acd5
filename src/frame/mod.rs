//! The universal pixel container (`Frame`) and its immutable format
//! descriptor (`FrameFormat`).
//!
//! This is the only state passed between operators in the pipeline,
//! generalized from "three fixed YUV planes" to the four-component,
//! three-payload model the color/tone-mapping pipeline needs.

use crate::error::{HdrCoreError, Result};

/// Component index. `Y` doubles as the luma plane in every supported color
/// space (YCbCr, ICtCp, XYZ, RGB alike); `U`/`V` double as G/B for RGB.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Component {
    /// Luma, or R/X in a non-YCbCr space.
    Y = 0,
    /// Cb, or G/Y in a non-YCbCr space.
    U = 1,
    /// Cr, or B/Z in a non-YCbCr space.
    V = 2,
    /// Alpha.
    A = 3,
}

/// Number of components a `Frame` may carry (Y, U, V, A).
pub const MAX_COMPONENTS: usize = 4;

/// Chroma subsampling format.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChromaFormat {
    /// Monochrome; no chroma planes.
    Cs400,
    /// Both vertically and horizontally subsampled.
    Cs420,
    /// Horizontally subsampled only.
    Cs422,
    /// Not subsampled.
    Cs444,
}

impl Default for ChromaFormat {
    fn default() -> Self {
        ChromaFormat::Cs420
    }
}

impl ChromaFormat {
    /// Right-shift amounts `(ss_x, ss_y)` applied to the luma dimensions to
    /// get the chroma plane dimensions. `Cs400` has no chroma planes.
    pub fn decimation(self) -> Option<(u32, u32)> {
        match self {
            ChromaFormat::Cs420 => Some((1, 1)),
            ChromaFormat::Cs422 => Some((1, 0)),
            ChromaFormat::Cs444 => Some((0, 0)),
            ChromaFormat::Cs400 => None,
        }
    }

    /// Chroma plane dimensions given the luma plane dimensions.
    pub fn chroma_dims(self, luma_width: usize, luma_height: usize) -> (usize, usize) {
        match self.decimation() {
            Some((sx, sy)) => (luma_width >> sx, luma_height >> sy),
            None => (0, 0),
        }
    }
}

/// Color space of a `Frame`'s samples.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColorSpace {
    Rgb,
    YCbCr,
    Xyz,
    YDzDx,
    YUpVp,
    ICtCp,
    YFbFr1,
    YFbFr2,
    YFbFr3,
    YFbFr4,
}

/// Color primaries / matrix basis.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColorPrimaries {
    Bt709,
    Bt2020,
    P3D65,
    P3D60,
    Bt601,
    Ext,
    Xyz,
    Amt,
    YCoCg,
}

/// Electro-optical / opto-electronic transfer function identifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransferFunctionKind {
    Null,
    Pq,
    Hlg,
    Bt709,
    Bt1886,
    Srgb,
    St240,
    HybridPq,
    HybridPq2,
    PqNoise,
    ComboPqPh10k,
}

/// Legal-range vs. full-range sample encoding.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SampleRange {
    /// Narrow/legal range (black/white codes at 64/940 for 10 bits).
    Standard,
    /// 0 .. 2^bitDepth - 1.
    Full,
    /// SDI range (black/white codes at 4/1019 for 10 bits).
    Sdi,
}

impl Default for SampleRange {
    fn default() -> Self {
        SampleRange::Standard
    }
}

/// Spatial offset of a subsampled chroma sample relative to the luma grid,
/// per ITU-T H.273.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChromaLocation {
    Left,
    Center,
    TopLeft,
    Top,
    BottomLeft,
    Bottom,
}

impl Default for ChromaLocation {
    fn default() -> Self {
        ChromaLocation::Left
    }
}

/// Quantization weights/offsets derived from bit depth and sample range,
/// used by the integer path of [`crate::color::generic`] and by the
/// closed-loop luma grid search.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SampleWeights {
    pub luma_weight: f64,
    pub luma_offset: f64,
    pub chroma_weight: f64,
    pub chroma_offset: f64,
}

impl SampleWeights {
    /// Derive the weights for a given bit depth / sample range.
    pub fn derive(bit_depth: usize, range: SampleRange) -> Self {
        let scale = (1u32 << (bit_depth.saturating_sub(8))) as f64;
        match range {
            SampleRange::Standard => SampleWeights {
                luma_weight: 876.0 * scale,
                luma_offset: 64.0 * scale,
                chroma_weight: 896.0 * scale,
                chroma_offset: 512.0 * scale,
            },
            SampleRange::Full => SampleWeights {
                luma_weight: ((1u64 << bit_depth) - 1) as f64,
                luma_offset: 0.0,
                chroma_weight: ((1u64 << bit_depth) - 1) as f64,
                chroma_offset: ((1u64 << (bit_depth - 1))) as f64,
            },
            SampleRange::Sdi => SampleWeights {
                luma_weight: 1015.0 * scale,
                luma_offset: 4.0 * scale,
                chroma_weight: 1012.0 * scale,
                chroma_offset: 512.0 * scale,
            },
        }
    }
}

/// One plane's worth of pixels, in row-major order, with an explicit
/// `stride` so an operator can work on a sub-rectangle in place.
#[derive(Clone, Debug)]
pub struct PlaneBuffer<T> {
    pub width: usize,
    pub height: usize,
    pub stride: usize,
    pub data: Vec<T>,
}

impl<T: Copy + Default> PlaneBuffer<T> {
    pub fn new(width: usize, height: usize) -> Self {
        PlaneBuffer {
            width,
            height,
            stride: width,
            data: vec![T::default(); width * height],
        }
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        let start = y * self.stride;
        &mut self.data[start..start + self.width]
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.data[y * self.stride + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: T) {
        self.data[y * self.stride + x] = v;
    }
}

/// The payload of one plane. Exactly one variant is live across an entire
/// `Frame` (all planes share the same `isFloat`/bit-depth selection) —
/// never more than one is live at a time.
#[derive(Clone, Debug)]
pub enum Plane {
    U8(PlaneBuffer<u8>),
    U16(PlaneBuffer<u16>),
    F32(PlaneBuffer<f32>),
}

impl Plane {
    pub fn width(&self) -> usize {
        match self {
            Plane::U8(p) => p.width,
            Plane::U16(p) => p.width,
            Plane::F32(p) => p.width,
        }
    }

    pub fn height(&self) -> usize {
        match self {
            Plane::U8(p) => p.height,
            Plane::U16(p) => p.height,
            Plane::F32(p) => p.height,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Plane::F32(_))
    }

    pub fn as_f64(&self, x: usize, y: usize) -> f64 {
        match self {
            Plane::U8(p) => p.get(x, y) as f64,
            Plane::U16(p) => p.get(x, y) as f64,
            Plane::F32(p) => p.get(x, y) as f64,
        }
    }

    pub fn as_f32(&self) -> &PlaneBuffer<f32> {
        match self {
            Plane::F32(p) => p,
            _ => panic!("plane is not float"),
        }
    }

    pub fn as_f32_mut(&mut self) -> &mut PlaneBuffer<f32> {
        match self {
            Plane::F32(p) => p,
            _ => panic!("plane is not float"),
        }
    }

    pub fn as_u8(&self) -> &PlaneBuffer<u8> {
        match self {
            Plane::U8(p) => p,
            _ => panic!("plane is not u8"),
        }
    }

    pub fn as_u16(&self) -> &PlaneBuffer<u16> {
        match self {
            Plane::U16(p) => p,
            _ => panic!("plane is not u16"),
        }
    }
}

/// The immutable descriptor half of a `Frame` — everything about a frame
/// except its payload buffers, `frame_no`, and `is_available`.
///
/// Two frames are "equal-typed" iff their formats match on
/// `(width[Y], height[Y], chroma_format, bit_depth, is_float, color_space,
/// color_primaries)`.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameFormat {
    pub width: usize,
    pub height: usize,
    pub chroma_format: ChromaFormat,
    pub bit_depth: usize,
    pub is_float: bool,
    pub color_space: ColorSpace,
    pub color_primaries: ColorPrimaries,
    pub transfer_function: TransferFunctionKind,
    pub sample_range: SampleRange,
    pub chroma_location_top: ChromaLocation,
    pub chroma_location_bottom: ChromaLocation,
    pub is_interlaced: bool,
    pub frame_rate: f64,
    pub system_gamma: f64,
}

impl FrameFormat {
    /// The equal-typed comparison used by every operator's precondition.
    pub fn equal_typed(&self, other: &FrameFormat) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.chroma_format == other.chroma_format
            && self.bit_depth == other.bit_depth
            && self.is_float == other.is_float
            && self.color_space == other.color_space
            && self.color_primaries == other.color_primaries
    }

    pub fn min_pel(&self, comp: Component) -> f64 {
        if self.is_float {
            return 0.0;
        }
        let w = SampleWeights::derive(self.bit_depth, self.sample_range);
        match comp {
            Component::Y => match self.sample_range {
                SampleRange::Full => 0.0,
                _ => w.luma_offset,
            },
            _ => match self.sample_range {
                SampleRange::Full => 0.0,
                _ => w.chroma_offset - w.chroma_weight / 2.0,
            },
        }
    }

    pub fn max_pel(&self, comp: Component) -> f64 {
        if self.is_float {
            return 1.0;
        }
        match comp {
            Component::Y => self.min_pel(comp) + SampleWeights::derive(self.bit_depth, self.sample_range).luma_weight,
            _ => self.min_pel(comp) + SampleWeights::derive(self.bit_depth, self.sample_range).chroma_weight,
        }
    }

    pub fn mid_pel(&self, comp: Component) -> f64 {
        if self.is_float {
            return 0.5;
        }
        (self.min_pel(comp) + self.max_pel(comp)) / 2.0
    }
}

/// The universal pixel container passed between pipeline operators,
/// generalized to four components and a `Plane` payload enum instead of
/// a fixed three-plane array.
#[derive(Clone, Debug)]
pub struct Frame {
    pub format: FrameFormat,
    pub planes: Vec<Plane>,
    pub frame_no: u64,
    pub is_available: bool,
}

impl Frame {
    /// Allocate a new frame for the given format, with appropriately sized
    /// planes for its chroma format.
    pub fn new(format: FrameFormat) -> Self {
        let (cw, ch) = format.chroma_format.chroma_dims(format.width, format.height);
        let mut planes = Vec::with_capacity(3);
        let make = |w: usize, h: usize| -> Plane {
            if format.is_float {
                Plane::F32(PlaneBuffer::new(w, h))
            } else if format.bit_depth <= 8 {
                Plane::U8(PlaneBuffer::new(w, h))
            } else {
                Plane::U16(PlaneBuffer::new(w, h))
            }
        };
        planes.push(make(format.width, format.height));
        if format.chroma_format != ChromaFormat::Cs400 {
            planes.push(make(cw, ch));
            planes.push(make(cw, ch));
        }
        Frame {
            format,
            planes,
            frame_no: 0,
            is_available: true,
        }
    }

    /// Precondition check shared by every operator that requires matching
    /// input/output types.
    pub fn can_compare(&self, other: &Frame) -> Result<()> {
        if self.format.is_float != other.format.is_float {
            return Err(HdrCoreError::type_mismatch(
                "inputs disagree on isFloat",
            ));
        }
        if !self.format.is_float && self.format.bit_depth != other.format.bit_depth {
            return Err(HdrCoreError::type_mismatch(
                "integer inputs disagree on bitDepth",
            ));
        }
        if self.planes[0].width() * self.planes[0].height()
            != other.planes[0].width() * other.planes[0].height()
        {
            return Err(HdrCoreError::type_mismatch(
                "Y-plane compSizes disagree",
            ));
        }
        Ok(())
    }

    pub fn y(&self) -> &Plane {
        &self.planes[0]
    }

    pub fn u(&self) -> &Plane {
        &self.planes[1]
    }

    pub fn v(&self) -> &Plane {
        &self.planes[2]
    }
}

#[cfg(test)]
pub(crate) fn test_format(width: usize, height: usize, chroma: ChromaFormat, is_float: bool) -> FrameFormat {
    FrameFormat {
        width,
        height,
        chroma_format: chroma,
        bit_depth: if is_float { 32 } else { 10 },
        is_float,
        color_space: ColorSpace::YCbCr,
        color_primaries: ColorPrimaries::Bt709,
        transfer_function: TransferFunctionKind::Bt709,
        sample_range: SampleRange::Standard,
        chroma_location_top: ChromaLocation::Left,
        chroma_location_bottom: ChromaLocation::Left,
        is_interlaced: false,
        frame_rate: 30.0,
        system_gamma: 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chroma_dims_420() {
        assert_eq!(ChromaFormat::Cs420.chroma_dims(1920, 1080), (960, 540));
    }

    #[test]
    fn chroma_dims_422() {
        assert_eq!(ChromaFormat::Cs422.chroma_dims(1920, 1080), (960, 1080));
    }

    #[test]
    fn chroma_dims_444() {
        assert_eq!(ChromaFormat::Cs444.chroma_dims(1920, 1080), (1920, 1080));
    }

    #[test]
    fn chroma_dims_400() {
        assert_eq!(ChromaFormat::Cs400.chroma_dims(1920, 1080), (0, 0));
    }

    #[test]
    fn frame_new_420_invariants() {
        let fmt = test_format(16, 8, ChromaFormat::Cs420, false);
        let frame = Frame::new(fmt);
        assert_eq!(frame.planes[1].width(), 8);
        assert_eq!(frame.planes[1].height(), 4);
    }

    #[test]
    fn frame_new_400_has_no_chroma() {
        let fmt = test_format(16, 8, ChromaFormat::Cs400, false);
        let frame = Frame::new(fmt);
        assert_eq!(frame.planes.len(), 1);
    }

    #[test]
    fn sample_weights_standard_10bit() {
        let w = SampleWeights::derive(10, SampleRange::Standard);
        assert_eq!(w.luma_weight, 876.0);
        assert_eq!(w.luma_offset, 64.0);
        assert_eq!(w.chroma_weight, 896.0);
    }

    #[test]
    fn sample_weights_full_10bit() {
        let w = SampleWeights::derive(10, SampleRange::Full);
        assert_eq!(w.luma_weight, 1023.0);
        assert_eq!(w.luma_offset, 0.0);
    }
}
