//! `ColorTransformGeneric`: the non-iterative baseline
//! matrix transform, with optional integer quantization.

use crate::color::matrices::{mat_mul, Mat3};
use crate::error::Result;
use crate::frame::{Frame, Plane, PlaneBuffer, SampleRange, SampleWeights};
use crate::numeric::{clip, round_clip_i32};

/// Applies a fixed 3x3 matrix to every pixel of a 4:4:4 frame, clipping the
/// float result to `[0, 1]` and, for integer frames, quantizing through
/// [`SampleWeights`].
pub struct ColorTransformGeneric {
    matrix: Mat3,
    sample_range: SampleRange,
}

impl ColorTransformGeneric {
    pub fn new(matrix: Mat3, sample_range: SampleRange) -> Self {
        ColorTransformGeneric { matrix, sample_range }
    }

    /// `dst` and `src` must already share the same 4:4:4 geometry; `can_compare`
    /// is left to the caller since this operator also changes color space.
    pub fn process(&self, src: &Frame) -> Result<Frame> {
        let mut dst = src.clone();
        let (w, h) = (src.planes[0].width(), src.planes[0].height());

        if src.format.is_float {
            let y = src.planes[0].as_f32();
            let u = src.planes[1].as_f32();
            let v = src.planes[2].as_f32();
            let mut oy = PlaneBuffer::<f32>::new(w, h);
            let mut ou = PlaneBuffer::<f32>::new(w, h);
            let mut ov = PlaneBuffer::<f32>::new(w, h);
            for i in 0..w * h {
                let out = mat_mul(&self.matrix, [y.data[i] as f64, u.data[i] as f64, v.data[i] as f64]);
                oy.data[i] = clip(out[0], 0.0, 1.0) as f32;
                ou.data[i] = clip(out[1], 0.0, 1.0) as f32;
                ov.data[i] = clip(out[2], 0.0, 1.0) as f32;
            }
            dst.planes[0] = Plane::F32(oy);
            dst.planes[1] = Plane::F32(ou);
            dst.planes[2] = Plane::F32(ov);
        } else {
            let bit_depth = src.format.bit_depth;
            let weights = SampleWeights::derive(bit_depth, self.sample_range);
            let max_code = (1u32 << bit_depth) - 1;
            let normalize = |v: f64, offset: f64, weight: f64| -> f64 { (v - offset) / weight };
            let quantize = |v01: f64, offset: f64, weight: f64| -> i32 {
                round_clip_i32(v01 * weight + offset, 0, max_code as i32)
            };

            macro_rules! read_plane {
                ($p:expr) => {
                    match $p {
                        Plane::U8(b) => b.data.iter().map(|&v| v as f64).collect::<Vec<_>>(),
                        Plane::U16(b) => b.data.iter().map(|&v| v as f64).collect::<Vec<_>>(),
                        Plane::F32(_) => unreachable!(),
                    }
                };
            }
            let yr = read_plane!(&src.planes[0]);
            let ur = read_plane!(&src.planes[1]);
            let vr = read_plane!(&src.planes[2]);

            let mut oy = PlaneBuffer::<u16>::new(w, h);
            let mut ou = PlaneBuffer::<u16>::new(w, h);
            let mut ov = PlaneBuffer::<u16>::new(w, h);
            for i in 0..w * h {
                let yn = normalize(yr[i], weights.luma_offset, weights.luma_weight);
                let un = normalize(ur[i], weights.chroma_offset, weights.chroma_weight);
                let vn = normalize(vr[i], weights.chroma_offset, weights.chroma_weight);
                let out = mat_mul(&self.matrix, [clip(yn, 0.0, 1.0), clip(un, -0.5, 0.5), clip(vn, -0.5, 0.5)]);
                oy.data[i] = quantize(clip(out[0], 0.0, 1.0), weights.luma_offset, weights.luma_weight) as u16;
                ou.data[i] = quantize(clip(out[1], -0.5, 0.5), weights.chroma_offset, weights.chroma_weight) as u16;
                ov.data[i] = quantize(clip(out[2], -0.5, 0.5), weights.chroma_offset, weights.chroma_weight) as u16;
            }
            if bit_depth <= 8 {
                dst.planes[0] = Plane::U8(PlaneBuffer {
                    width: w,
                    height: h,
                    stride: w,
                    data: oy.data.iter().map(|&v| v as u8).collect(),
                });
                dst.planes[1] = Plane::U8(PlaneBuffer {
                    width: w,
                    height: h,
                    stride: w,
                    data: ou.data.iter().map(|&v| v as u8).collect(),
                });
                dst.planes[2] = Plane::U8(PlaneBuffer {
                    width: w,
                    height: h,
                    stride: w,
                    data: ov.data.iter().map(|&v| v as u8).collect(),
                });
            } else {
                dst.planes[0] = Plane::U16(oy);
                dst.planes[1] = Plane::U16(ou);
                dst.planes[2] = Plane::U16(ov);
            }
        }
        Ok(dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::matrices::MatrixMode;
    use crate::frame::{test_format, ChromaFormat};

    #[test]
    fn identity_matrix_preserves_float_frame() {
        let fmt = test_format(4, 4, ChromaFormat::Cs444, true);
        let mut frame = Frame::new(fmt);
        if let Plane::F32(p) = &mut frame.planes[0] {
            for (i, v) in p.data.iter_mut().enumerate() {
                *v = (i as f32) / 16.0;
            }
        }
        let (m, _) = crate::color::matrices::matrix_pair(MatrixMode::Identity);
        let xform = ColorTransformGeneric::new(m, SampleRange::Standard);
        let out = xform.process(&frame).unwrap();
        assert_eq!(out.planes[0].as_f32().data, frame.planes[0].as_f32().data);
    }

    #[test]
    fn integer_path_stays_in_range() {
        let fmt = test_format(4, 4, ChromaFormat::Cs444, false);
        let frame = Frame::new(fmt);
        let (m, _) = crate::color::matrices::matrix_pair(MatrixMode::Rgb709ToYuv709);
        let xform = ColorTransformGeneric::new(m, SampleRange::Standard);
        let out = xform.process(&frame).unwrap();
        for &v in &out.planes[0].as_u16().data {
            assert!(v <= 1023);
        }
    }
}
