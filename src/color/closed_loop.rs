//! The `ClosedLoop` luma adjustment — the repository's signature
//! contribution. Re-quantizes Y' (and, for the wider variants, Cb'/Cr' or
//! the RGB/XYZ components they stand in for) after a round trip through
//! 4:2:0 so the reconstructed value tracks its true counterpart as closely
//! as the 10-bit grid allows.
//!
//! Implemented as a bisection search shared by every [`ClosedLoopType`]
//! variant, reusing this crate's own [`ChromaResampler`] for the
//! 4:4:4<->4:2:0 round trip rather than re-deriving a second copy of that
//! filter bank. Variants differ only in which quantity (or sequence of
//! quantities) the search bisects; see [`ClosedLoop::solve_pixel`].

const RGB_TO_XYZ: Mat3 = [
    [0.4124564, 0.3575761, 0.1804375],
    [0.2126729, 0.7151522, 0.0721750],
    [0.0193339, 0.1191920, 0.9503041],
];

use crate::chroma::ChromaResampler;
use crate::color::matrices::{mat_mul, Mat3};
use crate::error::Result;
use crate::frame::{ChromaFormat, ChromaLocation, Frame, Plane, PlaneBuffer};
use crate::numeric::clip;
use crate::params::{ClosedLoopSearch, ClosedLoopType};
use crate::transfer::TransferFunction;

/// Which objective breaks ties between `Y'min` and `Y'max` at the end of
/// the bisection.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FinalObjective {
    /// Minimize `|Y_conv - Y_true|` in linear light.
    LinearLight,
    /// Minimize `|TF.inverse(Y_conv) - TF.inverse(Y_true)| + sum of per-channel RGB error (the default).
    TfAndRgb,
}

pub struct ClosedLoop<'a> {
    tf: &'a TransferFunction,
    fwd: Mat3,
    inv: Mat3,
    variant: ClosedLoopType,
    search: ClosedLoopSearch,
    objective: FinalObjective,
    max_iterations: u32,
    luma_weight: f64,
}

impl<'a> ClosedLoop<'a> {
    pub fn new(
        tf: &'a TransferFunction,
        fwd: Mat3,
        inv: Mat3,
        variant: ClosedLoopType,
        search: ClosedLoopSearch,
        objective: FinalObjective,
        max_iterations: u32,
        luma_weight: f64,
    ) -> Self {
        ClosedLoop {
            tf,
            fwd,
            inv,
            variant,
            search,
            objective,
            max_iterations,
            luma_weight,
        }
    }

    /// Run the closed-loop search over an entire 4:4:4 float frame holding
    /// `(Y', Cb', Cr')` and the linear RGB source it was derived from.
    ///
    /// `rgb_linear` and `ycbcr` must share the same 4:4:4 geometry.
    pub fn process(&self, ycbcr: &Frame, rgb_linear: &Frame) -> Result<Frame> {
        ycbcr.can_compare(rgb_linear)?;
        let (w, h) = (ycbcr.planes[0].width(), ycbcr.planes[0].height());

        // Step 2: downsample the nominal stream to 4:2:0, quantize, and
        // upsample back, producing (Y'0, Cb'0, Cr'0).
        let downsampler = ChromaResampler::new(
            ChromaFormat::Cs420,
            crate::params::ChromaFilterKind::Bilinear,
            crate::params::ChromaFilterKind::Bilinear,
            false,
            0.10,
        );
        let upsampler = ChromaResampler::new(
            ChromaFormat::Cs444,
            crate::params::ChromaFilterKind::Bilinear,
            crate::params::ChromaFilterKind::Bilinear,
            false,
            0.10,
        );
        let down = downsampler.process(ycbcr, ChromaLocation::Left)?;
        let quantized = quantize_frame(&down, self.luma_weight);
        let nominal = upsampler.process(&quantized, ChromaLocation::Left)?;

        let r_src = rgb_linear.planes[0].as_f32();
        let g_src = rgb_linear.planes[1].as_f32();
        let b_src = rgb_linear.planes[2].as_f32();
        let y0 = nominal.planes[0].as_f32();
        let cb0 = nominal.planes[1].as_f32();
        let cr0 = nominal.planes[2].as_f32();

        let mut out = ycbcr.clone();
        let mut oy = PlaneBuffer::<f32>::new(w, h);
        let mut ocb = PlaneBuffer::<f32>::new(w, h);
        let mut ocr = PlaneBuffer::<f32>::new(w, h);

        for i in 0..w * h {
            let rgb = [r_src.data[i] as f64, g_src.data[i] as f64, b_src.data[i] as f64];
            let nominal_ycc = [y0.data[i] as f64, cb0.data[i] as f64, cr0.data[i] as f64];
            let solved = self.solve_pixel(rgb, nominal_ycc);
            oy.data[i] = solved[0] as f32;
            ocb.data[i] = solved[1] as f32;
            ocr.data[i] = solved[2] as f32;
        }
        out.planes[0] = Plane::F32(oy);
        if matches!(
            self.variant,
            ClosedLoopType::LumaChroma | ClosedLoopType::Rgb | ClosedLoopType::Xyz
        ) {
            out.planes[1] = Plane::F32(ocb);
            out.planes[2] = Plane::F32(ocr);
        }
        Ok(out)
    }

    /// Picks, per variant, which quantity (or sequence of quantities) gets
    /// bisected and returns the resulting `(Y', Cb', Cr')` triple.
    ///
    /// `Luma` only ever touches the Y' slot; `LumaChroma` chases Y' then
    /// Cb' then Cr' in turn, each using the previous result rather than the
    /// untouched nominal value; `Rgb`/`Xyz` bisect all three slots against
    /// the matching component of the original pixel in RGB or XYZ space.
    fn solve_pixel(&self, rgb_orig: [f64; 3], nominal: [f64; 3]) -> [f64; 3] {
        match self.variant {
            ClosedLoopType::Off => nominal,
            ClosedLoopType::Luma => {
                let true_val = self.fwd_row(0, rgb_orig);
                let y = self.bisect_target(0, nominal, true_val, rgb_orig, |rgb_rec| {
                    rgb_rec[0] * self.fwd[0][0] + rgb_rec[1] * self.fwd[0][1] + rgb_rec[2] * self.fwd[0][2]
                });
                [y, nominal[1], nominal[2]]
            }
            ClosedLoopType::LumaChroma => {
                let mut ycc = nominal;
                for row in 0..3 {
                    let true_val = self.fwd_row(row, rgb_orig);
                    ycc[row] = self.bisect_target(row, ycc, true_val, rgb_orig, move |rgb_rec| {
                        rgb_rec[0] * self.fwd[row][0] + rgb_rec[1] * self.fwd[row][1] + rgb_rec[2] * self.fwd[row][2]
                    });
                }
                ycc
            }
            ClosedLoopType::Rgb => {
                let mut ycc = nominal;
                for (channel, component) in [(0usize, 0usize), (1, 1), (2, 2)] {
                    let true_val = rgb_orig[component];
                    ycc[channel] =
                        self.bisect_target(channel, ycc, true_val, rgb_orig, move |rgb_rec| rgb_rec[component]);
                }
                ycc
            }
            ClosedLoopType::Xyz => {
                let xyz_true = mat_mul(&RGB_TO_XYZ, rgb_orig);
                let mut ycc = nominal;
                for (channel, component) in [(0usize, 0usize), (1, 1), (2, 2)] {
                    let true_val = xyz_true[component];
                    ycc[channel] = self.bisect_target(channel, ycc, true_val, rgb_orig, move |rgb_rec| {
                        mat_mul(&RGB_TO_XYZ, rgb_rec)[component]
                    });
                }
                ycc
            }
        }
    }

    fn fwd_row(&self, row: usize, rgb: [f64; 3]) -> f64 {
        self.fwd[row][0] * rgb[0] + self.fwd[row][1] * rgb[1] + self.fwd[row][2] * rgb[2]
    }

    fn reconstruct_rgb(&self, ycc: [f64; 3]) -> [f64; 3] {
        let rgb_rec = mat_mul(&self.inv, ycc);
        [
            clip(rgb_rec[0], 0.0, 1.0),
            clip(rgb_rec[1], 0.0, 1.0),
            clip(rgb_rec[2], 0.0, 1.0),
        ]
    }

    /// The bisection skeleton shared by every variant: narrows `[min, max]`
    /// for the Y'CbCr slot at `channel`, holding the other two slots of
    /// `fixed` constant, comparing `eval(reconstructed RGB)` against
    /// `true_val` at each step, then picks between the two quantized
    /// boundaries per `self.objective`.
    fn bisect_target<F>(&self, channel: usize, fixed: [f64; 3], true_val: f64, rgb_orig: [f64; 3], eval: F) -> f64
    where
        F: Fn([f64; 3]) -> f64,
    {
        let mut lo = 0.0f64;
        let mut hi = 1.0f64;
        let iterations = match self.search {
            ClosedLoopSearch::Fast => 1,
            ClosedLoopSearch::Full => self.max_iterations,
        };

        let mut prev_boundary = f64::NAN;
        for _ in 0..iterations {
            let mid = (lo + hi) / 2.0;
            let mut probe = fixed;
            probe[channel] = mid;
            let conv = eval(self.reconstruct_rgb(probe));
            if conv < true_val {
                lo = mid;
            } else {
                hi = mid;
            }
            let candidate = ((lo + hi) / 2.0 * self.luma_weight).round() / self.luma_weight;
            if candidate == prev_boundary {
                lo = candidate;
                hi = candidate;
                break;
            }
            prev_boundary = candidate;
        }

        let lo_q = (lo * self.luma_weight).round() / self.luma_weight;
        let hi_q = (hi * self.luma_weight).round() / self.luma_weight;
        if lo_q == hi_q {
            return lo_q;
        }

        let mut probe_lo = fixed;
        probe_lo[channel] = lo_q;
        let mut probe_hi = fixed;
        probe_hi[channel] = hi_q;
        let rgb_lo = self.reconstruct_rgb(probe_lo);
        let rgb_hi = self.reconstruct_rgb(probe_hi);

        match self.objective {
            FinalObjective::LinearLight => {
                if (eval(rgb_lo) - true_val).abs() <= (eval(rgb_hi) - true_val).abs() {
                    lo_q
                } else {
                    hi_q
                }
            }
            FinalObjective::TfAndRgb => {
                let cost = |rgb_rec: [f64; 3]| -> f64 {
                    (self.tf.inverse(eval(rgb_rec)) - self.tf.inverse(true_val)).abs()
                        + (rgb_rec[0] - rgb_orig[0]).abs()
                        + (rgb_rec[1] - rgb_orig[1]).abs()
                        + (rgb_rec[2] - rgb_orig[2]).abs()
                };
                if cost(rgb_lo) <= cost(rgb_hi) {
                    lo_q
                } else {
                    hi_q
                }
            }
        }
    }
}

fn quantize_frame(src: &Frame, luma_weight: f64) -> Frame {
    let mut out = src.clone();
    for (c, plane) in src.planes.iter().enumerate() {
        let weight = if c == 0 { luma_weight } else { luma_weight };
        if let Plane::F32(p) = plane {
            let mut q = p.clone();
            for v in q.data.iter_mut() {
                *v = ((*v as f64 * weight).round() / weight) as f32;
            }
            out.planes[c] = Plane::F32(q);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::matrices::{matrix_pair, MatrixMode};
    use crate::frame::{test_format, TransferFunctionKind};

    fn make_float_frame(w: usize, h: usize, vals: [f32; 3]) -> Frame {
        let fmt = test_format(w, h, ChromaFormat::Cs444, true);
        let mut frame = Frame::new(fmt);
        for c in 0..3 {
            if let Plane::F32(p) = &mut frame.planes[c] {
                for v in p.data.iter_mut() {
                    *v = vals[c];
                }
            }
        }
        frame
    }

    #[test]
    fn bisection_terminates_within_max_iterations() {
        let tf = TransferFunction::create(TransferFunctionKind::Bt1886, false);
        let (fwd, inv) = matrix_pair(MatrixMode::Rgb709ToYuv709);
        let cl = ClosedLoop::new(
            &tf,
            fwd,
            inv,
            ClosedLoopType::Luma,
            ClosedLoopSearch::Full,
            FinalObjective::TfAndRgb,
            30,
            876.0,
        );
        let rgb = make_float_frame(8, 8, [0.4, 0.6, 0.2]);
        let ycbcr_fwd = crate::color::generic::ColorTransformGeneric::new(fwd, crate::frame::SampleRange::Full);
        let ycbcr = ycbcr_fwd.process(&rgb).unwrap();
        let out = cl.process(&ycbcr, &rgb).unwrap();
        assert_eq!(out.planes[0].width(), 8);
    }

    #[test]
    fn final_y_is_multiple_of_inverse_luma_weight() {
        let tf = TransferFunction::create(TransferFunctionKind::Bt1886, false);
        let (fwd, inv) = matrix_pair(MatrixMode::Rgb709ToYuv709);
        let luma_weight = 876.0;
        let cl = ClosedLoop::new(
            &tf,
            fwd,
            inv,
            ClosedLoopType::Luma,
            ClosedLoopSearch::Full,
            FinalObjective::TfAndRgb,
            30,
            luma_weight,
        );
        let rgb = make_float_frame(4, 4, [0.3, 0.3, 0.3]);
        let ycbcr_fwd = crate::color::generic::ColorTransformGeneric::new(fwd, crate::frame::SampleRange::Full);
        let ycbcr = ycbcr_fwd.process(&rgb).unwrap();
        let out = cl.process(&ycbcr, &rgb).unwrap();
        for &v in &out.planes[0].as_f32().data {
            let scaled = v as f64 * luma_weight;
            assert!((scaled - scaled.round()).abs() < 1e-3);
        }
    }

    #[test]
    fn luma_chroma_variant_rewrites_chroma_planes() {
        let tf = TransferFunction::create(TransferFunctionKind::Bt1886, false);
        let (fwd, inv) = matrix_pair(MatrixMode::Rgb709ToYuv709);
        let cl = ClosedLoop::new(
            &tf,
            fwd,
            inv,
            ClosedLoopType::LumaChroma,
            ClosedLoopSearch::Full,
            FinalObjective::TfAndRgb,
            30,
            876.0,
        );
        let rgb = make_float_frame(4, 4, [0.4, 0.6, 0.2]);
        let ycbcr_fwd = crate::color::generic::ColorTransformGeneric::new(fwd, crate::frame::SampleRange::Full);
        let ycbcr = ycbcr_fwd.process(&rgb).unwrap();
        let out = cl.process(&ycbcr, &rgb).unwrap();
        // A non-grey pixel has nonzero Cb'/Cr', so the LumaChroma search
        // should leave both planes populated with finite, quantized values.
        for c in 1..3 {
            for &v in &out.planes[c].as_f32().data {
                assert!(v.is_finite());
            }
        }
    }

    #[test]
    fn rgb_and_xyz_variants_run_to_completion() {
        let tf = TransferFunction::create(TransferFunctionKind::Bt1886, false);
        let (fwd, inv) = matrix_pair(MatrixMode::Rgb709ToYuv709);
        let rgb = make_float_frame(4, 4, [0.4, 0.6, 0.2]);
        let ycbcr_fwd = crate::color::generic::ColorTransformGeneric::new(fwd, crate::frame::SampleRange::Full);
        let ycbcr = ycbcr_fwd.process(&rgb).unwrap();

        for variant in [ClosedLoopType::Rgb, ClosedLoopType::Xyz] {
            let cl = ClosedLoop::new(
                &tf,
                fwd,
                inv,
                variant,
                ClosedLoopSearch::Full,
                FinalObjective::LinearLight,
                30,
                876.0,
            );
            let out = cl.process(&ycbcr, &rgb).unwrap();
            for c in 0..3 {
                for &v in &out.planes[c].as_f32().data {
                    assert!(v.is_finite());
                }
            }
        }
    }

    #[test]
    fn distinct_variants_do_not_collapse_to_the_same_output() {
        let tf = TransferFunction::create(TransferFunctionKind::Bt1886, false);
        let (fwd, inv) = matrix_pair(MatrixMode::Rgb709ToYuv709);
        let rgb = make_float_frame(4, 4, [0.4, 0.6, 0.2]);
        let ycbcr_fwd = crate::color::generic::ColorTransformGeneric::new(fwd, crate::frame::SampleRange::Full);
        let ycbcr = ycbcr_fwd.process(&rgb).unwrap();

        let run = |variant| {
            let cl = ClosedLoop::new(
                &tf,
                fwd,
                inv,
                variant,
                ClosedLoopSearch::Full,
                FinalObjective::LinearLight,
                30,
                876.0,
            );
            cl.process(&ycbcr, &rgb).unwrap()
        };

        let luma_out = run(ClosedLoopType::Luma);
        let rgb_out = run(ClosedLoopType::Rgb);
        let cb_differs = luma_out.planes[1].as_f32().data != rgb_out.planes[1].as_f32().data;
        let cr_differs = luma_out.planes[2].as_f32().data != rgb_out.planes[2].as_f32().data;
        assert!(cb_differs || cr_differs, "Rgb variant should search chroma unlike Luma");
    }
}
