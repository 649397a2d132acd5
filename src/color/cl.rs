//! `ColorTransformCL`: true constant-luminance YCbCr, implementing the
//! `SAME_TF == 1` case as the sole normative definition of the luma
//! equation.

use crate::error::Result;
use crate::frame::{Frame, Plane, PlaneBuffer};
use crate::numeric::clip;
use crate::params::UseMinMax;
use crate::transfer::TransferFunction;

/// `kR`/`kG`/`kB` used by the constant-luminance luma equation; callers pick
/// these from the active color primaries' forward-matrix row (BT.2020's
/// `[0.2627, 0.6780, 0.0593]` is the common case, per Rec. ITU-R BT.2020
/// §5.2).
#[derive(Copy, Clone, Debug)]
pub struct LumaWeights {
    pub k_r: f64,
    pub k_g: f64,
    pub k_b: f64,
}

impl LumaWeights {
    pub const BT2020: LumaWeights = LumaWeights {
        k_r: 0.2627,
        k_g: 0.6780,
        k_b: 0.0593,
    };
}

pub struct ColorTransformCl<'a> {
    tf: &'a TransferFunction,
    weights: LumaWeights,
    use_min_max: UseMinMax,
}

impl<'a> ColorTransformCl<'a> {
    pub fn new(tf: &'a TransferFunction, weights: LumaWeights, use_min_max: UseMinMax) -> Self {
        ColorTransformCl {
            tf,
            weights,
            use_min_max,
        }
    }

    fn bounds(&self) -> (f64, f64, f64, f64) {
        let LumaWeights { k_r, k_g: _, k_b } = self.weights;
        let nb = self.tf.inverse(1.0 - k_b);
        let pb = 1.0 - self.tf.inverse(k_b);
        let nr = self.tf.inverse(1.0 - k_r);
        let pr = 1.0 - self.tf.inverse(k_r);
        match self.use_min_max {
            UseMinMax::Symmetric => {
                let b = nb.max(pb);
                let r = nr.max(pr);
                (b, b, r, r)
            }
            UseMinMax::Fixed => (0.7373, 0.7373, 0.9407, 0.9407),
            UseMinMax::Independent => (nb, pb, nr, pr),
        }
    }

    /// Forward transform: linear RGB -> true-constant-luminance Y'Cb'Cr'.
    pub fn forward(&self, src: &Frame) -> Result<Frame> {
        let mut dst = src.clone();
        let (w, h) = (src.planes[0].width(), src.planes[0].height());
        let r = src.planes[0].as_f32();
        let g = src.planes[1].as_f32();
        let b = src.planes[2].as_f32();
        let (nb, pb, nr, pr) = self.bounds();
        let LumaWeights { k_r, k_g, k_b } = self.weights;

        let mut oy = PlaneBuffer::<f32>::new(w, h);
        let mut ocb = PlaneBuffer::<f32>::new(w, h);
        let mut ocr = PlaneBuffer::<f32>::new(w, h);
        for i in 0..w * h {
            let (rl, gl, bl) = (r.data[i] as f64, g.data[i] as f64, b.data[i] as f64);
            let y_lin = k_r * rl + k_g * gl + k_b * bl;
            let yp = self.tf.inverse(y_lin);
            let bp = self.tf.inverse(bl);
            let rp = self.tf.inverse(rl);
            let db = bp - yp;
            let dr = rp - yp;
            let cb = if db <= 0.0 { db / (2.0 * nb) } else { db / (2.0 * pb) };
            let cr = if dr <= 0.0 { dr / (2.0 * nr) } else { dr / (2.0 * pr) };
            oy.data[i] = clip(yp, 0.0, 1.0) as f32;
            ocb.data[i] = clip(cb, -0.5, 0.5) as f32;
            ocr.data[i] = clip(cr, -0.5, 0.5) as f32;
        }
        dst.planes[0] = Plane::F32(oy);
        dst.planes[1] = Plane::F32(ocb);
        dst.planes[2] = Plane::F32(ocr);
        Ok(dst)
    }

    /// Inverse transform: Y'Cb'Cr' -> linear RGB, reversing the clipped
    /// forward formulas.
    pub fn inverse(&self, src: &Frame) -> Result<Frame> {
        let mut dst = src.clone();
        let (w, h) = (src.planes[0].width(), src.planes[0].height());
        let y = src.planes[0].as_f32();
        let cb = src.planes[1].as_f32();
        let cr = src.planes[2].as_f32();
        let (nb, pb, nr, pr) = self.bounds();
        let LumaWeights { k_r, k_g, k_b } = self.weights;

        let mut or_ = PlaneBuffer::<f32>::new(w, h);
        let mut og = PlaneBuffer::<f32>::new(w, h);
        let mut ob = PlaneBuffer::<f32>::new(w, h);
        for i in 0..w * h {
            let yp = y.data[i] as f64;
            let cbv = cb.data[i] as f64;
            let crv = cr.data[i] as f64;
            let db = if cbv <= 0.0 { cbv * 2.0 * nb } else { cbv * 2.0 * pb };
            let dr = if crv <= 0.0 { crv * 2.0 * nr } else { crv * 2.0 * pr };
            let bp = clip(yp + db, 0.0, 1.0);
            let rp = clip(yp + dr, 0.0, 1.0);
            let bl = self.tf.forward(bp);
            let rl = self.tf.forward(rp);
            let y_lin = self.tf.forward(yp);
            let gl = (y_lin - k_r * rl - k_b * bl) / k_g;
            or_.data[i] = clip(rl, 0.0, 1.0) as f32;
            og.data[i] = clip(gl, 0.0, 1.0) as f32;
            ob.data[i] = clip(bl, 0.0, 1.0) as f32;
        }
        dst.planes[0] = Plane::F32(or_);
        dst.planes[1] = Plane::F32(og);
        dst.planes[2] = Plane::F32(ob);
        Ok(dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{test_format, ChromaFormat, TransferFunctionKind};

    #[test]
    fn round_trips_through_forward_and_inverse() {
        let tf = TransferFunction::create(TransferFunctionKind::Bt1886, false);
        let cl = ColorTransformCl::new(&tf, LumaWeights::BT2020, UseMinMax::Independent);

        let fmt = test_format(4, 4, ChromaFormat::Cs444, true);
        let mut frame = Frame::new(fmt);
        for (c, base) in [(0usize, 0.3f32), (1, 0.5), (2, 0.7)] {
            if let Plane::F32(p) = &mut frame.planes[c] {
                for v in p.data.iter_mut() {
                    *v = base;
                }
            }
        }

        let ycbcr = cl.forward(&frame).unwrap();
        let rgb = cl.inverse(&ycbcr).unwrap();
        for c in 0..3 {
            let orig = frame.planes[c].as_f32();
            let back = rgb.planes[c].as_f32();
            for (a, b) in orig.data.iter().zip(back.data.iter()) {
                assert!((a - b).abs() < 1e-4, "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn gray_has_zero_chroma() {
        let tf = TransferFunction::create(TransferFunctionKind::Bt1886, false);
        let cl = ColorTransformCl::new(&tf, LumaWeights::BT2020, UseMinMax::Independent);
        let fmt = test_format(2, 2, ChromaFormat::Cs444, true);
        let mut frame = Frame::new(fmt);
        for c in 0..3 {
            if let Plane::F32(p) = &mut frame.planes[c] {
                for v in p.data.iter_mut() {
                    *v = 0.5;
                }
            }
        }
        let out = cl.forward(&frame).unwrap();
        for &v in &out.planes[1].as_f32().data {
            assert!(v.abs() < 1e-6);
        }
        for &v in &out.planes[2].as_f32().data {
            assert!(v.abs() < 1e-6);
        }
    }
}
