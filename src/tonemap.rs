//! Tone mapping: Roll, CIE1931, BT2390 (ICtCp), and BT2390-IPT. Every
//! operator runs in linear-light RGB, float only, and clips to `[0, 1]` on
//! output.

use crate::error::{HdrCoreError, Result};
use crate::frame::{Frame, Plane, PlaneBuffer};
use crate::numeric::clip;
use crate::transfer::TransferFunction;

/// Shared BT.2390 Bézier knee used by CIE1931, BT2390 and
/// BT2390-IPT alike on whichever single channel they each choose to bend.
fn bezier_knee(e: f64, max_intensity: f64) -> f64 {
    let ks = 1.5 * max_intensity - 0.5;
    if e < ks {
        return e;
    }
    let t = (e - ks) / (1.0 - ks);
    let t2 = t * t;
    let t3 = t * t2;
    (t3 - t2 - t + 1.0) * ks + (t3 - 2.0 * t2 + t) + (-2.0 * t3 + 3.0 * t2) * max_intensity
}

fn xyz_to_xyy(x: f64, y: f64, z: f64) -> (f64, f64, f64) {
    let sum = x + y + z;
    if sum <= 0.0 {
        (0.0, 0.0, y)
    } else {
        (x / sum, y / sum, y)
    }
}

fn xyy_to_xyz(cx: f64, cy: f64, yy: f64) -> (f64, f64, f64) {
    if cy <= 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let x = cx * yy / cy;
    let z = (1.0 - cx - cy) * yy / cy;
    (x, yy, z)
}

const RGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.4124564, 0.3575761, 0.1804375],
    [0.2126729, 0.7151522, 0.0721750],
    [0.0193339, 0.1191920, 0.9503041],
];

const XYZ_TO_RGB: [[f64; 3]; 3] = [
    [3.2404542, -1.5371385, -0.4985314],
    [-0.9692660, 1.8760108, 0.0415560],
    [0.0556434, -0.2040259, 1.0572252],
];

fn mat_mul(m: &[[f64; 3]; 3], v: (f64, f64, f64)) -> (f64, f64, f64) {
    (
        m[0][0] * v.0 + m[0][1] * v.1 + m[0][2] * v.2,
        m[1][0] * v.0 + m[1][1] * v.1 + m[1][2] * v.2,
        m[2][0] * v.0 + m[2][1] * v.1 + m[2][2] * v.2,
    )
}

/// LMS <-> ICtCp matrices per Rec. ITU-R BT.2100.
const RGB_TO_LMS: [[f64; 3]; 3] = [
    [1688.0 / 4096.0, 2146.0 / 4096.0, 262.0 / 4096.0],
    [683.0 / 4096.0, 2951.0 / 4096.0, 462.0 / 4096.0],
    [99.0 / 4096.0, 309.0 / 4096.0, 3688.0 / 4096.0],
];

const LMS_TO_RGB: [[f64; 3]; 3] = [
    [3.43661, -2.50645, 0.069984],
    [-0.791330, 1.983600, -0.192271],
    [-0.025949, -0.098914, 1.124863],
];

const LMSP_TO_ICTCP: [[f64; 3]; 3] = [
    [0.5, 0.5, 0.0],
    [1.61376953125, -3.323486328125, 1.709716796875],
    [4.378173828125, -4.24560546875, -0.132568359375],
];

const ICTCP_TO_LMSP: [[f64; 3]; 3] = [
    [1.0, 0.00860904, 0.11103678],
    [1.0, -0.00860904, -0.11103678],
    [1.0, 0.56003134, -0.32062717],
];

/// IPT matrices (Ebner & Fairchild 1998), used by BT2390-IPT.
const LMSP_TO_IPT: [[f64; 3]; 3] = [
    [0.4000, 0.4000, 0.2000],
    [4.4550, -4.8510, 0.3960],
    [0.8056, 0.3572, -1.1628],
];

const IPT_TO_LMSP: [[f64; 3]; 3] = [
    [1.0, 0.0976, 0.2052],
    [1.0, -0.1139, 0.1332],
    [1.0, 0.0326, -0.6769],
];

fn apply_pointwise(f: impl Fn(f64) -> f64, v: f64) -> f64 {
    f(v)
}

/// Gamma roll-off above `min_value`.
pub struct RollToneMap {
    pub min_value: f64,
    pub max_value: f64,
    pub target_value: f64,
    pub gamma: f64,
}

impl RollToneMap {
    pub fn process(&self, src: &Frame) -> Result<Frame> {
        process_per_channel(src, |v| {
            if v <= self.min_value {
                v
            } else {
                let norm = (v - self.min_value) / (self.max_value - self.min_value);
                norm.max(0.0).powf(1.0 / self.gamma) * (self.target_value - self.min_value) + self.min_value
            }
        })
    }
}

/// CIE1931 xyY knee with optional gamut scaling.
pub struct Cie1931ToneMap {
    pub max_intensity: f64,
    pub scale_gamut: bool,
}

impl Cie1931ToneMap {
    pub fn process(&self, src: &Frame) -> Result<Frame> {
        require_float_rgb(src)?;
        let (w, h) = (src.planes[0].width(), src.planes[0].height());
        let r = src.planes[0].as_f32();
        let g = src.planes[1].as_f32();
        let b = src.planes[2].as_f32();
        let mut dst = src.clone();
        let mut or_ = PlaneBuffer::<f32>::new(w, h);
        let mut og = PlaneBuffer::<f32>::new(w, h);
        let mut ob = PlaneBuffer::<f32>::new(w, h);
        for i in 0..w * h {
            let rgb = (r.data[i] as f64, g.data[i] as f64, b.data[i] as f64);
            let (x, y, z) = mat_mul(&RGB_TO_XYZ, rgb);
            let (mut cx, mut cy, yy) = xyz_to_xyy(x, y, z);
            let yy2 = bezier_knee(yy, self.max_intensity);
            if self.scale_gamut && yy > 0.0 {
                let s = (yy2 / yy).min(yy / yy2.max(1e-9));
                cx = 0.3127 + (cx - 0.3127) * s;
                cy = 0.3290 + (cy - 0.3290) * s;
            }
            let (x2, y2, z2) = xyy_to_xyz(cx, cy, yy2);
            let out_rgb = mat_mul(&XYZ_TO_RGB, (x2, y2, z2));
            or_.data[i] = clip(out_rgb.0, 0.0, 1.0) as f32;
            og.data[i] = clip(out_rgb.1, 0.0, 1.0) as f32;
            ob.data[i] = clip(out_rgb.2, 0.0, 1.0) as f32;
        }
        dst.planes[0] = Plane::F32(or_);
        dst.planes[1] = Plane::F32(og);
        dst.planes[2] = Plane::F32(ob);
        Ok(dst)
    }
}

/// BT2390 knee applied in ICtCp, preserving chroma hue.
pub struct Bt2390ToneMap<'a> {
    pub max_intensity: f64,
    pub pq: &'a TransferFunction,
}

impl<'a> Bt2390ToneMap<'a> {
    pub fn process(&self, src: &Frame) -> Result<Frame> {
        require_float_rgb(src)?;
        process_in_space(src, &RGB_TO_LMS, &LMS_TO_RGB, &LMSP_TO_ICTCP, &ICTCP_TO_LMSP, self.pq, self.max_intensity)
    }
}

/// BT2390 knee applied in IPT instead of ICtCp.
pub struct Bt2390IptToneMap<'a> {
    pub max_intensity: f64,
    pub pq: &'a TransferFunction,
}

impl<'a> Bt2390IptToneMap<'a> {
    pub fn process(&self, src: &Frame) -> Result<Frame> {
        require_float_rgb(src)?;
        process_in_space(src, &RGB_TO_LMS, &LMS_TO_RGB, &LMSP_TO_IPT, &IPT_TO_LMSP, self.pq, self.max_intensity)
    }
}

fn process_in_space(
    src: &Frame,
    rgb_to_lms: &[[f64; 3]; 3],
    lms_to_rgb: &[[f64; 3]; 3],
    lmsp_to_target: &[[f64; 3]; 3],
    target_to_lmsp: &[[f64; 3]; 3],
    pq: &TransferFunction,
    max_intensity: f64,
) -> Result<Frame> {
    let (w, h) = (src.planes[0].width(), src.planes[0].height());
    let r = src.planes[0].as_f32();
    let g = src.planes[1].as_f32();
    let b = src.planes[2].as_f32();
    let mut dst = src.clone();
    let mut or_ = PlaneBuffer::<f32>::new(w, h);
    let mut og = PlaneBuffer::<f32>::new(w, h);
    let mut ob = PlaneBuffer::<f32>::new(w, h);
    for i in 0..w * h {
        let rgb = (r.data[i] as f64, g.data[i] as f64, b.data[i] as f64);
        let lms = mat_mul(rgb_to_lms, rgb);
        let lmsp = (pq.inverse(lms.0), pq.inverse(lms.1), pq.inverse(lms.2));
        let target = mat_mul(lmsp_to_target, lmsp);
        let i_knee = bezier_knee(target.0, max_intensity);
        let target2 = (i_knee, target.1, target.2);
        let lmsp2 = mat_mul(target_to_lmsp, target2);
        let lms2 = (
            pq.forward(lmsp2.0),
            pq.forward(lmsp2.1),
            pq.forward(lmsp2.2),
        );
        let out_rgb = mat_mul(lms_to_rgb, lms2);
        or_.data[i] = clip(out_rgb.0, 0.0, 1.0) as f32;
        og.data[i] = clip(out_rgb.1, 0.0, 1.0) as f32;
        ob.data[i] = clip(out_rgb.2, 0.0, 1.0) as f32;
    }
    dst.planes[0] = Plane::F32(or_);
    dst.planes[1] = Plane::F32(og);
    dst.planes[2] = Plane::F32(ob);
    Ok(dst)
}

fn require_float_rgb(src: &Frame) -> Result<()> {
    if !src.format.is_float {
        return Err(HdrCoreError::type_mismatch("tone mapping requires a float frame"));
    }
    Ok(())
}

fn process_per_channel(src: &Frame, f: impl Fn(f64) -> f64) -> Result<Frame> {
    require_float_rgb(src)?;
    let mut dst = src.clone();
    for c in 0..3 {
        let plane = src.planes[c].as_f32();
        let mut out = PlaneBuffer::<f32>::new(plane.width, plane.height);
        for (o, &v) in out.data.iter_mut().zip(plane.data.iter()) {
            *o = clip(apply_pointwise(&f, v as f64), 0.0, 1.0) as f32;
        }
        dst.planes[c] = Plane::F32(out);
    }
    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{test_format, ChromaFormat, TransferFunctionKind};

    fn flat_frame(v: f32) -> Frame {
        let fmt = test_format(4, 4, ChromaFormat::Cs444, true);
        let mut frame = Frame::new(fmt);
        for c in 0..3 {
            if let Plane::F32(p) = &mut frame.planes[c] {
                for x in p.data.iter_mut() {
                    *x = v;
                }
            }
        }
        frame
    }

    #[test]
    fn roll_below_min_is_identity() {
        let tm = RollToneMap {
            min_value: 0.5,
            max_value: 1.0,
            target_value: 1.0,
            gamma: 2.0,
        };
        let frame = flat_frame(0.3);
        let out = tm.process(&frame).unwrap();
        assert!((out.planes[0].as_f32().data[0] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn roll_rejects_integer_frame() {
        let tm = RollToneMap {
            min_value: 0.5,
            max_value: 1.0,
            target_value: 1.0,
            gamma: 2.0,
        };
        let fmt = test_format(2, 2, ChromaFormat::Cs444, false);
        let frame = Frame::new(fmt);
        assert!(tm.process(&frame).is_err());
    }

    #[test]
    fn cie1931_output_is_clipped() {
        let tm = Cie1931ToneMap {
            max_intensity: 0.8,
            scale_gamut: false,
        };
        let frame = flat_frame(1.0);
        let out = tm.process(&frame).unwrap();
        for c in 0..3 {
            for &v in &out.planes[c].as_f32().data {
                assert!((0.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn bt2390_preserves_gray_achromaticity() {
        let pq = TransferFunction::create(TransferFunctionKind::Pq, false);
        let tm = Bt2390ToneMap {
            max_intensity: 0.8,
            pq: &pq,
        };
        let frame = flat_frame(0.5);
        let out = tm.process(&frame).unwrap();
        let r = out.planes[0].as_f32().data[0];
        let g = out.planes[1].as_f32().data[0];
        let b = out.planes[2].as_f32().data[0];
        assert!((r - g).abs() < 1e-3);
        assert!((g - b).abs() < 1e-3);
    }
}
