//! Spatial resampling.
//!
//! `FrameScale` resizes every plane of a `Frame` independently (chroma
//! planes scale by the same ratio as luma, already expressed in their own
//! subsampled grid). Integer outputs round half-away-from-zero and clip to
//! the format's representable range; float outputs are left unclipped.
//!
//! The Catmull-Rom and Lanczos kernels follow the standard separable
//! resampling formulas, applied through the same [`Filter1D`] machinery the
//! chroma resampler uses.

use crate::filter1d::{Filter1D, FilterDescriptor};
use crate::frame::{Component, Frame, Plane, PlaneBuffer};
use crate::numeric::round_clip_i32;
use crate::params::ScaleMode;

fn catmull_rom_weight(x: f64) -> f64 {
    const A: f64 = -0.5;
    let x = x.abs();
    if x < 1.0 {
        (A + 2.0) * x.powi(3) - (A + 3.0) * x.powi(2) + 1.0
    } else if x < 2.0 {
        A * x.powi(3) - 5.0 * A * x.powi(2) + 8.0 * A * x - 4.0 * A
    } else {
        0.0
    }
}

fn lanczos_weight(x: f64, a: f64) -> f64 {
    if x == 0.0 {
        return 1.0;
    }
    if x.abs() >= a {
        return 0.0;
    }
    let px = std::f64::consts::PI * x;
    a * (px).sin() * (px / a).sin() / (px * px)
}

fn bicubic_descriptor() -> FilterDescriptor {
    let taps: Vec<f64> = (-1..=2).map(|i| catmull_rom_weight(i as f64)).collect();
    let mut fd = FilterDescriptor::symmetric(taps);
    fd.position_offset = 1.0;
    fd
}

fn lanczos_descriptor(a: usize) -> FilterDescriptor {
    let af = a as f64;
    let taps: Vec<f64> = (-(a as i32)..(a as i32)).map(|i| lanczos_weight(i as f64 + 0.5 - 0.5, af)).collect();
    let mut fd = FilterDescriptor::symmetric(taps);
    fd.position_offset = a as f64 - 0.5;
    fd
}

fn bilinear_descriptor() -> FilterDescriptor {
    FilterDescriptor::symmetric(vec![0.5, 0.5])
}

fn nearest_resample(data: &[f64], src_w: usize, src_h: usize, dst_w: usize, dst_h: usize) -> Vec<f64> {
    let mut out = vec![0.0; dst_w * dst_h];
    let sx = src_w as f64 / dst_w as f64;
    let sy = src_h as f64 / dst_h as f64;
    for y in 0..dst_h {
        let srcy = ((y as f64 + 0.5) * sy).floor().min(src_h as f64 - 1.0) as usize;
        for x in 0..dst_w {
            let srcx = ((x as f64 + 0.5) * sx).floor().min(src_w as f64 - 1.0) as usize;
            out[y * dst_w + x] = data[srcy * src_w + srcx];
        }
    }
    out
}

fn filter_resample(data: &[f64], src_w: usize, src_h: usize, dst_w: usize, dst_h: usize, fd: &FilterDescriptor) -> Vec<f64> {
    let f = Filter1D::new(fd);
    let sx = src_w as f64 / dst_w as f64;
    let sy = src_h as f64 / dst_h as f64;

    // Horizontal pass.
    let mut horiz = vec![0.0; dst_w * src_h];
    for y in 0..src_h {
        let row = &data[y * src_w..y * src_w + src_w];
        let resampled = f.apply_scaled(row, src_w, dst_w, sx, 0.0);
        horiz[y * dst_w..y * dst_w + dst_w].copy_from_slice(&resampled);
    }

    // Vertical pass.
    let mut out = vec![0.0; dst_w * dst_h];
    let mut col = vec![0.0; src_h];
    for x in 0..dst_w {
        for y in 0..src_h {
            col[y] = horiz[y * dst_w + x];
        }
        let resampled = f.apply_scaled(&col, src_h, dst_h, sy, 0.0);
        for y in 0..dst_h {
            out[y * dst_w + x] = resampled[y];
        }
    }
    out
}

fn plane_to_f64(p: &Plane) -> (Vec<f64>, usize, usize) {
    match p {
        Plane::U8(b) => (b.data.iter().map(|&v| v as f64).collect(), b.width, b.height),
        Plane::U16(b) => (b.data.iter().map(|&v| v as f64).collect(), b.width, b.height),
        Plane::F32(b) => (b.data.iter().map(|&v| v as f64).collect(), b.width, b.height),
    }
}

/// Resizes every plane of a `Frame` by the same spatial ratio.
pub struct FrameScale {
    mode: ScaleMode,
    lanczos_taps: usize,
}

impl FrameScale {
    pub fn new(mode: ScaleMode) -> Self {
        FrameScale {
            mode,
            lanczos_taps: 3,
        }
    }

    pub fn with_lanczos_taps(mut self, taps: usize) -> Self {
        self.lanczos_taps = taps;
        self
    }

    /// Resize `src` so its luma plane becomes `dst_width x dst_height`;
    /// chroma planes are resized at the same ratio, rounded to the
    /// chroma-format grid.
    pub fn process(&self, src: &Frame, dst_width: usize, dst_height: usize) -> Frame {
        let mut out_format = src.format.clone();
        out_format.width = dst_width;
        out_format.height = dst_height;
        let mut out = Frame::new(out_format);
        out.frame_no = src.frame_no;
        out.is_available = src.is_available;

        for (c, plane) in src.planes.iter().enumerate() {
            let (data, sw, sh) = plane_to_f64(plane);
            let (dw, dh) = (out.planes[c].width(), out.planes[c].height());
            let resampled = self.resample(&data, sw, sh, dw, dh);
            out.planes[c] = self.quantize_like(plane, resampled, dw, dh, if c == 0 { Component::Y } else { Component::U });
        }
        out
    }

    fn resample(&self, data: &[f64], sw: usize, sh: usize, dw: usize, dh: usize) -> Vec<f64> {
        if sw == dw && sh == dh {
            return data.to_vec();
        }
        match self.mode {
            ScaleMode::Null => data.to_vec(),
            ScaleMode::Nearest | ScaleMode::Half => nearest_resample(data, sw, sh, dw, dh),
            ScaleMode::Bilinear => filter_resample(data, sw, sh, dw, dh, &bilinear_descriptor()),
            ScaleMode::BiCubic => filter_resample(data, sw, sh, dw, dh, &bicubic_descriptor()),
            ScaleMode::Lanczos => filter_resample(data, sw, sh, dw, dh, &lanczos_descriptor(self.lanczos_taps)),
        }
    }

    fn quantize_like(&self, like: &Plane, data: Vec<f64>, width: usize, height: usize, comp: Component) -> Plane {
        let _ = comp;
        match like {
            Plane::U8(_) => {
                let mut buf = PlaneBuffer::<u8>::new(width, height);
                for (dst, &v) in buf.data.iter_mut().zip(data.iter()) {
                    *dst = round_clip_i32(v, 0, 255) as u8;
                }
                Plane::U8(buf)
            }
            Plane::U16(b) => {
                let max = (1u32 << 16) - 1;
                let _ = b;
                let mut buf = PlaneBuffer::<u16>::new(width, height);
                for (dst, &v) in buf.data.iter_mut().zip(data.iter()) {
                    *dst = round_clip_i32(v, 0, max as i32) as u16;
                }
                Plane::U16(buf)
            }
            Plane::F32(_) => {
                let mut buf = PlaneBuffer::<f32>::new(width, height);
                for (dst, &v) in buf.data.iter_mut().zip(data.iter()) {
                    *dst = v as f32;
                }
                Plane::F32(buf)
            }
        }
    }
}
