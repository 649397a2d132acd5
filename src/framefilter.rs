//! Frame filtering: 2-D separable Wiener-in-dark denoising and NL-means.
//!
//! NL-means reuses the per-displacement squared-difference integral image in
//! [`crate::numeric`] so a patch distance is an O(1) lookup instead of an
//! O(patch-area) sum per candidate.

use crate::filter1d::{Filter1D, FilterDescriptor};
use crate::frame::{Frame, Plane, PlaneBuffer};
use crate::numeric::{clip, squared_diff_integral_image, integral_window_sum};
use rayon::prelude::*;

const PATCH_RADIUS: isize = 3; // patch size 7
const SEARCH_RADIUS: isize = 3; // search range 7
const DECAY_TABLE_SIZE: usize = 128;

fn plane_to_f32(p: &Plane) -> (Vec<f32>, usize, usize) {
    match p {
        Plane::U8(b) => (b.data.iter().map(|&v| v as f32).collect(), b.width, b.height),
        Plane::U16(b) => (b.data.iter().map(|&v| v as f32).collect(), b.width, b.height),
        Plane::F32(b) => (b.data.clone(), b.width, b.height),
    }
}

fn write_like(like: &Plane, data: Vec<f32>, width: usize, height: usize) -> Plane {
    match like {
        Plane::U8(_) => {
            let mut buf = PlaneBuffer::<u8>::new(width, height);
            for (dst, &v) in buf.data.iter_mut().zip(data.iter()) {
                *dst = clip(v.round() as i32, 0, 255) as u8;
            }
            Plane::U8(buf)
        }
        Plane::U16(_) => {
            let mut buf = PlaneBuffer::<u16>::new(width, height);
            for (dst, &v) in buf.data.iter_mut().zip(data.iter()) {
                *dst = clip(v.round() as i32, 0, 65535) as u16;
            }
            Plane::U16(buf)
        }
        Plane::F32(_) => {
            let mut buf = PlaneBuffer::<f32>::new(width, height);
            buf.data.copy_from_slice(&data);
            Plane::F32(buf)
        }
    }
}

/// 2-D separable filter with an optional edge-adaptive blend back toward
/// the original sample near strong local gradients ("Wiener-in-dark").
pub struct WienerInDark {
    pub horizontal: FilterDescriptor,
    pub vertical: FilterDescriptor,
    pub edge_adaptive: bool,
    pub thres0: f64,
    pub thres1: f64,
    pub range: f64,
}

impl WienerInDark {
    pub fn process(&self, src: &Frame, component: usize) -> Frame {
        let mut dst = src.clone();
        let (data, w, h) = plane_to_f32(&src.planes[component]);
        let data64: Vec<f64> = data.iter().map(|&v| v as f64).collect();

        let hf = Filter1D::new(&self.horizontal);
        let mut horiz = vec![0.0; w * h];
        for y in 0..h {
            let row = &data64[y * w..y * w + w];
            let out_row = hf.apply(row, w);
            horiz[y * w..y * w + w].copy_from_slice(&out_row);
        }

        let vf = Filter1D::new(&self.vertical);
        let mut filtered = vec![0.0; w * h];
        let mut col = vec![0.0; h];
        for x in 0..w {
            for y in 0..h {
                col[y] = horiz[y * w + x];
            }
            let out_col = vf.apply(&col, h);
            for y in 0..h {
                filtered[y * w + x] = out_col[y];
            }
        }

        let mut out = vec![0.0f32; w * h];
        for i in 0..w * h {
            let in_v = data64[i];
            let f_v = filtered[i];
            let final_v = if self.edge_adaptive && (in_v - f_v).abs() > self.thres0 && (in_v - f_v).abs() <= self.thres1 {
                let delta = (in_v - f_v).abs().min(self.thres1);
                (delta * in_v + (self.range - delta) * f_v) / self.range
            } else {
                f_v
            };
            out[i] = final_v as f32;
        }
        dst.planes[component] = write_like(&src.planes[component], out, w, h);
        dst
    }
}

fn build_decay_table(factor: f64) -> Vec<f64> {
    (0..DECAY_TABLE_SIZE)
        .map(|i| (-(i as f64) * factor / DECAY_TABLE_SIZE as f64).exp())
        .collect()
}

/// Buades-style non-local means with patch size 7, search range 7.
pub struct NlMeans {
    pub decay_factor: f64,
}

impl NlMeans {
    pub fn process(&self, src: &Frame, component: usize) -> Frame {
        let mut dst = src.clone();
        let (data, w, h) = plane_to_f32(&src.planes[component]);
        let decay = build_decay_table(self.decay_factor);

        // Precompute one integral image per displacement in [-3, 3]^2.
        let mut integrals = Vec::new();
        for dy in -SEARCH_RADIUS..=SEARCH_RADIUS {
            for dx in -SEARCH_RADIUS..=SEARCH_RADIUS {
                let img = squared_diff_integral_image(&data, &data, w, h, dx, dy);
                integrals.push(((dx, dy), img));
            }
        }

        // Rows are independent, so this is split across threads the same
        // way the pipeline's concurrency model allows intra-operator
        // data-parallelism.
        let mut out = vec![0.0f32; w * h];
        out.par_chunks_mut(w).enumerate().for_each(|(y, out_row)| {
            for x in 0..w {
                let mut weight_sum = 0.0f64;
                let mut accum = 0.0f64;
                for ((dx, dy), img) in &integrals {
                    let bx = x as isize + dx;
                    let by = y as isize + dy;
                    if bx < 0 || bx >= w as isize || by < 0 || by >= h as isize {
                        continue;
                    }
                    let x0 = (x as isize - PATCH_RADIUS).max(0) as usize;
                    let x1 = (x as isize + PATCH_RADIUS + 1).min(w as isize) as usize;
                    let y0 = (y as isize - PATCH_RADIUS).max(0) as usize;
                    let y1 = (y as isize + PATCH_RADIUS + 1).min(h as isize) as usize;
                    let d = integral_window_sum(img, w, x0, y0, x1, y1);
                    let patch_area = ((x1 - x0) * (y1 - y0)).max(1) as f64;
                    let d_norm = d / patch_area;
                    let idx = (d_norm.min((DECAY_TABLE_SIZE - 1) as f64)) as usize;
                    let wgt = decay[idx];
                    weight_sum += wgt;
                    accum += wgt * data[by as usize * w + bx as usize] as f64;
                }
                out_row[x] = if weight_sum > 0.0 {
                    (accum / weight_sum) as f32
                } else {
                    data[y * w + x]
                };
            }
        });
        dst.planes[component] = write_like(&src.planes[component], out, w, h);
        dst
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{test_format, ChromaFormat};

    #[test]
    fn wiener_flat_input_stays_flat() {
        let fmt = test_format(8, 8, ChromaFormat::Cs444, false);
        let mut frame = Frame::new(fmt);
        if let Plane::U16(p) = &mut frame.planes[0] {
            for v in p.data.iter_mut() {
                *v = 500;
            }
        }
        let filter = WienerInDark {
            horizontal: FilterDescriptor::symmetric(vec![0.25, 0.5, 0.25]),
            vertical: FilterDescriptor::symmetric(vec![0.25, 0.5, 0.25]),
            edge_adaptive: true,
            thres0: 2.0,
            thres1: 5.0,
            range: 255.0,
        };
        let out = filter.process(&frame, 0);
        for &v in &out.planes[0].as_u16().data {
            assert_eq!(v, 500);
        }
    }

    #[test]
    fn nlmeans_flat_input_stays_flat() {
        let fmt = test_format(8, 8, ChromaFormat::Cs444, false);
        let mut frame = Frame::new(fmt);
        if let Plane::U16(p) = &mut frame.planes[0] {
            for v in p.data.iter_mut() {
                *v = 500;
            }
        }
        let filter = NlMeans { decay_factor: 10.0 };
        let out = filter.process(&frame, 0);
        for &v in &out.planes[0].as_u16().data {
            assert_eq!(v, 500);
        }
    }
}
