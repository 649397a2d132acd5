//! SSIM over the `Plane` model, with a configurable block size/distance
//! instead of a fixed 8x8/8 stride.

use crate::frame::{Frame, Plane};

const SSIM_K1: f64 = 0.01;
const SSIM_K2: f64 = 0.03;

fn plane_f64(p: &Plane) -> (Vec<f64>, usize, usize) {
    match p {
        Plane::U8(b) => (b.data.iter().map(|&v| v as f64).collect(), b.width, b.height),
        Plane::U16(b) => (b.data.iter().map(|&v| v as f64).collect(), b.width, b.height),
        Plane::F32(b) => (b.data.iter().map(|&v| v as f64).collect(), b.width, b.height),
    }
}

fn sample_max(p: &Plane, bit_depth: usize) -> f64 {
    match p {
        Plane::F32(_) => 1.0,
        _ => ((1u64 << bit_depth) - 1) as f64,
    }
}

/// Mean/variance/covariance moments over one block.
#[derive(Default, Clone, Copy)]
struct SsimMoments {
    mux: f64,
    muy: f64,
    x2: f64,
    xy: f64,
    y2: f64,
    n: usize,
}

fn block_moments(a: &[f64], b: &[f64], width: usize, x0: usize, y0: usize, bw: usize, bh: usize) -> SsimMoments {
    let mut m = SsimMoments::default();
    for dy in 0..bh {
        for dx in 0..bw {
            let idx = (y0 + dy) * width + (x0 + dx);
            let av = a[idx];
            let bv = b[idx];
            m.mux += av;
            m.muy += bv;
            m.x2 += av * av;
            m.y2 += bv * bv;
            m.xy += av * bv;
            m.n += 1;
        }
    }
    let n = m.n as f64;
    m.mux /= n;
    m.muy /= n;
    m.x2 = m.x2 / n - m.mux * m.mux;
    m.y2 = m.y2 / n - m.muy * m.muy;
    m.xy = m.xy / n - m.mux * m.muy;
    m
}

fn ssim_from_moments(m: &SsimMoments, c1: f64, c2: f64) -> f64 {
    let num = (2.0 * m.mux * m.muy + c1) * (2.0 * m.xy + c2);
    let den = (m.mux * m.mux + m.muy * m.muy + c1) * (m.x2 + m.y2 + c2);
    num / den
}

/// Plane-wide SSIM over `block_size` blocks spaced `distance` apart.
pub fn calculate_plane_ssim(
    ref_plane: &Plane,
    test_plane: &Plane,
    bit_depth: usize,
    block_size: (usize, usize),
    distance: usize,
) -> f64 {
    let (a, width, height) = plane_f64(ref_plane);
    let (b, _, _) = plane_f64(test_plane);
    let max = sample_max(ref_plane, bit_depth);
    let c1 = (SSIM_K1 * max).powi(2);
    let c2 = (SSIM_K2 * max).powi(2);
    let (bw, bh) = block_size;

    let mut sum = 0.0;
    let mut count = 0usize;
    let mut y = 0;
    while y + bh <= height {
        let mut x = 0;
        while x + bw <= width {
            let m = block_moments(&a, &b, width, x, y, bw, bh);
            sum += ssim_from_moments(&m, c1, c2);
            count += 1;
            x += distance.max(1);
        }
        y += distance.max(1);
    }
    if count == 0 {
        1.0
    } else {
        sum / count as f64
    }
}

/// Per-plane SSIM across the Y/U/V planes of a frame.
pub fn calculate_frame_ssim(ref_frame: &Frame, test_frame: &Frame, block_size: (usize, usize), distance: usize) -> (f64, f64, f64) {
    let bit_depth = ref_frame.format.bit_depth;
    let y = calculate_plane_ssim(&ref_frame.planes[0], &test_frame.planes[0], bit_depth, block_size, distance);
    if ref_frame.planes.len() < 3 {
        return (y, y, y);
    }
    let u = calculate_plane_ssim(&ref_frame.planes[1], &test_frame.planes[1], bit_depth, block_size, distance);
    let v = calculate_plane_ssim(&ref_frame.planes[2], &test_frame.planes[2], bit_depth, block_size, distance);
    (y, u, v)
}

/// Downscale-by-2 helper for MS-SSIM: sums (not averages) each 2x2 block.
pub fn msssim_downscale(data: &[f64], width: usize, height: usize) -> (Vec<f64>, usize, usize) {
    let dw = width / 2;
    let dh = height / 2;
    let mut out = vec![0.0; dw * dh];
    for y in 0..dh {
        for x in 0..dw {
            out[y * dw + x] = data[(2 * y) * width + 2 * x]
                + data[(2 * y) * width + 2 * x + 1]
                + data[(2 * y + 1) * width + 2 * x]
                + data[(2 * y + 1) * width + 2 * x + 1];
        }
    }
    (out, dw, dh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{test_format, ChromaFormat};

    #[test]
    fn identical_frames_give_ssim_one() {
        let fmt = test_format(16, 16, ChromaFormat::Cs444, false);
        let frame = Frame::new(fmt);
        let (y, u, v) = calculate_frame_ssim(&frame, &frame, (8, 8), 8);
        assert!((y - 1.0).abs() < 1e-6);
        assert!((u - 1.0).abs() < 1e-6);
        assert!((v - 1.0).abs() < 1e-6);
    }

    #[test]
    fn noisy_frame_reduces_ssim() {
        let fmt = test_format(16, 16, ChromaFormat::Cs444, false);
        let frame = Frame::new(fmt);
        let mut other = frame.clone();
        if let Plane::U16(p) = &mut other.planes[0] {
            for (i, v) in p.data.iter_mut().enumerate() {
                *v = (i % 64) as u16 * 8;
            }
        }
        let (y, _, _) = calculate_frame_ssim(&frame, &other, (8, 8), 8);
        assert!(y < 1.0);
    }
}
