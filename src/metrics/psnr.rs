//! PSNR and regional (worst-block) PSNR over the `Frame`/`Plane` model.

use crate::frame::{Frame, Plane};
use crate::numeric::StatRecord;

/// Per-plane PSNR plus the combined-plane weighted average, `avg`.
#[derive(Debug, Clone, Copy)]
pub struct PlanarPsnr {
    pub y: f64,
    pub u: f64,
    pub v: f64,
    pub avg: f64,
}

fn plane_sq_err(a: &Plane, b: &Plane) -> (f64, usize) {
    match (a, b) {
        (Plane::U8(pa), Plane::U8(pb)) => {
            let sse: f64 = pa.data.iter().zip(pb.data.iter()).map(|(&x, &y)| {
                let d = x as f64 - y as f64;
                d * d
            }).sum();
            (sse, pa.data.len())
        }
        (Plane::U16(pa), Plane::U16(pb)) => {
            let sse: f64 = pa.data.iter().zip(pb.data.iter()).map(|(&x, &y)| {
                let d = x as f64 - y as f64;
                d * d
            }).sum();
            (sse, pa.data.len())
        }
        (Plane::F32(pa), Plane::F32(pb)) => {
            let sse: f64 = pa.data.iter().zip(pb.data.iter()).map(|(&x, &y)| {
                let d = (x - y) as f64;
                d * d
            }).sum();
            (sse, pa.data.len())
        }
        _ => panic!("PSNR requires matching plane types"),
    }
}

fn sample_max(p: &Plane, bit_depth: usize) -> f64 {
    match p {
        Plane::F32(_) => 1.0,
        _ => ((1u64 << bit_depth) - 1) as f64,
    }
}

/// PSNR in dB; an exact match (`sq_err == 0`) is `+inf`, matching
/// `PSNR(ref, ref)`.
pub fn calculate_psnr(sq_err: f64, n: usize, max: f64) -> f64 {
    if sq_err == 0.0 {
        return f64::INFINITY;
    }
    let mse = sq_err / n as f64;
    10.0 * (max * max / mse).log10()
}

/// Classical per-plane PSNR between two equal-typed 4:4:4 or subsampled
/// frames.
pub fn calculate_frame_psnr(ref_frame: &Frame, test_frame: &Frame) -> PlanarPsnr {
    let bit_depth = ref_frame.format.bit_depth;
    let (sse_y, n_y) = plane_sq_err(&ref_frame.planes[0], &test_frame.planes[0]);
    let max_y = sample_max(&ref_frame.planes[0], bit_depth);
    let psnr_y = calculate_psnr(sse_y, n_y, max_y);

    if ref_frame.planes.len() < 3 {
        return PlanarPsnr { y: psnr_y, u: psnr_y, v: psnr_y, avg: psnr_y };
    }

    let (sse_u, n_u) = plane_sq_err(&ref_frame.planes[1], &test_frame.planes[1]);
    let (sse_v, n_v) = plane_sq_err(&ref_frame.planes[2], &test_frame.planes[2]);
    let max_c = sample_max(&ref_frame.planes[1], bit_depth);
    let psnr_u = calculate_psnr(sse_u, n_u, max_c);
    let psnr_v = calculate_psnr(sse_v, n_v, max_c);

    let total_sse = sse_y + sse_u + sse_v;
    let total_n = n_y + n_u + n_v;
    let avg = calculate_psnr(total_sse, total_n, max_y);

    PlanarPsnr { y: psnr_y, u: psnr_u, v: psnr_v, avg }
}

/// Accumulates PSNR across a sequence of frames as per-plane running
/// `StatRecord`s.
#[derive(Default)]
pub struct PsnrAccumulator {
    pub y: StatRecord,
    pub u: StatRecord,
    pub v: StatRecord,
    pub avg: StatRecord,
}

impl PsnrAccumulator {
    pub fn new() -> Self {
        PsnrAccumulator {
            y: StatRecord::new(),
            u: StatRecord::new(),
            v: StatRecord::new(),
            avg: StatRecord::new(),
        }
    }

    pub fn update(&mut self, frame_result: PlanarPsnr) {
        self.y.update(frame_result.y);
        self.u.update(frame_result.u);
        self.v.update(frame_result.v);
        self.avg.update(frame_result.avg);
    }
}

/// Worst `block_size x block_size` subregion's PSNR, with a configurable
/// overlap step. Operates on the luma plane.
pub fn regional_psnr_worst_block(
    ref_frame: &Frame,
    test_frame: &Frame,
    block_size: (usize, usize),
    step: (usize, usize),
) -> f64 {
    let (bw, bh) = block_size;
    let (sw, sh) = step;
    let ry = ref_frame.planes[0].as_f64_plane();
    let ty = test_frame.planes[0].as_f64_plane();
    let width = ref_frame.planes[0].width();
    let height = ref_frame.planes[0].height();
    let bit_depth = ref_frame.format.bit_depth;
    let max = sample_max(&ref_frame.planes[0], bit_depth);

    let mut worst = f64::INFINITY;
    let mut y = 0;
    while y + bh <= height {
        let mut x = 0;
        while x + bw <= width {
            let mut sse = 0.0;
            for dy in 0..bh {
                for dx in 0..bw {
                    let idx = (y + dy) * width + (x + dx);
                    let d = ry[idx] - ty[idx];
                    sse += d * d;
                }
            }
            let psnr = calculate_psnr(sse, bw * bh, max);
            if psnr < worst {
                worst = psnr;
            }
            x += sw.max(1);
        }
        y += sh.max(1);
    }
    worst
}

trait AsF64Plane {
    fn as_f64_plane(&self) -> Vec<f64>;
}

impl AsF64Plane for Plane {
    fn as_f64_plane(&self) -> Vec<f64> {
        match self {
            Plane::U8(p) => p.data.iter().map(|&v| v as f64).collect(),
            Plane::U16(p) => p.data.iter().map(|&v| v as f64).collect(),
            Plane::F32(p) => p.data.iter().map(|&v| v as f64).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{test_format, ChromaFormat};

    #[test]
    fn identical_frames_report_infinite_psnr() {
        let fmt = test_format(8, 8, ChromaFormat::Cs444, false);
        let frame = Frame::new(fmt);
        let result = calculate_frame_psnr(&frame, &frame);
        assert_eq!(result.y, f64::INFINITY);
    }

    #[test]
    fn single_bit_flip_gives_finite_psnr() {
        let fmt = test_format(8, 8, ChromaFormat::Cs444, false);
        let frame = Frame::new(fmt);
        let mut other = frame.clone();
        if let Plane::U16(p) = &mut other.planes[0] {
            p.data[0] = 1;
        }
        let result = calculate_frame_psnr(&frame, &other);
        assert!(result.y.is_finite() && result.y > 0.0);
    }

    #[test]
    fn stat_record_min_is_infinite_after_identical_frame() {
        let fmt = test_format(8, 8, ChromaFormat::Cs444, false);
        let frame = Frame::new(fmt);
        let mut acc = PsnrAccumulator::new();
        acc.update(calculate_frame_psnr(&frame, &frame));
        assert_eq!(acc.y.min(), f64::INFINITY);
    }
}
