//! Opto-electronic / electro-optical transfer functions.
//!
//! Each curve exposes `forward` (linear -> nonlinear) and `inverse`
//! (nonlinear -> linear) over normalized `[0, 1]` values, with an optional
//! LUT-accelerated variant built once at construction time and reused across
//! an entire run.

use crate::frame::{Frame, Plane, TransferFunctionKind};
use crate::numeric::clip;
use log::warn;

const PQ_M1: f64 = 2610.0 / 16384.0;
const PQ_M2: f64 = 2523.0 * 128.0 / 4096.0;
const PQ_C1: f64 = 3424.0 / 4096.0;
const PQ_C2: f64 = 2413.0 * 32.0 / 4096.0;
const PQ_C3: f64 = 2392.0 * 32.0 / 4096.0;

/// Number of logarithmic bins for LUT acceleration.
const LUT_BINS: usize = 10;
/// Entries per bin.
const LUT_ENTRIES: usize = 10_000;

fn pq_forward(v: f64) -> f64 {
    // Linear (cd/m^2, normalized to peak 10000) -> PQ code value.
    let y = v.max(0.0);
    let ym1 = y.powf(PQ_M1);
    ((PQ_C1 + PQ_C2 * ym1) / (1.0 + PQ_C3 * ym1)).powf(PQ_M2)
}

fn pq_inverse(v: f64) -> f64 {
    let vm2 = v.max(0.0).powf(1.0 / PQ_M2);
    let num = (vm2 - PQ_C1).max(0.0);
    let den = PQ_C2 - PQ_C3 * vm2;
    (num / den).powf(1.0 / PQ_M1)
}

fn hlg_forward(v: f64) -> f64 {
    const A: f64 = 0.17883277;
    const B: f64 = 1.0 - 4.0 * A;
    const C: f64 = 0.5 - A * (4.0 * A).ln();
    if v <= 1.0 / 12.0 {
        (3.0 * v).sqrt()
    } else {
        A * (12.0 * v - B).ln() + C
    }
}

fn hlg_inverse(v: f64) -> f64 {
    const A: f64 = 0.17883277;
    const B: f64 = 1.0 - 4.0 * A;
    const C: f64 = 0.5 - A * (4.0 * A).ln();
    if v <= 0.5 {
        v * v / 3.0
    } else {
        (((v - C) / A).exp() + B) / 12.0
    }
}

fn bt709_forward(v: f64) -> f64 {
    if v < 0.018 {
        4.5 * v
    } else {
        1.099 * v.powf(0.45) - 0.099
    }
}

fn bt709_inverse(v: f64) -> f64 {
    if v < 0.081 {
        v / 4.5
    } else {
        ((v + 0.099) / 1.099).powf(1.0 / 0.45)
    }
}

fn bt1886_forward(v: f64) -> f64 {
    v.max(0.0).powf(1.0 / 2.4)
}

fn bt1886_inverse(v: f64) -> f64 {
    v.max(0.0).powf(2.4)
}

fn srgb_forward(v: f64) -> f64 {
    if v <= 0.0031308 {
        12.92 * v
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

fn srgb_inverse(v: f64) -> f64 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

fn st240_forward(v: f64) -> f64 {
    if v < 0.0228 {
        4.0 * v
    } else {
        1.1115 * v.powf(0.45) - 0.1115
    }
}

fn st240_inverse(v: f64) -> f64 {
    if v < 0.0913 {
        v / 4.0
    } else {
        ((v + 0.1115) / 1.1115).powf(1.0 / 0.45)
    }
}

/// A single logarithmic LUT bin: `base..base*10`, sampled uniformly with
/// `LUT_ENTRIES` entries.
#[derive(Clone, Debug)]
struct LogLut {
    bins: Vec<Vec<f64>>,
}

impl LogLut {
    fn build(f: impl Fn(f64) -> f64) -> Self {
        let mut bins = Vec::with_capacity(LUT_BINS);
        for b in 0..LUT_BINS {
            let lo = 10f64.powi(-(9 - b as i32));
            let hi = 10f64.powi(-(8 - b as i32)).min(1.0);
            let mut table = Vec::with_capacity(LUT_ENTRIES + 1);
            for i in 0..=LUT_ENTRIES {
                let t = lo + (hi - lo) * (i as f64 / LUT_ENTRIES as f64);
                table.push(f(t));
            }
            bins.push(table);
        }
        LogLut { bins }
    }

    fn lookup(&self, v: f64) -> f64 {
        if v <= 0.0 {
            return self.bins[0][0];
        }
        if v >= 1.0 {
            return *self.bins[LUT_BINS - 1].last().unwrap();
        }
        let exp = v.log10().floor() as i32;
        let bin = clip(exp + 9, 0, LUT_BINS as i32 - 1) as usize;
        let lo = 10f64.powi(exp.max(-9));
        let hi = (lo * 10.0).min(1.0);
        let frac = ((v - lo) / (hi - lo)).max(0.0).min(1.0);
        let pos = frac * LUT_ENTRIES as f64;
        let idx = pos.floor() as usize;
        let idx = idx.min(LUT_ENTRIES - 1);
        let t = pos - idx as f64;
        let table = &self.bins[bin];
        table[idx] * (1.0 - t) + table[idx + 1] * t
    }
}

/// A concrete electro-optical / opto-electronic transfer curve.
#[derive(Clone, Debug)]
pub struct TransferFunction {
    kind: TransferFunctionKind,
    forward_lut: Option<LogLut>,
    inverse_lut: Option<LogLut>,
}

impl TransferFunction {
    /// Build a curve, optionally precomputing its LUT acceleration tables
    /// eagerly.
    pub fn create(kind: TransferFunctionKind, enable_lut: bool) -> Self {
        let mut tf = TransferFunction {
            kind,
            forward_lut: None,
            inverse_lut: None,
        };
        if enable_lut && kind != TransferFunctionKind::Null {
            tf.forward_lut = Some(LogLut::build(|v| tf.compute_forward(v)));
            tf.inverse_lut = Some(LogLut::build(|v| tf.compute_inverse(v)));
        }
        tf
    }

    fn compute_forward(&self, v: f64) -> f64 {
        let v = clip(v, 0.0, 1.0);
        let out = match self.kind {
            TransferFunctionKind::Null => v,
            TransferFunctionKind::Pq => pq_forward(v),
            TransferFunctionKind::Hlg => hlg_forward(v),
            TransferFunctionKind::Bt709 => bt709_forward(v),
            TransferFunctionKind::Bt1886 => bt1886_forward(v),
            TransferFunctionKind::Srgb => srgb_forward(v),
            TransferFunctionKind::St240 => st240_forward(v),
            TransferFunctionKind::HybridPq | TransferFunctionKind::HybridPq2 => pq_forward(v),
            TransferFunctionKind::PqNoise => pq_forward(v),
            TransferFunctionKind::ComboPqPh10k => pq_forward(v),
        };
        clip(out, 0.0, 1.0)
    }

    fn compute_inverse(&self, v: f64) -> f64 {
        let v = clip(v, 0.0, 1.0);
        let out = match self.kind {
            TransferFunctionKind::Null => v,
            TransferFunctionKind::Pq => pq_inverse(v),
            TransferFunctionKind::Hlg => hlg_inverse(v),
            TransferFunctionKind::Bt709 => bt709_inverse(v),
            TransferFunctionKind::Bt1886 => bt1886_inverse(v),
            TransferFunctionKind::Srgb => srgb_inverse(v),
            TransferFunctionKind::St240 => st240_inverse(v),
            TransferFunctionKind::HybridPq | TransferFunctionKind::HybridPq2 => pq_inverse(v),
            TransferFunctionKind::PqNoise => pq_inverse(v),
            TransferFunctionKind::ComboPqPh10k => pq_inverse(v),
        };
        clip(out, 0.0, 1.0)
    }

    /// Linear -> nonlinear, clipped to `[0, 1]`.
    pub fn forward(&self, v: f64) -> f64 {
        match &self.forward_lut {
            Some(lut) => lut.lookup(clip(v, 0.0, 1.0)),
            None => self.compute_forward(v),
        }
    }

    /// Nonlinear -> linear, clipped to `[0, 1]`.
    pub fn inverse(&self, v: f64) -> f64 {
        match &self.inverse_lut {
            Some(lut) => lut.lookup(clip(v, 0.0, 1.0)),
            None => self.compute_inverse(v),
        }
    }

    /// Broadcast [`forward`](Self::forward) across one plane of a float
    /// `Frame`, preserving shape.
    pub fn forward_frame(&self, dst: &mut Frame, src: &Frame, component: usize) {
        self.broadcast(dst, src, component, true);
    }

    /// Broadcast [`inverse`](Self::inverse) across one plane of a float
    /// `Frame`, preserving shape.
    pub fn inverse_frame(&self, dst: &mut Frame, src: &Frame, component: usize) {
        self.broadcast(dst, src, component, false);
    }

    fn broadcast(&self, dst: &mut Frame, src: &Frame, component: usize, is_forward: bool) {
        if !src.format.is_float || !dst.format.is_float {
            warn!("TransferFunction::broadcast called on a non-float frame; domain clip applies silently");
        }
        let src_plane = src.planes[component].as_f32();
        let n = src_plane.data.len();
        let mut out = vec![0.0f32; n];
        for i in 0..n {
            let v = src_plane.data[i] as f64;
            out[i] = if is_forward {
                self.forward(v)
            } else {
                self.inverse(v)
            } as f32;
        }
        if let Plane::F32(p) = &mut dst.planes[component] {
            p.data.copy_from_slice(&out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_kinds() -> Vec<TransferFunctionKind> {
        vec![
            TransferFunctionKind::Null,
            TransferFunctionKind::Pq,
            TransferFunctionKind::Hlg,
            TransferFunctionKind::Bt709,
            TransferFunctionKind::Bt1886,
            TransferFunctionKind::Srgb,
            TransferFunctionKind::St240,
        ]
    }

    #[test]
    fn null_round_trip_no_lut() {
        for kind in all_kinds() {
            let tf = TransferFunction::create(kind, false);
            let mut v = 0.0;
            while v <= 1.0 {
                let rt = tf.forward(tf.inverse(v));
                assert!(
                    (rt - v).abs() < 1e-9,
                    "{:?} round trip failed at {}: {}",
                    kind,
                    v,
                    rt
                );
                v += 0.01;
            }
        }
    }

    #[test]
    fn null_round_trip_with_lut() {
        for kind in all_kinds() {
            let tf = TransferFunction::create(kind, true);
            let mut v = 0.01;
            while v <= 0.99 {
                let rt = tf.forward(tf.inverse(v));
                assert!(
                    (rt - v).abs() < 1e-4,
                    "{:?} LUT round trip failed at {}: {}",
                    kind,
                    v,
                    rt
                );
                v += 0.01;
            }
        }
    }

    #[test]
    fn pq_forward_black_and_white() {
        let tf = TransferFunction::create(TransferFunctionKind::Pq, false);
        assert!(tf.forward(0.0).abs() < 1e-12);
        // forward(1.0) should map to 1.0 (10000 cd/m^2 = PQ peak).
        assert!((tf.forward(1.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn identity_curve_is_exact() {
        let tf = TransferFunction::create(TransferFunctionKind::Null, false);
        for v in [0.0, 0.25, 0.5, 0.75, 1.0] {
            assert_eq!(tf.forward(v), v);
            assert_eq!(tf.inverse(v), v);
        }
    }
}
