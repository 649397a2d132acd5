//! mPSNR: fast exposure-stop enumeration. For each pixel,
//! only the integer exposure stops for which the 8-bit exposed sample lands
//! in `[0.5, 254.5]` are enumerated, rather than re-rendering the whole
//! frame once per candidate stop.

use crate::frame::Frame;

fn exposed_u8(linear: f64, stop: i32) -> f64 {
    255.0 * (2f64.powi(stop) * linear).max(0.0).powf(1.0 / 2.2)
}

/// Range of integer exposure stops for which `exposed_u8` lands in
/// `[0.5, 254.5]`, for a single linear sample.
fn valid_stops(linear: f64, c_min: i32, c_max: i32) -> Vec<i32> {
    (c_min..=c_max).filter(|&c| {
        let v = exposed_u8(linear, c);
        v >= 0.5 && v <= 254.5
    }).collect()
}

/// Accumulates SSE over all (pixel, stop) pairs across the RGB planes of
/// two linear-light float frames.
pub fn calculate_mpsnr(ref_frame: &Frame, test_frame: &Frame, c_min: i32, c_max: i32) -> f64 {
    let mut sse = 0.0f64;
    let mut n = 0usize;
    for c in 0..3.min(ref_frame.planes.len()) {
        let r = ref_frame.planes[c].as_f32();
        let t = test_frame.planes[c].as_f32();
        for i in 0..r.data.len() {
            let rv = r.data[i] as f64;
            let tv = t.data[i] as f64;
            let max_r = [
                ref_frame.planes[0].as_f32().data[i] as f64,
                ref_frame.planes.get(1).map(|p| p.as_f32().data[i] as f64).unwrap_or(rv),
                ref_frame.planes.get(2).map(|p| p.as_f32().data[i] as f64).unwrap_or(rv),
            ]
            .iter()
            .cloned()
            .fold(f64::MIN, f64::max);
            for stop in valid_stops(max_r, c_min, c_max) {
                let er = exposed_u8(rv, stop).clamp(0.0, 255.0);
                let et = exposed_u8(tv, stop).clamp(0.0, 255.0);
                let d = er - et;
                sse += d * d;
                n += 1;
            }
        }
    }
    if n == 0 || sse <= f64::EPSILON {
        100.0
    } else {
        10.0 * (255.0 * 255.0 / (sse / n as f64)).log10()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{test_format, ChromaFormat};

    #[test]
    fn identical_frames_report_capped_mpsnr() {
        let fmt = test_format(4, 4, ChromaFormat::Cs444, true);
        let frame = Frame::new(fmt);
        let out = calculate_mpsnr(&frame, &frame, -2, 2);
        assert_eq!(out, 100.0);
    }
}
