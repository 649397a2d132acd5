//! ΔE / CIEDE2000. Wraps [`super::de2000`] with an RGB -> XYZ -> Lab
//! conversion written against the standard D65 sRGB-white formulas.

use crate::frame::Frame;
use crate::metrics::de2000::{KSubArgs, DE2000};
use lab::Lab;

const RGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.4124564, 0.3575761, 0.1804375],
    [0.2126729, 0.7151522, 0.0721750],
    [0.0193339, 0.1191920, 0.9503041],
];

/// D65 reference white plus three synthetic alternates four-slot
/// `deltaEPointsEnable` mask can select between.
pub const REFERENCE_WHITES: [[f64; 3]; 4] = [
    [0.95047, 1.00000, 1.08883], // D65
    [0.96422, 1.00000, 0.82521], // D50
    [1.09850, 1.00000, 0.35585], // A (incandescent)
    [0.95682, 1.00000, 0.92149], // D55
];

fn rgb_to_xyz(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    (
        RGB_TO_XYZ[0][0] * r + RGB_TO_XYZ[0][1] * g + RGB_TO_XYZ[0][2] * b,
        RGB_TO_XYZ[1][0] * r + RGB_TO_XYZ[1][1] * g + RGB_TO_XYZ[1][2] * b,
        RGB_TO_XYZ[2][0] * r + RGB_TO_XYZ[2][1] * g + RGB_TO_XYZ[2][2] * b,
    )
}

fn lab_f(t: f64) -> f64 {
    const DELTA: f64 = 6.0 / 29.0;
    if t > DELTA.powi(3) {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

fn xyz_to_lab(x: f64, y: f64, z: f64, white: [f64; 3]) -> Lab {
    let fx = lab_f(x / white[0]);
    let fy = lab_f(y / white[1]);
    let fz = lab_f(z / white[2]);
    Lab {
        l: (116.0 * fy - 16.0) as f32,
        a: (500.0 * (fx - fy)) as f32,
        b: (200.0 * (fy - fz)) as f32,
    }
}

/// Max CIEDE2000 across the frame for a single reference white.
fn max_delta_e_for_white(ref_frame: &Frame, test_frame: &Frame, white: [f64; 3]) -> f64 {
    let r1 = ref_frame.planes[0].as_f32();
    let g1 = ref_frame.planes[1].as_f32();
    let b1 = ref_frame.planes[2].as_f32();
    let r2 = test_frame.planes[0].as_f32();
    let g2 = test_frame.planes[1].as_f32();
    let b2 = test_frame.planes[2].as_f32();

    let mut max_de = 0.0f32;
    for i in 0..r1.data.len() {
        let (x1, y1, z1) = rgb_to_xyz(r1.data[i] as f64, g1.data[i] as f64, b1.data[i] as f64);
        let (x2, y2, z2) = rgb_to_xyz(r2.data[i] as f64, g2.data[i] as f64, b2.data[i] as f64);
        let lab1 = xyz_to_lab(x1, y1, z1, white);
        let lab2 = xyz_to_lab(x2, y2, z2, white);
        let de = DE2000::new(lab1, lab2, KSubArgs { l: 1.0, c: 1.0, h: 1.0 });
        if de > max_de {
            max_de = de;
        }
    }
    max_de as f64
}

/// For up to four reference whites selected by `points_enable` (bit `i` ->
/// [`REFERENCE_WHITES`]`[i]`), the max CIEDE2000 across the frame.
pub fn calculate_delta_e(ref_frame: &Frame, test_frame: &Frame, points_enable: u8) -> Vec<f64> {
    (0..4)
        .filter(|i| points_enable & (1 << i) != 0)
        .map(|i| max_delta_e_for_white(ref_frame, test_frame, REFERENCE_WHITES[i]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{test_format, ChromaFormat, Plane};

    #[test]
    fn identical_frames_give_zero_delta_e() {
        let fmt = test_format(4, 4, ChromaFormat::Cs444, true);
        let frame = Frame::new(fmt);
        let result = calculate_delta_e(&frame, &frame, 0b0001);
        assert_eq!(result.len(), 1);
        assert!(result[0] < 1e-3);
    }

    #[test]
    fn differing_frames_give_positive_delta_e() {
        let fmt = test_format(2, 2, ChromaFormat::Cs444, true);
        let frame = Frame::new(fmt);
        let mut other = frame.clone();
        if let Plane::F32(p) = &mut other.planes[0] {
            for v in p.data.iter_mut() {
                *v = 1.0;
            }
        }
        let result = calculate_delta_e(&frame, &other, 0b0001);
        assert!(result[0] > 0.0);
    }

    #[test]
    fn mask_selects_number_of_whites() {
        let fmt = test_format(2, 2, ChromaFormat::Cs444, true);
        let frame = Frame::new(fmt);
        let result = calculate_delta_e(&frame, &frame, 0b0011);
        assert_eq!(result.len(), 2);
    }
}
