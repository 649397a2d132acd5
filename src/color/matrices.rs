//! Static forward/inverse 3x3 color matrix table.
//!
//! Coefficients are the literal doubles from BT.709, BT.2020, SMPTE RP 177
//! and friends (`kR`/`kG`/`kB` BT.2020 row, `NB`/`PB`/`NR`/`PR` derivations
//! live in [`super::cl`] since they also depend on the active transfer
//! function).

/// A 3x3 row-major matrix.
pub type Mat3 = [[f64; 3]; 3];

pub fn mat_mul(m: &Mat3, v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

pub fn invert3(m: &Mat3) -> Mat3 {
    let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
    let inv_det = 1.0 / det;
    [
        [
            (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
        ],
        [
            (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
        ],
        [
            (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
        ],
    ]
}

/// Selects a forward matrix / matrix-pair from the static table.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MatrixMode {
    Identity,
    Rgb709ToYuv709,
    Rgb2020ToYuv2020,
    Rgb2020ToYuv2020HighPrecision,
    RgbP3D65ToYuvP3D65,
    Rgb601ToYuv601,
    RgbExtToYuvExt,
    Rgb709ToXyz,
    Rgb2020ToXyz,
    RgbP3D65ToXyz,
    RgbToYCoCg,
    RgbToAmt,
}

const IDENTITY: Mat3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// BT.709 kR/kG/kB row (Rec. ITU-R BT.709-6 §3.2).
const BT709: Mat3 = [
    [0.2126, 0.7152, 0.0722],
    [-0.114572, -0.385428, 0.5],
    [0.5, -0.454153, -0.045847],
];

/// BT.2020 non-constant-luminance row (Rec. ITU-R BT.2020 §4).
const BT2020: Mat3 = [
    [0.2627, 0.6780, 0.0593],
    [-0.139630, -0.360370, 0.5],
    [0.5, -0.459786, -0.040214],
];

/// Higher-precision BT.2020 coefficients, selected via `useHighPrecision`.
const BT2020_HP: Mat3 = [
    [0.262698338956556, 0.678008765772817, 0.059292895270627],
    [-0.139609902970104, -0.360392314738787, 0.5],
    [0.5, -0.459784529010777, -0.040215470989223],
];

const P3D65: Mat3 = [
    [0.2289829594805102, 0.6917432234965022, 0.0792738170229877],
    [-0.1284097724006127, -0.3715927793755758, 0.5],
    [0.5, -0.4554203564892908, -0.0445796435107092],
];

const BT601: Mat3 = [
    [0.299, 0.587, 0.114],
    [-0.168736, -0.331264, 0.5],
    [0.5, -0.418688, -0.081312],
];

const EXT: Mat3 = BT709;

const RGB709_TO_XYZ: Mat3 = [
    [0.4124564, 0.3575761, 0.1804375],
    [0.2126729, 0.7151522, 0.0721750],
    [0.0193339, 0.1191920, 0.9503041],
];

const RGB2020_TO_XYZ: Mat3 = [
    [0.6369580, 0.1446169, 0.1688810],
    [0.2627002, 0.6779981, 0.0593017],
    [0.0000000, 0.0280727, 1.0609851],
];

const RGBP3D65_TO_XYZ: Mat3 = [
    [0.4865709, 0.2656677, 0.1982173],
    [0.2289746, 0.6917385, 0.0792869],
    [0.0000000, 0.0451134, 1.0439444],
];

const RGB_TO_YCOCG: Mat3 = [[0.25, 0.5, 0.25], [0.5, 0.0, -0.5], [-0.25, 0.5, -0.25]];

/// Additive-Mix-Transform: identity-adjacent matrix used by the original
/// source's `RGB_2_AMT` mode.
const RGB_TO_AMT: Mat3 = [[1.0, 0.0, 0.0], [-1.0, 1.0, 0.0], [0.0, -1.0, 1.0]];

/// Returns `(forward, inverse)` for the given mode.
pub fn matrix_pair(mode: MatrixMode) -> (Mat3, Mat3) {
    let fwd = match mode {
        MatrixMode::Identity => IDENTITY,
        MatrixMode::Rgb709ToYuv709 => BT709,
        MatrixMode::Rgb2020ToYuv2020 => BT2020,
        MatrixMode::Rgb2020ToYuv2020HighPrecision => BT2020_HP,
        MatrixMode::RgbP3D65ToYuvP3D65 => P3D65,
        MatrixMode::Rgb601ToYuv601 => BT601,
        MatrixMode::RgbExtToYuvExt => EXT,
        MatrixMode::Rgb709ToXyz => RGB709_TO_XYZ,
        MatrixMode::Rgb2020ToXyz => RGB2020_TO_XYZ,
        MatrixMode::RgbP3D65ToXyz => RGBP3D65_TO_XYZ,
        MatrixMode::RgbToYCoCg => RGB_TO_YCOCG,
        MatrixMode::RgbToAmt => RGB_TO_AMT,
    };
    (fwd, invert3(&fwd))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_round_trips() {
        let (f, inv) = matrix_pair(MatrixMode::Identity);
        let v = mat_mul(&f, [0.3, 0.6, 0.9]);
        let back = mat_mul(&inv, v);
        for (a, b) in back.iter().zip([0.3, 0.6, 0.9].iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn bt709_round_trips() {
        let (f, inv) = matrix_pair(MatrixMode::Rgb709ToYuv709);
        let rgb = [0.2, 0.5, 0.8];
        let yuv = mat_mul(&f, rgb);
        let back = mat_mul(&inv, yuv);
        for (a, b) in back.iter().zip(rgb.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn bt2020_high_precision_close_to_standard() {
        let (f1, _) = matrix_pair(MatrixMode::Rgb2020ToYuv2020);
        let (f2, _) = matrix_pair(MatrixMode::Rgb2020ToYuv2020HighPrecision);
        for i in 0..3 {
            for j in 0..3 {
                assert!((f1[i][j] - f2[i][j]).abs() < 1e-4);
            }
        }
    }
}
