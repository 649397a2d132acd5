//! TF-SSIM: RGB/4:4:4-only. Converts to XYZ, maps the Y
//! channel through a transfer function (PQ by default), then runs the
//! ordinary SSIM kernel on the mapped luminance.

use crate::error::{HdrCoreError, Result};
use crate::frame::{ChromaFormat, Frame, Plane, PlaneBuffer};
use crate::metrics::ssim::calculate_plane_ssim;
use crate::transfer::TransferFunction;

const RGB_TO_XYZ_Y_ROW: [f64; 3] = [0.2126729, 0.7151522, 0.0721750];

/// Maps a 4:4:4 RGB float frame's luminance through `tf.forward` and
/// returns a synthetic plane usable by [`calculate_plane_ssim`].
fn mapped_luminance_plane(frame: &Frame, tf: &TransferFunction) -> Plane {
    let r = frame.planes[0].as_f32();
    let g = frame.planes[1].as_f32();
    let b = frame.planes[2].as_f32();
    let mut out = PlaneBuffer::<f32>::new(r.width, r.height);
    for i in 0..r.data.len() {
        let y = RGB_TO_XYZ_Y_ROW[0] * r.data[i] as f64
            + RGB_TO_XYZ_Y_ROW[1] * g.data[i] as f64
            + RGB_TO_XYZ_Y_ROW[2] * b.data[i] as f64;
        out.data[i] = tf.forward(y) as f32;
    }
    Plane::F32(out)
}

/// TF-SSIM between two RGB 4:4:4 float frames.
pub fn calculate_tf_ssim(ref_frame: &Frame, test_frame: &Frame, tf: &TransferFunction, block_size: (usize, usize), distance: usize) -> Result<f64> {
    if ref_frame.format.chroma_format != ChromaFormat::Cs444 || !ref_frame.format.is_float {
        return Err(HdrCoreError::unsupported("TF-SSIM requires a 4:4:4 float RGB frame"));
    }
    let ref_y = mapped_luminance_plane(ref_frame, tf);
    let test_y = mapped_luminance_plane(test_frame, tf);
    Ok(calculate_plane_ssim(&ref_y, &test_y, 0, block_size, distance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{test_format, TransferFunctionKind};

    #[test]
    fn identical_frames_give_ssim_one() {
        let tf = TransferFunction::create(TransferFunctionKind::Pq, false);
        let fmt = test_format(8, 8, ChromaFormat::Cs444, true);
        let frame = Frame::new(fmt);
        let out = calculate_tf_ssim(&frame, &frame, &tf, (4, 4), 4).unwrap();
        assert!((out - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_non_float_frame() {
        let tf = TransferFunction::create(TransferFunctionKind::Pq, false);
        let fmt = test_format(8, 8, ChromaFormat::Cs444, false);
        let frame = Frame::new(fmt);
        assert!(calculate_tf_ssim(&frame, &frame, &tf, (4, 4), 4).is_err());
    }
}
