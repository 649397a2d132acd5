//! Blockiness metrics: J.341-style and "block-activity"
//! blockiness. Both integrate transferred-luminance gradients along each
//! axis, collapse to per-row/per-column activity vectors, subsample every
//! other line, and compare reference against test through a soft sigmoid.

use crate::frame::{Frame, Plane};
use crate::transfer::TransferFunction;

fn transferred_luminance(plane: &Plane, tf: &TransferFunction) -> (Vec<f64>, usize, usize) {
    match plane {
        Plane::F32(p) => (p.data.iter().map(|&v| tf.forward(v as f64)).collect(), p.width, p.height),
        Plane::U16(p) => (p.data.iter().map(|&v| tf.forward(v as f64 / 65535.0)).collect(), p.width, p.height),
        Plane::U8(p) => (p.data.iter().map(|&v| tf.forward(v as f64 / 255.0)).collect(), p.width, p.height),
    }
}

fn row_activity(data: &[f64], width: usize, height: usize) -> Vec<f64> {
    let mut activity = vec![0.0; height];
    for y in 0..height {
        let mut acc = 0.0;
        for x in 1..width {
            acc += (data[y * width + x] - data[y * width + x - 1]).abs();
        }
        activity[y] = acc;
    }
    activity
}

fn column_activity(data: &[f64], width: usize, height: usize) -> Vec<f64> {
    let mut activity = vec![0.0; width];
    for x in 0..width {
        let mut acc = 0.0;
        for y in 1..height {
            acc += (data[y * width + x] - data[(y - 1) * width + x]).abs();
        }
        activity[x] = acc;
    }
    activity
}

fn subsample_every_other(v: &[f64]) -> Vec<f64> {
    v.iter().step_by(2).copied().collect()
}

fn soft_sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn activity_distance(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let mut acc = 0.0;
    for i in 0..n {
        acc += soft_sigmoid((a[i] - b[i]).abs());
    }
    acc / n as f64
}

/// J.341-style blockiness: gradient activity collapsed per row/column,
/// subsampled, then compared through the soft sigmoid.
pub fn calculate_blockiness_j341(ref_frame: &Frame, test_frame: &Frame, tf: &TransferFunction) -> f64 {
    let (rdata, w, h) = transferred_luminance(&ref_frame.planes[0], tf);
    let (tdata, _, _) = transferred_luminance(&test_frame.planes[0], tf);

    let r_rows = subsample_every_other(&row_activity(&rdata, w, h));
    let t_rows = subsample_every_other(&row_activity(&tdata, w, h));
    let r_cols = subsample_every_other(&column_activity(&rdata, w, h));
    let t_cols = subsample_every_other(&column_activity(&tdata, w, h));

    (activity_distance(&r_rows, &t_rows) + activity_distance(&r_cols, &t_cols)) / 2.0
}

/// Block-activity blockiness: the same gradient-activity pipeline, but
/// without the J.341 subsampling step, emphasizing sub-block boundaries
/// rather than 8x8 grid alignment.
pub fn calculate_block_activity(ref_frame: &Frame, test_frame: &Frame, tf: &TransferFunction) -> f64 {
    let (rdata, w, h) = transferred_luminance(&ref_frame.planes[0], tf);
    let (tdata, _, _) = transferred_luminance(&test_frame.planes[0], tf);

    let r_rows = row_activity(&rdata, w, h);
    let t_rows = row_activity(&tdata, w, h);
    let r_cols = column_activity(&rdata, w, h);
    let t_cols = column_activity(&tdata, w, h);

    (activity_distance(&r_rows, &t_rows) + activity_distance(&r_cols, &t_cols)) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{test_format, ChromaFormat, TransferFunctionKind};

    #[test]
    fn identical_frames_give_zero_blockiness() {
        let tf = TransferFunction::create(TransferFunctionKind::Bt1886, false);
        let fmt = test_format(16, 16, ChromaFormat::Cs444, false);
        let frame = Frame::new(fmt);
        let out = calculate_blockiness_j341(&frame, &frame, &tf);
        assert!((out - 0.5).abs() < 1e-6); // sigmoid(0) == 0.5 on flat input
    }
}
