//! The frame-processing scheduler: a reader thread running ahead of the
//! operator chain, connected by a bounded channel.
//!
//! A `FrameReader` supplies frames one at a time from its own thread, each
//! operator in turn transforms the frame on the main thread, and a terminal
//! `FrameWriter` consumes the result — a read-process-write cycle
//! generalized into an arbitrary declaration-ordered operator chain. The
//! channel lets the reader decode frame `n+1` while the operators are still
//! working on frame `n`, rather than serializing I/O behind compute.

use crossbeam::channel::bounded;
use log::{error, info};

use crate::error::{HdrCoreError, Result};
use crate::frame::Frame;

/// Depth of the reader-readahead channel: how many decoded frames may sit
/// ahead of the operator chain before the reader thread blocks.
const READAHEAD_DEPTH: usize = 2;

/// Supplies frames to the pipeline. Implementations own
/// their own decode state; `read` must clear `Frame::is_available` on EOF
/// rather than returning an error. Runs on its own thread, so must be `Send`.
pub trait FrameReader: Send {
    fn read(&mut self, frame_index: u64) -> Result<Frame>;
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Consumes frames produced by the pipeline.
pub trait FrameWriter {
    fn write(&mut self, frame: &Frame, frame_index: u64) -> Result<()>;
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// One stage in the operator chain. Boxed so a `Pipeline` can hold a
/// heterogeneous, declaration-ordered list.
pub trait Operator: Send {
    /// Human-readable name used in error diagnostics.
    fn name(&self) -> &str;
    fn process(&mut self, src: &Frame) -> Result<Frame>;
}

/// Running totals the scheduler reports once the reader signals EOF.
#[derive(Debug, Default, Clone, Copy)]
pub struct PipelineStats {
    pub frames_processed: u64,
    pub frames_skipped: u64,
}

/// Owns the operator chain and drives it to completion over everything the
/// reader provides.
pub struct Pipeline {
    operators: Vec<Box<dyn Operator>>,
    start_frame: usize,
    frame_skip: usize,
    number_of_frames: Option<usize>,
}

impl Pipeline {
    pub fn new(operators: Vec<Box<dyn Operator>>) -> Self {
        Pipeline {
            operators,
            start_frame: 0,
            frame_skip: 0,
            number_of_frames: None,
        }
    }

    pub fn with_window(mut self, start_frame: usize, frame_skip: usize, number_of_frames: Option<usize>) -> Self {
        self.start_frame = start_frame;
        self.frame_skip = frame_skip;
        self.number_of_frames = number_of_frames;
        self
    }

    /// Runs the chain until the reader reports `is_available == false` or
    /// `number_of_frames` frames have been produced, applying operators in
    /// declaration order for each frame before advancing to the next.
    ///
    /// The reader runs on a scoped thread, decoding up to `READAHEAD_DEPTH`
    /// frames ahead of the operator chain over a bounded channel; the
    /// operators and writer stay on the calling thread.
    pub fn run(&mut self, reader: &mut dyn FrameReader, writer: &mut dyn FrameWriter) -> Result<PipelineStats> {
        let (tx, rx) = bounded::<std::result::Result<(Frame, u64), HdrCoreError>>(READAHEAD_DEPTH);
        let start_frame = self.start_frame as u64;
        let frame_skip = self.frame_skip as u64;
        let number_of_frames = self.number_of_frames;
        let operators = &mut self.operators;

        let run_result = crossbeam::thread::scope(|scope| {
            scope.spawn(move |_| {
                let mut frame_index = start_frame;
                let mut produced = 0usize;
                loop {
                    if let Some(limit) = number_of_frames {
                        if produced >= limit {
                            break;
                        }
                    }
                    let frame = match reader.read(frame_index) {
                        Ok(f) => f,
                        Err(e) => {
                            error!("pipeline: reader failed at frame {}: {}", frame_index, e);
                            let _ = tx.send(Err(e));
                            break;
                        }
                    };
                    if !frame.is_available {
                        break;
                    }
                    if tx.send(Ok((frame, frame_index))).is_err() {
                        break;
                    }
                    produced += 1;
                    frame_index += 1 + frame_skip;
                }
                if let Err(e) = reader.close() {
                    error!("pipeline: reader close failed: {}", e);
                }
            });

            let mut stats = PipelineStats::default();
            for item in rx.iter() {
                let (frame, frame_index) = item?;

                let mut current = frame;
                for op in operators.iter_mut() {
                    current = op.process(&current).map_err(|e| {
                        error!("pipeline: operator '{}' failed on frame {}: {}", op.name(), frame_index, e);
                        e
                    })?;
                }

                writer.write(&current, frame_index).map_err(|e| {
                    error!("pipeline: writer failed at frame {}: {}", frame_index, e);
                    e
                })?;

                stats.frames_processed += 1;
                stats.frames_skipped += frame_skip;
            }

            Ok(stats)
        })
        .expect("pipeline reader thread panicked");

        let stats = run_result?;
        writer.close()?;
        info!(
            "pipeline: completed run, {} frame(s) processed, {} skipped",
            stats.frames_processed, stats.frames_skipped
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{test_format, ChromaFormat};

    struct CountingReader {
        total: u64,
        format: crate::frame::FrameFormat,
    }

    impl FrameReader for CountingReader {
        fn read(&mut self, frame_index: u64) -> Result<Frame> {
            let mut f = Frame::new(self.format.clone());
            f.frame_no = frame_index;
            f.is_available = frame_index < self.total;
            Ok(f)
        }
    }

    struct NullWriter {
        written: Vec<u64>,
    }

    impl FrameWriter for NullWriter {
        fn write(&mut self, frame: &Frame, frame_index: u64) -> Result<()> {
            let _ = frame;
            self.written.push(frame_index);
            Ok(())
        }
    }

    struct Passthrough;
    impl Operator for Passthrough {
        fn name(&self) -> &str {
            "passthrough"
        }
        fn process(&mut self, src: &Frame) -> Result<Frame> {
            Ok(src.clone())
        }
    }

    struct AlwaysFails;
    impl Operator for AlwaysFails {
        fn name(&self) -> &str {
            "always-fails"
        }
        fn process(&mut self, _src: &Frame) -> Result<Frame> {
            Err(HdrCoreError::domain("synthetic failure"))
        }
    }

    #[test]
    fn runs_until_reader_signals_eof() {
        let fmt = test_format(4, 4, ChromaFormat::Cs420, false);
        let mut reader = CountingReader { total: 3, format: fmt };
        let mut writer = NullWriter { written: Vec::new() };
        let mut pipeline = Pipeline::new(vec![Box::new(Passthrough)]);
        let stats = pipeline.run(&mut reader, &mut writer).unwrap();
        assert_eq!(stats.frames_processed, 3);
        assert_eq!(writer.written, vec![0, 1, 2]);
    }

    #[test]
    fn operator_error_aborts_the_run() {
        let fmt = test_format(4, 4, ChromaFormat::Cs420, false);
        let mut reader = CountingReader { total: 3, format: fmt };
        let mut writer = NullWriter { written: Vec::new() };
        let mut pipeline = Pipeline::new(vec![Box::new(AlwaysFails)]);
        let result = pipeline.run(&mut reader, &mut writer);
        assert!(result.is_err());
        assert!(writer.written.is_empty());
    }

    #[test]
    fn number_of_frames_window_truncates_run() {
        let fmt = test_format(4, 4, ChromaFormat::Cs420, false);
        let mut reader = CountingReader { total: 100, format: fmt };
        let mut writer = NullWriter { written: Vec::new() };
        let mut pipeline = Pipeline::new(vec![Box::new(Passthrough)]).with_window(0, 0, Some(5));
        let stats = pipeline.run(&mut reader, &mut writer).unwrap();
        assert_eq!(stats.frames_processed, 5);
    }
}
