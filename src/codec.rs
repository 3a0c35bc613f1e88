use crate::{core::GrayFrame, error::InklapseResult};

/// Packed RGB24 frame as it comes off the decoder, row-major.
#[derive(Clone, Debug)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RawFrame {
    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }
}

/// Retry policy for fetching the late reference frame. Some decoders cannot
/// produce the last one or two frames of a stream; callers step back by
/// `step_back` effective indices per attempt, up to `max_attempts` times.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub step_back: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            step_back: 1,
        }
    }
}

/// Sequential frame source. Implementations apply any frame stride internally:
/// the reveal pipeline only ever sees the already-strided sequence, and
/// `frame_count`/`frame_at` speak post-stride ("effective") indices.
pub trait FrameSource {
    /// Effective number of frames this source will yield.
    fn frame_count(&mut self) -> InklapseResult<u32>;

    /// Raw frame count of the underlying stream before striding. Only used
    /// for diagnostics; sources without a stride report the effective count.
    fn total_frame_count(&mut self) -> InklapseResult<u32> {
        self.frame_count()
    }

    /// Next frame in sequence, or `None` at end of stream.
    fn next_frame(&mut self) -> InklapseResult<Option<RawFrame>>;

    /// One frame near the end of the stream, used once to build the reference
    /// mask. Implementations tolerate unreadable trailing indices by retrying
    /// progressively earlier ones; running out of stream is an error.
    fn frame_at(&mut self, index: u32) -> InklapseResult<RawFrame>;

    /// Reset so the next `next_frame` call yields frame 0 again.
    fn rewind(&mut self) -> InklapseResult<()>;
}

/// Sequential frame sink with a fixed frame rate taken from the source.
pub trait FrameSink {
    fn append(&mut self, frame: &GrayFrame) -> InklapseResult<()>;
}
