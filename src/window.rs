use crate::{
    core::GrayFrame,
    error::{InklapseError, InklapseResult},
};

/// Bounded FIFO over the currently visible slice of the stream.
///
/// Holds between `block_len` and `2 * block_len` preprocessed frames while
/// input remains; indices `0..block_len` are the front block about to be
/// finalized, the remainder is lookahead. The buffer may shrink below
/// `2 * block_len` only once the stream is exhausted.
#[derive(Debug)]
pub struct WindowBuffer {
    width: u32,
    height: u32,
    block_len: usize,
    frames: Vec<GrayFrame>,
}

impl WindowBuffer {
    pub fn new(width: u32, height: u32, block_len: usize) -> InklapseResult<Self> {
        if block_len == 0 {
            return Err(InklapseError::validation("block length must be >= 1"));
        }
        if width == 0 || height == 0 {
            return Err(InklapseError::validation(
                "window frame dimensions must be non-zero",
            ));
        }
        Ok(Self {
            width,
            height,
            block_len,
            frames: Vec::with_capacity(2 * block_len),
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn block_len(&self) -> usize {
        self.block_len
    }

    pub fn capacity(&self) -> usize {
        2 * self.block_len
    }

    /// Append up to one block of frames. Exceeding `2 * block_len` total or
    /// pushing a frame of the wrong size is a validation error.
    pub fn push_block(&mut self, block: Vec<GrayFrame>) -> InklapseResult<()> {
        if block.len() > self.block_len {
            return Err(InklapseError::validation(format!(
                "block of {} frames exceeds block length {}",
                block.len(),
                self.block_len
            )));
        }
        if self.frames.len() + block.len() > self.capacity() {
            return Err(InklapseError::validation(format!(
                "window would hold {} frames, capacity is {}",
                self.frames.len() + block.len(),
                self.capacity()
            )));
        }
        for frame in block {
            if frame.width != self.width || frame.height != self.height {
                return Err(InklapseError::validation(format!(
                    "frame size mismatch: got {}x{}, expected {}x{}",
                    frame.width, frame.height, self.width, self.height
                )));
            }
            self.frames.push(frame);
        }
        Ok(())
    }

    /// Discard the oldest `n` frames.
    pub fn drop_front(&mut self, n: usize) -> InklapseResult<()> {
        if n > self.frames.len() {
            return Err(InklapseError::validation(format!(
                "cannot drop {} frames from a window of {}",
                n,
                self.frames.len()
            )));
        }
        self.frames.drain(..n);
        Ok(())
    }

    pub fn frame(&self, index: usize) -> &GrayFrame {
        &self.frames[index]
    }

    pub fn frame_mut(&mut self, index: usize) -> &mut GrayFrame {
        &mut self.frames[index]
    }

    /// Per-frame pixel planes, front first. The scheduler's inner loop scans
    /// one pixel column across these slices with plain index arithmetic.
    pub fn planes(&self) -> Vec<&[u8]> {
        self.frames.iter().map(|f| f.data.as_slice()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(value: u8) -> GrayFrame {
        GrayFrame::filled(2, 2, value)
    }

    #[test]
    fn rejects_zero_block_length() {
        assert!(WindowBuffer::new(2, 2, 0).is_err());
    }

    #[test]
    fn push_drop_cycle_preserves_length_invariants() {
        let mut win = WindowBuffer::new(2, 2, 3).unwrap();
        win.push_block(vec![frame(0), frame(1), frame(2)]).unwrap();
        win.push_block(vec![frame(3), frame(4), frame(5)]).unwrap();
        assert_eq!(win.len(), 6);

        win.drop_front(3).unwrap();
        assert_eq!(win.len(), 3);
        assert_eq!(win.frame(0).data[0], 3);

        win.push_block(vec![frame(6), frame(7), frame(8)]).unwrap();
        assert_eq!(win.len(), win.capacity());
    }

    #[test]
    fn never_exceeds_two_blocks() {
        let mut win = WindowBuffer::new(2, 2, 2).unwrap();
        win.push_block(vec![frame(0), frame(1)]).unwrap();
        win.push_block(vec![frame(2), frame(3)]).unwrap();
        assert!(win.push_block(vec![frame(4)]).is_err());
        assert!(win.push_block(vec![frame(4), frame(5), frame(6)]).is_err());
    }

    #[test]
    fn rejects_mismatched_frame_size() {
        let mut win = WindowBuffer::new(2, 2, 2).unwrap();
        assert!(win.push_block(vec![GrayFrame::filled(3, 2, 0)]).is_err());
    }

    #[test]
    fn partial_final_block_is_allowed() {
        let mut win = WindowBuffer::new(2, 2, 3).unwrap();
        win.push_block(vec![frame(0), frame(1), frame(2)]).unwrap();
        win.push_block(vec![frame(3)]).unwrap();
        assert_eq!(win.len(), 4);
    }
}
