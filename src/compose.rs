use crate::{
    codec::FrameSink,
    core::{Fps, GrayFrame},
    error::{InklapseError, InklapseResult},
    schedule::TransitionMatrix,
};

pub const INK_VALUE: u8 = 0;
pub const PAPER_VALUE: u8 = 255;

/// Synthesizes output frames from the transition matrix and decides which
/// frames are worth emitting.
#[derive(Clone, Copy, Debug)]
pub struct OutputComposer {
    pub only_ink_frames: bool,
}

impl OutputComposer {
    /// Causal rendering rule: a pixel is black iff its transition time is at
    /// or before `frame_index`. Overwrites `out` in place; the driver reuses
    /// the window's front-block frames as the output buffers.
    pub fn render_into(
        &self,
        matrix: &TransitionMatrix,
        frame_index: u32,
        out: &mut GrayFrame,
    ) -> InklapseResult<()> {
        if out.width != matrix.width() || out.height != matrix.height() {
            return Err(InklapseError::validation(format!(
                "output frame size mismatch: got {}x{}, expected {}x{}",
                out.width,
                out.height,
                matrix.width(),
                matrix.height()
            )));
        }
        for (px, &t) in out.data.iter_mut().zip(matrix.as_slice()) {
            *px = if t <= frame_index { INK_VALUE } else { PAPER_VALUE };
        }
        Ok(())
    }

    /// In ink-only mode, a frame is emitted only when a new ink event landed
    /// at its window-relative offset; otherwise every frame is emitted.
    pub fn should_emit(&self, local_frame: usize, new_ink_offsets: &[usize]) -> bool {
        if !self.only_ink_frames {
            return true;
        }
        new_ink_offsets.binary_search(&local_frame).is_ok()
    }

    /// Number of copies of the final frame held at the end of the output.
    pub fn outro_frame_count(&self, seconds: f64, fps: Fps) -> u32 {
        (seconds * fps.as_f64()).round().max(0.0) as u32
    }

    /// Append the held-frame outro to the sink.
    pub fn emit_outro(
        &self,
        sink: &mut dyn FrameSink,
        last_frame: &GrayFrame,
        seconds: f64,
        fps: Fps,
    ) -> InklapseResult<u32> {
        let count = self.outro_frame_count(seconds, fps);
        for _ in 0..count {
            sink.append(last_frame)?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composer(only_ink: bool) -> OutputComposer {
        OutputComposer {
            only_ink_frames: only_ink,
        }
    }

    #[test]
    fn render_is_causal_in_frame_index() {
        // Pixel 0 inks at frame 3, pixel 1 never inks (stays at the sentinel).
        let mut matrix = TransitionMatrix::new(2, 1, 10);
        matrix.record(0, 3);
        let mut out = GrayFrame::filled(2, 1, 7);

        composer(false).render_into(&matrix, 2, &mut out).unwrap();
        assert_eq!(out.data, vec![PAPER_VALUE, PAPER_VALUE]);

        composer(false).render_into(&matrix, 3, &mut out).unwrap();
        assert_eq!(out.data, vec![INK_VALUE, PAPER_VALUE]);

        composer(false).render_into(&matrix, 9, &mut out).unwrap();
        assert_eq!(out.data, vec![INK_VALUE, PAPER_VALUE]);
    }

    #[test]
    fn render_rejects_size_mismatch() {
        let matrix = TransitionMatrix::new(2, 2, 10);
        let mut out = GrayFrame::filled(3, 2, 0);
        assert!(composer(false).render_into(&matrix, 0, &mut out).is_err());
    }

    #[test]
    fn should_emit_passes_everything_when_not_ink_only() {
        let c = composer(false);
        assert!(c.should_emit(5, &[]));
    }

    #[test]
    fn should_emit_filters_unchanged_frames_in_ink_only_mode() {
        let c = composer(true);
        let offsets = vec![1, 4, 7];
        assert!(c.should_emit(4, &offsets));
        assert!(!c.should_emit(5, &offsets));
        assert!(!c.should_emit(0, &offsets));
    }

    #[test]
    fn outro_count_rounds_seconds_times_fps() {
        let c = composer(false);
        let fps = Fps::new(30000, 1001).unwrap();
        // 3 s * 29.97 fps = 89.91 -> 90 frames.
        assert_eq!(c.outro_frame_count(3.0, fps), 90);
        assert_eq!(c.outro_frame_count(0.0, fps), 0);
    }
}
