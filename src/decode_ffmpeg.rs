use std::{
    io::Read as _,
    path::Path,
    process::{Child, ChildStdout, Command, Stdio},
};

use crate::{
    codec::{FrameSource, RawFrame, RetryPolicy},
    error::{InklapseError, InklapseResult},
    probe_ffmpeg::{VideoInfo, is_ffmpeg_on_path, probe_video},
};

/// Streaming decoder over a long-lived `ffmpeg` child writing rawvideo rgb24
/// to a stdout pipe. The stride factor is applied here by discarding frames,
/// so consumers only ever see the strided sequence; `frame_count` and
/// `frame_at` speak post-stride indices.
pub struct FfmpegDecoder {
    info: VideoInfo,
    stride: u32,
    retry: RetryPolicy,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
}

impl FfmpegDecoder {
    pub fn open(source_path: &Path, stride: u32, retry: RetryPolicy) -> InklapseResult<Self> {
        if stride == 0 {
            return Err(InklapseError::validation("stride must be >= 1"));
        }
        if !is_ffmpeg_on_path() {
            return Err(InklapseError::decode(
                "ffmpeg is required for video decoding, but was not found on PATH",
            ));
        }
        let info = probe_video(source_path)?;
        Ok(Self {
            info,
            stride,
            retry,
            child: None,
            stdout: None,
        })
    }

    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    fn frame_byte_len(&self) -> usize {
        RawFrame::expected_len(self.info.width, self.info.height)
    }

    fn ensure_child(&mut self) -> InklapseResult<()> {
        if self.stdout.is_some() {
            return Ok(());
        }

        // stderr goes to null: decode problems surface as a short read, and a
        // blocked stderr pipe would stall the child mid-stream.
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(&self.info.source_path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                InklapseError::decode(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| InklapseError::decode("failed to open ffmpeg stdout (unexpected)"))?;
        self.child = Some(child);
        self.stdout = Some(stdout);
        Ok(())
    }

    fn kill_child(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    /// Read one raw frame off the pipe; `None` on a clean end of stream.
    fn read_raw_frame(&mut self) -> InklapseResult<Option<RawFrame>> {
        self.ensure_child()?;
        let len = self.frame_byte_len();
        let stdout = self
            .stdout
            .as_mut()
            .ok_or_else(|| InklapseError::decode("decoder stream is not open (unexpected)"))?;

        let mut data = vec![0u8; len];
        let mut filled = 0usize;
        while filled < len {
            let n = stdout
                .read(&mut data[filled..])
                .map_err(|e| InklapseError::decode(format!("ffmpeg pipe read failed: {e}")))?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(InklapseError::decode(format!(
                    "truncated frame from ffmpeg: got {filled} of {len} bytes"
                )));
            }
            filled += n;
        }

        Ok(Some(RawFrame {
            width: self.info.width,
            height: self.info.height,
            data,
        }))
    }

    /// One-shot decode of a single frame at an effective index, seeking by
    /// timestamp. Returns `None` when the decoder produces nothing there,
    /// which happens for the trailing indices of some streams.
    fn decode_one_at(&self, effective_index: u32) -> InklapseResult<Option<RawFrame>> {
        let raw_index = u64::from(effective_index) * u64::from(self.stride);
        let seek_sec = raw_index as f64 / self.info.fps.as_f64();

        let out = Command::new("ffmpeg")
            .args(["-v", "error", "-ss", &format!("{seek_sec:.9}"), "-i"])
            .arg(&self.info.source_path)
            .args(["-frames:v", "1", "-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .output()
            .map_err(|e| {
                InklapseError::decode(format!("failed to run ffmpeg for frame fetch: {e}"))
            })?;

        if !out.status.success() {
            return Err(InklapseError::decode(format!(
                "ffmpeg frame fetch failed for '{}': {}",
                self.info.source_path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        let len = self.frame_byte_len();
        if out.stdout.is_empty() {
            return Ok(None);
        }
        if out.stdout.len() < len {
            return Err(InklapseError::decode(format!(
                "fetched frame has invalid size: got {} bytes, expected {len}",
                out.stdout.len()
            )));
        }

        Ok(Some(RawFrame {
            width: self.info.width,
            height: self.info.height,
            data: out.stdout[..len].to_vec(),
        }))
    }
}

impl FrameSource for FfmpegDecoder {
    fn frame_count(&mut self) -> InklapseResult<u32> {
        Ok(self.info.frame_count / self.stride)
    }

    fn total_frame_count(&mut self) -> InklapseResult<u32> {
        Ok(self.info.frame_count)
    }

    fn next_frame(&mut self) -> InklapseResult<Option<RawFrame>> {
        let Some(frame) = self.read_raw_frame()? else {
            return Ok(None);
        };
        // Discard the rest of the stride group; end of stream mid-group still
        // yields the kept frame.
        for _ in 1..self.stride {
            if self.read_raw_frame()?.is_none() {
                break;
            }
        }
        Ok(Some(frame))
    }

    fn frame_at(&mut self, index: u32) -> InklapseResult<RawFrame> {
        let mut index = index;
        for attempt in 0..self.retry.max_attempts {
            if let Some(frame) = self.decode_one_at(index)? {
                return Ok(frame);
            }
            tracing::debug!(index, attempt, "late frame unreadable, stepping back");
            index = index.checked_sub(self.retry.step_back).ok_or_else(|| {
                InklapseError::decode(format!(
                    "no readable frame found near index {index}: reached the start of the stream"
                ))
            })?;
        }
        Err(InklapseError::decode(format!(
            "no readable frame found after {} attempts (last index {index})",
            self.retry.max_attempts
        )))
    }

    fn rewind(&mut self) -> InklapseResult<()> {
        self.kill_child();
        Ok(())
    }
}

impl Drop for FfmpegDecoder {
    fn drop(&mut self) {
        self.kill_child();
    }
}
