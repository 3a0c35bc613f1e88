use std::{
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use crate::{
    codec::FrameSink,
    core::{Fps, GrayFrame},
    error::{InklapseError, InklapseResult},
    probe_ffmpeg::is_ffmpeg_on_path,
};

#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub width: u32,
    pub height: u32,
    /// Output frame rate, passed to ffmpeg as an exact rational.
    pub fps: Fps,
    pub out_path: PathBuf,
    pub overwrite: bool,
}

impl EncodeConfig {
    pub fn validate(&self) -> InklapseResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(InklapseError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if self.fps.num == 0 || self.fps.den == 0 {
            return Err(InklapseError::validation("encode fps must be non-zero"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // With the default settings we target yuv420p output for maximum compatibility.
            return Err(InklapseError::validation(
                "encode width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }
}

pub fn ensure_parent_dir(path: &Path) -> InklapseResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Writes single-channel frames to an MP4 through a long-lived `ffmpeg`
/// child: rawvideo gray over stdin, libx264/yuv420p out.
pub struct FfmpegEncoder {
    cfg: EncodeConfig,
    child: Child,
    stdin: Option<ChildStdin>,
}

impl FfmpegEncoder {
    pub fn new(cfg: EncodeConfig) -> InklapseResult<Self> {
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;

        if !cfg.overwrite && cfg.out_path.exists() {
            return Err(InklapseError::validation(format!(
                "output file '{}' already exists",
                cfg.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(InklapseError::encode(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        // We intentionally use the system `ffmpeg` binary rather than a native
        // binding to avoid FFmpeg dev header/lib requirements.
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        if cfg.overwrite {
            cmd.arg("-y");
        } else {
            cmd.arg("-n");
        }

        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "gray",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.to_string(), // "num/den", exact rational
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ])
        .arg(&cfg.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            InklapseError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| InklapseError::encode("failed to open ffmpeg stdin (unexpected)"))?;

        Ok(Self {
            cfg,
            child,
            stdin: Some(stdin),
        })
    }

    pub fn finish(mut self) -> InklapseResult<()> {
        drop(self.stdin.take());

        let output = self.child.wait_with_output().map_err(|e| {
            InklapseError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InklapseError::encode(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

impl FrameSink for FfmpegEncoder {
    fn append(&mut self, frame: &GrayFrame) -> InklapseResult<()> {
        if frame.width != self.cfg.width || frame.height != self.cfg.height {
            return Err(InklapseError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, self.cfg.width, self.cfg.height
            )));
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(InklapseError::encode("ffmpeg encoder is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(&frame.data).map_err(|e| {
            InklapseError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fps(num: u32, den: u32) -> Fps {
        Fps { num, den }
    }

    #[test]
    fn config_validation_catches_bad_values() {
        assert!(
            EncodeConfig {
                width: 0,
                height: 10,
                fps: fps(30, 1),
                out_path: PathBuf::from("out.mp4"),
                overwrite: true,
            }
            .validate()
            .is_err()
        );

        assert!(
            EncodeConfig {
                width: 11,
                height: 10,
                fps: fps(30, 1),
                out_path: PathBuf::from("out.mp4"),
                overwrite: true,
            }
            .validate()
            .is_err()
        );

        assert!(
            EncodeConfig {
                width: 10,
                height: 10,
                fps: fps(0, 1),
                out_path: PathBuf::from("out.mp4"),
                overwrite: true,
            }
            .validate()
            .is_err()
        );

        assert!(
            EncodeConfig {
                width: 10,
                height: 10,
                fps: fps(30, 1),
                out_path: PathBuf::from("out.mp4"),
                overwrite: true,
            }
            .validate()
            .is_ok()
        );
    }

    #[test]
    fn config_accepts_rational_frame_rates() {
        // NTSC 29.97 must survive as an exact rational, not a rounded 30.
        let cfg = EncodeConfig {
            width: 10,
            height: 10,
            fps: fps(30000, 1001),
            out_path: PathBuf::from("out.mp4"),
            overwrite: true,
        };
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.fps.to_string(), "30000/1001");
    }
}
