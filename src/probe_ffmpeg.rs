use std::path::{Path, PathBuf};

use crate::{
    core::Fps,
    error::{InklapseError, InklapseResult},
};

#[derive(Clone, Debug, serde::Serialize)]
pub struct VideoInfo {
    pub source_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
    /// Raw frame count of the video stream, before any striding.
    pub frame_count: u32,
}

pub fn is_ffmpeg_on_path() -> bool {
    tool_on_path("ffmpeg")
}

pub fn is_ffprobe_on_path() -> bool {
    tool_on_path("ffprobe")
}

fn tool_on_path(tool: &str) -> bool {
    std::process::Command::new(tool)
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Probe stream metadata with `ffprobe`. Packet counting is cheap at the
/// container level and gives a reliable frame count where `nb_frames` is
/// often absent; `duration * fps` is the fallback when both are missing.
pub fn probe_video(source_path: &Path) -> InklapseResult<VideoInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
        nb_frames: Option<String>,
        nb_read_packets: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-count_packets",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| InklapseError::decode(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(InklapseError::decode(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| InklapseError::decode(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| InklapseError::decode("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| InklapseError::decode("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| InklapseError::decode("missing video height from ffprobe"))?;

    let (fps_num, fps_den) = parse_ff_ratio(video_stream.r_frame_rate.as_deref().unwrap_or("0/1"))
        .ok_or_else(|| InklapseError::decode("invalid video r_frame_rate"))?;
    let fps = Fps::new(fps_num, fps_den)
        .map_err(|e| InklapseError::decode(format!("unusable frame rate from ffprobe: {e}")))?;

    let counted = video_stream
        .nb_read_packets
        .as_deref()
        .or(video_stream.nb_frames.as_deref())
        .and_then(|s| s.parse::<u32>().ok());
    let frame_count = match counted {
        Some(n) if n > 0 => n,
        _ => {
            let duration_sec = parsed
                .format
                .as_ref()
                .and_then(|f| f.duration.as_ref())
                .and_then(|s| s.parse::<f64>().ok())
                .unwrap_or(0.0);
            (duration_sec * fps.as_f64()).floor() as u32
        }
    };
    if frame_count == 0 {
        return Err(InklapseError::decode(format!(
            "could not determine a frame count for '{}'",
            source_path.display()
        )));
    }

    Ok(VideoInfo {
        source_path: source_path.to_path_buf(),
        width,
        height,
        fps,
        frame_count,
    })
}

fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let a = parts.next()?.parse::<u32>().ok()?;
    let b = parts.next()?.parse::<u32>().ok()?;
    if b == 0 {
        return None;
    }
    Some((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_parsing_handles_common_rates() {
        assert_eq!(parse_ff_ratio("30/1"), Some((30, 1)));
        assert_eq!(parse_ff_ratio("30000/1001"), Some((30000, 1001)));
        assert_eq!(parse_ff_ratio("0/0"), None);
        assert_eq!(parse_ff_ratio("abc"), None);
    }
}
