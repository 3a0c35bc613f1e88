#![forbid(unsafe_code)]

pub mod codec;
pub mod compose;
pub mod core;
pub mod decode_ffmpeg;
pub mod driver;
pub mod encode_ffmpeg;
pub mod error;
pub mod preprocess;
pub mod probe_ffmpeg;
pub mod schedule;
pub mod window;

pub use codec::{FrameSink, FrameSource, RawFrame, RetryPolicy};
pub use compose::{INK_VALUE, OutputComposer, PAPER_VALUE};
pub use crate::core::{CropRect, Fps, GrayFrame};
pub use decode_ffmpeg::FfmpegDecoder;
pub use driver::{RevealConfig, RevealStats, run_reveal};
pub use encode_ffmpeg::{EncodeConfig, FfmpegEncoder};
pub use error::{InklapseError, InklapseResult};
pub use probe_ffmpeg::{VideoInfo, probe_video};
pub use schedule::{TransitionMatrix, UnresolvedSet};
pub use window::WindowBuffer;
