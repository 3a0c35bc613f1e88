use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use inklapse::{
    CropRect, EncodeConfig, FfmpegDecoder, FfmpegEncoder, FrameSource as _, RetryPolicy,
    RevealConfig, run_reveal,
};

#[derive(Parser, Debug)]
#[command(name = "inklapse", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print stream metadata and optionally dump the reference frame as a PNG
    /// (useful for picking a crop rectangle).
    Probe(ProbeArgs),
    /// Re-render a video as an ink reveal (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Input video.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Print the metadata as JSON.
    #[arg(long)]
    json: bool,

    /// Write the late reference frame to this PNG path.
    #[arg(long)]
    dump_reference: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input video.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Keep every Nth source frame.
    #[arg(long, default_value_t = 10)]
    stride: u32,

    /// Debounce window in (strided) frames: how long a pixel must stay dark
    /// before it counts as inked.
    #[arg(long, default_value_t = 60)]
    block_len: usize,

    /// Intensity threshold (0-255) below which a pixel is ink.
    #[arg(long, default_value_t = 120)]
    ink_cutoff: u8,

    /// Emit only frames in which a new pixel inks.
    #[arg(long)]
    only_ink_frames: bool,

    /// Seconds to hold the final frame at the end of the output.
    #[arg(long, default_value_t = 3.0)]
    outro_secs: f64,

    /// Crop rectangle as top,bottom,left,right (bottom/right exclusive).
    /// Defaults to the full frame.
    #[arg(long, value_parser = parse_crop)]
    crop: Option<CropRect>,

    /// Overwrite the output file if it already exists.
    #[arg(long)]
    overwrite: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Probe(args) => cmd_probe(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn parse_crop(s: &str) -> Result<CropRect, String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 4 {
        return Err("expected top,bottom,left,right".to_string());
    }
    let mut vals = [0u32; 4];
    for (slot, part) in vals.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid crop component '{part}': {e}"))?;
    }
    Ok(CropRect {
        top: vals[0],
        bottom: vals[1],
        left: vals[2],
        right: vals[3],
    })
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let mut decoder = FfmpegDecoder::open(&args.in_path, 1, RetryPolicy::default())?;
    let info = decoder.info().clone();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("width:       {}", info.width);
        println!("height:      {}", info.height);
        println!("fps:         {}/{} ({:.3})", info.fps.num, info.fps.den, info.fps.as_f64());
        println!("frame_count: {}", info.frame_count);
    }

    if let Some(png_path) = args.dump_reference {
        let frame = decoder.frame_at(info.frame_count.saturating_sub(1))?;
        if let Some(parent) = png_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        image::save_buffer_with_format(
            &png_path,
            &frame.data,
            frame.width,
            frame.height,
            image::ColorType::Rgb8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", png_path.display()))?;
        eprintln!("wrote {}", png_path.display());
    }

    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut decoder = FfmpegDecoder::open(&args.in_path, args.stride, RetryPolicy::default())?;
    let info = decoder.info().clone();

    let mut crop = args
        .crop
        .unwrap_or_else(|| CropRect::full(info.width, info.height));
    crop.validate_within(info.width, info.height)?;

    // x264 yuv420p output needs even dimensions; shrink an odd crop by one
    // row/column instead of failing in the encoder.
    if !crop.width().is_multiple_of(2) {
        crop.right -= 1;
        tracing::warn!(right = crop.right, "crop width was odd, trimming one column");
    }
    if !crop.height().is_multiple_of(2) {
        crop.bottom -= 1;
        tracing::warn!(bottom = crop.bottom, "crop height was odd, trimming one row");
    }
    crop.validate_within(info.width, info.height)?;

    let cfg = RevealConfig {
        block_len: args.block_len,
        ink_cutoff: args.ink_cutoff,
        only_ink_frames: args.only_ink_frames,
        outro_seconds: args.outro_secs,
        crop,
        fps: info.fps,
    };

    let mut encoder = FfmpegEncoder::new(EncodeConfig {
        width: crop.width(),
        height: crop.height(),
        fps: info.fps,
        out_path: args.out.clone(),
        overwrite: args.overwrite,
    })?;

    let stats = run_reveal(&mut decoder, &mut encoder, &cfg)?;
    encoder.finish()?;

    eprintln!(
        "wrote {} ({} frames emitted, {}/{} pixels inked)",
        args.out.display(),
        stats.frames_emitted,
        stats.pixels_resolved,
        stats.pixels_total
    );
    Ok(())
}
