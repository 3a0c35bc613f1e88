use crate::{
    codec::{FrameSink, FrameSource},
    compose::OutputComposer,
    core::{CropRect, Fps, GrayFrame},
    error::{InklapseError, InklapseResult},
    preprocess::{crop, to_intensity, to_mask},
    schedule::{TransitionMatrix, UnresolvedSet, scan_final, scan_window},
    window::WindowBuffer,
};

/// Fixed parameters for one reveal run. The stride factor is not here: it is
/// applied inside the frame source, which only ever yields the already-strided
/// sequence.
#[derive(Clone, Copy, Debug)]
pub struct RevealConfig {
    /// Debounce window: a pixel counts as inked once it has stayed ink for
    /// this many consecutive effective frames.
    pub block_len: usize,
    /// Intensity below which a pixel is ink (strict).
    pub ink_cutoff: u8,
    /// Emit only frames in which a new ink event landed.
    pub only_ink_frames: bool,
    /// How long the final frame is held at the end of the output.
    pub outro_seconds: f64,
    /// Crop rectangle applied uniformly to every frame.
    pub crop: CropRect,
    /// Output frame rate, taken from the source.
    pub fps: Fps,
}

impl RevealConfig {
    pub fn validate(&self) -> InklapseResult<()> {
        if self.block_len == 0 {
            return Err(InklapseError::validation("block length must be >= 1"));
        }
        if !self.outro_seconds.is_finite() || self.outro_seconds < 0.0 {
            return Err(InklapseError::validation(
                "outro seconds must be finite and >= 0",
            ));
        }
        Ok(())
    }
}

/// Summary of a completed run.
#[derive(Debug)]
pub struct RevealStats {
    pub effective_frames: u32,
    pub frames_emitted: u64,
    /// Pixels ink in the reference mask, i.e. pixels that had to resolve.
    pub pixels_total: usize,
    pub pixels_resolved: usize,
    pub transitions: TransitionMatrix,
}

/// Run the full reveal pipeline: build the reference mask, stream the source
/// through the two-block window, and emit re-composited frames plus the outro.
///
/// State machine: Init -> SteadyLoop -> FinalBlock -> Done. Strictly
/// sequential per block; memory stays bounded by the window capacity plus the
/// per-pixel matrices, independent of stream length.
pub fn run_reveal(
    source: &mut dyn FrameSource,
    sink: &mut dyn FrameSink,
    cfg: &RevealConfig,
) -> InklapseResult<RevealStats> {
    cfg.validate()?;

    // Init: counts, reference mask, matrices, primed two-block window.
    let effective_frames = source.frame_count()?;
    let block_len = cfg.block_len;
    if effective_frames as usize <= 2 * block_len {
        return Err(InklapseError::validation(format!(
            "not enough frames: {} effective frames with block length {} (need more than {}); \
             reduce the block length or the stride",
            effective_frames,
            block_len,
            2 * block_len
        )));
    }

    let reference = source.frame_at(effective_frames - 1)?;
    let reference = to_intensity(&reference)?;
    cfg.crop.validate_within(reference.width, reference.height)?;
    let reference = crop(&reference, cfg.crop)?;
    let mask = to_mask(&reference, cfg.ink_cutoff);

    let width = reference.width;
    let height = reference.height;
    let mut matrix = TransitionMatrix::new(width, height, effective_frames);
    let mut unresolved = UnresolvedSet::from_mask(&mask);
    let pixels_total = unresolved.len();

    tracing::info!(
        width,
        height,
        effective_frames,
        block_len,
        pixels_to_ink = pixels_total,
        "starting reveal run"
    );

    source.rewind()?;
    let blocks = effective_frames as usize / block_len;
    let mut window = WindowBuffer::new(width, height, block_len)?;
    for block_number in 0..2 {
        let block = read_block(source, cfg, block_number, blocks, effective_frames)?;
        window.push_block(block)?;
    }

    let composer = OutputComposer {
        only_ink_frames: cfg.only_ink_frames,
    };
    let mut frames_emitted = 0u64;
    let mut pixels_resolved = 0usize;

    // SteadyLoop: scan, finalize + emit the front block, slide the window.
    for block_number in 0..blocks - 1 {
        if window.len() < block_len {
            return Err(truncated_stream_error(
                source,
                block_number,
                blocks,
                effective_frames,
                block_len,
                window.len(),
            ));
        }

        let block_offset = (block_number * block_len) as u32;
        let outcome = scan_window(&window, &mut matrix, &mut unresolved, cfg.ink_cutoff, block_offset);
        pixels_resolved += outcome.resolved;
        tracing::debug!(
            block = block_number,
            resolved = outcome.resolved,
            remaining = unresolved.len(),
            "scanned window"
        );

        for f in 0..block_len {
            composer.render_into(&matrix, block_offset + f as u32, window.frame_mut(f))?;
            if composer.should_emit(f, &outcome.new_ink_offsets) {
                sink.append(window.frame(f))?;
                frames_emitted += 1;
            }
        }

        window.drop_front(block_len)?;
        let block = read_block(source, cfg, block_number + 2, blocks, effective_frames)?;
        window.push_block(block)?;
    }

    // FinalBlock: one full block plus the remainder; no lookahead left, so the
    // backward scan applies with no minimum run length.
    let block_number = blocks - 1;
    if window.is_empty() {
        return Err(truncated_stream_error(
            source,
            block_number,
            blocks,
            effective_frames,
            block_len,
            0,
        ));
    }
    let block_offset = (block_number * block_len) as u32;
    let outcome = scan_final(&window, &mut matrix, &mut unresolved, cfg.ink_cutoff, block_offset)?;
    pixels_resolved += outcome.resolved;
    tracing::debug!(
        block = block_number,
        resolved = outcome.resolved,
        frames = window.len(),
        "scanned final block"
    );

    for f in 0..window.len() {
        composer.render_into(&matrix, block_offset + f as u32, window.frame_mut(f))?;
        if composer.should_emit(f, &outcome.new_ink_offsets) {
            sink.append(window.frame(f))?;
            frames_emitted += 1;
        }
    }

    let last = window.frame(window.len() - 1).clone();
    frames_emitted += u64::from(composer.emit_outro(sink, &last, cfg.outro_seconds, cfg.fps)?);

    tracing::info!(frames_emitted, pixels_resolved, "reveal run complete");

    // Done.
    Ok(RevealStats {
        effective_frames,
        frames_emitted,
        pixels_total,
        pixels_resolved,
        transitions: matrix,
    })
}

/// Read up to one block of frames, preprocessed to cropped intensity frames.
/// Hitting end of stream early yields a short (possibly empty) block; decode
/// failures are fatal and carry the block diagnostics.
fn read_block(
    source: &mut dyn FrameSource,
    cfg: &RevealConfig,
    block_number: usize,
    blocks: usize,
    effective_frames: u32,
) -> InklapseResult<Vec<GrayFrame>> {
    let mut frames = Vec::with_capacity(cfg.block_len);
    for _ in 0..cfg.block_len {
        let raw = source.next_frame().map_err(|e| {
            InklapseError::decode(format!(
                "failed reading block {}/{}: {} (total_frames={}, effective_frames={}, block_len={})",
                block_number,
                blocks,
                e,
                source
                    .total_frame_count()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|_| "unknown".to_string()),
                effective_frames,
                cfg.block_len
            ))
        })?;
        let Some(raw) = raw else {
            break;
        };
        let gray = to_intensity(&raw)?;
        frames.push(crop(&gray, cfg.crop)?);
    }
    Ok(frames)
}

fn truncated_stream_error(
    source: &mut dyn FrameSource,
    block_number: usize,
    blocks: usize,
    effective_frames: u32,
    block_len: usize,
    window_len: usize,
) -> InklapseError {
    InklapseError::decode(format!(
        "stream ended early at block {}/{}: window holds {} frames, need {} \
         (total_frames={}, effective_frames={}, block_len={})",
        block_number,
        blocks,
        window_len,
        block_len,
        source
            .total_frame_count()
            .map(|n| n.to_string())
            .unwrap_or_else(|_| "unknown".to_string()),
        effective_frames,
        block_len
    ))
}
