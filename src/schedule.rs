use crate::{
    error::{InklapseError, InklapseResult},
    preprocess::is_ink,
    window::WindowBuffer,
};

/// Per-pixel first-inked-frame grid. Entries start at the sentinel (the
/// effective frame count, i.e. "beyond end of video") and are written at most
/// once over the run.
#[derive(Clone, Debug)]
pub struct TransitionMatrix {
    width: u32,
    height: u32,
    sentinel: u32,
    data: Vec<u32>,
}

impl TransitionMatrix {
    pub fn new(width: u32, height: u32, sentinel: u32) -> Self {
        Self {
            width,
            height,
            sentinel,
            data: vec![sentinel; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn sentinel(&self) -> u32 {
        self.sentinel
    }

    pub fn value(&self, pixel: usize) -> u32 {
        self.data[pixel]
    }

    pub fn is_resolved(&self, pixel: usize) -> bool {
        self.data[pixel] != self.sentinel
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }

    pub(crate) fn record(&mut self, pixel: usize, frame: u32) {
        debug_assert_eq!(self.data[pixel], self.sentinel, "transition set twice");
        self.data[pixel] = frame;
    }
}

/// Pixels still lacking a transition time, as flat pixel indices. Removal is
/// swap-remove, so membership shrinks in O(1) amortized; order is not
/// meaningful.
#[derive(Clone, Debug)]
pub struct UnresolvedSet {
    pixels: Vec<u32>,
}

impl UnresolvedSet {
    /// Seed from the reference mask: every pixel that is ink at the end of the
    /// video must eventually ink. Pixels never ink simply never enter the set.
    pub fn from_mask(mask: &[bool]) -> Self {
        let pixels = mask
            .iter()
            .enumerate()
            .filter(|&(_, &ink)| ink)
            .map(|(i, _)| i as u32)
            .collect();
        Self { pixels }
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

/// Result of one scheduler pass over the window.
#[derive(Clone, Debug, Default)]
pub struct ScanOutcome {
    /// Number of pixels resolved by this pass.
    pub resolved: usize,
    /// Sorted, deduplicated window-relative frame offsets at which at least
    /// one new ink event landed. Offsets may point into the lookahead region.
    pub new_ink_offsets: Vec<usize>,
}

/// Debounce scan for one pixel column: find the earliest window index at which
/// a sustained ink run of at least `block_len` frames begins.
///
/// `x` is a candidate run end, starting at `block_len - 1`; `y` counts the
/// maximal ink run ending at `x`, walking backward. A run of `block_len` or
/// more qualifies and starts at `x - y + 1`. A shorter run cannot be part of
/// any qualifying run ending before `x - y + block_len`, so `x` jumps there
/// directly, which keeps the whole scan amortized single-pass.
fn find_ink_run(planes: &[&[u8]], pixel: usize, block_len: usize, cutoff: u8) -> Option<usize> {
    let len = planes.len();
    let mut x = block_len - 1;
    while x < len {
        let mut y = 0usize;
        while y <= x && is_ink(planes[x - y][pixel], cutoff) {
            y += 1;
        }
        if y >= block_len {
            return Some(x + 1 - y);
        }
        x = x + block_len - y;
    }
    None
}

/// Steady-state scheduler pass: resolve every pixel whose sustained ink run
/// becomes visible in the current window, recording `block_offset + f` in the
/// matrix and shrinking the unresolved set.
pub fn scan_window(
    window: &WindowBuffer,
    matrix: &mut TransitionMatrix,
    unresolved: &mut UnresolvedSet,
    cutoff: u8,
    block_offset: u32,
) -> ScanOutcome {
    let planes = window.planes();
    let block_len = window.block_len();
    let mut outcome = ScanOutcome::default();

    let mut i = 0;
    while i < unresolved.pixels.len() {
        let pixel = unresolved.pixels[i] as usize;
        match find_ink_run(&planes, pixel, block_len, cutoff) {
            Some(f) => {
                matrix.record(pixel, block_offset + f as u32);
                outcome.new_ink_offsets.push(f);
                outcome.resolved += 1;
                unresolved.pixels.swap_remove(i);
            }
            None => i += 1,
        }
    }

    outcome.new_ink_offsets.sort_unstable();
    outcome.new_ink_offsets.dedup();
    outcome
}

/// Final-block scheduler pass: the stream is exhausted, so every remaining
/// unresolved pixel must be ink at the very last buffered frame (guaranteed by
/// reference-mask construction). The transition is the start of the contiguous
/// ink run ending at the last frame; no minimum length applies because there
/// is no more future data to debounce against.
pub fn scan_final(
    window: &WindowBuffer,
    matrix: &mut TransitionMatrix,
    unresolved: &mut UnresolvedSet,
    cutoff: u8,
    block_offset: u32,
) -> InklapseResult<ScanOutcome> {
    let planes = window.planes();
    let last = planes
        .len()
        .checked_sub(1)
        .ok_or_else(|| InklapseError::validation("final scan over an empty window"))?;
    let width = matrix.width() as usize;
    let mut outcome = ScanOutcome::default();

    for &pixel in &unresolved.pixels {
        let pixel = pixel as usize;
        if !is_ink(planes[last][pixel], cutoff) {
            return Err(InklapseError::consistency(format!(
                "pixel ({}, {}) is marked ink in the reference mask but not ink at the last frame",
                pixel / width,
                pixel % width
            )));
        }
        let mut y = 1usize;
        while y <= last && is_ink(planes[last - y][pixel], cutoff) {
            y += 1;
        }
        let f = last + 1 - y;
        matrix.record(pixel, block_offset + f as u32);
        outcome.new_ink_offsets.push(f);
        outcome.resolved += 1;
    }
    unresolved.pixels.clear();

    outcome.new_ink_offsets.sort_unstable();
    outcome.new_ink_offsets.dedup();
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GrayFrame;

    const INK: u8 = 0;
    const PAPER: u8 = 255;
    const CUTOFF: u8 = 120;

    fn window_from(column: &[u8], block_len: usize) -> WindowBuffer {
        let mut win = WindowBuffer::new(1, 1, block_len).unwrap();
        for chunk in column.chunks(block_len) {
            let block = chunk
                .iter()
                .map(|&v| GrayFrame::new(1, 1, vec![v]).unwrap())
                .collect();
            win.push_block(block).unwrap();
        }
        win
    }

    fn run_of(pattern: &[(u8, usize)]) -> Vec<u8> {
        let mut out = Vec::new();
        for &(value, count) in pattern {
            out.extend(std::iter::repeat_n(value, count));
        }
        out
    }

    #[test]
    fn finds_run_starting_inside_front_block() {
        // 2 paper frames, then ink for the rest of an 8-frame window.
        let column = run_of(&[(PAPER, 2), (INK, 6)]);
        let win = window_from(&column, 4);
        let planes = win.planes();
        assert_eq!(find_ink_run(&planes, 0, 4, CUTOFF), Some(2));
    }

    #[test]
    fn run_reaching_buffer_start_counts_from_zero() {
        let column = run_of(&[(INK, 8)]);
        let win = window_from(&column, 4);
        let planes = win.planes();
        assert_eq!(find_ink_run(&planes, 0, 4, CUTOFF), Some(0));
    }

    #[test]
    fn short_flicker_is_skipped_not_reported() {
        // A 2-frame ink flicker inside paper, then a real run; block_len 4.
        let column = run_of(&[(PAPER, 1), (INK, 2), (PAPER, 1), (INK, 4)]);
        let win = window_from(&column, 4);
        let planes = win.planes();
        assert_eq!(find_ink_run(&planes, 0, 4, CUTOFF), Some(4));
    }

    #[test]
    fn all_paper_yields_no_run() {
        let column = run_of(&[(PAPER, 8)]);
        let win = window_from(&column, 4);
        let planes = win.planes();
        assert_eq!(find_ink_run(&planes, 0, 4, CUTOFF), None);
    }

    #[test]
    fn run_too_short_at_window_end_stays_unresolved() {
        // Ink only in the last 3 frames; needs 4 to qualify.
        let column = run_of(&[(PAPER, 5), (INK, 3)]);
        let win = window_from(&column, 4);
        let planes = win.planes();
        assert_eq!(find_ink_run(&planes, 0, 4, CUTOFF), None);
    }

    #[test]
    fn scan_window_records_offset_and_shrinks_set() {
        let column = run_of(&[(PAPER, 3), (INK, 5)]);
        let win = window_from(&column, 4);
        let mut matrix = TransitionMatrix::new(1, 1, 100);
        let mut unresolved = UnresolvedSet::from_mask(&[true]);

        let outcome = scan_window(&win, &mut matrix, &mut unresolved, CUTOFF, 40);
        assert_eq!(outcome.resolved, 1);
        assert_eq!(outcome.new_ink_offsets, vec![3]);
        assert_eq!(matrix.value(0), 43);
        assert!(unresolved.is_empty());
    }

    #[test]
    fn scan_window_leaves_unqualified_pixels_unresolved() {
        let column = run_of(&[(PAPER, 7), (INK, 1)]);
        let win = window_from(&column, 4);
        let mut matrix = TransitionMatrix::new(1, 1, 100);
        let mut unresolved = UnresolvedSet::from_mask(&[true]);

        let outcome = scan_window(&win, &mut matrix, &mut unresolved, CUTOFF, 0);
        assert_eq!(outcome.resolved, 0);
        assert_eq!(unresolved.len(), 1);
        assert_eq!(matrix.value(0), matrix.sentinel());
    }

    #[test]
    fn final_scan_takes_trailing_run_without_minimum_length() {
        // Single trailing ink frame is enough in the final block.
        let column = run_of(&[(PAPER, 5), (INK, 1)]);
        let win = window_from(&column, 4);
        let mut matrix = TransitionMatrix::new(1, 1, 100);
        let mut unresolved = UnresolvedSet::from_mask(&[true]);

        let outcome = scan_final(&win, &mut matrix, &mut unresolved, CUTOFF, 80).unwrap();
        assert_eq!(outcome.resolved, 1);
        assert_eq!(matrix.value(0), 85);
        assert!(unresolved.is_empty());
    }

    #[test]
    fn final_scan_rejects_paper_pixel_as_inconsistent() {
        let column = run_of(&[(INK, 5), (PAPER, 1)]);
        let win = window_from(&column, 4);
        let mut matrix = TransitionMatrix::new(1, 1, 100);
        let mut unresolved = UnresolvedSet::from_mask(&[true]);

        let err = scan_final(&win, &mut matrix, &mut unresolved, CUTOFF, 0).unwrap_err();
        assert!(err.to_string().contains("consistency error:"));
    }

    #[test]
    fn mask_seeds_only_ink_pixels() {
        let set = UnresolvedSet::from_mask(&[false, true, true, false]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.pixels, vec![1, 2]);
    }
}
