use crate::{
    codec::RawFrame,
    core::{CropRect, GrayFrame},
    error::{InklapseError, InklapseResult},
};

/// Collapse an RGB24 frame to single-channel intensity by averaging the three
/// channels per pixel, truncating to u8.
pub fn to_intensity(frame: &RawFrame) -> InklapseResult<GrayFrame> {
    let expected = RawFrame::expected_len(frame.width, frame.height);
    if frame.data.len() != expected {
        return Err(InklapseError::validation(format!(
            "raw frame data length {} does not match {}x{} rgb24",
            frame.data.len(),
            frame.width,
            frame.height
        )));
    }

    let mut data = Vec::with_capacity(frame.width as usize * frame.height as usize);
    for px in frame.data.chunks_exact(3) {
        let sum = u16::from(px[0]) + u16::from(px[1]) + u16::from(px[2]);
        data.push((sum / 3) as u8);
    }

    GrayFrame::new(frame.width, frame.height, data)
}

/// Extract the crop rectangle from an intensity frame.
pub fn crop(frame: &GrayFrame, rect: CropRect) -> InklapseResult<GrayFrame> {
    rect.validate_within(frame.width, frame.height)?;

    let out_w = rect.width() as usize;
    let mut data = Vec::with_capacity(out_w * rect.height() as usize);
    for row in rect.top..rect.bottom {
        let start = row as usize * frame.width as usize + rect.left as usize;
        data.extend_from_slice(&frame.data[start..start + out_w]);
    }

    GrayFrame::new(rect.width(), rect.height(), data)
}

/// Binary ink mask: a pixel is ink when its intensity is strictly below
/// `cutoff`. This is the single threshold used throughout the run.
pub fn to_mask(frame: &GrayFrame, cutoff: u8) -> Vec<bool> {
    frame.data.iter().map(|&v| v < cutoff).collect()
}

#[inline]
pub fn is_ink(intensity: u8, cutoff: u8) -> bool {
    intensity < cutoff
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(width: u32, height: u32, rgb: &[u8]) -> RawFrame {
        RawFrame {
            width,
            height,
            data: rgb.to_vec(),
        }
    }

    #[test]
    fn intensity_is_truncated_channel_mean() {
        let frame = raw(2, 1, &[100, 101, 101, 255, 255, 255]);
        let gray = to_intensity(&frame).unwrap();
        // (100+101+101)/3 = 100.67 truncates to 100.
        assert_eq!(gray.data, vec![100, 255]);
    }

    #[test]
    fn intensity_rejects_wrong_length() {
        assert!(to_intensity(&raw(2, 1, &[0, 0, 0])).is_err());
    }

    #[test]
    fn crop_extracts_interior_rectangle() {
        #[rustfmt::skip]
        let gray = GrayFrame::new(4, 3, vec![
             0,  1,  2,  3,
            10, 11, 12, 13,
            20, 21, 22, 23,
        ]).unwrap();
        let rect = CropRect {
            top: 1,
            bottom: 3,
            left: 1,
            right: 3,
        };
        let out = crop(&gray, rect).unwrap();
        assert_eq!(out.width, 2);
        assert_eq!(out.height, 2);
        assert_eq!(out.data, vec![11, 12, 21, 22]);
    }

    #[test]
    fn crop_rejects_out_of_bounds_rectangle() {
        let gray = GrayFrame::filled(4, 3, 0);
        let rect = CropRect {
            top: 0,
            bottom: 4,
            left: 0,
            right: 4,
        };
        assert!(crop(&gray, rect).is_err());
    }

    #[test]
    fn mask_threshold_is_exclusive() {
        let gray = GrayFrame::new(3, 1, vec![119, 120, 121]).unwrap();
        assert_eq!(to_mask(&gray, 120), vec![true, false, false]);
    }
}
