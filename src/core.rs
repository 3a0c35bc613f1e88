use crate::error::{InklapseError, InklapseResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32, // must be > 0
}

impl Fps {
    pub fn new(num: u32, den: u32) -> InklapseResult<Self> {
        if den == 0 {
            return Err(InklapseError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(InklapseError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }
}

/// `num/den`, the form ffmpeg accepts for `-r`; rational rates like NTSC
/// 30000/1001 pass through exactly instead of being rounded.
impl std::fmt::Display for Fps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Fixed crop rectangle in source pixel coordinates. `bottom` and `right` are
/// exclusive, matching half-open row/column ranges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CropRect {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl CropRect {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            top: 0,
            bottom: height,
            left: 0,
            right: width,
        }
    }

    pub fn width(self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn validate_within(self, width: u32, height: u32) -> InklapseResult<()> {
        if self.top >= self.bottom || self.left >= self.right {
            return Err(InklapseError::validation(format!(
                "crop rectangle must be non-empty (top={} bottom={} left={} right={})",
                self.top, self.bottom, self.left, self.right
            )));
        }
        if self.bottom > height || self.right > width {
            return Err(InklapseError::validation(format!(
                "crop rectangle {}x{}+{}+{} exceeds frame size {}x{}",
                self.width(),
                self.height(),
                self.left,
                self.top,
                width,
                height
            )));
        }
        Ok(())
    }
}

/// Single-channel intensity frame, one byte per pixel, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl GrayFrame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> InklapseResult<Self> {
        if data.len() != width as usize * height as usize {
            return Err(InklapseError::validation(format!(
                "gray frame data length {} does not match {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_rejects_zero_components() {
        assert!(Fps::new(30, 0).is_err());
        assert!(Fps::new(0, 1).is_err());
        assert!(Fps::new(30, 1).is_ok());
    }

    #[test]
    fn fps_displays_as_ffmpeg_ratio() {
        assert_eq!(Fps::new(30000, 1001).unwrap().to_string(), "30000/1001");
        assert_eq!(Fps::new(24, 1).unwrap().to_string(), "24/1");
    }

    #[test]
    fn crop_validation_catches_bad_rectangles() {
        assert!(CropRect::full(64, 48).validate_within(64, 48).is_ok());
        let empty = CropRect {
            top: 10,
            bottom: 10,
            left: 0,
            right: 64,
        };
        assert!(empty.validate_within(64, 48).is_err());
        let oob = CropRect {
            top: 0,
            bottom: 49,
            left: 0,
            right: 64,
        };
        assert!(oob.validate_within(64, 48).is_err());
    }

    #[test]
    fn gray_frame_rejects_length_mismatch() {
        assert!(GrayFrame::new(4, 4, vec![0u8; 15]).is_err());
        assert!(GrayFrame::new(4, 4, vec![0u8; 16]).is_ok());
    }
}
