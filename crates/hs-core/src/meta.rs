use core::fmt;

/// Geometry and CFA layout that two captures must share to be compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorFormat {
    pub width: usize,
    pub height: usize,
    pub filters: u32,
}

impl fmt::Display for SensorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} filters={:#010x}",
            self.width, self.height, self.filters
        )
    }
}

/// Read-only description of one sensor capture.
///
/// Levels are expressed on the raw sensor scale. `filters` follows the dcraw
/// convention: a 32-bit pattern that yields the CFA channel of each element
/// in an 8x2 tile, `0` for sensors without a mosaic.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SensorMeta {
    pub width: usize,
    pub height: usize,
    pub black: u16,
    pub cblack: [u16; 4],
    pub white: u16,
    pub filters: u32,
    pub make: String,
    pub model: String,
    pub iso: Option<f32>,
    pub exposure_time: Option<f32>,
    pub aperture: Option<f32>,
}

impl Default for SensorMeta {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            black: 0,
            cblack: [0; 4],
            white: u16::MAX,
            filters: 0,
            make: String::new(),
            model: String::new(),
            iso: None,
            exposure_time: None,
            aperture: None,
        }
    }
}

impl SensorMeta {
    /// Non-mosaic sensor with a single black and white level.
    pub fn mono(width: usize, height: usize, black: u16, white: u16) -> Self {
        Self {
            width,
            height,
            black,
            white,
            ..Self::default()
        }
    }

    pub fn format(&self) -> SensorFormat {
        SensorFormat {
            width: self.width,
            height: self.height,
            filters: self.filters,
        }
    }

    pub fn is_same_format(&self, other: &SensorMeta) -> bool {
        self.format() == other.format()
    }

    pub fn color_at(&self, x: usize, y: usize) -> usize {
        if self.filters == 0 {
            return 0;
        }
        let shift = (((y << 1) & 14) | (x & 1)) << 1;
        ((self.filters >> shift) & 3) as usize
    }

    pub fn black_at(&self, x: usize, y: usize) -> u16 {
        self.black.saturating_add(self.cblack[self.color_at(x, y)])
    }

    /// White level on the black-subtracted scale.
    ///
    /// Uses the largest black of the channels present so that every channel
    /// clips at or below the returned value.
    pub fn saturation_threshold(&self) -> u16 {
        let max_cblack = if self.filters == 0 {
            self.cblack[0]
        } else {
            self.cblack.iter().copied().max().unwrap_or(0)
        };
        self.white
            .saturating_sub(self.black.saturating_add(max_cblack))
    }
}
