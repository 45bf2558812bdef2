//! Boundary to whatever turns a file into sensor samples.

use std::path::Path;

use hs_core::{Error, SensorMeta};

/// Sensor samples plus the metadata that describes them.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    pub pixels: Vec<u16>,
    pub meta: SensorMeta,
}

/// Produces a [`RawFrame`] for a path.
///
/// Implementations report failures as [`Error::Decode`].
pub trait RawDecoder {
    fn decode(&self, path: &Path) -> Result<RawFrame, Error>;
}

impl<F> RawDecoder for F
where
    F: Fn(&Path) -> Result<RawFrame, Error>,
{
    fn decode(&self, path: &Path) -> Result<RawFrame, Error> {
        self(path)
    }
}

/// Reads single-channel 16-bit image files (PNG, TIFF) as non-mosaic frames.
///
/// Black and white levels are taken from `template`; its dimensions are
/// replaced by the file's and its CFA layout is cleared.
#[cfg(feature = "image-io")]
#[derive(Debug, Clone, Default)]
pub struct ImageFileDecoder {
    pub template: SensorMeta,
}

#[cfg(feature = "image-io")]
impl ImageFileDecoder {
    pub fn new(template: SensorMeta) -> Self {
        Self { template }
    }
}

#[cfg(feature = "image-io")]
impl RawDecoder for ImageFileDecoder {
    fn decode(&self, path: &Path) -> Result<RawFrame, Error> {
        let img = image::ImageReader::open(path)
            .map_err(|e| Error::decode(path, e.to_string()))?
            .with_guessed_format()
            .map_err(|e| Error::decode(path, e.to_string()))?
            .decode()
            .map_err(|e| Error::decode(path, e.to_string()))?
            .into_luma16();

        let (width, height) = (img.width() as usize, img.height() as usize);
        let meta = SensorMeta {
            width,
            height,
            filters: 0,
            ..self.template.clone()
        };
        Ok(RawFrame {
            pixels: img.into_raw(),
            meta,
        })
    }
}

#[cfg(all(test, feature = "image-io"))]
mod tests {
    use std::path::PathBuf;

    use hs_core::{Error, SensorMeta};
    use image::{ImageBuffer, Luma};

    use super::{ImageFileDecoder, RawDecoder};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("hs-align-{}-{name}", std::process::id()))
    }

    #[test]
    fn decodes_16bit_png() {
        let path = temp_path("decode.png");
        let img: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_fn(3, 2, |x, y| Luma([(y * 3 + x) as u16 * 1000]));
        img.save(&path).expect("write png");

        let decoder = ImageFileDecoder::new(SensorMeta::mono(0, 0, 256, 60000));
        let frame = decoder.decode(&path).expect("decodes");
        let _ = std::fs::remove_file(&path);

        assert_eq!((frame.meta.width, frame.meta.height), (3, 2));
        assert_eq!(frame.meta.black, 256);
        assert_eq!(frame.meta.white, 60000);
        assert_eq!(frame.pixels, vec![0, 1000, 2000, 3000, 4000, 5000]);
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let path = temp_path("missing.png");
        let err = ImageFileDecoder::default().decode(&path).unwrap_err();
        assert!(matches!(err, Error::Decode { path: p, .. } if p == path));
    }
}
