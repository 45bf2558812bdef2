//! The umbrella's default features reach the re-exported crates.

#[cfg(feature = "image-io")]
#[test]
fn file_decoder_is_reexported() {
    use hdr_stack::{Capture, CaptureConfig, Error, ImageFileDecoder, SensorMeta};

    let decoder = ImageFileDecoder::new(SensorMeta::mono(1, 1, 0, 65535));
    let err = Capture::open("missing/bracket_0.png", &decoder, &CaptureConfig::default())
        .expect_err("file does not exist");
    assert!(matches!(err, Error::Decode { .. }));
}

#[cfg(feature = "serde")]
#[test]
fn configs_load_from_json() {
    use hdr_stack::{SensorMeta, StackConfig};

    let cfg: StackConfig =
        serde_json::from_str(r#"{ "align": { "min_level_size": 16 } }"#).expect("valid json");
    assert_eq!(cfg.align.min_level_size, 16);
    assert_eq!(cfg.align.search_radius, 1);

    let meta = SensorMeta::mono(4, 2, 64, 4095);
    let json = serde_json::to_string(&meta).expect("serialises");
    let back: SensorMeta = serde_json::from_str(&json).expect("deserialises");
    assert!(back.is_same_format(&meta));
}
