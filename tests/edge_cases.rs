// tests/edge_cases.rs
//
// Edge case tests for thumbgate
// Tests boundary values, hostile inputs, and option validation

use image::{DynamicImage, GenericImageView, RgbImage};
use thumbgate::{
    resolve, scale_aspect, Format, Metadata, Options, Stage, ThumbgateError, Thumbnailer,
    MAX_DIMENSION, MIN_DIMENSION,
};

// Helper function to create test images
fn create_test_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

// Helper to create valid JPEG of specified size
fn create_valid_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = create_test_image(width, height);
    let rgb = img.to_rgb8();
    let (w, h) = rgb.dimensions();
    let pixels = rgb.into_raw();

    use mozjpeg::ColorSpace;
    use mozjpeg::Compress;

    let mut comp = Compress::new(ColorSpace::JCS_RGB);
    comp.set_size(w as usize, h as usize);
    comp.set_quality(80.0);
    comp.set_color_space(ColorSpace::JCS_YCbCr);
    comp.set_chroma_sampling_pixel_sizes((2, 2), (2, 2));

    let mut output = Vec::new();
    {
        let mut writer = comp.start_compress(&mut output).unwrap();
        let stride = w as usize * 3;
        for row in pixels.chunks(stride) {
            writer.write_scanlines(row).unwrap();
        }
        writer.finish().unwrap();
    }
    output
}

fn create_valid_png(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    create_test_image(width, height)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

mod minimal_image_tests {
    use super::*;

    #[test]
    fn test_2x2_to_each_format() {
        let thumbnailer = Thumbnailer::default();
        let blob = create_valid_png(MIN_DIMENSION, MIN_DIMENSION);
        for format in [Format::Jpeg, Format::Png, Format::Webp] {
            let options = Options {
                format,
                ..Options::default()
            };
            let thumb = thumbnailer.thumbnail(&blob, &options).unwrap();
            assert_eq!((thumb.width, thumb.height), (2, 2), "{format}");
            let decoded = image::load_from_memory(&thumb.bytes).unwrap();
            assert_eq!(decoded.dimensions(), (2, 2));
        }
    }

    #[test]
    fn test_2x2_is_never_upscaled() {
        let blob = create_valid_jpeg(2, 2);
        let thumb = Thumbnailer::default()
            .thumbnail(&blob, &Options::fit(100, 100))
            .unwrap();
        assert_eq!((thumb.width, thumb.height), (2, 2));
    }

    #[test]
    fn test_1x1_is_too_small() {
        let blob = create_valid_jpeg(1, 1);
        let err = Thumbnailer::default().validate(&blob).unwrap_err();
        assert!(matches!(err, ThumbgateError::TooSmall { .. }));
    }
}

mod dimension_boundary_tests {
    use super::*;

    #[test]
    fn test_max_dimension_boundary() {
        let meta = Metadata::new(MAX_DIMENSION, MAX_DIMENSION, Format::Png);
        assert!(resolve(&Options::fit(100, 100), &meta).is_ok());
    }

    #[test]
    fn test_exceed_max_dimension_width() {
        let meta = Metadata::new(MAX_DIMENSION + 1, 100, Format::Png);
        let err = resolve(&Options::fit(100, 100), &meta).unwrap_err();
        assert!(matches!(err, ThumbgateError::TooBig { .. }));
    }

    #[test]
    fn test_exceed_max_dimension_height() {
        let meta = Metadata::new(100, MAX_DIMENSION + 1, Format::Png);
        let err = resolve(&Options::fit(100, 100), &meta).unwrap_err();
        assert!(matches!(err, ThumbgateError::TooBig { .. }));
    }

    #[test]
    fn test_requested_size_over_max() {
        let meta = Metadata::new(800, 600, Format::Png);
        let err = resolve(&Options::fit(MAX_DIMENSION + 1, 10), &meta).unwrap_err();
        assert!(matches!(err, ThumbgateError::TooBig { .. }));
    }

    #[test]
    fn test_budget_only_scales_jpeg() {
        let options = Options {
            max_buffer_pixels: 10_000,
            ..Options::default()
        };
        // 200*200 = 40_000: within 10_000 * 64 for JPEG, over budget otherwise.
        assert!(resolve(&options, &Metadata::new(200, 200, Format::Jpeg)).is_ok());
        let err = resolve(&options, &Metadata::new(200, 200, Format::Png)).unwrap_err();
        assert!(matches!(err, ThumbgateError::TooBig { .. }));
    }

    #[test]
    fn test_extreme_aspect_ratio_wide() {
        assert_eq!(scale_aspect(MAX_DIMENSION, 2, 100, 100, true), (100, 1));
        let meta = Metadata::new(MAX_DIMENSION, 2, Format::Png);
        assert!(resolve(&Options::fit(100, 100), &meta).is_ok());
    }

    #[test]
    fn test_extreme_aspect_ratio_tall() {
        assert_eq!(scale_aspect(2, MAX_DIMENSION, 100, 100, true), (1, 100));
        assert_eq!(scale_aspect(2, MAX_DIMENSION, 100, 100, false), (100, 1_638_300));
    }

    #[test]
    fn test_extreme_aspect_thumbnail() {
        let blob = create_valid_png(2000, 2);
        let thumb = Thumbnailer::default()
            .thumbnail(&blob, &Options::fit(100, 100))
            .unwrap();
        assert_eq!((thumb.width, thumb.height), (100, 1));
    }
}

mod corrupted_image_tests {
    use super::*;

    #[test]
    fn test_jpeg_header_only() {
        let corrupted = vec![0xFF, 0xD8];
        let err = Thumbnailer::default().validate(&corrupted).unwrap_err();
        assert!(matches!(err, ThumbgateError::UnknownFormat { .. }));
    }

    #[test]
    fn test_truncated_jpeg() {
        let valid_jpeg = create_valid_jpeg(100, 100);
        let truncated: Vec<u8> = valid_jpeg[..valid_jpeg.len() / 2].to_vec();

        // The header survives truncation; the decoder may fill the missing
        // scanlines or fail, but must not panic.
        let thumbnailer = Thumbnailer::default();
        match thumbnailer.thumbnail(&truncated, &Options::fit(50, 50)) {
            Ok(thumb) => assert_eq!((thumb.width, thumb.height), (50, 50)),
            Err(err) => assert_eq!(err.stage(), Some(Stage::Decode), "{err}"),
        }
    }

    #[test]
    fn test_wrong_magic_bytes() {
        // PNG signature followed by a JPEG body
        let mut fake = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        let valid_jpeg = create_valid_jpeg(10, 10);
        fake.extend_from_slice(&valid_jpeg[8..]);

        let err = Thumbnailer::default().validate(&fake).unwrap_err();
        assert!(matches!(err, ThumbgateError::UnknownFormat { .. }));
    }

    #[test]
    fn test_empty_buffer() {
        let err = Thumbnailer::default().validate(&[]).unwrap_err();
        assert!(matches!(err, ThumbgateError::UnknownFormat { .. }));
    }

    #[test]
    fn test_webp_riff_without_vp8_chunk() {
        let mut blob = b"RIFF\x24\x00\x00\x00WEBPJUNK".to_vec();
        blob.extend_from_slice(&[0u8; 32]);
        let err = Thumbnailer::default().validate(&blob).unwrap_err();
        assert!(matches!(err, ThumbgateError::UnknownFormat { .. }));
    }
}

mod non_image_tests {
    use super::*;

    #[test]
    fn test_text_file() {
        let text = b"Hello, this is not an image!".to_vec();
        let err = Thumbnailer::default()
            .thumbnail(&text, &Options::default())
            .unwrap_err();
        assert!(matches!(err, ThumbgateError::UnknownFormat { .. }));
    }

    #[test]
    fn test_random_binary() {
        let random: Vec<u8> = (0..1000).map(|i| (i % 256) as u8).collect();
        let err = Thumbnailer::default()
            .thumbnail(&random, &Options::default())
            .unwrap_err();
        assert!(matches!(err, ThumbgateError::UnknownFormat { .. }));
    }
}

mod option_boundary_tests {
    use super::*;

    fn meta() -> Metadata {
        Metadata::new(800, 600, Format::Jpeg)
    }

    fn with(f: impl FnOnce(&mut Options)) -> Result<thumbgate::ResolvedOptions, ThumbgateError> {
        let mut options = Options::default();
        f(&mut options);
        resolve(&options, &meta())
    }

    #[test]
    fn test_quality_0_uses_default() {
        assert_eq!(with(|o| o.quality = 0).unwrap().quality(), 85);
    }

    #[test]
    fn test_quality_1_and_100() {
        assert_eq!(with(|o| o.quality = 1).unwrap().quality(), 1);
        assert_eq!(with(|o| o.quality = 100).unwrap().quality(), 100);
    }

    #[test]
    fn test_quality_over_100() {
        let err = with(|o| o.quality = 101).unwrap_err();
        assert!(matches!(err, ThumbgateError::BadOption { .. }));
        assert!(err.to_string().contains("quality=101"), "{err}");
    }

    #[test]
    fn test_compression_bounds() {
        assert_eq!(with(|o| o.compression = 0).unwrap().compression(), 6);
        assert_eq!(with(|o| o.compression = 9).unwrap().compression(), 9);
        assert!(matches!(
            with(|o| o.compression = 10),
            Err(ThumbgateError::BadOption { .. })
        ));
    }

    #[test]
    fn test_blur_sigma_bounds() {
        assert!(with(|o| o.blur_sigma = 8.0).is_ok());
        for sigma in [8.01, -0.5, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(with(|o| o.blur_sigma = sigma), Err(ThumbgateError::BadOption { .. })),
                "{sigma}"
            );
        }
    }

    #[test]
    fn test_lossless_bits_bounds() {
        assert!(with(|o| o.lossless_max_bits_per_pixel = 32).is_ok());
        assert!(matches!(
            with(|o| o.lossless_max_bits_per_pixel = 33),
            Err(ThumbgateError::BadOption { .. })
        ));
    }

    #[test]
    fn test_zero_width_means_source() {
        let resolved = with(|o| o.height = 300).unwrap();
        assert_eq!((resolved.width(), resolved.height()), (800, 300));
    }
}
