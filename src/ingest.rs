//! Feeding decoded images into a [`PaletteExtractor`].

use image::{DynamicImage, GenericImageView, imageops::FilterType};
use palette::{IntoColor, Lab, LinSrgb, Srgb};

use crate::error::{Error, Result};
use crate::extractor::{ExtractorConfig, Palette, PaletteExtractor};

/// Lab samples of every visible pixel, row by row from the top left.
///
/// Fully transparent pixels (alpha 0) are skipped; any other alpha value is
/// ignored. Pixels are converted as the iterator is consumed.
pub fn lab_samples(img: &DynamicImage) -> impl Iterator<Item = Lab> + '_ {
    img.pixels()
        .filter(|(_, _, px)| px[3] != 0)
        .map(|(_, _, px)| {
            let linear: LinSrgb<f32> = Srgb::<u8>::new(px[0], px[1], px[2]).into_linear();
            linear.into_color()
        })
}

/// Shrink an image so that its longest side is at most `longest_side`,
/// keeping the aspect ratio. Smaller images are returned unchanged.
pub fn downscale(img: DynamicImage, longest_side: u32) -> DynamicImage {
    let (orig_w, orig_h) = img.dimensions();
    let max_side = orig_w.max(orig_h);
    if longest_side == 0 || max_side <= longest_side {
        return img;
    }

    let ratio = longest_side as f32 / max_side as f32;
    let w = ((orig_w as f32) * ratio).round().max(1.0) as u32;
    let h = ((orig_h as f32) * ratio).round().max(1.0) as u32;
    DynamicImage::ImageRgba8(image::imageops::resize(&img, w, h, FilterType::Nearest))
}

/// Read a sample from a four-plane cell laid out as `[pad, L, a, b]`.
///
/// The leading plane carries alpha or padding and is ignored. Cells of any
/// other length are rejected.
pub fn sample_from_cell(cell: &[f32]) -> Result<Lab> {
    match *cell {
        [_, l, a, b] => Ok(Lab::new(l, a, b)),
        _ => Err(Error::MalformedSample {
            channels: cell.len(),
        }),
    }
}

/// Run one pass over an image and return its palette.
///
/// At most `max_samples` visible pixels are ingested when a cap is given.
pub fn extract_palette(
    img: &DynamicImage,
    config: ExtractorConfig,
    max_samples: Option<usize>,
) -> Result<Palette> {
    let mut extractor = PaletteExtractor::new(config)?;

    tracing::debug!(
        "Ingesting up to {:?} visible pixels ({}, tolerance {})",
        max_samples,
        config.metric,
        config.tolerance
    );

    let cap = max_samples.unwrap_or(usize::MAX);
    extractor.extend(lab_samples(img).take(cap))?;
    let palette = extractor.palette();

    tracing::debug!(
        "Grouped {} samples into {} clusters, kept {}",
        extractor.sample_count(),
        extractor.cluster_count(),
        palette.len()
    );
    Ok(palette)
}

/// Decode an encoded image, optionally shrink it, and extract its palette.
pub fn extract_palette_bytes(
    input: &[u8],
    config: ExtractorConfig,
    scale: Option<u32>,
    max_samples: Option<usize>,
) -> Result<Palette> {
    let img = image::load_from_memory(input)?;
    let (w, h) = img.dimensions();
    tracing::debug!("Decoded {}x{} image", w, h);

    let img = match scale {
        Some(side) => downscale(img, side),
        None => img,
    };

    extract_palette(&img, config, max_samples)
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::*;

    fn solid(w: u32, h: u32, px: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba(px)))
    }

    #[test]
    fn transparent_pixels_are_skipped() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        img.put_pixel(3, 3, Rgba([0, 0, 0, 0]));

        let samples: Vec<Lab> = lab_samples(&DynamicImage::ImageRgba8(img)).collect();
        assert_eq!(samples.len(), 14);
        for s in samples {
            assert!((s.l - 100.0).abs() < 0.1, "white should be L=100, got {}", s.l);
        }
    }

    #[test]
    fn samples_are_row_major() {
        let mut img = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([255, 255, 255, 255]));

        let samples: Vec<Lab> = lab_samples(&DynamicImage::ImageRgba8(img)).collect();
        assert!(samples[0].l < 1.0);
        assert!(samples[1].l > 99.0);
        assert!(samples[2].l < 1.0);
    }

    #[test]
    fn downscale_keeps_aspect() {
        let img = downscale(solid(200, 100, [1, 2, 3, 255]), 50);
        assert_eq!(img.dimensions(), (50, 25));

        let small = downscale(solid(20, 10, [1, 2, 3, 255]), 50);
        assert_eq!(small.dimensions(), (20, 10));
    }

    #[test]
    fn cells() {
        let lab = sample_from_cell(&[255.0, 50.0, 1.0, -2.0]).expect("four planes");
        assert_eq!(lab, Lab::new(50.0, 1.0, -2.0));

        assert!(matches!(
            sample_from_cell(&[50.0, 1.0, -2.0]),
            Err(Error::MalformedSample { channels: 3 })
        ));
    }

    #[test]
    fn two_tone_image() {
        let mut img = RgbaImage::from_pixel(10, 10, Rgba([200, 30, 30, 255]));
        for x in 0..10 {
            for y in 0..3 {
                img.put_pixel(x, y, Rgba([20, 40, 220, 255]));
            }
        }

        let palette = extract_palette(&DynamicImage::ImageRgba8(img), ExtractorConfig::default(), None)
            .expect("palette");
        assert_eq!(palette.len(), 2);
        assert_eq!(palette.weights().collect::<Vec<_>>(), [70, 30]);

        let red = palette.swatches()[0].rgb();
        assert!((red[0] - 200).abs() <= 2, "{red:?}");
        assert!((red[1] - 30).abs() <= 2, "{red:?}");
    }

    #[test]
    fn sample_cap() {
        let palette = extract_palette(&solid(8, 8, [90, 90, 90, 255]), ExtractorConfig::default(), Some(10))
            .expect("palette");
        assert_eq!(palette.total_weight(), 10);
    }

    #[test]
    fn cap_stops_reading_pixels() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        img.put_pixel(3, 0, Rgba([255, 255, 255, 255]));
        img.put_pixel(0, 3, Rgba([255, 0, 0, 255]));
        let img = DynamicImage::ImageRgba8(img);

        let first_row: Vec<Lab> = lab_samples(&img).take(4).collect();
        assert_eq!(first_row.len(), 4);
        assert!(first_row[3].l > 99.0);

        let palette = extract_palette(&img, ExtractorConfig::default(), Some(4)).expect("palette");
        assert_eq!(palette.weights().collect::<Vec<_>>(), [3, 1]);
    }

    #[test]
    fn bad_bytes_are_an_image_error() {
        let err = extract_palette_bytes(b"not an image", ExtractorConfig::default(), None, None);
        assert!(matches!(err, Err(Error::Image(_))));
    }
}
