//! Dominant-color palettes by greedy clustering in CIE L*a*b*.
//!
//! Pixels are streamed one at a time into a [`PaletteExtractor`], which
//! assigns each to the first, largest-first cluster whose mean lies within a
//! tolerance under the chosen [`DistanceMetric`]. Once the stream ends the
//! clusters are ranked by size and the top entries form the [`Palette`].
//!
//! ```
//! use palette::Lab;
//! use palette_grab::{ExtractorConfig, PaletteExtractor};
//!
//! let mut extractor = PaletteExtractor::new(ExtractorConfig::default().with_tolerance(5.0))?;
//! for _ in 0..5 {
//!     extractor.ingest(Lab::new(50.0, 0.0, 0.0))?;
//! }
//! extractor.ingest(Lab::new(52.0, 1.0, 0.0))?;
//! extractor.ingest(Lab::new(10.0, 20.0, 20.0))?;
//!
//! let palette = extractor.finalize(2);
//! assert_eq!(palette.weights().collect::<Vec<_>>(), [6, 1]);
//! # Ok::<(), palette_grab::Error>(())
//! ```

use js_sys::{Array, Object, Reflect};
use wasm_bindgen::prelude::*;

pub mod cluster;
pub mod color_space;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod metric;

pub use cluster::Cluster;
pub use error::{Error, Result};
pub use extractor::{ExtractorConfig, Palette, PaletteExtractor, Swatch};
pub use ingest::{extract_palette, extract_palette_bytes};
pub use metric::DistanceMetric;

/// Extract the dominant colors of an encoded image.
///
/// `metric` accepts `"cie94"` (default) or `"ciede2000"`. The returned object
/// holds three parallel arrays, ordered by descending weight:
/// `palette` (hex strings), `lab` (`[L, a, b]` triples) and `weights`.
#[wasm_bindgen]
pub fn grab_palette(
    input: Vec<u8>,
    n_colors: usize,
    tolerance: Option<f64>,
    metric: Option<String>,
    scale: Option<u32>,
) -> std::result::Result<Object, JsValue> {
    let to_js = |e: Error| JsValue::from_str(&e.to_string());

    let metric = match metric {
        Some(name) => name.parse::<DistanceMetric>().map_err(to_js)?,
        None => DistanceMetric::default(),
    };
    let config = ExtractorConfig::default()
        .with_tolerance(tolerance.unwrap_or(extractor::DEFAULT_TOLERANCE))
        .with_metric(metric)
        .with_palette_size(n_colors);

    let palette = extract_palette_bytes(&input, config, scale, None).map_err(to_js)?;

    let hex_js = Array::new();
    let lab_js = Array::new();
    let weights_js = Array::new();
    for swatch in &palette {
        hex_js.push(&JsValue::from_str(&swatch.hex()));

        let lab = Array::new();
        lab.push(&JsValue::from_f64(f64::from(swatch.color.l)));
        lab.push(&JsValue::from_f64(f64::from(swatch.color.a)));
        lab.push(&JsValue::from_f64(f64::from(swatch.color.b)));
        lab_js.push(&lab);

        weights_js.push(&JsValue::from_f64(swatch.weight as f64));
    }

    let result = Object::new();
    Reflect::set(&result, &JsValue::from_str("palette"), &hex_js)?;
    Reflect::set(&result, &JsValue::from_str("lab"), &lab_js)?;
    Reflect::set(&result, &JsValue::from_str("weights"), &weights_js)?;

    Ok(result)
}
