use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use palette_grab::{DistanceMetric, ExtractorConfig, Palette, extract_palette_bytes};
use serde_json::json;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    /// `RRGGBB weight` per line
    Hex,
    /// `r g b weight` per line, truncated and unclamped
    Rgb,
    /// `L a b weight` per line
    Lab,
    /// One JSON document per input
    Json,
}

/// Report the dominant colors of images by greedy Lab clustering.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// One or more input image paths
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Number of palette entries to report
    #[arg(short = 'k', long, default_value_t = 8)]
    n_colors: usize,

    /// Clustering tolerance in metric units
    #[arg(short, long, default_value_t = 15.0)]
    tolerance: f64,

    /// Distance metric: cie94 or ciede2000
    #[arg(short, long, default_value = "cie94")]
    metric: String,

    /// Shrink the longest side to this many pixels before clustering
    #[arg(short, long)]
    scale: Option<u32>,

    /// Stop after this many visible pixels
    #[arg(long)]
    max_samples: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Hex)]
    format: Format,
}

fn print_palette(
    input: &Path,
    config: &ExtractorConfig,
    palette: &Palette,
    format: Format,
) -> Result<()> {
    match format {
        Format::Hex => {
            for swatch in palette {
                println!("{} {}", swatch.hex(), swatch.weight);
            }
        }
        Format::Rgb => {
            for swatch in palette {
                let [r, g, b] = swatch.rgb();
                println!("{r} {g} {b} {}", swatch.weight);
            }
        }
        Format::Lab => {
            for (c, weight) in palette.colors().zip(palette.weights()) {
                println!("{:.3} {:.3} {:.3} {weight}", c.l, c.a, c.b);
            }
        }
        Format::Json => {
            let swatches: Vec<_> = palette
                .iter()
                .map(|s| {
                    json!({
                        "hex": s.hex(),
                        "lab": [s.color.l, s.color.a, s.color.b],
                        "weight": s.weight,
                    })
                })
                .collect();
            let doc = json!({
                "input": input.display().to_string(),
                "config": config,
                "samples": palette.total_weight(),
                "palette": swatches,
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let metric: DistanceMetric = args.metric.parse()?;
    let config = ExtractorConfig::default()
        .with_tolerance(args.tolerance)
        .with_metric(metric)
        .with_palette_size(args.n_colors);
    config.validate()?;

    for input in &args.inputs {
        let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
        let palette = extract_palette_bytes(&bytes, config, args.scale, args.max_samples)
            .with_context(|| format!("extracting palette from {}", input.display()))?;

        tracing::info!("{}: {} colors", input.display(), palette.len());
        if args.inputs.len() > 1 && !matches!(args.format, Format::Json) {
            println!("# {}", input.display());
        }
        print_palette(input, &config, &palette, args.format)?;
    }

    Ok(())
}
