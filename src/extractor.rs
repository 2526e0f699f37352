//! Greedy online clustering of Lab samples into a ranked palette.
//!
//! Samples are assigned to the *first* cluster, in size-descending order,
//! whose mean lies within the tolerance, not to the nearest one. Large
//! clusters are tested first and so keep absorbing borderline samples, which
//! keeps a dominant hue from splintering into near-duplicates.

use std::cmp::Reverse;

use palette::Lab;

use crate::cluster::Cluster;
use crate::color_space;
use crate::error::{Error, Result};
use crate::metric::DistanceMetric;

pub const DEFAULT_TOLERANCE: f64 = 15.0;
pub const DEFAULT_PALETTE_SIZE: usize = 8;

/// Settings for one extraction pass.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtractorConfig {
    /// Samples strictly closer than this to a cluster mean join the cluster.
    pub tolerance: f64,
    pub metric: DistanceMetric,
    /// Number of entries [`PaletteExtractor::palette`] keeps.
    pub palette_size: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            metric: DistanceMetric::default(),
            palette_size: DEFAULT_PALETTE_SIZE,
        }
    }
}

impl ExtractorConfig {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_palette_size(mut self, palette_size: usize) -> Self {
        self.palette_size = palette_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_tolerance(self.tolerance)?;
        validate_palette_size(self.palette_size)
    }
}

fn validate_tolerance(tolerance: f64) -> Result<()> {
    if tolerance.is_finite() && tolerance >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidTolerance(tolerance))
    }
}

fn validate_palette_size(palette_size: usize) -> Result<()> {
    if palette_size == 0 {
        Err(Error::InvalidPaletteSize)
    } else {
        Ok(())
    }
}

// ------------------------------------------------------------
// Palette
// ------------------------------------------------------------

/// One palette entry: a cluster mean and the number of samples behind it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Swatch {
    pub color: Lab,
    pub weight: usize,
}

impl Swatch {
    /// sRGB rendering of the color, truncated and not clamped.
    pub fn rgb(&self) -> [i32; 3] {
        color_space::to_rgb(self.color)
    }

    pub fn hex(&self) -> String {
        color_space::to_hex(self.color)
    }
}

/// Clusters ranked by descending weight, at most the requested length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Palette {
    swatches: Vec<Swatch>,
}

impl Palette {
    pub fn swatches(&self) -> &[Swatch] {
        &self.swatches
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Swatch> {
        self.swatches.iter()
    }

    pub fn len(&self) -> usize {
        self.swatches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.swatches.is_empty()
    }

    /// Sum of all weights, i.e. the samples covered by this palette.
    pub fn total_weight(&self) -> usize {
        self.swatches.iter().map(|s| s.weight).sum()
    }

    pub fn colors(&self) -> impl Iterator<Item = Lab> + '_ {
        self.swatches.iter().map(|s| s.color)
    }

    pub fn weights(&self) -> impl Iterator<Item = usize> + '_ {
        self.swatches.iter().map(|s| s.weight)
    }

    pub fn to_hex(&self) -> Vec<String> {
        self.swatches.iter().map(Swatch::hex).collect()
    }
}

impl<'a> IntoIterator for &'a Palette {
    type Item = &'a Swatch;
    type IntoIter = std::slice::Iter<'a, Swatch>;

    fn into_iter(self) -> Self::IntoIter {
        self.swatches.iter()
    }
}

// ------------------------------------------------------------
// Extractor
// ------------------------------------------------------------

/// Runs one pass of samples against a size-ordered cluster list.
///
/// Configuration is fixed while a pass holds clusters; call
/// [`reset`](Self::reset) before reconfiguring.
#[derive(Clone, Debug, Default)]
pub struct PaletteExtractor {
    config: ExtractorConfig,
    clusters: Vec<Cluster>,
}

impl PaletteExtractor {
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            clusters: Vec::new(),
        })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Clusters in their current order, largest first.
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// Number of samples ingested since the last reset.
    pub fn sample_count(&self) -> usize {
        self.clusters.iter().map(Cluster::len).sum()
    }

    /// Assign one sample to the first cluster it is near, or start a new one.
    pub fn ingest(&mut self, sample: Lab) -> Result<()> {
        if !(sample.l.is_finite() && sample.a.is_finite() && sample.b.is_finite()) {
            return Err(Error::NonFiniteSample {
                l: sample.l,
                a: sample.a,
                b: sample.b,
            });
        }

        let ExtractorConfig {
            tolerance, metric, ..
        } = self.config;

        match self
            .clusters
            .iter_mut()
            .find(|cluster| cluster.is_near(sample, metric, tolerance))
        {
            Some(cluster) => cluster.add(sample),
            None => self.clusters.push(Cluster::new(sample)),
        }

        self.sort_clusters();
        Ok(())
    }

    /// Ingest a sample given as a raw channel slice `[L, a, b]`.
    pub fn ingest_channels(&mut self, channels: &[f32]) -> Result<()> {
        let &[l, a, b] = channels else {
            return Err(Error::MalformedSample {
                channels: channels.len(),
            });
        };
        self.ingest(Lab::new(l, a, b))
    }

    /// Ingest every sample in order, stopping at the first rejected one.
    pub fn extend<I>(&mut self, samples: I) -> Result<()>
    where
        I: IntoIterator<Item = Lab>,
    {
        samples.into_iter().try_for_each(|sample| self.ingest(sample))
    }

    /// Rank clusters by size and keep the largest `limit`.
    ///
    /// Returns fewer entries when fewer clusters exist. Clusters are left in
    /// place, so this may be called again with a different limit.
    pub fn finalize(&mut self, limit: usize) -> Palette {
        self.sort_clusters();
        Palette {
            swatches: self
                .clusters
                .iter()
                .take(limit)
                .map(|cluster| Swatch {
                    color: cluster.mean(),
                    weight: cluster.len(),
                })
                .collect(),
        }
    }

    /// [`finalize`](Self::finalize) with the configured palette size.
    pub fn palette(&mut self) -> Palette {
        self.finalize(self.config.palette_size)
    }

    /// Drop all clusters, ending the current pass.
    pub fn reset(&mut self) {
        self.clusters.clear();
    }

    pub fn set_tolerance(&mut self, tolerance: f64) -> Result<()> {
        self.ensure_idle()?;
        validate_tolerance(tolerance)?;
        self.config.tolerance = tolerance;
        Ok(())
    }

    pub fn set_metric(&mut self, metric: DistanceMetric) -> Result<()> {
        self.ensure_idle()?;
        self.config.metric = metric;
        Ok(())
    }

    pub fn set_palette_size(&mut self, palette_size: usize) -> Result<()> {
        self.ensure_idle()?;
        validate_palette_size(palette_size)?;
        self.config.palette_size = palette_size;
        Ok(())
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.clusters.is_empty() {
            Ok(())
        } else {
            Err(Error::PassInProgress {
                clusters: self.clusters.len(),
            })
        }
    }

    // Stable, so equally sized clusters keep their relative order.
    fn sort_clusters(&mut self) {
        self.clusters.sort_by_key(|cluster| Reverse(cluster.len()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(l: f32) -> Lab {
        Lab::new(l, 0.0, 0.0)
    }

    fn extractor(tolerance: f64) -> PaletteExtractor {
        PaletteExtractor::new(ExtractorConfig::default().with_tolerance(tolerance))
            .expect("valid config")
    }

    #[test]
    fn defaults() {
        let config = ExtractorConfig::default();
        assert_eq!(config.tolerance, 15.0);
        assert_eq!(config.metric, DistanceMetric::Cie94);
        assert_eq!(config.palette_size, 8);
    }

    #[test]
    fn scenario_two_clusters() {
        let mut ex = extractor(5.0);
        for _ in 0..5 {
            ex.ingest(Lab::new(50.0, 0.0, 0.0)).expect("ingest");
        }
        ex.ingest(Lab::new(52.0, 1.0, 0.0)).expect("ingest");
        ex.ingest(Lab::new(10.0, 20.0, 20.0)).expect("ingest");

        assert_eq!(ex.cluster_count(), 2);
        let palette = ex.finalize(2);
        assert_eq!(palette.len(), 2);

        let big = palette.swatches()[0];
        assert_eq!(big.weight, 6);
        assert!((big.color.l - 50.333_332).abs() < 1e-4);
        assert!((big.color.a - 0.166_666_7).abs() < 1e-4);
        assert_eq!(big.color.b, 0.0);

        let small = palette.swatches()[1];
        assert_eq!(small.weight, 1);
        assert_eq!(small.color, Lab::new(10.0, 20.0, 20.0));
    }

    #[test]
    fn exact_tolerance_starts_new_cluster() {
        let mut ex = extractor(10.0);
        ex.ingest(gray(50.0)).expect("ingest");
        ex.ingest(gray(60.0)).expect("ingest");
        assert_eq!(ex.cluster_count(), 2);
    }

    #[test]
    fn just_below_tolerance_joins() {
        let mut ex = extractor(10.0 + 1e-6);
        ex.ingest(gray(50.0)).expect("ingest");
        ex.ingest(gray(60.0)).expect("ingest");
        assert_eq!(ex.cluster_count(), 1);
        assert_eq!(ex.clusters()[0].mean(), gray(55.0));
    }

    #[test]
    fn larger_cluster_wins_ambiguous_sample() {
        let mut ex = extractor(15.0);
        ex.ingest(gray(40.0)).expect("ingest");
        ex.ingest(gray(60.0)).expect("ingest");
        // Both singletons; the first one created is still first.
        assert_eq!(ex.clusters()[0].mean(), gray(40.0));

        ex.ingest(gray(60.0)).expect("ingest");
        assert_eq!(ex.clusters()[0].mean(), gray(60.0));
        assert_eq!(ex.clusters()[0].len(), 2);

        // Exactly 10 away from both means.
        ex.ingest(gray(50.0)).expect("ingest");
        assert_eq!(ex.clusters()[0].len(), 3);
        assert_eq!(ex.clusters()[1].len(), 1);
        assert_eq!(ex.clusters()[1].mean(), gray(40.0));
    }

    #[test]
    fn first_match_not_nearest_match() {
        let mut ex = extractor(15.0);
        for _ in 0..3 {
            ex.ingest(gray(30.0)).expect("ingest");
        }
        ex.ingest(gray(50.0)).expect("ingest");

        // 12 from the large cluster, 8 from the small one.
        ex.ingest(gray(42.0)).expect("ingest");
        assert_eq!(ex.clusters()[0].len(), 4);
        assert_eq!(ex.clusters()[1].len(), 1);
    }

    #[test]
    fn ties_keep_creation_order() {
        let mut ex = extractor(1.0);
        for l in [10.0, 30.0, 50.0, 70.0] {
            ex.ingest(gray(l)).expect("ingest");
        }
        ex.ingest(gray(50.0)).expect("ingest");

        let means: Vec<f32> = ex.clusters().iter().map(|c| c.mean().l).collect();
        assert_eq!(means, [50.0, 10.0, 30.0, 70.0]);
    }

    #[test]
    fn palette_size_bound() {
        let mut ex = extractor(1.0);
        for l in 0..12u8 {
            ex.ingest(gray(f32::from(l) * 5.0)).expect("ingest");
        }
        assert_eq!(ex.finalize(8).len(), 8);
        assert_eq!(ex.finalize(12).len(), 12);
        assert_eq!(ex.finalize(20).len(), 12);
        assert!(ex.finalize(0).is_empty());
        assert_eq!(ex.palette().len(), 8);
    }

    #[test]
    fn empty_pass_gives_empty_palette() {
        let mut ex = PaletteExtractor::default();
        assert!(ex.palette().is_empty());
        assert_eq!(ex.sample_count(), 0);
    }

    #[test]
    fn palette_is_sorted_by_weight() {
        let mut ex = extractor(1.0);
        let counts = [(10.0, 1), (30.0, 4), (50.0, 2), (70.0, 3)];
        for (l, n) in counts {
            for _ in 0..n {
                ex.ingest(gray(l)).expect("ingest");
            }
        }
        let palette = ex.palette();
        assert_eq!(palette.weights().collect::<Vec<_>>(), [4, 3, 2, 1]);
        let lightness: Vec<f32> = palette.colors().map(|c| c.l).collect();
        assert_eq!(lightness, [30.0, 70.0, 50.0, 10.0]);
        assert_eq!(palette.total_weight(), 10);
        assert_eq!(ex.sample_count(), 10);
    }

    #[test]
    fn malformed_channels_are_rejected() {
        let mut ex = PaletteExtractor::default();
        assert!(matches!(
            ex.ingest_channels(&[50.0, 0.0]),
            Err(Error::MalformedSample { channels: 2 })
        ));
        assert!(matches!(
            ex.ingest_channels(&[0.0, 50.0, 0.0, 0.0]),
            Err(Error::MalformedSample { channels: 4 })
        ));
        assert!(matches!(
            ex.ingest(Lab::new(f32::NAN, 0.0, 0.0)),
            Err(Error::NonFiniteSample { .. })
        ));
        assert_eq!(ex.cluster_count(), 0);

        ex.ingest_channels(&[50.0, 0.0, 0.0]).expect("well formed");
        assert_eq!(ex.cluster_count(), 1);
    }

    #[test]
    fn extend_stops_at_first_error() {
        let mut ex = PaletteExtractor::default();
        let samples = [gray(10.0), Lab::new(f32::INFINITY, 0.0, 0.0), gray(90.0)];
        assert!(ex.extend(samples).is_err());
        assert_eq!(ex.sample_count(), 1);
    }

    #[test]
    fn reconfiguring_mid_pass_is_rejected() {
        let mut ex = PaletteExtractor::default();
        ex.set_metric(DistanceMetric::Ciede2000).expect("idle");
        ex.ingest(gray(50.0)).expect("ingest");

        assert!(matches!(
            ex.set_metric(DistanceMetric::Cie94),
            Err(Error::PassInProgress { clusters: 1 })
        ));
        assert!(ex.set_tolerance(3.0).is_err());
        assert!(ex.set_palette_size(3).is_err());
        assert_eq!(ex.config().metric, DistanceMetric::Ciede2000);

        ex.reset();
        ex.set_tolerance(3.0).expect("idle");
        ex.set_palette_size(3).expect("idle");
        assert_eq!(ex.config().tolerance, 3.0);
        assert_eq!(ex.config().palette_size, 3);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let bad_tolerance = ExtractorConfig::default().with_tolerance(f64::NAN);
        assert!(matches!(
            PaletteExtractor::new(bad_tolerance),
            Err(Error::InvalidTolerance(_))
        ));
        let negative = ExtractorConfig::default().with_tolerance(-1.0);
        assert!(PaletteExtractor::new(negative).is_err());
        let empty = ExtractorConfig::default().with_palette_size(0);
        assert!(matches!(
            PaletteExtractor::new(empty),
            Err(Error::InvalidPaletteSize)
        ));
    }

    #[test]
    fn swatch_rendering() {
        let swatch = Swatch {
            color: gray(0.0),
            weight: 3,
        };
        assert_eq!(swatch.rgb(), [0, 0, 0]);
        assert_eq!(swatch.hex(), "000000");
    }
}
