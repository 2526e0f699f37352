use palette::Lab;

use crate::metric::DistanceMetric;

/// A group of Lab samples close enough to count as one palette color.
///
/// A cluster is never empty: it is created from its first sample and only
/// grows afterwards. The mean is the per-channel arithmetic mean of every
/// sample it owns. Channel sums are kept in `f64` so the mean is read off in
/// constant time instead of re-summing the member list on each insertion.
#[derive(Clone, Debug)]
pub struct Cluster {
    samples: Vec<Lab>,
    sum: [f64; 3],
    mean: Lab,
}

impl Cluster {
    pub fn new(sample: Lab) -> Self {
        Self {
            samples: vec![sample],
            sum: [
                f64::from(sample.l),
                f64::from(sample.a),
                f64::from(sample.b),
            ],
            mean: sample,
        }
    }

    /// Add a sample and update the mean.
    pub fn add(&mut self, sample: Lab) {
        self.samples.push(sample);
        self.sum[0] += f64::from(sample.l);
        self.sum[1] += f64::from(sample.a);
        self.sum[2] += f64::from(sample.b);

        let n = self.samples.len() as f64;
        self.mean = Lab::new(
            (self.sum[0] / n) as f32,
            (self.sum[1] / n) as f32,
            (self.sum[2] / n) as f32,
        );
    }

    /// Whether `sample` lies strictly within `tolerance` of the mean.
    #[inline]
    pub fn is_near(&self, sample: Lab, metric: DistanceMetric, tolerance: f64) -> bool {
        metric.distance(self.mean, sample) < tolerance
    }

    pub fn mean(&self) -> Lab {
        self.mean
    }

    /// Samples in insertion order.
    pub fn samples(&self) -> &[Lab] {
        &self.samples
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.samples.len()
    }
}
