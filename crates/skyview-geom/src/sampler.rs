//! Evenly spaced azimuth sampling over an angular range.

use serde::{Deserialize, Serialize};
use skyview_math::{AngleError, DirectionAngle};

use crate::error::{GeomError, Result};

/// Default number of sampled directions.
pub const DEFAULT_SAMPLE_COUNT: usize = 64;

/// An inclusive azimuth range in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngularRange {
    /// First sampled azimuth.
    pub start: f64,
    /// Last sampled azimuth.
    pub end: f64,
}

impl Default for AngularRange {
    fn default() -> Self {
        Self {
            start: 17.5,
            end: 162.5,
        }
    }
}

impl AngularRange {
    /// Create a validated range.
    pub fn new(start: f64, end: f64) -> Result<Self> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    /// Check that both bounds are finite and `start < end`.
    pub fn validate(&self) -> Result<()> {
        if !(self.start.is_finite() && self.end.is_finite()) || self.start >= self.end {
            return Err(GeomError::InvalidRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// Midpoint of the range.
    pub fn midpoint(&self) -> f64 {
        self.start + (self.end - self.start) / 2.0
    }
}

/// One sampled direction. `index` is its position in aggregated results.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionSample {
    /// Azimuth in degrees, as produced by the sampler.
    pub angle: f64,
    /// Position of this sample in the result array.
    pub index: usize,
}

impl DirectionSample {
    /// The canonical azimuth for this sample.
    pub fn direction(&self) -> std::result::Result<DirectionAngle, AngleError> {
        DirectionAngle::new(self.angle)
    }
}

/// Generates evenly spaced directions over a fixed range.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DirectionSampler {
    range: AngularRange,
}

impl DirectionSampler {
    /// Create a sampler over a validated range.
    pub fn new(range: AngularRange) -> Result<Self> {
        range.validate()?;
        Ok(Self { range })
    }

    /// The sampled range.
    pub fn range(&self) -> AngularRange {
        self.range
    }

    /// Produce `n` samples: `start + i * (end - start) / (n - 1)`.
    ///
    /// A single sample sits at the midpoint of the range. The last sample is
    /// pinned to `end` so the endpoints are reproduced exactly.
    pub fn sample(&self, n: usize) -> Result<Vec<DirectionSample>> {
        let AngularRange { start, end } = self.range;
        match n {
            0 => Err(GeomError::InvalidSampleCount(n)),
            1 => Ok(vec![DirectionSample {
                angle: self.range.midpoint(),
                index: 0,
            }]),
            _ => {
                let step = (end - start) / (n - 1) as f64;
                Ok((0..n)
                    .map(|index| DirectionSample {
                        angle: if index == n - 1 {
                            end
                        } else {
                            start + index as f64 * step
                        },
                        index,
                    })
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_range() {
        let r = AngularRange::default();
        assert_eq!(r.start, 17.5);
        assert_eq!(r.end, 162.5);
        assert_eq!(r.midpoint(), 90.0);
    }

    #[test]
    fn test_sample_count_and_endpoints() {
        let sampler = DirectionSampler::default();
        for n in [2, 3, 8, DEFAULT_SAMPLE_COUNT, 1000] {
            let samples = sampler.sample(n).unwrap();
            assert_eq!(samples.len(), n);
            assert_eq!(samples[0].angle, 17.5);
            assert_eq!(samples[n - 1].angle, 162.5);
            for (i, pair) in samples.windows(2).enumerate() {
                assert!(pair[1].angle > pair[0].angle, "n={n} i={i}");
                assert_eq!(pair[0].index, i);
            }
        }
    }

    #[test]
    fn test_eight_directions_spacing() {
        let samples = DirectionSampler::default().sample(8).unwrap();
        let step = 145.0 / 7.0;
        for s in &samples {
            assert!((s.angle - (17.5 + s.index as f64 * step)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_single_sample_is_midpoint() {
        let sampler = DirectionSampler::new(AngularRange::new(10.0, 50.0).unwrap()).unwrap();
        let samples = sampler.sample(1).unwrap();
        assert_eq!(samples, vec![DirectionSample { angle: 30.0, index: 0 }]);
    }

    #[test]
    fn test_zero_samples_rejected() {
        let err = DirectionSampler::default().sample(0).unwrap_err();
        assert_eq!(err, GeomError::InvalidSampleCount(0));
    }

    #[test]
    fn test_deterministic() {
        let sampler = DirectionSampler::default();
        assert_eq!(sampler.sample(37).unwrap(), sampler.sample(37).unwrap());
    }

    #[test]
    fn test_invalid_range() {
        assert!(AngularRange::new(90.0, 90.0).is_err());
        assert!(AngularRange::new(100.0, 10.0).is_err());
        assert!(AngularRange::new(f64::NAN, 10.0).is_err());
        let bad = AngularRange { start: 5.0, end: 1.0 };
        assert!(DirectionSampler::new(bad).is_err());
    }

    #[test]
    fn test_sample_direction_canonical() {
        let s = DirectionSample { angle: -30.0, index: 0 };
        assert_eq!(s.direction().unwrap().degrees(), 330.0);
    }
}
