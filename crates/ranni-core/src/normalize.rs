//! Numeric attribute normalization.
//!
//! Attributes with a configured `(min, max)` range are scaled into `[0, 1]`
//! and clamped. Other attributes are scaled against the smallest and largest
//! values observed so far, which makes the first reading of every attribute
//! normalize to `0.0`.

use std::collections::BTreeMap;

use ranni_types::Observation;

/// Scales observation attributes into `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeNormalizer {
    ranges: BTreeMap<String, (f64, f64)>,
    observed: BTreeMap<String, (f64, f64)>,
}

impl AttributeNormalizer {
    /// A normalizer with fixed ranges for some attributes.
    pub const fn new(ranges: BTreeMap<String, (f64, f64)>) -> Self {
        Self {
            ranges,
            observed: BTreeMap::new(),
        }
    }

    /// Normalize one value, updating the observed range when `name` has no
    /// configured range.
    pub fn normalize(&mut self, name: &str, value: f64) -> f64 {
        let (min, max) = match self.ranges.get(name) {
            Some(&range) => range,
            None => {
                let range = self
                    .observed
                    .entry(name.to_owned())
                    .and_modify(|(lo, hi)| {
                        *lo = lo.min(value);
                        *hi = hi.max(value);
                    })
                    .or_insert((value, value));
                *range
            }
        };

        if max > min {
            ((value - min) / (max - min)).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Normalize every attribute of `observation` in place.
    pub fn apply(&mut self, observation: &mut Observation) {
        for (name, value) in &mut observation.attributes {
            *value = self.normalize(name, *value);
        }
    }

    /// Forget observed ranges. Configured ranges are kept.
    pub fn reset_observed(&mut self) {
        self.observed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_range_scales_and_clamps() {
        let mut ranges = BTreeMap::new();
        ranges.insert("HeroHp".to_owned(), (0.0, 200.0));
        let mut normalizer = AttributeNormalizer::new(ranges);
        assert!((normalizer.normalize("HeroHp", 50.0) - 0.25).abs() < 1e-12);
        assert!((normalizer.normalize("HeroHp", 400.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn observed_range_grows() {
        let mut normalizer = AttributeNormalizer::default();
        assert!(normalizer.normalize("NpcHp", 10.0).abs() < 1e-12);
        assert!((normalizer.normalize("NpcHp", 30.0) - 1.0).abs() < 1e-12);
        assert!((normalizer.normalize("NpcHp", 20.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn equal_bounds_normalize_to_zero() {
        let mut ranges = BTreeMap::new();
        ranges.insert("flat".to_owned(), (3.0, 3.0));
        let mut normalizer = AttributeNormalizer::new(ranges);
        assert!(normalizer.normalize("flat", 3.0).abs() < 1e-12);
    }

    #[test]
    fn reset_keeps_configured_ranges() {
        let mut ranges = BTreeMap::new();
        ranges.insert("a".to_owned(), (0.0, 10.0));
        let mut normalizer = AttributeNormalizer::new(ranges);
        let _ = normalizer.normalize("b", 4.0);
        normalizer.reset_observed();
        assert!((normalizer.normalize("a", 5.0) - 0.5).abs() < 1e-12);
        assert!(normalizer.normalize("b", 9.0).abs() < 1e-12);
    }
}
