//! Empirical quantiles
//!
//! All thresholds in the pipeline (anomaly tiers, role quartiles, variability
//! bands, deviation limits) are empirical quantiles computed with linear
//! interpolation between closest ranks.

/// Precomputed quantile values for a dataset.
///
/// # Examples
///
/// ```
/// use ethoscan::quantile::Quantiles;
///
/// let quantiles = Quantiles::new([4.0, 1.0, 3.0, 2.0, 5.0], &[0.25, 0.5]);
///
/// assert_eq!(quantiles.get(0.5), Some(3.0));
/// assert_eq!(quantiles.get(0.25), Some(2.0));
/// assert_eq!(quantiles.get(0.75), None); // not precomputed
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Quantiles {
    /// (level, value) pairs in the order requested; level is in 0.0..=1.0
    values: Vec<(f64, f64)>,
}

impl Quantiles {
    /// Computes quantiles from unsorted values. Non-finite values are skipped.
    ///
    /// Levels for which no value can be computed (empty input) are omitted.
    pub fn new<I>(values: I, levels: &[f64]) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let sorted = sorted_finite(values);
        let values = levels
            .iter()
            .filter_map(|&q| quantile_sorted(&sorted, q).map(|v| (q, v)))
            .collect();
        Self { values }
    }

    /// Value at a precomputed level
    pub fn get(&self, level: f64) -> Option<f64> {
        self.values
            .iter()
            .find(|(q, _)| (q - level).abs() < f64::EPSILON)
            .map(|&(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.values.iter().copied()
    }
}

/// Single quantile of unsorted values. Returns `None` for empty input.
///
/// ```
/// use ethoscan::quantile::quantile;
///
/// // position 0.75 * (2 - 1) = 0.75 between -4 and 4
/// assert_eq!(quantile([4.0, -4.0], 0.75), Some(2.0));
/// assert_eq!(quantile(Vec::<f64>::new(), 0.5), None);
/// ```
pub fn quantile<I>(values: I, q: f64) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    quantile_sorted(&sorted_finite(values), q)
}

/// Quantile of already-sorted values using linear interpolation.
///
/// `q` is clamped to `0.0..=1.0`. For `n` values the fractional position is
/// `q * (n - 1)`; the result interpolates between the values at the floor and
/// ceiling of that position.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

fn sorted_finite<I>(values: I) -> Vec<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut sorted: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_interpolates() {
        let values = [0.0, 10.0, 20.0, 30.0, 40.0];
        assert_eq!(quantile(values, 0.0), Some(0.0));
        assert_eq!(quantile(values, 1.0), Some(40.0));
        assert_eq!(quantile(values, 0.5), Some(20.0));
        // position 0.1 * 4 = 0.4
        assert!((quantile(values, 0.1).unwrap() - 4.0).abs() < 1e-12);
        // position 0.95 * 4 = 3.8
        assert!((quantile(values, 0.95).unwrap() - 38.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_value_is_every_quantile() {
        for q in [0.01, 0.25, 0.5, 0.99] {
            assert_eq!(quantile([0.3], q), Some(0.3));
        }
    }

    #[test]
    fn test_non_finite_values_skipped() {
        assert_eq!(quantile([f64::NAN, 1.0, 3.0], 0.5), Some(2.0));
        assert_eq!(quantile([f64::NAN], 0.5), None);
    }

    #[test]
    fn test_quantiles_lookup() {
        let q = Quantiles::new([1.0, 2.0, 3.0, 4.0], &[0.25, 0.75]);
        assert!((q.get(0.25).unwrap() - 1.75).abs() < 1e-12);
        assert!((q.get(0.75).unwrap() - 3.25).abs() < 1e-12);
        assert_eq!(q.iter().count(), 2);

        let empty = Quantiles::new(Vec::new(), &[0.5]);
        assert!(empty.is_empty());
        assert_eq!(empty.get(0.5), None);
    }

    #[test]
    fn test_out_of_range_level_clamped() {
        assert_eq!(quantile([1.0, 2.0], 1.5), Some(2.0));
        assert_eq!(quantile([1.0, 2.0], -0.5), Some(1.0));
    }
}
