use super::{IndicatorSeries, check_period, sma};
use crate::error::{MarketError, Result};
use crate::ohlcv::{OhlcvPoint, PriceField};
use serde::Serialize;

/// Bollinger bands aligned with the input series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BollingerBands {
    pub upper: IndicatorSeries,
    pub middle: IndicatorSeries,
    pub lower: IndicatorSeries,
}

/// Bollinger bands around the SMA of closing prices
///
/// The standard deviation is the population deviation of the same trailing
/// window the middle band averages.
pub fn bollinger(series: &[OhlcvPoint], period: usize, multiplier: f64) -> Result<BollingerBands> {
    check_period("Bollinger", period)?;
    if !multiplier.is_finite() || multiplier < 0.0 {
        return Err(MarketError::InvalidParameter(format!(
            "Bollinger multiplier must be a non-negative number, got {multiplier}"
        )));
    }

    let middle = sma(series, period, PriceField::Close)?;
    let mut upper = vec![None; series.len()];
    let mut lower = vec![None; series.len()];

    for (i, mean) in middle.iter().enumerate() {
        let Some(mean) = *mean else { continue };
        let window = &series[i + 1 - period..=i];
        let variance = window
            .iter()
            .map(|p| (p.close - mean).powi(2))
            .sum::<f64>()
            / period as f64;
        let width = multiplier * variance.sqrt();
        upper[i] = Some(mean + width);
        lower[i] = Some(mean - width);
    }

    Ok(BollingerBands {
        upper,
        middle,
        lower,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::{bars, walk};

    #[test]
    fn test_known_band() {
        // closes 2, 4, 6: mean 4, population variance 8/3
        let out = bollinger(&bars(&[2.0, 4.0, 6.0]), 3, 2.0).unwrap();
        let sd = (8.0_f64 / 3.0).sqrt();
        assert_eq!(out.middle, vec![None, None, Some(4.0)]);
        assert!((out.upper[2].unwrap() - (4.0 + 2.0 * sd)).abs() < 1e-12);
        assert!((out.lower[2].unwrap() - (4.0 - 2.0 * sd)).abs() < 1e-12);
    }

    #[test]
    fn test_bands_are_ordered() {
        let out = bollinger(&bars(&walk(80)), 20, 2.0).unwrap();
        for i in 0..80 {
            if let (Some(u), Some(m), Some(l)) = (out.upper[i], out.middle[i], out.lower[i]) {
                assert!(u >= m && m >= l, "index {i}: {u} {m} {l}");
            }
        }
        assert!(out.upper[..19].iter().all(Option::is_none));
        assert!(out.lower[19..].iter().all(Option::is_some));
    }

    #[test]
    fn test_flat_series_collapses_bands() {
        let out = bollinger(&bars(&[5.0; 4]), 2, 2.0).unwrap();
        assert_eq!(out.upper[3], Some(5.0));
        assert_eq!(out.lower[3], Some(5.0));
    }

    #[test]
    fn test_invalid_multiplier() {
        let series = bars(&walk(30));
        assert!(bollinger(&series, 20, -1.0).is_err());
        assert!(bollinger(&series, 20, f64::NAN).is_err());
        assert!(bollinger(&series, 0, 2.0).is_err());
    }
}
