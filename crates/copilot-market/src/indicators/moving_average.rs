use super::{IndicatorSeries, check_period};
use crate::error::Result;
use crate::ohlcv::{OhlcvPoint, PriceField};

/// Simple moving average of one price field
pub fn sma(series: &[OhlcvPoint], period: usize, field: PriceField) -> Result<IndicatorSeries> {
    let values: Vec<f64> = series.iter().map(|p| p.price(field)).collect();
    sma_values(&values, period)
}

/// Simple moving average over raw values
///
/// Undefined for indices below `period - 1`.
pub fn sma_values(values: &[f64], period: usize) -> Result<IndicatorSeries> {
    check_period("SMA", period)?;
    let mut out = vec![None; values.len()];
    for (i, window) in values.windows(period).enumerate() {
        out[i + period - 1] = Some(window.iter().sum::<f64>() / period as f64);
    }
    Ok(out)
}

/// Exponential moving average seeded with the SMA of the first `period` values
///
/// Smoothing factor `k = 2 / (period + 1)`.
pub fn ema(values: &[f64], period: usize) -> Result<IndicatorSeries> {
    check_period("EMA", period)?;
    let mut out = vec![None; values.len()];
    if values.len() < period {
        return Ok(out);
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut prev = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(prev);
    for (slot, price) in out[period..].iter_mut().zip(&values[period..]) {
        prev = price * k + prev * (1.0 - k);
        *slot = Some(prev);
    }
    Ok(out)
}
