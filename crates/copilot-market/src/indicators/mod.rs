//! Technical indicator engine
//!
//! Every function takes an ordered series and returns a series of the same
//! length. Positions inside the warm-up window hold `None`; no indicator
//! ever emits a placeholder number for missing history. All functions are
//! pure.
//!
//! # Example
//!
//! ```
//! use copilot_market::indicators::sma_values;
//!
//! let sma = sma_values(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
//! assert_eq!(sma, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
//! ```

mod momentum;
mod moving_average;
mod volatility;

pub use momentum::{MacdSeries, macd, rsi};
pub use moving_average::{ema, sma, sma_values};
pub use volatility::{BollingerBands, bollinger};

use crate::error::{MarketError, Result};

/// Indicator values aligned index-for-index with the input series
pub type IndicatorSeries = Vec<Option<f64>>;

/// Last defined value of an indicator series
pub fn latest(series: &[Option<f64>]) -> Option<f64> {
    series.last().copied().flatten()
}

fn check_period(indicator: &str, period: usize) -> Result<()> {
    if period == 0 {
        return Err(MarketError::InvalidParameter(format!(
            "{indicator} period must be at least 1"
        )));
    }
    Ok(())
}
