use super::{IndicatorSeries, check_period, ema};
use crate::error::Result;
use crate::ohlcv::{OhlcvPoint, closes};
use serde::Serialize;

/// MACD line, signal line and histogram, each aligned with the input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacdSeries {
    pub macd: IndicatorSeries,
    pub signal: IndicatorSeries,
    pub histogram: IndicatorSeries,
}

/// Relative strength index with Wilder smoothing
///
/// The first `period` positions are undefined. When the average loss is
/// zero the value is pinned to 100.
pub fn rsi(series: &[OhlcvPoint], period: usize) -> Result<IndicatorSeries> {
    check_period("RSI", period)?;
    let mut out = vec![None; series.len()];
    if series.len() <= period {
        return Ok(out);
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = series
        .windows(2)
        .map(|w| {
            let change = w[1].close - w[0].close;
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    let p = period as f64;
    let mut avg_gain = gains[..period].iter().sum::<f64>() / p;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / p;
    out[period] = Some(rsi_value(avg_gain, avg_loss));

    for i in period..gains.len() {
        avg_gain = (avg_gain * (p - 1.0) + gains[i]) / p;
        avg_loss = (avg_loss * (p - 1.0) + losses[i]) / p;
        out[i + 1] = Some(rsi_value(avg_gain, avg_loss));
    }
    Ok(out)
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss <= 0.0 {
        return 100.0;
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

/// Moving average convergence/divergence over closing prices
///
/// The signal line is an EMA over the defined MACD values only, shifted
/// right by the number of leading undefined MACD entries.
pub fn macd(
    series: &[OhlcvPoint],
    fast: usize,
    slow: usize,
    signal: usize,
) -> Result<MacdSeries> {
    check_period("MACD signal", signal)?;
    let prices = closes(series);
    let fast_ema = ema(&prices, fast)?;
    let slow_ema = ema(&prices, slow)?;

    let macd_line: IndicatorSeries = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    let defined: Vec<f64> = macd_line.iter().flatten().copied().collect();
    let offset = macd_line.len() - defined.len();
    let mut signal_line = vec![None; offset];
    signal_line.extend(ema(&defined, signal)?);

    let histogram = macd_line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| Some((*m)? - (*s)?))
        .collect();

    Ok(MacdSeries {
        macd: macd_line,
        signal: signal_line,
        histogram,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::{bars, walk};

    #[test]
    fn test_rsi_warm_up_window() {
        let series = bars(&walk(30));
        let out = rsi(&series, 14).unwrap();
        assert!(out[..14].iter().all(Option::is_none));
        assert!(out[14..].iter().all(Option::is_some));
    }

    #[test]
    fn test_rsi_known_values() {
        // deltas: +1, -1, +2 ; period 2
        let series = bars(&[10.0, 11.0, 10.0, 12.0]);
        let out = rsi(&series, 2).unwrap();
        assert_eq!(out[..2], [None, None]);
        // avg gain 0.5, avg loss 0.5
        assert_eq!(out[2], Some(50.0));
        // avg gain (0.5 + 2) / 2 = 1.25, avg loss 0.25 => rs 5
        let last = out[3].unwrap();
        assert!((last - (100.0 - 100.0 / 6.0)).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_all_gains_is_pinned_to_100() {
        let series = bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let out = rsi(&series, 3).unwrap();
        assert_eq!(out[3], Some(100.0));
        assert_eq!(out[4], Some(100.0));
    }

    #[test]
    fn test_rsi_bounded() {
        for len in [15, 40, 120] {
            let out = rsi(&bars(&walk(len)), 14).unwrap();
            assert!(out.iter().flatten().all(|v| (0.0..=100.0).contains(v)));
        }
    }

    #[test]
    fn test_rsi_short_series() {
        // exactly `period` bars still has no complete window of deltas
        let out = rsi(&bars(&walk(14)), 14).unwrap();
        assert_eq!(out.len(), 14);
        assert!(out.iter().all(Option::is_none));
    }

    #[test]
    fn test_macd_alignment() {
        let series = bars(&walk(60));
        let out = macd(&series, 12, 26, 9).unwrap();

        assert_eq!(out.macd.len(), 60);
        assert_eq!(out.signal.len(), 60);
        assert_eq!(out.histogram.len(), 60);

        // MACD defined from the slow seed, signal `signal - 1` bars later
        assert!(out.macd[..25].iter().all(Option::is_none));
        assert!(out.macd[25..].iter().all(Option::is_some));
        assert!(out.signal[..33].iter().all(Option::is_none));
        assert!(out.signal[33..].iter().all(Option::is_some));

        for i in 0..60 {
            let both = out.macd[i].is_some() && out.signal[i].is_some();
            assert_eq!(out.histogram[i].is_some(), both, "index {i}");
        }
    }

    #[test]
    fn test_macd_signal_is_ema_of_defined_macd() {
        let series = bars(&walk(40));
        let out = macd(&series, 3, 6, 4).unwrap();
        let defined: Vec<f64> = out.macd.iter().flatten().copied().collect();
        let expected = ema(&defined, 4).unwrap();
        assert_eq!(out.signal[5..], expected[..]);
    }

    #[test]
    fn test_macd_too_short() {
        let out = macd(&bars(&walk(20)), 12, 26, 9).unwrap();
        assert!(out.macd.iter().all(Option::is_none));
        assert!(out.histogram.iter().all(Option::is_none));
    }

    #[test]
    fn test_invalid_periods() {
        let series = bars(&walk(10));
        assert!(rsi(&series, 0).is_err());
        assert!(macd(&series, 12, 26, 0).is_err());
        assert!(macd(&series, 0, 26, 9).is_err());
    }
}
