//! Local buy/sell/hold decision over a price series
//!
//! Each indicator casts one vote (bullish +1, bearish -1, neutral 0);
//! indicators still inside their warm-up window abstain. A net score of at
//! least +2 is a buy, at most -2 a sell, anything else a hold.

use crate::error::Result;
use crate::indicators::{bollinger, ema, macd, rsi, sma};
use crate::ohlcv::{OhlcvPoint, PriceField, closes};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

pub const SMA_PERIOD: usize = 14;
pub const EMA_PERIOD: usize = 14;
pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_MULTIPLIER: f64 = 2.0;

const RSI_OVERSOLD: f64 = 30.0;
const RSI_OVERBOUGHT: f64 = 70.0;
const DECISION_THRESHOLD: i32 = 2;

/// Trading recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Hold => "HOLD",
        })
    }
}

/// Indicator values for one bar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorRow {
    pub date: NaiveDate,
    pub close: f64,
    pub sma: Option<f64>,
    pub ema: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub bollinger_middle: Option<f64>,
    pub bollinger_lower: Option<f64>,
}

/// Compute the standard indicator set for every bar of `series`
pub fn indicator_rows(series: &[OhlcvPoint]) -> Result<Vec<IndicatorRow>> {
    let sma = sma(series, SMA_PERIOD, PriceField::Close)?;
    let ema = ema(&closes(series), EMA_PERIOD)?;
    let rsi = rsi(series, RSI_PERIOD)?;
    let macd = macd(series, MACD_FAST, MACD_SLOW, MACD_SIGNAL)?;
    let bands = bollinger(series, BOLLINGER_PERIOD, BOLLINGER_MULTIPLIER)?;

    Ok(series
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorRow {
            date: bar.date,
            close: bar.close,
            sma: sma[i],
            ema: ema[i],
            rsi: rsi[i],
            macd: macd.macd[i],
            macd_signal: macd.signal[i],
            macd_histogram: macd.histogram[i],
            bollinger_upper: bands.upper[i],
            bollinger_middle: bands.middle[i],
            bollinger_lower: bands.lower[i],
        })
        .collect())
}

/// Outcome of the vote
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub signal: Signal,
    pub score: i32,
    /// One line per non-neutral vote
    pub reasons: Vec<String>,
}

/// Vote over the latest bar's indicators
pub fn recommend(latest: &IndicatorRow) -> Recommendation {
    let mut score = 0;
    let mut reasons = Vec::new();
    let mut vote = |direction: i32, reason: String| {
        score += direction;
        reasons.push(reason);
    };

    if let Some(value) = latest.rsi {
        if value < RSI_OVERSOLD {
            vote(1, format!("RSI {value:.1} is oversold (below {RSI_OVERSOLD})"));
        } else if value > RSI_OVERBOUGHT {
            vote(-1, format!("RSI {value:.1} is overbought (above {RSI_OVERBOUGHT})"));
        }
    }

    if let Some(hist) = latest.macd_histogram {
        if hist > 0.0 {
            vote(1, "MACD is above its signal line".to_string());
        } else if hist < 0.0 {
            vote(-1, "MACD is below its signal line".to_string());
        }
    }

    if let (Some(upper), Some(lower)) = (latest.bollinger_upper, latest.bollinger_lower) {
        if latest.close < lower {
            vote(1, "close is below the lower Bollinger band".to_string());
        } else if latest.close > upper {
            vote(-1, "close is above the upper Bollinger band".to_string());
        }
    }

    let averages = [("SMA", SMA_PERIOD, latest.sma), ("EMA", EMA_PERIOD, latest.ema)];
    for (label, period, average) in averages {
        let Some(average) = average else { continue };
        if latest.close > average {
            vote(1, format!("close is above the {label}({period}) trend"));
        } else if latest.close < average {
            vote(-1, format!("close is below the {label}({period}) trend"));
        }
    }

    let signal = if score >= DECISION_THRESHOLD {
        Signal::Buy
    } else if score <= -DECISION_THRESHOLD {
        Signal::Sell
    } else {
        Signal::Hold
    };

    Recommendation {
        signal,
        score,
        reasons,
    }
}

/// Human-readable analysis of `series` ending in a recommendation
pub fn summarize(series: &[OhlcvPoint]) -> Result<String> {
    let rows = indicator_rows(series)?;
    let Some(latest) = rows.last() else {
        return Ok(format!(
            "There is insufficient market data to run a technical analysis.\n\nRecommendation: {}",
            Signal::Hold
        ));
    };

    let mut out = format!(
        "Technical analysis of the last {} bars (latest close {:.2} on {}):\n",
        rows.len(),
        latest.close,
        latest.date
    );
    let lines = [
        (format!("SMA({SMA_PERIOD})"), latest.sma.map(|v| format!("{v:.2}"))),
        (format!("EMA({EMA_PERIOD})"), latest.ema.map(|v| format!("{v:.2}"))),
        (format!("RSI({RSI_PERIOD})"), latest.rsi.map(|v| format!("{v:.1}"))),
        (
            format!("MACD({MACD_FAST},{MACD_SLOW},{MACD_SIGNAL})"),
            latest.macd.map(|m| match (latest.macd_signal, latest.macd_histogram) {
                (Some(s), Some(h)) => format!("{m:.4} (signal {s:.4}, histogram {h:.4})"),
                _ => format!("{m:.4}"),
            }),
        ),
        (
            format!("Bollinger({BOLLINGER_PERIOD}, {BOLLINGER_MULTIPLIER})"),
            latest
                .bollinger_middle
                .zip(latest.bollinger_upper.zip(latest.bollinger_lower))
                .map(|(m, (u, l))| format!("upper {u:.2}, middle {m:.2}, lower {l:.2}")),
        ),
    ];
    for (label, value) in lines {
        if let Some(value) = value {
            out.push_str(&format!("- {label}: {value}\n"));
        }
    }

    let recommendation = recommend(latest);
    out.push_str(&format!(
        "\nRecommendation: {} (score {:+})\n",
        recommendation.signal, recommendation.score
    ));
    if recommendation.reasons.is_empty() {
        out.push_str("- no indicator gives a clear direction\n");
    }
    for reason in &recommendation.reasons {
        out.push_str(&format!("- {reason}\n"));
    }
    out.push_str(
        "\nThis is an indicator-based read of past prices, not financial advice. \
         Size positions to your own risk tolerance.",
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::{bars, walk};

    fn row(close: f64) -> IndicatorRow {
        IndicatorRow {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            close,
            sma: None,
            ema: None,
            rsi: None,
            macd: None,
            macd_signal: None,
            macd_histogram: None,
            bollinger_upper: None,
            bollinger_middle: None,
            bollinger_lower: None,
        }
    }

    #[test]
    fn test_undefined_indicators_abstain() {
        let rec = recommend(&row(100.0));
        assert_eq!(rec.signal, Signal::Hold);
        assert_eq!(rec.score, 0);
        assert!(rec.reasons.is_empty());
    }

    #[test]
    fn test_bullish_votes_buy() {
        let latest = IndicatorRow {
            rsi: Some(25.0),
            macd_histogram: Some(0.4),
            sma: Some(90.0),
            ..row(100.0)
        };
        let rec = recommend(&latest);
        assert_eq!(rec.score, 3);
        assert_eq!(rec.signal, Signal::Buy);
        assert_eq!(rec.reasons.len(), 3);
    }

    #[test]
    fn test_bearish_votes_sell() {
        let latest = IndicatorRow {
            rsi: Some(80.0),
            bollinger_upper: Some(95.0),
            bollinger_lower: Some(85.0),
            ema: Some(90.0),
            ..row(100.0)
        };
        // overbought and above the upper band are bearish, above EMA is bullish
        let rec = recommend(&latest);
        assert_eq!(rec.score, -1);
        assert_eq!(rec.signal, Signal::Hold);

        let latest = IndicatorRow {
            macd_histogram: Some(-0.1),
            ..latest
        };
        assert_eq!(recommend(&latest).signal, Signal::Sell);
    }

    #[test]
    fn test_rows_match_series_length() {
        let series = bars(&walk(50));
        let rows = indicator_rows(&series).unwrap();
        assert_eq!(rows.len(), 50);
        assert!(rows[0].sma.is_none());
        assert!(rows[49].macd_histogram.is_some());
    }

    #[test]
    fn test_summary_on_empty_series() {
        let text = summarize(&[]).unwrap();
        assert!(text.contains("insufficient market data"));
        assert!(text.contains("HOLD"));
    }

    #[test]
    fn test_summary_lists_only_defined_values() {
        // shorter than every warm-up window
        let text = summarize(&bars(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0])).unwrap();
        assert!(text.contains("last 7 bars"));
        assert!(!text.contains("RSI("));
        assert!(text.contains("Recommendation: HOLD"));
    }

    #[test]
    fn test_summary_with_full_history() {
        let text = summarize(&bars(&walk(60))).unwrap();
        assert!(text.contains("SMA(14)"));
        assert!(text.contains("MACD(12,26,9)"));
        assert!(text.contains("Bollinger(20, 2)"));
        assert!(text.contains("Recommendation:"));
    }
}
