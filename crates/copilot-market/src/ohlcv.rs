//! OHLCV price bars

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// One open/high/low/close/volume bar
///
/// Serialised with the field names the market-data tool emits, so a tool
/// result can be parsed back into a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcvPoint {
    pub low: f64,
    pub open: f64,
    pub high: f64,
    pub close: f64,
    pub volume: f64,
    /// Bar start, seconds since the Unix epoch
    pub timestamp: i64,
    /// Calendar day of the bar (UTC)
    pub date: NaiveDate,
}

impl OhlcvPoint {
    /// Build a bar, deriving its calendar day from `timestamp`
    ///
    /// Returns `None` when the timestamp is out of range.
    pub fn new(open: f64, high: f64, low: f64, close: f64, volume: f64, timestamp: i64) -> Option<Self> {
        let date = DateTime::from_timestamp(timestamp, 0)?.date_naive();
        Some(Self {
            low,
            open,
            high,
            close,
            volume,
            timestamp,
            date,
        })
    }

    /// Whether every price field holds a usable number
    pub fn has_prices(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|p| p.is_finite())
    }

    /// Read one price field
    pub fn price(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Open => self.open,
            PriceField::High => self.high,
            PriceField::Low => self.low,
            PriceField::Close => self.close,
        }
    }

    /// Parse a JSON array of bars
    pub fn parse_series(text: &str) -> serde_json::Result<Vec<Self>> {
        serde_json::from_str(text)
    }
}

/// Price field an indicator reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PriceField {
    Open,
    High,
    Low,
    #[default]
    Close,
}

/// Closing prices of a series, in order
pub fn closes(series: &[OhlcvPoint]) -> Vec<f64> {
    series.iter().map(|p| p.close).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_date_derived_from_timestamp() {
        let bar = OhlcvPoint::new(1.0, 2.0, 0.5, 1.5, 10.0, 1_700_000_000).unwrap();
        assert_eq!(bar.date, NaiveDate::from_ymd_opt(2023, 11, 14).unwrap());
        assert_eq!(bar.price(PriceField::High), 2.0);
        assert!(bar.has_prices());
    }

    #[test]
    fn test_wire_format() {
        let bar = OhlcvPoint::new(1.0, 2.0, 0.5, 1.5, 10.0, 1_700_000_000).unwrap();
        let value = serde_json::to_value(bar).unwrap();
        assert_eq!(value["date"], "2023-11-14");
        assert_eq!(value["timestamp"], 1_700_000_000);

        let parsed = OhlcvPoint::parse_series(&json!([value]).to_string()).unwrap();
        assert_eq!(parsed, vec![bar]);
    }

    #[test]
    fn test_error_payload_is_not_a_series() {
        let payload = json!({"error": "Failed to fetch market data", "message": "timeout"});
        assert!(OhlcvPoint::parse_series(&payload.to_string()).is_err());
    }

    #[test]
    fn test_missing_price_detected() {
        let mut bar = OhlcvPoint::new(1.0, 2.0, 0.5, 1.5, 10.0, 0).unwrap();
        bar.close = f64::NAN;
        assert!(!bar.has_prices());
    }
}
