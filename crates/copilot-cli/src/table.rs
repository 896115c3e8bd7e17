//! Indicator table rendering

use comfy_table::presets::UTF8_FULL;
use comfy_table::{CellAlignment, Table};
use copilot_market::IndicatorRow;

const HEADER: [&str; 10] = [
    "Date", "Close", "SMA", "EMA", "RSI", "MACD", "Signal", "Hist", "BB upper", "BB lower",
];

fn cell(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

/// Render one line per bar
pub fn render(rows: &[IndicatorRow]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(HEADER);

    for row in rows {
        table.add_row(vec![
            row.date.to_string(),
            format!("{:.2}", row.close),
            cell(row.sma),
            cell(row.ema),
            cell(row.rsi),
            cell(row.macd),
            cell(row.macd_signal),
            cell(row.macd_histogram),
            cell(row.bollinger_upper),
            cell(row.bollinger_lower),
        ]);
    }

    for index in 1..HEADER.len() {
        if let Some(column) = table.column_mut(index) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_undefined_values_render_as_dash() {
        let row = IndicatorRow {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            close: 60_123.456,
            sma: Some(59_000.0),
            ema: None,
            rsi: None,
            macd: None,
            macd_signal: None,
            macd_histogram: None,
            bollinger_upper: None,
            bollinger_lower: None,
            bollinger_middle: None,
        };
        let rendered = render(&[row]).to_string();
        assert!(rendered.contains("2024-05-01"));
        assert!(rendered.contains("60123.46"));
        assert!(rendered.contains("59000.00"));
        assert!(rendered.contains('-'));
    }
}
