//! CSV Price Loader
//!
//! Reads a wide price table:
//!
//! ```text
//! date,AAA,BBB,CCC
//! 2015-01-02,10.5,31.2,7.9
//! ```
//!
//! Dates are ISO `YYYY-MM-DD` and must be strictly increasing. Every cell must
//! hold a positive price; gaps are rejected rather than filled.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::info;

use crate::domain::{AssetId, MarketData, PriceSeries};
use crate::ports::market_data::{MarketDataError, MarketDataPort};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// File-backed market data port
#[derive(Debug, Clone)]
pub struct CsvPriceLoader {
    path: PathBuf,
}

impl CsvPriceLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MarketDataPort for CsvPriceLoader {
    fn load(&self) -> Result<MarketData, MarketDataError> {
        let file = File::open(&self.path).map_err(|source| MarketDataError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        let data = parse_prices(file)?;
        info!(
            "Loaded {} assets x {} dates from {}",
            data.asset_count(),
            data.dates().len(),
            self.path.display()
        );
        Ok(data)
    }

    fn describe(&self) -> String {
        format!("CSV file {}", self.path.display())
    }
}

/// Parse a wide price table from any reader
pub fn parse_prices<R: Read>(reader: R) -> Result<MarketData, MarketDataError> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = csv.headers()?.clone();
    if headers.len() < 2 {
        return Err(MarketDataError::ParseError(
            "expected a date column followed by at least one asset column".into(),
        ));
    }
    let assets: Vec<AssetId> = headers.iter().skip(1).map(AssetId::new).collect();

    let mut dates = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); assets.len()];

    for (row, record) in csv.records().enumerate() {
        let record = record?;
        // header is line 1
        let line = row + 2;
        let raw_date = record.get(0).unwrap_or_default();
        let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT).map_err(|e| {
            MarketDataError::ParseError(format!("line {}: bad date '{}': {}", line, raw_date, e))
        })?;
        dates.push(date);

        for (k, asset) in assets.iter().enumerate() {
            let cell = record.get(k + 1).unwrap_or_default();
            if cell.is_empty() {
                return Err(MarketDataError::ParseError(format!(
                    "line {}: missing price for {}",
                    line, asset
                )));
            }
            let price = cell.parse::<f64>().map_err(|e| {
                MarketDataError::ParseError(format!(
                    "line {}: bad price '{}' for {}: {}",
                    line, cell, asset, e
                ))
            })?;
            columns[k].push(price);
        }
    }

    let prices = assets
        .into_iter()
        .zip(columns)
        .map(|(asset, values)| PriceSeries::new(asset, values))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(MarketData::new(dates, prices)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "date,AAA,BBB\n2020-01-02,10.0,20.0\n2020-01-03,11.0,19.0\n2020-01-06,12.0,21.0\n";

    #[test]
    fn test_parse_wide_table() {
        let data = parse_prices(SAMPLE.as_bytes()).unwrap();
        assert_eq!(data.asset_count(), 2);
        assert_eq!(data.dates().len(), 3);
        assert_eq!(data.prices(&AssetId::new("BBB")).unwrap(), &[20.0, 19.0, 21.0]);
        let returns = data.returns(&AssetId::new("AAA")).unwrap();
        assert_eq!(returns[0], 0.0);
        approx::assert_relative_eq!(returns[1], 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let loader = CsvPriceLoader::new(file.path());
        let data = loader.load().unwrap();
        assert_eq!(data.asset_count(), 2);
        assert!(loader.describe().contains("CSV"));
    }

    #[test]
    fn test_missing_file() {
        let loader = CsvPriceLoader::new("/nonexistent/prices.csv");
        assert!(matches!(loader.load(), Err(MarketDataError::Io { .. })));
    }

    #[test]
    fn test_empty_cell_rejected() {
        let csv = "date,AAA,BBB\n2020-01-02,10.0,\n2020-01-03,11.0,19.0\n";
        let err = parse_prices(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, MarketDataError::ParseError(ref m) if m.contains("BBB")));
    }

    #[test]
    fn test_bad_date_rejected() {
        let csv = "date,AAA\n02/01/2020,10.0\n";
        assert!(matches!(
            parse_prices(csv.as_bytes()),
            Err(MarketDataError::ParseError(_))
        ));
    }

    #[test]
    fn test_non_positive_price_rejected() {
        let csv = "date,AAA\n2020-01-02,10.0\n2020-01-03,0.0\n";
        assert!(matches!(
            parse_prices(csv.as_bytes()),
            Err(MarketDataError::Invalid(_))
        ));
    }

    #[test]
    fn test_unsorted_dates_rejected() {
        let csv = "date,AAA\n2020-01-03,10.0\n2020-01-02,11.0\n";
        assert!(matches!(
            parse_prices(csv.as_bytes()),
            Err(MarketDataError::Invalid(_))
        ));
    }
}
