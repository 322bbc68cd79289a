//! CSV quote source: a `symbol,price` table loaded once.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use crate::domain::error::{PapertraderError, PriceUnavailable};
use crate::ports::quote_port::QuotePort;

pub struct CsvQuoteAdapter {
    prices: HashMap<String, Decimal>,
}

impl CsvQuoteAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PapertraderError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| PapertraderError::QuoteSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, PapertraderError> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut prices = HashMap::new();

        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| PapertraderError::QuoteSource {
                reason: format!("CSV parse error: {}", e),
            })?;

            let symbol = record
                .get(0)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| PapertraderError::QuoteSource {
                    reason: format!("row {}: missing symbol column", line + 1),
                })?
                .to_ascii_uppercase();

            let price = record
                .get(1)
                .ok_or_else(|| PapertraderError::QuoteSource {
                    reason: format!("row {}: missing price column", line + 1),
                })
                .and_then(|raw| {
                    Decimal::from_str(raw).map_err(|e| PapertraderError::QuoteSource {
                        reason: format!("row {}: invalid price {:?}: {}", line + 1, raw, e),
                    })
                })?;

            prices.insert(symbol, price);
        }

        Ok(Self { prices })
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl QuotePort for CsvQuoteAdapter {
    fn quote(&self, symbol: &str) -> Result<Decimal, PriceUnavailable> {
        match self.prices.get(&symbol.to_ascii_uppercase()) {
            Some(price) if *price > Decimal::ZERO => Ok(*price),
            Some(_) => Err(PriceUnavailable::Unavailable {
                symbol: symbol.to_string(),
                reason: "price is not positive".into(),
            }),
            None => Err(PriceUnavailable::NotFound {
                symbol: symbol.to_string(),
            }),
        }
    }
}
