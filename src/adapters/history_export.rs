//! CSV export of trade history.

use std::io::Write;

use crate::domain::error::PapertraderError;
use crate::domain::trade::{TradeRecord, format_timestamp};

const HEADER: [&str; 6] = ["timestamp", "symbol", "action", "quantity", "price", "total"];

fn csv_error(e: csv::Error) -> PapertraderError {
    PapertraderError::Io(std::io::Error::other(e))
}

/// Writes `trades` in the order given, one row per trade.
pub fn write_csv<W: Write>(writer: W, trades: &[TradeRecord]) -> Result<(), PapertraderError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADER).map_err(csv_error)?;
    for trade in trades {
        wtr.write_record([
            format_timestamp(&trade.timestamp),
            trade.symbol.clone(),
            trade.action.to_string(),
            trade.quantity.to_string(),
            trade.price.to_string(),
            trade.total.to_string(),
        ])
        .map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}
