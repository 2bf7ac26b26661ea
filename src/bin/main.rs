// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use stock_reservation_rs::{
    EngineConfig, LoggingAlertDispatcher, OrderId, ProductId, StockEngine, StockOperation,
    SystemClock,
};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// Stock Reservation Engine - Process stock operation CSV files
///
/// Reads stock operations from a CSV file and outputs per-product
/// availability to stdout. Supports create, adjust, reserve, commit,
/// release, discontinue and sweep.
#[derive(Parser, Debug)]
#[command(name = "stock-reservation-rs")]
#[command(about = "A stock reservation engine that processes operation CSVs", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: type,product,order,quantity,min,max,reason
    /// Example: cargo run -- operations.csv > stock.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Default reservation lifetime in seconds
    #[arg(long, default_value_t = EngineConfig::DEFAULT_RESERVATION_TTL_SECS)]
    ttl_secs: u64,

    /// Write the stock movement journal to this CSV file
    #[arg(long, value_name = "PATH")]
    journal: Option<PathBuf>,
}

fn main() {
    init_tracing();
    let args = Args::parse();

    let config = EngineConfig {
        reservation_ttl_secs: args.ttl_secs,
        ..EngineConfig::default()
    };
    let engine = match StockEngine::with_parts(
        config,
        Arc::new(SystemClock),
        Arc::new(LoggingAlertDispatcher),
    ) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(2);
        }
    };

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            error!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    if let Err(e) = process_operations(&engine, BufReader::new(file)) {
        error!("Error processing operations: {}", e);
        process::exit(1);
    }

    if let Err(e) = write_summaries(&engine, std::io::stdout()) {
        error!("Error writing output: {}", e);
        process::exit(1);
    }

    if let Some(path) = &args.journal {
        let result = File::create(path)
            .map_err(csv::Error::from)
            .and_then(|file| write_journal(&engine, file));
        if let Err(e) = result {
            error!("Error writing journal '{}': {}", path.display(), e);
            process::exit(1);
        }
    }
}

/// Logs go to stderr so stdout carries only CSV. Level is set by `RUST_LOG`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Raw CSV record matching the input format.
///
/// Fields: `type, product, order, quantity, min, max, reason`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "type")]
    op_type: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    product: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    order: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    quantity: Option<i64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    min: Option<i64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    max: Option<i64>,
    #[serde(default)]
    reason: Option<String>,
}

impl CsvRecord {
    /// Converts CSV record to a StockOperation.
    ///
    /// Returns `None` for unknown operation types or missing required fields.
    fn into_operation(self) -> Option<StockOperation> {
        let product_id = self.product.map(ProductId);
        let order_id = self.order.map(OrderId);

        match self.op_type.to_lowercase().as_str() {
            "create" => Some(StockOperation::Create {
                product_id: product_id?,
                quantity: self.quantity?,
                threshold_min: self.min?,
                threshold_max: self.max?,
            }),
            "adjust" => Some(StockOperation::Adjust {
                product_id: product_id?,
                delta: self.quantity?,
                reason: self
                    .reason
                    .filter(|reason| !reason.is_empty())
                    .unwrap_or_else(|| "MANUAL".to_owned()),
            }),
            "reserve" => Some(StockOperation::Reserve {
                product_id: product_id?,
                order_id: order_id?,
                quantity: self.quantity?,
            }),
            "commit" => Some(StockOperation::Commit {
                product_id: product_id?,
                order_id: order_id?,
            }),
            "release" => Some(StockOperation::Release {
                product_id: product_id?,
                order_id: order_id?,
            }),
            "discontinue" => Some(StockOperation::Discontinue {
                product_id: product_id?,
            }),
            "sweep" => Some(StockOperation::Sweep { product_id }),
            _ => None,
        }
    }
}

/// Process operations from a CSV reader.
///
/// Streams rows one at a time. Malformed rows and rejected operations are
/// logged and skipped.
///
/// # Example
///
/// ```csv
/// type,product,order,quantity,min,max,reason
/// create,1,,10,3,50,
/// reserve,1,100,4,,,
/// commit,1,100,,,,
/// adjust,1,,-2,,,DAMAGE
/// ```
///
/// # Errors
///
/// Returns a CSV error only if the reader itself fails.
pub fn process_operations<R: Read>(engine: &StockEngine, reader: R) -> Result<(), csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    for (line, result) in rdr.deserialize::<CsvRecord>().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e),
            Err(e) => {
                warn!(line = line + 2, "Skipping malformed row: {}", e);
                continue;
            }
        };

        let Some(operation) = record.into_operation() else {
            warn!(line = line + 2, "Skipping invalid operation record");
            continue;
        };

        let name = operation.name();
        if let Err(e) = engine.process(operation) {
            warn!(line = line + 2, operation = name, "Skipping operation: {}", e);
        }
    }

    Ok(())
}

/// Write one availability row per product.
///
/// # CSV Format
///
/// Columns: `product, on_hand, reserved, available, status`
pub fn write_summaries<W: Write>(engine: &StockEngine, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for summary in engine.summaries() {
        wtr.serialize(summary)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Drain the movement journal into a CSV writer.
pub fn write_journal<W: Write>(engine: &StockEngine, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for movement in engine.drain_journal() {
        wtr.serialize(movement)?;
    }
    wtr.flush()?;
    Ok(())
}
