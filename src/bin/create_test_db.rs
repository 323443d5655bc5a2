use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use time::{Date, Duration, macros::date};

use tally_rs::{DateMode, RecordStore, SQLiteRecordStore, StoreConfig, StoreLocation};

/// A utility for creating a test database for tally.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// How many records to add.
    #[arg(long, short, default_value_t = 12)]
    count: u32,
}

/// The date of the first generated record.
const START_DATE: Date = date!(2024 - 01 - 10);

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let mut store = SQLiteRecordStore::open(&StoreConfig {
        location: StoreLocation::File(output_path.to_path_buf()),
        date_mode: DateMode::Optional,
    })?;

    println!("Adding {} test records...", args.count);

    for (amount, date) in sample_records(args.count) {
        store.append(amount, Some(date))?;
    }

    println!("Total: {:.2}", store.total()?);
    println!("Success!");

    Ok(())
}

/// Weekly amounts that cycle through a few realistic values.
fn sample_records(count: u32) -> Vec<(f64, Date)> {
    const AMOUNTS: [f64; 4] = [1_500.0, 2_350.75, 980.4, 4_200.0];

    (0..count)
        .map(|i| {
            let amount = AMOUNTS[i as usize % AMOUNTS.len()];
            let date = START_DATE.saturating_add(Duration::weeks(i64::from(i)));
            (amount, date)
        })
        .collect()
}
