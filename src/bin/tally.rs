use std::{error::Error as StdError, ops::Range, path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use time::Date;
use tokio::sync::broadcast::{self, error::TryRecvError};

use tally_rs::{
    Amount, Config, CurrencyFormatter, DEFAULT_CURRENCY_SYMBOL, DEFAULT_DB_PATH, DEFAULT_LIMIT,
    DEFAULT_WARNING_BAND, DateMode, Error, NearLimitMonitor, ProgressConfig, Record, RecordStore,
    SQLiteRecordStore, StoreConfig, StoreEvent, StoreLocation, Summary, TierPolicy, WarningChange,
    format_entry, parse_date, render_bar, setup_logging,
};

/// The width of the progress bar in characters.
const BAR_WIDTH: usize = 30;

/// Keep a running total of amounts and track it against a limit.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the SQLite database.
    #[arg(long, global = true, default_value = DEFAULT_DB_PATH)]
    db_path: PathBuf,

    /// The ceiling the total is measured against.
    #[arg(long, global = true, default_value_t = DEFAULT_LIMIT)]
    limit: f64,

    /// Warn when the total comes within this much of the limit.
    #[arg(long, global = true, default_value_t = DEFAULT_WARNING_BAND)]
    warning_band: f64,

    /// Only distinguish between below and at/over the limit.
    #[arg(long, global = true)]
    two_way_tiers: bool,

    /// Whether records carry dates: optional, required or disabled.
    #[arg(long, global = true, default_value = "optional")]
    date_mode: DateMode,

    /// The symbol shown in front of amounts.
    #[arg(long, global = true, default_value = DEFAULT_CURRENCY_SYMBOL)]
    currency_symbol: String,

    /// Append debug logs to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record a new amount.
    Add {
        /// The amount, e.g. 150 or 200,50.
        #[arg(allow_hyphen_values = true)]
        amount: Amount,

        /// The day the amount refers to, as YYYY-MM-DD.
        #[arg(long, value_parser = parse_date)]
        date: Option<Date>,
    },
    /// Show every record in the order they were added.
    List {
        /// Print the records as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show the total and the progress towards the limit.
    Status,
    /// Remove the most recently added record.
    Undo,
    /// Remove every record.
    Clear,
    /// Delete the database.
    Destroy,
}

impl Args {
    fn config(&self) -> Result<Config, Error> {
        let tier_policy = if self.two_way_tiers {
            TierPolicy::two_way()
        } else {
            TierPolicy::default()
        };

        Ok(Config {
            store: StoreConfig {
                location: StoreLocation::File(self.db_path.clone()),
                date_mode: self.date_mode,
            },
            progress: ProgressConfig::new(self.limit, self.warning_band, tier_policy)?,
            currency_symbol: self.currency_symbol.clone(),
        })
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(error) = setup_logging(args.log_file.as_deref()) {
        print_error(format!("could not set up logging: {error}"));
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            print_error(&error);

            match error.downcast_ref::<Error>() {
                Some(Error::InvalidInput(_)) => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn StdError>> {
    let config = args.config()?;
    let currency = CurrencyFormatter::new(&config.currency_symbol)?;

    let store = SQLiteRecordStore::open(&config.store)?;
    let view = View::new(&store, config.progress, currency)?;

    execute(args.command, store, view)?;

    Ok(())
}

/// Run `command` against `store`, then redraw `view` if anything changed.
///
/// Returns the change to the near-limit warning caused by the command, if any.
fn execute(
    command: Command,
    mut store: SQLiteRecordStore,
    mut view: View,
) -> Result<Option<WarningChange>, Box<dyn StdError>> {
    match command {
        Command::Add { amount, date } => {
            let record = store.append(amount.value(), date)?;
            println!("Added {}.", view.currency.format(record.amount));
        }
        Command::List { json } => {
            let records = store.list_all()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No records yet.");
            } else {
                for (index, record) in records.iter().enumerate() {
                    println!("{}", format_entry(index, record, &view.currency));
                }
            }
        }
        Command::Status => view.render(&store.list_all()?),
        Command::Undo => match store.delete_latest()? {
            Some(record) => println!("Removed {}.", view.currency.format(record.amount)),
            None => println!("Nothing to remove."),
        },
        Command::Clear => {
            let removed = store.clear()?;
            println!("Removed {removed} record(s).");
        }
        Command::Destroy => {
            let location = store.location().to_string();
            store.destroy()?;
            println!("Deleted {location}.");
            return Ok(None);
        }
    }

    Ok(view.refresh(&store)?)
}

/// Re-derives and prints the summary whenever the store reports a change.
struct View {
    events: broadcast::Receiver<StoreEvent>,
    monitor: NearLimitMonitor,
    progress: ProgressConfig,
    currency: CurrencyFormatter,
}

impl View {
    /// Subscribe to `store` and prime the near-limit warning with its
    /// current total, so only changes made after this count as crossings.
    fn new(
        store: &SQLiteRecordStore,
        progress: ProgressConfig,
        currency: CurrencyFormatter,
    ) -> Result<Self, Error> {
        let events = store.subscribe();
        let monitor = NearLimitMonitor::new(progress.clone(), store.total()?);

        Ok(Self {
            events,
            monitor,
            progress,
            currency,
        })
    }

    /// Handle any pending change events.
    ///
    /// Prints the warning when the total has just moved into the warning band
    /// and returns the warning change, if there was one.
    fn refresh(&mut self, store: &SQLiteRecordStore) -> Result<Option<WarningChange>, Error> {
        let mut changed = false;

        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    tracing::debug!("received {event:?}");
                    changed = true;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!("skipped {skipped} events");
                    changed = true;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }

        if !changed {
            return Ok(None);
        }

        let records = store.list_all()?;
        self.render(&records);

        let total = Summary::new(&records, &self.progress).total;
        let change = self.monitor.observe(total);

        if let Some(WarningChange::Raised) = change {
            print_warning(format!(
                "Warning: you are within {} of the limit!",
                self.currency.format(self.progress.warning_band)
            ));
        }

        Ok(change)
    }

    fn render(&self, records: &[Record]) {
        let summary = Summary::new(records, &self.progress);

        println!(
            "Total: {} of {} ({} record(s), {} left)",
            self.currency.format(summary.total),
            self.currency.format(summary.limit),
            summary.count,
            self.currency.format(summary.remaining()),
        );
        println!(
            "{} {}",
            colourise(&render_bar(&summary, BAR_WIDTH), summary.tier.colour()),
            tier_label(&summary)
        );
    }
}

/// The tier name, marked while the total is inside the warning band.
fn tier_label(summary: &Summary) -> String {
    if summary.near_limit {
        format!("{} (near limit)", summary.tier.label())
    } else {
        summary.tier.label().to_owned()
    }
}

/// Wrap `text` in a 24-bit ANSI colour given as `#rrggbb`.
fn colourise(text: &str, hex: &str) -> String {
    let channel = |range: Range<usize>| {
        u8::from_str_radix(hex.get(range).unwrap_or("ff"), 16).unwrap_or(255)
    };
    let (red, green, blue) = (channel(1..3), channel(3..5), channel(5..7));

    format!("\x1b[38;2;{red};{green};{blue}m{text}\x1b[0m")
}

fn print_warning(message: impl ToString) {
    println!("\x1b[33;1m{}\x1b[0m", message.to_string())
}

fn print_error(error: impl ToString) {
    eprintln!(
        "\x1b[31;1m{}\x1b[0m",
        capitalise_first_char(&error.to_string())
    )
}

/// From https://crates.io/crates/capitalize
fn capitalise_first_char(string: &str) -> String {
    let mut chars = string.chars();
    let Some(first) = chars.next() else {
        return String::with_capacity(0);
    };
    first.to_uppercase().chain(chars).collect()
}
