//! Text formatting for amounts, dates, list entries and the progress bar.

use numfmt::{Formatter, Precision};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{Error, progress::Summary, record::Record};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[day]/[month]/[year]");

/// numfmt switches to scientific notation for magnitudes from here on.
const SCIENTIFIC_CUTOFF: f64 = 1e12;

/// Formats amounts as currency with two decimal places and grouped thousands.
#[derive(Debug, Clone)]
pub struct CurrencyFormatter {
    symbol: String,
    positive: Formatter,
    negative: Formatter,
}

impl CurrencyFormatter {
    /// Create a formatter that prefixes amounts with `symbol`.
    ///
    /// # Errors
    ///
    /// Returns an [Error::InvalidInput] if `symbol` is too long to be used as
    /// a prefix.
    pub fn new(symbol: &str) -> Result<Self, Error> {
        let build = |prefix: &str| {
            Formatter::currency(prefix)
                .map(|formatter| formatter.precision(Precision::Decimals(2)))
                .map_err(|error| {
                    Error::InvalidInput(format!(
                        "cannot use \"{symbol}\" as a currency symbol: {error:?}"
                    ))
                })
        };

        Ok(Self {
            symbol: symbol.to_owned(),
            positive: build(symbol)?,
            negative: build(&format!("-{symbol}"))?,
        })
    }

    /// The symbol prefixed to every amount.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Format `amount` rounded to the nearest cent, e.g. `R$1,234.50` or
    /// `-R$20.00`.
    pub fn format(&self, amount: f64) -> String {
        // numfmt truncates to the precision instead of rounding.
        let rounded = (amount * 100.0).round() / 100.0;
        let amount = if rounded.is_finite() { rounded } else { amount };

        if amount == 0.0 {
            // Zero is hardcoded as "0", so we must specify the formatted string for zero
            return format!("{}0.00", self.symbol);
        }

        if amount.abs() >= SCIENTIFIC_CUTOFF {
            let sign = if amount < 0.0 { "-" } else { "" };
            let number = group_thousands(&format!("{:.2}", amount.abs()));
            return format!("{sign}{}{number}", self.symbol);
        }

        let (formatted, prefix_len) = if amount < 0.0 {
            (self.negative.fmt_string(amount.abs()), self.symbol.len() + 1)
        } else {
            (self.positive.fmt_string(amount), self.symbol.len())
        };

        let (prefix, number) = formatted.split_at(prefix_len.min(formatted.len()));

        format!("{prefix}{}", pad_decimals(number))
    }
}

/// Insert a comma between every three digits of the integer part of
/// `number`.
fn group_thousands(number: &str) -> String {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    let mut grouped = String::with_capacity(number.len() + whole.len() / 3);

    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if !fraction.is_empty() {
        grouped.push('.');
        grouped.push_str(fraction);
    }

    grouped
}

/// Make sure `number` ends with exactly two decimal places.
///
/// numfmt omits trailing zeros, e.g. "12.30" is rendered as "12.3".
fn pad_decimals(number: &str) -> String {
    match number.rfind('.') {
        None => format!("{number}.00"),
        Some(point) => {
            let decimals = number.len() - point - 1;
            format!("{number}{}", "0".repeat(2usize.saturating_sub(decimals)))
        }
    }
}

/// Format `date` as `DD/MM/YYYY`.
pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

/// Format a record as a numbered list line, e.g. `1 | R$150.00 | 10/01/2024`.
///
/// `index` is the zero-based position of the record in insertion order.
pub fn format_entry(index: usize, record: &Record, currency: &CurrencyFormatter) -> String {
    let amount = currency.format(record.amount);

    match record.date {
        Some(date) => format!("{} | {amount} | {}", index + 1, format_date(date)),
        None => format!("{} | {amount}", index + 1),
    }
}

/// Draw the progress towards the limit as `width` characters, e.g.
/// `[#####-----] 50.0%`.
///
/// The bar is clamped to the limit while the percentage is not.
pub fn render_bar(summary: &Summary, width: usize) -> String {
    let filled = ((summary.bar_percent() / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);

    format!(
        "[{}{}] {:.1}%",
        "#".repeat(filled),
        "-".repeat(width - filled),
        summary.ratio * 100.0
    )
}
