//! Derives the values shown next to the record list: progress against the
//! limit, the colour tier and the near-limit warning.
//!
//! Nothing here is stored, everything is recomputed from the records.

use crate::{
    Error,
    record::{Record, sum_amounts},
};

/// The ceiling the total is measured against when none is configured.
pub const DEFAULT_LIMIT: f64 = 81_000.0;

/// How far below the limit the near-limit warning starts.
pub const DEFAULT_WARNING_BAND: f64 = 10_000.0;

/// A finite, positive ceiling for the total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limit(f64);

impl Limit {
    /// Create a limit.
    ///
    /// # Errors
    ///
    /// Returns an [Error::InvalidInput] if `value` is not finite or not
    /// greater than zero.
    pub fn new(value: f64) -> Result<Self, Error> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(Error::InvalidInput(format!(
                "the limit must be a positive number, got {value}"
            )))
        }
    }

    /// The limit as a plain number.
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Limit {
    fn default() -> Self {
        Self(DEFAULT_LIMIT)
    }
}

/// How urgently the total should be brought to the user's attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    /// Well below the limit.
    Low,
    /// Getting closer to the limit.
    Medium,
    /// Close to or past the limit.
    High,
}

impl Tier {
    /// The progress bar colour for the tier as a hex string.
    pub fn colour(self) -> &'static str {
        match self {
            Tier::Low => "#0077ff",
            Tier::Medium => "#FFA500",
            Tier::High => "#ff6347",
        }
    }

    /// A lower case name for the tier.
    pub fn label(self) -> &'static str {
        match self {
            Tier::Low => "low",
            Tier::Medium => "medium",
            Tier::High => "high",
        }
    }
}

/// Maps a progress ratio to a [Tier].
///
/// Thresholds are ratios of the limit, e.g. `0.5` is half way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TierPolicy {
    /// `ratio < medium` is low, `ratio < high` is medium, anything else high.
    ThreeWay {
        /// The ratio from which the tier is medium.
        medium: f64,
        /// The ratio from which the tier is high.
        high: f64,
    },
    /// `ratio < high` is low, anything else high.
    TwoWay {
        /// The ratio from which the tier is high.
        high: f64,
    },
}

impl TierPolicy {
    /// Low below 100% of the limit, high from there on.
    pub fn two_way() -> Self {
        TierPolicy::TwoWay { high: 1.0 }
    }

    /// Check that the thresholds are finite, not negative and, for
    /// [TierPolicy::ThreeWay], that `medium` is below `high`.
    ///
    /// # Errors
    ///
    /// Returns an [Error::InvalidInput] describing the first bad threshold.
    pub fn validate(self) -> Result<Self, Error> {
        let check = |name: &str, threshold: f64| {
            if threshold.is_finite() && threshold >= 0.0 {
                Ok(())
            } else {
                Err(Error::InvalidInput(format!(
                    "the {name} tier threshold must be zero or more, got {threshold}"
                )))
            }
        };

        match self {
            TierPolicy::ThreeWay { medium, high } => {
                check("medium", medium)?;
                check("high", high)?;

                if medium >= high {
                    return Err(Error::InvalidInput(format!(
                        "the medium tier threshold ({medium}) must be below the high tier threshold ({high})"
                    )));
                }
            }
            TierPolicy::TwoWay { high } => check("high", high)?,
        }

        Ok(self)
    }

    /// Find the tier for a progress `ratio`.
    pub fn classify(self, ratio: f64) -> Tier {
        match self {
            TierPolicy::ThreeWay { medium, high } => {
                if ratio < medium {
                    Tier::Low
                } else if ratio < high {
                    Tier::Medium
                } else {
                    Tier::High
                }
            }
            TierPolicy::TwoWay { high } => {
                if ratio < high {
                    Tier::Low
                } else {
                    Tier::High
                }
            }
        }
    }
}

impl Default for TierPolicy {
    fn default() -> Self {
        TierPolicy::ThreeWay {
            medium: 0.5,
            high: 0.8,
        }
    }
}

/// The limit and thresholds used to derive the progress views.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressConfig {
    /// The ceiling the total is measured against.
    pub limit: Limit,
    /// The warning is active while the total is in `[limit - warning_band, limit)`.
    pub warning_band: f64,
    /// How progress ratios map to tiers.
    pub tier_policy: TierPolicy,
}

impl ProgressConfig {
    /// Create a config from raw values.
    ///
    /// # Errors
    ///
    /// Returns an [Error::InvalidInput] if `limit` is not a positive number,
    /// `warning_band` is negative or not finite, or `tier_policy` fails
    /// [TierPolicy::validate].
    pub fn new(limit: f64, warning_band: f64, tier_policy: TierPolicy) -> Result<Self, Error> {
        let limit = Limit::new(limit)?;
        let tier_policy = tier_policy.validate()?;

        if !warning_band.is_finite() || warning_band < 0.0 {
            return Err(Error::InvalidInput(format!(
                "the warning band must be zero or more, got {warning_band}"
            )));
        }

        Ok(Self {
            limit,
            warning_band,
            tier_policy,
        })
    }

    /// `total` as a fraction of the limit. Not clamped.
    pub fn ratio(&self, total: f64) -> f64 {
        total / self.limit.value()
    }

    /// Whether `total` is close to, but not yet at, the limit.
    pub fn is_near_limit(&self, total: f64) -> bool {
        let limit = self.limit.value();

        total >= limit - self.warning_band && total < limit
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            limit: Limit::default(),
            warning_band: DEFAULT_WARNING_BAND,
            tier_policy: TierPolicy::default(),
        }
    }
}

/// A change in the near-limit warning state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningChange {
    /// The total moved into the warning band.
    Raised,
    /// The total moved out of the warning band, either past the limit or
    /// back below the band.
    Cleared,
}

/// Tracks the near-limit warning across successive totals so that the
/// warning is raised once per crossing rather than on every refresh.
#[derive(Debug, Clone)]
pub struct NearLimitMonitor {
    config: ProgressConfig,
    active: bool,
}

impl NearLimitMonitor {
    /// Create a monitor whose state reflects `initial_total`.
    ///
    /// Starting inside the band does not count as a transition.
    pub fn new(config: ProgressConfig, initial_total: f64) -> Self {
        let active = config.is_near_limit(initial_total);

        Self { config, active }
    }

    /// Whether the warning is currently active.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Record a new total and report whether the warning state changed.
    pub fn observe(&mut self, total: f64) -> Option<WarningChange> {
        let active = self.config.is_near_limit(total);

        let change = match (self.active, active) {
            (false, true) => Some(WarningChange::Raised),
            (true, false) => Some(WarningChange::Cleared),
            _ => None,
        };

        if let Some(change) = change {
            tracing::debug!("near-limit warning {change:?} at total {total}");
        }

        self.active = active;
        change
    }
}

/// The values derived from the current records.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// The sum of all amounts.
    pub total: f64,
    /// How many records there are.
    pub count: usize,
    /// `total / limit`, not clamped.
    pub ratio: f64,
    /// The tier the ratio falls into.
    pub tier: Tier,
    /// Whether the total is inside the warning band.
    pub near_limit: bool,
    /// The limit the ratio was computed against.
    pub limit: f64,
}

impl Summary {
    /// Derive the summary of `records` against the limit in `config`.
    pub fn new(records: &[Record], config: &ProgressConfig) -> Self {
        let total = sum_amounts(records);
        let ratio = config.ratio(total);

        Self {
            total,
            count: records.len(),
            ratio,
            tier: config.tier_policy.classify(ratio),
            near_limit: config.is_near_limit(total),
            limit: config.limit.value(),
        }
    }

    /// The progress as a percentage clamped to `[0, 100]` for drawing a bar.
    pub fn bar_percent(&self) -> f64 {
        (self.ratio * 100.0).clamp(0.0, 100.0)
    }

    /// How much is left before the limit is reached, zero once it has been.
    pub fn remaining(&self) -> f64 {
        (self.limit - self.total).max(0.0)
    }
}



#[cfg(test)]
mod near_limit_monitor_tests {
    use super::{NearLimitMonitor, ProgressConfig, WarningChange};

    #[test]
    fn raises_once_when_crossing_into_band() {
        let mut monitor = NearLimitMonitor::new(ProgressConfig::default(), 70_000.0);

        assert_eq!(monitor.observe(72_000.0), Some(WarningChange::Raised));
        assert_eq!(monitor.observe(72_000.0), None);
        assert_eq!(monitor.observe(75_500.0), None);
        assert_eq!(monitor.observe(80_000.0), None);
        assert!(monitor.is_active());
    }

    #[test]
    fn starting_inside_band_does_not_raise() {
        let mut monitor = NearLimitMonitor::new(ProgressConfig::default(), 72_000.0);

        assert!(monitor.is_active());
        assert_eq!(monitor.observe(73_000.0), None);
    }

    #[test]
    fn clears_when_limit_is_reached_and_raises_again_on_return() {
        let mut monitor = NearLimitMonitor::new(ProgressConfig::default(), 72_000.0);

        assert_eq!(monitor.observe(81_000.0), Some(WarningChange::Cleared));
        assert_eq!(monitor.observe(90_000.0), None);
        assert_eq!(monitor.observe(75_000.0), Some(WarningChange::Raised));
    }

    #[test]
    fn clears_when_dropping_below_band() {
        let mut monitor = NearLimitMonitor::new(ProgressConfig::default(), 72_000.0);

        assert_eq!(monitor.observe(150.0), Some(WarningChange::Cleared));
        assert!(!monitor.is_active());
    }
}

#[cfg(test)]
mod summary_tests {
    use time::macros::date;

    use crate::record::Record;

    use super::{ProgressConfig, Summary, Tier};

    fn record(id: i64, amount: f64) -> Record {
        Record {
            id,
            amount,
            date: Some(date!(2024 - 01 - 10)),
        }
    }

    #[test]
    fn empty_records_have_zero_progress() {
        let summary = Summary::new(&[], &ProgressConfig::default());

        assert_eq!(summary.total, 0.0);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.ratio, 0.0);
        assert_eq!(summary.tier, Tier::Low);
        assert!(!summary.near_limit);
        assert_eq!(summary.remaining(), 81_000.0);
    }

    #[test]
    fn derives_values_from_records() {
        let records = [record(1, 40_500.0), record(2, 20_250.0)];

        let summary = Summary::new(&records, &ProgressConfig::default());

        assert_eq!(summary.total, 60_750.0);
        assert_eq!(summary.count, 2);
        assert_eq!(summary.ratio, 0.75);
        assert_eq!(summary.tier, Tier::Medium);
        assert!(!summary.near_limit);
        assert_eq!(summary.bar_percent(), 75.0);
    }

    #[test]
    fn bar_percent_is_clamped() {
        let over = Summary::new(&[record(1, 162_000.0)], &ProgressConfig::default());
        let under = Summary::new(&[record(1, -500.0)], &ProgressConfig::default());

        assert_eq!(over.bar_percent(), 100.0);
        assert_eq!(over.remaining(), 0.0);
        assert_eq!(under.bar_percent(), 0.0);
    }

    #[test]
    fn near_limit_total_is_flagged() {
        let summary = Summary::new(&[record(1, 72_000.0)], &ProgressConfig::default());

        assert!(summary.near_limit);
        assert_eq!(summary.tier, Tier::High);
    }
}
