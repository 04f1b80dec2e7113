//! Concatenates normalized series into one [`ReconciledDataset`] and derives the
//! per-period comparison statistics.

use crate::error::CompareError;
use crate::reconcile::dataset::{
    build_frame, observations_frame, ReconciledDataset, DATE_COLUMN, HUMIDITY_COLUMN,
    IS_HIGH_COLUMN, PERIOD_COLUMN, PRESSURE_COLUMN, RADIATION_COLUMN,
};
use crate::reconcile::summary::{period_summaries, SummaryStatistics};
use crate::source::error::ParseError;
use crate::types::observation::PeriodLabel;
use crate::types::series::Series;
use crate::types::traits::utils::parse_calendar_date;
use bon::Builder;
use log::{debug, warn};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Radiation above which a day counts as a high-radiation day, W/m².
pub const HIGH_RADIATION_THRESHOLD: f64 = 630.0;

/// How days without a radiation reading enter `percentage_high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingRadiationPolicy {
    /// Counted in the denominator as non-high days.
    #[default]
    CountAsNotHigh,
    /// Left out of the denominator entirely.
    ExcludeFromDenominator,
}

/// Combines series and computes their comparison statistics.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use solar_compare::{Observation, Reconciler, Series};
///
/// let day = |d| NaiveDate::from_ymd_opt(2008, 1, d).unwrap();
/// let historical = Series::new("2008", vec![
///     Observation::new(day(1), Some(700.0), None),
///     Observation::new(day(2), Some(500.0), None),
/// ]).unwrap();
/// let nasa = Series::new("NASA", vec![Observation::new(day(1), Some(640.0), Some(60.0))]).unwrap();
///
/// let reconciler = Reconciler::default();
/// let dataset = reconciler.reconcile(&[historical, nasa]).unwrap();
/// assert_eq!(dataset.height(), 3);
///
/// let summary = reconciler.summarize(&dataset).unwrap();
/// assert_eq!(summary.percentage_high("2008"), Some(50.0));
/// assert_eq!(summary.percentage_high("NASA"), Some(100.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Builder)]
pub struct Reconciler {
    #[builder(default = HIGH_RADIATION_THRESHOLD)]
    threshold: f64,
    #[builder(default)]
    missing_radiation: MissingRadiationPolicy,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Reconciler {
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn missing_radiation(&self) -> MissingRadiationPolicy {
        self.missing_radiation
    }

    /// `radiation > threshold`; null where radiation is missing.
    fn high_radiation_expr(&self) -> Expr {
        col(RADIATION_COLUMN)
            .gt(lit(self.threshold))
            .alias(IS_HIGH_COLUMN)
    }

    /// Concatenates `series` in the given order. No rows are matched, merged, deduplicated
    /// or sorted, so the result has exactly the sum of the input lengths. Series sharing a
    /// label form a single period.
    ///
    /// # Errors
    ///
    /// Only [`CompareError::Polars`], if the dataframe engine fails.
    pub fn reconcile(&self, series: &[Series]) -> Result<ReconciledDataset, CompareError> {
        let labels = distinct_labels(series.iter().map(|s| s.label().clone()));
        let mut frames = series
            .iter()
            .map(|s| observations_frame(s.label(), s.observations()).map(IntoLazy::lazy))
            .collect::<PolarsResult<Vec<LazyFrame>>>()?;
        if frames.is_empty() {
            frames.push(build_frame(&[], Vec::new(), Vec::new(), Vec::new(), Vec::new())?.lazy());
        }

        let frame = concat(frames, UnionArgs::default())?
            .with_column(self.high_radiation_expr())
            .collect()?;
        debug!(
            "Reconciled {} series into {} rows",
            series.len(),
            frame.height()
        );
        Ok(ReconciledDataset::new(frame, labels, self.threshold))
    }

    /// Per-period aggregates, one entry per distinct label in first-appearance order.
    /// Empty inputs are included with `NaN` statistics.
    pub fn summarize(&self, dataset: &ReconciledDataset) -> Result<SummaryStatistics, CompareError> {
        let periods = period_summaries(&dataset.frame, dataset.labels(), self.missing_radiation)?;
        for period in periods.iter().filter(|p| p.is_empty()) {
            warn!("Period '{}' has no rows, statistics are undefined", period.label);
        }

        Ok(SummaryStatistics {
            threshold: self.threshold,
            missing_radiation: self.missing_radiation,
            periods,
        })
    }

    /// Reads back a file written by [`ReconciledDataset::to_csv`], re-deriving the flag
    /// with this reconciler's threshold. Labels are taken in first-appearance order.
    ///
    /// # Errors
    ///
    /// [`CompareError::Parse`] if a column is missing or a date is unparsable.
    pub fn import_csv(&self, bytes: &[u8]) -> Result<ReconciledDataset, CompareError> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
            .finish()
            .map_err(|source| ParseError::Csv {
                header_rows: 0,
                source,
            })?;

        let text = |name: &str| -> Result<Vec<Option<String>>, CompareError> {
            let column = df.column(name).map_err(|_| ParseError::MissingColumn {
                column: name.to_string(),
                available: df.get_column_names().iter().map(|n| n.to_string()).collect(),
            })?;
            Ok(column
                .str()?
                .into_iter()
                .map(|cell| cell.map(str::to_string))
                .collect())
        };
        let raw_dates = text(DATE_COLUMN)?;
        let raw_radiation = text(RADIATION_COLUMN)?;
        let raw_humidity = text(HUMIDITY_COLUMN)?;
        let raw_periods = text(PERIOD_COLUMN)?;
        // Exports written before the pressure channel existed lack the column.
        let raw_pressure = match df.column(PRESSURE_COLUMN) {
            Ok(_) => text(PRESSURE_COLUMN)?,
            Err(_) => vec![None; df.height()],
        };

        let mut dates = Vec::with_capacity(raw_dates.len());
        for (idx, raw) in raw_dates.iter().enumerate() {
            let raw = raw.as_deref().unwrap_or_default();
            dates.push(parse_calendar_date(raw).ok_or_else(|| ParseError::InvalidDate {
                row: idx + 1,
                value: raw.to_string(),
            })?);
        }
        let number = |cell: &Option<String>| {
            cell.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .and_then(|s| s.parse::<f64>().ok())
        };
        let periods: Vec<&str> = raw_periods
            .iter()
            .map(|p| p.as_deref().unwrap_or_default())
            .collect();

        let labels = distinct_labels(periods.iter().copied().map(PeriodLabel::new));

        let frame = build_frame(
            &dates,
            raw_radiation.iter().map(number).collect(),
            raw_humidity.iter().map(number).collect(),
            raw_pressure.iter().map(number).collect(),
            periods,
        )?
        .lazy()
        .with_column(self.high_radiation_expr())
        .collect()?;
        Ok(ReconciledDataset::new(frame, labels, self.threshold))
    }
}

/// Labels in first-appearance order, each once.
fn distinct_labels(labels: impl IntoIterator<Item = PeriodLabel>) -> Vec<PeriodLabel> {
    let mut distinct: Vec<PeriodLabel> = Vec::new();
    for label in labels {
        if !distinct.contains(&label) {
            distinct.push(label);
        }
    }
    distinct
}
