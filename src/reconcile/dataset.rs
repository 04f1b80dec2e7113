//! The unified comparison table produced by the [`crate::Reconciler`].

use crate::error::CompareError;
use crate::reconcile::filtering::ReconciledFrameFilterExt;
use crate::types::observation::{Observation, PeriodLabel};
use crate::types::traits::any_date::AnyDate;
use crate::types::traits::types::StartEndDate;
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::Path;

pub const DATE_COLUMN: &str = "date";
pub const RADIATION_COLUMN: &str = "radiation";
pub const HUMIDITY_COLUMN: &str = "humidity";
pub const PRESSURE_COLUMN: &str = "pressure";
pub const PERIOD_COLUMN: &str = "period";
pub const IS_HIGH_COLUMN: &str = "is_high_radiation";

/// Columns written by [`ReconciledDataset::to_csv`].
pub const EXPORT_COLUMNS: [&str; 5] = [
    DATE_COLUMN,
    RADIATION_COLUMN,
    HUMIDITY_COLUMN,
    PRESSURE_COLUMN,
    PERIOD_COLUMN,
];

/// One row of a [`ReconciledDataset`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledRow {
    pub date: NaiveDate,
    pub radiation: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub period: PeriodLabel,
    /// `None` when radiation is missing.
    pub is_high_radiation: Option<bool>,
}

/// Concatenated rows of every input series, aligned on a shared schema.
///
/// | column              | type            |
/// |---------------------|-----------------|
/// | `date`              | `Date`          |
/// | `radiation`         | `f64`, nullable |
/// | `humidity`          | `f64`, nullable |
/// | `pressure`          | `f64`, nullable |
/// | `period`            | `String`        |
/// | `is_high_radiation` | `bool`, nullable|
///
/// Rows keep input order; nothing is deduplicated. The period labels of all inputs are
/// kept even when an input contributed no rows, so its statistics can still be reported.
#[derive(Debug, Clone)]
pub struct ReconciledDataset {
    /// The underlying Polars DataFrame.
    pub frame: DataFrame,
    labels: Vec<PeriodLabel>,
    threshold: f64,
}

impl ReconciledDataset {
    pub(crate) fn new(frame: DataFrame, labels: Vec<PeriodLabel>, threshold: f64) -> Self {
        Self {
            frame,
            labels,
            threshold,
        }
    }

    /// Input period labels, in input order.
    pub fn labels(&self) -> &[PeriodLabel] {
        &self.labels
    }

    /// Radiation threshold used for `is_high_radiation`, W/m².
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Applies a Polars predicate, returning a new dataset with the same labels.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError::Polars`] if the predicate fails to evaluate.
    pub fn filter(&self, predicate: Expr) -> Result<ReconciledDataset, CompareError> {
        self.with_frame(self.frame.clone().lazy().filter(predicate))
    }

    /// Keeps rows dated within the given bounds (inclusive).
    ///
    /// `start` and `end` can be anything implementing [`AnyDate`]: a `NaiveDate`, a
    /// date string, a [`crate::Year`] or a [`crate::Month`].
    ///
    /// # Errors
    ///
    /// Returns [`CompareError::DateParsingError`] if either bound cannot be resolved.
    pub fn get_range(
        &self,
        start: impl AnyDate,
        end: impl AnyDate,
    ) -> Result<ReconciledDataset, CompareError> {
        let start_naive = start
            .get_date_range()
            .ok_or(CompareError::DateParsingError)?
            .start;
        let end_naive = end
            .get_date_range()
            .ok_or(CompareError::DateParsingError)?
            .end;
        self.with_frame(self.frame.clone().lazy().filter_dates(start_naive, end_naive))
    }

    /// Rows of a single period.
    pub fn for_period(&self, label: &PeriodLabel) -> Result<ReconciledDataset, CompareError> {
        self.with_frame(self.frame.clone().lazy().filter_period(label))
    }

    /// Stable sort by date for presentation.
    pub fn sorted_by_date(&self) -> Result<ReconciledDataset, CompareError> {
        self.with_frame(self.frame.clone().lazy().sort(
            [DATE_COLUMN],
            SortMultipleOptions::default().with_maintain_order(true),
        ))
    }

    /// The last `n` rows.
    pub fn tail(&self, n: usize) -> DataFrame {
        self.frame.tail(Some(n))
    }

    /// Earliest and latest date over all rows.
    pub fn date_span(&self) -> Result<Option<StartEndDate>, CompareError> {
        let dates = self.frame.column(DATE_COLUMN)?.date()?;
        let start = dates.as_date_iter().flatten().min();
        let end = dates.as_date_iter().flatten().max();
        Ok(start.zip(end).map(|(start, end)| StartEndDate { start, end }))
    }

    /// Materializes the frame into typed rows.
    pub fn rows(&self) -> Result<Vec<ReconciledRow>, CompareError> {
        let df = &self.frame;
        let dates = df.column(DATE_COLUMN)?.date()?;
        let radiation = df.column(RADIATION_COLUMN)?.f64()?;
        let humidity = df.column(HUMIDITY_COLUMN)?.f64()?;
        let pressure = df.column(PRESSURE_COLUMN)?.f64()?;
        let period = df.column(PERIOD_COLUMN)?.str()?;
        let high = df.column(IS_HIGH_COLUMN)?.bool()?;

        dates
            .as_date_iter()
            .enumerate()
            .map(|(idx, date)| {
                let date = date.ok_or_else(|| {
                    PolarsError::ComputeError(format!("null date at row {idx}").into())
                })?;
                Ok(ReconciledRow {
                    date,
                    radiation: radiation.get(idx),
                    humidity: humidity.get(idx),
                    pressure: pressure.get(idx),
                    period: PeriodLabel::new(period.get(idx).unwrap_or_default()),
                    is_high_radiation: high.get(idx),
                })
            })
            .collect()
    }

    /// Comma-separated export with a header row: `date,radiation,humidity,pressure,period`.
    /// Missing readings are written as empty fields.
    pub fn to_csv(&self) -> Result<Vec<u8>, CompareError> {
        let mut export = self.frame.select(EXPORT_COLUMNS)?;
        let mut buffer = Vec::new();
        CsvWriter::new(&mut buffer)
            .include_header(true)
            .finish(&mut export)?;
        Ok(buffer)
    }

    /// Writes [`Self::to_csv`] to `path`.
    pub async fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), CompareError> {
        let path = path.as_ref();
        let bytes = self.to_csv()?;
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| CompareError::ExportWrite(path.to_path_buf(), e))
    }

    fn with_frame(&self, frame: LazyFrame) -> Result<ReconciledDataset, CompareError> {
        Ok(ReconciledDataset {
            frame: frame.collect()?,
            labels: self.labels.clone(),
            threshold: self.threshold,
        })
    }
}

/// Builds the frame for one period, without the derived flag column.
pub(crate) fn observations_frame(
    label: &PeriodLabel,
    observations: &[Observation],
) -> PolarsResult<DataFrame> {
    let dates: Vec<NaiveDate> = observations.iter().map(|o| o.date).collect();
    build_frame(
        &dates,
        observations.iter().map(|o| o.radiation).collect(),
        observations.iter().map(|o| o.humidity).collect(),
        observations.iter().map(|o| o.pressure).collect(),
        vec![label.as_str(); observations.len()],
    )
}

pub(crate) fn build_frame(
    dates: &[NaiveDate],
    radiation: Vec<Option<f64>>,
    humidity: Vec<Option<f64>>,
    pressure: Vec<Option<f64>>,
    periods: Vec<&str>,
) -> PolarsResult<DataFrame> {
    let dates = DateChunked::from_naive_date(DATE_COLUMN.into(), dates.iter().copied());
    DataFrame::new(vec![
        dates.into_series().into(),
        Column::new(RADIATION_COLUMN.into(), radiation),
        Column::new(HUMIDITY_COLUMN.into(), humidity),
        Column::new(PRESSURE_COLUMN.into(), pressure),
        Column::new(PERIOD_COLUMN.into(), periods),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::reconciler::Reconciler;
    use crate::types::series::Series;
    use crate::types::traits::types::Month;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Result<ReconciledDataset, CompareError> {
        let historical = Series::new(
            "2008",
            vec![
                Observation::new(date(2008, 3, 2), Some(701.5), None),
                Observation::new(date(2008, 3, 1), None, None),
                Observation::new(date(2008, 2, 29), Some(630.0), Some(72.0)),
            ],
        )
        .unwrap();
        let nasa = Series::new(
            "NASA 2024–2025",
            vec![
                Observation::new(date(2024, 1, 1), Some(610.0), Some(55.0)),
                Observation::new(date(2025, 6, 22), Some(655.25), None),
            ],
        )
        .unwrap();
        Reconciler::default().reconcile(&[historical, nasa])
    }

    #[test]
    fn test_schema() -> Result<(), CompareError> {
        let dataset = sample()?;
        let df = &dataset.frame;
        assert_eq!(df.column(DATE_COLUMN)?.dtype(), &DataType::Date);
        assert_eq!(df.column(RADIATION_COLUMN)?.dtype(), &DataType::Float64);
        assert_eq!(df.column(HUMIDITY_COLUMN)?.dtype(), &DataType::Float64);
        assert_eq!(df.column(PRESSURE_COLUMN)?.dtype(), &DataType::Float64);
        assert_eq!(df.column(PERIOD_COLUMN)?.dtype(), &DataType::String);
        assert_eq!(df.column(IS_HIGH_COLUMN)?.dtype(), &DataType::Boolean);
        Ok(())
    }

    #[test]
    fn test_rows_keep_input_order() -> Result<(), CompareError> {
        let rows = sample()?.rows()?;
        let dates: Vec<_> = rows.iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![
                date(2008, 3, 2),
                date(2008, 3, 1),
                date(2008, 2, 29),
                date(2024, 1, 1),
                date(2025, 6, 22)
            ]
        );
        assert_eq!(rows[1].radiation, None);
        assert_eq!(rows[1].is_high_radiation, None);
        assert_eq!(rows[3].period.as_str(), "NASA 2024–2025");
        Ok(())
    }

    #[test]
    fn test_range_and_sort() -> Result<(), CompareError> {
        let dataset = sample()?;

        let march = dataset.get_range(Month(2008, 3), Month(2008, 3))?;
        assert_eq!(march.height(), 2);
        assert_eq!(march.labels(), dataset.labels());

        let sorted = dataset.sorted_by_date()?.rows()?;
        assert_eq!(sorted.first().map(|r| r.date), Some(date(2008, 2, 29)));
        assert_eq!(sorted.last().map(|r| r.date), Some(date(2025, 6, 22)));

        assert!(matches!(
            dataset.get_range("nope", "2025-01-01"),
            Err(CompareError::DateParsingError)
        ));
        Ok(())
    }

    #[test]
    fn test_date_span_and_tail() -> Result<(), CompareError> {
        let dataset = sample()?;
        let span = dataset.date_span()?.unwrap();
        assert_eq!(span.start, date(2008, 2, 29));
        assert_eq!(span.end, date(2025, 6, 22));
        assert_eq!(dataset.tail(2).height(), 2);

        let empty = Reconciler::default().reconcile(&[Series::empty("vacío")])?;
        assert!(empty.is_empty());
        assert_eq!(empty.date_span()?, None);
        Ok(())
    }

    #[test]
    fn test_dates_outside_the_epoch_survive() -> Result<(), CompareError> {
        let series = Series::new(
            "extremos",
            vec![
                Observation::new(date(1899, 12, 31), Some(1.0), None),
                Observation::new(date(1970, 1, 1), Some(2.0), None),
                Observation::new(date(2100, 2, 28), Some(3.0), None).with_pressure(Some(655.5)),
            ],
        )
        .unwrap();
        let dataset = Reconciler::default().reconcile(&[series])?;
        let rows = dataset.rows()?;
        let dates: Vec<_> = rows.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![date(1899, 12, 31), date(1970, 1, 1), date(2100, 2, 28)]);
        assert_eq!(rows[2].pressure, Some(655.5));

        let span = dataset.date_span()?.unwrap();
        assert_eq!((span.start, span.end), (date(1899, 12, 31), date(2100, 2, 28)));
        Ok(())
    }

    #[test]
    fn test_csv_export_header_and_values() -> Result<(), CompareError> {
        let csv = String::from_utf8(sample()?.to_csv()?).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("date,radiation,humidity,pressure,period"));
        let second = lines.nth(1).unwrap();
        assert!(second.starts_with("2008-03-01,,,,"), "{second}");
        assert_eq!(csv.lines().count(), 6);
        Ok(())
    }

    #[tokio::test]
    async fn test_write_csv() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("comparacion.csv");
        sample()?.write_csv(&path).await?;
        let written = std::fs::read_to_string(&path)?;
        assert!(written.starts_with("date,radiation,humidity,pressure,period"));
        Ok(())
    }
}
