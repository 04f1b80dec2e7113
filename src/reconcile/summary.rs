//! Per-period aggregates over a [`crate::ReconciledDataset`], computed with a single
//! Polars `group_by` over the period column.

use crate::error::CompareError;
use crate::reconcile::dataset::{
    HUMIDITY_COLUMN, IS_HIGH_COLUMN, PERIOD_COLUMN, PRESSURE_COLUMN, RADIATION_COLUMN,
};
use crate::reconcile::reconciler::MissingRadiationPolicy;
use crate::types::observation::{PeriodLabel, ValueChannel};
use polars::prelude::*;

const ROWS: &str = "rows";
const HIGH_DAYS: &str = "high_days";
const FLAGGED: &str = "flagged";
const LABEL_ORDER: &str = "label_order";

/// Five-number summary plus mean and Tukey whiskers, enough to draw a box plot.
///
/// All fields are `NaN` (and `count` is 0) when there are no values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxStats {
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
    /// Lowest value within `q1 - 1.5 * IQR`.
    pub lower_whisker: f64,
    /// Highest value within `q3 + 1.5 * IQR`.
    pub upper_whisker: f64,
    /// Values beyond the whiskers.
    pub outliers: usize,
}

impl BoxStats {
    pub fn undefined() -> Self {
        Self {
            count: 0,
            min: f64::NAN,
            q1: f64::NAN,
            median: f64::NAN,
            q3: f64::NAN,
            max: f64::NAN,
            mean: f64::NAN,
            lower_whisker: f64::NAN,
            upper_whisker: f64::NAN,
            outliers: 0,
        }
    }

    pub fn is_defined(&self) -> bool {
        self.count > 0
    }

    /// Aggregations for one value column. Nulls are ignored and quartiles use linear
    /// interpolation between closest ranks.
    fn exprs(column: &str) -> Vec<Expr> {
        let values = || col(column);
        let q1 = values().quantile(lit(0.25), QuantileMethod::Linear);
        let q3 = values().quantile(lit(0.75), QuantileMethod::Linear);
        let iqr = q3.clone() - q1.clone();
        let low_fence = q1.clone() - iqr.clone() * lit(1.5);
        let high_fence = q3.clone() + iqr * lit(1.5);

        vec![
            values().count().alias(stat(column, "count")),
            values().min().alias(stat(column, "min")),
            q1.alias(stat(column, "q1")),
            values().median().alias(stat(column, "median")),
            q3.alias(stat(column, "q3")),
            values().max().alias(stat(column, "max")),
            values().mean().alias(stat(column, "mean")),
            values()
                .filter(values().gt_eq(low_fence.clone()))
                .min()
                .alias(stat(column, "lower_whisker")),
            values()
                .filter(values().lt_eq(high_fence.clone()))
                .max()
                .alias(stat(column, "upper_whisker")),
            values()
                .filter(values().lt(low_fence).or(values().gt(high_fence)))
                .count()
                .alias(stat(column, "outliers")),
        ]
    }

    fn read(row: &SummaryRow, column: &str) -> PolarsResult<Self> {
        let count = row.count(&stat(column, "count"))?;
        if count == 0 {
            return Ok(Self::undefined());
        }
        Ok(Self {
            count,
            min: row.float(&stat(column, "min"))?,
            q1: row.float(&stat(column, "q1"))?,
            median: row.float(&stat(column, "median"))?,
            q3: row.float(&stat(column, "q3"))?,
            max: row.float(&stat(column, "max"))?,
            mean: row.float(&stat(column, "mean"))?,
            lower_whisker: row.float(&stat(column, "lower_whisker"))?,
            upper_whisker: row.float(&stat(column, "upper_whisker"))?,
            outliers: row.count(&stat(column, "outliers"))?,
        })
    }
}

fn stat(column: &str, name: &str) -> String {
    format!("{column}_{name}")
}

/// Pairwise Pearson correlations between radiation, pressure and humidity.
///
/// Each pair uses the rows where both channels are present. A pair is `None` with
/// fewer than two such rows or when either side has no variance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrelationMatrix {
    values: [[Option<f64>; 3]; 3],
}

impl CorrelationMatrix {
    pub fn undefined() -> Self {
        Self {
            values: [[None; 3]; 3],
        }
    }

    pub fn get(&self, a: ValueChannel, b: ValueChannel) -> Option<f64> {
        self.values[channel_index(a)][channel_index(b)]
    }

    /// The matrix as a frame: one row per channel, one column per channel.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let mut columns = vec![Column::new(
            "channel".into(),
            ValueChannel::ALL.map(|c| c.column_name()).to_vec(),
        )];
        for b in ValueChannel::ALL {
            columns.push(Column::new(
                b.column_name().into(),
                ValueChannel::ALL.map(|a| self.get(a, b)).to_vec(),
            ));
        }
        DataFrame::new(columns)
    }

    fn exprs() -> Vec<Expr> {
        let mut exprs = Vec::new();
        for (i, a) in ValueChannel::ALL.iter().enumerate() {
            for b in &ValueChannel::ALL[i..] {
                let both = col(a.column_name())
                    .is_not_null()
                    .and(col(b.column_name()).is_not_null());
                let x = col(a.column_name()).filter(both.clone());
                let y = col(b.column_name()).filter(both);
                let dx = x.clone() - x.clone().mean();
                let dy = y.clone() - y.mean();
                let name = |s: &str| format!("corr_{}_{}_{s}", a.column_name(), b.column_name());
                exprs.push((dx.clone() * dy.clone()).sum().alias(name("cov")));
                exprs.push((dx.clone() * dx).sum().alias(name("var_a")));
                exprs.push((dy.clone() * dy).sum().alias(name("var_b")));
                exprs.push(x.count().alias(name("pairs")));
            }
        }
        exprs
    }

    fn read(row: &SummaryRow) -> PolarsResult<Self> {
        let mut matrix = Self::undefined();
        for (i, a) in ValueChannel::ALL.iter().enumerate() {
            for b in &ValueChannel::ALL[i..] {
                let name = |s: &str| format!("corr_{}_{}_{s}", a.column_name(), b.column_name());
                let pairs = row.count(&name("pairs"))?;
                let cov = row.float(&name("cov"))?;
                let var_a = row.float(&name("var_a"))?;
                let var_b = row.float(&name("var_b"))?;
                let r = if pairs < 2 || !(var_a > 0.0 && var_b > 0.0) {
                    None
                } else {
                    Some((cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0))
                };
                matrix.values[channel_index(*a)][channel_index(*b)] = r;
                matrix.values[channel_index(*b)][channel_index(*a)] = r;
            }
        }
        Ok(matrix)
    }
}

fn channel_index(channel: ValueChannel) -> usize {
    match channel {
        ValueChannel::Radiation => 0,
        ValueChannel::Pressure => 1,
        ValueChannel::Humidity => 2,
    }
}

/// Aggregates for one period label.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodSummary {
    pub label: PeriodLabel,
    /// Rows carrying this label.
    pub rows: usize,
    /// Rows flagged as high-radiation days.
    pub high_days: usize,
    /// Rows counted in the percentage denominator under the active policy.
    pub considered: usize,
    /// `100 * high_days / considered`, `NaN` when `considered` is 0.
    pub percentage_high: f64,
    pub radiation: BoxStats,
    pub humidity: BoxStats,
    pub pressure: BoxStats,
    pub correlations: CorrelationMatrix,
}

impl PeriodSummary {
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Radiation vs. humidity.
    pub fn correlation(&self) -> Option<f64> {
        self.correlations
            .get(ValueChannel::Radiation, ValueChannel::Humidity)
    }
}

/// Summary statistics for every period of a dataset, in the dataset's label order.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStatistics {
    pub threshold: f64,
    pub missing_radiation: MissingRadiationPolicy,
    pub periods: Vec<PeriodSummary>,
}

impl SummaryStatistics {
    pub fn get(&self, label: &str) -> Option<&PeriodSummary> {
        self.periods.iter().find(|p| p.label.as_str() == label)
    }

    pub fn percentage_high(&self, label: &str) -> Option<f64> {
        self.get(label).map(|p| p.percentage_high)
    }

    /// Labels of inputs that contributed no rows.
    pub fn empty_periods(&self) -> Vec<&PeriodLabel> {
        self.periods
            .iter()
            .filter(|p| p.is_empty())
            .map(|p| &p.label)
            .collect()
    }

    /// Fails with [`CompareError::EmptyInput`] naming the first empty period.
    pub fn ensure_populated(&self) -> Result<(), CompareError> {
        match self.empty_periods().first() {
            Some(label) => Err(CompareError::EmptyInput {
                label: (*label).clone(),
            }),
            None => Ok(()),
        }
    }

    /// One row per period, for tabular display.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let p = &self.periods;
        let corr = |a, b| p.iter().map(|s| s.correlations.get(a, b)).collect::<Vec<_>>();
        DataFrame::new(vec![
            Column::new("period".into(), p.iter().map(|s| s.label.as_str()).collect::<Vec<_>>()),
            Column::new("rows".into(), p.iter().map(|s| s.rows as u32).collect::<Vec<_>>()),
            Column::new("high_days".into(), p.iter().map(|s| s.high_days as u32).collect::<Vec<_>>()),
            Column::new("pct_high".into(), p.iter().map(|s| s.percentage_high).collect::<Vec<_>>()),
            Column::new("rad_min".into(), p.iter().map(|s| s.radiation.min).collect::<Vec<_>>()),
            Column::new("rad_q1".into(), p.iter().map(|s| s.radiation.q1).collect::<Vec<_>>()),
            Column::new("rad_median".into(), p.iter().map(|s| s.radiation.median).collect::<Vec<_>>()),
            Column::new("rad_q3".into(), p.iter().map(|s| s.radiation.q3).collect::<Vec<_>>()),
            Column::new("rad_max".into(), p.iter().map(|s| s.radiation.max).collect::<Vec<_>>()),
            Column::new("hum_median".into(), p.iter().map(|s| s.humidity.median).collect::<Vec<_>>()),
            Column::new("pres_median".into(), p.iter().map(|s| s.pressure.median).collect::<Vec<_>>()),
            Column::new("rad_hum_corr".into(), corr(ValueChannel::Radiation, ValueChannel::Humidity)),
            Column::new("rad_pres_corr".into(), corr(ValueChannel::Radiation, ValueChannel::Pressure)),
            Column::new("pres_hum_corr".into(), corr(ValueChannel::Pressure, ValueChannel::Humidity)),
        ])
    }
}

/// Groups `frame` by period and returns one summary per entry of `labels`, in that
/// order. Labels without rows come back with zero counts and undefined statistics.
pub(crate) fn period_summaries(
    frame: &DataFrame,
    labels: &[PeriodLabel],
    missing_radiation: MissingRadiationPolicy,
) -> PolarsResult<Vec<PeriodSummary>> {
    let mut aggregations = vec![
        len().alias(ROWS),
        col(IS_HIGH_COLUMN)
            .cast(DataType::UInt32)
            .sum()
            .alias(HIGH_DAYS),
        col(IS_HIGH_COLUMN).count().alias(FLAGGED),
    ];
    for column in [RADIATION_COLUMN, HUMIDITY_COLUMN, PRESSURE_COLUMN] {
        aggregations.extend(BoxStats::exprs(column));
    }
    aggregations.extend(CorrelationMatrix::exprs());

    let grouped = frame
        .clone()
        .lazy()
        .group_by([col(PERIOD_COLUMN)])
        .agg(aggregations);

    let wanted = DataFrame::new(vec![
        Column::new(
            PERIOD_COLUMN.into(),
            labels.iter().map(PeriodLabel::as_str).collect::<Vec<_>>(),
        ),
        Column::new(LABEL_ORDER.into(), (0..labels.len() as u32).collect::<Vec<_>>()),
    ])?;
    let joined = wanted
        .lazy()
        .join(
            grouped,
            [col(PERIOD_COLUMN)],
            [col(PERIOD_COLUMN)],
            JoinArgs::new(JoinType::Left),
        )
        .sort([LABEL_ORDER], SortMultipleOptions::default())
        .collect()?;

    (0..joined.height())
        .map(|idx| {
            let row = SummaryRow { frame: &joined, idx };
            let rows = row.count(ROWS)?;
            let high_days = row.count(HIGH_DAYS)?;
            let considered = match missing_radiation {
                MissingRadiationPolicy::CountAsNotHigh => rows,
                MissingRadiationPolicy::ExcludeFromDenominator => row.count(FLAGGED)?,
            };
            let percentage_high = if considered == 0 {
                f64::NAN
            } else {
                100.0 * high_days as f64 / considered as f64
            };
            Ok(PeriodSummary {
                label: PeriodLabel::new(row.text(PERIOD_COLUMN)?),
                rows,
                high_days,
                considered,
                percentage_high,
                radiation: BoxStats::read(&row, RADIATION_COLUMN)?,
                humidity: BoxStats::read(&row, HUMIDITY_COLUMN)?,
                pressure: BoxStats::read(&row, PRESSURE_COLUMN)?,
                correlations: CorrelationMatrix::read(&row)?,
            })
        })
        .collect()
}

/// One row of the aggregated frame. Nulls (periods without rows) read as 0 or `NaN`.
struct SummaryRow<'a> {
    frame: &'a DataFrame,
    idx: usize,
}

impl SummaryRow<'_> {
    fn float(&self, name: &str) -> PolarsResult<f64> {
        let column = self.frame.column(name)?.cast(&DataType::Float64)?;
        Ok(column.f64()?.get(self.idx).unwrap_or(f64::NAN))
    }

    fn count(&self, name: &str) -> PolarsResult<usize> {
        let column = self.frame.column(name)?.cast(&DataType::UInt64)?;
        Ok(column.u64()?.get(self.idx).unwrap_or(0) as usize)
    }

    fn text(&self, name: &str) -> PolarsResult<String> {
        let column = self.frame.column(name)?.str()?;
        Ok(column.get(self.idx).unwrap_or_default().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::reconciler::Reconciler;
    use crate::types::observation::Observation;
    use crate::types::series::Series;
    use chrono::NaiveDate;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2008, 1, d).unwrap()
    }

    fn summarize(series: &[Series]) -> Result<SummaryStatistics, CompareError> {
        let reconciler = Reconciler::default();
        reconciler.summarize(&reconciler.reconcile(series)?)
    }

    fn radiation(label: &str, values: &[f64]) -> Series {
        let observations = values
            .iter()
            .enumerate()
            .map(|(i, v)| Observation::new(day(i as u32 + 1), Some(*v), None))
            .collect();
        Series::new(label, observations).unwrap()
    }

    #[test]
    fn test_box_stats_linear_quartiles() -> Result<(), CompareError> {
        let summary = summarize(&[
            radiation("impar", &[4.0, 1.0, 3.0, 2.0, 5.0]),
            radiation("par", &[1.0, 2.0, 3.0, 4.0]),
        ])?;

        let odd = summary.get("impar").unwrap().radiation;
        assert_eq!(odd.count, 5);
        assert!(close(odd.min, 1.0));
        assert!(close(odd.q1, 2.0));
        assert!(close(odd.median, 3.0));
        assert!(close(odd.q3, 4.0));
        assert!(close(odd.max, 5.0));
        assert!(close(odd.mean, 3.0));
        assert_eq!(odd.outliers, 0);

        let even = summary.get("par").unwrap().radiation;
        assert!(close(even.q1, 1.75));
        assert!(close(even.median, 2.5));
        assert!(close(even.q3, 3.25));
        Ok(())
    }

    #[test]
    fn test_box_stats_whiskers_exclude_outliers() -> Result<(), CompareError> {
        let summary = summarize(&[radiation(
            "2008",
            &[600.0, 610.0, 620.0, 630.0, 640.0, 2000.0],
        )])?;
        let stats = summary.get("2008").unwrap().radiation;
        assert_eq!(stats.outliers, 1);
        assert!(close(stats.upper_whisker, 640.0));
        assert!(close(stats.lower_whisker, 600.0));
        assert!(close(stats.max, 2000.0));
        Ok(())
    }

    #[test]
    fn test_nulls_are_ignored_and_empty_is_nan() -> Result<(), CompareError> {
        let with_gap = Series::new(
            "2008",
            vec![
                Observation::new(day(1), Some(10.0), None),
                Observation::new(day(2), None, None),
                Observation::new(day(3), Some(30.0), None),
            ],
        )
        .unwrap();
        let summary = summarize(&[with_gap, Series::empty("vacío")])?;

        let period = summary.get("2008").unwrap();
        assert_eq!(period.rows, 3);
        assert_eq!(period.radiation.count, 2);
        assert!(close(period.radiation.median, 20.0));
        assert!(!period.humidity.is_defined());
        assert!(period.humidity.median.is_nan());

        let empty = summary.get("vacío").unwrap();
        assert_eq!(empty.rows, 0);
        assert!(!empty.radiation.is_defined());
        assert!(empty.percentage_high.is_nan());
        assert_eq!(empty.correlations, CorrelationMatrix::undefined());
        Ok(())
    }

    #[test]
    fn test_correlation_matrix_over_three_channels() -> Result<(), CompareError> {
        let station = Series::new(
            "2008",
            (1..=4)
                .map(|d| {
                    let x = d as f64;
                    Observation::new(day(d), Some(600.0 + 10.0 * x), Some(90.0 - 5.0 * x))
                        .with_pressure(Some(650.0 + x))
                })
                .chain([Observation::new(day(5), None, Some(10.0)).with_pressure(Some(700.0))])
                .collect(),
        )
        .unwrap();
        let summary = summarize(&[station])?;
        let matrix = summary.get("2008").unwrap().correlations;

        use ValueChannel::*;
        assert!(close(matrix.get(Radiation, Humidity).unwrap(), -1.0));
        assert!(close(matrix.get(Radiation, Pressure).unwrap(), 1.0));
        assert_eq!(matrix.get(Humidity, Radiation), matrix.get(Radiation, Humidity));
        assert!(close(matrix.get(Pressure, Pressure).unwrap(), 1.0));
        // Day 5 takes part only in the pressure/humidity pair.
        let pressure_humidity = matrix.get(Pressure, Humidity).unwrap();
        assert!(pressure_humidity < -0.9 && pressure_humidity > -1.0);
        assert_eq!(summary.get("2008").unwrap().correlation(), matrix.get(Radiation, Humidity));

        let frame = matrix.to_frame()?;
        assert_eq!(frame.shape(), (3, 4));
        Ok(())
    }

    #[test]
    fn test_correlation_undefined_without_variance() -> Result<(), CompareError> {
        let flat = Series::new(
            "2008",
            vec![
                Observation::new(day(1), Some(600.0), Some(50.0)),
                Observation::new(day(2), Some(610.0), Some(50.0)),
            ],
        )
        .unwrap();
        let single = Series::new("NASA", vec![Observation::new(day(1), Some(1.0), Some(2.0))]).unwrap();
        let summary = summarize(&[flat, single])?;
        assert_eq!(summary.get("2008").unwrap().correlation(), None);
        assert_eq!(summary.get("NASA").unwrap().correlation(), None);
        Ok(())
    }

    #[test]
    fn test_summary_frame_has_one_row_per_period() -> Result<(), CompareError> {
        let summary = summarize(&[radiation("2008", &[700.0]), radiation("NASA", &[500.0])])?;
        let frame = summary.to_frame()?;
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.column("period")?.str()?.get(1), Some("NASA"));
        Ok(())
    }
}
