use crate::reconcile::dataset::{DATE_COLUMN, IS_HIGH_COLUMN, PERIOD_COLUMN};
use crate::types::observation::PeriodLabel;
use chrono::NaiveDate;
use polars::prelude::{col, lit, DataType, LazyFrame};

pub trait ReconciledFrameFilterExt {
    /// Keeps rows dated within `start_date..=end_date`.
    /// Assumes the 'date' column holds (or casts to) `DataType::Date`.
    fn filter_dates(self, start_date: NaiveDate, end_date: NaiveDate) -> LazyFrame;

    /// Keeps rows carrying the given period label.
    fn filter_period(self, label: &PeriodLabel) -> LazyFrame;

    /// Keeps rows flagged as high-radiation days. Rows with an undefined flag are dropped.
    fn filter_high_radiation(self) -> LazyFrame;
}

impl ReconciledFrameFilterExt for LazyFrame {
    fn filter_dates(self, start_date: NaiveDate, end_date: NaiveDate) -> LazyFrame {
        self.filter(
            col(DATE_COLUMN)
                .cast(DataType::Date)
                .gt_eq(lit(start_date))
                .and(col(DATE_COLUMN).cast(DataType::Date).lt_eq(lit(end_date))),
        )
    }

    fn filter_period(self, label: &PeriodLabel) -> LazyFrame {
        self.filter(col(PERIOD_COLUMN).eq(lit(label.as_str().to_string())))
    }

    fn filter_high_radiation(self) -> LazyFrame {
        self.filter(col(IS_HIGH_COLUMN).eq(lit(true)))
    }
}
