//! The normalized per-source time series every loader produces.

use crate::error::CompareError;
use crate::types::observation::{Observation, PeriodLabel};
use crate::types::traits::any_date::AnyDate;
use crate::types::traits::types::StartEndDate;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("Date {date} appears more than once in series '{label}'")]
pub struct DuplicateDateError {
    pub label: PeriodLabel,
    pub date: NaiveDate,
}

/// Daily observations from one source, tagged with a single period label.
///
/// Observations keep the order they were read in; dates are unique. The label lives on
/// the series rather than on each row, so every observation shares it by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    label: PeriodLabel,
    observations: Vec<Observation>,
}

impl Series {
    /// Builds a series, rejecting repeated dates.
    pub fn new(
        label: impl Into<PeriodLabel>,
        observations: Vec<Observation>,
    ) -> Result<Self, DuplicateDateError> {
        let label = label.into();
        let mut seen = HashSet::with_capacity(observations.len());
        for obs in &observations {
            if !seen.insert(obs.date) {
                return Err(DuplicateDateError {
                    label,
                    date: obs.date,
                });
            }
        }
        Ok(Self {
            label,
            observations,
        })
    }

    pub fn empty(label: impl Into<PeriodLabel>) -> Self {
        Self {
            label: label.into(),
            observations: Vec::new(),
        }
    }

    pub fn label(&self) -> &PeriodLabel {
        &self.label
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&Observation> {
        self.observations.iter().find(|obs| obs.date == date)
    }

    /// Same observations under a different label.
    pub fn relabel(self, label: impl Into<PeriodLabel>) -> Self {
        Self {
            label: label.into(),
            observations: self.observations,
        }
    }

    /// Earliest and latest date present, `None` for an empty series.
    pub fn date_span(&self) -> Option<StartEndDate> {
        let start = self.observations.iter().map(|o| o.date).min()?;
        let end = self.observations.iter().map(|o| o.date).max()?;
        Some(StartEndDate { start, end })
    }

    /// Keeps observations whose date falls within `start..=end`, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError::DateParsingError`] if either bound cannot be resolved.
    pub fn filter_range(
        &self,
        start: impl AnyDate,
        end: impl AnyDate,
    ) -> Result<Series, CompareError> {
        let range = StartEndDate {
            start: start
                .get_date_range()
                .ok_or(CompareError::DateParsingError)?
                .start,
            end: end
                .get_date_range()
                .ok_or(CompareError::DateParsingError)?
                .end,
        };
        Ok(Series {
            label: self.label.clone(),
            observations: self
                .observations
                .iter()
                .filter(|obs| range.contains(obs.date))
                .copied()
                .collect(),
        })
    }

    /// Inner-joins single-channel series from the same station on date, e.g. radiation,
    /// pressure and humidity exports.
    ///
    /// Row order and label follow `primary`. A day is kept only if every series has it;
    /// each channel is taken from the first series that has a value for it.
    pub fn merge_channels(primary: &Series, others: &[&Series]) -> Series {
        let by_date: Vec<HashMap<NaiveDate, &Observation>> = others
            .iter()
            .map(|series| series.observations.iter().map(|obs| (obs.date, obs)).collect())
            .collect();
        let observations = primary
            .observations
            .iter()
            .filter_map(|obs| {
                by_date.iter().try_fold(*obs, |merged, index| {
                    index.get(&obs.date).map(|other| merged.fill_from(other))
                })
            })
            .collect();
        Series {
            label: primary.label.clone(),
            observations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::observation::ValueChannel;
    use crate::types::traits::types::Month;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2008, 1, d).unwrap()
    }

    #[test]
    fn test_new_rejects_duplicate_dates() {
        let err = Series::new(
            "2008",
            vec![
                Observation::new(day(1), Some(500.0), None),
                Observation::new(day(2), Some(510.0), None),
                Observation::new(day(1), Some(520.0), None),
            ],
        )
        .unwrap_err();
        assert_eq!(err.date, day(1));
        assert_eq!(err.label.as_str(), "2008");
    }

    #[test]
    fn test_filter_range_keeps_input_order() -> Result<(), CompareError> {
        let series = Series::new(
            "2008",
            vec![
                Observation::new(day(5), Some(1.0), None),
                Observation::new(day(1), Some(2.0), None),
                Observation::new(day(3), Some(3.0), None),
                Observation::new(day(9), Some(4.0), None),
            ],
        )
        .unwrap();

        let filtered = series.filter_range(day(2), "2008-01-05")?;
        let dates: Vec<_> = filtered.observations().iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![day(5), day(3)]);
        assert_eq!(filtered.label(), series.label());

        let whole_month = series.filter_range(Month(2008, 1), Month(2008, 1))?;
        assert_eq!(whole_month.len(), 4);

        assert!(matches!(
            series.filter_range("garbage", day(3)),
            Err(CompareError::DateParsingError)
        ));
        Ok(())
    }

    #[test]
    fn test_date_span() {
        let series = Series::new(
            "2008",
            vec![
                Observation::new(day(7), None, None),
                Observation::new(day(2), None, None),
            ],
        )
        .unwrap();
        let span = series.date_span().unwrap();
        assert_eq!((span.start, span.end), (day(2), day(7)));
        assert!(Series::empty("x").date_span().is_none());
    }

    #[test]
    fn test_merge_channels_is_inner_join() {
        let radiation = Series::new(
            "2008",
            vec![
                Observation::with_channel(day(1), ValueChannel::Radiation, Some(640.0)),
                Observation::with_channel(day(2), ValueChannel::Radiation, Some(600.0)),
                Observation::with_channel(day(3), ValueChannel::Radiation, None),
            ],
        )
        .unwrap();
        let humidity = Series::new(
            "humedad",
            vec![
                Observation::with_channel(day(3), ValueChannel::Humidity, Some(81.0)),
                Observation::with_channel(day(1), ValueChannel::Humidity, Some(70.0)),
                Observation::with_channel(day(4), ValueChannel::Humidity, Some(65.0)),
            ],
        )
        .unwrap();

        let merged = Series::merge_channels(&radiation, &[&humidity]);
        assert_eq!(merged.label().as_str(), "2008");
        assert_eq!(
            merged.observations(),
            &[
                Observation::new(day(1), Some(640.0), Some(70.0)),
                Observation::new(day(3), None, Some(81.0)),
            ]
        );
    }

    #[test]
    fn test_merge_three_channels() {
        let series = |label: &str, channel: ValueChannel, rows: &[(u32, f64)]| {
            let observations = rows
                .iter()
                .map(|(d, v)| Observation::with_channel(day(*d), channel, Some(*v)))
                .collect();
            Series::new(label, observations).unwrap()
        };
        let radiation = series("2008", ValueChannel::Radiation, &[(1, 640.0), (2, 600.0), (3, 590.0)]);
        let pressure = series("presion", ValueChannel::Pressure, &[(2, 654.1), (1, 655.0)]);
        let humidity = series("humedad", ValueChannel::Humidity, &[(1, 70.0), (2, 72.0), (3, 74.0)]);

        let merged = Series::merge_channels(&radiation, &[&pressure, &humidity]);
        assert_eq!(
            merged.observations(),
            &[
                Observation::new(day(1), Some(640.0), Some(70.0)).with_pressure(Some(655.0)),
                Observation::new(day(2), Some(600.0), Some(72.0)).with_pressure(Some(654.1)),
            ]
        );
        assert_eq!(Series::merge_channels(&radiation, &[]), radiation);
    }
}
