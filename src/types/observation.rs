//! Row-level types shared by every stage of the pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One calendar day of measurements from a single source.
///
/// Either channel may be absent: station exports usually carry a single variable and
/// NASA POWER leaves gaps as missing keys.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    /// Daily all-sky surface shortwave radiation, W/m².
    pub radiation: Option<f64>,
    /// Relative humidity at 2 m, percent.
    pub humidity: Option<f64>,
    /// Station pressure, hPa. Only station exports carry it.
    pub pressure: Option<f64>,
}

impl Observation {
    pub fn new(date: NaiveDate, radiation: Option<f64>, humidity: Option<f64>) -> Self {
        Self {
            date,
            radiation,
            humidity,
            pressure: None,
        }
    }

    pub fn with_pressure(mut self, pressure: Option<f64>) -> Self {
        self.pressure = pressure;
        self
    }

    /// Stores `value` in the slot named by `channel`, leaving the others empty.
    pub fn with_channel(date: NaiveDate, channel: ValueChannel, value: Option<f64>) -> Self {
        match channel {
            ValueChannel::Radiation => Self::new(date, value, None),
            ValueChannel::Humidity => Self::new(date, None, value),
            ValueChannel::Pressure => Self::new(date, None, None).with_pressure(value),
        }
    }

    pub fn value(&self, channel: ValueChannel) -> Option<f64> {
        match channel {
            ValueChannel::Radiation => self.radiation,
            ValueChannel::Humidity => self.humidity,
            ValueChannel::Pressure => self.pressure,
        }
    }

    /// Fills every empty channel from `other`. Channels already set are kept.
    pub fn fill_from(self, other: &Observation) -> Self {
        Self {
            date: self.date,
            radiation: self.radiation.or(other.radiation),
            humidity: self.humidity.or(other.humidity),
            pressure: self.pressure.or(other.pressure),
        }
    }
}

/// Short tag naming where a row came from, e.g. `"2008"` or `"NASA 2024–2025"`.
///
/// Any string is accepted, including the empty one; rows are grouped by exact label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodLabel(String);

impl PeriodLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeriodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeriodLabel {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PeriodLabel {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The measurement a single-variable station export carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueChannel {
    #[default]
    Radiation,
    Humidity,
    Pressure,
}

impl ValueChannel {
    pub const ALL: [ValueChannel; 3] = [
        ValueChannel::Radiation,
        ValueChannel::Pressure,
        ValueChannel::Humidity,
    ];

    /// Column name used in the reconciled schema.
    pub fn column_name(&self) -> &'static str {
        match self {
            ValueChannel::Radiation => "radiation",
            ValueChannel::Humidity => "humidity",
            ValueChannel::Pressure => "pressure",
        }
    }
}

impl fmt::Display for ValueChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2008, 1, d).unwrap()
    }

    #[test]
    fn test_channels_land_in_their_slot() {
        for channel in ValueChannel::ALL {
            let obs = Observation::with_channel(day(1), channel, Some(1.5));
            for other in ValueChannel::ALL {
                let expected = (other == channel).then_some(1.5);
                assert_eq!(obs.value(other), expected, "{channel} -> {other}");
            }
        }
        assert_eq!(ValueChannel::Pressure.column_name(), "pressure");
    }

    #[test]
    fn test_fill_from_keeps_existing_values() {
        let radiation = Observation::new(day(1), Some(640.0), None);
        let station = Observation::new(day(1), Some(1.0), Some(70.0)).with_pressure(Some(655.0));
        let merged = radiation.fill_from(&station);
        assert_eq!(merged.radiation, Some(640.0));
        assert_eq!(merged.humidity, Some(70.0));
        assert_eq!(merged.pressure, Some(655.0));
    }
}
