//! Decoding of the NASA POWER daily point response.
//!
//! The payload nests one object per requested parameter under
//! `properties.parameter`, each mapping a `YYYYMMDD` key to a reading:
//!
//! ```json
//! {"properties": {"parameter": {
//!     "ALLSKY_SFC_SW_DWN": {"20240101": 610.0},
//!     "RH2M": {"20240101": 55.0}
//! }}}
//! ```

use crate::remote::error::DecodeError;
use crate::types::observation::{Observation, PeriodLabel};
use crate::types::series::{DuplicateDateError, Series};
use crate::types::traits::utils::parse_calendar_date;
use chrono::NaiveDate;
use log::debug;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

pub const RADIATION_PARAMETER: &str = "ALLSKY_SFC_SW_DWN";
pub const HUMIDITY_PARAMETER: &str = "RH2M";

/// Turns a raw response body into a two-channel [`Series`].
///
/// Dates are the union of both parameters' keys, in chronological order. A day missing
/// from one parameter leaves that channel empty. Readings are passed through unchanged.
pub fn decode_power_response(
    body: &[u8],
    label: impl Into<PeriodLabel>,
) -> Result<Series, DecodeError> {
    let label = label.into();
    let root: Value = serde_json::from_slice(body)?;
    let parameter = root
        .get("properties")
        .ok_or_else(|| DecodeError::MissingKey("properties".to_string()))?
        .get("parameter")
        .ok_or_else(|| DecodeError::MissingKey("properties.parameter".to_string()))?;

    let radiation = decode_parameter(parameter, RADIATION_PARAMETER, &label)?;
    let humidity = decode_parameter(parameter, HUMIDITY_PARAMETER, &label)?;

    let dates: BTreeSet<NaiveDate> = radiation.keys().chain(humidity.keys()).copied().collect();
    let observations = dates
        .into_iter()
        .map(|date| {
            Observation::new(
                date,
                radiation.get(&date).copied().flatten(),
                humidity.get(&date).copied().flatten(),
            )
        })
        .collect();

    Ok(Series::new(label, observations)?)
}

fn decode_parameter(
    parameter: &Value,
    name: &str,
    label: &PeriodLabel,
) -> Result<BTreeMap<NaiveDate, Option<f64>>, DecodeError> {
    let readings = parameter
        .get(name)
        .and_then(Value::as_object)
        .ok_or_else(|| DecodeError::MissingKey(format!("properties.parameter.{name}")))?;

    let mut by_date = BTreeMap::new();
    for (key, value) in readings {
        let date = parse_calendar_date(key).ok_or_else(|| DecodeError::InvalidDate {
            parameter: name.to_string(),
            key: key.clone(),
        })?;
        let reading = value.as_f64();
        if reading.is_none() {
            debug!("{} has no numeric reading for {}", name, key);
        }
        if by_date.insert(date, reading).is_some() {
            return Err(DuplicateDateError {
                label: label.clone(),
                date,
            }
            .into());
        }
    }
    Ok(by_date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_single_day() -> Result<(), DecodeError> {
        let body = br#"{"properties":{"parameter":{"ALLSKY_SFC_SW_DWN":{"20240101":610},"RH2M":{"20240101":55}}}}"#;
        let series = decode_power_response(body, "NASA 2024")?;

        assert_eq!(series.label().as_str(), "NASA 2024");
        assert_eq!(
            series.observations(),
            &[Observation::new(date(2024, 1, 1), Some(610.0), Some(55.0))]
        );
        Ok(())
    }

    #[test]
    fn test_gaps_and_ordering() -> Result<(), DecodeError> {
        let body = br#"{
            "type": "Feature",
            "properties": {"parameter": {
                "RH2M": {"20240103": 80.1, "20240101": 75.0},
                "ALLSKY_SFC_SW_DWN": {"20240102": 650.5, "20240101": -999.0}
            }}
        }"#;
        let series = decode_power_response(body, "NASA")?;

        assert_eq!(
            series.observations(),
            &[
                Observation::new(date(2024, 1, 1), Some(-999.0), Some(75.0)),
                Observation::new(date(2024, 1, 2), Some(650.5), None),
                Observation::new(date(2024, 1, 3), None, Some(80.1)),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_missing_parameter() {
        let body = br#"{"properties":{"parameter":{"ALLSKY_SFC_SW_DWN":{"20240101":610}}}}"#;
        match decode_power_response(body, "NASA") {
            Err(DecodeError::MissingKey(key)) => assert_eq!(key, "properties.parameter.RH2M"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_error_payload_is_missing_properties() {
        let body = br#"{"header":"Error","messages":["start date is after end date"]}"#;
        assert!(matches!(
            decode_power_response(body, "NASA"),
            Err(DecodeError::MissingKey(key)) if key == "properties"
        ));
    }

    #[test]
    fn test_invalid_json_and_dates() {
        assert!(matches!(
            decode_power_response(b"<html>", "NASA"),
            Err(DecodeError::Json(_))
        ));

        let body = br#"{"properties":{"parameter":{"ALLSKY_SFC_SW_DWN":{"2024XX01":610},"RH2M":{}}}}"#;
        assert!(matches!(
            decode_power_response(body, "NASA"),
            Err(DecodeError::InvalidDate { .. })
        ));
    }
}
