//! Runtime configuration for the binaries.
//!
//! Values are layered: built-in defaults, then an optional `solar-compare.toml` (or an
//! explicit file), then `SOLAR_COMPARE__SECTION__KEY` environment variables.

use crate::error::CompareError;
use crate::reconcile::reconciler::{MissingRadiationPolicy, Reconciler, HIGH_RADIATION_THRESHOLD};
use crate::remote::fetcher::{PowerClient, DEFAULT_TIMEOUT, POWER_DAILY_POINT_URL};
use crate::session::{Session, DEFAULT_HISTORY_CAPACITY};
use crate::source::parser::{
    DateParsePolicy, HistoricalParser, DEFAULT_DATE_COLUMN, DEFAULT_HEADER_ROWS,
    DEFAULT_VALUE_COLUMN,
};
use crate::types::location::LatLon;
use chrono::NaiveDate;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "solar-compare";
pub const ENV_PREFIX: &str = "SOLAR_COMPARE";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub location: LocationSettings,
    pub nasa: NasaSettings,
    pub historical: HistoricalSettings,
    pub reconcile: ReconcileSettings,
    pub session: SessionSettings,
    pub proxy: ProxySettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationSettings {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NasaSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub start: NaiveDate,
    /// Today when unset.
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoricalSettings {
    pub header_rows: usize,
    pub date_column: String,
    pub value_column: String,
    pub date_policy: DateParsePolicy,
    pub separator: char,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileSettings {
    pub threshold: f64,
    pub missing_radiation: MissingRadiationPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    pub history_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxySettings {
    pub bind: String,
    pub default_latitude: f64,
    pub default_longitude: f64,
    pub default_start: String,
}

impl Settings {
    /// Loads `solar-compare.toml` from the working directory if present, or `path` when
    /// given, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(path, None)
    }

    fn load_from(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let environment = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .source(env);

        let settings: Self = Config::builder()
            .set_default("location.latitude", -0.22)?
            .set_default("location.longitude", -78.36)?
            .set_default("nasa.base_url", POWER_DAILY_POINT_URL)?
            .set_default("nasa.timeout_secs", DEFAULT_TIMEOUT.as_secs() as i64)?
            .set_default("nasa.start", "2024-01-01")?
            .set_default("historical.header_rows", DEFAULT_HEADER_ROWS as i64)?
            .set_default("historical.date_column", DEFAULT_DATE_COLUMN)?
            .set_default("historical.value_column", DEFAULT_VALUE_COLUMN)?
            .set_default("historical.date_policy", "strict")?
            .set_default("historical.separator", ",")?
            .set_default("reconcile.threshold", HIGH_RADIATION_THRESHOLD)?
            .set_default("reconcile.missing_radiation", "count_as_not_high")?
            .set_default("session.history_capacity", DEFAULT_HISTORY_CAPACITY as i64)?
            .set_default("proxy.bind", "127.0.0.1:8000")?
            .set_default("proxy.default_latitude", -0.35)?
            .set_default("proxy.default_longitude", -78.35)?
            .set_default("proxy.default_start", "20240101")?
            .add_source(file)
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        if !settings.historical.separator.is_ascii() {
            return Err(ConfigError::Message(format!(
                "historical.separator must be a single ASCII character, got '{}'",
                settings.historical.separator
            )));
        }
        Ok(settings)
    }

    pub fn location(&self) -> LatLon {
        LatLon(self.location.latitude, self.location.longitude)
    }

    pub fn nasa_end(&self, today: NaiveDate) -> NaiveDate {
        self.nasa.end.unwrap_or(today)
    }

    pub fn power_client(&self) -> Result<PowerClient, CompareError> {
        Ok(PowerClient::builder()
            .base_url(self.nasa.base_url.clone())
            .timeout(Duration::from_secs(self.nasa.timeout_secs))
            .build()?)
    }

    pub fn parser(&self) -> HistoricalParser {
        HistoricalParser::builder()
            .header_rows(self.historical.header_rows)
            .date_column(self.historical.date_column.clone())
            .value_column(self.historical.value_column.clone())
            .date_policy(self.historical.date_policy)
            // Checked to be ASCII when loading.
            .separator(self.historical.separator as u8)
            .build()
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::builder()
            .threshold(self.reconcile.threshold)
            .missing_radiation(self.reconcile.missing_radiation)
            .build()
    }

    pub fn session(&self) -> Result<Session, CompareError> {
        Session::builder()
            .client(self.power_client()?)
            .reconciler(self.reconciler())
            .parser(self.parser())
            .history_capacity(self.session.history_capacity)
            .build()
    }
}
