use crate::error::CompareError;
use crate::remote::error::NetworkError;
use crate::remote::response::{decode_power_response, HUMIDITY_PARAMETER, RADIATION_PARAMETER};
use crate::types::location::LatLon;
use crate::types::observation::PeriodLabel;
use crate::types::series::Series;
use bon::bon;
use chrono::{Datelike, NaiveDate};
use log::{info, warn};
use reqwest::Client;
use std::time::Duration;

pub const POWER_DAILY_POINT_URL: &str = "https://power.larc.nasa.gov/api/temporal/daily/point";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the NASA POWER daily point endpoint.
///
/// Every fetch is exactly one GET; nothing is retried.
#[derive(Debug, Clone)]
pub struct PowerClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

#[bon]
impl PowerClient {
    /// Creates a client.
    ///
    /// * `.base_url(..)`: endpoint to query, defaults to [`POWER_DAILY_POINT_URL`].
    /// * `.timeout(..)`: whole-request timeout, defaults to [`DEFAULT_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::ClientBuild`] if the TLS backend cannot be initialised.
    #[builder]
    pub fn new(
        #[builder(into)] base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, NetworkError> {
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(NetworkError::ClientBuild)?;
        Ok(Self {
            client,
            base_url: base_url.unwrap_or_else(|| POWER_DAILY_POINT_URL.to_string()),
            timeout,
        })
    }

    /// Fetches daily radiation and humidity for `location` between `start` and `end`
    /// (inclusive).
    ///
    /// The series is labelled `label` if given, otherwise `"NASA {start year}–{end year}"`.
    ///
    /// # Errors
    ///
    /// * [`CompareError::Network`] if the request fails, times out or returns a non-2xx status.
    /// * [`CompareError::Decode`] if the body lacks the expected parameters.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use solar_compare::{CompareError, LatLon, PowerClient};
    /// # use chrono::NaiveDate;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), CompareError> {
    /// let client = PowerClient::builder().build()?;
    /// let series = client
    ///     .fetch()
    ///     .location(LatLon(-0.22, -78.36))
    ///     .start(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    ///     .end(NaiveDate::from_ymd_opt(2025, 6, 22).unwrap())
    ///     .call()
    ///     .await?;
    /// println!("{} days from {}", series.len(), series.label());
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn fetch(
        &self,
        location: LatLon,
        start: NaiveDate,
        end: NaiveDate,
        #[builder(into)] label: Option<PeriodLabel>,
    ) -> Result<Series, CompareError> {
        let url = self.request_url(location, start, end);
        let label = label.unwrap_or_else(|| default_label(start, end));
        info!("Fetching NASA POWER data from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.request_error(&url, e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                let error = if let Some(status) = e.status() {
                    NetworkError::HttpStatus {
                        url,
                        status,
                        source: e,
                    }
                } else {
                    NetworkError::Request(url, e)
                };
                return Err(error.into());
            }
        };

        let body = response
            .bytes()
            .await
            .map_err(|e| self.request_error(&url, e))?;
        let series = decode_power_response(&body, label)?;
        info!(
            "Decoded {} daily observations for {} ({} bytes)",
            series.len(),
            location,
            body.len()
        );
        Ok(series)
    }
}

impl PowerClient {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The full GET URL for a point/date-range request.
    pub fn request_url(&self, location: LatLon, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}?parameters={},{}&community=AG&longitude={}&latitude={}&start={}&end={}&format=JSON",
            self.base_url,
            RADIATION_PARAMETER,
            HUMIDITY_PARAMETER,
            location.longitude(),
            location.latitude(),
            start.format("%Y%m%d"),
            end.format("%Y%m%d"),
        )
    }

    fn request_error(&self, url: &str, e: reqwest::Error) -> NetworkError {
        if e.is_timeout() {
            NetworkError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
                source: e,
            }
        } else {
            NetworkError::Request(url.to_string(), e)
        }
    }
}

/// `"NASA 2024"` for a single year, `"NASA 2024–2025"` otherwise.
pub fn default_label(start: NaiveDate, end: NaiveDate) -> PeriodLabel {
    if start.year() == end.year() {
        PeriodLabel::new(format!("NASA {}", start.year()))
    } else {
        PeriodLabel::new(format!("NASA {}–{}", start.year(), end.year()))
    }
}
