use crate::remote::fetcher::PowerClient;
use crate::settings::ProxySettings;
use crate::types::location::LatLon;

/// Query defaults applied when a parameter is omitted.
#[derive(Debug, Clone)]
pub struct QueryDefaults {
    pub location: LatLon,
    /// `YYYYMMDD`.
    pub start_date: String,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            location: LatLon(-0.35, -78.35),
            start_date: "20240101".to_string(),
        }
    }
}

impl From<&ProxySettings> for QueryDefaults {
    fn from(settings: &ProxySettings) -> Self {
        Self {
            location: LatLon(settings.default_latitude, settings.default_longitude),
            start_date: settings.default_start.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub client: PowerClient,
    pub defaults: QueryDefaults,
}
