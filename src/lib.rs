mod error;
pub mod proxy;
mod reconcile;
mod remote;
mod session;
mod settings;
mod source;
mod types;

pub use error::CompareError;

pub use types::location::LatLon;
pub use types::observation::{Observation, PeriodLabel, ValueChannel};
pub use types::series::{DuplicateDateError, Series};
pub use types::traits::any_date::AnyDate;
pub use types::traits::types::{Month, StartEndDate, Year};

pub use source::error::ParseError;
pub use source::parser::*;

pub use remote::cached_fetcher::CachedFetcher;
pub use remote::error::{DecodeError, NetworkError};
pub use remote::fetcher::{default_label, PowerClient, DEFAULT_TIMEOUT, POWER_DAILY_POINT_URL};
pub use remote::response::{decode_power_response, HUMIDITY_PARAMETER, RADIATION_PARAMETER};

pub use reconcile::dataset::*;
pub use reconcile::filtering::ReconciledFrameFilterExt;
pub use reconcile::reconciler::*;
pub use reconcile::summary::*;

pub use session::*;
pub use settings::*;
