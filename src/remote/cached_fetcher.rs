use crate::error::CompareError;
use crate::remote::fetcher::PowerClient;
use crate::types::location::LatLon;
use crate::types::series::Series;
use chrono::NaiveDate;
use log::debug;
use ordered_float::OrderedFloat;
use std::collections::{hash_map::Entry, HashMap};
use tokio::sync::Mutex;

/// The literal call-site parameters of a fetch.
type FetchKey = (OrderedFloat<f64>, OrderedFloat<f64>, NaiveDate, NaiveDate);

/// Memoizes successful NASA POWER fetches for as long as the value lives.
///
/// Entries are keyed by the exact coordinates and date range requested and never
/// expire; a session owns one and drops it with the session. Failures are not cached.
pub struct CachedFetcher {
    client: PowerClient,
    series_cache: Mutex<HashMap<FetchKey, Series>>,
}

impl CachedFetcher {
    pub fn new(client: PowerClient) -> Self {
        Self {
            client,
            series_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn client(&self) -> &PowerClient {
        &self.client
    }

    /// Returns the series for the given parameters, fetching it on first use.
    pub async fn get_cache_series(
        &self,
        location: LatLon,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Series, CompareError> {
        let key = (
            OrderedFloat(location.latitude()),
            OrderedFloat(location.longitude()),
            start,
            end,
        );

        {
            let cache = self.series_cache.lock().await;
            if let Some(cached) = cache.get(&key) {
                debug!("Serving NASA POWER series for {} from session cache", location);
                return Ok(cached.clone());
            }
        }

        // Fetch outside the lock.
        let fetched = self
            .client
            .fetch()
            .location(location)
            .start(start)
            .end(end)
            .call()
            .await?;

        let mut cache = self.series_cache.lock().await;
        match cache.entry(key) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                entry.insert(fetched.clone());
                Ok(fetched)
            }
        }
    }

    pub async fn cached_len(&self) -> usize {
        self.series_cache.lock().await.len()
    }

    pub async fn clear(&self) {
        self.series_cache.lock().await.clear();
    }
}
