//! One interactive comparison session: the parser, fetcher and reconciler it was
//! configured with, and the bounded log of comparisons it has produced.

use crate::error::CompareError;
use crate::reconcile::dataset::ReconciledDataset;
use crate::reconcile::reconciler::Reconciler;
use crate::reconcile::summary::SummaryStatistics;
use crate::remote::cached_fetcher::CachedFetcher;
use crate::remote::fetcher::PowerClient;
use crate::source::parser::HistoricalParser;
use crate::types::location::LatLon;
use crate::types::observation::{PeriodLabel, ValueChannel};
use crate::types::series::Series;
use crate::types::traits::types::StartEndDate;
use bon::{bon, Builder};
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::VecDeque;

/// Comparisons kept per session unless configured otherwise.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// The output of one successful action.
#[derive(Debug, Clone)]
pub struct Comparison {
    /// 1-based, increasing across the whole session, including evicted entries.
    pub sequence: u64,
    pub dataset: ReconciledDataset,
    pub summary: SummaryStatistics,
}

/// Append-only log of comparisons. Once full, the oldest entry is evicted.
#[derive(Debug, Clone)]
pub struct SessionHistory {
    entries: VecDeque<Comparison>,
    capacity: usize,
    next_sequence: u64,
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl SessionHistory {
    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_sequence: 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Comparison> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&Comparison> {
        self.entries.back()
    }

    pub fn get(&self, sequence: u64) -> Option<&Comparison> {
        self.entries.iter().find(|c| c.sequence == sequence)
    }

    fn push(&mut self, dataset: ReconciledDataset, summary: SummaryStatistics) -> &Comparison {
        if self.entries.len() == self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                info!("Evicting comparison #{} from session history", evicted.sequence);
            }
        }
        self.entries.push_back(Comparison {
            sequence: self.next_sequence,
            dataset,
            summary,
        });
        self.next_sequence += 1;
        &self.entries[self.entries.len() - 1]
    }
}

/// Inputs for one [`Session::run_action`].
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use solar_compare::{ComparisonRequest, LatLon};
///
/// let request = ComparisonRequest::builder()
///     .radiation(b"Fecha,Valor\n2008-01-01,700\n".to_vec())
///     .label("2008")
///     .location(LatLon(-0.22, -78.36))
///     .start(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
///     .end(NaiveDate::from_ymd_opt(2025, 6, 22).unwrap())
///     .build();
/// assert_eq!(request.label().as_str(), "2008");
/// ```
#[derive(Debug, Clone, Builder)]
pub struct ComparisonRequest {
    /// Raw historical radiation export.
    radiation: Vec<u8>,
    /// Optional humidity export from the same station, inner-joined on date.
    humidity: Option<Vec<u8>>,
    /// Optional atmospheric pressure export from the same station, inner-joined on date.
    pressure: Option<Vec<u8>>,
    #[builder(into)]
    label: PeriodLabel,
    /// Restricts the historical rows to this range before reconciling.
    historical_range: Option<StartEndDate>,
    location: LatLon,
    start: NaiveDate,
    end: NaiveDate,
    /// Label of the NASA series, defaults to `"NASA {start}–{end}"`.
    #[builder(into)]
    nasa_label: Option<PeriodLabel>,
}

impl ComparisonRequest {
    pub fn label(&self) -> &PeriodLabel {
        &self.label
    }

    pub fn location(&self) -> LatLon {
        self.location
    }
}

/// Runs comparison actions strictly one after another and records their results.
///
/// An action either fully succeeds and is appended to the history, or fails and leaves
/// the session exactly as it was.
pub struct Session {
    history: SessionHistory,
    fetcher: CachedFetcher,
    reconciler: Reconciler,
    parser: HistoricalParser,
}

#[bon]
impl Session {
    /// Creates a session.
    ///
    /// * `.client(..)`: NASA POWER client, defaults to the public endpoint.
    /// * `.reconciler(..)`: threshold and missing-radiation policy.
    /// * `.parser(..)`: layout of the historical exports.
    /// * `.history_capacity(..)`: defaults to [`DEFAULT_HISTORY_CAPACITY`].
    ///
    /// # Errors
    ///
    /// Returns [`CompareError::Network`] if the default HTTP client cannot be built.
    #[builder]
    pub fn new(
        client: Option<PowerClient>,
        #[builder(default)] reconciler: Reconciler,
        #[builder(default)] parser: HistoricalParser,
        #[builder(default = DEFAULT_HISTORY_CAPACITY)] history_capacity: usize,
    ) -> Result<Self, CompareError> {
        let client = match client {
            Some(client) => client,
            None => PowerClient::builder().build()?,
        };
        Ok(Self {
            history: SessionHistory::with_capacity(history_capacity),
            fetcher: CachedFetcher::new(client),
            reconciler,
            parser,
        })
    }
}

impl Session {
    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn fetcher(&self) -> &CachedFetcher {
        &self.fetcher
    }

    /// Parses the historical export, fetches the NASA series, reconciles both and
    /// summarizes the result, in that order.
    ///
    /// Periods without rows do not fail the action; they are logged and show up in
    /// [`SummaryStatistics::empty_periods`].
    ///
    /// # Errors
    ///
    /// Any [`CompareError`] from the individual stages. Nothing is recorded on failure.
    pub async fn run_action(
        &mut self,
        request: &ComparisonRequest,
    ) -> Result<&Comparison, CompareError> {
        let historical = self.load_historical(request)?;

        let nasa = self
            .fetcher
            .get_cache_series(request.location, request.start, request.end)
            .await?;
        let nasa = match &request.nasa_label {
            Some(label) => nasa.relabel(label.clone()),
            None => nasa,
        };

        let dataset = self.reconciler.reconcile(&[historical, nasa])?;
        let summary = self.reconciler.summarize(&dataset)?;
        for label in summary.empty_periods() {
            warn!("No rows for '{}' in this comparison", label);
        }

        let comparison = self.history.push(dataset, summary);
        info!(
            "Comparison #{} recorded ({} rows)",
            comparison.sequence,
            comparison.dataset.height()
        );
        Ok(comparison)
    }

    fn load_historical(&self, request: &ComparisonRequest) -> Result<Series, CompareError> {
        let radiation_parser = self.parser.for_channel(ValueChannel::Radiation);
        let mut series = radiation_parser.parse(&request.radiation, request.label.clone())?;

        let mut others = Vec::new();
        for (channel, bytes) in [
            (ValueChannel::Pressure, &request.pressure),
            (ValueChannel::Humidity, &request.humidity),
        ] {
            if let Some(bytes) = bytes {
                others.push(
                    self.parser
                        .for_channel(channel)
                        .parse(bytes, request.label.clone())?,
                );
            }
        }
        if !others.is_empty() {
            series = Series::merge_channels(&series, &others.iter().collect::<Vec<_>>());
        }

        if let Some(range) = request.historical_range {
            series = series.filter_range(range.start, range.end)?;
        }
        Ok(series)
    }
}
