//! The ordered catalogue of report entries and its runners.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::{
    dates, magnitude, measures, metadata, profiling, ranking, Report, ReportContext, ReportError,
    TitledResult,
};

/// Outcome of one catalogue entry. Failures are isolated per entry.
#[derive(Debug, Serialize)]
pub struct ReportOutcome {
    pub name: String,
    pub title: String,
    #[serde(serialize_with = "serialize_result")]
    pub result: Result<TitledResult, ReportError>,
    pub elapsed_ms: u64,
}

impl ReportOutcome {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

fn serialize_result<S>(
    result: &Result<TitledResult, ReportError>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match result {
        Ok(value) => value.serialize(serializer),
        Err(error) => serializer.collect_str(error),
    }
}

/// Fixed, ordered list of report entries.
#[derive(Clone)]
pub struct Catalogue {
    entries: Vec<Arc<dyn Report>>,
}

impl Catalogue {
    /// The standard catalogue, in presentation order.
    #[must_use]
    pub fn standard() -> Self {
        let entries = [
            metadata::entries(),
            profiling::entries(),
            dates::entries(),
            measures::entries(),
            magnitude::entries(),
            ranking::entries(),
        ]
        .into_iter()
        .flatten()
        .collect();
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[Arc<dyn Report>] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry whose name or title matches `key`, ignoring ASCII case.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<Arc<dyn Report>> {
        let key = key.trim();
        self.entries
            .iter()
            .find(|entry| {
                entry.name().eq_ignore_ascii_case(key) || entry.title().eq_ignore_ascii_case(key)
            })
            .cloned()
    }

    /// Entries matching `filters`, in catalogue order and without duplicates.
    /// An empty filter list selects every entry.
    ///
    /// # Errors
    /// Returns [`ReportError::UnknownEntry`] for the first filter that
    /// matches nothing.
    pub fn select<S: AsRef<str>>(&self, filters: &[S]) -> Result<Vec<Arc<dyn Report>>, ReportError> {
        if filters.is_empty() {
            return Ok(self.entries.clone());
        }

        let mut wanted = Vec::with_capacity(filters.len());
        for filter in filters {
            let filter = filter.as_ref();
            let entry = self
                .find(filter)
                .ok_or_else(|| ReportError::UnknownEntry(filter.to_string()))?;
            wanted.push(entry.name().to_string());
        }

        Ok(self
            .entries
            .iter()
            .filter(|entry| wanted.iter().any(|name| name == entry.name()))
            .cloned()
            .collect())
    }

    /// Run every entry sequentially.
    pub fn run(&self, context: &ReportContext) -> Vec<ReportOutcome> {
        run_entries(&self.entries, context)
    }

    /// Run every entry concurrently on the blocking pool.
    pub async fn run_parallel(&self, context: &ReportContext) -> Vec<ReportOutcome> {
        run_entries_parallel(self.entries.clone(), context).await
    }
}

impl Default for Catalogue {
    fn default() -> Self {
        Self::standard()
    }
}

/// Run `entries` one after another, returning outcomes in input order.
pub fn run_entries(entries: &[Arc<dyn Report>], context: &ReportContext) -> Vec<ReportOutcome> {
    info!(entries = entries.len(), "running report entries");
    entries
        .iter()
        .map(|entry| run_one(entry.as_ref(), context))
        .collect()
}

/// Run `entries` concurrently, returning outcomes in input order.
pub async fn run_entries_parallel(
    entries: Vec<Arc<dyn Report>>,
    context: &ReportContext,
) -> Vec<ReportOutcome> {
    info!(entries = entries.len(), "running report entries in parallel");

    let mut tasks = JoinSet::new();
    for (index, entry) in entries.iter().enumerate() {
        let entry = Arc::clone(entry);
        let context = context.clone();
        tasks.spawn_blocking(move || (index, run_one(entry.as_ref(), &context)));
    }

    let mut slots: Vec<Option<ReportOutcome>> = entries.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => slots[index] = Some(outcome),
            Err(error) => warn!(%error, "report task did not complete"),
        }
    }

    slots
        .into_iter()
        .zip(&entries)
        .map(|(slot, entry)| {
            slot.unwrap_or_else(|| ReportOutcome {
                name: entry.name().to_string(),
                title: entry.title().to_string(),
                result: Err(ReportError::Task(format!(
                    "entry '{}' did not complete",
                    entry.name()
                ))),
                elapsed_ms: 0,
            })
        })
        .collect()
}

fn run_one(entry: &dyn Report, context: &ReportContext) -> ReportOutcome {
    let started = Instant::now();
    let result = entry.run(context);
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match &result {
        Ok(titled) => debug!(
            entry = entry.name(),
            rows = titled.row_count,
            elapsed_ms,
            "report entry finished"
        ),
        Err(error) => warn!(entry = entry.name(), %error, "report entry failed"),
    }

    ReportOutcome {
        name: entry.name().to_string(),
        title: entry.title().to_string(),
        result,
        elapsed_ms,
    }
}
