//! Effect counters with a fixed label registry.
//!
//! The [`LabelRegistry`] is built once at startup and shared by `Arc`.
//! It has no mutating methods, so the set of metrics and their label keys
//! cannot grow at runtime. Every observation is checked against the
//! registered schema by exact key-set match: missing keys, extra keys and
//! unknown metrics are all rejected. Each schema also caps how many
//! distinct label combinations it will track.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use effectum::metrics::{EffectMetrics, LabelRegistry, LabelSchema};
//!
//! let registry = Arc::new(
//!     LabelRegistry::builder()
//!         .register(LabelSchema::new("logins_total", ["result"]))
//!         .build(),
//! );
//! let metrics = EffectMetrics::new(registry);
//!
//! assert!(metrics.increment("logins_total", &[("result", "ok")]).is_ok());
//! assert!(metrics.increment("logins_total", &[("user", "ada")]).is_err());
//! assert_eq!(metrics.count("logins_total", &[("result", "ok")]), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::effect::EffectTag;
use crate::error::InterpreterError;

/// Counter incremented once per interpreted effect.
pub const EFFECTS_TOTAL: &str = "effects_total";

const DEFAULT_MAX_SERIES: usize = 1_024;

// =============================================================================
// LabelSchema / LabelRegistry
// =============================================================================

/// The label keys a metric accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSchema {
    metric: String,
    keys: BTreeSet<String>,
    max_series: usize,
}

impl LabelSchema {
    /// A schema for `metric` with exactly `keys`.
    #[must_use]
    pub fn new(metric: impl Into<String>, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            metric: metric.into(),
            keys: keys.into_iter().map(Into::into).collect(),
            max_series: DEFAULT_MAX_SERIES,
        }
    }

    /// Caps the number of distinct label combinations.
    #[must_use]
    pub fn with_max_series(self, max_series: usize) -> Self {
        Self { max_series, ..self }
    }

    /// Metric name.
    #[must_use]
    pub fn metric(&self) -> &str {
        &self.metric
    }

    /// Accepted label keys, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    fn validate(&self, labels: &[(&str, &str)]) -> Result<(), LabelError> {
        let found: BTreeSet<&str> = labels.iter().map(|(key, _)| *key).collect();
        let duplicated = found.len() != labels.len();
        if duplicated || !found.iter().copied().eq(self.keys()) {
            return Err(LabelError::KeyMismatch {
                metric: self.metric.clone(),
                expected: self.keys.iter().cloned().collect(),
                found: labels.iter().map(|(key, _)| (*key).to_string()).collect(),
            });
        }
        Ok(())
    }
}

/// Every metric the process may emit. Immutable after [`build`].
///
/// [`build`]: LabelRegistryBuilder::build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRegistry {
    schemas: BTreeMap<String, LabelSchema>,
}

impl LabelRegistry {
    /// Starts an empty registry.
    #[must_use]
    pub fn builder() -> LabelRegistryBuilder {
        LabelRegistryBuilder {
            schemas: BTreeMap::new(),
        }
    }

    /// The registry the composite interpreter needs: `effects_total` with
    /// `category`, `effect` and `outcome` labels.
    #[must_use]
    pub fn standard() -> Self {
        Self::builder()
            .register(LabelSchema::new(
                EFFECTS_TOTAL,
                ["category", "effect", "outcome"],
            ))
            .build()
    }

    /// The schema of `metric`.
    #[must_use]
    pub fn schema(&self, metric: &str) -> Option<&LabelSchema> {
        self.schemas.get(metric)
    }

    /// Checks a label set against `metric`'s schema.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::UnknownMetric`] or [`LabelError::KeyMismatch`].
    pub fn validate(&self, metric: &str, labels: &[(&str, &str)]) -> Result<(), LabelError> {
        self.schema(metric)
            .ok_or_else(|| LabelError::UnknownMetric(metric.to_string()))?
            .validate(labels)
    }
}

/// Collects schemas before the registry is frozen.
#[derive(Debug)]
pub struct LabelRegistryBuilder {
    schemas: BTreeMap<String, LabelSchema>,
}

impl LabelRegistryBuilder {
    /// Adds a schema, replacing any earlier one for the same metric.
    #[must_use]
    pub fn register(mut self, schema: LabelSchema) -> Self {
        self.schemas.insert(schema.metric.clone(), schema);
        self
    }

    /// Freezes the registry.
    #[must_use]
    pub fn build(self) -> LabelRegistry {
        LabelRegistry {
            schemas: self.schemas,
        }
    }
}

/// Why an observation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    /// The metric is not registered.
    #[error("metric `{0}` is not registered")]
    UnknownMetric(String),

    /// The label keys differ from the schema.
    #[error("metric `{metric}` expects labels {expected:?}, got {found:?}")]
    KeyMismatch {
        /// Metric name.
        metric: String,
        /// Registered keys, sorted.
        expected: Vec<String>,
        /// Keys supplied, in the order given.
        found: Vec<String>,
    },

    /// The metric already tracks its maximum number of label combinations.
    #[error("metric `{metric}` reached its limit of {limit} series")]
    SeriesLimit {
        /// Metric name.
        metric: String,
        /// The cap.
        limit: usize,
    },
}

// =============================================================================
// Outcome
// =============================================================================

/// How an interpreted effect ended, as a metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Success.
    Ok,
    /// Infrastructure failure that may succeed on retry.
    RetryableError,
    /// Any other failure except defects.
    Error,
    /// Wiring bug.
    Defect,
}

impl Outcome {
    /// Classifies an interpreter result.
    #[must_use]
    pub const fn of<T>(result: &Result<T, InterpreterError>) -> Self {
        match result {
            Ok(_) => Self::Ok,
            Err(error) if error.is_defect() => Self::Defect,
            Err(error) if error.is_retryable() => Self::RetryableError,
            Err(_) => Self::Error,
        }
    }

    /// Label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::RetryableError => "retryable_error",
            Self::Error => "error",
            Self::Defect => "defect",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

// =============================================================================
// EffectMetrics
// =============================================================================

type Series = Vec<(String, String)>;

/// In-process counters validated against a [`LabelRegistry`].
///
/// Exporting the counters is left to the embedding service.
pub struct EffectMetrics {
    registry: Arc<LabelRegistry>,
    counters: Mutex<HashMap<String, HashMap<Series, u64>>>,
}

impl EffectMetrics {
    /// Creates empty counters for `registry`.
    #[must_use]
    pub fn new(registry: Arc<LabelRegistry>) -> Self {
        Self {
            registry,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// The registry observations are checked against.
    #[must_use]
    pub fn registry(&self) -> &LabelRegistry {
        &self.registry
    }

    /// Adds one to the series identified by `labels`.
    ///
    /// # Errors
    ///
    /// Returns the [`LabelError`] when the label set does not match the
    /// schema or the schema's series cap is reached. Nothing is recorded.
    pub fn increment(&self, metric: &str, labels: &[(&str, &str)]) -> Result<(), LabelError> {
        self.registry.validate(metric, labels)?;
        let limit = self
            .registry
            .schema(metric)
            .map_or(DEFAULT_MAX_SERIES, |schema| schema.max_series);
        let series = normalize(labels);

        let mut counters = self.counters.lock();
        let metric_counters = counters.entry(metric.to_string()).or_default();
        if !metric_counters.contains_key(&series) && metric_counters.len() >= limit {
            return Err(LabelError::SeriesLimit {
                metric: metric.to_string(),
                limit,
            });
        }
        *metric_counters.entry(series).or_insert(0) += 1;
        Ok(())
    }

    /// Records one interpreted effect in `effects_total`.
    ///
    /// A rejected label set is logged and dropped; metrics never fail the
    /// effect they describe.
    pub fn observe(&self, tag: EffectTag, outcome: Outcome) {
        let labels = [
            ("category", tag.category().as_str()),
            ("effect", tag.as_str()),
            ("outcome", outcome.as_str()),
        ];
        if let Err(error) = self.increment(EFFECTS_TOTAL, &labels) {
            tracing::warn!(error = %error, "effect metric dropped");
        }
    }

    /// Current value of one series; zero if never incremented.
    #[must_use]
    pub fn count(&self, metric: &str, labels: &[(&str, &str)]) -> u64 {
        self.counters
            .lock()
            .get(metric)
            .and_then(|series| series.get(&normalize(labels)))
            .copied()
            .unwrap_or(0)
    }

    /// Sum over every series of `metric`.
    #[must_use]
    pub fn total(&self, metric: &str) -> u64 {
        self.counters
            .lock()
            .get(metric)
            .map_or(0, |series| series.values().sum())
    }
}

impl fmt::Debug for EffectMetrics {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("EffectMetrics")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

fn normalize(labels: &[(&str, &str)]) -> Series {
    let mut series: Series = labels
        .iter()
        .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
        .collect();
    series.sort();
    series
}
