//! Turning raw row sets into in-memory structures.
//!
//! One [`Hydrator`] implementation exists per [`HydrationMode`]; the
//! [`HydratorRegistry`] selects it for each execution.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::hints::Hints;
use crate::metadata::EntityRef;
use crate::results::{ResultSet, Row};
use crate::types::{HydrationMode, RowValues};

mod hydrators;
mod mapping;

pub use hydrators::{
    ArrayHydrator, ObjectHydrator, ScalarHydrator, SimpleObjectHydrator, SingleScalarHydrator,
};
pub use mapping::ResultSetMapping;

/// One hydrated result element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HydratedValue {
    Entity(EntityRef),
    Record(BTreeMap<String, RowValues>),
    Scalar(RowValues),
}

impl HydratedValue {
    #[must_use]
    pub fn as_entity(&self) -> Option<&EntityRef> {
        if let HydratedValue::Entity(entity) = self {
            Some(entity)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<&BTreeMap<String, RowValues>> {
        if let HydratedValue::Record(record) = self {
            Some(record)
        } else {
            None
        }
    }
}

/// The full output of an eager execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Hydrated {
    Rows(Vec<HydratedValue>),
    /// Single-scalar hydration output.
    Scalar(RowValues),
    /// Affected-row count of a bulk statement, which skips hydration.
    Affected(usize),
}

impl Hydrated {
    /// Empty row list, blank scalar, or zero affected rows.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Hydrated::Rows(rows) => rows.is_empty(),
            Hydrated::Scalar(value) => value.is_blank(),
            Hydrated::Affected(count) => *count == 0,
        }
    }

    #[must_use]
    pub fn rows(&self) -> Option<&[HydratedValue]> {
        if let Hydrated::Rows(rows) = self {
            Some(rows)
        } else {
            None
        }
    }

    #[must_use]
    pub fn into_rows(self) -> Option<Vec<HydratedValue>> {
        if let Hydrated::Rows(rows) = self {
            Some(rows)
        } else {
            None
        }
    }
}

/// Converts statement rows for one hydration mode.
pub trait Hydrator: Send + Sync {
    /// Hydrate a single row. Used by the lazy iteration path.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::HydrationError` if the row cannot be shaped for this mode.
    fn hydrate_row(
        &self,
        row: &Row,
        rsm: &ResultSetMapping,
        hints: &Hints,
    ) -> Result<HydratedValue, QueryError>;

    /// Hydrate a complete row set.
    ///
    /// # Errors
    ///
    /// Returns hydration errors, or cardinality errors for modes that constrain the row count.
    fn hydrate_all(
        &self,
        rows: ResultSet,
        rsm: &ResultSetMapping,
        hints: &Hints,
    ) -> Result<Hydrated, QueryError> {
        rows.results
            .iter()
            .map(|row| self.hydrate_row(row, rsm, hints))
            .collect::<Result<Vec<_>, _>>()
            .map(Hydrated::Rows)
    }
}

/// Lazily hydrated, forward-only sequence of results.
///
/// Each call to `next` hydrates one row. After the first error the sequence ends.
pub struct IterableResult {
    rows: std::vec::IntoIter<Row>,
    hydrator: Arc<dyn Hydrator>,
    rsm: ResultSetMapping,
    hints: Hints,
    failed: bool,
}

impl IterableResult {
    #[must_use]
    pub fn new(
        rows: ResultSet,
        hydrator: Arc<dyn Hydrator>,
        rsm: ResultSetMapping,
        hints: Hints,
    ) -> Self {
        Self {
            rows: rows.into_iter(),
            hydrator,
            rsm,
            hints,
            failed: false,
        }
    }
}

impl Iterator for IterableResult {
    type Item = Result<HydratedValue, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let row = self.rows.next()?;
        let hydrated = self.hydrator.hydrate_row(&row, &self.rsm, &self.hints);
        if hydrated.is_err() {
            self.failed = true;
        }
        Some(hydrated)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            (0, Some(0))
        } else {
            (0, Some(self.rows.len()))
        }
    }
}

impl std::iter::FusedIterator for IterableResult {}

impl fmt::Debug for IterableResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterableResult")
            .field("remaining", &self.rows.len())
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

/// Hydrator per mode. Starts with the built-in hydrators; any mode can be overridden.
#[derive(Clone)]
pub struct HydratorRegistry {
    hydrators: HashMap<HydrationMode, Arc<dyn Hydrator>>,
}

impl HydratorRegistry {
    #[must_use]
    pub fn new() -> Self {
        let mut hydrators: HashMap<HydrationMode, Arc<dyn Hydrator>> = HashMap::new();
        hydrators.insert(HydrationMode::Object, Arc::new(ObjectHydrator));
        hydrators.insert(HydrationMode::Array, Arc::new(ArrayHydrator));
        hydrators.insert(HydrationMode::Scalar, Arc::new(ScalarHydrator));
        hydrators.insert(HydrationMode::SingleScalar, Arc::new(SingleScalarHydrator));
        hydrators.insert(HydrationMode::SimpleObject, Arc::new(SimpleObjectHydrator));
        Self { hydrators }
    }

    pub fn register(&mut self, mode: HydrationMode, hydrator: Arc<dyn Hydrator>) {
        self.hydrators.insert(mode, hydrator);
    }

    /// Hydrator for `mode`.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidConfiguration` if no hydrator is registered for the mode.
    pub fn get(&self, mode: HydrationMode) -> Result<Arc<dyn Hydrator>, QueryError> {
        self.hydrators.get(&mode).cloned().ok_or_else(|| {
            QueryError::InvalidConfiguration(format!("no hydrator registered for {mode:?}"))
        })
    }
}

impl Default for HydratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HydratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut modes: Vec<_> = self.hydrators.keys().collect();
        modes.sort();
        f.debug_struct("HydratorRegistry")
            .field("modes", &modes)
            .finish()
    }
}
