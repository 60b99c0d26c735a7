use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::types::{FetchMode, HydrationMode};

/// Hint holding per-class, per-association fetch modes.
pub const HINT_FETCH_MODE: &str = "fetchMode";
/// Hint merged in when deriving hydration cache keys.
pub const HINT_HYDRATION_MODE: &str = "hydrationMode";

/// Named query hints, kept sorted by name.
///
/// Hydrators read the hints they understand and ignore the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Hints {
    entries: BTreeMap<String, JsonValue>,
}

impl Hints {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<JsonValue>) {
        self.entries.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.entries.iter()
    }

    /// Record the fetch mode for `class.association`. Anything but `Eager` is stored as `Lazy`.
    pub fn set_fetch_mode(&mut self, class: &str, association: &str, mode: FetchMode) {
        let mode = match mode {
            FetchMode::Eager => FetchMode::Eager,
            FetchMode::Lazy | FetchMode::ExtraLazy => FetchMode::Lazy,
        };

        let by_class = self
            .entries
            .entry(HINT_FETCH_MODE.to_string())
            .or_insert_with(|| JsonValue::Object(Map::new()));
        if !by_class.is_object() {
            *by_class = JsonValue::Object(Map::new());
        }
        let Some(by_class) = by_class.as_object_mut() else {
            return;
        };

        let by_assoc = by_class
            .entry(class.to_string())
            .or_insert_with(|| JsonValue::Object(Map::new()));
        if !by_assoc.is_object() {
            *by_assoc = JsonValue::Object(Map::new());
        }
        if let Some(by_assoc) = by_assoc.as_object_mut() {
            by_assoc.insert(association.to_string(), fetch_mode_value(mode));
        }
    }

    /// Fetch mode recorded for `class.association`, if any.
    #[must_use]
    pub fn fetch_mode(&self, class: &str, association: &str) -> Option<FetchMode> {
        let value = self.get(HINT_FETCH_MODE)?.get(class)?.get(association)?;
        match value.as_str()? {
            "EAGER" => Some(FetchMode::Eager),
            "LAZY" => Some(FetchMode::Lazy),
            _ => None,
        }
    }

    /// Copy of these hints with the hydration mode merged in.
    #[must_use]
    pub fn with_hydration_mode(&self, mode: HydrationMode) -> Hints {
        let mut hints = self.clone();
        hints.set(HINT_HYDRATION_MODE, mode.code());
        hints
    }
}

fn fetch_mode_value(mode: FetchMode) -> JsonValue {
    match mode {
        FetchMode::Eager => JsonValue::from("EAGER"),
        FetchMode::Lazy | FetchMode::ExtraLazy => JsonValue::from("LAZY"),
    }
}
