//! Query parameters: keys, input values, resolved values and the binding rules between them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::QueryError;
use crate::inference::TypeInferer;
use crate::metadata::{EntityMetadata, EntityRef, EntityState};
use crate::types::{ParamType, RowValues};

/// Parameter name or position. Named keys never carry the `:` delimiter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParameterKey {
    Positional(usize),
    Named(String),
}

impl ParameterKey {
    /// Normalize a raw key: strip surrounding `:` and treat an all-digit key as positional.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim_matches(':');
        match trimmed.parse::<usize>() {
            Ok(position) => ParameterKey::Positional(position),
            Err(_) => ParameterKey::Named(trimmed.to_string()),
        }
    }
}

impl From<&str> for ParameterKey {
    fn from(raw: &str) -> Self {
        ParameterKey::parse(raw)
    }
}

impl From<String> for ParameterKey {
    fn from(raw: String) -> Self {
        ParameterKey::parse(&raw)
    }
}

impl From<usize> for ParameterKey {
    fn from(position: usize) -> Self {
        ParameterKey::Positional(position)
    }
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterKey::Positional(position) => write!(f, "?{position}"),
            ParameterKey::Named(name) => write!(f, ":{name}"),
        }
    }
}

/// A value as handed to `set_parameter`, before entity resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Scalar(RowValues),
    List(Vec<ParamValue>),
    Entity(EntityRef),
}

macro_rules! scalar_param_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ParamValue {
                fn from(value: $ty) -> Self {
                    ParamValue::Scalar(RowValues::from(value))
                }
            }
        )*
    };
}

scalar_param_from!(i64, i32, f64, bool, &str, String, chrono::NaiveDateTime);

impl From<RowValues> for ParamValue {
    fn from(value: RowValues) -> Self {
        ParamValue::Scalar(value)
    }
}

impl From<EntityRef> for ParamValue {
    fn from(entity: EntityRef) -> Self {
        ParamValue::Entity(entity)
    }
}

impl ParamValue {
    /// Build a list parameter from anything convertible into parameter values.
    pub fn list<T: Into<ParamValue>>(items: impl IntoIterator<Item = T>) -> Self {
        ParamValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// A parameter value after entities were replaced by their identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BoundValue {
    Scalar(RowValues),
    List(Vec<BoundValue>),
}

impl BoundValue {
    #[must_use]
    pub fn as_scalar(&self) -> Option<&RowValues> {
        if let BoundValue::Scalar(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Collapse a list to its first element, an empty list to `Null`.
    #[must_use]
    pub fn into_first_scalar(self) -> BoundValue {
        match self {
            BoundValue::List(items) => items
                .into_iter()
                .next()
                .map_or(BoundValue::Scalar(RowValues::Null), BoundValue::into_first_scalar),
            scalar @ BoundValue::Scalar(_) => scalar,
        }
    }

    /// Append every scalar in depth-first order.
    pub fn flatten_into<'a>(&'a self, out: &mut Vec<&'a RowValues>) {
        match self {
            BoundValue::Scalar(value) => out.push(value),
            BoundValue::List(items) => {
                for item in items {
                    item.flatten_into(out);
                }
            }
        }
    }
}

/// One bound parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub key: ParameterKey,
    pub value: BoundValue,
    pub ty: ParamType,
}

/// Bound parameters of a query, unique by key and iterated in key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    entries: BTreeMap<ParameterKey, Parameter>,
}

impl Parameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the binding for `parameter.key`.
    pub fn insert(&mut self, parameter: Parameter) {
        self.entries.insert(parameter.key.clone(), parameter);
    }

    #[must_use]
    pub fn get(&self, key: &ParameterKey) -> Option<&Parameter> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.entries.values()
    }

    /// Positional parameters in ascending position.
    pub fn positional(&self) -> impl Iterator<Item = &Parameter> {
        self.entries
            .values()
            .filter(|p| matches!(p.key, ParameterKey::Positional(_)))
    }

    /// Key-sorted `[key, value]` pairs, the shape used for cache key derivation.
    #[must_use]
    pub fn values_for_cache_key(&self) -> Vec<(&ParameterKey, &BoundValue)> {
        self.entries.values().map(|p| (&p.key, &p.value)).collect()
    }

    /// Key-sorted `[key, type]` pairs.
    #[must_use]
    pub fn types_for_cache_key(&self) -> Vec<(&ParameterKey, ParamType)> {
        self.entries.values().map(|p| (&p.key, p.ty)).collect()
    }
}

/// Resolves raw parameter values against entity metadata and infers missing types.
pub struct ParameterBinder<'a> {
    metadata: &'a dyn EntityMetadata,
    inferer: &'a dyn TypeInferer,
}

impl<'a> ParameterBinder<'a> {
    #[must_use]
    pub fn new(metadata: &'a dyn EntityMetadata, inferer: &'a dyn TypeInferer) -> Self {
        Self { metadata, inferer }
    }

    /// Resolve `value` and produce the parameter to store under `key`.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidArgument` if an entity (at any list depth) has a composite
    /// identifier or a blank identifier value.
    pub fn bind(
        &self,
        key: ParameterKey,
        value: ParamValue,
        ty: Option<ParamType>,
    ) -> Result<Parameter, QueryError> {
        let value = self.resolve(value)?;
        let ty = ty.unwrap_or_else(|| self.inferer.infer_type(&value));
        trace!(key = %key, ty = ?ty, "bound query parameter");
        Ok(Parameter { key, value, ty })
    }

    /// Resolve lists element-wise and entities to their single identifier value.
    ///
    /// Every list element ends up scalar: a nested list contributes only its first resolved
    /// element, or `Null` when it is empty.
    ///
    /// # Errors
    ///
    /// See [`ParameterBinder::bind`].
    pub fn resolve(&self, value: ParamValue) -> Result<BoundValue, QueryError> {
        match value {
            ParamValue::Scalar(scalar) => Ok(BoundValue::Scalar(scalar)),
            ParamValue::List(items) => items
                .into_iter()
                .map(|item| self.resolve(item).map(BoundValue::into_first_scalar))
                .collect::<Result<Vec<_>, _>>()
                .map(BoundValue::List),
            ParamValue::Entity(entity) => self.entity_to_scalar(&entity),
        }
    }

    fn entity_to_scalar(&self, entity: &EntityRef) -> Result<BoundValue, QueryError> {
        let Some(class) = self.metadata.class_metadata(&entity.class) else {
            return Err(QueryError::InvalidArgument(format!(
                "Class {} is not a mapped entity and cannot be bound as a parameter.",
                entity.class
            )));
        };

        if class.is_identifier_composite() {
            return Err(QueryError::InvalidArgument(format!(
                "Binding an entity with a composite primary key ({}) to a query is not supported. \
                 Split the parameter into the explicit fields and bind them separately.",
                class.name
            )));
        }

        let identifier = match self.metadata.entity_state(entity) {
            EntityState::Managed => self
                .metadata
                .managed_identifier(entity)
                .unwrap_or_else(|| class.identifier_values(entity)),
            EntityState::New | EntityState::Detached => class.identifier_values(entity),
        };

        let value = class
            .single_identifier_field_name()
            .and_then(|field| identifier.get(field))
            .filter(|value| !value.is_blank())
            .cloned()
            .ok_or_else(|| {
                QueryError::InvalidArgument(format!(
                    "Binding entities to query parameters only allowed for entities that have an \
                     identifier ({} has none).",
                    class.name
                ))
            })?;

        Ok(BoundValue::Scalar(value))
    }
}
