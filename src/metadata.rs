//! Entity metadata: which values are mapped entities and how to read their identifiers.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};

use crate::types::RowValues;

static NEXT_OID: AtomicU64 = AtomicU64::new(1);

/// Identifier field name to value.
pub type IdentifierValues = BTreeMap<String, RowValues>;

/// An instance of a mapped entity class.
///
/// `oid` is the object identity: clones share it, newly constructed instances never do.
/// It is local to the process, so it is never serialized and a deserialized entity gets a
/// fresh one. Equality compares class and fields only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRef {
    pub class: String,
    pub fields: BTreeMap<String, RowValues>,
    #[serde(skip, default = "next_oid")]
    oid: u64,
}

fn next_oid() -> u64 {
    NEXT_OID.fetch_add(1, Ordering::Relaxed)
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && self.fields == other.fields
    }
}

impl EntityRef {
    #[must_use]
    pub fn new(class: impl Into<String>, fields: BTreeMap<String, RowValues>) -> Self {
        Self {
            class: class.into(),
            fields,
            oid: next_oid(),
        }
    }

    /// Convenience constructor from `(field, value)` pairs.
    #[must_use]
    pub fn with_fields<K, V>(class: impl Into<String>, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<RowValues>,
    {
        Self::new(
            class,
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    #[must_use]
    pub fn oid(&self) -> u64 {
        self.oid
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&RowValues> {
        self.fields.get(field)
    }
}

/// Mapping information for one entity class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMetadata {
    pub name: String,
    /// Identifier field names; more than one means a composite key.
    pub identifier: Vec<String>,
}

impl ClassMetadata {
    #[must_use]
    pub fn new(name: impl Into<String>, identifier: Vec<String>) -> Self {
        Self {
            name: name.into(),
            identifier,
        }
    }

    #[must_use]
    pub fn is_identifier_composite(&self) -> bool {
        self.identifier.len() > 1
    }

    /// The one identifier field of a non-composite class.
    #[must_use]
    pub fn single_identifier_field_name(&self) -> Option<&str> {
        match self.identifier.as_slice() {
            [field] => Some(field),
            _ => None,
        }
    }

    /// Identifier values read from the entity's declared identifier fields.
    #[must_use]
    pub fn identifier_values(&self, entity: &EntityRef) -> IdentifierValues {
        self.identifier
            .iter()
            .filter_map(|field| {
                entity
                    .fields
                    .get(field)
                    .map(|value| (field.clone(), value.clone()))
            })
            .collect()
    }
}

/// Lifecycle state of an entity instance relative to the identity map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Managed,
    New,
    Detached,
}

/// Resolves entity classes and identifiers for parameter binding.
pub trait EntityMetadata: Send + Sync {
    /// Metadata for a class, or `None` when the class is not mapped.
    fn class_metadata(&self, class: &str) -> Option<ClassMetadata>;

    fn entity_state(&self, entity: &EntityRef) -> EntityState;

    /// Identifier as tracked by the identity map, for managed entities.
    fn managed_identifier(&self, entity: &EntityRef) -> Option<IdentifierValues>;
}

/// In-memory metadata registry with a minimal identity map.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    classes: RwLock<HashMap<String, ClassMetadata>>,
    managed: Mutex<HashMap<u64, IdentifierValues>>,
}

impl MetadataRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, class: ClassMetadata) {
        let mut classes = match self.classes.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        classes.insert(class.name.clone(), class);
    }

    /// Start tracking `entity` under the given identifier.
    pub fn manage(&self, entity: &EntityRef, identifier: IdentifierValues) {
        let mut managed = match self.managed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        managed.insert(entity.oid(), identifier);
    }

    pub fn detach(&self, entity: &EntityRef) {
        let mut managed = match self.managed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        managed.remove(&entity.oid());
    }
}

impl EntityMetadata for MetadataRegistry {
    fn class_metadata(&self, class: &str) -> Option<ClassMetadata> {
        let classes = match self.classes.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        classes.get(class).cloned()
    }

    fn entity_state(&self, entity: &EntityRef) -> EntityState {
        let managed = match self.managed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if managed.contains_key(&entity.oid()) {
            EntityState::Managed
        } else {
            EntityState::New
        }
    }

    fn managed_identifier(&self, entity: &EntityRef) -> Option<IdentifierValues> {
        let managed = match self.managed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        managed.get(&entity.oid()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_identity() {
        let a = EntityRef::with_fields("User", [("id", 1)]);
        let b = a.clone();
        let c = EntityRef::with_fields("User", [("id", 1)]);
        assert_eq!(a.oid(), b.oid());
        assert_ne!(a.oid(), c.oid());
    }

    #[test]
    fn registry_tracks_managed_entities() {
        let registry = MetadataRegistry::new();
        registry.register(ClassMetadata::new("User", vec!["id".into()]));
        let user = EntityRef::with_fields("User", [("id", 3)]);

        assert_eq!(registry.entity_state(&user), EntityState::New);
        registry.manage(&user, IdentifierValues::from([("id".into(), RowValues::Int(3))]));
        assert_eq!(registry.entity_state(&user), EntityState::Managed);
        registry.detach(&user);
        assert!(registry.managed_identifier(&user).is_none());
    }

    #[test]
    fn deserialized_entities_get_a_local_identity() {
        let registry = MetadataRegistry::new();
        registry.register(ClassMetadata::new("User", vec!["id".into()]));
        let user = EntityRef::with_fields("User", [("id", 4)]);
        registry.manage(&user, IdentifierValues::from([("id".into(), RowValues::Int(4))]));

        let payload = serde_json::to_value(&user).unwrap();
        assert!(payload.get("oid").is_none());

        let restored: EntityRef = serde_json::from_value(payload).unwrap();
        assert_eq!(restored, user);
        assert_ne!(restored.oid(), user.oid());
        assert_eq!(registry.entity_state(&restored), EntityState::New);
    }

    #[test]
    fn composite_identifier_detection() {
        let class = ClassMetadata::new("Line", vec!["order_id".into(), "line_no".into()]);
        assert!(class.is_identifier_composite());
        assert!(class.single_identifier_field_name().is_none());
    }
}
