use std::collections::BTreeMap;

/// Describes how result columns map onto entity fields and scalar aliases.
///
/// ```rust
/// use orm_query_cache::prelude::*;
///
/// let rsm = ResultSetMapping::new()
///     .with_root_entity("User")
///     .with_identifier(["id"])
///     .add_field_result("u_id", "id")
///     .add_field_result("u_name", "name")
///     .add_scalar_result("post_count", "posts");
/// assert_eq!(rsm.field_name("u_name"), "name");
/// assert_eq!(rsm.scalar_alias("post_count"), Some("posts"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSetMapping {
    root_entity: Option<String>,
    field_mappings: BTreeMap<String, String>,
    scalar_mappings: BTreeMap<String, String>,
    identifier_fields: Vec<String>,
}

impl ResultSetMapping {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_root_entity(mut self, class: impl Into<String>) -> Self {
        self.root_entity = Some(class.into());
        self
    }

    /// Identifier fields of the root entity, used to collapse rows in object hydration.
    #[must_use]
    pub fn with_identifier<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identifier_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn add_field_result(mut self, column: impl Into<String>, field: impl Into<String>) -> Self {
        self.field_mappings.insert(column.into(), field.into());
        self
    }

    #[must_use]
    pub fn add_scalar_result(mut self, column: impl Into<String>, alias: impl Into<String>) -> Self {
        self.scalar_mappings.insert(column.into(), alias.into());
        self
    }

    #[must_use]
    pub fn root_entity(&self) -> Option<&str> {
        self.root_entity.as_deref()
    }

    #[must_use]
    pub fn identifier_fields(&self) -> &[String] {
        &self.identifier_fields
    }

    /// Field name for a column: the mapped name, or the column itself.
    #[must_use]
    pub fn field_name<'a>(&'a self, column: &'a str) -> &'a str {
        self.field_mappings
            .get(column)
            .map_or(column, String::as_str)
    }

    #[must_use]
    pub fn scalar_alias(&self, column: &str) -> Option<&str> {
        self.scalar_mappings.get(column).map(String::as_str)
    }

    #[must_use]
    pub fn is_scalar(&self, column: &str) -> bool {
        self.scalar_mappings.contains_key(column)
    }
}
