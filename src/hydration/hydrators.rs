use std::collections::{BTreeMap, HashSet};

use super::{Hydrated, HydratedValue, Hydrator, ResultSetMapping};
use crate::error::QueryError;
use crate::hints::Hints;
use crate::metadata::EntityRef;
use crate::results::{ResultSet, Row};
use crate::types::RowValues;

fn root_entity(rsm: &ResultSetMapping) -> Result<&str, QueryError> {
    rsm.root_entity().ok_or_else(|| {
        QueryError::HydrationError(
            "object hydration requires a result set mapping with a root entity".to_string(),
        )
    })
}

fn entity_from_row(row: &Row, rsm: &ResultSetMapping) -> Result<EntityRef, QueryError> {
    let class = root_entity(rsm)?;
    let fields = row
        .iter()
        .filter(|(column, _)| !rsm.is_scalar(column))
        .map(|(column, value)| (rsm.field_name(column).to_string(), value.clone()))
        .collect();
    Ok(EntityRef::new(class, fields))
}

/// Entities of the root class. Rows repeating an identifier already seen map onto the first
/// entity hydrated for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectHydrator;

impl Hydrator for ObjectHydrator {
    fn hydrate_row(
        &self,
        row: &Row,
        rsm: &ResultSetMapping,
        _hints: &Hints,
    ) -> Result<HydratedValue, QueryError> {
        entity_from_row(row, rsm).map(HydratedValue::Entity)
    }

    fn hydrate_all(
        &self,
        rows: ResultSet,
        rsm: &ResultSetMapping,
        hints: &Hints,
    ) -> Result<Hydrated, QueryError> {
        let identifier = rsm.identifier_fields();
        let mut seen: HashSet<String> = HashSet::new();
        let mut out = Vec::with_capacity(rows.len());

        for row in &rows.results {
            let HydratedValue::Entity(entity) = self.hydrate_row(row, rsm, hints)? else {
                continue;
            };
            if !identifier.is_empty() {
                let id_values: Vec<Option<&RowValues>> =
                    identifier.iter().map(|field| entity.get(field)).collect();
                let identity = serde_json::to_string(&id_values)?;
                if !seen.insert(identity) {
                    continue;
                }
            }
            out.push(HydratedValue::Entity(entity));
        }

        Ok(Hydrated::Rows(out))
    }
}

/// One entity per row.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleObjectHydrator;

impl Hydrator for SimpleObjectHydrator {
    fn hydrate_row(
        &self,
        row: &Row,
        rsm: &ResultSetMapping,
        _hints: &Hints,
    ) -> Result<HydratedValue, QueryError> {
        entity_from_row(row, rsm).map(HydratedValue::Entity)
    }
}

/// Records keyed by mapped field name (scalar columns by their alias).
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayHydrator;

impl Hydrator for ArrayHydrator {
    fn hydrate_row(
        &self,
        row: &Row,
        rsm: &ResultSetMapping,
        _hints: &Hints,
    ) -> Result<HydratedValue, QueryError> {
        let record: BTreeMap<String, RowValues> = row
            .iter()
            .map(|(column, value)| {
                let key = rsm
                    .scalar_alias(column)
                    .unwrap_or_else(|| rsm.field_name(column));
                (key.to_string(), value.clone())
            })
            .collect();
        Ok(HydratedValue::Record(record))
    }
}

/// Flat records keyed by scalar alias, or by raw column name when no alias is mapped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarHydrator;

impl Hydrator for ScalarHydrator {
    fn hydrate_row(
        &self,
        row: &Row,
        rsm: &ResultSetMapping,
        _hints: &Hints,
    ) -> Result<HydratedValue, QueryError> {
        let record: BTreeMap<String, RowValues> = row
            .iter()
            .map(|(column, value)| {
                let key = rsm.scalar_alias(column).unwrap_or(column);
                (key.to_string(), value.clone())
            })
            .collect();
        Ok(HydratedValue::Record(record))
    }
}

/// Exactly one value: one row with one column.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleScalarHydrator;

impl Hydrator for SingleScalarHydrator {
    fn hydrate_row(
        &self,
        row: &Row,
        _rsm: &ResultSetMapping,
        _hints: &Hints,
    ) -> Result<HydratedValue, QueryError> {
        match row.values.as_slice() {
            [value] => Ok(HydratedValue::Scalar(value.clone())),
            [] => Err(QueryError::NoResult),
            _ => Err(QueryError::NonUniqueResult),
        }
    }

    fn hydrate_all(
        &self,
        rows: ResultSet,
        rsm: &ResultSetMapping,
        hints: &Hints,
    ) -> Result<Hydrated, QueryError> {
        match rows.results.as_slice() {
            [] => Err(QueryError::NoResult),
            [row] => match self.hydrate_row(row, rsm, hints)? {
                HydratedValue::Scalar(value) => Ok(Hydrated::Scalar(value)),
                other => Ok(Hydrated::Rows(vec![other])),
            },
            _ => Err(QueryError::NonUniqueResult),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> ResultSet {
        ResultSet::from_rows(
            vec!["u_id".into(), "u_name".into(), "cnt".into()],
            vec![
                vec![RowValues::Int(1), RowValues::Text("ann".into()), RowValues::Int(3)],
                vec![RowValues::Int(1), RowValues::Text("ann".into()), RowValues::Int(4)],
                vec![RowValues::Int(2), RowValues::Text("bob".into()), RowValues::Int(0)],
            ],
        )
    }

    fn mapping() -> ResultSetMapping {
        ResultSetMapping::new()
            .with_root_entity("User")
            .with_identifier(["id"])
            .add_field_result("u_id", "id")
            .add_field_result("u_name", "name")
            .add_scalar_result("cnt", "posts")
    }

    #[test]
    fn object_hydration_collapses_by_identifier() {
        let out = ObjectHydrator
            .hydrate_all(users(), &mapping(), &Hints::new())
            .unwrap();
        let rows = out.rows().unwrap();
        assert_eq!(rows.len(), 2);
        let first = rows[0].as_entity().unwrap();
        assert_eq!(first.class, "User");
        assert_eq!(first.get("name"), Some(&RowValues::Text("ann".into())));
        assert!(first.get("posts").is_none());
    }

    #[test]
    fn simple_object_hydration_is_one_per_row() {
        let out = SimpleObjectHydrator
            .hydrate_all(users(), &mapping(), &Hints::new())
            .unwrap();
        assert_eq!(out.rows().unwrap().len(), 3);
    }

    #[test]
    fn object_hydration_needs_root_entity() {
        let err = ObjectHydrator
            .hydrate_all(users(), &ResultSetMapping::new(), &Hints::new())
            .unwrap_err();
        assert!(matches!(err, QueryError::HydrationError(_)));
    }

    #[test]
    fn array_and_scalar_keys() {
        let rs = users();
        let array = ArrayHydrator
            .hydrate_row(&rs.results[0], &mapping(), &Hints::new())
            .unwrap();
        let record = array.as_record().unwrap();
        assert!(record.contains_key("id"));
        assert!(record.contains_key("posts"));

        let scalar = ScalarHydrator
            .hydrate_row(&rs.results[0], &mapping(), &Hints::new())
            .unwrap();
        let record = scalar.as_record().unwrap();
        assert!(record.contains_key("u_id"));
        assert!(record.contains_key("posts"));
    }

    #[test]
    fn single_scalar_cardinality() {
        let one = ResultSet::from_rows(vec!["n".into()], vec![vec![RowValues::Int(0)]]);
        assert_eq!(
            SingleScalarHydrator
                .hydrate_all(one, &ResultSetMapping::new(), &Hints::new())
                .unwrap(),
            Hydrated::Scalar(RowValues::Int(0))
        );

        let none = ResultSet::new(vec!["n".into()]);
        assert!(matches!(
            SingleScalarHydrator.hydrate_all(none, &ResultSetMapping::new(), &Hints::new()),
            Err(QueryError::NoResult)
        ));

        let wide = ResultSet::from_rows(
            vec!["a".into(), "b".into()],
            vec![vec![RowValues::Int(1), RowValues::Int(2)]],
        );
        assert!(matches!(
            SingleScalarHydrator.hydrate_all(wide, &ResultSetMapping::new(), &Hints::new()),
            Err(QueryError::NonUniqueResult)
        ));
    }
}
