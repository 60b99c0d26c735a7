use crate::params::BoundValue;
use crate::types::{ParamType, RowValues};

/// Picks a [`ParamType`] for a resolved parameter value when the caller did not give one.
pub trait TypeInferer: Send + Sync {
    fn infer_type(&self, value: &BoundValue) -> ParamType;
}

/// Infers from the runtime shape of the value.
///
/// Lists are typed by their first element: integer lists become `IntArray`, anything else
/// (including empty lists) `StrArray`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTypeInferer;

impl TypeInferer for DefaultTypeInferer {
    fn infer_type(&self, value: &BoundValue) -> ParamType {
        match value {
            BoundValue::Scalar(scalar) => match scalar {
                RowValues::Int(_) => ParamType::Integer,
                RowValues::Float(_) => ParamType::Float,
                RowValues::Bool(_) => ParamType::Boolean,
                RowValues::Timestamp(_) => ParamType::DateTime,
                RowValues::JSON(_) => ParamType::Json,
                RowValues::Blob(_) => ParamType::Binary,
                RowValues::Text(_) | RowValues::Null => ParamType::String,
            },
            BoundValue::List(items) => match items.first() {
                Some(BoundValue::Scalar(RowValues::Int(_))) => ParamType::IntArray,
                _ => ParamType::StrArray,
            },
        }
    }
}
