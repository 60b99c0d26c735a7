use super::Query;
use super::execute::no_params;
use crate::error::QueryError;
use crate::hydration::{Hydrated, HydratedValue};
use crate::types::{HydrationMode, RowValues};

/// The one element of a result that must hold at most one row.
#[derive(Debug, Clone, PartialEq)]
pub enum SingleResult {
    Value(HydratedValue),
    Scalar(RowValues),
    Affected(usize),
}

impl SingleResult {
    #[must_use]
    pub fn into_value(self) -> Option<HydratedValue> {
        if let SingleResult::Value(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn into_scalar(self) -> Option<RowValues> {
        match self {
            SingleResult::Scalar(value) | SingleResult::Value(HydratedValue::Scalar(value)) => {
                Some(value)
            }
            SingleResult::Value(_) | SingleResult::Affected(_) => None,
        }
    }
}

fn at_most_one(result: Hydrated) -> Result<Option<SingleResult>, QueryError> {
    match result {
        Hydrated::Rows(mut rows) => {
            if rows.len() > 1 {
                return Err(QueryError::NonUniqueResult);
            }
            Ok(rows.pop().map(SingleResult::Value))
        }
        Hydrated::Scalar(value) => Ok(Some(SingleResult::Scalar(value))),
        Hydrated::Affected(count) => Ok(Some(SingleResult::Affected(count))),
    }
}

impl Query {
    /// Execute with the given hydration mode.
    ///
    /// # Errors
    ///
    /// See [`Query::execute_with`].
    pub async fn get_result(&mut self, mode: HydrationMode) -> Result<Hydrated, QueryError> {
        self.execute_with(no_params(), Some(mode)).await
    }

    /// Execute with array hydration.
    ///
    /// # Errors
    ///
    /// See [`Query::execute_with`].
    pub async fn get_array_result(&mut self) -> Result<Hydrated, QueryError> {
        self.get_result(HydrationMode::Array).await
    }

    /// Execute with scalar hydration.
    ///
    /// # Errors
    ///
    /// See [`Query::execute_with`].
    pub async fn get_scalar_result(&mut self) -> Result<Hydrated, QueryError> {
        self.get_result(HydrationMode::Scalar).await
    }

    /// Zero or one result: `None` for an empty result.
    ///
    /// In single-scalar mode an empty-looking value (`0`, `""`) is a real result and is
    /// returned as such.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::NonUniqueResult` if more than one row was hydrated, plus any
    /// execution error.
    pub async fn get_one_or_null_result(
        &mut self,
        mode: Option<HydrationMode>,
    ) -> Result<Option<SingleResult>, QueryError> {
        let result = self.execute_with(no_params(), mode).await?;

        if self.hydration_mode != HydrationMode::SingleScalar && result.is_blank() {
            return Ok(None);
        }

        at_most_one(result)
    }

    /// Exactly one result.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::NoResult` for an empty result (outside single-scalar mode),
    /// `QueryError::NonUniqueResult` for more than one row, plus any execution error.
    pub async fn get_single_result(
        &mut self,
        mode: Option<HydrationMode>,
    ) -> Result<SingleResult, QueryError> {
        let result = self.execute_with(no_params(), mode).await?;

        if self.hydration_mode != HydrationMode::SingleScalar && result.is_blank() {
            return Err(QueryError::NoResult);
        }

        at_most_one(result)?.ok_or(QueryError::NoResult)
    }

    /// The single scalar value of the query.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::NoResult`/`QueryError::NonUniqueResult` when the statement does
    /// not produce exactly one row with one column, plus any execution error.
    pub async fn get_single_scalar_result(&mut self) -> Result<RowValues, QueryError> {
        match self
            .get_single_result(Some(HydrationMode::SingleScalar))
            .await?
        {
            SingleResult::Affected(count) => Ok(RowValues::Int(
                i64::try_from(count).unwrap_or(i64::MAX),
            )),
            other => other.into_scalar().ok_or(QueryError::NonUniqueResult),
        }
    }
}
