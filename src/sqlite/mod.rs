// SQLite backend for statement execution.
//
// - params: conversion from row values to SQLite values
// - query: result extraction and building
// - executor: the StatementExecutor over a rusqlite connection

pub mod executor;
pub mod params;
pub mod query;

pub use executor::SqliteExecutor;
pub use query::build_result_set;
