#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use orm_query_cache::hints::Hints;
use orm_query_cache::hydration::ArrayHydrator;
use orm_query_cache::params::Parameters;
use orm_query_cache::prelude::*;

/// Executor that answers each SQL string with a canned result and records every call.
#[derive(Default)]
pub struct ScriptedExecutor {
    responses: Mutex<HashMap<String, StatementResult>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<(String, Parameters)>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, sql: &str, result: StatementResult) {
        self.responses
            .lock()
            .unwrap()
            .insert(sql.to_string(), result);
    }

    pub fn rows(&self, sql: &str, columns: &[&str], rows: Vec<Vec<RowValues>>) {
        let columns = columns.iter().map(|c| (*c).to_string()).collect();
        self.respond(sql, StatementResult::RowSet(ResultSet::from_rows(columns, rows)));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_params(&self) -> Option<Parameters> {
        self.seen.lock().unwrap().last().map(|(_, p)| p.clone())
    }
}

#[async_trait]
impl StatementExecutor for ScriptedExecutor {
    async fn execute_statement(
        &self,
        sql: &str,
        params: &Parameters,
    ) -> Result<StatementResult, QueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((sql.to_string(), params.clone()));
        self.responses
            .lock()
            .unwrap()
            .get(sql)
            .cloned()
            .ok_or_else(|| QueryError::ExecutionError(format!("no scripted response for {sql}")))
    }
}

/// Array hydrator that counts how many row sets it hydrated.
#[derive(Default)]
pub struct CountingHydrator {
    pub invocations: AtomicUsize,
}

impl CountingHydrator {
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

impl Hydrator for CountingHydrator {
    fn hydrate_row(
        &self,
        row: &Row,
        rsm: &ResultSetMapping,
        hints: &Hints,
    ) -> Result<HydratedValue, QueryError> {
        ArrayHydrator.hydrate_row(row, rsm, hints)
    }

    fn hydrate_all(
        &self,
        rows: ResultSet,
        rsm: &ResultSetMapping,
        hints: &Hints,
    ) -> Result<Hydrated, QueryError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        ArrayHydrator.hydrate_all(rows, rsm, hints)
    }
}

pub struct Harness {
    pub executor: Arc<ScriptedExecutor>,
    pub hydrator: Arc<CountingHydrator>,
    pub result_cache: Arc<InMemoryCacheStore>,
    pub hydration_cache: Arc<InMemoryCacheStore>,
    pub metadata: Arc<MetadataRegistry>,
    pub ctx: Arc<QueryContext>,
}

pub fn harness() -> Harness {
    let executor = Arc::new(ScriptedExecutor::new());
    let hydrator = Arc::new(CountingHydrator::default());
    let result_cache = Arc::new(InMemoryCacheStore::new());
    let hydration_cache = Arc::new(InMemoryCacheStore::new());
    let metadata = Arc::new(MetadataRegistry::new());
    metadata.register(ClassMetadata::new("User", vec!["id".into()]));
    metadata.register(ClassMetadata::new(
        "OrderLine",
        vec!["order_id".into(), "line_no".into()],
    ));

    let ctx = QueryContext::builder(executor.clone())
        .config(
            QueryConfig::builder()
                .result_cache(result_cache.clone())
                .hydration_cache(hydration_cache.clone())
                .default_result_cache_lifetime(60)
                .driver("secondary", Arc::new(InMemoryCacheStore::new()))
                .finish(),
        )
        .metadata(metadata.clone())
        .hydrator(HydrationMode::Array, hydrator.clone())
        .build();

    Harness {
        executor,
        hydrator,
        result_cache,
        hydration_cache,
        metadata,
        ctx,
    }
}
