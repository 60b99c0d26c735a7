mod common;

use std::sync::Arc;

use common::{ScriptedExecutor, harness};
use orm_query_cache::cache::CacheKeys;
use orm_query_cache::prelude::*;

const USERS: &str = "SELECT id, name FROM users WHERE active = :active";

fn seed(executor: &ScriptedExecutor) {
    executor.rows(
        USERS,
        &["id", "name"],
        vec![
            vec![RowValues::Int(1), RowValues::Text("alice".into())],
            vec![RowValues::Int(2), RowValues::Text("bob".into())],
        ],
    );
}

#[tokio::test]
async fn second_execution_is_served_from_hydration_cache() -> Result<(), QueryError> {
    let h = harness();
    seed(&h.executor);

    let mut query = h.ctx.create_query(USERS);
    query.set_parameter("active", true, None)?;
    query.set_hydration_mode(HydrationMode::Array);
    query.set_hydration_cache_profile(Some(QueryCacheProfile::default()));

    let first = query.execute().await?;
    let second = query.execute().await?;

    assert_eq!(first, second);
    assert_eq!(first.rows().map(<[HydratedValue]>::len), Some(2));
    assert_eq!(h.hydrator.invocations(), 1);
    assert_eq!(h.executor.calls(), 1);
    assert_eq!(h.hydration_cache.len(), 1);
    Ok(())
}

#[tokio::test]
async fn parameters_and_hints_change_the_cache_entry() -> Result<(), QueryError> {
    let h = harness();
    seed(&h.executor);

    let mut query = h.ctx.create_query(USERS);
    query.set_hydration_mode(HydrationMode::Array);
    query.set_hydration_cache_profile(Some(QueryCacheProfile::default()));

    query.set_parameter("active", true, None)?;
    query.execute().await?;
    query.set_parameter("active", false, None)?;
    query.execute().await?;
    assert_eq!(h.hydrator.invocations(), 2);

    query.set_hint("note", "x");
    query.execute().await?;
    assert_eq!(h.hydrator.invocations(), 3);

    query.set_hint("note", "x");
    query.execute().await?;
    assert_eq!(h.hydrator.invocations(), 3);
    Ok(())
}

#[tokio::test]
async fn hydration_mode_is_part_of_the_key() -> Result<(), QueryError> {
    let h = harness();
    seed(&h.executor);

    let mut query = h.ctx.create_query(USERS);
    query.set_parameter("active", true, None)?;
    query.set_hydration_cache_profile(Some(QueryCacheProfile::default()));

    query.set_hydration_mode(HydrationMode::Array);
    query.execute().await?;
    query.get_scalar_result().await?;

    assert_eq!(h.executor.calls(), 2);
    assert_eq!(query.hydration_mode(), HydrationMode::Scalar);

    query.get_array_result().await?;
    assert_eq!(h.executor.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn explicit_cache_key_shares_one_bucket() -> Result<(), QueryError> {
    let h = harness();
    seed(&h.executor);

    let profile = QueryCacheProfile::default().with_cache_key(Some("users".into()));
    let mut query = h.ctx.create_query(USERS);
    query.set_hydration_mode(HydrationMode::Array);
    query.set_hydration_cache_profile(Some(profile.clone()));

    query.set_parameter("active", true, None)?;
    query.execute().await?;
    query.set_parameter("active", false, None)?;
    query.execute().await?;

    assert_eq!(h.hydration_cache.len(), 1);
    let bucket = h.hydration_cache.fetch("users").await?;
    let entries = bucket.as_ref().and_then(|b| b.as_object()).map(|b| b.len());
    assert_eq!(entries, Some(2));

    let keys: CacheKeys = profile.generate_cache_keys(
        USERS,
        query.get_parameters(),
        &query.hints().with_hydration_mode(HydrationMode::Array),
    )?;
    assert_eq!(keys.physical, "users");
    assert!(bucket.is_some_and(|b| b.get(&keys.logical).is_some()));
    Ok(())
}

#[tokio::test]
async fn profile_store_overrides_configured_store() -> Result<(), QueryError> {
    let h = harness();
    seed(&h.executor);
    let own = Arc::new(InMemoryCacheStore::new());

    let mut query = h.ctx.create_query(USERS);
    query.set_parameter("active", true, None)?;
    query.set_hydration_cache_profile(Some(
        QueryCacheProfile::default().with_result_cache_driver(Some(own.clone() as Arc<dyn CacheStore>)),
    ));
    query.get_array_result().await?;

    assert_eq!(own.len(), 1);
    assert!(h.hydration_cache.is_empty());
    Ok(())
}

#[test]
fn missing_store_is_a_configuration_error() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let executor = Arc::new(ScriptedExecutor::new());
        seed(&executor);
        let ctx = QueryContext::builder(executor.clone()).build();

        let mut query = ctx.create_query(USERS);
        query.set_parameter("active", true, None)?;
        query.set_hydration_cache_profile(Some(QueryCacheProfile::default()));

        let err = query.execute().await.unwrap_err();
        assert!(matches!(err, QueryError::InvalidConfiguration(_)));
        assert_eq!(executor.calls(), 0);
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[tokio::test]
async fn bulk_statements_cache_the_affected_count() -> Result<(), QueryError> {
    let h = harness();
    let sql = "UPDATE users SET active = 0";
    h.executor.respond(sql, StatementResult::ScalarCount(3));

    let mut query = h.ctx.create_query(sql);
    query.set_hydration_cache_profile(Some(QueryCacheProfile::default()));

    assert_eq!(query.execute().await?, Hydrated::Affected(3));
    assert_eq!(query.execute().await?, Hydrated::Affected(3));
    assert_eq!(h.executor.calls(), 1);
    assert_eq!(h.hydrator.invocations(), 0);
    Ok(())
}

#[tokio::test]
async fn clearing_the_profile_disables_caching() -> Result<(), QueryError> {
    let h = harness();
    seed(&h.executor);

    let mut query = h.ctx.create_query(USERS);
    query.set_parameter("active", true, None)?;
    query.set_hydration_mode(HydrationMode::Array);
    query.set_hydration_cache_profile(Some(QueryCacheProfile::default()));
    query.execute().await?;

    query.set_hydration_cache_profile(None);
    assert!(query.hydration_cache_profile().is_none());
    query.execute().await?;
    query.execute().await?;

    assert_eq!(h.hydrator.invocations(), 3);
    assert_eq!(h.hydration_cache.stats().fetches, 1);
    Ok(())
}
