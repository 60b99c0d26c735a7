mod common;

use common::harness;
use orm_query_cache::params::BoundValue;
use orm_query_cache::prelude::*;

#[test]
fn named_keys_lose_their_colon_and_types_are_inferred() -> Result<(), QueryError> {
    let h = harness();
    let mut query = h.ctx.create_query("SELECT * FROM users WHERE name = :name AND id = ?0");

    query.set_parameter(":name", "alice", None)?;
    query.set_parameter(0usize, 7, None)?;
    query.set_parameter("ids", ParamValue::list([1, 2, 3]), None)?;

    assert_eq!(
        query.get_parameter("name"),
        Some(&BoundValue::Scalar(RowValues::Text("alice".into())))
    );
    assert_eq!(query.get_parameter_type("name"), Some(ParamType::String));
    assert_eq!(query.get_parameter_type(0usize), Some(ParamType::Integer));
    assert_eq!(query.get_parameter_type("ids"), Some(ParamType::IntArray));
    assert_eq!(query.get_parameters().len(), 3);
    Ok(())
}

#[test]
fn rebinding_replaces_and_explicit_type_wins() -> Result<(), QueryError> {
    let h = harness();
    let mut query = h.ctx.create_query("SELECT 1");

    query.set_parameter("flag", 1, None)?;
    query.set_parameter("flag", true, Some(ParamType::Integer))?;

    assert_eq!(query.get_parameters().len(), 1);
    assert_eq!(
        query.get_parameter("flag"),
        Some(&BoundValue::Scalar(RowValues::Bool(true)))
    );
    assert_eq!(query.get_parameter_type("flag"), Some(ParamType::Integer));
    Ok(())
}

#[test]
fn set_parameters_uses_supplied_types() -> Result<(), QueryError> {
    let h = harness();
    let mut query = h.ctx.create_query("SELECT 1");

    query.set_parameters(
        [("a", RowValues::Int(1)), ("b", RowValues::Text("x".into()))],
        &[(ParameterKey::from("b"), ParamType::Json)],
    )?;

    let types = query.get_parameter_types();
    assert_eq!(
        types,
        vec![
            (ParameterKey::from("a"), ParamType::Integer),
            (ParameterKey::from("b"), ParamType::Json),
        ]
    );
    Ok(())
}

#[test]
fn entities_bind_as_their_identifier() -> Result<(), QueryError> {
    let h = harness();
    let mut query = h.ctx.create_query("SELECT * FROM posts WHERE author_id = :author");

    let user = EntityRef::with_fields("User", [("id", RowValues::Int(42))]);
    query.set_parameter("author", user, None)?;
    assert_eq!(
        query.get_parameter("author"),
        Some(&BoundValue::Scalar(RowValues::Int(42)))
    );
    assert_eq!(query.get_parameter_type("author"), Some(ParamType::Integer));

    let others = vec![
        EntityRef::with_fields("User", [("id", RowValues::Int(1))]),
        EntityRef::with_fields("User", [("id", RowValues::Int(2))]),
    ];
    query.set_parameter("authors", ParamValue::list(others), None)?;
    assert_eq!(
        query.get_parameter("authors"),
        Some(&BoundValue::List(vec![
            BoundValue::Scalar(RowValues::Int(1)),
            BoundValue::Scalar(RowValues::Int(2)),
        ]))
    );
    Ok(())
}

#[test]
fn managed_entities_use_the_tracked_identifier() -> Result<(), QueryError> {
    let h = harness();
    let user = EntityRef::with_fields("User", [("id", RowValues::Int(1))]);
    h.metadata
        .manage(&user, [("id".to_string(), RowValues::Int(99))].into_iter().collect());

    let mut query = h.ctx.create_query("SELECT 1");
    query.set_parameter("u", user.clone(), None)?;
    assert_eq!(
        query.get_parameter("u"),
        Some(&BoundValue::Scalar(RowValues::Int(99)))
    );

    h.metadata.detach(&user);
    query.set_parameter("u", user, None)?;
    assert_eq!(
        query.get_parameter("u"),
        Some(&BoundValue::Scalar(RowValues::Int(1)))
    );
    Ok(())
}

#[test]
fn invalid_entities_are_rejected() {
    let h = harness();
    let mut query = h.ctx.create_query("SELECT 1");

    let line = EntityRef::with_fields(
        "OrderLine",
        [("order_id", RowValues::Int(1)), ("line_no", RowValues::Int(2))],
    );
    assert!(matches!(
        query.set_parameter("line", line, None),
        Err(QueryError::InvalidArgument(_))
    ));

    let unsaved = EntityRef::with_fields("User", [("name", RowValues::Text("x".into()))]);
    assert!(matches!(
        query.set_parameter("user", unsaved, None),
        Err(QueryError::InvalidArgument(_))
    ));

    let nested = ParamValue::list([ParamValue::list([EntityRef::with_fields(
        "User",
        [("id", RowValues::Null)],
    )])]);
    assert!(matches!(
        query.set_parameter("nested", nested, None),
        Err(QueryError::InvalidArgument(_))
    ));

    assert!(query.get_parameters().is_empty());
}

#[test]
fn free_and_duplicate_clear_bound_state() -> Result<(), QueryError> {
    let h = harness();
    let mut query = h.ctx.create_query("SELECT * FROM users WHERE id = :id");
    query.set_parameter("id", 1, None)?;
    query.set_hint("custom", "value");
    query.set_hydration_mode(HydrationMode::Scalar);
    query.use_result_cache(true, Some(30), Some("users".into()));

    let copy = query.duplicate();
    assert!(copy.get_parameters().is_empty());
    assert!(copy.hints().is_empty());
    assert_eq!(copy.sql(), query.sql());
    assert_eq!(copy.hydration_mode(), HydrationMode::Scalar);
    assert_eq!(copy.result_cache_id(), Some("users"));
    assert_eq!(query.get_parameters().len(), 1);

    query.free();
    assert!(query.get_parameters().is_empty());
    assert!(query.get_hint("custom").is_none());
    Ok(())
}

#[test]
fn fetch_mode_hints_normalize_to_lazy_or_eager() {
    let h = harness();
    let mut query = h.ctx.create_query("SELECT 1");
    query.set_fetch_mode("User", "posts", FetchMode::ExtraLazy);
    query.set_fetch_mode("User", "profile", FetchMode::Eager);

    assert_eq!(query.hints().fetch_mode("User", "posts"), Some(FetchMode::Lazy));
    assert_eq!(
        query.hints().fetch_mode("User", "profile"),
        Some(FetchMode::Eager)
    );
}
