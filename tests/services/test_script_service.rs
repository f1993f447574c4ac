use std::sync::Arc;
use std::time::Duration;

use sdiff::{
    errors::CompareError,
    services::{AppServices, CredentialProvider, NoCredentials, StaticCredentials},
    types::{CompareState, Credentials, DiffRow, DiffStatus, Endpoint, ObjectType, RowId, SessionToken},
};

use crate::common::{FakeEngine, mixed_rows, services_with, source_spec, target_spec};

async fn compared(engine: Arc<FakeEngine>) -> (AppServices, SessionToken, Vec<RowId>) {
    compared_with(engine, Arc::new(NoCredentials)).await
}

async fn compared_with(
    engine: Arc<FakeEngine>,
    credentials: Arc<dyn CredentialProvider>,
) -> (AppServices, SessionToken, Vec<RowId>) {
    let services = services_with(engine, credentials);
    let token = services
        .session_service
        .open(&source_spec(), &target_spec())
        .await
        .unwrap();
    services.compare_service.compare(token).await.unwrap();
    let ids = services
        .session_service
        .rows(token)
        .await
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    (services, token, ids)
}

#[tokio::test]
async fn test_script_for_single_table() {
    let engine = Arc::new(
        FakeEngine::new(vec![DiffRow::new(
            ObjectType::Table,
            "orders",
            Some(100),
            Some(200),
            DiffStatus::Different,
        )])
        .with_delta(100, "ALTER TABLE sales.orders ADD COLUMN note text;"),
    );
    let (services, token, ids) = compared(engine).await;

    services.session_service.select(token, &ids).await.unwrap();
    let draft = services
        .script_service
        .generate_for_selection(token)
        .await
        .unwrap();

    assert!(draft.header.contains("-- Source: 1/5/10"));
    assert!(draft.header.contains("-- Target: 2/6/11"));
    assert_eq!(draft.fragments.len(), 1);
    assert_eq!(draft.fragments[0].label, "orders");
    assert!(draft.text.starts_with(&draft.header));
    assert!(
        draft
            .text
            .ends_with("BEGIN;\nALTER TABLE sales.orders ADD COLUMN note text;\nEND;\n")
    );
}

#[tokio::test]
async fn test_script_keeps_selection_order() {
    let engine = Arc::new(
        FakeEngine::new(mixed_rows())
            .with_delta(100, "ALTER TABLE sales.orders DROP COLUMN legacy_ref;")
            .with_delta(101, "CREATE VIEW sales.open_orders AS SELECT 1;")
            .with_delta(205, "DROP FUNCTION sales.legacy_total;")
            // The first selected row finishes last
            .with_delta_delay(205, Duration::from_millis(80)),
    );
    let (services, token, ids) = compared(engine).await;

    services
        .session_service
        .select(token, &[ids[3], ids[0], ids[1]])
        .await
        .unwrap();
    let draft = services
        .script_service
        .generate_for_selection(token)
        .await
        .unwrap();

    let order: Vec<RowId> = draft.fragments.iter().map(|f| f.row_id).collect();
    assert_eq!(order, vec![ids[3], ids[0], ids[1]]);

    let drop_fn = draft.text.find("DROP FUNCTION").unwrap();
    let alter = draft.text.find("ALTER TABLE").unwrap();
    let view = draft.text.find("CREATE VIEW").unwrap();
    assert!(drop_fn < alter && alter < view);
}

#[tokio::test]
async fn test_rows_without_changes_are_skipped() {
    let engine = Arc::new(
        FakeEngine::new(mixed_rows()).with_delta(100, "ALTER TABLE sales.orders DROP COLUMN legacy_ref;"),
    );
    let (services, token, ids) = compared(engine).await;

    // The identical sequence has an empty delta
    services
        .session_service
        .select(token, &[ids[2], ids[0]])
        .await
        .unwrap();
    let draft = services
        .script_service
        .generate_for_selection(token)
        .await
        .unwrap();

    assert_eq!(draft.fragments.len(), 1);
    assert_eq!(draft.fragments[0].row_id, ids[0]);
}

#[tokio::test]
async fn test_generate_without_selection() {
    let (services, token, _) = compared(Arc::new(FakeEngine::new(mixed_rows()))).await;

    assert_eq!(
        services
            .script_service
            .generate_for_selection(token)
            .await
            .unwrap_err(),
        CompareError::EmptySelection
    );
    assert_eq!(
        services
            .script_service
            .generate_for_inspection(token)
            .await
            .unwrap_err(),
        CompareError::EmptySelection
    );
}

#[tokio::test]
async fn test_latest_inspect_wins() {
    let engine = Arc::new(
        FakeEngine::new(mixed_rows())
            .with_delta(100, "ALTER TABLE sales.orders DROP COLUMN legacy_ref;")
            .with_delta(101, "CREATE VIEW sales.open_orders AS SELECT 1;")
            .with_delta_delay(100, Duration::from_millis(100)),
    );
    let (services, token, ids) = compared(engine).await;
    let services = Arc::new(services);

    let slow = {
        let services = services.clone();
        let id = ids[0];
        tokio::spawn(async move { services.script_service.inspect(token, id).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let fast = services.script_service.inspect(token, ids[1]).await.unwrap();
    assert_eq!(fast.diff_ddl, "CREATE VIEW sales.open_orders AS SELECT 1;");

    assert_eq!(slow.await.unwrap().unwrap_err(), CompareError::Superseded);

    let current = services
        .script_service
        .current_delta(token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.row_id, ids[1]);

    let draft = services
        .script_service
        .generate_for_inspection(token)
        .await
        .unwrap();
    assert_eq!(draft.fragments.len(), 1);
    assert_eq!(draft.fragments[0].row_id, ids[1]);
}

#[tokio::test]
async fn test_inspect_unknown_row() {
    let (services, token, _) = compared(Arc::new(FakeEngine::new(mixed_rows()))).await;

    let err = services
        .script_service
        .inspect(token, RowId(42))
        .await
        .unwrap_err();
    assert!(matches!(err, CompareError::Validation(_)));
}

#[tokio::test]
async fn test_compare_clears_inspection_and_old_ids() {
    let engine = Arc::new(
        FakeEngine::new(mixed_rows()).with_delta(100, "ALTER TABLE sales.orders DROP COLUMN legacy_ref;"),
    );
    let (services, token, ids) = compared(engine).await;

    services.script_service.inspect(token, ids[0]).await.unwrap();
    services.session_service.select(token, &ids).await.unwrap();

    services.compare_service.compare(token).await.unwrap();

    assert!(services.script_service.current_delta(token).await.unwrap().is_none());
    assert!(services.session_service.selection(token).await.unwrap().is_empty());
    // Ids from the previous comparison no longer resolve
    assert!(matches!(
        services.script_service.inspect(token, ids[0]).await.unwrap_err(),
        CompareError::Validation(_)
    ));
}

#[tokio::test]
async fn test_generation_does_not_touch_session_state() {
    let engine = Arc::new(
        FakeEngine::new(mixed_rows()).with_delta(100, "ALTER TABLE sales.orders DROP COLUMN legacy_ref;"),
    );
    let (services, token, ids) = compared(engine.clone()).await;
    services.session_service.select(token, &[ids[0]]).await.unwrap();

    let first = services
        .script_service
        .generate_for_selection(token)
        .await
        .unwrap();
    let second = services
        .script_service
        .generate_for_selection(token)
        .await
        .unwrap();

    assert_eq!(first, second);
    // Each generation fetches its deltas again
    assert_eq!(engine.delta_calls.lock().unwrap().len(), 2);
    assert_eq!(services.session_service.selection(token).await.unwrap().len(), 1);
    assert!(services.script_service.current_delta(token).await.unwrap().is_none());
}

#[tokio::test]
async fn test_inspect_reconnects_and_replays_once() {
    let source = Endpoint::new(1, 5, 10);
    let engine = Arc::new(
        FakeEngine::new(mixed_rows())
            .with_password(source.clone(), "pw")
            .with_delta(100, "ALTER TABLE sales.orders DROP COLUMN legacy_ref;"),
    );
    let credentials = Arc::new(StaticCredentials::new().with_server(1, Credentials::password("pw")));
    let (services, token, ids) = compared_with(engine.clone(), credentials).await;

    // The comparison already connected the source once
    engine.invalidate(&source);
    let delta = services.script_service.inspect(token, ids[0]).await.unwrap();
    assert_eq!(delta.diff_ddl, "ALTER TABLE sales.orders DROP COLUMN legacy_ref;");

    let calls = engine.delta_calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], calls[1]);

    let connects = engine.connect_calls.lock().unwrap().clone();
    assert_eq!(connects.iter().filter(|e| **e == source).count(), 2);

    let current = services
        .script_service
        .current_delta(token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.row_id, ids[0]);
}

#[tokio::test]
async fn test_inspect_rejected_after_reconnect() {
    let target = Endpoint::new(2, 6, 11);
    let engine = Arc::new(
        FakeEngine::new(mixed_rows())
            .with_delta_challenge(target.clone())
            .with_delta(100, "ALTER TABLE sales.orders DROP COLUMN legacy_ref;"),
    );
    let credentials = Arc::new(StaticCredentials::new().with_server(2, Credentials::password("pw")));
    let (services, token, ids) = compared_with(engine.clone(), credentials).await;

    let err = services
        .script_service
        .inspect(token, ids[0])
        .await
        .unwrap_err();
    assert!(matches!(err, CompareError::Authentication { endpoint, .. } if endpoint == target));

    assert_eq!(engine.delta_calls.lock().unwrap().len(), 2);
    assert!(services.script_service.current_delta(token).await.unwrap().is_none());
}

#[tokio::test]
async fn test_challenge_during_generation_keeps_selection() {
    let target = Endpoint::new(2, 6, 11);
    let engine = Arc::new(
        FakeEngine::new(mixed_rows())
            .with_delta_challenge(target.clone())
            .with_delta(100, "ALTER TABLE sales.orders DROP COLUMN legacy_ref;")
            .with_delta(101, "CREATE VIEW sales.open_orders AS SELECT 1;")
            .with_delta(205, "DROP FUNCTION sales.legacy_total;"),
    );
    let (services, token, ids) = compared(engine).await;

    let picked = [ids[1], ids[0], ids[3]];
    services.session_service.select(token, &picked).await.unwrap();

    let err = services
        .script_service
        .generate_for_selection(token)
        .await
        .unwrap_err();
    assert_eq!(err, CompareError::CredentialChallenge(target));

    let selection: Vec<RowId> = services
        .session_service
        .selection(token)
        .await
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(selection, picked);
    assert_eq!(
        services.compare_service.state(token).await.unwrap(),
        CompareState::Succeeded
    );
}
