use std::sync::Arc;

use sdiff::{
    errors::CompareError,
    types::{DiffStatus, EndpointSpec, ObjectType, RowId},
};

use crate::common::{FakeEngine, mixed_rows, services, source_spec, target_spec};

#[tokio::test]
async fn test_open_rejects_incomplete_endpoints() {
    let services = services(Arc::new(FakeEngine::new(vec![])));

    let partial = EndpointSpec {
        server_id: Some(1),
        database_id: None,
        schema_id: Some(10),
    };
    let err = services
        .session_service
        .open(&partial, &target_spec())
        .await
        .unwrap_err();

    assert!(matches!(err, CompareError::Validation(msg) if msg.contains("database")));
    assert_eq!(services.session_service.sessions().await, 0);
}

#[tokio::test]
async fn test_filter_hides_rows_but_counts_all() {
    let services = services(Arc::new(FakeEngine::new(mixed_rows())));
    let token = services
        .session_service
        .open(&source_spec(), &target_spec())
        .await
        .unwrap();
    services.compare_service.compare(token).await.unwrap();

    // Identical rows are hidden right after a comparison
    assert_eq!(services.session_service.visible_rows(token).await.unwrap().len(), 3);

    services
        .session_service
        .apply_filter(token, [DiffStatus::SourceOnly])
        .await
        .unwrap();

    let visible = services.session_service.visible_rows(token).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].row.label, "open_orders");

    let counts = services.session_service.status_counts(token).await.unwrap();
    assert_eq!(counts.total(), 4);
    assert_eq!(counts.identical, 1);
    assert_eq!(services.session_service.rows(token).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_groups_cover_every_row() {
    let services = services(Arc::new(FakeEngine::new(mixed_rows())));
    let token = services
        .session_service
        .open(&source_spec(), &target_spec())
        .await
        .unwrap();
    services.compare_service.compare(token).await.unwrap();

    let groups = services.session_service.group_by_type(token).await.unwrap();
    let types: Vec<ObjectType> = groups.iter().map(|g| g.object_type).collect();
    assert_eq!(
        types,
        vec![ObjectType::Table, ObjectType::View, ObjectType::Function, ObjectType::Sequence]
    );

    let total: usize = groups.iter().map(|g| g.counts.total()).sum();
    assert_eq!(total, 4);

    let sequence = groups
        .iter()
        .find(|g| g.object_type == ObjectType::Sequence)
        .unwrap();
    assert_eq!(sequence.rows.len(), 1);
    assert!(sequence.visible_rows.is_empty());
}

#[tokio::test]
async fn test_selection_is_idempotent_and_ordered() {
    let services = services(Arc::new(FakeEngine::new(mixed_rows())));
    let token = services
        .session_service
        .open(&source_spec(), &target_spec())
        .await
        .unwrap();
    services.compare_service.compare(token).await.unwrap();

    let ids: Vec<RowId> = services
        .session_service
        .rows(token)
        .await
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();

    assert_eq!(services.session_service.select(token, &[ids[2], ids[0]]).await.unwrap(), 2);
    assert_eq!(services.session_service.select(token, &[ids[0]]).await.unwrap(), 0);
    // Unknown ids are ignored
    assert_eq!(services.session_service.select(token, &[RowId(999)]).await.unwrap(), 0);

    let selected: Vec<RowId> = services
        .session_service
        .selection(token)
        .await
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(selected, vec![ids[2], ids[0]]);

    assert_eq!(services.session_service.deselect(token, &[ids[2]]).await.unwrap(), 1);
    assert_eq!(services.session_service.select_visible(token).await.unwrap(), 2);

    let selected: Vec<RowId> = services
        .session_service
        .selection(token)
        .await
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(selected, vec![ids[0], ids[1], ids[3]]);

    services.session_service.clear_selection(token).await.unwrap();
    assert!(services.session_service.selection(token).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_close_releases_session() {
    let engine = Arc::new(FakeEngine::new(mixed_rows()));
    let services = services(engine.clone());
    let token = services
        .session_service
        .open(&source_spec(), &target_spec())
        .await
        .unwrap();
    assert_eq!(services.session_service.sessions().await, 1);

    services.session_service.close(token).await.unwrap();

    assert_eq!(services.session_service.sessions().await, 0);
    assert_eq!(*engine.released.lock().unwrap(), vec![token]);
    assert_eq!(
        services.session_service.rows(token).await.unwrap_err(),
        CompareError::SessionNotFound(token)
    );
    assert_eq!(
        services.session_service.close(token).await.unwrap_err(),
        CompareError::SessionNotFound(token)
    );
}
