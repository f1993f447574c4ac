use std::sync::Arc;
use std::time::Duration;

use sdiff::{
    config::EngineConfig,
    engine::{CatalogEngine, DiffEngine},
    errors::CompareError,
    services::{AppServices, NoCredentials, StaticCredentials},
    types::{CompareState, Credentials, DiffStatus, Endpoint, ObjectType},
    utils::init::get_sample_catalog,
};
use tempfile::TempDir;

use crate::common::{source_spec, target_spec, test_settings};

fn sample_engine(dir: &TempDir) -> CatalogEngine {
    sample_engine_with(dir, EngineConfig::default())
}

fn sample_engine_with(dir: &TempDir, config: EngineConfig) -> CatalogEngine {
    let path = dir.path().join("catalog.json");
    std::fs::write(&path, get_sample_catalog().unwrap()).unwrap();

    let config = EngineConfig {
        catalog_path: path.to_string_lossy().to_string(),
        ..config
    };
    CatalogEngine::from_config(&config).unwrap()
}

#[tokio::test]
async fn test_sample_catalog_end_to_end() {
    let dir = TempDir::new().unwrap();
    let engine: Arc<dyn DiffEngine> = Arc::new(sample_engine(&dir));
    let provider = StaticCredentials::new().with_server(2, Credentials::password("change-me"));
    let services = AppServices::new(&test_settings(), engine, Arc::new(provider));

    let token = services
        .session_service
        .open(&source_spec(), &target_spec())
        .await
        .unwrap();
    let summary = services.compare_service.compare(token).await.unwrap();

    assert_eq!(summary.total, 5);
    assert_eq!(summary.counts.identical, 1);
    assert_eq!(summary.counts.different, 1);
    assert_eq!(summary.counts.source_only, 2);
    assert_eq!(summary.counts.target_only, 1);

    let rows = services.session_service.rows(token).await.unwrap();
    let orders = rows
        .iter()
        .find(|r| r.row.object_type == ObjectType::Table && r.row.label == "orders")
        .unwrap();
    assert_eq!(orders.row.status, DiffStatus::Different);

    services
        .session_service
        .select(token, &[orders.id])
        .await
        .unwrap();
    let draft = services
        .script_service
        .generate_for_selection(token)
        .await
        .unwrap();

    assert!(draft.text.contains("ALTER TABLE sales.orders DROP COLUMN legacy_ref;"));
    assert!(draft.text.contains("BEGIN;"));
    assert!(draft.text.trim_end().ends_with("END;"));

    services.session_service.close(token).await.unwrap();
}

#[tokio::test]
async fn test_sample_catalog_requires_password() {
    let dir = TempDir::new().unwrap();
    let engine: Arc<dyn DiffEngine> = Arc::new(sample_engine(&dir));
    let services = AppServices::new(&test_settings(), engine, Arc::new(NoCredentials));

    let token = services
        .session_service
        .open(&source_spec(), &target_spec())
        .await
        .unwrap();

    assert_eq!(
        services.compare_service.compare(token).await.unwrap_err(),
        CompareError::CredentialChallenge(Endpoint::new(2, 6, 11))
    );
}

#[tokio::test]
async fn test_sample_catalog_reports_progress_per_type() {
    let dir = TempDir::new().unwrap();
    let config = EngineConfig {
        step_delay_ms: 30,
        ..Default::default()
    };
    let engine: Arc<dyn DiffEngine> = Arc::new(sample_engine_with(&dir, config));
    let provider = StaticCredentials::new().with_server(2, Credentials::password("change-me"));
    let services = Arc::new(AppServices::new(&test_settings(), engine, Arc::new(provider)));

    let token = services
        .session_service
        .open(&source_spec(), &target_spec())
        .await
        .unwrap();
    let running = {
        let services = services.clone();
        tokio::spawn(async move { services.compare_service.compare(token).await })
    };

    let seen = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let polled = services.compare_service.poll_progress(token).await.unwrap();
            if polled.state == CompareState::Comparing
                && polled.progress.phase.starts_with("Comparing ")
                && polled.progress.percent < 100
            {
                return polled.progress;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("no intermediate progress was observed");
    assert!(seen.phase.starts_with("Comparing "));

    let summary = running.await.unwrap().unwrap();
    assert_eq!(summary.total, 5);

    let polled = services.compare_service.poll_progress(token).await.unwrap();
    assert_eq!(polled.state, CompareState::Succeeded);
    assert_eq!(polled.progress.percent, 100);
}
