pub mod engine;

pub use engine::FakeEngine;

use std::sync::Arc;

use sdiff::{
    config::Settings,
    engine::DiffEngine,
    services::{AppServices, CredentialProvider, NoCredentials},
    types::{DiffRow, DiffStatus, EndpointSpec, ObjectType},
};

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.compare.poll_interval_ms = 5;
    settings
}

pub fn source_spec() -> EndpointSpec {
    EndpointSpec::new(1, 5, 10)
}

pub fn target_spec() -> EndpointSpec {
    EndpointSpec::new(2, 6, 11)
}

pub fn services_with(engine: Arc<FakeEngine>, credentials: Arc<dyn CredentialProvider>) -> AppServices {
    let engine: Arc<dyn DiffEngine> = engine;
    AppServices::new(&test_settings(), engine, credentials)
}

pub fn services(engine: Arc<FakeEngine>) -> AppServices {
    services_with(engine, Arc::new(NoCredentials))
}

/// One row per status: a table, a view, a sequence and a function.
pub fn mixed_rows() -> Vec<DiffRow> {
    vec![
        DiffRow::new(ObjectType::Table, "orders", Some(100), Some(200), DiffStatus::Different),
        DiffRow::new(ObjectType::View, "open_orders", Some(101), None, DiffStatus::SourceOnly),
        DiffRow::new(ObjectType::Sequence, "orders_id_seq", Some(103), Some(203), DiffStatus::Identical),
        DiffRow::new(ObjectType::Function, "legacy_total", None, Some(205), DiffStatus::TargetOnly),
    ]
}
