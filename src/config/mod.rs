pub mod compare;
pub mod engine;
pub mod log;
pub mod script;
pub mod settings;

pub use compare::CompareConfig;
pub use engine::EngineConfig;
pub use log::LogConfig;
pub use script::ScriptConfig;
pub use settings::Settings;
