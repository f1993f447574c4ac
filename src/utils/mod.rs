pub mod fs;
pub mod init;
pub mod logger;
pub mod script_template;
pub mod script_writer;
pub mod serde;
pub mod time;

pub use fs::validate_output_dir;
pub use script_writer::{ScriptWriter, ScriptWriterOptions};
pub use time::format_duration;
