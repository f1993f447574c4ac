use chrono::Local;
use std::fs::OpenOptions;
use std::io::{Result, Write};
use std::path::{Path, PathBuf};

use crate::types::ScriptDraft;

/// Where a generated script ends up.
#[derive(Debug)]
pub enum ScriptTarget {
    /// A timestamped file inside the output directory.
    File(PathBuf),
    /// An in-memory buffer, used when no directory is configured.
    Memory(String),
}

#[derive(Debug, Default)]
pub struct ScriptWriterOptions {
    /// File mode when `Some`, memory mode otherwise.
    pub dir: Option<PathBuf>,
    /// File name prefix, `schema-diff` when `None`.
    pub file_prefix: Option<String>,
}

/// Writes script drafts either to a timestamped `.sql` file or to memory.
#[derive(Debug)]
pub struct ScriptWriter {
    target: ScriptTarget,
}

impl ScriptWriter {
    pub fn new(options: ScriptWriterOptions) -> Result<Self> {
        let target = match options.dir {
            Some(dir) => {
                std::fs::create_dir_all(&dir)?;
                let prefix = options
                    .file_prefix
                    .unwrap_or_else(|| "schema-diff".to_string());
                let timestamp = Local::now().format("%Y%m%d-%H%M%S%.3f").to_string();
                let path = dir.join(format!("{}-{}.sql", prefix, timestamp));

                std::fs::File::create(&path)?;
                ScriptTarget::File(path)
            }
            None => ScriptTarget::Memory(String::new()),
        };

        Ok(Self { target })
    }

    /// Appends the rendered text of `draft`, terminated by a newline.
    pub fn write_draft(&mut self, draft: &ScriptDraft) -> Result<()> {
        let mut content = draft.text.replace("\r\n", "\n");
        if !content.ends_with('\n') {
            content.push('\n');
        }

        match &mut self.target {
            ScriptTarget::File(path) => {
                let mut file = OpenOptions::new().append(true).open(path)?;
                file.write_all(content.as_bytes())
            }
            ScriptTarget::Memory(buf) => {
                buf.push_str(&content);
                Ok(())
            }
        }
    }

    pub fn target(&self) -> &ScriptTarget {
        &self.target
    }

    pub fn content(&self) -> Option<&str> {
        match &self.target {
            ScriptTarget::Memory(buf) => Some(buf),
            ScriptTarget::File(_) => None,
        }
    }

    pub fn file_path(&self) -> Option<&Path> {
        match &self.target {
            ScriptTarget::File(path) => Some(path.as_path()),
            ScriptTarget::Memory(_) => None,
        }
    }
}
