use std::path::PathBuf;

/// Accepts an existing directory or a path that does not exist yet.
/// Script writers create missing directories on demand.
pub fn validate_output_dir(path: &str) -> Result<PathBuf, String> {
    let pb = PathBuf::from(path);
    if pb.exists() && !pb.is_dir() {
        Err(format!("{} exists and is not a directory", path))
    } else {
        Ok(pb)
    }
}
