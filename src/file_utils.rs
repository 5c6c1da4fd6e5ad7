use std::fs;
use std::path::Path;

use crate::error::{AnalysisError, Result};

/// Make sure the directory `file_path` will be written into exists.
pub fn ensure_parent_dir(file_path: &Path) -> Result<()> {
    let parent_path = match file_path.parent() {
        Some(p) => p,
        None => {
            return Err(AnalysisError::bad_input(format!(
                "Problem getting parent of '{}'",
                file_path.display()
            )));
        }
    };
    if parent_path.as_os_str().is_empty() {
        return Ok(());
    }
    if let Err(e) = fs::create_dir_all(parent_path) {
        return Err(AnalysisError::bad_input(format!(
            "Problem creating parent of '{}': {}",
            file_path.display(),
            e
        )));
    }
    Ok(())
}

pub fn write_file_ensuring_parent_dir(file_path: &Path, contents: &str) -> Result<()> {
    ensure_parent_dir(file_path)?;
    fs::write(file_path, contents)?;
    Ok(())
}
