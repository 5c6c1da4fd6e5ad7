use std::{
    env, fs,
    path::{Path, PathBuf},
    process,
};

/// Scratch directory for tests that need real files on disk.  The name is
/// suffixed with the process id, since unit and integration test binaries
/// can run at the same time.  Removed again on drop.
pub struct TempDir {
    root: PathBuf,
}

impl TempDir {
    pub fn new(name: &str) -> Self {
        let root = env::temp_dir().join(format!("{}-{}", name, process::id()));
        // Leftovers from an aborted run with a recycled pid.
        let _ = fs::remove_dir_all(&root);
        if let Err(err) = fs::create_dir_all(&root) {
            panic!("Problem creating '{}': {}", root.display(), err);
        }
        TempDir { root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn join<P: AsRef<Path>>(&self, rel: P) -> PathBuf {
        self.root.join(rel)
    }

    /// Write `contents` to `rel`, creating intermediate directories, and
    /// return the full path.
    pub fn write_file<P: AsRef<Path>>(&self, rel: P, contents: &str) -> PathBuf {
        let path = self.join(rel);
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Err(err) = fs::write(&path, contents) {
            panic!("Problem writing '{}': {}", path.display(), err);
        }
        path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_file_and_cleanup() {
        let kept_path;
        {
            let dir = TempDir::new("navgraph-temp-dir");
            let path = dir.write_file("nested/log.ltsv", "uid:a");
            assert_eq!(path, dir.path().join("nested").join("log.ltsv"));
            assert_eq!(fs::read_to_string(&path).unwrap(), "uid:a");
            kept_path = dir.path().to_path_buf();
        }
        assert!(!kept_path.exists());
    }
}
