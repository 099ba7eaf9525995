use anyhow::Context;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Best-effort guard against overlapping runs touching the additions file.
/// The lock is a `create_new` file next to the store; it is removed when the
/// guard drops. A crashed run leaves the file behind, so acquisition failure
/// is reported as "held", not as an error, and the operator removes it by hand.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

pub enum Acquired {
    Yes(RunLock),
    AlreadyHeld,
}

impl RunLock {
    pub fn try_acquire(path: impl Into<PathBuf>) -> anyhow::Result<Acquired> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }

        let result = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path);

        match result {
            Ok(mut file) => {
                // Record the owning pid for operator forensics.
                let _ = writeln!(file, "{}", std::process::id());
                Ok(Acquired::Yes(RunLock { path }))
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(Acquired::AlreadyHeld),
            Err(err) => Err(anyhow::Error::new(err)
                .context(format!("failed to create lock file {}", path.display()))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to remove run lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquisition_reports_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.lock");

        let first = RunLock::try_acquire(&path).unwrap();
        assert!(matches!(first, Acquired::Yes(_)));

        let second = RunLock::try_acquire(&path).unwrap();
        assert!(matches!(second, Acquired::AlreadyHeld));
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.lock");

        {
            let _guard = RunLock::try_acquire(&path).unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());

        let again = RunLock::try_acquire(&path).unwrap();
        assert!(matches!(again, Acquired::Yes(_)));
    }
}
