use crate::finder::util::now_epoch_secs;
use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const LOCK_FILE: &str = "datafinder.lock";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockPayload {
    pub pid: u32,
    pub build_uuid: String,
    pub started_at_epoch_secs: u64,
}

/// Exclusive hold on an output directory for the length of a run. Two runs
/// writing the same cache directory would interleave their files.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(output_dir: &Path) -> Result<Self> {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("failed to create {}", output_dir.display()))?;
        let path = output_dir.join(LOCK_FILE);
        let mut file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;

        if file.try_lock_exclusive().is_err() {
            let holder = fs::read_to_string(&path).unwrap_or_default();
            anyhow::bail!(
                "another datafinder run holds {} ({})",
                path.display(),
                holder.trim()
            );
        }

        let payload = LockPayload {
            pid: std::process::id(),
            build_uuid: env!("BUILD_UUID").to_string(),
            started_at_epoch_secs: now_epoch_secs()?,
        };
        file.set_len(0)?;
        file.write_all(serde_json::to_string(&payload)?.as_bytes())?;
        file.flush()?;

        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// Left on disk: unlinking would let two runs lock different inodes at one path.
impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_acquire_fails_while_first_is_held() {
        let tmp = tempdir().expect("tempdir");
        let first = RunLock::acquire(tmp.path()).expect("first lock");
        let raw = fs::read_to_string(first.path()).expect("payload");
        let payload: LockPayload = serde_json::from_str(&raw).expect("json");
        assert_eq!(payload.pid, std::process::id());

        let err = RunLock::acquire(tmp.path()).expect_err("second lock");
        assert!(err.to_string().contains("another datafinder run"));

        drop(first);
        assert!(tmp.path().join(LOCK_FILE).exists());
        let again = RunLock::acquire(tmp.path()).expect("lock after release");
        let raw = fs::read_to_string(again.path()).expect("payload");
        serde_json::from_str::<LockPayload>(&raw).expect("payload rewritten as json");
    }

    #[test]
    fn released_lock_file_is_reused_not_replaced() {
        let tmp = tempdir().expect("tempdir");
        let first = RunLock::acquire(tmp.path()).expect("first");
        #[cfg(unix)]
        let inode = {
            use std::os::unix::fs::MetadataExt;
            fs::metadata(first.path()).expect("metadata").ino()
        };
        drop(first);
        let held = RunLock::acquire(tmp.path()).expect("second");
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            assert_eq!(fs::metadata(held.path()).expect("metadata").ino(), inode);
        }
        // A third run opening the same path must still be refused.
        assert!(RunLock::acquire(tmp.path()).is_err());
        drop(held);
    }
}
