// src/retention/sweep.rs
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::Context;
use tokio::fs;

/// Result of one successful eviction pass.
#[derive(Debug)]
pub struct Evicted {
    pub file: PathBuf,
    pub bytes: u64,
    /// Set when deleting the file emptied its day folder.
    pub removed_dir: Option<PathBuf>,
}

/// Birth time as reported by the filesystem. Not every filesystem tracks
/// creation time; segment files are written once and never touched again, so
/// mtime gives the same ordering.
fn birth_time(meta: &Metadata) -> SystemTime {
    meta.created()
        .or_else(|_| meta.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

/// Recursive total of file sizes under `root`. The recordings tree is two
/// levels deep by construction, but unexpected nesting is tolerated. Entries
/// vanishing mid-scan are skipped.
pub async fn dir_size(root: &Path) -> anyhow::Result<u64> {
    let mut total = 0u64;
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(e).with_context(|| format!("listing {}", dir.display())),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("listing {}", dir.display()))?
        {
            match entry.metadata().await {
                Ok(meta) if meta.is_dir() => pending.push(entry.path()),
                Ok(meta) => total += meta.len(),
                Err(_) => {}
            }
        }
    }

    Ok(total)
}

/// One eviction pass: in the oldest day folder that still holds a file,
/// delete the oldest file; remove the folder too if that emptied it.
/// Returns `None` when there is nothing evictable (empty base, or only empty
/// day folders).
pub async fn evict_oldest(base: &Path) -> anyhow::Result<Option<Evicted>> {
    let mut day_dirs: Vec<(SystemTime, PathBuf)> = Vec::new();

    let mut entries = match fs::read_dir(base).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("listing {}", base.display())),
    };

    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("listing {}", base.display()))?
    {
        match entry.metadata().await {
            Ok(meta) if meta.is_dir() => day_dirs.push((birth_time(&meta), entry.path())),
            _ => {}
        }
    }

    day_dirs.sort_by_key(|(born, _)| *born);

    for (_, dir) in day_dirs {
        let Some((file, bytes)) = oldest_file_in(&dir).await? else {
            continue;
        };

        fs::remove_file(&file)
            .await
            .with_context(|| format!("deleting {}", file.display()))?;

        let removed_dir = if is_empty(&dir).await? {
            fs::remove_dir(&dir)
                .await
                .with_context(|| format!("removing empty day folder {}", dir.display()))?;
            Some(dir)
        } else {
            None
        };

        return Ok(Some(Evicted {
            file,
            bytes,
            removed_dir,
        }));
    }

    Ok(None)
}

async fn oldest_file_in(dir: &Path) -> anyhow::Result<Option<(PathBuf, u64)>> {
    let mut oldest: Option<(SystemTime, PathBuf, u64)> = None;

    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("listing {}", dir.display())),
    };

    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("listing {}", dir.display()))?
    {
        let meta = match entry.metadata().await {
            Ok(meta) => meta,
            Err(_) => continue,
        };
        if meta.is_dir() {
            continue;
        }

        let born = birth_time(&meta);
        let replace = match &oldest {
            Some((current, _, _)) => born < *current,
            None => true,
        };
        if replace {
            oldest = Some((born, entry.path(), meta.len()));
        }
    }

    Ok(oldest.map(|(_, path, bytes)| (path, bytes)))
}

async fn is_empty(dir: &Path) -> anyhow::Result<bool> {
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("listing {}", dir.display()))?;
    Ok(entries.next_entry().await?.is_none())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;
    use std::thread::sleep;
    use std::time::Duration;
    use tempfile::TempDir;

    // Birth times come from the filesystem, so ordering in these tests is
    // established by creating entries with small gaps in between.
    fn write_spaced(path: &Path, contents: &[u8]) {
        sleep(Duration::from_millis(20));
        std_fs::write(path, contents).unwrap();
    }

    fn spec_tree() -> TempDir {
        let base = TempDir::new().unwrap();
        std_fs::create_dir(base.path().join("2024.01.01")).unwrap();
        write_spaced(&base.path().join("2024.01.01/10-00-00.mkv"), b"aaaa");
        write_spaced(&base.path().join("2024.01.01/10-02-00.mkv"), b"bbbb");
        sleep(Duration::from_millis(20));
        std_fs::create_dir(base.path().join("2024.01.02")).unwrap();
        write_spaced(&base.path().join("2024.01.02/10-00-00.mkv"), b"cccc");
        base
    }

    #[tokio::test]
    async fn dir_size_sums_all_files_recursively() {
        let base = spec_tree();
        assert_eq!(dir_size(base.path()).await.unwrap(), 12);
    }

    #[tokio::test]
    async fn dir_size_of_missing_dir_is_zero() {
        let base = TempDir::new().unwrap();
        let gone = base.path().join("nope");
        assert_eq!(dir_size(&gone).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn dir_size_tolerates_unexpected_nesting() {
        let base = spec_tree();
        let nested = base.path().join("2024.01.02/extra");
        std_fs::create_dir(&nested).unwrap();
        std_fs::write(nested.join("stray.bin"), b"dd").unwrap();
        assert_eq!(dir_size(base.path()).await.unwrap(), 14);
    }

    #[tokio::test]
    async fn evicts_only_the_globally_oldest_file() {
        let base = spec_tree();

        let evicted = evict_oldest(base.path()).await.unwrap().unwrap();
        assert_eq!(evicted.file, base.path().join("2024.01.01/10-00-00.mkv"));
        assert_eq!(evicted.bytes, 4);
        assert!(evicted.removed_dir.is_none());

        assert!(base.path().join("2024.01.01/10-02-00.mkv").exists());
        assert!(base.path().join("2024.01.02/10-00-00.mkv").exists());
    }

    #[tokio::test]
    async fn emptied_day_folder_is_removed_in_the_same_pass() {
        let base = spec_tree();

        evict_oldest(base.path()).await.unwrap().unwrap();
        let evicted = evict_oldest(base.path()).await.unwrap().unwrap();

        assert_eq!(evicted.file, base.path().join("2024.01.01/10-02-00.mkv"));
        assert_eq!(
            evicted.removed_dir.as_deref(),
            Some(base.path().join("2024.01.01").as_path())
        );
        assert!(!base.path().join("2024.01.01").exists());
        assert!(base.path().join("2024.01.02/10-00-00.mkv").exists());
    }

    #[tokio::test]
    async fn empty_base_is_a_no_op() {
        let base = TempDir::new().unwrap();
        assert!(evict_oldest(base.path()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn only_empty_day_folders_is_a_no_op() {
        let base = TempDir::new().unwrap();
        std_fs::create_dir(base.path().join("2024.01.01")).unwrap();
        std_fs::create_dir(base.path().join("2024.01.02")).unwrap();

        assert!(evict_oldest(base.path()).await.unwrap().is_none());
        assert!(base.path().join("2024.01.01").exists());
        assert!(base.path().join("2024.01.02").exists());
    }

    #[tokio::test]
    async fn empty_oldest_folder_is_skipped_not_fatal() {
        let base = TempDir::new().unwrap();
        std_fs::create_dir(base.path().join("2024.01.01")).unwrap();
        sleep(Duration::from_millis(20));
        std_fs::create_dir(base.path().join("2024.01.02")).unwrap();
        write_spaced(&base.path().join("2024.01.02/09-00-00.mkv"), b"ee");

        let evicted = evict_oldest(base.path()).await.unwrap().unwrap();
        assert_eq!(evicted.file, base.path().join("2024.01.02/09-00-00.mkv"));
        // the stale empty folder is left alone
        assert!(base.path().join("2024.01.01").exists());
    }
}
