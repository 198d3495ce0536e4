use super::RateSnapshot;
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Persistence for the last fetched snapshot
pub trait SnapshotStore {
    /// Last saved snapshot. Missing or unreadable stores yield `None`.
    fn load(&self) -> Option<RateSnapshot>;
    fn save(&self, snapshot: &RateSnapshot) -> io::Result<()>;
}

/// JSON cache file, replaced atomically on every save
#[derive(Debug, Clone)]
pub struct CacheFile {
    path: PathBuf,
}

impl CacheFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CacheFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl SnapshotStore for CacheFile {
    fn load(&self) -> Option<RateSnapshot> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("No rate cache at {}", self.path.display());
                return None;
            }
            Err(err) => {
                log::warn!("Cannot open rate cache {}: {}", self.path.display(), err);
                return None;
            }
        };
        match serde_json::from_reader::<_, RateSnapshot>(BufReader::new(file)) {
            Ok(snapshot) => {
                log::debug!(
                    "Loaded {} cached rates from {}",
                    snapshot.rates.len(),
                    snapshot.timestamp
                );
                Some(snapshot)
            }
            Err(err) => {
                log::warn!("Ignoring unreadable rate cache {}: {}", self.path.display(), err);
                None
            }
        }
    }

    fn save(&self, snapshot: &RateSnapshot) -> io::Result<()> {
        let dir = self.dir();
        fs::create_dir_all(dir)?;

        // readers never see a partially written file
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, snapshot)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;

        log::debug!("Saved rate cache to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::tests::sample_rates;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn snapshot() -> RateSnapshot {
        RateSnapshot {
            timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            rates: sample_rates(),
        }
    }

    #[test]
    fn missing_file_loads_nothing() {
        let dir = TempDir::new().unwrap();
        let store = CacheFile::new(dir.path().join("currency_cache.json"));
        assert_eq!(store.load(), None);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = CacheFile::new(dir.path().join("currency_cache.json"));
        store.save(&snapshot()).unwrap();
        assert_eq!(store.load(), Some(snapshot()));
    }

    #[test]
    fn save_overwrites_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = CacheFile::new(dir.path().join("currency_cache.json"));
        store.save(&snapshot()).unwrap();

        let newer = RateSnapshot {
            timestamp: Utc.with_ymd_and_hms(2025, 3, 2, 12, 0, 0).unwrap(),
            rates: Default::default(),
        };
        store.save(&newer).unwrap();
        assert_eq!(store.load(), Some(newer));
        // only the cache file is left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = CacheFile::new(dir.path().join("nested/cache/rates.json"));
        store.save(&snapshot()).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn corrupt_file_loads_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("currency_cache.json");
        fs::write(&path, "{\"timestamp\": ").unwrap();
        assert_eq!(CacheFile::new(path).load(), None);
    }

    #[test]
    fn reads_file_written_by_earlier_tool() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("currency_cache.json");
        fs::write(
            &path,
            r#"{
  "timestamp": "2025-03-01T09:15:42.516233",
  "data": {
    "KRW": {"ID": "R01815", "NumCode": "410", "CharCode": "KRW", "Nominal": 1000, "Name": "Won", "Value": 61.2345, "Previous": 61.1}
  }
}"#,
        )
        .unwrap();
        let snapshot = CacheFile::new(path).load().unwrap();
        assert_eq!(snapshot.rates.len(), 1);
        assert_eq!(snapshot.rates["KRW"].nominal.get(), 1000);
    }

    #[test]
    fn save_keeps_every_published_field() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("currency_cache.json");
        fs::write(
            &path,
            r#"{
  "timestamp": "2025-03-01T09:15:42Z",
  "data": {
    "KRW": {"ID": "R01815", "NumCode": "410", "CharCode": "KRW", "Nominal": 1000, "Name": "Won", "Value": 61.2345, "Previous": 61.1}
  }
}"#,
        )
        .unwrap();
        let store = CacheFile::new(&path);
        let snapshot = store.load().unwrap();
        store.save(&snapshot).unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let krw = &saved["data"]["KRW"];
        assert_eq!(krw["ID"], "R01815");
        assert_eq!(krw["NumCode"], "410");
        assert_eq!(krw["CharCode"], "KRW");
        assert_eq!(krw["Previous"], 61.1);
        assert_eq!(krw["Value"], 61.2345);
        assert_eq!(krw["Nominal"], 1000);
        assert_eq!(store.load(), Some(snapshot));
    }
}
