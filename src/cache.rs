use crate::grade::DateGrades;
use crate::read_dir::Entry;
use anyhow::{Context, Result};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use tracing::debug;

const CACHE_VERSION: u64 = 1;

#[derive(Debug, Default, Deserialize, Serialize)]
struct CacheFile {
    version: u64,
    dates: BTreeMap<String, CachedDate>,
}

#[derive(Debug, Deserialize, Serialize)]
struct CachedDate {
    fingerprint: u64,
    grades: DateGrades,
}

#[derive(Debug, Hash)]
struct CacheKey<'a> {
    version: u64,
    entries: &'a [&'a Entry],
}

/// Identifies the exact files a date was graded from.
pub fn fingerprint(entries: &[&Entry]) -> u64 {
    let mut hasher = FxHasher::default();
    CacheKey {
        version: CACHE_VERSION,
        entries,
    }
    .hash(&mut hasher);
    hasher.finish()
}

/// Graded records per date, reused until any of that date's files change.
#[derive(Debug)]
pub struct GradeCache {
    path: PathBuf,
    file: CacheFile,
    dirty: bool,
}

impl GradeCache {
    /// Cache for `data_dir` under the user cache directory.
    pub fn open(data_dir: &Path) -> Result<GradeCache> {
        Ok(GradeCache::at(get_cache_path(data_dir)?))
    }

    /// Unreadable or outdated caches start empty.
    pub fn at(path: PathBuf) -> GradeCache {
        let file = match load(&path) {
            Ok(file) if file.version == CACHE_VERSION => file,
            Ok(_) => CacheFile::default(),
            Err(err) => {
                debug!(path = %path.display(), %err, "starting with empty cache");
                CacheFile::default()
            }
        };
        GradeCache {
            path,
            file,
            dirty: false,
        }
    }

    pub fn get(&self, date: &str, fingerprint: u64) -> Option<&DateGrades> {
        self.file
            .dates
            .get(date)
            .filter(|cached| cached.fingerprint == fingerprint)
            .map(|cached| &cached.grades)
    }

    pub fn insert(&mut self, fingerprint: u64, grades: DateGrades) {
        self.dirty = true;
        self.file
            .dates
            .insert(grades.date.clone(), CachedDate { fingerprint, grades });
    }

    /// Drops dates that no longer have files.
    pub fn retain<F: Fn(&str) -> bool>(&mut self, keep: F) {
        let before = self.file.dates.len();
        self.file.dates.retain(|date, _| keep(date));
        self.dirty |= self.file.dates.len() != before;
    }

    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        self.file.version = CACHE_VERSION;
        let mut writer = GzEncoder::new(Vec::new(), Compression::default());
        bincode::serialize_into(&mut writer, &self.file)?;
        let data = writer.finish()?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, data)?;
        self.dirty = false;
        Ok(())
    }
}

fn load(path: &Path) -> Result<CacheFile> {
    let mut reader = GzDecoder::new(File::open(path)?);
    Ok(bincode::deserialize_from(&mut reader)?)
}

fn get_cache_path(data_dir: &Path) -> Result<PathBuf> {
    let mut hasher = FxHasher::default();
    fs::canonicalize(data_dir)
        .unwrap_or_else(|_| data_dir.to_path_buf())
        .hash(&mut hasher);
    Ok(dirs::cache_dir()
        .context("unable to find cache dir")?
        .join(env!("CARGO_PKG_NAME"))
        .join(format!("grades-{:x}.bincode.gz", hasher.finish())))
}

#[cfg(test)]
mod tests {
    use super::{fingerprint, GradeCache};
    use crate::grade::{AtsResult, DateGrades, Grade};
    use crate::read_dir::{DataKind, Entry};
    use std::time::{Duration, SystemTime};

    fn entry(len: u64) -> Entry {
        Entry {
            date: "2024-01-05".to_string(),
            kind: DataKind::Predictions,
            file_name: "predictions_2024-01-05.json".to_string(),
            len,
            modified: SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
        }
    }

    fn grades() -> DateGrades {
        DateGrades {
            date: "2024-01-05".to_string(),
            games: 2,
            grades: vec![Grade {
                actual_margin: 7.0,
                model_error: Some(-1.5),
                cover: Some(3.5),
                ats: Some(AtsResult::Win),
                sigma_error: None,
                pick_prob_edge: Some(0.12),
            }],
        }
    }

    #[test]
    fn test_fingerprint_tracks_file_changes() {
        let a = entry(10);
        let b = entry(11);
        assert_eq!(fingerprint(&[&a]), fingerprint(&[&a]));
        assert_ne!(fingerprint(&[&a]), fingerprint(&[&b]));
        assert_ne!(fingerprint(&[&a]), fingerprint(&[]));
    }

    #[test]
    fn test_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("grades.bincode.gz");

        let mut cache = GradeCache::at(path.clone());
        assert!(cache.get("2024-01-05", 1).is_none());
        cache.insert(1, grades());
        cache.save().unwrap();

        let cache = GradeCache::at(path);
        assert_eq!(cache.get("2024-01-05", 1), Some(&grades()));
        assert!(cache.get("2024-01-05", 2).is_none());
    }

    #[test]
    fn test_corrupt_cache_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grades.bincode.gz");
        std::fs::write(&path, b"not gzip").unwrap();
        let mut cache = GradeCache::at(path);
        assert!(cache.get("2024-01-05", 1).is_none());
        cache.insert(1, grades());
        cache.retain(|date| date != "2024-01-05");
        assert!(cache.get("2024-01-05", 1).is_none());
        cache.save().unwrap();
    }
}
