use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

pub type Entries = BTreeSet<Entry>;

pub const RANKINGS_FILE: &str = "rankings.json";

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum DataKind {
    Predictions,
    Results,
    FinalScores,
}

impl DataKind {
    const ALL: [DataKind; 3] = [DataKind::Predictions, DataKind::Results, DataKind::FinalScores];

    fn prefix(self) -> &'static str {
        match self {
            DataKind::Predictions => "predictions_",
            DataKind::Results => "results_",
            DataKind::FinalScores => "final_scores_",
        }
    }

    pub fn file_name(self, date: &str) -> String {
        format!("{}{}.json", self.prefix(), date)
    }
}

/// A dated data file. Sorts by date first.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Entry {
    pub date: String,
    pub kind: DataKind,
    pub file_name: String,
    pub len: u64,
    pub modified: SystemTime,
}

fn is_iso_date_shape(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && b.iter().enumerate().all(|(i, c)| match i {
            4 | 7 => *c == b'-',
            _ => c.is_ascii_digit(),
        })
}

/// Matches `<prefix>YYYY-MM-DD.json` exactly.
pub fn parse_file_name(name: &str) -> Option<(DataKind, &str)> {
    DataKind::ALL.iter().find_map(|kind| {
        let date = name.strip_prefix(kind.prefix())?.strip_suffix(".json")?;
        if is_iso_date_shape(date) {
            Some((*kind, date))
        } else {
            None
        }
    })
}

/// Dated files directly inside `path`. A missing directory reads as empty.
pub fn read_dir(path: &Path) -> Result<Entries> {
    let mut set = BTreeSet::new();
    if !path.is_dir() {
        debug!(path = %path.display(), "data directory missing");
        return Ok(set);
    }
    for entry in WalkDir::new(path).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = match entry.file_name().to_str() {
            Some(name) => name,
            None => continue,
        };
        if let Some((kind, date)) = parse_file_name(file_name) {
            let metadata = entry.metadata()?;
            set.insert(Entry {
                date: date.to_string(),
                kind,
                file_name: file_name.to_string(),
                len: metadata.len(),
                modified: metadata.modified()?,
            });
        }
    }
    Ok(set)
}

/// Parses a JSON file. `None` when the file does not exist; malformed JSON is
/// an error.
pub fn read_json(path: &Path) -> Result<Option<Value>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "file missing");
            return Ok(None);
        }
        Err(err) => {
            return Err(err).with_context(|| format!("unable to open {}", path.display()));
        }
    };
    let value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("malformed JSON in {}", path.display()))?;
    Ok(Some(value))
}

/// `public/data` under the working directory, else `site/public/data`, else
/// the first (which then reads as empty).
pub fn default_data_dir() -> PathBuf {
    let primary = Path::new("public").join("data");
    let fallback = Path::new("site").join("public").join("data");
    if !primary.exists() && fallback.exists() {
        fallback
    } else {
        primary
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_file_name, read_dir, read_json, DataKind};
    use std::fs;

    #[test]
    fn test_parse_file_name() {
        assert_eq!(
            parse_file_name("predictions_2024-01-05.json"),
            Some((DataKind::Predictions, "2024-01-05"))
        );
        assert_eq!(
            parse_file_name("results_2024-01-05.json"),
            Some((DataKind::Results, "2024-01-05"))
        );
        assert_eq!(
            parse_file_name("final_scores_2024-01-05.json"),
            Some((DataKind::FinalScores, "2024-01-05"))
        );
        assert_eq!(parse_file_name("predictions_2024-1-05.json"), None);
        assert_eq!(parse_file_name("predictions_2024-01-05.json.bak"), None);
        assert_eq!(parse_file_name("xpredictions_2024-01-05.json"), None);
        assert_eq!(parse_file_name("predictions_2024_01_05.json"), None);
        assert_eq!(parse_file_name("rankings.json"), None);
    }

    #[test]
    fn test_read_dir_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in &[
            "predictions_2024-01-07.json",
            "predictions_2024-01-05.json",
            "final_scores_2024-01-05.json",
            "notes.txt",
            "rankings.json",
        ] {
            fs::write(dir.path().join(name), "[]").unwrap();
        }
        fs::create_dir(dir.path().join("predictions_2024-01-09.json")).unwrap();

        let entries = read_dir(dir.path()).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "predictions_2024-01-05.json",
                "final_scores_2024-01-05.json",
                "predictions_2024-01-07.json",
            ]
        );
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_dir(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_read_json() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_json(&dir.path().join("missing.json")).unwrap().is_none());

        let good = dir.path().join("good.json");
        fs::write(&good, r#"{"games": []}"#).unwrap();
        assert!(read_json(&good).unwrap().is_some());

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{not json").unwrap();
        let err = read_json(&bad).unwrap_err();
        assert!(format!("{:#}", err).contains("bad.json"));
    }
}
