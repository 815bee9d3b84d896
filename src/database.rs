use crate::cache::{fingerprint, GradeCache};
use crate::grade::{grade_all, DateGrades};
use crate::history::History;
use crate::rankings::{self, RankingSnapshot};
use crate::read_dir::{read_dir, read_json, DataKind, Entries, Entry};
use crate::record::{GameResult, Prediction};
use crate::rows::normalize_rows;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// A listing of the data directory. Files are only read on demand.
#[derive(Debug)]
pub struct Database {
    dir: PathBuf,
    entries: Entries,
}

impl Database {
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = read_dir(dir)?;
        debug!(dir = %dir.display(), files = entries.len(), "listed data directory");
        Ok(Database {
            dir: dir.to_path_buf(),
            entries,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry(&self, kind: DataKind, date: &str) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|e| e.kind == kind && e.date == date)
    }

    /// Dates with a file of `kind`, ascending.
    pub fn dates(&self, kind: DataKind) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.date.as_str())
            .collect()
    }

    pub fn latest(&self, kind: DataKind) -> Option<&str> {
        self.dates(kind).pop()
    }

    /// Final scores when present, else plain results.
    pub fn outcome_entry(&self, date: &str) -> Option<&Entry> {
        self.entry(DataKind::FinalScores, date)
            .or_else(|| self.entry(DataKind::Results, date))
    }

    /// Dates that have final scores strictly before `today`.
    pub fn final_dates_before(&self, today: &str) -> Vec<&str> {
        self.dates(DataKind::FinalScores)
            .into_iter()
            .filter(|date| *date < today)
            .collect()
    }

    /// Prediction dates up to the last final-score date before `today`, or all
    /// prediction dates when nothing is final yet.
    pub fn metric_dates(&self, today: &str) -> Vec<&str> {
        let last_final = self.final_dates_before(today).pop();
        self.dates(DataKind::Predictions)
            .into_iter()
            .filter(|date| last_final.map_or(true, |last| *date <= last))
            .collect()
    }

    fn read_rows(&self, entry: Option<&Entry>) -> Result<Vec<serde_json::Value>> {
        match entry {
            Some(entry) => Ok(read_json(&self.dir.join(&entry.file_name))?
                .map(normalize_rows)
                .unwrap_or_default()),
            None => Ok(Vec::new()),
        }
    }

    pub fn predictions(&self, date: &str) -> Result<Vec<Prediction>> {
        let rows = self.read_rows(self.entry(DataKind::Predictions, date))?;
        Ok(rows.iter().map(Prediction::from_value).collect())
    }

    pub fn results(&self, date: &str) -> Result<Vec<GameResult>> {
        let rows = self.read_rows(self.outcome_entry(date))?;
        Ok(rows.iter().map(GameResult::from_value).collect())
    }

    #[instrument(skip(self))]
    pub fn grade_date(&self, date: &str) -> Result<DateGrades> {
        let predictions = self.predictions(date)?;
        let results = self.results(date)?;
        let grades = grade_all(&predictions, &results);
        debug!(
            predictions = predictions.len(),
            results = results.len(),
            graded = grades.len(),
            "graded date"
        );
        Ok(DateGrades {
            date: date.to_string(),
            games: predictions.len(),
            grades,
        })
    }

    fn date_fingerprint(&self, date: &str) -> u64 {
        let files: Vec<&Entry> = [DataKind::Predictions, DataKind::FinalScores, DataKind::Results]
            .iter()
            .filter_map(|kind| self.entry(*kind, date))
            .collect();
        fingerprint(&files)
    }

    /// Grades every date in `dates`, reusing cached dates whose files are
    /// unchanged when a cache is given.
    #[instrument(skip(self, dates, cache), fields(dates = dates.len()))]
    pub fn grade_dates(
        &self,
        dates: &[&str],
        cache: Option<&mut GradeCache>,
    ) -> Result<History<DateGrades>> {
        let mut cache = cache;
        let mut history = History::new();
        let mut reused = 0_usize;
        for date in dates {
            let fingerprint = self.date_fingerprint(date);
            let cached = cache
                .as_ref()
                .and_then(|cache| cache.get(date, fingerprint))
                .cloned();
            let grades = match cached {
                Some(grades) => {
                    reused += 1;
                    grades
                }
                None => {
                    let grades = self.grade_date(date)?;
                    if let Some(cache) = cache.as_mut() {
                        cache.insert(fingerprint, grades.clone());
                    }
                    grades
                }
            };
            history.insert((*date).to_string(), grades);
        }
        if let Some(cache) = cache {
            let listed = self.dates(DataKind::Predictions);
            cache.retain(|date| listed.iter().any(|listed| *listed == date));
            if let Err(err) = cache.save() {
                warn!(%err, "unable to save grade cache");
            }
        }
        debug!(graded = history.len(), reused, "graded dates");
        Ok(history)
    }

    pub fn rankings(&self) -> Result<Option<RankingSnapshot>> {
        rankings::load(&self.dir)
    }
}
