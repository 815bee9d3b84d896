use crate::grade::{AtsResult, DateGrades, Grade};
use crate::history::History;
use crate::time::{month_key, week_key};
use crate::util::mean;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// A winning bet at -110 returns this many units on a one unit risk.
pub const WIN_PAYOUT: f64 = 1.0 / 1.1;

/// Probability edge a pick must exceed to count toward the edge record.
pub const DEFAULT_EDGE_CUTOFF: f64 = 0.10;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ErrorStats {
    len: u32,
    sum: f64,
    abs_sum: f64,
    sq_sum: f64,
}

impl ErrorStats {
    pub fn record(&mut self, error: f64) {
        self.len += 1;
        self.sum += error;
        self.abs_sum += error.abs();
        self.sq_sum += error.powi(2);
    }

    pub fn mae(&self) -> Option<f64> {
        mean(self.abs_sum, self.len)
    }

    pub fn mse(&self) -> Option<f64> {
        mean(self.sq_sum, self.len)
    }

    pub fn mean_error(&self) -> Option<f64> {
        mean(self.sum, self.len)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct AtsRecord {
    pub wins: u32,
    pub losses: u32,
    pub pushes: u32,
}

impl AtsRecord {
    pub fn record(&mut self, result: AtsResult) {
        match result {
            AtsResult::Win => self.wins += 1,
            AtsResult::Loss => self.losses += 1,
            AtsResult::Push => self.pushes += 1,
        }
    }

    /// Decided bets. Pushes are refunded and never count.
    pub fn bets(&self) -> u32 {
        self.wins + self.losses
    }

    pub fn win_rate(&self) -> Option<f64> {
        mean(f64::from(self.wins), self.bets())
    }

    pub fn units(&self) -> Option<f64> {
        if self.bets() == 0 {
            None
        } else {
            Some(f64::from(self.wins) * WIN_PAYOUT - f64::from(self.losses))
        }
    }

    /// Percent return on units risked.
    pub fn roi(&self) -> Option<f64> {
        Some(self.units()? / f64::from(self.bets()) * 100.0)
    }

    pub fn line(&self) -> AtsLine {
        AtsLine {
            record: *self,
            win_rate: self.win_rate(),
            units: self.units(),
            roi: self.roi(),
        }
    }
}

impl fmt::Display for AtsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.wins, self.losses)?;
        if self.pushes > 0 {
            write!(f, "-{}", self.pushes)?;
        }
        Ok(())
    }
}

/// Finished ATS aggregates. `None` means no decided bets.
#[derive(Debug, Default, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct AtsLine {
    pub record: AtsRecord,
    pub win_rate: Option<f64>,
    pub units: Option<f64>,
    pub roi: Option<f64>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Calibration {
    len: u32,
    sum: f64,
    within_one: u32,
}

impl Calibration {
    pub fn record(&mut self, sigma_error: f64) {
        self.len += 1;
        self.sum += sigma_error;
        if sigma_error <= 1.0 {
            self.within_one += 1;
        }
    }

    /// Mean of |error| / sigma. Near 0.8 for a well calibrated normal model.
    pub fn mean_ratio(&self) -> Option<f64> {
        mean(self.sum, self.len)
    }

    pub fn within_one_sigma(&self) -> Option<f64> {
        mean(f64::from(self.within_one), self.len)
    }
}

/// Running totals over any selection of graded records.
#[derive(Debug, Clone, PartialEq)]
pub struct Tally {
    games: usize,
    graded: usize,
    errors: ErrorStats,
    ats: AtsRecord,
    edge_cutoff: f64,
    edge_ats: AtsRecord,
    calibration: Calibration,
}

impl Tally {
    pub fn new(edge_cutoff: f64) -> Tally {
        Tally {
            games: 0,
            graded: 0,
            errors: ErrorStats::default(),
            ats: AtsRecord::default(),
            edge_cutoff,
            edge_ats: AtsRecord::default(),
            calibration: Calibration::default(),
        }
    }

    pub fn record(&mut self, grade: &Grade) {
        self.graded += 1;
        if let Some(error) = grade.model_error {
            self.errors.record(error);
        }
        if let Some(ratio) = grade.sigma_error {
            self.calibration.record(ratio);
        }
        if let Some(result) = grade.ats {
            self.ats.record(result);
            if grade.pick_prob_edge.map_or(false, |edge| edge > self.edge_cutoff) {
                self.edge_ats.record(result);
            }
        }
    }

    pub fn record_date(&mut self, date: &DateGrades) {
        self.games += date.games;
        for grade in &date.grades {
            self.record(grade);
        }
    }

    pub fn summary<S: Into<String>>(&self, label: S) -> Summary {
        Summary {
            label: label.into(),
            game_count: self.games,
            graded: self.graded,
            mae: self.errors.mae(),
            mse: self.errors.mse(),
            mean_error: self.errors.mean_error(),
            ats: self.ats.line(),
            edge_cutoff: self.edge_cutoff,
            edge_ats: self.edge_ats.line(),
            sigma_ratio: self.calibration.mean_ratio(),
            within_one_sigma: self.calibration.within_one_sigma(),
        }
    }
}

/// Daily, monthly or lifetime summary. Derived on every read, never persisted.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Summary {
    pub label: String,
    pub game_count: usize,
    pub graded: usize,
    pub mae: Option<f64>,
    pub mse: Option<f64>,
    pub mean_error: Option<f64>,
    pub ats: AtsLine,
    pub edge_cutoff: f64,
    pub edge_ats: AtsLine,
    pub sigma_ratio: Option<f64>,
    pub within_one_sigma: Option<f64>,
}

/// One summary per date, newest first.
pub fn daily(dates: &History<DateGrades>, edge_cutoff: f64) -> Vec<Summary> {
    dates
        .iter()
        .rev()
        .map(|(date, grades)| {
            let mut tally = Tally::new(edge_cutoff);
            tally.record_date(grades);
            tally.summary(date.as_str())
        })
        .collect()
}

/// One summary per `YYYY-MM`, oldest first.
pub fn monthly(dates: &History<DateGrades>, edge_cutoff: f64) -> Vec<Summary> {
    let mut months: BTreeMap<String, Tally> = BTreeMap::new();
    for (date, grades) in dates.iter() {
        let month = match month_key(date) {
            Some(month) => month,
            None => {
                warn!(%date, "skipping unparseable date");
                continue;
            }
        };
        months
            .entry(month)
            .or_insert_with(|| Tally::new(edge_cutoff))
            .record_date(grades);
    }
    months
        .into_iter()
        .map(|(month, tally)| tally.summary(month))
        .collect()
}

pub fn lifetime(dates: &History<DateGrades>, edge_cutoff: f64) -> Summary {
    let mut tally = Tally::new(edge_cutoff);
    for (_, grades) in dates.iter() {
        tally.record_date(grades);
    }
    tally.summary("lifetime")
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CumulativePoint {
    pub week: String,
    pub units: f64,
}

/// Running unit total at the end of each ISO week that had a decided bet.
pub fn cumulative_units(dates: &History<DateGrades>) -> Vec<CumulativePoint> {
    let mut weeks: BTreeMap<String, AtsRecord> = BTreeMap::new();
    for (date, grades) in dates.iter() {
        let week = match week_key(date) {
            Some(week) => week,
            None => {
                warn!(%date, "skipping unparseable date");
                continue;
            }
        };
        let record = weeks.entry(week).or_default();
        for result in grades.grades.iter().filter_map(|g| g.ats) {
            record.record(result);
        }
    }

    let mut total = 0.0;
    weeks
        .into_iter()
        .filter_map(|(week, record)| {
            total += record.units()?;
            Some(CumulativePoint { week, units: total })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        cumulative_units, daily, lifetime, monthly, AtsRecord, ErrorStats, Tally,
        DEFAULT_EDGE_CUTOFF,
    };
    use crate::grade::{AtsResult, DateGrades, Grade};
    use crate::history::History;
    use assert_approx_eq::assert_approx_eq;

    fn graded(error: Option<f64>, ats: Option<AtsResult>, edge: Option<f64>) -> Grade {
        Grade {
            actual_margin: 0.0,
            model_error: error,
            cover: None,
            ats,
            sigma_error: error.map(|e| e.abs() / 10.0),
            pick_prob_edge: edge,
        }
    }

    fn date(date: &str, games: usize, grades: Vec<Grade>) -> DateGrades {
        DateGrades {
            date: date.to_string(),
            games,
            grades,
        }
    }

    #[test]
    fn test_units_and_roi() {
        let record = AtsRecord {
            wins: 10,
            losses: 5,
            pushes: 2,
        };
        assert_eq!(record.bets(), 15);
        assert_approx_eq!(record.units().unwrap(), 4.090_909_090_909_091);
        assert_approx_eq!(record.roi().unwrap(), 27.272_727_272_727_27);
        assert_approx_eq!(record.win_rate().unwrap(), 2.0 / 3.0);
        assert_eq!(record.to_string(), "10-5-2");
    }

    #[test]
    fn test_no_bets_is_undefined() {
        let record = AtsRecord {
            wins: 0,
            losses: 0,
            pushes: 3,
        };
        assert_eq!(record.units(), None);
        assert_eq!(record.roi(), None);
        assert_eq!(record.win_rate(), None);
        assert_eq!(record.to_string(), "0-0-3");
    }

    #[test]
    fn test_error_stats() {
        let mut stats = ErrorStats::default();
        assert_eq!(stats.mae(), None);
        stats.record(2.0);
        stats.record(-4.0);
        assert_approx_eq!(stats.mae().unwrap(), 3.0);
        assert_approx_eq!(stats.mse().unwrap(), 10.0);
        assert_approx_eq!(stats.mean_error().unwrap(), -1.0);
    }

    #[test]
    fn test_tally_summary() {
        let mut tally = Tally::new(DEFAULT_EDGE_CUTOFF);
        tally.record_date(&date(
            "2024-01-05",
            4,
            vec![
                graded(Some(2.0), Some(AtsResult::Win), Some(0.15)),
                graded(Some(-4.0), Some(AtsResult::Loss), Some(0.10)),
                graded(None, Some(AtsResult::Push), Some(0.20)),
            ],
        ));
        let summary = tally.summary("2024-01-05");
        assert_eq!(summary.game_count, 4);
        assert_eq!(summary.graded, 3);
        assert_approx_eq!(summary.mae.unwrap(), 3.0);
        assert_eq!(summary.ats.record.wins, 1);
        assert_eq!(summary.ats.record.losses, 1);
        assert_eq!(summary.ats.record.pushes, 1);
        assert_eq!(summary.edge_ats.record.wins, 1);
        assert_eq!(summary.edge_ats.record.losses, 0);
        assert_approx_eq!(summary.sigma_ratio.unwrap(), 0.3);
        assert_approx_eq!(summary.within_one_sigma.unwrap(), 1.0);
    }

    #[test]
    fn test_empty_tally_has_no_nan() {
        let summary = Tally::new(DEFAULT_EDGE_CUTOFF).summary("empty");
        assert_eq!(summary.mae, None);
        assert_eq!(summary.mse, None);
        assert_eq!(summary.mean_error, None);
        assert_eq!(summary.ats.units, None);
        assert_eq!(summary.ats.roi, None);
        assert_eq!(summary.sigma_ratio, None);
    }

    #[test]
    fn test_edge_cutoff_is_strict() {
        let mut tally = Tally::new(0.10);
        for grade in &[
            graded(None, Some(AtsResult::Win), Some(0.11)),
            graded(None, Some(AtsResult::Loss), Some(0.10)),
            graded(None, Some(AtsResult::Loss), None),
            graded(None, None, Some(0.5)),
        ] {
            tally.record(grade);
        }
        let summary = tally.summary("edge");
        assert_eq!(
            summary.edge_ats.record,
            AtsRecord {
                wins: 1,
                losses: 0,
                pushes: 0
            }
        );
        assert_eq!(summary.ats.record.bets(), 3);
    }

    fn sample_history() -> History<DateGrades> {
        let mut history = History::new();
        for d in vec![
            date("2024-01-30", 2, vec![graded(Some(1.0), Some(AtsResult::Win), None)]),
            date("2024-02-01", 1, vec![graded(Some(3.0), Some(AtsResult::Loss), None)]),
            date("2024-02-02", 3, vec![]),
        ] {
            history.insert(d.date.clone(), d);
        }
        history
    }

    #[test]
    fn test_daily_is_newest_first() {
        let summaries = daily(&sample_history(), DEFAULT_EDGE_CUTOFF);
        let labels: Vec<_> = summaries.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["2024-02-02", "2024-02-01", "2024-01-30"]);
        assert_eq!(summaries[0].game_count, 3);
        assert_eq!(summaries[0].mae, None);
    }

    #[test]
    fn test_monthly_and_lifetime() {
        let history = sample_history();
        let months = monthly(&history, DEFAULT_EDGE_CUTOFF);
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].label, "2024-01");
        assert_eq!(months[1].label, "2024-02");
        assert_eq!(months[1].game_count, 4);
        assert_approx_eq!(months[1].mae.unwrap(), 3.0);

        let total = lifetime(&history, DEFAULT_EDGE_CUTOFF);
        assert_eq!(total.game_count, 6);
        assert_approx_eq!(total.mae.unwrap(), 2.0);
        assert_approx_eq!(total.mean_error.unwrap(), 2.0);
        assert_approx_eq!(total.mse.unwrap(), 5.0);
        assert_eq!(total.ats.record.to_string(), "1-1");
    }

    #[test]
    fn test_cumulative_units() {
        // 2024-01-30 is ISO week 5, 2024-02-01 and 2024-02-02 share it.
        let mut history = sample_history();
        history.insert(
            "2024-02-06".to_string(),
            date("2024-02-06", 1, vec![graded(None, Some(AtsResult::Win), None)]),
        );
        let points = cumulative_units(&history);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].week, "2024-W05");
        assert_approx_eq!(points[0].units, 1.0 / 1.1 - 1.0);
        assert_eq!(points[1].week, "2024-W06");
        assert_approx_eq!(points[1].units, 2.0 / 1.1 - 1.0);
    }
}
