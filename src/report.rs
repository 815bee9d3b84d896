use crate::database::Database;
use crate::grade::{grade, AtsResult};
use crate::history::History;
use crate::lookup::ResultLookup;
use crate::rankings::RankedTeam;
use crate::record::{GameResult, Prediction};
use crate::stats::{AtsLine, AtsRecord, CumulativePoint, Summary};
use crate::time::display_date;
use anyhow::Result;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt::Write;
use std::str::FromStr;
use tracing::debug;

const NO_DATA: &str = "-";

pub fn fmt_number(value: Option<f64>) -> String {
    value.map_or_else(|| NO_DATA.to_string(), |v| format!("{:.3}", v))
}

/// Fraction rendered as a percentage.
pub fn fmt_percent(value: Option<f64>) -> String {
    value.map_or_else(|| NO_DATA.to_string(), |v| format!("{:.1}%", v * 100.0))
}

pub fn fmt_units(value: Option<f64>) -> String {
    value.map_or_else(|| NO_DATA.to_string(), |v| format!("{:+.1}u", v))
}

/// Already a percentage, rendered with its sign.
pub fn fmt_roi(value: Option<f64>) -> String {
    value.map_or_else(|| NO_DATA.to_string(), |v| format!("{:+.1}%", v))
}

pub fn fmt_spread(value: Option<f64>) -> String {
    match value {
        Some(v) if v > 0.0 => format!("+{:.1}", v),
        Some(v) => format!("{:.1}", v),
        None => NO_DATA.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFilter {
    All,
    Wins,
    Losses,
}

impl ResultFilter {
    fn keeps(self, ats: Option<AtsResult>) -> bool {
        match self {
            ResultFilter::All => true,
            ResultFilter::Wins => ats == Some(AtsResult::Win),
            ResultFilter::Losses => ats == Some(AtsResult::Loss),
        }
    }
}

impl FromStr for ResultFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<ResultFilter, String> {
        match s {
            "all" => Ok(ResultFilter::All),
            "wins" => Ok(ResultFilter::Wins),
            "losses" => Ok(ResultFilter::Losses),
            other => Err(format!("unknown result filter {:?}", other)),
        }
    }
}

/// One row of the per-date history table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradedGame {
    pub away_team: String,
    pub home_team: String,
    pub away_score: Option<f64>,
    pub home_score: Option<f64>,
    pub pick_side: String,
    pub pick_team: String,
    pub market_spread_home: Option<f64>,
    /// Model line in book convention.
    pub model_line: Option<f64>,
    pub pick_prob_edge: f64,
    pub ats_result: Option<AtsResult>,
    pub has_book: bool,
}

impl GradedGame {
    pub fn new(prediction: &Prediction, result: Option<&GameResult>) -> GradedGame {
        let score = result.and_then(|r| r.score);
        GradedGame {
            away_team: prediction.teams.away.clone(),
            home_team: prediction.teams.home.clone(),
            away_score: score.map(|s| s.away),
            home_score: score.map(|s| s.home),
            pick_side: prediction.pick_label.clone(),
            pick_team: prediction.pick_team().to_string(),
            market_spread_home: prediction.market_spread_home,
            model_line: prediction.model_line(),
            pick_prob_edge: prediction.pick_prob_edge.unwrap_or(0.0),
            ats_result: result
                .and_then(|r| grade(prediction, r))
                .and_then(|g| g.ats),
            has_book: prediction.has_book(),
        }
    }

    fn matches(&self, query: &str) -> bool {
        [&self.away_team, &self.home_team, &self.pick_team]
            .iter()
            .any(|name| name.to_lowercase().contains(query))
    }
}

/// Book games first, then by probability edge, largest first.
fn history_order(a: &GradedGame, b: &GradedGame) -> Ordering {
    b.has_book
        .cmp(&a.has_book)
        .then_with(|| b.pick_prob_edge.total_cmp(&a.pick_prob_edge))
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryQuery {
    pub date: Option<String>,
    /// Minimum probability edge in whole percent.
    pub edge_min: f64,
    pub filter: ResultFilter,
    pub search: Option<String>,
}

impl Default for HistoryQuery {
    fn default() -> HistoryQuery {
        HistoryQuery {
            date: None,
            edge_min: 0.0,
            filter: ResultFilter::All,
            search: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryView {
    pub date: String,
    pub prev_date: Option<String>,
    pub next_date: Option<String>,
    pub game_count: usize,
    pub stats: AtsLine,
    pub games: Vec<GradedGame>,
}

/// Graded games for a final-score date before `today`. The requested date is
/// used when available, otherwise the latest. `None` when nothing is final.
pub fn history_view(db: &Database, today: &str, query: &HistoryQuery) -> Result<Option<HistoryView>> {
    let mut available = History::new();
    for date in db.final_dates_before(today) {
        available.insert(date.to_string(), ());
    }
    let date = match query.date.as_deref().filter(|d| available.contains(d)) {
        Some(date) => date.to_string(),
        None => match available.latest() {
            Some(latest) => latest.to_string(),
            None => {
                debug!("no final scores before {}", today);
                return Ok(None);
            }
        },
    };
    let (prev_date, next_date) = available.neighbors(&date);
    let (prev_date, next_date) = (prev_date.map(str::to_string), next_date.map(str::to_string));

    let predictions = db.predictions(&date)?;
    let results = db.results(&date)?;
    let lookup = ResultLookup::build(&results);
    let all: Vec<GradedGame> = predictions
        .iter()
        .map(|p| GradedGame::new(p, lookup.find(p)))
        .collect();

    let mut record = AtsRecord::default();
    for game in &all {
        if let Some(ats) = game.ats_result {
            if game.has_book && game.pick_prob_edge * 100.0 >= query.edge_min {
                record.record(ats);
            }
        }
    }

    let search = query
        .search
        .as_ref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());
    let mut games: Vec<GradedGame> = all
        .iter()
        .filter(|g| search.as_ref().map_or(true, |q| g.matches(q)))
        .filter(|g| query.filter.keeps(g.ats_result))
        .cloned()
        .collect();
    games.sort_by(history_order);

    Ok(Some(HistoryView {
        date,
        prev_date,
        next_date,
        game_count: all.len(),
        stats: record.line(),
        games,
    }))
}

/// Picks with a book and at least this probability edge are featured.
pub const FEATURED_EDGE: f64 = 0.10;

/// The latest prediction date as it stands before any game is final.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slate {
    pub date: String,
    pub featured: Vec<GradedGame>,
    pub games: Vec<GradedGame>,
}

pub fn slate(date: &str, predictions: &[Prediction]) -> Slate {
    let mut games: Vec<GradedGame> = predictions
        .iter()
        .map(|p| GradedGame::new(p, None))
        .collect();
    games.sort_by(history_order);
    let featured = games
        .iter()
        .filter(|g| g.has_book && g.pick_prob_edge >= FEATURED_EDGE)
        .cloned()
        .collect();
    Slate {
        date: date.to_string(),
        featured,
        games,
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

pub fn render_summary(summary: &Summary) -> String {
    format!(
        "{:<10} games {:>4}  mae {:>7}  mse {:>8}  bias {:>7}  ats {:>8} ({:>6})  units {:>7}  roi {:>7}",
        summary.label,
        summary.game_count,
        fmt_number(summary.mae),
        fmt_number(summary.mse),
        fmt_number(summary.mean_error),
        summary.ats.record.to_string(),
        fmt_percent(summary.ats.win_rate),
        fmt_units(summary.ats.units),
        fmt_roi(summary.ats.roi),
    )
}

pub fn render_lifetime(summary: &Summary) -> String {
    let mut out = String::new();
    let rows = [
        ("MAE", fmt_number(summary.mae)),
        ("MSE", fmt_number(summary.mse)),
        ("Mean error", fmt_number(summary.mean_error)),
        ("ATS record", summary.ats.record.to_string()),
        ("ATS win %", fmt_percent(summary.ats.win_rate)),
        ("Units", fmt_units(summary.ats.units)),
        ("ROI", fmt_roi(summary.ats.roi)),
        (
            "Edge record",
            format!("{} (edge > {})", summary.edge_ats.record, summary.edge_cutoff),
        ),
        ("Edge win %", fmt_percent(summary.edge_ats.win_rate)),
        ("Edge units", fmt_units(summary.edge_ats.units)),
        ("Sigma ratio", fmt_number(summary.sigma_ratio)),
        ("Within 1 sigma", fmt_percent(summary.within_one_sigma)),
    ];
    for (label, value) in &rows {
        // writing to a String cannot fail
        let _ = writeln!(out, "{:<16}{}", label, value);
    }
    out
}

pub fn render_history(view: &HistoryView) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}  (prev {}, next {})",
        display_date(&view.date),
        view.prev_date.as_deref().unwrap_or(NO_DATA),
        view.next_date.as_deref().unwrap_or(NO_DATA),
    );
    let _ = writeln!(
        out,
        "record {}  win rate {}  units {}  roi {}  bets {}  ({} games)",
        if view.stats.record.bets() > 0 {
            view.stats.record.to_string()
        } else {
            NO_DATA.to_string()
        },
        fmt_percent(view.stats.win_rate),
        fmt_units(view.stats.units),
        fmt_roi(view.stats.roi),
        view.stats.record.bets(),
        view.game_count,
    );
    for game in &view.games {
        let score = match (game.away_score, game.home_score) {
            (Some(away), Some(home)) => format!("{}-{}", away, home),
            _ => NO_DATA.to_string(),
        };
        let _ = writeln!(
            out,
            "{:<40} {:>9}  {:<24} book {:>6}  model {:>6}  {:<5} edge {:>5.1}%",
            format!("{} @ {}", game.away_team, game.home_team),
            score,
            game.pick_team,
            fmt_spread(game.market_spread_home),
            fmt_spread(game.model_line),
            game.ats_result.map_or_else(|| NO_DATA.to_string(), |r| r.to_string()),
            game.pick_prob_edge * 100.0,
        );
    }
    out
}

pub fn render_slate(slate: &Slate) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}  {} games, {} featured",
        display_date(&slate.date),
        slate.games.len(),
        slate.featured.len()
    );
    for game in &slate.games {
        let diff = match (game.model_line, game.market_spread_home) {
            (Some(model), Some(book)) => Some((model - book).abs()),
            _ => None,
        };
        let _ = writeln!(
            out,
            "{} {:<40} book {:>6}  {:<24} model {:>6}  diff {:>5}  edge {:>5.1}%",
            if slate.featured.contains(game) { '*' } else { ' ' },
            format!("{} @ {}", game.away_team, game.home_team),
            fmt_spread(game.market_spread_home),
            game.pick_team,
            fmt_spread(game.model_line),
            diff.map_or_else(|| NO_DATA.to_string(), |d| format!("{:.1}", d)),
            game.pick_prob_edge * 100.0,
        );
    }
    out
}

pub fn render_cumulative(points: &[CumulativePoint]) -> String {
    let mut out = String::new();
    for point in points {
        let _ = writeln!(out, "{}  {}", point.week, fmt_units(Some(point.units)));
    }
    out
}

pub fn render_rankings(teams: &[&RankedTeam]) -> String {
    let mut out = String::new();
    for team in teams {
        let _ = writeln!(
            out,
            "{:>4}  {:<28} {:<8} {:>6}  {:>6.1} {:>6.1} {:>+6.1} {:>5.1}  {}",
            team.rank.map_or_else(|| NO_DATA.to_string(), |r| r.to_string()),
            team.team,
            team.conference,
            team.record,
            team.adj_oe,
            team.adj_de,
            team.adj_margin,
            team.adj_tempo,
            fmt_number(team.edge_index),
        );
    }
    out
}
