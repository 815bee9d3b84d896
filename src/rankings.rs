//! Externally produced power rankings. Read, coerced and passed through; this
//! crate never computes a ranking.

use crate::read_dir::{read_json, RANKINGS_FILE};
use crate::record::{lenient_integer, lenient_number, lenient_number_or_zero, lenient_text};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RankingSnapshot {
    #[serde(default, deserialize_with = "lenient_text")]
    pub generated_at: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub as_of_date: String,
    #[serde(default, deserialize_with = "lenient_integer")]
    pub season: Option<i64>,
    #[serde(default)]
    pub teams: Vec<RankedTeam>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RankedTeam {
    #[serde(default, deserialize_with = "lenient_integer")]
    pub rank: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub team: String,
    #[serde(default, deserialize_with = "lenient_integer")]
    pub team_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub conference: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub record: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub conf_record: String,
    #[serde(default, deserialize_with = "lenient_number_or_zero")]
    pub adj_oe: f64,
    #[serde(default, deserialize_with = "lenient_number_or_zero")]
    pub adj_de: f64,
    #[serde(default, deserialize_with = "lenient_number_or_zero")]
    pub adj_margin: f64,
    #[serde(default, deserialize_with = "lenient_number_or_zero")]
    pub adj_tempo: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub edge_index: Option<f64>,
}

impl RankedTeam {
    /// Leading number of a `W-L` record, `0` when unparseable.
    pub fn wins(&self) -> u32 {
        self.record
            .split('-')
            .next()
            .and_then(|w| w.trim().parse().ok())
            .unwrap_or(0)
    }
}

/// Reads `rankings.json` from the data directory. `None` when absent.
pub fn load(data_dir: &Path) -> Result<Option<RankingSnapshot>> {
    let path = data_dir.join(RANKINGS_FILE);
    match read_json(&path)? {
        None => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .with_context(|| format!("unexpected ranking snapshot shape in {}", path.display())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Rank,
    Team,
    Conference,
    Record,
    AdjOe,
    AdjDe,
    AdjMargin,
    AdjTempo,
    EdgeIndex,
}

impl SortKey {
    /// Direction a fresh sort on this column starts in.
    pub fn default_direction(self) -> Direction {
        match self {
            SortKey::Rank | SortKey::Team | SortKey::Conference | SortKey::AdjDe => Direction::Asc,
            _ => Direction::Desc,
        }
    }

    fn compare(self, a: &RankedTeam, b: &RankedTeam) -> Ordering {
        match self {
            SortKey::Rank => a.rank.cmp(&b.rank),
            SortKey::Team => a.team.cmp(&b.team),
            SortKey::Conference => a.conference.cmp(&b.conference),
            SortKey::Record => a.wins().cmp(&b.wins()),
            SortKey::AdjOe => a.adj_oe.total_cmp(&b.adj_oe),
            SortKey::AdjDe => a.adj_de.total_cmp(&b.adj_de),
            SortKey::AdjMargin => a.adj_margin.total_cmp(&b.adj_margin),
            SortKey::AdjTempo => a.adj_tempo.total_cmp(&b.adj_tempo),
            SortKey::EdgeIndex => a
                .edge_index
                .unwrap_or(0.0)
                .total_cmp(&b.edge_index.unwrap_or(0.0)),
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<SortKey, String> {
        Ok(match s {
            "rank" => SortKey::Rank,
            "team" => SortKey::Team,
            "conference" => SortKey::Conference,
            "record" => SortKey::Record,
            "adj_oe" => SortKey::AdjOe,
            "adj_de" => SortKey::AdjDe,
            "adj_margin" => SortKey::AdjMargin,
            "adj_tempo" => SortKey::AdjTempo,
            "edge_index" => SortKey::EdgeIndex,
            other => return Err(format!("unknown ranking column {:?}", other)),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Stable sort, so ties keep snapshot order.
pub fn sort(teams: &mut [&RankedTeam], key: SortKey, direction: Direction) {
    teams.sort_by(|a, b| {
        let ord = key.compare(a, b);
        match direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    });
}

/// Teams matching a case-insensitive name search and an optional conference,
/// in snapshot order.
pub fn filter<'a>(
    snapshot: &'a RankingSnapshot,
    search: Option<&str>,
    conference: Option<&str>,
) -> Vec<&'a RankedTeam> {
    let query = search
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());
    snapshot
        .teams
        .iter()
        .filter(|t| {
            query
                .as_ref()
                .map_or(true, |q| t.team.to_lowercase().contains(q.as_str()))
        })
        .filter(|t| conference.map_or(true, |c| t.conference == c))
        .collect()
}

/// Distinct non-empty conferences, sorted.
pub fn conferences(snapshot: &RankingSnapshot) -> Vec<&str> {
    let mut list: Vec<&str> = snapshot
        .teams
        .iter()
        .map(|t| t.conference.as_str())
        .filter(|c| !c.is_empty())
        .collect();
    list.sort_unstable();
    list.dedup();
    list
}
