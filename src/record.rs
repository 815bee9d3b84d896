//! The ingestion boundary: every accepted spelling of a field is mapped onto one
//! canonical struct here, immediately after parsing.

use crate::util::{normalize_team, slugify, AwayHome};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub type Row = Map<String, Value>;

const EDGE_KEYS: &[&str] = &[
    "edge_home_points",
    "edge_points",
    "edge_home",
    "edge",
    "pred_edge",
    "predicted_edge",
    "edgeHome",
];
const PROB_EDGE_KEYS: &[&str] = &["pick_prob_edge", "pickProbEdge"];
const MODEL_KEYS: &[&str] = &["model_mu_home", "modelMuHome", "model_home_spread"];
const SPREAD_KEYS: &[&str] = &["market_spread_home", "home_spread_num", "spread_home"];
const SIGMA_KEYS: &[&str] = &["pred_sigma", "predSigma"];
const PICK_SIDE_KEYS: &[&str] = &["pick_side", "pickSide"];
const GAME_ID_KEYS: &[&str] = &["game_id", "gameId"];
const DATE_KEYS: &[&str] = &["date", "game_date", "gameDate"];
const HOME_TEAM_KEYS: &[&str] = &["home_team", "home_team_name", "team_home", "home", "teamHome"];
const AWAY_TEAM_KEYS: &[&str] = &["away_team", "away_team_name", "team_away", "away", "teamAway"];
const MARGIN_KEYS: &[&str] = &["margin_home", "actual_margin", "result_home", "marginHome"];
const HOME_SCORE_KEYS: &[&str] = &["score_home", "home_score", "scoreHome", "homeScore"];
const AWAY_SCORE_KEYS: &[&str] = &["score_away", "away_score", "scoreAway", "awayScore"];

/// Permissive numeric coercion. Numbers pass through, strings are trimmed and
/// parsed. Empty, non-numeric and non-finite values are absent.
pub fn parse_number(value: &Value) -> Option<f64> {
    let x = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok()?
        }
        _ => return None,
    };
    if x.is_finite() {
        Some(x)
    } else {
        None
    }
}

pub fn first_number(row: &Row, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| row.get(*key))
        .find_map(parse_number)
}

pub fn first_text<'a>(row: &'a Row, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| row.get(*key)?.as_str())
        .find(|s| !s.trim().is_empty())
}

/// Model edge in points, `0` when the row carries none.
pub fn edge_points(row: &Row) -> f64 {
    first_number(row, EDGE_KEYS).unwrap_or(0.0)
}

pub fn pick_prob_edge(row: &Row) -> Option<f64> {
    first_number(row, PROB_EDGE_KEYS)
}

/// Display names, empty when unresolved.
pub fn teams(row: &Row) -> AwayHome<String> {
    AwayHome {
        away: first_text(row, AWAY_TEAM_KEYS).unwrap_or_default().to_string(),
        home: first_text(row, HOME_TEAM_KEYS).unwrap_or_default().to_string(),
    }
}

pub fn scores(row: &Row) -> Option<AwayHome<f64>> {
    Some(AwayHome {
        away: first_number(row, AWAY_SCORE_KEYS)?,
        home: first_number(row, HOME_SCORE_KEYS)?,
    })
}

/// Home-minus-away margin, read directly or derived from the two scores.
pub fn actual_margin(row: &Row) -> Option<f64> {
    first_number(row, MARGIN_KEYS).or_else(|| scores(row).map(|s| s.home_margin()))
}

/// Explicit identifier if present, else a slug of date and teams when the row
/// is dated.
pub fn game_key(row: &Row) -> Option<String> {
    let explicit = GAME_ID_KEYS.iter().find_map(|key| match row.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    explicit.or_else(|| {
        let date = first_text(row, DATE_KEYS)?;
        let teams = teams(row);
        if teams.away.is_empty() || teams.home.is_empty() {
            return None;
        }
        Some(slugify(&format!("{}_{}_{}", date, teams.away, teams.home)))
    })
}

/// `"{away}__{home}"` over normalized names, when both names resolve.
pub fn team_key(teams: &AwayHome<String>) -> Option<String> {
    let teams = teams.map(|name| normalize_team(name));
    if teams.away.is_empty() || teams.home.is_empty() {
        None
    } else {
        Some(format!("{}__{}", teams.away, teams.home))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Home,
    Away,
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Side, String> {
        match s.trim().to_uppercase().as_str() {
            "HOME" => Ok(Side::Home),
            "AWAY" => Ok(Side::Away),
            other => Err(format!("unknown side {:?}", other)),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Home => "HOME",
            Side::Away => "AWAY",
        })
    }
}

/// One scheduled matchup as the model saw it.
///
/// `model_mu_home` is read as the expected home margin: positive means the
/// model has the home side winning by that many points.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct Prediction {
    pub game_key: Option<String>,
    pub teams: AwayHome<String>,
    /// Upper-cased raw pick, kept for display even when it is not a valid side.
    pub pick_label: String,
    pub pick_side: Option<Side>,
    pub model_mu_home: Option<f64>,
    pub market_spread_home: Option<f64>,
    pub pred_sigma: Option<f64>,
    pub pick_prob_edge: Option<f64>,
    pub edge_points: f64,
}

impl Prediction {
    pub fn from_row(row: &Row) -> Prediction {
        let pick_label = first_text(row, PICK_SIDE_KEYS)
            .unwrap_or_default()
            .trim()
            .to_uppercase();
        Prediction {
            game_key: game_key(row),
            teams: teams(row),
            pick_side: pick_label.parse().ok(),
            pick_label,
            model_mu_home: first_number(row, MODEL_KEYS),
            market_spread_home: first_number(row, SPREAD_KEYS),
            pred_sigma: first_number(row, SIGMA_KEYS),
            pick_prob_edge: pick_prob_edge(row),
            edge_points: edge_points(row),
        }
    }

    pub fn from_value(value: &Value) -> Prediction {
        value.as_object().map(Prediction::from_row).unwrap_or_default()
    }

    pub fn team_key(&self) -> Option<String> {
        team_key(&self.teams)
    }

    pub fn has_book(&self) -> bool {
        self.market_spread_home.is_some()
    }

    pub fn pick_team(&self) -> &str {
        match self.pick_side {
            Some(Side::Home) => &self.teams.home,
            _ => &self.teams.away,
        }
    }

    /// Model line in sportsbook convention (negative when home is favored).
    pub fn model_line(&self) -> Option<f64> {
        self.model_mu_home.map(|mu| -mu)
    }
}

/// One completed matchup.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct GameResult {
    pub game_key: Option<String>,
    pub teams: AwayHome<String>,
    pub score: Option<AwayHome<f64>>,
    pub margin_home: Option<f64>,
}

impl GameResult {
    pub fn from_row(row: &Row) -> GameResult {
        GameResult {
            game_key: game_key(row),
            teams: teams(row),
            score: scores(row),
            margin_home: actual_margin(row),
        }
    }

    pub fn from_value(value: &Value) -> GameResult {
        value.as_object().map(GameResult::from_row).unwrap_or_default()
    }

    pub fn team_key(&self) -> Option<String> {
        team_key(&self.teams)
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

pub fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(parse_number(&Value::deserialize(deserializer)?))
}

pub fn lenient_number_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(deserializer)?.unwrap_or(0.0))
}

#[allow(clippy::cast_possible_truncation)]
pub fn lenient_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(deserializer)?
        .filter(|x| x.fract() == 0.0)
        .map(|x| x as i64))
}

pub fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
