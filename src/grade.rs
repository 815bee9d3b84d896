use crate::lookup::ResultLookup;
use crate::record::{GameResult, Prediction, Side};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AtsResult {
    Win,
    Loss,
    Push,
}

impl fmt::Display for AtsResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AtsResult::Win => "win",
            AtsResult::Loss => "loss",
            AtsResult::Push => "push",
        })
    }
}

/// A prediction paired with its outcome.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Grade {
    pub actual_margin: f64,
    /// `model_mu_home - actual_margin`; positive means the model overrated home.
    pub model_error: Option<f64>,
    pub cover: Option<f64>,
    pub ats: Option<AtsResult>,
    pub sigma_error: Option<f64>,
    pub pick_prob_edge: Option<f64>,
}

/// Every graded record for one date, plus how many rows the date carried.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DateGrades {
    pub date: String,
    pub games: usize,
    pub grades: Vec<Grade>,
}

pub fn cover(actual_margin: f64, market_spread_home: f64) -> f64 {
    actual_margin + market_spread_home
}

/// Side that beat the number, `None` on an exact push. No tolerance is applied.
#[allow(clippy::float_cmp)]
pub fn covering_side(cover: f64) -> Option<Side> {
    if cover == 0.0 {
        None
    } else if cover > 0.0 {
        Some(Side::Home)
    } else {
        Some(Side::Away)
    }
}

pub fn ats_result(pick: Side, cover: f64) -> AtsResult {
    match covering_side(cover) {
        None => AtsResult::Push,
        Some(side) if side == pick => AtsResult::Win,
        Some(_) => AtsResult::Loss,
    }
}

pub fn model_error(model_mu_home: f64, actual_margin: f64) -> f64 {
    model_mu_home - actual_margin
}

pub fn sigma_error(model_error: f64, pred_sigma: Option<f64>) -> Option<f64> {
    let sigma = pred_sigma.filter(|s| s.is_finite() && *s > 0.0)?;
    Some(model_error.abs() / sigma)
}

/// Grades one pair. `None` when the result carries no usable margin.
pub fn grade(prediction: &Prediction, result: &GameResult) -> Option<Grade> {
    let actual_margin = result.margin_home?;
    let model_error = prediction
        .model_mu_home
        .map(|mu| model_error(mu, actual_margin));
    let cover = prediction
        .market_spread_home
        .map(|spread| cover(actual_margin, spread));
    let ats = match (prediction.pick_side, cover) {
        (Some(pick), Some(cover)) => Some(ats_result(pick, cover)),
        _ => None,
    };
    let grade = Grade {
        actual_margin,
        model_error,
        cover,
        ats,
        sigma_error: model_error.and_then(|e| sigma_error(e, prediction.pred_sigma)),
        pick_prob_edge: prediction.pick_prob_edge,
    };
    trace!(teams = ?prediction.teams, ?grade);
    Some(grade)
}

/// Grades every prediction that joins to a result, in prediction order.
pub fn grade_all(predictions: &[Prediction], results: &[GameResult]) -> Vec<Grade> {
    let lookup = ResultLookup::build(results);
    predictions
        .iter()
        .filter_map(|prediction| grade(prediction, lookup.find(prediction)?))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{ats_result, grade, grade_all, sigma_error, AtsResult};
    use crate::record::{GameResult, Prediction, Side};
    use crate::util::AwayHome;
    use assert_approx_eq::assert_approx_eq;

    fn prediction(pick: Side, spread: Option<f64>) -> Prediction {
        Prediction {
            teams: AwayHome {
                away: "Duke".to_string(),
                home: "UNC".to_string(),
            },
            pick_label: pick.to_string(),
            pick_side: Some(pick),
            model_mu_home: Some(6.0),
            market_spread_home: spread,
            pred_sigma: Some(10.0),
            pick_prob_edge: Some(0.12),
            ..Prediction::default()
        }
    }

    fn result(margin: f64) -> GameResult {
        GameResult {
            teams: AwayHome {
                away: "duke".to_string(),
                home: "unc".to_string(),
            },
            margin_home: Some(margin),
            ..GameResult::default()
        }
    }

    #[test]
    fn test_push_on_exact_cover() {
        let g = grade(&prediction(Side::Home, Some(-3.5)), &result(3.5)).unwrap();
        assert_eq!(g.cover, Some(0.0));
        assert_eq!(g.ats, Some(AtsResult::Push));
    }

    #[test]
    fn test_win_and_loss() {
        let g = grade(&prediction(Side::Home, Some(-3.5)), &result(10.0)).unwrap();
        assert_approx_eq!(g.cover.unwrap(), 6.5);
        assert_eq!(g.ats, Some(AtsResult::Win));

        let g = grade(&prediction(Side::Home, Some(-3.5)), &result(-2.0)).unwrap();
        assert_approx_eq!(g.cover.unwrap(), -5.5);
        assert_eq!(g.ats, Some(AtsResult::Loss));

        let g = grade(&prediction(Side::Away, Some(-3.5)), &result(-2.0)).unwrap();
        assert_eq!(g.ats, Some(AtsResult::Win));
    }

    #[test]
    fn test_ats_result_table() {
        assert_eq!(ats_result(Side::Away, 0.0), AtsResult::Push);
        assert_eq!(ats_result(Side::Away, 0.5), AtsResult::Loss);
        assert_eq!(ats_result(Side::Home, 0.5), AtsResult::Win);
        assert_eq!(ats_result(Side::Away, -0.5), AtsResult::Win);
    }

    #[test]
    fn test_no_book_is_never_graded_ats() {
        for margin in &[-10.0, 0.0, 3.5, 10.0] {
            let g = grade(&prediction(Side::Home, None), &result(*margin)).unwrap();
            assert_eq!(g.cover, None);
            assert_eq!(g.ats, None);
        }
    }

    #[test]
    fn test_invalid_pick_side() {
        let mut p = prediction(Side::Home, Some(-3.5));
        p.pick_side = None;
        let g = grade(&p, &result(10.0)).unwrap();
        assert_eq!(g.ats, None);
        assert_approx_eq!(g.cover.unwrap(), 6.5);
    }

    #[test]
    fn test_model_and_sigma_error() {
        let g = grade(&prediction(Side::Home, Some(-3.5)), &result(10.0)).unwrap();
        assert_approx_eq!(g.model_error.unwrap(), -4.0);
        assert_approx_eq!(g.sigma_error.unwrap(), 0.4);
        assert_eq!(sigma_error(4.0, Some(0.0)), None);
        assert_eq!(sigma_error(4.0, Some(-2.0)), None);
        assert_eq!(sigma_error(4.0, None), None);
    }

    #[test]
    fn test_missing_margin_is_ungraded() {
        let r = GameResult {
            margin_home: None,
            ..result(0.0)
        };
        assert_eq!(grade(&prediction(Side::Home, Some(-3.5)), &r), None);
    }

    #[test]
    fn test_grade_all_skips_unjoined() {
        let mut other = prediction(Side::Away, Some(2.0));
        other.teams.home = "Kansas".to_string();
        let grades = grade_all(&[other, prediction(Side::Home, Some(-3.5))], &[result(10.0)]);
        assert_eq!(grades.len(), 1);
        assert_eq!(grades[0].ats, Some(AtsResult::Win));
    }
}
