use crate::record::{GameResult, Prediction};
use rustc_hash::FxHashMap;

/// Outcome rows indexed by game key and by normalized team pair.
#[derive(Debug, Default)]
pub struct ResultLookup<'a> {
    by_key: FxHashMap<String, &'a GameResult>,
}

impl<'a> ResultLookup<'a> {
    pub fn build(results: &'a [GameResult]) -> ResultLookup<'a> {
        let mut by_key = FxHashMap::default();
        for result in results {
            if let Some(key) = &result.game_key {
                by_key.insert(key.clone(), result);
            }
            if let Some(key) = result.team_key() {
                by_key.insert(key, result);
            }
        }
        ResultLookup { by_key }
    }

    /// Game key first, then the team pair. No fuzzy matching.
    pub fn find(&self, prediction: &Prediction) -> Option<&'a GameResult> {
        prediction
            .game_key
            .as_ref()
            .and_then(|key| self.by_key.get(key))
            .or_else(|| self.by_key.get(&prediction.team_key()?))
            .copied()
    }
}
