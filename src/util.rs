use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct AwayHome<T> {
    pub away: T,
    pub home: T,
}

impl<T> AwayHome<T> {
    pub fn map<F, U>(&self, f: F) -> AwayHome<U>
    where
        F: Fn(&T) -> U,
    {
        AwayHome {
            away: f(&self.away),
            home: f(&self.home),
        }
    }
}

impl AwayHome<f64> {
    /// Strictly home minus away.
    pub fn home_margin(&self) -> f64 {
        self.home - self.away
    }
}

/// Join identity for a team name. Never used for display.
pub fn normalize_team(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_sep = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(c);
        } else {
            pending_sep = true;
        }
    }
    slug
}

pub fn mean(sum: f64, len: u32) -> Option<f64> {
    if len == 0 {
        None
    } else {
        Some(sum / f64::from(len))
    }
}
