//! Completion scores reported by the final stations.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One reported score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Score {
    pub username: String,
    pub value: i64,
    pub recorded_at: DateTime<Utc>,
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.username, self.value)
    }
}

/// Scores in arrival order.
#[derive(Debug, Default)]
pub struct ScoreBoard {
    scores: Vec<Score>,
}

impl ScoreBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, username: impl Into<String>, value: i64) -> &Score {
        let index = self.scores.len();
        self.scores.push(Score {
            username: username.into(),
            value,
            recorded_at: Utc::now(),
        });
        &self.scores[index]
    }

    /// The best `limit` scores, highest first. Ties keep arrival order.
    pub fn leaderboard(&self, limit: usize) -> Vec<&Score> {
        let mut ranked: Vec<&Score> = self.scores.iter().collect();
        ranked.sort_by(|a, b| b.value.cmp(&a.value));
        ranked.truncate(limit);
        ranked
    }

    pub fn iter(&self) -> impl Iterator<Item = &Score> {
        self.scores.iter()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
