//! Session score history
//!
//! Every lost ball appends its score. The list survives resets for the whole
//! session; storing it across sessions is left to the host (it derives serde).

use serde::{Deserialize, Serialize};

/// Number of best scores shown on the scoreboard
pub const TOP_SCORES: usize = 3;

/// Append-only list of finished-ball scores plus the top-3 board
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ScoreHistory {
    /// Scores in the order they were recorded
    pub entries: Vec<u64>,
    /// Best scores, sorted descending (duplicates kept)
    pub top: Vec<u64>,
}

impl ScoreHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            top: Vec::with_capacity(TOP_SCORES + 1),
        }
    }

    /// Record a finished ball's score and update the board
    pub fn record(&mut self, score: u64) {
        self.entries.push(score);

        // Insert after equal scores so the list stays sorted descending
        let pos = self.top.iter().position(|&s| score > s).unwrap_or(self.top.len());
        if pos < TOP_SCORES {
            self.top.insert(pos, score);
            self.top.truncate(TOP_SCORES);
        }
    }

    /// Best score so far (if any)
    pub fn best(&self) -> Option<u64> {
        self.top.first().copied()
    }

    /// Check if nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
