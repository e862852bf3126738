// src/models/streak.rs

use serde::{Deserialize, Serialize};

/// Daily study streak as read from GET /streak and returned by
/// POST /streak/update. `weekly_progress` always carries seven entries,
/// Monday first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakData {
    pub current_streak: u32,
    pub record_streak: u32,
    #[serde(default)]
    pub weekly_progress: Vec<u32>,
}

/// Lifetime answer counters from GET /user-answers/stats/:userId.
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerStats {
    pub total: u32,
    pub correct: u32,
}
