use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{JournalEntry, Outcome, TradeMode};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StreakType {
    Win,
    Loss,
    #[default]
    None,
}

impl fmt::Display for StreakType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreakType::Win => write!(f, "WIN"),
            StreakType::Loss => write!(f, "LOSS"),
            StreakType::None => write!(f, "NONE"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeStats {
    pub total: usize,
    pub resolved: usize,
    pub wins: usize,
    pub win_rate: f64,
}

/// Aggregates over the whole journal. Derived on demand, never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalStats {
    pub total_entries: usize,
    pub wins: usize,
    pub losses: usize,
    pub breakevens: usize,
    pub pending: usize,
    /// Percent of resolved trades (WIN, LOSS, BREAKEVEN) that won.
    pub win_rate: f64,
    pub scalping: ModeStats,
    pub swing: ModeStats,
    pub current_streak: usize,
    pub streak_type: StreakType,
    pub total_pnl: f64,
    pub avg_pnl: f64,
    pub pnl_count: usize,
}

fn win_rate(wins: usize, resolved: usize) -> f64 {
    if resolved == 0 {
        0.0
    } else {
        wins as f64 / resolved as f64 * 100.0
    }
}

fn mode_stats(entries: &[JournalEntry], mode: TradeMode) -> ModeStats {
    let of_mode: Vec<&JournalEntry> = entries.iter().filter(|e| e.mode == mode).collect();
    let resolved = of_mode.iter().filter(|e| e.outcome.is_resolved()).count();
    let wins = of_mode.iter().filter(|e| e.outcome == Outcome::Win).count();
    ModeStats {
        total: of_mode.len(),
        resolved,
        wins,
        win_rate: win_rate(wins, resolved),
    }
}

/// Run of identical WIN/LOSS results counted back from the most recent one.
/// PENDING and BREAKEVEN entries are ignored.
pub fn current_streak(entries: &[JournalEntry]) -> (usize, StreakType) {
    let mut decided: Vec<&JournalEntry> = entries
        .iter()
        .filter(|e| matches!(e.outcome, Outcome::Win | Outcome::Loss))
        .collect();
    // Stable: ties keep storage (newest-first) order.
    decided.sort_by(|a, b| b.last_activity().cmp(&a.last_activity()));

    let Some(first) = decided.first() else {
        return (0, StreakType::None);
    };
    let outcome = first.outcome;
    let len = decided.iter().take_while(|e| e.outcome == outcome).count();
    let kind = if outcome == Outcome::Win {
        StreakType::Win
    } else {
        StreakType::Loss
    };
    (len, kind)
}

impl JournalStats {
    pub fn from_entries(entries: &[JournalEntry]) -> Self {
        let count = |o: Outcome| entries.iter().filter(|e| e.outcome == o).count();
        let wins = count(Outcome::Win);
        let losses = count(Outcome::Loss);
        let breakevens = count(Outcome::Breakeven);
        let pending = count(Outcome::Pending);

        let pnls: Vec<f64> = entries.iter().filter_map(|e| e.pnl).collect();
        let total_pnl: f64 = pnls.iter().sum();
        let avg_pnl = if pnls.is_empty() {
            0.0
        } else {
            total_pnl / pnls.len() as f64
        };

        let (current_streak, streak_type) = current_streak(entries);

        Self {
            total_entries: entries.len(),
            wins,
            losses,
            breakevens,
            pending,
            win_rate: win_rate(wins, wins + losses + breakevens),
            scalping: mode_stats(entries, TradeMode::Scalping),
            swing: mode_stats(entries, TradeMode::Swing),
            current_streak,
            streak_type,
            total_pnl,
            avg_pnl,
            pnl_count: pnls.len(),
        }
    }

    pub fn resolved(&self) -> usize {
        self.wins + self.losses + self.breakevens
    }
}
