use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::analysis::{AnalysisRecord, Confidence, Decision};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeMode {
    Scalping,
    Swing,
}

impl fmt::Display for TradeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeMode::Scalping => write!(f, "scalping"),
            TradeMode::Swing => write!(f, "swing"),
        }
    }
}

impl FromStr for TradeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scalping" | "scalp" => Ok(TradeMode::Scalping),
            "swing" => Ok(TradeMode::Swing),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Win,
    Loss,
    Breakeven,
    #[default]
    Pending,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Win => "WIN",
            Outcome::Loss => "LOSS",
            Outcome::Breakeven => "BREAKEVEN",
            Outcome::Pending => "PENDING",
        }
    }

    pub fn is_resolved(&self) -> bool {
        *self != Outcome::Pending
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "WIN" => Ok(Outcome::Win),
            "LOSS" => Ok(Outcome::Loss),
            "BREAKEVEN" | "BE" => Ok(Outcome::Breakeven),
            "PENDING" => Ok(Outcome::Pending),
            other => Err(format!("unknown outcome: {other}")),
        }
    }
}

/// One saved analysis. Serialized as the persisted journal schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub mode: TradeMode,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub image_file_name: String,
    pub decision: Decision,
    pub confidence: Confidence,
    pub analysis: AnalysisRecord,
    #[serde(default, deserialize_with = "outcome_or_pending")]
    pub outcome: Outcome,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub outcome_updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pnl: Option<f64>,
    #[serde(default)]
    pub is_confluence: bool,
}

impl JournalEntry {
    /// Timestamp the streak ordering uses.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.outcome_updated_at.unwrap_or(self.created_at)
    }
}

// A stored `null` outcome reads as PENDING.
fn outcome_or_pending<'de, D>(deserializer: D) -> Result<Outcome, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Outcome>::deserialize(deserializer)?.unwrap_or_default())
}
