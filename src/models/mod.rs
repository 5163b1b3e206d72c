pub mod analysis;
pub mod journal_entry;

pub use analysis::{AnalysisRecord, Confidence, Decision, TradingPlan};
pub use journal_entry::{JournalEntry, Outcome, TradeMode};
