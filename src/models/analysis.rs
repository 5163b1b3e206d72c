use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Buy,
    Wait,
    Sell,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Buy => "BUY",
            Decision::Wait => "WAIT",
            Decision::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::High => write!(f, "High"),
            Confidence::Medium => write!(f, "Medium"),
            Confidence::Low => write!(f, "Low"),
        }
    }
}

/// Price levels exactly as the model phrased them. Not parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingPlan {
    pub entry_area: String,
    pub target_price: String,
    pub stop_loss: String,
    pub risk_reward_ratio: String,
}

/// A recommendation produced by the inference service (or the demo path).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub decision: Decision,
    pub confidence_score: Confidence,
    #[serde(default)]
    pub is_demo: bool,
    pub summary: String,
    pub trading_plan: TradingPlan,
}

impl AnalysisRecord {
    /// Canned record served when demo mode is on.
    pub fn demo() -> Self {
        Self {
            decision: Decision::Wait,
            confidence_score: Confidence::Medium,
            is_demo: true,
            summary: "Demo analysis: price is ranging between clear support and resistance. \
                      Wait for a decisive break before committing."
                .to_string(),
            trading_plan: TradingPlan {
                entry_area: "Break and retest of range high".to_string(),
                target_price: "Next resistance above the range".to_string(),
                stop_loss: "Below the range midpoint".to_string(),
                risk_reward_ratio: "1:2".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_json_shape() {
        let raw = r#"{
            "decision": "SELL",
            "confidenceScore": "Low",
            "summary": "Lower highs into resistance",
            "tradingPlan": {
                "entryArea": "1.0850 - 1.0860",
                "targetPrice": "1.0800",
                "stopLoss": "1.0885",
                "riskRewardRatio": "1:2"
            }
        }"#;
        let rec: AnalysisRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(rec.decision, Decision::Sell);
        assert_eq!(rec.confidence_score, Confidence::Low);
        assert!(!rec.is_demo);
        assert_eq!(rec.trading_plan.stop_loss, "1.0885");
    }

    #[test]
    fn rejects_unknown_decision() {
        let raw = r#"{"decision":"HOLD","confidenceScore":"High","summary":"",
            "tradingPlan":{"entryArea":"","targetPrice":"","stopLoss":"","riskRewardRatio":""}}"#;
        assert!(serde_json::from_str::<AnalysisRecord>(raw).is_err());
    }

    #[test]
    fn demo_record_is_flagged() {
        assert!(AnalysisRecord::demo().is_demo);
        assert_eq!(Decision::Buy.to_string(), "BUY");
    }
}
