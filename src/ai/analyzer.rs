use thiserror::Error;
use tracing::{info, warn};

use crate::ai::{ChartImage, RetryExecutor, ServiceError, VisionModel};
use crate::models::{AnalysisRecord, TradeMode};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("malformed AI response: {0}")]
    MalformedResponse(String),
}

impl AnalysisError {
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::InvalidRequest(msg) => msg.clone(),
            AnalysisError::Service(err) => err.user_message(),
            AnalysisError::MalformedResponse(_) => {
                "The AI returned an unreadable answer. Please try again.".to_string()
            }
        }
    }
}

/// One analysis request. Two images means higher-timeframe first, then
/// the lower-timeframe entry chart.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub mode: TradeMode,
    pub images: Vec<ChartImage>,
    pub context: Option<String>,
}

impl AnalysisRequest {
    pub fn single(mode: TradeMode, image: ChartImage) -> Self {
        Self {
            mode,
            images: vec![image],
            context: None,
        }
    }

    pub fn confluence(mode: TradeMode, higher_tf: ChartImage, lower_tf: ChartImage) -> Self {
        Self {
            mode,
            images: vec![higher_tf, lower_tf],
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.context = if context.trim().is_empty() {
            None
        } else {
            Some(context)
        };
        self
    }

    pub fn is_confluence(&self) -> bool {
        self.images.len() == 2
    }

    /// One or two non-empty images.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        match self.images.len() {
            1 | 2 => {}
            0 => return Err(AnalysisError::InvalidRequest("Please upload a chart image.".into())),
            n => {
                return Err(AnalysisError::InvalidRequest(format!(
                    "At most two charts can be analyzed at once, got {n}."
                )))
            }
        }
        if let Some(img) = self.images.iter().find(|i| i.bytes.is_empty()) {
            return Err(AnalysisError::InvalidRequest(format!(
                "Image '{}' is empty.",
                img.file_name
            )));
        }
        Ok(())
    }
}

const RESPONSE_FORMAT: &str = r#"Respond with a single JSON object and nothing else:
{
  "decision": "BUY" | "WAIT" | "SELL",
  "confidenceScore": "High" | "Medium" | "Low",
  "summary": "two or three sentences explaining the decision",
  "tradingPlan": {
    "entryArea": "price or zone",
    "targetPrice": "price",
    "stopLoss": "price",
    "riskRewardRatio": "e.g. 1:2"
  }
}"#;

fn mode_guidance(mode: TradeMode) -> &'static str {
    match mode {
        TradeMode::Scalping => {
            "You are a disciplined scalper. Focus on short-term momentum, nearby \
             liquidity and tight invalidation. Only recommend BUY or SELL when the \
             setup offers a clean entry with a stop close to structure; otherwise WAIT."
        }
        TradeMode::Swing => {
            "You are a patient swing trader. Focus on market structure, trend \
             direction and key higher-timeframe levels. Prefer WAIT unless price is \
             at a meaningful level with a favourable risk-reward of at least 1:2."
        }
    }
}

pub fn build_prompt(request: &AnalysisRequest) -> String {
    let mut prompt = String::from(mode_guidance(request.mode));
    prompt.push_str("\n\n");
    if request.is_confluence() {
        prompt.push_str(
            "Two charts are attached. The first is the higher timeframe, the second \
             the lower timeframe. Only recommend a trade when both timeframes agree \
             (confluence); if they conflict, the decision must be WAIT.",
        );
    } else {
        prompt.push_str("One chart is attached. Read the visible price action and levels.");
    }
    if let Some(ctx) = &request.context {
        prompt.push_str("\n\nAdditional context from the trader: ");
        prompt.push_str(ctx.trim());
    }
    prompt.push_str("\n\n");
    prompt.push_str(RESPONSE_FORMAT);
    prompt
}

/// Pull the JSON object out of a reply that may be fenced or surrounded by prose.
pub fn parse_response(raw: &str) -> Result<AnalysisRecord, AnalysisError> {
    let start = raw.find('{');
    let end = raw.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if e > s => &raw[s..=e],
        _ => return Err(AnalysisError::MalformedResponse("no JSON object found".into())),
    };
    let mut record: AnalysisRecord = serde_json::from_str(json)
        .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;
    record.is_demo = false;
    Ok(record)
}

pub struct ChartAnalyzer<M: VisionModel> {
    model: M,
    executor: RetryExecutor,
    demo_mode: bool,
}

impl<M: VisionModel> ChartAnalyzer<M> {
    pub fn new(model: M, executor: RetryExecutor, demo_mode: bool) -> Self {
        Self {
            model,
            executor,
            demo_mode,
        }
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisRecord, AnalysisError> {
        request.validate()?;

        if self.demo_mode {
            info!("Demo mode: returning simulated {} analysis", request.mode);
            return Ok(AnalysisRecord::demo());
        }

        let prompt = build_prompt(request);
        let model = &self.model;
        let images = request.images.as_slice();
        let prompt_ref = prompt.as_str();

        let raw = self
            .executor
            .execute(move || model.generate(prompt_ref, images), "chart analysis")
            .await?;

        parse_response(&raw).inspect_err(|e| warn!("Discarding AI reply: {}", e))
    }
}
