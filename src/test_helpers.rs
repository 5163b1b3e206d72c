use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::ai::{ChartImage, ServiceError, VisionModel};
use crate::clock::Clock;
use crate::config::Config;
use crate::models::{AnalysisRecord, Confidence, Decision, JournalEntry, Outcome, TradeMode, TradingPlan};

pub const SAMPLE_REPLY: &str = r#"{
  "decision": "BUY",
  "confidenceScore": "High",
  "summary": "Higher low held at demand, momentum turning up.",
  "tradingPlan": {
    "entryArea": "1.0840 - 1.0845",
    "targetPrice": "1.0890",
    "stopLoss": "1.0825",
    "riskRewardRatio": "1:2.5"
  }
}"#;

pub fn default_test_config() -> Config {
    let mut cfg = Config::from_env();
    cfg.gemini_api_key = "test-key".to_string();
    cfg.demo_mode = false;
    cfg.journal_dir = std::env::temp_dir()
        .join(format!("chart_journal_test_{}", std::process::id()))
        .to_string_lossy()
        .to_string();
    cfg
}

pub fn sample_analysis() -> AnalysisRecord {
    AnalysisRecord {
        decision: Decision::Buy,
        confidence_score: Confidence::High,
        is_demo: false,
        summary: "Higher low held at demand, momentum turning up.".to_string(),
        trading_plan: TradingPlan {
            entry_area: "1.0840 - 1.0845".to_string(),
            target_price: "1.0890".to_string(),
            stop_loss: "1.0825".to_string(),
            risk_reward_ratio: "1:2.5".to_string(),
        },
    }
}

pub fn make_entry(id: &str, created_at: DateTime<Utc>, mode: TradeMode, outcome: Outcome) -> JournalEntry {
    let analysis = sample_analysis();
    JournalEntry {
        id: id.to_string(),
        created_at,
        mode,
        thumbnail: String::new(),
        image_file_name: "chart.png".to_string(),
        decision: analysis.decision,
        confidence: analysis.confidence_score,
        analysis,
        outcome,
        outcome_updated_at: None,
        pair: None,
        notes: None,
        pnl: None,
        is_confluence: false,
    }
}

/// A `width` x `height` PNG with a diagonal gradient.
pub fn make_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 96])
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Clock that advances one second per reading.
pub struct StepClock {
    next: Mutex<DateTime<Utc>>,
}

impl Default for StepClock {
    fn default() -> Self {
        let start = DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Self {
            next: Mutex::new(start),
        }
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let mut next = self.next.lock().unwrap();
        let now = *next;
        *next = now + Duration::seconds(1);
        now
    }
}

/// Model that replays canned replies in order.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, ServiceError>>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<String, ServiceError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionModel for ScriptedModel {
    async fn generate(&self, _prompt: &str, _images: &[ChartImage]) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::new("no scripted reply left")))
    }
}
