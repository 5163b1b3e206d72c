#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chart_journal::ai::{ChartImage, ServiceError, VisionModel};
use chart_journal::clock::Clock;

pub fn reply(decision: &str, confidence: &str) -> String {
    format!(
        r#"```json
{{
  "decision": "{decision}",
  "confidenceScore": "{confidence}",
  "summary": "Integration reply",
  "tradingPlan": {{
    "entryArea": "42000",
    "targetPrice": "43500",
    "stopLoss": "41400",
    "riskRewardRatio": "1:2.5"
  }}
}}
```"#
    )
}

/// Create a PNG chart of the given size.
pub fn make_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        if (x + y) % 7 == 0 {
            image::Rgb([20, 200, 90])
        } else {
            image::Rgb([250, 250, 250])
        }
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

pub fn chart(name: &str) -> ChartImage {
    ChartImage::new(name, make_png(400, 225))
}

pub fn temp_dir(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "chart_journal_integ_{}_{}",
        label,
        uuid::Uuid::new_v4()
    ))
}

/// Clock that advances one minute per reading.
pub struct StepClock {
    next: Mutex<DateTime<Utc>>,
}

impl StepClock {
    pub fn starting(at: &str) -> Self {
        let start = DateTime::parse_from_rfc3339(at).unwrap().with_timezone(&Utc);
        Self {
            next: Mutex::new(start),
        }
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let mut next = self.next.lock().unwrap();
        let now = *next;
        *next = now + Duration::minutes(1);
        now
    }
}

/// Model that replays canned replies and records how many images it saw.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, ServiceError>>>,
    calls: AtomicUsize,
    last_image_count: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<String, ServiceError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
            last_image_count: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_image_count(&self) -> usize {
        self.last_image_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionModel for ScriptedModel {
    async fn generate(&self, _prompt: &str, images: &[ChartImage]) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_image_count.store(images.len(), Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::new("no scripted reply left")))
    }
}
