pub mod stats;
pub mod store;
pub mod thumbnail;

pub use stats::{JournalStats, ModeStats, StreakType};
pub use store::{JournalConfig, JournalStore, JOURNAL_KEY};
pub use thumbnail::{Thumbnail, ThumbnailError, Thumbnailer};
