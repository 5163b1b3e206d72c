pub mod ai;
pub mod clock;
pub mod config;
pub mod journal;
pub mod models;
pub mod storage;
#[cfg(test)]
pub mod test_helpers;
