mod app;

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use chart_journal::config::Config;

use crate::app::App;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut app = App::new(&cfg);
    app.run(&args).await
}
