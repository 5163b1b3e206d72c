use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use chart_journal::ai::{
    AnalysisRequest, ChartAnalyzer, ChartImage, GeminiClient, RequestCooldown, RetryExecutor,
};
use chart_journal::config::Config;
use chart_journal::journal::{JournalStats, JournalStore};
use chart_journal::models::{AnalysisRecord, JournalEntry, Outcome, TradeMode};
use chart_journal::storage::FileStore;

const USAGE: &str = "\
commands:
  analyze <chart> [<lower-tf chart>] [--mode scalping|swing] [--pair P] [--context text...]
  list
  stats
  outcome <id> <WIN|LOSS|BREAKEVEN|PENDING> [pnl] [notes...]
  pair <id> <pair>
  delete <id>
  clear
  shell              read commands from stdin, one per line
  help";

pub struct App {
    journal: JournalStore<FileStore>,
    analyzer: ChartAnalyzer<GeminiClient>,
    cooldown: RequestCooldown,
}

impl App {
    pub fn new(cfg: &Config) -> Self {
        info!(
            "Journal at {} (capacity {}), {}",
            cfg.journal_dir,
            cfg.journal_capacity,
            if cfg.demo_mode { "DEMO MODE" } else { "live analysis" }
        );
        let storage = FileStore::new(&cfg.journal_dir).with_quota(cfg.storage_quota_bytes);
        Self {
            journal: JournalStore::new(storage, cfg.journal_config(), cfg.thumbnailer()),
            analyzer: ChartAnalyzer::new(
                GeminiClient::new(cfg),
                RetryExecutor::new(cfg.retry_policy()),
                cfg.demo_mode,
            ),
            cooldown: RequestCooldown::new(cfg.cooldown()),
        }
    }

    pub async fn run(&mut self, args: &[String]) -> Result<()> {
        match args.first().map(String::as_str) {
            Some("shell") => self.shell().await,
            Some(_) => self.dispatch(args).await,
            None => {
                println!("{USAGE}");
                Ok(())
            }
        }
    }

    async fn shell(&mut self) -> Result<()> {
        println!("{USAGE}");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let args: Vec<String> = line.split_whitespace().map(str::to_string).collect();
            match args.first().map(String::as_str) {
                None => continue,
                Some("exit") | Some("quit") => break,
                Some("shell") => continue,
                Some(_) => {
                    if let Err(e) = self.dispatch(&args).await {
                        println!("error: {e:#}");
                    }
                }
            }
        }
        Ok(())
    }

    async fn dispatch(&mut self, args: &[String]) -> Result<()> {
        let rest = &args[1..];
        match args[0].as_str() {
            "analyze" => self.analyze(rest).await,
            "list" => {
                self.list();
                Ok(())
            }
            "stats" => {
                print_stats(&self.journal.compute_stats());
                Ok(())
            }
            "outcome" => self.outcome(rest),
            "pair" => {
                let (Some(id), Some(pair)) = (rest.first(), rest.get(1)) else {
                    bail!("usage: pair <id> <pair>");
                };
                if !self.journal.update_pair(id, pair) {
                    bail!("no journal entry {id}");
                }
                println!("Updated {id}");
                Ok(())
            }
            "delete" => {
                let Some(id) = rest.first() else {
                    bail!("usage: delete <id>");
                };
                self.journal.delete_entry(id);
                println!("Deleted {id}");
                Ok(())
            }
            "clear" => {
                self.journal.clear_all();
                println!("Journal cleared");
                Ok(())
            }
            "help" => {
                println!("{USAGE}");
                Ok(())
            }
            other => bail!("unknown command '{other}'\n{USAGE}"),
        }
    }

    async fn analyze(&mut self, args: &[String]) -> Result<()> {
        let mut paths = Vec::new();
        let mut mode = TradeMode::Scalping;
        let mut pair = None;
        let mut context = None;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--mode" => {
                    i += 1;
                    let raw = args.get(i).context("--mode needs a value")?;
                    mode = raw.parse().map_err(anyhow::Error::msg)?;
                }
                "--pair" => {
                    i += 1;
                    pair = Some(args.get(i).context("--pair needs a value")?.clone());
                }
                "--context" => {
                    // Everything after --context is free text.
                    context = Some(args[i + 1..].join(" "));
                    break;
                }
                path => paths.push(path.to_string()),
            }
            i += 1;
        }

        let mut images = Vec::with_capacity(paths.len());
        for path in &paths {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {path}"))?;
            let name = std::path::Path::new(path)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.clone());
            images.push(ChartImage::new(name, bytes));
        }

        let mut request = AnalysisRequest {
            mode,
            images,
            context: None,
        };
        if let Some(ctx) = context {
            request = request.with_context(ctx);
        }
        if let Err(e) = request.validate() {
            bail!(e.user_message());
        }

        if let Err(left) = self.cooldown.try_start() {
            bail!(
                "Please wait {}s before the next analysis",
                left.as_secs_f64().ceil() as u64
            );
        }

        let analysis = match self.analyzer.analyze(&request).await {
            Ok(a) => a,
            Err(e) => {
                warn!("Analysis failed: {}", e);
                bail!(e.user_message());
            }
        };
        print_analysis(&analysis);

        let saved = self
            .journal
            .add_entry(
                mode,
                &request.images[0],
                &analysis,
                pair.as_deref(),
                request.is_confluence(),
            )
            .await;
        match saved {
            Some(id) => println!("Saved to journal as {id}"),
            None => println!("Analysis complete, but it could not be saved to the journal"),
        }
        Ok(())
    }

    fn outcome(&self, args: &[String]) -> Result<()> {
        let (Some(id), Some(raw)) = (args.first(), args.get(1)) else {
            bail!("usage: outcome <id> <WIN|LOSS|BREAKEVEN|PENDING> [pnl] [notes...]");
        };
        let outcome: Outcome = raw.parse().map_err(anyhow::Error::msg)?;
        let pnl = match args.get(2) {
            Some(p) => Some(
                p.trim_end_matches('%')
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .with_context(|| format!("invalid pnl '{p}'"))?,
            ),
            None => None,
        };
        let notes = (args.len() > 3).then(|| args[3..].join(" "));

        if !self.journal.update_outcome(id, outcome, notes.as_deref(), pnl) {
            bail!("no journal entry {id}, or it could not be saved");
        }
        println!("Marked {id} as {outcome}");
        Ok(())
    }

    fn list(&self) {
        let entries = self.journal.list_entries();
        if entries.is_empty() {
            println!("Journal is empty");
            return;
        }
        for e in &entries {
            print_entry(e);
        }
    }
}

fn print_analysis(a: &AnalysisRecord) {
    println!("{}", "=".repeat(60));
    if a.is_demo {
        println!("  [DEMO] simulated analysis");
    }
    println!("  Decision:   {} ({} confidence)", a.decision, a.confidence_score);
    println!("  {}", a.summary);
    println!("  Entry:      {}", a.trading_plan.entry_area);
    println!("  Target:     {}", a.trading_plan.target_price);
    println!("  Stop Loss:  {}", a.trading_plan.stop_loss);
    println!("  R:R         {}", a.trading_plan.risk_reward_ratio);
    println!("{}", "=".repeat(60));
}

fn print_entry(e: &JournalEntry) {
    let pnl = e.pnl.map(|p| format!("{p:+.2}%")).unwrap_or_else(|| "-".into());
    println!(
        "{}  {}  {:<8} {:<4} {:<6} {:<9} {:>8}  {}{}",
        e.id,
        e.created_at.format("%Y-%m-%d %H:%M"),
        e.mode.to_string(),
        e.decision.to_string(),
        e.confidence.to_string(),
        e.outcome.to_string(),
        pnl,
        e.pair.as_deref().unwrap_or(&e.image_file_name),
        if e.is_confluence { " [MTF]" } else { "" },
    );
    if let Some(notes) = &e.notes {
        println!("    {notes}");
    }
}

fn print_stats(s: &JournalStats) {
    println!("Entries:   {} ({} pending)", s.total_entries, s.pending);
    println!(
        "Resolved:  {} W / {} L / {} BE  win rate {:.1}%",
        s.wins, s.losses, s.breakevens, s.win_rate
    );
    println!(
        "Scalping:  {:.1}% of {} resolved   Swing: {:.1}% of {} resolved",
        s.scalping.win_rate, s.scalping.resolved, s.swing.win_rate, s.swing.resolved
    );
    println!("Streak:    {} {}", s.current_streak, s.streak_type);
    println!(
        "P&L:       total {:+.2}%  avg {:+.2}% over {} trade(s)",
        s.total_pnl, s.avg_pnl, s.pnl_count
    );
}
