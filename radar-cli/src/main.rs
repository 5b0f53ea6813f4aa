//! Robotics Radar CLI
//!
//! Scores, deduplicates and publishes robotics content from configured sources.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parking_lot::RwLock;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use radar_agents::{
    rescore_all, FeedbackProcessor, IngestPipeline, JsonFileSource, Settings, SharedConfig,
};
use radar_core::{breakdown_at, ContentItem};
use radar_runtime::{CycleOutcome, SmartPublisher};
use radar_store::Ledger;

#[derive(Parser)]
#[command(name = "robotics-radar")]
#[command(author, version, about = "Robotics Radar: scored robotics news", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1")]
    verbose: u8,

    /// Settings file
    #[arg(short, long, default_value = "radar.toml", env = "RADAR_CONFIG")]
    config: PathBuf,

    /// Database file (overrides [storage] path)
    #[arg(long, env = "RADAR_DB")]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the smart publisher until interrupted
    Run {
        /// Publish interval in minutes (overrides [publisher] interval_minutes)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Run a single publish cycle
    Once,

    /// Show publisher and ledger status
    Status,

    /// Ingest a JSON file of items
    Ingest {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Record reviewer feedback for an item
    Feedback {
        #[arg(long)]
        item: String,

        #[arg(long)]
        user: String,

        /// like, dislike, rating_1..rating_5, approved, rejected, edited, skipped
        #[arg(long)]
        kind: String,
    },

    /// List the highest scored items
    Top {
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Mix top scored with most recent items
        #[arg(long)]
        diverse: bool,
    },

    /// Show ledger analytics
    Stats,

    /// Recompute every stored score
    Rescore,

    /// Delete rows with duplicate URLs
    DedupCleanup,

    /// Explain an item's score
    Breakdown {
        #[arg(long)]
        item: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    let mut settings = Settings::load_or_default(&cli.config)
        .with_context(|| format!("loading settings from {}", cli.config.display()))?;
    if let Some(db) = cli.db {
        settings.storage.path = db;
    }

    let ledger = Arc::new(
        Ledger::open(&settings.storage)
            .with_context(|| format!("opening ledger at {}", settings.storage.path.display()))?,
    );
    let mut scoring = settings.scoring.clone();
    let restored = ledger.load_preferences_into(&mut scoring)?;
    if restored > 0 {
        info!("Restored {} learned category preferences", restored);
    }
    let config: SharedConfig = Arc::new(RwLock::new(scoring));

    match cli.command {
        Commands::Run { interval } => {
            if let Some(minutes) = interval {
                settings.publisher.interval_minutes = minutes;
            }
            let mut publisher = build_publisher(&settings, ledger, config)?;
            println!(
                "🚀 Robotics Radar publishing every {} minutes (ctrl-c to stop)\n",
                settings.publisher.interval_minutes
            );
            publisher.run_continuous().await;
        }
        Commands::Once => {
            let mut publisher = build_publisher(&settings, ledger, config)?;
            match publisher.run_cycle().await? {
                CycleOutcome::Published { item_id, ingest } => {
                    println!(
                        "✅ Published {} ({} fetched, {} stored)",
                        item_id, ingest.fetched, ingest.stored
                    );
                }
                CycleOutcome::NothingToPublish { ingest } => {
                    println!(
                        "⚠️  Nothing to publish ({} fetched, {} stored)",
                        ingest.fetched, ingest.stored
                    );
                }
                CycleOutcome::NotDue { minutes_remaining } => {
                    println!("⏰ Not due, next publish in {:.1} minutes", minutes_remaining);
                }
            }
        }
        Commands::Status => {
            let publisher = build_publisher(&settings, ledger, config)?;
            let status = publisher.status()?;
            println!("📊 Publisher status");
            println!("   Unpublished: {}", status.unpublished);
            println!("   Published:   {}", status.published);
            println!("   Total:       {}", status.total);
            println!("   Interval:    {} minutes", status.interval_minutes);
        }
        Commands::Ingest { file } => {
            let pipeline = IngestPipeline::new(ledger, config)
                .with_dedup(settings.dedup.clone())
                .with_source(Arc::new(JsonFileSource::new("file", &file)));
            let report = pipeline.refresh().await?;
            if !report.failed_sources.is_empty() {
                anyhow::bail!("could not read {}", file.display());
            }
            println!(
                "📥 {} fetched, {} stored, {} duplicates",
                report.fetched, report.stored, report.duplicates
            );
        }
        Commands::Feedback { item, user, kind } => {
            let processor = FeedbackProcessor::new(ledger, config);
            let outcome = processor.submit(&item, &user, &kind)?;
            println!(
                "📝 {} on {}: score {:.2} -> {:.2}",
                outcome.feedback_type, outcome.item_id, outcome.previous_score, outcome.score
            );
            for update in &outcome.preference_updates {
                println!("   {} weight {:.3}", update.category, update.weight);
            }
            let summary = processor.summary(&item)?;
            println!(
                "   {} likes, {} dislikes ({:?})",
                summary.likes, summary.dislikes, summary.sentiment
            );
        }
        Commands::Top { limit, diverse } => {
            let items = if diverse {
                ledger.diverse_selection(limit)?
            } else {
                ledger.top_by_score(limit)?
            };
            print_items(&items);
        }
        Commands::Stats => print_stats(&ledger)?,
        Commands::Rescore => {
            let report = rescore_all(&ledger, &config.read())?;
            println!("🔁 Rescored {} items, {} updated", report.examined, report.updated);
        }
        Commands::DedupCleanup => {
            let deleted = ledger.delete_duplicate_urls()?;
            println!("🧹 Deleted {} duplicate items", deleted);
        }
        Commands::Breakdown { item } => {
            let stored = ledger
                .get(&item)?
                .ok_or_else(|| anyhow::anyhow!("item {} not found", item))?;
            let tally = ledger.feedback_tally(&item)?;
            let feedback = (!tally.is_empty()).then_some(&tally);
            let breakdown = breakdown_at(&stored, feedback, &config.read(), chrono::Utc::now());
            println!("{}", serde_json::to_string_pretty(&breakdown)?);
        }
    }

    Ok(())
}

fn build_publisher(
    settings: &Settings,
    ledger: Arc<Ledger>,
    config: SharedConfig,
) -> Result<SmartPublisher> {
    let mut pipeline = IngestPipeline::new(ledger.clone(), config)
        .with_dedup(settings.dedup.clone())
        .with_max_concurrent(settings.publisher.max_concurrent_sources);
    for source in settings.build_sources() {
        pipeline = pipeline.with_source(source);
    }

    Ok(SmartPublisher::new(
        ledger,
        pipeline,
        settings.build_delivery()?,
        settings.publisher.clone(),
    ))
}

fn print_items(items: &[ContentItem]) {
    if items.is_empty() {
        println!("No items stored yet.");
        return;
    }
    for (i, item) in items.iter().enumerate() {
        let marker = if item.is_published() { "✅" } else { "  " };
        println!("{:>2}. {} {:>8.2}  {}", i + 1, marker, item.score, item.title());
        println!("       {}", item.url);
    }
}

fn print_stats(ledger: &Ledger) -> Result<()> {
    let summary = ledger.summary()?;
    println!("📊 Ledger");
    println!(
        "   Items: {} ({} published, {} unpublished)",
        summary.total_items, summary.published, summary.unpublished
    );
    println!("   Authors: {}", summary.distinct_authors);
    println!("   Average score: {:.2}", summary.average_score);
    println!("   Last 24h: {}", summary.items_last_24h);

    let feedback = ledger.feedback_stats()?;
    println!("\n📝 Feedback: {} total", feedback.total);
    println!("   👍 {} | 👎 {}", feedback.likes, feedback.dislikes);
    println!("   Ratings 1-5: {:?}", feedback.ratings);
    if let Some(avg) = feedback.average_rating() {
        println!("   Average rating: {:.2}", avg);
    }
    if let Some(ratio) = feedback.positive_ratio {
        println!("   Positive ratio: {:.0}%", ratio * 100.0);
    }

    let categories = ledger.category_rollup(10)?;
    if !categories.is_empty() {
        println!("\n🏷️  Categories");
        for c in categories {
            println!("   {:<24} {:>5}  avg {:.2}", c.category, c.count, c.average_score);
        }
    }

    let topics = ledger.trending_topics(10)?;
    if !topics.is_empty() {
        println!("\n🔥 Trending topics");
        for t in topics {
            println!("   {:<24} {:>5}", t.name, t.frequency);
        }
    }

    let authors = ledger.top_authors(5)?;
    if !authors.is_empty() {
        println!("\n👥 Top authors");
        for a in authors {
            println!(
                "   @{:<22} {:>3} items  avg {:.2}",
                a.username, a.items, a.average_score
            );
        }
    }

    let trends = ledger.engagement_trends(7)?;
    if !trends.is_empty() {
        println!("\n📈 Last 7 days");
        for d in trends {
            println!(
                "   {}  {:>4} items  avg {:.2}  engagement {}",
                d.day, d.items, d.average_score, d.total_engagement
            );
        }
    }

    let reviews = ledger.review_statuses(5)?;
    if !reviews.is_empty() {
        println!("\n🧾 Recent reviews");
        for r in reviews {
            println!("   {} {} by {}", r.feedback_type, r.item_id, r.user_id);
        }
    }

    Ok(())
}
