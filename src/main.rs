//! One-shot daemon entry point: load config, wire the pipeline, run a scan.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cineshelf::config::Config;
use cineshelf::db::Database;
use cineshelf::events::{EventBus, EventKind, JobEvent};
use cineshelf::jobs::{JobExecutor, ScanJob, WorkerPool};
use cineshelf::services::decider::MatchDecider;
use cineshelf::services::matcher::Matcher;
use cineshelf::services::naming::NameFormatter;
use cineshelf::services::scanner::MediaScanner;
use cineshelf::services::sources::{SourceKind, create_source};
use cineshelf::services::targets::{TargetKind, TargetResolver};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cineshelf=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!("Starting cineshelf");

    let db = Database::connect(&config.database_url).await?;
    tracing::info!("Database connected");

    let tmdb = create_source(SourceKind::Tmdb, &config, &db);
    let imdb = create_source(SourceKind::Imdb, &config, &db);

    // `tmdb`/`imdb` select that source alone; composite keys go through
    // the strategy table.
    let matcher = match config.matcher.as_str() {
        "tmdb" => Matcher::single(Arc::clone(&tmdb)),
        "imdb" => Matcher::single(Arc::clone(&imdb)),
        key => Matcher::from_key(
            key,
            Arc::clone(&tmdb),
            Arc::clone(&imdb),
            config.match_threshold,
        )?,
    };

    if config.media_resolver != "skip_existing" {
        anyhow::bail!("unknown media resolver '{}'", config.media_resolver);
    }
    let resolver = TargetResolver::new(
        TargetKind::from_key(&config.media_target)?,
        NameFormatter::new(
            config.movies_target_path.clone(),
            config.movie_name_template.as_str(),
        ),
    );
    let decider = MatchDecider::new(config.match_threshold);
    let scanner = MediaScanner::new(&config.media_scan_path, config.skip_filetype_checks);

    let events = EventBus::default();
    let mut event_log = events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = event_log.recv().await {
            tracing::info!(
                channel = %event.channel(),
                job_id = %event.job_id,
                kind = ?event.event_type,
                context = event.context.as_deref().unwrap_or(""),
                "job event"
            );
        }
    });

    let pool = WorkerPool::new(config.worker_threads);
    let executor = JobExecutor::Pool(pool.clone());

    let scan = ScanJob::new(scanner, matcher, decider, resolver, db, events.clone());
    let job = scan.job().clone();
    tracing::info!(job_id = %job.id, scan_path = %config.media_scan_path, "starting scan job");

    // One-shot mode: wait for the terminal event, then drain the pool.
    let mut done = events.subscribe();
    let job_events = events.clone();
    executor
        .submit(async move {
            if let Err(error) = scan.run().await {
                tracing::error!(error = %format!("{error:#}"), "scan job failed");
                job_events.emit(JobEvent::error(scan.job(), format!("{error:#}")));
            }
        })
        .await;
    while let Ok(event) = done.recv().await {
        if event.job_id == job.id.to_string() && event.event_type != EventKind::Progress {
            break;
        }
    }

    pool.shutdown();
    tracing::info!("Scan finished");
    Ok(())
}
