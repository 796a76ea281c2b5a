use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use visit_scribe::config::{QueueBackend, StoreBackend};
use visit_scribe::{
    create_router, AppState, ChunkStorage, ChunkTaskExecutor, Config, GeminiOracle, JobQueue,
    MemoryJobQueue, MemoryStore, NatsJobQueue, PipelineCoordinator, RecordStore, RedisStore,
    RetryPolicy, VisitStore, WorkerPool,
};

#[derive(Parser)]
#[command(name = "visit-scribe")]
#[command(about = "Build clinical visit reports from chunked audio")]
struct Args {
    /// Config file path (extension optional)
    #[arg(short, long, default_value = "config/visit-scribe")]
    config: String,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// HTTP front door only
    Serve,
    /// Chunk job worker only
    Worker,
    /// Front door and worker in one process
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mode = args.mode.unwrap_or(Mode::All);
    let cfg = Config::load(&args.config)?;

    info!("Visit Scribe v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    if mode != Mode::All
        && (cfg.store.backend == StoreBackend::Memory || cfg.queue.backend == QueueBackend::Memory)
    {
        warn!("In-memory store or queue only works when serving and working in one process");
    }

    let record_store: Arc<dyn RecordStore> = match cfg.store.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Redis => Arc::new(RedisStore::connect(&cfg.store.redis_url).await?),
    };
    let store = VisitStore::new(record_store);
    info!("Record store: {}", store.backend_name());

    let queue: Arc<dyn JobQueue> = match cfg.queue.backend {
        QueueBackend::Memory => Arc::new(MemoryJobQueue::new(cfg.queue.capacity)),
        QueueBackend::Nats => Arc::new(NatsJobQueue::connect(&cfg.queue).await?),
    };
    info!("Job queue: {}", queue.name());

    let worker = if mode == Mode::Serve {
        None
    } else {
        let oracle = Arc::new(GeminiOracle::new(&cfg.oracle).context("Failed to configure oracle")?);
        let executor = Arc::new(ChunkTaskExecutor::new(
            store.clone(),
            oracle,
            Arc::clone(&queue),
            RetryPolicy::from(&cfg.worker),
        ));
        let pool = WorkerPool::new(executor, cfg.worker.concurrency, cfg.worker.serialize_per_visit);
        let deliveries = queue.consume().await?;

        Some(tokio::spawn(async move {
            if let Err(e) = pool.run(deliveries).await {
                error!("Worker pool failed: {:#}", e);
            }
        }))
    };

    if mode == Mode::Worker {
        info!("Worker running; press Ctrl-C to stop");
        tokio::signal::ctrl_c().await?;
        info!("Shutting down");
        return Ok(());
    }

    let upload_dir = cfg.uploads.resolved_dir()?;
    let storage = ChunkStorage::new(&upload_dir).context("Failed to prepare upload directory")?;
    let coordinator = PipelineCoordinator::new(store, queue, storage);
    let state = AppState::new(coordinator)
        .with_report_requires_completion(cfg.service.http.report_requires_completion);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);
    info!("Uploads stored in {}", upload_dir.display());

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down");
        })
        .await?;

    if let Some(worker) = worker {
        worker.abort();
    }

    Ok(())
}
