//! StressFuse server
//!
//! Usage:
//!   stressfuse --source ./session --annotations ./session.json --model ./fer.json
//!   stressfuse --source ./session --loop-replay --print     # console feed
//!   stressfuse --no-market --addr 0.0.0.0:5000              # camera only
//!   stressfuse --config stressfuse.json

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use stressfuse::config::StressConfig;
use stressfuse::core::emitter::STRESS_UPDATE;
use stressfuse::core::{
    run_server, AppState, BroadcastEmitter, MarketWorker, MockPriceSource, ModelPaths, ModelService,
    PreviewMailbox, ReplayBackend, SamplingScheduler, StopSignal, StressPipeline, EVENT_CHANNEL_CAPACITY,
};
use stressfuse::types::StressUpdate;
use stressfuse::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "stressfuse",
    version = VERSION,
    about = "StressFuse - live multi-signal stress fusion, broadcast over WebSocket",
    long_about = "StressFuse samples a video stream, fuses four stress signals per frame\n\
                  (expression classifier, blink, eyebrow, aux emotion) and broadcasts\n\
                  `stress_update` events. A second worker streams `market_update` events.\n\n\
                  Frame sources:\n  \
                  --source DIR   Directory of image files, one per frame (repeatable;\n                 \
                  each directory is one device index)\n\n\
                  Endpoints:\n  \
                  GET /health, GET /preview.jpg, GET /video_feed, WS /ws"
)]
struct Args {
    /// JSON config file (CLI flags override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server address
    #[arg(long, default_value = "127.0.0.1:5000")]
    addr: String,

    /// Frame directory acting as a camera device (repeatable)
    #[arg(short, long = "source")]
    sources: Vec<PathBuf>,

    /// Replay frame rate
    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// Restart replay sources when they run out
    #[arg(long)]
    loop_replay: bool,

    /// Linear emotion classifier (JSON)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Face/landmark/aux annotations for replayed frames (JSON)
    #[arg(short, long)]
    annotations: Option<PathBuf>,

    /// Run the pipeline on every Nth frame
    #[arg(long)]
    sample_every: Option<u64>,

    /// Consecutive no-face frames before reporting the face lost
    #[arg(long)]
    no_face_threshold: Option<u32>,

    /// Market tick interval
    #[arg(long, env = "EMITTER_SLEEP_MS")]
    market_interval_ms: Option<u64>,

    /// Symbols quoted per market tick
    #[arg(long, env = "SYMBOLS_PER_TICK")]
    symbols_per_tick: Option<usize>,

    /// Do not start the market worker
    #[arg(long)]
    no_market: bool,

    /// Print every stress update to the console
    #[arg(short, long)]
    print: bool,

    /// Disable colors in console output
    #[arg(long)]
    no_color: bool,
}

impl Args {
    /// File config (or defaults) with CLI overrides applied
    fn resolve_config(&self) -> stressfuse::Result<StressConfig> {
        let mut config = match &self.config {
            Some(path) => StressConfig::load(path)?,
            None => StressConfig::default(),
        };
        if let Some(n) = self.sample_every {
            config.pipeline.sample_every = n;
        }
        if let Some(n) = self.no_face_threshold {
            config.pipeline.no_face_threshold = n;
        }
        if let Some(ms) = self.market_interval_ms {
            config.market.interval_ms = ms;
        }
        if let Some(n) = self.symbols_per_tick {
            config.market.symbols_per_tick = n;
        }
        if self.no_market {
            config.market.enabled = false;
        }
        Ok(config.normalized())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if args.no_color {
        colored::control::set_override(false);
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "StressFuse stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> stressfuse::Result<()> {
    let config = args.resolve_config()?;
    info!(version = VERSION, "StressFuse starting");

    // Models: a mis-ordered classifier aborts here
    let models = Arc::new(ModelService::new(ModelPaths {
        classifier: args.model.clone(),
        annotations: args.annotations.clone(),
    }));
    models.preload()?;

    let emitter = Arc::new(BroadcastEmitter::new());
    let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    emitter.set_app_context(tx)?;

    let mailbox = Arc::new(PreviewMailbox::new());
    let stop = StopSignal::new();

    if args.print {
        spawn_printer(&emitter);
    }

    // Camera worker
    let camera = if args.sources.is_empty() {
        warn!("No frame source given, live stress data disabled");
        None
    } else {
        let pipeline = StressPipeline::new(models.clone(), emitter.clone(), &config);
        let scheduler = SamplingScheduler::new(pipeline, mailbox.clone(), &config.pipeline);
        let backend = ReplayBackend::new(args.sources.clone(), args.fps, args.loop_replay);
        Some(scheduler.spawn(Box::new(backend), stop.clone())?)
    };

    // Market worker
    let market = if config.market.enabled {
        let worker = MarketWorker::new(
            Box::new(MockPriceSource::new()),
            emitter.clone(),
            config.market.clone(),
            config.alerts.clone(),
        );
        Some(tokio::spawn(worker.run(stop.clone())))
    } else {
        info!("Market worker disabled");
        None
    };

    let state = AppState::new(emitter.clone(), mailbox);
    let served = run_server(&args.addr, state, shutdown_signal()).await;

    info!("Shutting down");
    stop.stop();
    if let Some(handle) = market {
        let _ = handle.await;
    }
    if let Some(handle) = camera {
        // Blocking join off the async runtime
        let _ = tokio::task::spawn_blocking(move || handle.join()).await;
    }
    served
}

/// Console feed of `stress_update` events
fn spawn_printer(emitter: &BroadcastEmitter) {
    let Some(mut rx) = emitter.subscribe() else {
        return;
    };
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) if event.event == STRESS_UPDATE => {
                    if let Ok(update) = serde_json::from_value::<StressUpdate>(event.data) {
                        println!("{}", update.to_terminal_string());
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Ctrl-C handler failed, serving until killed");
        std::future::pending::<()>().await;
    }
}
