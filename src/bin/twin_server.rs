//! LocalityTwin gRPC Server
//!
//! A standalone server binary serving the built-in locality catalog, the
//! prediction engine and the city advisor over gRPC.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tonic::transport::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

use localitytwin::transport::TwinServiceImpl;
use localitytwin::{
    CityAdvisor, EngineConfig, InMemoryLocalityStore, LocalityStore, PredictionEngine,
    TwinRuntime, TwinRuntimeConfig,
};

#[derive(Parser)]
#[command(name = "localitytwin-server", about = "Locality digital twin gRPC server")]
#[command(version)]
struct Cli {
    /// Address to bind to
    #[arg(long, env = "LOCALITYTWIN_ADDR", default_value = "127.0.0.1:50051")]
    addr: SocketAddr,

    /// Fixed noise seed; omit for fresh entropy per prediction
    #[arg(long, env = "LOCALITYTWIN_SEED")]
    seed: Option<u64>,

    /// Projection start year (the first projected year is the next one)
    #[arg(long, env = "LOCALITYTWIN_CURRENT_YEAR", conflicts_with = "year_from_clock")]
    current_year: Option<i32>,

    /// Take the projection start year from the system clock
    #[arg(long)]
    year_from_clock: bool,

    /// Projection worker threads
    #[arg(long, default_value_t = 2)]
    projection_workers: usize,

    /// Advisory worker threads
    #[arg(long, default_value_t = 1)]
    advisory_workers: usize,

    /// Queued jobs per worker pool
    #[arg(long, default_value_t = 256)]
    queue_capacity: usize,

    /// Tracing directive added on top of RUST_LOG
    #[arg(long, env = "LOCALITYTWIN_LOG", default_value = "localitytwin=info")]
    log: String,
}

impl Cli {
    fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::default();
        if self.year_from_clock {
            config = config.with_current_year_from_clock();
        } else if let Some(year) = self.current_year {
            config = config.with_current_year(year);
        }
        if let Some(seed) = self.seed {
            config = config.with_noise_seed(seed);
        }
        config
    }

    fn runtime_config(&self) -> TwinRuntimeConfig {
        TwinRuntimeConfig {
            projection_workers: self.projection_workers,
            advisory_workers: self.advisory_workers,
            queue_capacity: self.queue_capacity,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(cli.log.parse()?))
        .init();

    let engine_config = cli.engine_config();
    let current_year = engine_config.current_year;
    let engine = PredictionEngine::new(engine_config)?;
    let runtime = TwinRuntime::new(engine, CityAdvisor::new(), &cli.runtime_config())?;

    let store = InMemoryLocalityStore::with_builtin_catalog();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        localities = store.count()?,
        current_year,
        "catalog loaded"
    );

    let svc = TwinServiceImpl::new(Arc::new(runtime), Arc::new(store)).into_server();

    info!(addr = %cli.addr, "starting gRPC server");

    Server::builder()
        .add_service(svc)
        .serve_with_shutdown(cli.addr, async {
            let _ = signal::ctrl_c().await;
        })
        .await?;

    info!("shut down");
    Ok(())
}
