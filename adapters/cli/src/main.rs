#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs headless sessions or hosts networked rooms.

mod assets;
mod script;
mod simulate;

use std::{
    io::{self, BufWriter, Write},
    net::SocketAddr,
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use siege_session::{Session, SessionConfig, DEFAULT_TICK_RATE_HZ};
use siege_sync::{Codec, Lobby, LobbyConfig};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::script::Script;

#[derive(Debug, Parser)]
#[command(name = "siege", version, about = "Elemental tower defense sessions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Runs one session without a network and prints its output.
    Simulate(SimulateArgs),
    /// Hosts rooms over TCP with newline-delimited JSON.
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
struct AssetArgs {
    /// Catalog JSON; the built-in roster when omitted.
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// Map JSON; the built-in meadow when omitted.
    #[arg(long)]
    map: Option<PathBuf>,
    /// Simulation rate in ticks per second.
    #[arg(long, default_value_t = DEFAULT_TICK_RATE_HZ)]
    tick_rate: u32,
    /// Seed for procedural waves.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

#[derive(Debug, Args)]
struct SimulateArgs {
    #[command(flatten)]
    assets: AssetArgs,
    /// JSON array of `{tick, player?, ...client message}` entries.
    #[arg(long)]
    script: Option<PathBuf>,
    /// Upper bound on simulated ticks.
    #[arg(long, default_value_t = 72_000)]
    max_ticks: u64,
    /// What to print.
    #[arg(long, value_enum, default_value_t = Output::Summary)]
    output: Output,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Output {
    /// One JSON summary once the run ends.
    Summary,
    /// One JSON delta per tick, then the summary.
    Deltas,
}

#[derive(Debug, Args)]
struct ServeArgs {
    #[command(flatten)]
    assets: AssetArgs,
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:7878")]
    bind: SocketAddr,
    /// Seconds an empty room survives.
    #[arg(long, default_value_t = 30)]
    grace_secs: u64,
    /// Encoding of server messages.
    #[arg(long, value_enum, default_value_t = WireCodec::Json)]
    codec: WireCodec,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum WireCodec {
    /// Newline-delimited JSON.
    Json,
    /// Length-prefixed bincode.
    Bincode,
}

impl From<WireCodec> for Codec {
    fn from(codec: WireCodec) -> Self {
        match codec {
            WireCodec::Json => Codec::Json,
            WireCodec::Bincode => Codec::Bincode,
        }
    }
}

/// Entry point for the siege command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Simulate(args) => run_simulate(args),
        Command::Serve(args) => run_serve(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn run_simulate(args: SimulateArgs) -> Result<()> {
    let catalog = assets::load_catalog(args.assets.catalog.as_deref())?;
    let map = assets::load_map(args.assets.map.as_deref(), &catalog)?;
    let mut script = match &args.script {
        Some(path) => Script::load(path)?,
        None => Script::default(),
    };
    let config = SessionConfig::new(catalog, map)
        .with_tick_rate(args.assets.tick_rate)
        .with_seed(args.assets.seed);
    let mut session = Session::new(config).context("failed to start session")?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut write_error = None;
    let summary = simulate::run(&mut session, &mut script, args.max_ticks, |delta| {
        if args.output != Output::Deltas || write_error.is_some() {
            return;
        }
        let written = serde_json::to_writer(&mut out, delta)
            .map_err(io::Error::from)
            .and_then(|()| writeln!(out));
        if let Err(error) = written {
            write_error = Some(error);
        }
    });
    if let Some(error) = write_error {
        return Err(error).context("failed to write delta");
    }

    if summary.outcome.is_none() {
        warn!(ticks = summary.ticks, "session did not conclude");
    }
    serde_json::to_writer_pretty(&mut out, &summary).context("failed to write summary")?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

fn run_serve(args: ServeArgs) -> Result<()> {
    let catalog = assets::load_catalog(args.assets.catalog.as_deref())?;
    let map = assets::load_map(args.assets.map.as_deref(), &catalog)?;
    let mut config = LobbyConfig::new(catalog, map)
        .with_grace_period(Duration::from_secs(args.grace_secs));
    config.tick_rate_hz = args.assets.tick_rate;
    config.seed = args.assets.seed;
    SessionConfig::new(Arc::clone(&config.catalog), Arc::clone(&config.map))
        .with_tick_rate(config.tick_rate_hz)
        .validate()
        .context("invalid session settings")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(serve_until_shutdown(
        args.bind,
        Lobby::new(config),
        args.codec.into(),
    ))
}

async fn serve_until_shutdown(bind: SocketAddr, lobby: Lobby, codec: Codec) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tokio::select! {
        served = siege_sync::serve(listener, lobby, codec) => served.context("server stopped"),
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown")?;
            info!("shutting down");
            Ok(())
        }
    }
}
