//! `notebox` command-line entry point.
//!
//! # Responsibility
//! - Start the note service, the reverse proxy, or both.
//! - Offer small store administration commands (`init-db`, `list`).
//! - Keep the `ping` smoke check for checking core linkage.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use notebox_core::{
    default_log_level, init_logging, init_stderr_logging, AppConfig, InMemoryNoteStore,
    NoteStore, SqliteNoteStore,
};
use notebox_http::{serve_notes, serve_proxy, shutdown_signal, AppState, ProxyState, SharedStore};
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(
    name = "notebox",
    version,
    about = "Persisted note service with a reverse proxy in front"
)]
struct Cli {
    /// TOML config file; defaults apply for anything it omits.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files. Logs go to stderr when unset.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the note service")]
    Serve(ServeArgs),

    #[command(about = "Run the reverse proxy")]
    Proxy(ProxyArgs),

    #[command(about = "Run the note service and the reverse proxy together")]
    Up(StoreArgs),

    #[command(about = "Create the notes table if missing")]
    InitDb(DbArgs),

    #[command(about = "Print every note as JSON, newest first")]
    List(DbArgs),

    #[command(about = "Print core ping and version")]
    Ping,

    #[command(about = "Block until the relational database accepts connections")]
    WaitDb(WaitDbArgs),
}

#[derive(Args)]
struct StoreArgs {
    /// SQLite database file.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Keep notes in process memory instead of SQLite.
    #[arg(long, conflicts_with = "db")]
    in_memory: bool,
}

/// Store selection for commands that only make sense against the SQLite file.
#[derive(Args)]
struct DbArgs {
    /// SQLite database file.
    #[arg(long)]
    db: Option<PathBuf>,
}

#[derive(Args)]
struct ServeArgs {
    /// Address the note service listens on.
    #[arg(long)]
    listen: Option<String>,

    #[command(flatten)]
    store: StoreArgs,
}

#[derive(Args)]
struct ProxyArgs {
    /// Address the proxy listens on.
    #[arg(long)]
    listen: Option<String>,

    /// Base URL of the note service, e.g. `http://127.0.0.1:5000`.
    #[arg(long)]
    upstream: Option<String>,
}

#[derive(Args)]
struct WaitDbArgs {
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    #[arg(long, default_value_t = 500)]
    interval_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli.command);
    config.validate()?;

    if !matches!(cli.command, Commands::Ping) {
        start_logging(&config, cli.log_level.as_deref(), cli.log_dir.as_ref())?;
    }

    match cli.command {
        Commands::Serve(args) => run_serve(&config, args.store.in_memory).await,
        Commands::Proxy(_) => run_proxy(&config).await,
        Commands::Up(args) => run_up(&mut config, args.in_memory).await,
        Commands::InitDb(_) => {
            open_store(&config, false)?;
            println!("initialized {}", config.store.path.display());
            Ok(())
        }
        Commands::List(_) => {
            let store = open_store(&config, false)?;
            let notes = store.list_all()?;
            println!("{}", serde_json::to_string_pretty(&notes)?);
            Ok(())
        }
        Commands::Ping => {
            println!("notebox_core ping={}", notebox_core::ping());
            println!("notebox_core version={}", notebox_core::core_version());
            Ok(())
        }
        Commands::WaitDb(args) => run_wait_db(&config, &args).await,
    }
}

fn apply_overrides(config: &mut AppConfig, command: &Commands) {
    let db = match command {
        Commands::Serve(args) => {
            if let Some(listen) = &args.listen {
                config.service.listen = listen.clone();
            }
            args.store.db.as_ref()
        }
        Commands::Proxy(args) => {
            if let Some(listen) = &args.listen {
                config.proxy.listen = listen.clone();
            }
            if let Some(upstream) = &args.upstream {
                config.proxy.upstream = upstream.clone();
            }
            None
        }
        Commands::Up(args) => args.db.as_ref(),
        Commands::InitDb(args) | Commands::List(args) => args.db.as_ref(),
        Commands::Ping | Commands::WaitDb(_) => None,
    };

    if let Some(db) = db {
        config.store.path = db.clone();
    }
}

fn start_logging(
    config: &AppConfig,
    level_flag: Option<&str>,
    dir_flag: Option<&PathBuf>,
) -> Result<()> {
    let level = level_flag
        .or(config.logging.level.as_deref())
        .unwrap_or_else(|| default_log_level());

    match dir_flag.or(config.logging.dir.as_ref()) {
        Some(dir) => {
            let dir = dir
                .to_str()
                .ok_or_else(|| anyhow!("log dir `{}` is not valid UTF-8", dir.display()))?;
            init_logging(level, dir).map_err(|err| anyhow!(err))
        }
        None => init_stderr_logging(level).map_err(|err| anyhow!(err)),
    }
}

fn open_store(config: &AppConfig, in_memory: bool) -> Result<SharedStore> {
    let store: SharedStore = if in_memory {
        Arc::new(InMemoryNoteStore::new())
    } else {
        Arc::new(SqliteNoteStore::new(&config.store.path))
    };
    store
        .initialize()
        .with_context(|| format!("failed to initialize store {}", config.store.path.display()))?;
    Ok(store)
}

async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))
}

async fn run_serve(config: &AppConfig, in_memory: bool) -> Result<()> {
    let store = open_store(config, in_memory)?;
    let listener = bind(config.service_addr()?).await?;
    serve_notes(listener, AppState::new(store), shutdown_signal()).await?;
    Ok(())
}

async fn run_proxy(config: &AppConfig) -> Result<()> {
    let state = ProxyState::new(&config.proxy)?;
    let listener = bind(config.proxy_addr()?).await?;
    serve_proxy(listener, state, shutdown_signal()).await?;
    Ok(())
}

async fn run_up(config: &mut AppConfig, in_memory: bool) -> Result<()> {
    let store = open_store(config, in_memory)?;
    let service_listener = bind(config.service_addr()?).await?;

    // The proxy targets whatever port the service actually bound.
    config.proxy.upstream = local_upstream(service_listener.local_addr()?);
    let proxy_state = ProxyState::new(&config.proxy)?;
    let proxy_listener = bind(config.proxy_addr()?).await?;
    info!(
        "event=topology_up module=cli status=ok service={} proxy={}",
        service_listener.local_addr()?,
        proxy_listener.local_addr()?
    );

    tokio::try_join!(
        serve_notes(service_listener, AppState::new(store), shutdown_signal()),
        serve_proxy(proxy_listener, proxy_state, shutdown_signal()),
    )?;
    Ok(())
}

#[cfg(feature = "relational-db")]
async fn run_wait_db(config: &AppConfig, args: &WaitDbArgs) -> Result<()> {
    let database = config.database.clone();
    let timeout = std::time::Duration::from_secs(args.timeout_secs);
    let interval = std::time::Duration::from_millis(args.interval_ms);
    // The check sleeps between attempts; keep it off the async workers.
    let attempts = tokio::task::spawn_blocking(move || {
        notebox_core::external_db::wait_until_reachable(&database, timeout, interval)
    })
    .await??;
    println!(
        "database {}:{} reachable after {attempts} attempt(s)",
        config.database.host, config.database.port
    );
    Ok(())
}

#[cfg(not(feature = "relational-db"))]
async fn run_wait_db(_config: &AppConfig, _args: &WaitDbArgs) -> Result<()> {
    Err(anyhow!("notebox was built without the `relational-db` feature"))
}

/// Loopback URL for a listener address; wildcard binds map to loopback.
fn local_upstream(addr: SocketAddr) -> String {
    let ip = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        other => other,
    };
    format!("http://{}", SocketAddr::new(ip, addr.port()))
}
