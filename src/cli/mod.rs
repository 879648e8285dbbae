//! CLI mode for goatherd - install, inspect, sweep, and serve the offline cache.

mod progress;

use std::env;
use std::path::PathBuf;

use console::style;

use crate::config::AppConfig;
use crate::error::Result;
use crate::gate::CacheGate;
use crate::net::HttpNetwork;
use crate::store::{CacheStore, DiskStore};

/// Subcommands understood by the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Install,
    Status,
    Sweep,
    Serve,
}

/// Parsed command line.
#[derive(Debug)]
struct CliArgs {
    command: Command,
    origin: Option<String>,
    cache_name: Option<String>,
    root: Option<PathBuf>,
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    json: bool,
}

fn print_usage() {
    eprintln!("Usage: goatherd <COMMAND> [OPTIONS]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  install             Pre-cache the asset manifest into the current bucket");
    eprintln!("  status              Show what the current bucket holds");
    eprintln!("  sweep               Delete buckets superseded by the current cache name");
    eprintln!("  serve               Install, then answer requests through the gate");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --origin <URL>      Origin to fetch assets from (default: {})", AppConfig::DEFAULT_ORIGIN);
    eprintln!("  --cache-name <NAME> Override the bucket name");
    eprintln!("  --root <DIR>        Bucket root directory");
    eprintln!("  --config <FILE>     Config file (default: goatherd.toml under the config dir)");
    eprintln!("  --host <HOST>       Serve bind address");
    eprintln!("  --port <N>          Serve bind port");
    eprintln!("  --json              Machine-readable status output");
    eprintln!("  -h, --help          Show this help");
}

/// Returns the value following a flag; exits if it is missing.
fn take_value(args: &[String], i: &mut usize, flag: &str) -> String {
    *i += 1;
    args.get(*i).cloned().unwrap_or_else(|| {
        eprintln!("Error: {flag} requires a value");
        std::process::exit(1);
    })
}

/// Parses the argument list; exits on help or malformed input.
fn parse_args(args: &[String]) -> CliArgs {
    let mut command = None;
    let mut origin = None;
    let mut cache_name = None;
    let mut root = None;
    let mut config_path = None;
    let mut host = None;
    let mut port = None;
    let mut json = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--origin" => origin = Some(take_value(args, &mut i, "--origin")),
            "--cache-name" => cache_name = Some(take_value(args, &mut i, "--cache-name")),
            "--root" => root = Some(PathBuf::from(take_value(args, &mut i, "--root"))),
            "--config" => config_path = Some(PathBuf::from(take_value(args, &mut i, "--config"))),
            "--host" => host = Some(take_value(args, &mut i, "--host")),
            "--port" => {
                let raw = take_value(args, &mut i, "--port");
                port = Some(raw.parse().unwrap_or_else(|_| {
                    eprintln!("Error: invalid port: {raw}");
                    std::process::exit(1);
                }));
            }
            "--json" => json = true,
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            "install" if command.is_none() => command = Some(Command::Install),
            "status" if command.is_none() => command = Some(Command::Status),
            "sweep" if command.is_none() => command = Some(Command::Sweep),
            "serve" if command.is_none() => command = Some(Command::Serve),
            other => {
                eprintln!("Unknown option: {other}");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(command) = command else {
        print_usage();
        std::process::exit(1);
    };

    CliArgs {
        command,
        origin,
        cache_name,
        root,
        config_path,
        host,
        port,
        json,
    }
}

/// Applies command-line overrides on top of the loaded config.
fn apply_overrides(config: &mut AppConfig, cli: &CliArgs) {
    if let Some(origin) = &cli.origin {
        config.origin.clone_from(origin);
    }
    if let Some(name) = &cli.cache_name {
        config.gate.cache_name.clone_from(name);
    }
    if let Some(root) = &cli.root {
        config.paths.bucket_root.clone_from(root);
    }
    if let Some(host) = &cli.host {
        config.serve.host.clone_from(host);
    }
    if let Some(port) = cli.port {
        config.serve.port = port;
    }
}

/// Runs the CLI.
///
/// # Errors
///
/// Returns an error if the selected command fails.
pub async fn run() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let cli = parse_args(&args);

    let mut config = match &cli.config_path {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    apply_overrides(&mut config, &cli);

    match cli.command {
        Command::Install => run_install(&config).await,
        Command::Status => run_status(&config, cli.json).await,
        Command::Sweep => run_sweep(&config).await,
        Command::Serve => run_serve(config).await,
    }
}

/// Opens the bucket, installs the manifest, and reports progress.
async fn install_gate(config: &AppConfig) -> Result<CacheGate<DiskStore, HttpNetwork>> {
    let manifest = config.asset_manifest();
    let store = DiskStore::open(&config.paths.bucket_root, &config.gate.cache_name).await?;
    let network = HttpNetwork::new(config.origin())?;
    let mut gate = CacheGate::with_parts(config.gate.clone(), store, network);

    progress::print_manifest(&manifest, config.origin(), gate.cache_name());
    let bar = progress::InstallBar::new(manifest.len());
    match gate.install(&manifest, &bar).await {
        Ok(stats) => {
            bar.finish();
            progress::print_summary(&stats, gate.cache_name());
            Ok(gate)
        }
        Err(e) => {
            bar.finish();
            eprintln!("{} {e}", style("Install failed:").red().bold());
            eprintln!(
                "Offline support for {} is unavailable until install succeeds.",
                config.gate.cache_name
            );
            Err(e)
        }
    }
}

async fn run_install(config: &AppConfig) -> Result<()> {
    install_gate(config).await.map(|_| ())
}

async fn run_status(config: &AppConfig, json: bool) -> Result<()> {
    let store = DiskStore::open(&config.paths.bucket_root, &config.gate.cache_name).await?;
    let entries = store.entries().await;
    let buckets = DiskStore::list_buckets(&config.paths.bucket_root).await?;

    if json {
        #[derive(serde::Serialize)]
        struct StatusReport<'a> {
            cache_name: &'a str,
            bucket_root: &'a std::path::Path,
            entries: &'a [crate::store::EntrySummary],
            total_bytes: u64,
            stale_buckets: Vec<&'a str>,
        }

        let report = StatusReport {
            cache_name: &config.gate.cache_name,
            bucket_root: &config.paths.bucket_root,
            total_bytes: entries.iter().map(|e| e.size).sum(),
            entries: &entries,
            stale_buckets: buckets
                .iter()
                .filter(|b| **b != config.gate.cache_name)
                .map(String::as_str)
                .collect(),
        };
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        println!("{rendered}");
        return Ok(());
    }

    progress::print_entries(&config.gate.cache_name, &entries);
    let stale: Vec<&String> = buckets
        .iter()
        .filter(|b| **b != config.gate.cache_name)
        .collect();
    if !stale.is_empty() {
        println!(
            "  {} stale bucket(s) on disk: {} (run `goatherd sweep` to delete)",
            stale.len(),
            stale
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        );
    }
    Ok(())
}

async fn run_sweep(config: &AppConfig) -> Result<()> {
    let removed =
        DiskStore::sweep_stale(&config.paths.bucket_root, &config.gate.cache_name).await?;
    if removed.is_empty() {
        println!("No stale buckets under {}.", config.paths.bucket_root.display());
    } else {
        for name in &removed {
            println!("Removed stale bucket {name}");
        }
        println!(
            "Kept {} ({} bucket(s) removed).",
            config.gate.cache_name,
            removed.len()
        );
    }
    Ok(())
}

#[cfg(feature = "serve")]
async fn run_serve(config: AppConfig) -> Result<()> {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use tokio_util::sync::CancellationToken;

    let gate = install_gate(&config).await?;

    let addr: SocketAddr = format!("{}:{}", config.serve.host, config.serve.port)
        .parse()
        .map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid serve address: {e}"),
            )
        })?;

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("shutting down");
            token.cancel();
        }
    });

    println!(
        "Serving {} on http://{addr} (Ctrl-C to stop)",
        config.gate.cache_name
    );
    crate::serve::serve(Arc::new(gate), addr, shutdown).await
}

#[cfg(not(feature = "serve"))]
async fn run_serve(_config: AppConfig) -> Result<()> {
    eprintln!("serve support not compiled in (rebuild with --features serve)");
    std::process::exit(1);
}
