//! `nsyte` binary — spec §6 CLI surface.
//!
//! A thin adapter shape (parse flags, build a runtime options struct,
//! call into the library, print a receipt) scaled up to four
//! subcommands: `upload` (the pipeline orchestrator, spec 4.J), `delete`
//! (the verified deletion orchestrator, spec 4.H, exposed
//! non-interactively since §1 requires a non-interactive path to every
//! capability), `doctor` (diagnostics), and `completions` (shell
//! completion scripts).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tokio_util::sync::CancellationToken;
use zeroize::Zeroizing;

use nsyte_blobstore::{probe_batch, ProbeOutcome};
use nsyte_collector::Collector;
use nsyte_core::{run as run_pipeline, run_verified_deletion, DeleteItem, DeletionSession, PipelineOptions};
use nsyte_progress::{TerminalRenderer, DEFAULT_TICK_INTERVAL};
use nsyte_relay::{fetch_manifest, FetchTimeouts, PublishTimeouts};
use nsyte_signer::{BunkerSigner, BunkerUri, LocalKeySigner, NbunksecSigner, Signer};
use nsyte_types::{ProjectConfig, RelayListEntry, RunSummary, ServerHealthTable};

#[derive(Parser, Debug)]
#[command(name = "nsyte", version)]
#[command(about = "Synchronization and replication engine for decentralized static sites")]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan, diff, upload, and publish a site directory.
    Upload(UploadArgs),
    /// Remove one or more already-published paths (spec 4.H), non-interactively.
    Delete(DeleteArgs),
    /// Print signer/config/relay/server diagnostics.
    Doctor(DoctorArgs),
    /// Print a shell completion script to stdout.
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
struct CompletionsArgs {
    shell: Shell,
}

#[derive(Args, Debug)]
struct SignerArgs {
    /// Hex or bech32 (nsec1...) private key.
    #[arg(long)]
    privatekey: Option<String>,

    /// `bunker://<pubkey>?relay=...&secret=...` NIP-46 connection string.
    #[arg(long)]
    bunker: Option<String>,

    /// Stored `bunker://...` connection string (treated like `--bunker`,
    /// already paired with the one-time secret it carries).
    #[arg(long)]
    nbunksec: Option<String>,

    /// Fail instead of prompting when no signer is configured.
    #[arg(long)]
    non_interactive: bool,
}

#[derive(Args, Debug)]
struct UploadArgs {
    /// Directory to publish.
    #[arg(default_value = ".")]
    target: PathBuf,

    /// Re-upload and re-publish every local file, even if unchanged remotely.
    #[arg(long)]
    force: bool,

    /// Delete everything already published before reconciling.
    #[arg(long)]
    purge: bool,

    /// Print every collected message, not just the final summary.
    #[arg(long)]
    verbose: bool,

    /// Concurrent file uploads.
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Comma-separated blob server URLs, overriding the persisted set.
    #[arg(long)]
    servers: Option<String>,

    /// Comma-separated relay URLs, overriding the persisted set.
    #[arg(long)]
    relays: Option<String>,

    /// Local file to additionally publish at a fixed `/404.html` path.
    #[arg(long)]
    fallback: Option<PathBuf>,

    #[arg(long)]
    publish_server_list: bool,

    #[arg(long)]
    publish_relay_list: bool,

    #[arg(long)]
    publish_profile: bool,

    #[command(flatten)]
    signer: SignerArgs,
}

#[derive(Args, Debug)]
struct DeleteArgs {
    /// Directory the config for this site lives under.
    #[arg(default_value = ".")]
    target: PathBuf,

    /// Site path to delete (repeatable).
    #[arg(long = "path", required = true)]
    paths: Vec<String>,

    #[command(flatten)]
    signer: SignerArgs,
}

#[derive(Args, Debug)]
struct DoctorArgs {
    #[arg(default_value = ".")]
    target: PathBuf,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    match try_main().await {
        Ok(code) => std::process::ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::ExitCode::from(1)
        }
    }
}

async fn try_main() -> Result<u8> {
    let cli = Cli::parse();
    match cli.cmd {
        Commands::Upload(args) => cmd_upload(args).await,
        Commands::Delete(args) => cmd_delete(args).await,
        Commands::Doctor(args) => cmd_doctor(args).await,
        Commands::Completions(args) => {
            generate(args.shell, &mut Cli::command(), "nsyte", &mut std::io::stdout());
            Ok(0)
        }
    }
}

async fn cmd_upload(args: UploadArgs) -> Result<u8> {
    let collector = Arc::new(Collector::new());
    let signer = resolve_signer(&args.signer).await?;
    let pubkey_hex = signer.public_key().to_hex();
    let config = resolve_config(&args.target, &pubkey_hex, args.servers.as_deref(), args.relays.as_deref())?;

    let cancellation = CancellationToken::new();
    let interrupt_token = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt_token.cancel();
        }
    });

    let renderer = Arc::new(TerminalRenderer::new(0));
    let ticker = {
        let collector = Arc::clone(&collector);
        let renderer = Arc::clone(&renderer);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(DEFAULT_TICK_INTERVAL);
            loop {
                interval.tick().await;
                renderer.tick(&collector);
            }
        })
    };

    let options = PipelineOptions {
        target_dir: args.target.clone(),
        force: args.force,
        purge: args.purge,
        concurrency: args.concurrency.max(1),
        fallback_file: args.fallback.clone(),
        publish_server_list: args.publish_server_list || config.publish_server_list,
        publish_relay_list: args.publish_relay_list || config.publish_relay_list,
        publish_profile: args.publish_profile,
    };

    let result = run_pipeline(&options, &config, signer, &collector, &cancellation).await;

    ticker.abort();
    renderer.tick(&collector);

    match result {
        Ok(summary) => {
            renderer.finish("done");
            print_summary(&summary);
            if args.verbose {
                print_collector(&collector);
            }
            Ok(0)
        }
        Err(e) => {
            renderer.finish("failed");
            Err(anyhow::Error::from(e))
        }
    }
}

async fn cmd_delete(args: DeleteArgs) -> Result<u8> {
    let collector = Collector::new();
    let signer = resolve_signer(&args.signer).await?;
    let pubkey_hex = signer.public_key().to_hex();
    let config = nsyte_config::load_from_workspace(&args.target)?.with_context(|| {
        format!("no config found under {}; run `nsyte upload` at least once first", args.target.display())
    })?;
    if config.publisher_pubkey != pubkey_hex {
        bail!("signer pubkey {pubkey_hex} does not match the configured publisher {}", config.publisher_pubkey);
    }

    let relay_client = nostr_sdk::Client::new(nostr::Keys::generate());
    for relay in &config.relays {
        let _ = relay_client.add_relay(relay.url.as_str()).await;
    }
    relay_client.connect().await;

    let read_relays: Vec<String> = config.read_relays().into_iter().map(String::from).collect();
    let remote = fetch_manifest(signer.public_key(), &read_relays, FetchTimeouts::default(), &collector).await;

    let targets: Vec<_> = remote.into_iter().filter(|entry| args.paths.contains(&entry.path)).collect();
    if targets.is_empty() {
        println!("no matching published files found for the given --path value(s)");
        relay_client.disconnect().await;
        return Ok(0);
    }

    let http = reqwest::Client::new();
    let health = Arc::new(ServerHealthTable::new());
    let probed = probe_batch(&targets, &config.servers, &health, &http, 5, 3).await;

    let items: Vec<DeleteItem> = targets
        .iter()
        .map(|entry| {
            let known_servers = entry
                .digest
                .as_ref()
                .and_then(|d| probed.get(d))
                .map(|per_server| {
                    per_server.iter().filter(|(_, o)| **o == ProbeOutcome::Present).map(|(s, _)| s.clone()).collect()
                })
                .unwrap_or_else(|| config.servers.clone());
            DeleteItem { file: entry.clone(), known_servers }
        })
        .collect();

    let session = DeletionSession::ready(signer);
    let report =
        run_verified_deletion(items, &relay_client, &session, &http, PublishTimeouts::default(), Duration::from_secs(2), &collector)
            .await?;
    relay_client.disconnect().await;

    for outcome in &report.per_file {
        println!("{}: {:?} (verification: {:?})", outcome.path, outcome.state, outcome.verification);
    }

    Ok(0)
}

async fn cmd_doctor(args: DoctorArgs) -> Result<u8> {
    println!("target: {}", args.target.display());

    let config = nsyte_config::load_from_workspace(&args.target)?;
    match &config {
        Some(cfg) => {
            println!("config: {}", nsyte_config::config_path(&args.target).display());
            println!("publisher_pubkey: {}", cfg.publisher_pubkey);
            println!("relays_configured: {}", cfg.relays.len());
            println!("servers_configured: {}", cfg.servers.len());
            println!("bunker_configured: {}", cfg.bunker_pubkey.is_some());
        }
        None => println!("config: none found under this target (first run)"),
    }

    println!("NSYTE_DISABLE_KEYCHAIN: {}", nsyte_config::keychain_disabled());
    println!("NSYTE_TEST_MODE: {}", nsyte_config::test_mode());

    if let Some(cfg) = &config {
        let http = reqwest::Client::new();
        for server in &cfg.servers {
            let reachable = http.get(server).timeout(Duration::from_secs(3)).send().await.is_ok();
            println!("server {server}: {}", if reachable { "reachable" } else { "unreachable" });
        }
    }

    Ok(0)
}

/// Resolve a [`Signer`] from explicit flags, falling back to an
/// interactive stdin prompt unless `--non-interactive` was given (spec
/// 4.H: "if no Signer is yet configured, transition ... collect
/// credentials ... Credentials MUST be cleared from memory immediately
/// after Signer creation").
async fn resolve_signer(args: &SignerArgs) -> Result<Arc<dyn Signer>> {
    if let Some(key) = &args.privatekey {
        let key = Zeroizing::new(key.clone());
        let signer = LocalKeySigner::from_secret_key_str(&key)?;
        return Ok(Arc::new(signer));
    }
    if let Some(uri) = &args.bunker {
        let uri = Zeroizing::new(uri.clone());
        let parsed = BunkerUri::parse(&uri)?;
        let signer = BunkerSigner::connect(parsed).await?;
        return Ok(Arc::new(signer));
    }
    if let Some(token) = &args.nbunksec {
        let signer = NbunksecSigner::connect(token).await?;
        return Ok(Arc::new(signer));
    }

    if args.non_interactive {
        bail!("no signer configured: pass --privatekey, --bunker, or --nbunksec");
    }

    eprint!("no signer configured; paste a private key (hex or nsec1...): ");
    std::io::Write::flush(&mut std::io::stderr()).ok();
    let mut line = String::new();
    std::io::stdin().read_line(&mut line).context("failed to read private key from stdin")?;
    let key = Zeroizing::new(line.trim().to_string());
    let signer = LocalKeySigner::from_secret_key_str(&key)?;
    Ok(Arc::new(signer))
}

fn parse_csv(input: &str) -> Vec<String> {
    input.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}

/// Load the persisted config, or bootstrap one from `--servers`/`--relays`
/// on a project's first run, persisting the bootstrap result immediately
/// since nsyte's config carries identity, not just tuning knobs.
fn resolve_config(target: &Path, publisher_pubkey: &str, servers_csv: Option<&str>, relays_csv: Option<&str>) -> Result<ProjectConfig> {
    let mut config = nsyte_config::load_from_workspace(target)?.unwrap_or_else(|| ProjectConfig {
        publisher_pubkey: publisher_pubkey.to_string(),
        relays: Vec::new(),
        servers: Vec::new(),
        bunker_pubkey: None,
        fallback_filename: None,
        profile_json: None,
        publish_server_list: false,
        publish_relay_list: false,
        gateway_hostnames: Vec::new(),
    });

    if let Some(csv) = servers_csv {
        config.servers = parse_csv(csv);
    }
    if let Some(csv) = relays_csv {
        config.relays = parse_csv(csv).into_iter().map(|url| RelayListEntry { url, read: true, write: true }).collect();
    }

    if config.relays.is_empty() || config.servers.is_empty() {
        bail!(
            "no relays/servers configured under {}; pass --relays and --servers on first run",
            nsyte_config::config_path(target).display()
        );
    }

    nsyte_config::save_to_workspace(target, &config)?;
    Ok(config)
}

fn print_summary(summary: &RunSummary) {
    println!(
        "{} uploaded, {} unchanged, {} deleted, {} failed ({} scanned, {} relays published, {} relays rejected)",
        summary.files_transferred,
        summary.files_unchanged,
        summary.files_deleted,
        summary.files_failed,
        summary.files_scanned,
        summary.relays_published,
        summary.relays_rejected,
    );
}

fn print_collector(collector: &Collector) {
    for message in collector.snapshot() {
        let suffix = if message.occurrences > 1 { format!(" (x{})", message.occurrences) } else { String::new() };
        println!("[{:?}/{:?}] {}: {}{suffix}", message.kind, message.category, message.target, message.content);
    }
}
