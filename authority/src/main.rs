//! Rackside License Authority
//!
//! This binary runs on the vendor's server and is the source of truth for
//! the gym fleet:
//! 1. Issues licenses and signs the certificates desktop clients cache
//! 2. Serves the admin console API (organizations, licenses, pushes)
//!
//! Usage:
//!   rackside-authority --admin-token <token> --port 7710
//!
//! The Ed25519 signing key is generated on first start and persisted in the
//! data directory; its public half is what ships embedded in the clients.

use anyhow::{Context, Result};
use clap::Parser;
use ed25519_dalek::SigningKey;
use rackside_authority::registry::Registry;
use rackside_authority::snapshots::SnapshotStore;
use rackside_authority::{build_router, AppState};
use std::{fs, path::PathBuf, sync::Arc};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "rackside-authority")]
#[command(about = "Rackside license authority server")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7710")]
    port: u16,

    /// Directory holding the registry, signing key, and snapshot store
    #[arg(short, long, default_value = "authority-data")]
    data_dir: PathBuf,

    /// Bearer token required on every admin route
    #[arg(long)]
    admin_token: String,

    /// Path to the Ed25519 signing key (defaults to signing.key in the data dir)
    #[arg(long)]
    signing_key: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("Rackside authority starting...");
    fs::create_dir_all(&args.data_dir).context("Failed to create data directory")?;

    let key_path = args
        .signing_key
        .clone()
        .unwrap_or_else(|| args.data_dir.join("signing.key"));
    let signing_key = load_or_generate_signing_key(&key_path)?;
    let public_key_hex = hex::encode(signing_key.verifying_key().to_bytes());

    let registry =
        Registry::open(&args.data_dir.join("registry.db")).context("Failed to open registry")?;
    let snapshots = SnapshotStore::new(args.data_dir.join("backups"));

    let state = AppState {
        registry: Arc::new(registry),
        snapshots: Arc::new(snapshots),
        signing_key: Arc::new(signing_key),
        admin_token: args.admin_token,
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.port))
        .await
        .context("Failed to bind HTTP port")?;

    println!("\n========================================");
    println!("  Rackside Authority Running");
    println!("========================================");
    println!("  Port:       {}", args.port);
    println!("  Data dir:   {}", args.data_dir.display());
    println!("  Public key: {}", public_key_hex);
    println!("========================================\n");

    axum::serve(listener, app).await.context("HTTP server failed")?;
    Ok(())
}

fn load_or_generate_signing_key(path: &PathBuf) -> Result<SigningKey> {
    if path.exists() {
        info!("Loading signing key from {:?}", path);
        let bytes: [u8; 32] = fs::read(path)
            .context("Failed to read signing key file")?
            .try_into()
            .map_err(|_| anyhow::anyhow!("signing key file must hold exactly 32 bytes"))?;
        Ok(SigningKey::from_bytes(&bytes))
    } else {
        info!("Generating new signing key at {:?}", path);
        let key = SigningKey::generate(&mut rand::rngs::OsRng);
        fs::write(path, key.to_bytes()).context("Failed to write signing key file")?;
        Ok(key)
    }
}
