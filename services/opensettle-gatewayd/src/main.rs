//! OpenSettle gateway daemon.
//!
//! Serves the claim surface over HTTP, backed by the in-memory escrow
//! store (durable ledger backends plug in behind the `EscrowStore` trait)
//! and a dual-path dispatcher: one standard relay plus an optional
//! incentivized priority relay.
//!
//! # Usage
//!
//! ```bash
//! # Single-path, ephemeral release key
//! opensettle-gatewayd --relay-url http://127.0.0.1:8899
//!
//! # Dual-path with a priority relay and registry sync
//! opensettle-gatewayd \
//!     --relay-url http://relay-a.internal:8899 \
//!     --priority-relay-url http://relay-b.internal:8899 \
//!     --registry-url http://registry.internal/jobs/completed
//!
//! # Environment overrides
//! OPENSETTLE_LISTEN=0.0.0.0:8402 OPENSETTLE_AUTHORITY_KEY=<hex seed> opensettle-gatewayd
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use ed25519_dalek::SigningKey;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use opensettle_dispatch::{DeliveryPath, JsonRpcRelay};
use opensettle_gateway::{
    AppState, HttpRegistryNotifier, NullNotifier, PaymentGateway, RegistryNotifier, serve,
};
use opensettle_ledger::MemoryStore;
use opensettle_types::{Amount, DispatchConfig, constants};

/// OpenSettle payment gateway - proof-gated escrow settlement
#[derive(Parser, Debug)]
#[command(name = "opensettle-gatewayd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "OPENSETTLE_LISTEN", default_value = "0.0.0.0:8402")]
    listen: SocketAddr,

    /// Standard relay endpoint (JSON-RPC)
    #[arg(long, env = "OPENSETTLE_RELAY_URL", default_value = "http://127.0.0.1:8899")]
    relay_url: String,

    /// Priority relay endpoint (JSON-RPC, incentivized). Enables dual-path
    /// dispatch when set.
    #[arg(long, env = "OPENSETTLE_PRIORITY_RELAY_URL")]
    priority_relay_url: Option<String>,

    /// Incentive pre-paid to the priority relay, in minor units
    #[arg(long, env = "OPENSETTLE_PRIORITY_INCENTIVE", default_value_t = constants::DEFAULT_PRIORITY_INCENTIVE)]
    priority_incentive: u64,

    /// Settlement instruction validity window in milliseconds
    #[arg(long, env = "OPENSETTLE_DISPATCH_EXPIRY_MS", default_value_t = constants::DEFAULT_DISPATCH_EXPIRY_MS)]
    dispatch_expiry_ms: u64,

    /// Job registry endpoint for best-effort completion facts
    #[arg(long, env = "OPENSETTLE_REGISTRY_URL")]
    registry_url: Option<String>,

    /// Hex-encoded 32-byte ed25519 seed for the release authority.
    /// An ephemeral key is generated when omitted.
    #[arg(long, env = "OPENSETTLE_AUTHORITY_KEY")]
    authority_key: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "OPENSETTLE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format (json, pretty)
    #[arg(long, env = "OPENSETTLE_LOG_FORMAT", default_value = "pretty")]
    log_format: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, &args.log_format);

    tracing::info!(
        version = constants::VERSION,
        "starting OpenSettle gateway"
    );

    let signing_key = load_authority_key(args.authority_key.as_deref())?;

    let mut paths: Vec<Arc<dyn DeliveryPath>> =
        vec![Arc::new(JsonRpcRelay::standard("relay", &args.relay_url))];
    match &args.priority_relay_url {
        Some(url) => {
            paths.push(Arc::new(JsonRpcRelay::priority(
                "priority",
                url,
                Amount::new(args.priority_incentive),
            )));
            tracing::info!(standard = %args.relay_url, priority = %url, "dual-path dispatch enabled");
        }
        None => {
            tracing::warn!(
                relay = %args.relay_url,
                "no priority relay configured; dispatching over a single path"
            );
        }
    }

    let notifier: Arc<dyn RegistryNotifier> = match &args.registry_url {
        Some(url) => Arc::new(HttpRegistryNotifier::new(url.clone())),
        None => Arc::new(NullNotifier),
    };

    let dispatch = DispatchConfig {
        expiry_ms: args.dispatch_expiry_ms,
        priority_incentive: Amount::new(args.priority_incentive),
    };

    let gateway = Arc::new(PaymentGateway::new(
        Arc::new(MemoryStore::new()),
        signing_key,
        paths,
        dispatch,
        notifier,
    ));
    tracing::info!(authority = %gateway.authority(), "release authority ready");

    serve(AppState { gateway }, args.listen).await?;

    tracing::info!("gateway shutdown complete");
    Ok(())
}

fn init_logging(level: &str, format: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::registry().with(env_filter);
    match format {
        "json" => subscriber.with(fmt::layer().json().with_target(true)).init(),
        _ => subscriber.with(fmt::layer().pretty().with_target(true)).init(),
    }
}

fn load_authority_key(seed_hex: Option<&str>) -> anyhow::Result<SigningKey> {
    match seed_hex {
        Some(seed_hex) => {
            let raw = hex::decode(seed_hex)?;
            let seed: [u8; 32] = raw
                .as_slice()
                .try_into()
                .map_err(|_| anyhow::anyhow!("authority key must be a 32-byte hex seed"))?;
            Ok(SigningKey::from_bytes(&seed))
        }
        None => {
            tracing::warn!("no authority key provided; generating an ephemeral release key");
            Ok(SigningKey::generate(&mut rand::rngs::OsRng))
        }
    }
}
