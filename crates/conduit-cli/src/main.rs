mod commands;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use conduit_api::{SessionFactory, SessionFixture};
use conduit_connectors::{DefaultSessionFactory, RecordingPubSub};
use conduit_core::{
    DeclarationCatalog, default_config_dir, demo_catalog, demo_session, load_catalog_from_dir,
    load_session_fixture_from_dir, validate_catalog, write_default_config_files,
};
use conduit_runtime::ConduitRuntime;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::commands::widgets;

#[derive(Debug, Parser)]
#[command(name = "conduit", about = "Conduit CLI: inspect widget connection bindings")]
struct Cli {
    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write example widgets.toml and session.json
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Load and validate the widget catalog
    Validate,
    /// Show the binding mode of every declared widget
    Modes,
    /// Mount widgets against the session fixture and print their state
    Resolve {
        /// Only resolve this widget
        #[arg(long)]
        widget: Option<String>,
    },
    /// Deliver one pub/sub message to the mounted widgets
    Deliver {
        #[arg(long)]
        topic: String,
        /// JSON payload (defaults to null)
        #[arg(long)]
        payload: Option<String>,
    },
    /// Mount everything, tear everything down, report pub/sub effects
    TeardownCheck,
}

/// Runtime over the session fixture, with the recorder standing in for the
/// pub/sub transport.
pub struct Session {
    pub runtime: ConduitRuntime,
    pub pubsub: Arc<RecordingPubSub>,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg_dir = cli.config_dir.clone().unwrap_or_else(default_config_dir);

    match cli.command {
        Commands::Init { force } => {
            if force && cfg_dir.exists() {
                for name in ["widgets.toml", "session.json"] {
                    let p = cfg_dir.join(name);
                    if p.exists() {
                        fs::remove_file(&p)?;
                    }
                }
            }
            write_default_config_files(&cfg_dir)?;
            pout(
                cli.json,
                serde_json::json!({"message": "init complete", "config_dir": cfg_dir}),
                "Init complete",
            )?;
        }
        Commands::Validate => {
            let catalog = load_catalog(&cfg_dir)?;
            validate_catalog(&catalog)?;
            pout(
                cli.json,
                serde_json::json!({"ok": true, "widgets": catalog.widgets.len()}),
                &format!("Catalog valid: {} widgets", catalog.widgets.len()),
            )?;
        }
        Commands::Modes => {
            let catalog = load_catalog(&cfg_dir)?;
            widgets::cmd_modes(&catalog, cli.json)?;
        }
        Commands::Resolve { widget } => {
            let catalog = load_catalog(&cfg_dir)?;
            let session = build_session(&cfg_dir)?;
            widgets::cmd_resolve(&catalog, &session, widget.as_deref(), cli.json)?;
        }
        Commands::Deliver { topic, payload } => {
            let catalog = load_catalog(&cfg_dir)?;
            let session = build_session(&cfg_dir)?;
            let payload = match payload {
                Some(raw) => serde_json::from_str(&raw)?,
                None => serde_json::Value::Null,
            };
            widgets::cmd_deliver(&catalog, &session, &topic, payload, cli.json)?;
        }
        Commands::TeardownCheck => {
            let catalog = load_catalog(&cfg_dir)?;
            let session = build_session(&cfg_dir)?;
            widgets::cmd_teardown_check(&catalog, &session, cli.json)?;
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CONDUIT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_catalog(cfg_dir: &Path) -> anyhow::Result<DeclarationCatalog> {
    if cfg_dir.join("widgets.toml").exists() {
        return Ok(load_catalog_from_dir(cfg_dir)?);
    }
    debug!(dir = %cfg_dir.display(), "no widgets.toml, using bundled example");
    Ok(demo_catalog()?)
}

fn load_fixture(cfg_dir: &Path) -> anyhow::Result<SessionFixture> {
    if cfg_dir.join("session.json").exists() {
        return Ok(load_session_fixture_from_dir(cfg_dir)?);
    }
    debug!(dir = %cfg_dir.display(), "no session.json, using bundled example");
    Ok(demo_session()?)
}

fn build_session(cfg_dir: &Path) -> anyhow::Result<Session> {
    let fixture = load_fixture(cfg_dir)?;
    if !fixture.connected {
        warn!("session fixture is not connected, subscriptions stay deferred");
    }
    let pubsub = Arc::new(RecordingPubSub::new());
    let context = DefaultSessionFactory.build(&fixture, pubsub.clone())?;
    Ok(Session {
        runtime: ConduitRuntime::with_fixture(context, &fixture),
        pubsub,
    })
}

pub fn pout(json_mode: bool, value: serde_json::Value, text: &str) -> anyhow::Result<()> {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{text}");
    }
    Ok(())
}
