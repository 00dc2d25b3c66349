//! huddle-relay binary: load config, bind, serve.

use std::path::PathBuf;

use clap::Parser;
use huddle_config::{toml_loader, validation, HuddleConfig};
use tokio::net::TcpListener;

use huddle_relay::{serve, Hub};

#[derive(Parser)]
#[command(name = "huddle-relay", about = "WebSocket channel hub for huddle clients")]
struct Args {
    /// Port to listen on. Overrides `relay.port`.
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind. Overrides `relay.bind`.
    #[arg(long)]
    bind: Option<String>,

    /// Config file. Defaults to the platform config path.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective config as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

/// Apply command-line overrides on top of the file config.
fn apply_overrides(config: &mut HuddleConfig, args: &Args) {
    if let Some(port) = args.port {
        config.relay.port = u32::from(port);
    }
    if let Some(bind) = &args.bind {
        config.relay.bind = bind.clone();
    }
}

fn load(args: &Args) -> Result<HuddleConfig, huddle_common::ConfigError> {
    match &args.config {
        Some(path) => {
            let config = toml_loader::load_from_path(path)?;
            validation::validate(&config)?;
            Ok(config)
        }
        None => huddle_config::load_config(),
    }
}

#[tokio::main]
async fn main() -> huddle_common::Result<()> {
    let args = Args::parse();
    let loaded = load(&args);
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.as_filter())
        .unwrap_or("info");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("huddle_relay={level}").into()),
        )
        .init();

    let mut config = loaded.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Config unusable, falling back to defaults");
        HuddleConfig::default()
    });
    apply_overrides(&mut config, &args);

    if args.print_config {
        println!("{}", huddle_config::config_to_json(&config));
        return Ok(());
    }

    let port = u16::try_from(config.relay.port).unwrap_or_else(|_| {
        tracing::warn!(port = config.relay.port, "relay.port out of range, using 8080");
        8080
    });
    let addr = format!("{}:{port}", config.relay.bind);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("huddle-relay listening on {}", listener.local_addr()?);

    serve(listener, Hub::new()).await;
    Ok(())
}
