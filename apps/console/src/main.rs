mod commands;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    load_settings, ClientRuntime, ConnectionManager, HttpAnchorRegistry, RegistryView, Settings,
};
use commands::ConsoleCommand;
use shared::domain::WireMode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Operator console for the Slipstream control plane")]
struct Args {
    /// Settings file; defaults to ./console.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    origin: Option<String>,
    #[arg(long)]
    ws_url: Option<String>,
    #[arg(long)]
    api_base: Option<String>,
    #[arg(long)]
    wire_mode: Option<WireMode>,
}

impl Args {
    fn apply(self, settings: &mut Settings) {
        if let Some(origin) = self.origin {
            settings.origin = origin;
        }
        if let Some(ws_url) = self.ws_url {
            settings.ws_url = Some(ws_url);
        }
        if let Some(api_base) = self.api_base {
            settings.api_base = Some(api_base);
        }
        if let Some(wire_mode) = self.wire_mode {
            settings.wire_mode = wire_mode;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let mut args = Args::parse();

    let mut settings = load_settings(args.config.take().as_deref()).context("failed to load settings")?;
    args.apply(&mut settings);
    let ws_url = settings.resolve_ws_url().context("invalid control plane endpoint")?;
    let registry = HttpAnchorRegistry::new(
        settings
            .resolve_registry_url()
            .context("invalid registry endpoint")?,
    );
    info!(%ws_url, wire_mode = settings.wire_mode.as_str(), "console: starting");

    let runtime = ClientRuntime::start(ConnectionManager::new(ws_url), settings.wire_mode);
    let mut events = BroadcastStream::new(runtime.subscribe_events());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", commands::HELP);

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(Ok(event)) => {
                    if let Some(line) = render::event(&event) {
                        println!("{line}");
                    }
                }
                Some(Err(err)) => warn!(%err, "console: event stream lagged"),
                None => break,
            },
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                let command = match commands::parse(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(message) => {
                        println!("{message}");
                        continue;
                    }
                };
                if command == ConsoleCommand::Quit {
                    break;
                }
                if let Err(err) = execute(&runtime, &registry, command).await {
                    warn!(error = %format!("{err:#}"), "console: command failed");
                    break;
                }
            }
        }
    }

    runtime.shutdown().await;
    Ok(())
}

async fn execute(
    runtime: &ClientRuntime,
    registry: &HttpAnchorRegistry,
    command: ConsoleCommand,
) -> Result<()> {
    match command {
        ConsoleCommand::Approve => runtime.approve_presented().await?,
        ConsoleCommand::Dismiss => runtime.dismiss_presented().await?,
        ConsoleCommand::SetWireMode(mode) => runtime.set_wire_mode(mode).await?,
        ConsoleCommand::Stats => println!("{}", render::metrics(&runtime.snapshot())),
        ConsoleCommand::Log(count) => println!("{}", render::log(&runtime.snapshot(), count)),
        ConsoleCommand::Graph => println!("{}", render::graph(&runtime.snapshot())),
        ConsoleCommand::Proposals => println!("{}", render::proposals(&runtime.snapshot())),
        ConsoleCommand::Registry(query) => {
            println!("{}", render::registry(&RegistryView::default(), &query));
            let view = RegistryView::load(registry).await;
            println!("{}", render::registry(&view, &query));
        }
        ConsoleCommand::Status => println!("{}", render::status(&runtime.snapshot())),
        ConsoleCommand::Help => println!("{}", commands::HELP),
        ConsoleCommand::Quit => {}
    }
    Ok(())
}
