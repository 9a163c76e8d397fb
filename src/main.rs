use std::sync::Arc;

use clap::Parser;
use forge_live::event::CONNECTED;
use forge_live::{
    ConfigError, LiveClient, LiveConfig, Notification, NoToken, StaticToken, TicketEndpoint, TokenSource, WsConnector,
};
use serde_json::Value;
use tokio::sync::Notify;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("live updates are disabled; set LIVE_UPDATES_ENABLED=true or pass --enable")]
    Disabled,
    #[error("invalid --data JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("failed to wait for shutdown signal: {0}")]
    Signal(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "forge-live", about = "Rule Forge Hub live-update client")]
struct Cli {
    /// Base endpoint; overrides `LIVE_UPDATES_URL`.
    #[arg(long)]
    url: Option<String>,

    #[arg(long, env = "LIVE_UPDATES_TOKEN", conflicts_with = "ticket_url")]
    token: Option<String>,

    /// HTTP endpoint that issues one-time connection tickets.
    #[arg(long, env = "LIVE_UPDATES_TICKET_URL")]
    ticket_url: Option<String>,

    /// Bearer token presented to the ticket endpoint.
    #[arg(long, env = "LIVE_UPDATES_SESSION_TOKEN", requires = "ticket_url")]
    session_token: Option<String>,

    /// Reconnect interval; overrides `LIVE_UPDATES_RECONNECT_MS`.
    #[arg(long)]
    reconnect_ms: Option<u64>,

    /// Force the feature flag on.
    #[arg(long, default_value_t = false)]
    enable: bool,

    /// Event names to log.
    #[arg(long, value_delimiter = ',', default_value = "connected,disconnected,error,message")]
    events: Vec<String>,

    /// Send one message of this type after the first successful open.
    #[arg(long)]
    send: Option<String>,

    #[arg(long, default_value = "null", requires = "send")]
    data: String,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    if !config.enabled {
        return Err(CliError::Disabled);
    }
    let outbound = match &cli.send {
        Some(kind) => Some((kind.clone(), serde_json::from_str::<Value>(&cli.data)?)),
        None => None,
    };

    let tokens: Arc<dyn TokenSource> = match (&cli.token, &cli.ticket_url) {
        (Some(token), _) => Arc::new(StaticToken::new(token.clone())),
        (None, Some(url)) => Arc::new(TicketEndpoint::new(url.clone(), cli.session_token.clone())),
        (None, None) => Arc::new(NoToken),
    };
    let client = LiveClient::with_parts(config, Arc::new(WsConnector), tokens);

    let _logs: Vec<_> = cli.events.iter().map(|event| client.on(event, log_notification(event.clone()))).collect();
    let opened = Arc::new(Notify::new());
    let _opened = {
        let opened = Arc::clone(&opened);
        client.on(CONNECTED, move |_| opened.notify_one())
    };

    info!(url = %client.config().url, "starting live-update client");
    client.connect();

    if let Some((kind, data)) = outbound {
        tokio::select! {
            () = opened.notified() => {
                client.send(&kind, data);
                info!(%kind, "sent live-update message");
            }
            res = tokio::signal::ctrl_c() => {
                client.disconnect();
                return res.map_err(CliError::from);
            }
        }
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down live-update client");
    client.disconnect();
    Ok(())
}

fn build_config(cli: &Cli) -> Result<LiveConfig, CliError> {
    let mut config = LiveConfig::from_env()?;
    if let Some(url) = &cli.url {
        config = config.with_url(url)?;
    }
    if let Some(ms) = cli.reconnect_ms {
        config = config.with_reconnect_ms(ms)?;
    }
    if cli.enable {
        config.enabled = true;
    }
    Ok(config)
}

fn log_notification(event: String) -> impl Fn(&Notification) + Send + Sync + 'static {
    move |notification| match notification {
        Notification::Message(envelope) => {
            info!(%event, data = %envelope.data, timestamp = ?envelope.timestamp, "live update");
        }
        Notification::Error(message) => warn!(%event, error = %message, "live-update error"),
        Notification::Connected | Notification::Disconnected => info!(%event, "live-update status"),
    }
}
