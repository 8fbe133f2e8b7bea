//! Binary entry point: load config, wire collaborators, serve the gateway.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use {
    anyhow::Context,
    clap::Parser,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    charla_agents::{ChatModel, OpenAiChat},
    charla_common::{OpsFlags, Outbound},
    charla_config::CharlaConfig,
    charla_engine::{Engine, EngineSettings},
    charla_flows::{Chunker, FlowContext, FlowSettings},
    charla_gateway::AppState,
    charla_integrations::{Calendar, ChatwootClient, CrmSync, WebhookCalendar},
    charla_reminders::ReminderScheduler,
    charla_sessions::SessionStore,
    charla_whatsapp::MetaSender,
};

#[derive(Debug, Parser)]
#[command(name = "charla", about = "Charla — WhatsApp assistant gateway")]
struct Cli {
    /// Config file path (overrides discovery).
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Address to bind to (overrides config value).
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on (overrides config value).
    #[arg(long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Wire every collaborator out of the config and build the app state.
fn build_state(config: &CharlaConfig) -> anyhow::Result<AppState> {
    let api_key = config
        .generation
        .resolve_api_key()
        .context("no API key: set generation.api_key or OPENAI_API_KEY")?;
    let model: Arc<dyn ChatModel> = Arc::new(OpenAiChat::new(
        api_key,
        config.generation.model.clone(),
        config.generation.base_url.clone(),
        Duration::from_secs(config.generation.timeout_secs),
    )?);

    let access_token = config
        .whatsapp
        .access_token
        .clone()
        .context("whatsapp.access_token is required")?;
    let outbound: Arc<dyn Outbound> = Arc::new(MetaSender::new(
        config.whatsapp.phone_number_id.clone(),
        access_token,
        config.whatsapp.api_version.clone(),
    )?);

    let crm: Option<Arc<dyn CrmSync>> = if config.crm.endpoint.is_empty() {
        info!("no CRM endpoint configured, mirroring disabled");
        None
    } else {
        let token = config
            .crm
            .token
            .clone()
            .context("crm.token is required when crm.endpoint is set")?;
        Some(Arc::new(ChatwootClient::new(
            config.crm.endpoint.clone(),
            config.crm.account_id,
            token,
        )?))
    };

    let calendar: Option<Arc<dyn Calendar>> = if config.calendar.webhook_url.is_empty() {
        info!("no calendar webhook configured, records stay local");
        None
    } else {
        Some(Arc::new(WebhookCalendar::new(
            config.calendar.webhook_url.clone(),
        )?))
    };

    let ctx = FlowContext {
        store: Arc::new(SessionStore::new()),
        model,
        reminders: ReminderScheduler::new(),
        outbound,
        crm,
        calendar,
        ops: Arc::new(OpsFlags::new()),
        chunker: Chunker::new()?,
        settings: FlowSettings::from_config(config),
    };

    let engine = Engine::new(ctx, EngineSettings::from_config(config));
    engine.start_idle_sweep();

    Ok(AppState {
        engine,
        whatsapp: config.whatsapp.clone(),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "charla starting");

    let config = match &cli.config {
        Some(path) => charla_config::load_config(path)?,
        None => charla_config::discover_and_load(),
    };

    let bind = cli
        .bind
        .clone()
        .unwrap_or_else(|| config.server.bind.clone());
    let port = cli.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {bind}:{port}"))?;

    let state = build_state(&config)?;
    charla_gateway::serve(addr, state).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_overrides_unset() {
        let cli = Cli::try_parse_from(["charla"]).unwrap();
        assert!(cli.config.is_none());
        assert!(cli.bind.is_none());
        assert!(cli.port.is_none());
        assert_eq!(cli.log_level, "info");
        assert!(!cli.json_logs);
    }

    #[test]
    fn flags_override_everything() {
        let cli = Cli::try_parse_from([
            "charla",
            "--config",
            "/etc/charla.toml",
            "--bind",
            "127.0.0.1",
            "--port",
            "9000",
            "--log-level",
            "debug",
            "--json-logs",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/etc/charla.toml")));
        assert_eq!(cli.bind.as_deref(), Some("127.0.0.1"));
        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.log_level, "debug");
        assert!(cli.json_logs);
    }
}
