use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use streamgate::{
    config::Config,
    playback::{
        DefaultEngineFactory, HeadlessSink, PlatformCapabilities, PlaybackController, Settled,
    },
    web::{AppState, WebServer},
};

#[derive(Parser)]
#[command(name = "streamgate")]
#[command(version)]
#[command(about = "Authenticated HLS manifest gateway with a playback session probe")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Media service base URL (overrides config file)
    #[arg(short = 'm', long, value_name = "URL")]
    media_service_base: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the manifest gateway (default)
    Serve,
    /// Play a manifest URL on a headless sink and report the outcome
    Probe {
        /// Manifest URL, typically this gateway's `/stream?filmId=...`
        url: String,

        /// Bearer token sent with manifest requests
        #[arg(short, long, env = "STREAMGATE_PROBE_TOKEN")]
        token: Option<String>,

        /// Pretend the sink plays HLS natively
        #[arg(long)]
        native_hls: bool,

        /// How long to wait for playback to settle
        #[arg(long, default_value = "15s", value_parser = humantime::parse_duration)]
        timeout: Duration,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = if cli.log_level == "trace" {
        format!("streamgate={},tower_http=trace", cli.log_level)
    } else {
        format!("streamgate={}", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(base) = cli.media_service_base {
        config.upstream.media_service_base = base;
    }
    config.validate()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Probe {
            url,
            token,
            native_hls,
            timeout,
        } => probe(config, url, token, native_hls, timeout).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    info!("Starting streamgate v{}", env!("CARGO_PKG_VERSION"));
    info!("Media service: {}", config.upstream.media_service_base);

    let web_server = WebServer::new(AppState::new(config)?)?;
    info!(
        "Starting web server on {}:{}",
        web_server.host(),
        web_server.port()
    );

    let (server_ready_tx, server_ready_rx) = tokio::sync::oneshot::channel();

    let server_handle = tokio::spawn(async move {
        if let Err(e) = web_server.serve_with_signal(server_ready_tx).await {
            tracing::error!("Web server failed: {}", e);
        }
    });

    match server_ready_rx.await {
        Ok(Ok(())) => {
            info!("Web server is now listening");
        }
        Ok(Err(bind_error)) => {
            tracing::error!("Failed to bind web server: {}", bind_error);
            return Err(bind_error);
        }
        Err(_) => {
            tracing::error!("Web server task completed without signaling");
            return Err(anyhow::anyhow!("Web server failed to start"));
        }
    }

    server_handle.await?;

    Ok(())
}

async fn probe(
    config: Config,
    url: String,
    token: Option<String>,
    native_hls: bool,
    timeout: Duration,
) -> Result<()> {
    let factory = DefaultEngineFactory::new(config.playback.clone(), &config.upstream.user_agent)?
        .with_bearer_token(token);
    let mut controller = PlaybackController::new(factory, PlatformCapabilities::default());
    let sink = Arc::new(HeadlessSink::new("probe", native_hls));

    let session = controller.start(sink.clone(), &url);
    info!("Probing {} as {}", url, session);

    let outcome = tokio::time::timeout(timeout, controller.settle()).await;
    let result = match outcome {
        Ok(Settled::Playing) => {
            println!(
                "playing: strategy={} source={}",
                controller
                    .strategy()
                    .map(|s| s.as_str())
                    .unwrap_or("unknown"),
                sink.current_source().unwrap_or_default()
            );
            Ok(())
        }
        Ok(Settled::Failed(report)) => Err(anyhow::anyhow!(
            "{} (status {})",
            report,
            report
                .upstream_status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "none".to_string())
        )),
        Ok(Settled::Inactive) => Err(anyhow::anyhow!("Session ended without a result")),
        Err(_) => Err(anyhow::anyhow!(
            "Playback did not settle within {}",
            humantime::format_duration(timeout)
        )),
    };

    controller.stop();
    result
}
