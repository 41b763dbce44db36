//! Gemini chat widget server and terminal client.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use gemini_chat::config::{AppConfig, Cli, Command, load_gemini_settings};
use gemini_chat::llm::GeminiClient;
use gemini_chat::widget::ChatController;
use gemini_chat::{server, terminal};

#[tokio::main]
async fn main() {
    // Load .env (if present)
    let _ = dotenv();

    init_tracing();

    let cli = Cli::parse();
    let config = match AppConfig::from_cli(&cli) {
        Ok(c) => c,
        Err(e) => exit_with_config_error(&e.to_string()),
    };

    let result = match cli.command() {
        Command::Serve => serve(config).await,
        Command::Chat { .. } => chat(&config).await,
    };

    if let Err(e) = result {
        error!(error = %e, "Fatal error");
        std::process::exit(1);
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let settings = match load_gemini_settings(&config.gemini) {
        Ok(s) => s,
        Err(msg) => exit_with_config_error(&msg),
    };

    info!(
        name: "server.config.loaded",
        host = %config.server.host,
        port = config.server.port,
        model = %settings.model,
        "Server configuration loaded"
    );

    let client = Arc::new(GeminiClient::new(settings)?);
    server::start_server(Arc::new(config), Arc::clone(&client) as Arc<dyn gemini_chat::llm::TextGenerator>, client).await
}

async fn chat(config: &AppConfig) -> anyhow::Result<()> {
    let controller = ChatController::from_config(&config.widget)?;

    info!(
        name: "terminal.config.loaded",
        server_url = %config.widget.server_url,
        placeholder_removal = controller.placeholder_removal().as_str(),
        "Chat client configured"
    );

    terminal::run(controller).await
}

/// Initialize tracing (M-LOG-STRUCTURED).
///
/// Logs go to stderr so the terminal client's stdout only carries the chat.
/// `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_target(true).with_writer(std::io::stderr)))
        .init();
}

fn exit_with_config_error(msg: &str) -> ! {
    eprintln!("Configuration error: {msg}");
    std::process::exit(1);
}
