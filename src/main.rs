use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use infobot::chat::{ChatOrchestrator, ChatState, chat_routes};
use infobot::config::AppConfig;
use infobot::flow::{FlowDefinition, FlowEngine};
use infobot::llm::{GenerativeFallback, create_provider};
use infobot::persona::build_persona;
use infobot::store::{Database, LibSqlBackend, RoutedStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export OPENAI_API_KEY=sk-...  (or set INFOBOT_LLM_BACKEND=anthropic)");
        std::process::exit(1);
    });

    // Initialize tracing: stderr plus a daily rolling file
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "infobot.log");
    let (file_writer, _log_guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    // ── LLM + persona ───────────────────────────────────────────────────
    let llm = create_provider(&config.llm)?;
    let persona = build_persona(config.app, config.knowledge_path.as_deref(), Arc::clone(&llm))?;

    let flow = match &config.flow_path {
        Some(path) => Some(FlowDefinition::load(path)?),
        None => persona.default_flow().transpose()?,
    };

    eprintln!("🤖 {} v{}", persona.display_name(), env!("CARGO_PKG_VERSION"));
    eprintln!("   App: {}", config.app);
    eprintln!("   Model: {}", config.llm.model);
    match &flow {
        Some(def) => eprintln!("   Flow: {} steps (start: {})", def.len(), def.start()),
        None => eprintln!("   Flow: none"),
    }

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .unwrap_or_else(|e| {
                eprintln!(
                    "Error: Failed to open database at {}: {}",
                    config.db_path.display(),
                    e
                );
                std::process::exit(1);
            }),
    );
    let store: Arc<dyn Database> = Arc::new(RoutedStore::new(db));
    eprintln!("   Database: {}", config.db_path.display());

    // ── Chat ─────────────────────────────────────────────────────────────
    let orchestrator = ChatOrchestrator::new(
        store,
        persona,
        flow.map(|def| FlowEngine::new(Arc::new(def))),
        GenerativeFallback::new(llm),
    )
    .with_history_limit(config.history_limit);

    let app = chat_routes(ChatState {
        orchestrator: Arc::new(orchestrator),
    });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    eprintln!("   Chat API: http://0.0.0.0:{}/chat\n", config.port);
    tracing::info!(port = config.port, "HTTP server started");

    axum::serve(listener, app).await?;
    Ok(())
}
