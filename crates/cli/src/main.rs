use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use generator::{ChatClient, LlmGenerator};
use github::GitHubClient;
use orchestrator::{
    HttpTransport, OrchestratorConfig, RetryPolicy, RoundOrchestrator, TaskDispatcher,
};
use server::config::Settings;
use server::{create_router, state::AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pagesmith")]
#[command(about = "Generate, publish and report single-page web apps", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (defaults to ./pagesmith.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the intake server
    Serve {
        /// Overrides the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Load settings and print them with secrets redacted
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Some(Commands::Serve { port }) => serve(config, port).await,
        Some(Commands::Check) => check(config),
        None => serve(config, None).await,
    }
}

fn load_settings(path: Option<&std::path::Path>) -> Result<Settings> {
    Settings::load(path).context("Failed to load settings")
}

fn check(path: Option<&std::path::Path>) -> Result<()> {
    let settings = load_settings(path)?;
    println!("{:#?}", settings);
    Ok(())
}

async fn serve(path: Option<&std::path::Path>, port: Option<u16>) -> Result<()> {
    init_tracing();

    let settings = load_settings(path)?;
    let port = port.unwrap_or(settings.port);

    let github = Arc::new(
        GitHubClient::new(&settings.github.token, settings.github.username.clone())
            .context("Failed to create GitHub client")?,
    );

    let chat = ChatClient::new(settings.llm.api_key.clone(), settings.llm.base_url.clone())
        .context("Failed to create chat client")?;
    let generator = Arc::new(LlmGenerator::new(chat, settings.llm.model.clone()));

    let config = OrchestratorConfig {
        branch: settings.branch.clone(),
        delivery: RetryPolicy::default().with_max_duration(settings.notify_timeout),
    };
    let orchestrator = RoundOrchestrator::new(
        generator,
        github.clone(),
        github,
        Arc::new(HttpTransport::new()),
        config,
    );

    let mut state = AppState::new(
        settings.secret.clone(),
        TaskDispatcher::new(Arc::new(orchestrator)),
    );
    if let Some(dir) = &settings.static_dir {
        state = state.with_static_dir(dir.clone());
    }

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;

    tracing::info!(
        address = %listener.local_addr()?,
        owner = %settings.github.username,
        model = %settings.llm.model,
        branch = %settings.branch,
        "Pagesmith listening"
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// Every workspace crate logs at info unless `RUST_LOG` says otherwise.
const DEFAULT_LOG_FILTER: &str =
    "pagesmith=info,server=info,orchestrator=info,github=info,generator=info,tower_http=info";

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tracing_subscriber::EnvFilter;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_default_filter_keeps_library_crates() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(DEFAULT_LOG_FILTER))
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "generator::openrouter::client", "chat rate limited");
            tracing::info!(target: "github::client", "creating repository");
            tracing::warn!(target: "orchestrator::hosting", "pages unavailable");
            tracing::debug!(target: "github::client", "getting file contents");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("chat rate limited"));
        assert!(output.contains("creating repository"));
        assert!(output.contains("pages unavailable"));
        assert!(!output.contains("getting file contents"));
    }
}
