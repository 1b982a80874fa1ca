use clap::Parser;
use qdrant_mcp_launch::{
    ConfigKey, DEFAULT_SERVER_BIN, Launcher, RuntimeConfig, SERVER_BIN_ENV, SERVER_PORT,
    ServerCommand, TRANSPORT_ENV, Transport, exit_code,
};
use std::process::ExitCode;
use tracing::{debug, error, info};

#[derive(Parser)]
#[command(
    name = "qdrant-mcp-launch",
    version,
    about = "Start the Qdrant MCP server with environment-driven configuration"
)]
struct Cli {
    /// Transport the server speaks to its clients
    #[arg(long, value_enum, default_value_t = Transport::Sse, env = TRANSPORT_ENV)]
    transport: Transport,

    /// Server executable to run
    #[arg(long, default_value = DEFAULT_SERVER_BIN, env = SERVER_BIN_ENV)]
    server_bin: String,

    /// Run the server as a child and wait for it instead of replacing this process
    #[arg(long)]
    supervise: bool,

    /// Print the resolved command and configuration, then exit
    #[arg(long)]
    dry_run: bool,

    /// Qdrant URL (overrides QDRANT_URL)
    #[arg(long)]
    qdrant_url: Option<String>,

    /// Qdrant API key (overrides QDRANT_API_KEY)
    #[arg(long)]
    qdrant_api_key: Option<String>,

    /// Collection name (overrides COLLECTION_NAME)
    #[arg(long)]
    collection_name: Option<String>,

    /// Embedding model (overrides EMBEDDING_MODEL)
    #[arg(long)]
    embedding_model: Option<String>,

    /// Embedding provider (overrides EMBEDDING_PROVIDER)
    #[arg(long)]
    embedding_provider: Option<String>,

    /// Ollama base URL (overrides OLLAMA_BASE_URL)
    #[arg(long)]
    ollama_base_url: Option<String>,

    /// Extra arguments handed to the server, after `--`
    #[arg(last = true)]
    server_args: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // stderr: with the stdio transport stdout belongs to the MCP stream.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qdrant_mcp_launch=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = RuntimeConfig::from_env()
        .with_override(ConfigKey::QdrantUrl, cli.qdrant_url)
        .with_override(ConfigKey::QdrantApiKey, cli.qdrant_api_key)
        .with_override(ConfigKey::CollectionName, cli.collection_name)
        .with_override(ConfigKey::EmbeddingModel, cli.embedding_model)
        .with_override(ConfigKey::EmbeddingProvider, cli.embedding_provider)
        .with_override(ConfigKey::OllamaBaseUrl, cli.ollama_base_url);

    let command = ServerCommand {
        program: cli.server_bin,
        transport: cli.transport,
        extra_args: cli.server_args,
        config,
    };

    if cli.dry_run {
        println!("{}", command.command_line());
        print!("{}", command.config);
        return ExitCode::SUCCESS;
    }

    info!(
        qdrant_url = %command.config.qdrant_url,
        collection = %command.config.collection_name,
        embedding_provider = %command.config.embedding_provider,
        embedding_model = %command.config.embedding_model,
        ollama_base_url = %command.config.ollama_base_url,
        transport = %command.transport,
        "Starting Qdrant MCP server"
    );
    for key in ConfigKey::ALL {
        debug!(
            key = key.env_name(),
            value = command.config.display_value(key),
            source = %command.config.source(key),
            "Resolved"
        );
    }
    if command.transport == Transport::Sse {
        info!(port = SERVER_PORT, "Server expected to listen for SSE clients");
    }

    let launcher = Launcher::new(command);
    let code = if cli.supervise || !cfg!(unix) {
        supervise(launcher).await
    } else {
        replace(launcher)
    };
    to_exit_code(code)
}

#[cfg(unix)]
fn replace(launcher: Launcher) -> i32 {
    let err = launcher.exec();
    error!(error = %err, "Could not start MCP server");
    err.exit_code()
}

#[cfg(not(unix))]
fn replace(_launcher: Launcher) -> i32 {
    unreachable!("exec is only used on unix")
}

async fn supervise(launcher: Launcher) -> i32 {
    let running = match launcher.spawn() {
        Ok(running) => running,
        Err(err) => {
            error!(error = %err, "Could not start MCP server");
            return err.exit_code();
        }
    };

    match running.wait().await {
        Ok(status) => {
            let code = exit_code(status);
            info!(code, "MCP server exited");
            code
        }
        Err(err) => {
            error!(error = %err, "Lost track of MCP server");
            err.exit_code()
        }
    }
}

fn to_exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
