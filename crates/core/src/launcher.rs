use crate::config::RuntimeConfig;
use anyhow::{Result, bail};
use std::fmt;
use std::io;
use std::process::ExitStatus;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

/// Entry point installed by the server package.
pub const DEFAULT_SERVER_BIN: &str = "mcp-server-qdrant";

/// Environment variable overriding the server executable.
pub const SERVER_BIN_ENV: &str = "MCP_SERVER_BIN";

/// Environment variable selecting the transport.
pub const TRANSPORT_ENV: &str = "MCP_TRANSPORT";

/// Port the server binds in SSE mode. The image declares it; nothing here binds it.
pub const SERVER_PORT: u16 = 8000;

/// Transport the server speaks to its MCP clients.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Transport {
    Stdio,
    #[default]
    Sse,
}

impl Transport {
    pub fn as_str(self) -> &'static str {
        match self {
            Transport::Stdio => "stdio",
            Transport::Sse => "sse",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "stdio" => Ok(Transport::Stdio),
            "sse" => Ok(Transport::Sse),
            other => bail!("unknown transport '{}' (expected stdio or sse)", other),
        }
    }
}

/// The single command the container runs.
#[derive(Clone, Debug)]
pub struct ServerCommand {
    pub program: String,
    pub transport: Transport,
    /// Passed through after the transport selection.
    pub extra_args: Vec<String>,
    pub config: RuntimeConfig,
}

impl ServerCommand {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            program: DEFAULT_SERVER_BIN.to_string(),
            transport: Transport::default(),
            extra_args: Vec::new(),
            config,
        }
    }

    /// Command as the launcher builds it without flags: program and transport
    /// come from `MCP_SERVER_BIN` / `MCP_TRANSPORT` when set.
    pub fn resolve<F>(config: RuntimeConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cmd = Self::new(config);
        if let Some(program) = lookup(SERVER_BIN_ENV) {
            cmd.program = program;
        }
        if let Some(transport) = lookup(TRANSPORT_ENV) {
            cmd.transport = transport.parse()?;
        }
        Ok(cmd)
    }

    pub fn from_env(config: RuntimeConfig) -> Result<Self> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["--transport".to_string(), self.transport.as_str().to_string()];
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Printable command line, e.g. `mcp-server-qdrant --transport sse`.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The rest of the launcher's environment is inherited; the six configuration
    /// keys are always set explicitly.
    fn to_std(&self) -> std::process::Command {
        let mut cmd = std::process::Command::new(&self.program);
        cmd.args(self.args());
        cmd.envs(self.config.env_pairs());
        cmd
    }
}

/// Failure to get the server process running. The launcher's only own errors.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("{program}: command not found")]
    NotFound {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    fn start(program: &str, source: io::Error) -> Self {
        let program = program.to_string();
        if source.kind() == io::ErrorKind::NotFound {
            LaunchError::NotFound { program, source }
        } else {
            LaunchError::Spawn { program, source }
        }
    }

    /// Shell conventions: 127 command not found, 126 found but not runnable.
    pub fn exit_code(&self) -> i32 {
        match self {
            LaunchError::NotFound { .. } => 127,
            LaunchError::Spawn { .. } => 126,
            LaunchError::Wait { .. } => 1,
        }
    }
}

/// Launcher in the not-started state. Starting consumes it; there is no way back.
pub struct Launcher {
    command: ServerCommand,
}

impl Launcher {
    pub fn new(command: ServerCommand) -> Self {
        Self { command }
    }

    /// Replace the current process with the server.
    ///
    /// On success this never returns: the server takes over the process id,
    /// receives the container's signals directly and its exit status becomes
    /// the container's. The returned value is always the failure.
    #[cfg(unix)]
    pub fn exec(self) -> LaunchError {
        use std::os::unix::process::CommandExt;

        info!(command = %self.command.command_line(), "Exec'ing MCP server");
        let err = self.command.to_std().exec();
        LaunchError::start(&self.command.program, err)
    }

    /// Start the server as a child process with inherited stdio.
    pub fn spawn(self) -> Result<Running, LaunchError> {
        let mut cmd = tokio::process::Command::from(self.command.to_std());
        let child = cmd
            .spawn()
            .map_err(|e| LaunchError::start(&self.command.program, e))?;

        info!(
            command = %self.command.command_line(),
            pid = ?child.id(),
            "MCP server started"
        );

        Ok(Running {
            program: self.command.program,
            child,
        })
    }
}

/// The server is running. The only thing left to do is wait for it.
pub struct Running {
    program: String,
    child: tokio::process::Child,
}

impl Running {
    pub async fn wait(mut self) -> Result<ExitStatus, LaunchError> {
        let status = self.child.wait().await.map_err(|source| LaunchError::Wait {
            program: self.program.clone(),
            source,
        })?;
        debug!(program = %self.program, %status, "MCP server exited");
        Ok(status)
    }
}

/// Exit code the launcher reports for a finished server.
///
/// The server's own code unchanged; a signal-terminated server maps to
/// `128 + signal` like a shell would report it.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}
