//! pulse-hook: turns editor activity into WakaTime heartbeats.
//!
//! Driven by an editor extension that spawns it and talks JSON lines over
//! stdio, or run by hand for one-off heartbeats and setup.
//!
//! ## Subcommands
//!
//! - `watch`: Long-lived session; editor messages on stdin, status lines on stdout
//! - `send`: One heartbeat, waits for the result; the exit code mirrors the core tool's
//! - `setup`: Installs the interpreter and core tool, prompts for an API key if missing
//! - `api-key`: Reads or stores the API key in `~/.wakatime.cfg`

mod api_key;
mod logging;
mod prompt;
mod send;
mod setup;
mod watch;

use clap::{Args, Parser, Subcommand};
use pulse_core::{load_config_or_default, PluginInfo, StoragePaths};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "pulse-hook")]
#[command(about = "WakaTime heartbeats from editor activity")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track an editor session (JSON lines on stdin, status lines on stdout)
    Watch {
        #[command(flatten)]
        editor: EditorArgs,
    },

    /// Send one heartbeat and wait for the core tool to finish
    Send {
        /// File the heartbeat is for
        #[arg(long, value_name = "PATH")]
        file: String,

        /// Mark the heartbeat as a save
        #[arg(long)]
        write: bool,

        #[command(flatten)]
        editor: EditorArgs,
    },

    /// Install dependencies and make sure an API key is configured
    Setup,

    /// Read or store the WakaTime API key
    ApiKey {
        #[command(subcommand)]
        action: ApiKeyAction,
    },
}

#[derive(Subcommand)]
enum ApiKeyAction {
    /// Print the configured key
    Get,

    /// Store a key (prompts on the terminal when omitted)
    Set {
        #[arg(value_name = "KEY")]
        key: Option<String>,
    },
}

/// Editor identity and workspace, reported with every heartbeat.
#[derive(Args, Debug, Clone)]
pub struct EditorArgs {
    /// Editor name used in the plugin string
    #[arg(long, default_value = "unknown")]
    editor: String,

    /// Editor version used in the plugin string
    #[arg(long, default_value = "0")]
    editor_version: String,

    /// Workspace root; its last path segment is sent as the project name
    #[arg(long, value_name = "PATH")]
    workspace: Option<String>,
}

impl EditorArgs {
    pub fn plugin(&self) -> PluginInfo {
        PluginInfo {
            editor: self.editor.clone(),
            editor_version: self.editor_version.clone(),
        }
    }

    pub fn workspace(&self) -> Option<String> {
        self.workspace.clone()
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(paths) = StoragePaths::detect() else {
        eprintln!("pulse-hook: cannot determine home directory");
        return ExitCode::FAILURE;
    };
    let _logging_guard = logging::init(Some(&paths.logs_dir()));
    let config = load_config_or_default(paths.config_file());

    let (name, result) = match cli.command {
        Commands::Watch { editor } => ("watch", watch::run(paths, config, &editor)),
        Commands::Send {
            file,
            write,
            editor,
        } => ("send", send::run(paths, config, &file, write, &editor)),
        Commands::Setup => ("setup", setup::run(paths, config)),
        Commands::ApiKey { action } => {
            let result = match action {
                ApiKeyAction::Get => api_key::get(&paths),
                ApiKeyAction::Set { key } => api_key::set(&paths, key.as_deref()),
            };
            ("api-key", result)
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = %e, command = name, "pulse-hook failed");
            eprintln!("pulse-hook {}: {}", name, e);
            ExitCode::FAILURE
        }
    }
}
