use clap::{Parser, Subcommand};
use sprout_core::ResponseMode;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sprout")]
#[command(about = "Chat with the sprout parenting assistant and manage your child's profile")]
pub struct Cli {
    /// Backend base URL (overrides config file and SPROUT_BASE_URL)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Bearer token (overrides config file and SPROUT_TOKEN)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Path of the local state file
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Log requests and state changes
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send one message and print the reply
    Chat {
        /// Message text
        #[arg(required = true)]
        message: Vec<String>,
        /// Reply style: concise or detailed
        #[arg(short, long)]
        mode: Option<ResponseMode>,
    },
    /// Chat interactively, one message per line
    Repl {
        /// Reply style: concise or detailed
        #[arg(short, long)]
        mode: Option<ResponseMode>,
    },
    /// Show the cached conversation
    History {
        /// Reload the conversation from the backend first
        #[arg(short, long)]
        refresh: bool,
    },
    /// Clear the current conversation on the backend and locally
    ClearHistory,
    /// Forget the local session so the next message starts a new one
    Reset,
    /// View or save the child profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },
    /// Show the device identity, session and backend
    Whoami,
    /// Manage the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Fetch and print the profile
    Show,
    /// Create or update the profile
    Save {
        #[arg(long)]
        nickname: Option<String>,
        /// Birth date as YYYY-MM-DD
        #[arg(long)]
        birth_date: Option<String>,
        #[arg(long)]
        grade: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write the effective config to the config file
    Init,
}
