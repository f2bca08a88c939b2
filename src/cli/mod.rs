pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "kiwi")]
#[command(about = "Kiwi CLI - operate the learning-progress backend")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Run the HTTP API")]
    Serve {
        #[arg(long, help = "Serve a seeded demo catalog from an in-memory store instead of Postgres")]
        memory: bool,

        #[arg(long, help = "Port to listen on (overrides KIWI_API_PORT)")]
        port: Option<u16>,
    },

    #[command(about = "Inspect or reset a user's progress")]
    Progress {
        #[command(subcommand)]
        cmd: commands::progress::ProgressCommands,
    },

    #[command(about = "Inspect issued certificates")]
    Certificates {
        #[command(subcommand)]
        cmd: commands::certificates::CertificateCommands,
    },

    #[command(about = "Mint an access token signed with the configured secret")]
    Token {
        #[arg(long, help = "User id to put in the token")]
        user: i32,

        #[arg(long, help = "Mark the token as a staff account")]
        staff: bool,

        #[arg(long, help = "Lifetime in hours (defaults to SECURITY_JWT_EXPIRY_HOURS)")]
        hours: Option<u64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::server::migrate(&config, output_format).await,
        Commands::Serve { memory, port } => commands::server::serve(config, memory, port).await,
        Commands::Progress { cmd } => commands::progress::handle(cmd, &config, output_format).await,
        Commands::Certificates { cmd } => {
            commands::certificates::handle(cmd, &config, output_format).await
        }
        Commands::Token { user, staff, hours } => {
            commands::token::handle(user, staff, hours, &config, output_format)
        }
    }
}
