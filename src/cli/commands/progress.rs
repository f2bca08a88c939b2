use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{cli_request_id, connect_store, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::services::ProgressService;
use crate::types::LanguageProgressOptions;

#[derive(Subcommand)]
pub enum ProgressCommands {
    #[command(about = "Show a user's progress on a language")]
    Show {
        #[arg(long, help = "User id")]
        user: i32,
        #[arg(long, help = "Language slug")]
        language: String,
    },

    #[command(about = "Delete all of a user's progress and certificates for a language")]
    Reset {
        #[arg(long, help = "User id")]
        user: i32,
        #[arg(long, help = "Language slug")]
        language: String,
    },
}

pub async fn handle(
    cmd: ProgressCommands,
    config: &AppConfig,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let service = ProgressService::new(connect_store(config).await?);

    match cmd {
        ProgressCommands::Show { user, language } => {
            let opts = LanguageProgressOptions {
                request_id: cli_request_id(),
                user_id: user,
                language_slug: language,
            };
            let progress = service.find_language_progress(&opts).await?;

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({
                        "user_id": progress.user_id,
                        "language_slug": progress.language_slug,
                        "completed_series": progress.completed_series,
                        "viewed_at": progress.viewed_at,
                    }))?);
                }
                OutputFormat::Text => {
                    println!("User:             {}", progress.user_id);
                    println!("Language:         {}", progress.language_slug);
                    println!("Completed series: {}", progress.completed_series);
                    println!("Last viewed:      {}", progress.viewed_at.format("%Y-%m-%d %H:%M"));
                }
            }
            Ok(())
        }
        ProgressCommands::Reset { user, language } => {
            let opts = LanguageProgressOptions {
                request_id: cli_request_id(),
                user_id: user,
                language_slug: language.clone(),
            };
            service.delete_language_progress(&opts).await?;

            output_success(
                &output_format,
                &format!("Progress for user {} on '{}' reset", user, language),
                Some(json!({ "user_id": user, "language_slug": language })),
            )
        }
    }
}
