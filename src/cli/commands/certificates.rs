use clap::Subcommand;
use uuid::Uuid;

use crate::api::dto::CertificateDto;
use crate::cli::utils::{cli_request_id, connect_store, output_empty_collection};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::services::CertificateService;
use crate::types::PageOptions;

#[derive(Subcommand)]
pub enum CertificateCommands {
    #[command(about = "List a user's certificates, newest first")]
    List {
        #[arg(long, help = "User id")]
        user: i32,
        #[arg(long, help = "Rows to skip")]
        offset: Option<i64>,
        #[arg(long, help = "Maximum rows to return")]
        limit: Option<i64>,
    },

    #[command(about = "Show a certificate by id")]
    Show {
        #[arg(help = "Certificate id")]
        id: Uuid,
    },
}

pub async fn handle(
    cmd: CertificateCommands,
    config: &AppConfig,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let service = CertificateService::new(connect_store(config).await?);

    match cmd {
        CertificateCommands::List { user, offset, limit } => {
            let (offset, limit) = config.progress.page(offset, limit);
            let page = service
                .list(&PageOptions {
                    request_id: cli_request_id(),
                    user_id: user,
                    offset,
                    limit,
                })
                .await?;

            if page.items.is_empty() {
                return output_empty_collection(&output_format, "certificates", "No certificates found");
            }

            match output_format {
                OutputFormat::Json => {
                    let page = page.map(CertificateDto::from);
                    println!("{}", serde_json::to_string_pretty(&page)?);
                }
                OutputFormat::Text => {
                    println!("{:<38} {:<20} {:<30} {}", "ID", "LANGUAGE", "SERIES", "COMPLETED");
                    println!("{}", "-".repeat(100));
                    for certificate in &page.items {
                        println!(
                            "{:<38} {:<20} {:<30} {}",
                            certificate.id,
                            certificate.language_slug,
                            certificate.series_title,
                            certificate.completed_at.format("%Y-%m-%d %H:%M")
                        );
                    }
                    println!("\n{} of {} certificates", page.items.len(), page.total);
                }
            }
            Ok(())
        }
        CertificateCommands::Show { id } => {
            let certificate = service.find_by_id(&cli_request_id(), id).await?;

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&CertificateDto::from(certificate))?);
                }
                OutputFormat::Text => {
                    println!("Certificate: {}", certificate.id);
                    println!("User:        {}", certificate.user_id);
                    println!("Series:      {} ({})", certificate.series_title, certificate.series_slug);
                    println!("Language:    {}", certificate.language_slug);
                    println!("Lessons:     {}", certificate.lessons);
                    println!(
                        "Time:        {}s watching, {}s reading",
                        certificate.watch_time_seconds, certificate.read_time_seconds
                    );
                    println!("Completed:   {}", certificate.completed_at.format("%Y-%m-%d %H:%M"));
                }
            }
            Ok(())
        }
    }
}
