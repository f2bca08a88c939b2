use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::{PgStore, Store};

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let Some(data_value) = data {
                response["data"] = data_value;
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(
    output_format: &OutputFormat,
    collection_name: &str,
    message: &str,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({
                collection_name: []
            }))?);
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

/// Open the configured Postgres store for a one-shot command
pub async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Store>> {
    let store = PgStore::connect(&config.database).await?;
    Ok(Arc::new(store))
}

/// Correlation id for service calls made from the CLI
pub fn cli_request_id() -> String {
    format!("cli-{}", Uuid::new_v4())
}
