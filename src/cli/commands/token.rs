use serde_json::json;

use crate::auth::{generate_jwt, Claims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

pub fn handle(
    user_id: i32,
    is_staff: bool,
    hours: Option<u64>,
    config: &AppConfig,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let expiry_hours = hours.unwrap_or(config.security.jwt_expiry_hours);
    let claims = Claims::new(user_id, is_staff, expiry_hours);
    let token = generate_jwt(&claims, &config.security.jwt_secret)?;

    match output_format {
        OutputFormat::Json => output_success(
            &output_format,
            "Token generated",
            Some(json!({
                "token": token,
                "user_id": user_id,
                "is_staff": is_staff,
                "expires_at": claims.exp,
            })),
        ),
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
    }
}
