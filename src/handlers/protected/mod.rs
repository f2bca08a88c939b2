// handlers/protected/mod.rs - handlers behind jwt_auth_middleware
//
// Every handler here can rely on the AuthUser and RequestId extensions.

pub mod certificates;
pub mod progress;

use serde::Deserialize;

/// `?offset=&limit=` on listing endpoints, clamped by the progress config
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}
