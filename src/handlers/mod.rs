// handlers/mod.rs - two security tiers
//
// Public (no auth): service banner and health check
// Protected (JWT auth): per-user progress and certificates under /api/v1

pub mod protected;
pub mod public;
