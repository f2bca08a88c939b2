pub mod certificates;
pub mod progress;
pub mod server;
pub mod token;
