//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod doctor;
mod run;
mod search;
pub mod serve;
mod sources;
mod tools;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use doctor::run_doctor;
pub use run::{run_batch, BATCH_QUERIES};
pub use search::run_search;
pub use serve::run_serve;
pub use sources::run_sources;
pub use tools::run_tools;
