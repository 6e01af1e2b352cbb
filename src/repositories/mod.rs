pub mod engine_cli;
pub mod engine_client;
