pub mod core;
pub mod history;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod state;
pub mod vectordb;
