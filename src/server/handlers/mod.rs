pub mod chat;
pub mod docs;
pub mod sources;
