pub mod backup;
pub mod bootstrap;
pub mod chat_relay;
pub mod commands;
pub mod quote_cache;
pub mod settings_store;
pub mod task_store;
pub mod ticker;
