pub mod chat_client;
pub mod config;
pub mod error;
pub mod quote_client;
pub mod speech;
pub mod storage;
