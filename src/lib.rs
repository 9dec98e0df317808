pub mod config;
pub mod error;
pub mod progress;
pub mod router;
pub mod scanner;
pub mod schema;
pub mod sink;
pub mod tokenizer;
pub mod types;
