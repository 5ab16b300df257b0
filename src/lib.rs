pub mod cmd;
pub mod config;
pub mod entity;
pub mod error;
pub mod parser;
pub mod provider;
