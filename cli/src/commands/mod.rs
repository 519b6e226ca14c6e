pub mod config;
pub mod dictionary;
pub mod get;
pub mod inventory;
