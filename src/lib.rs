pub mod browser;
pub mod config;
pub mod engine;
pub mod extractor;
pub mod logger;
pub mod models;
pub mod observer;
pub mod pagination;
pub mod parser;
pub mod progress;
pub mod recipe;
pub mod reference;
pub mod search;
pub mod store;
pub mod targets;
pub mod tui;
pub mod webdriver;

#[cfg(test)]
mod testing;
