pub mod aparavi;
pub mod config;
pub mod output;
pub mod runner;
