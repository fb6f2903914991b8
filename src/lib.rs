pub mod cli;
pub mod config;
pub mod download;
pub mod files;
pub mod notice;
pub mod poller;
pub mod report;
pub mod status;
pub mod text;
pub mod util;
