//! Collects your work activity for a day (commits today, more sources later) and renders it into
//! a Markdown daily report. Runs once, prints one document and exits.
//!

pub mod cli;
pub mod collector;
pub mod config;
pub mod models;
pub mod report;
pub mod utils;
