//! Kapaladaru - flags Indian cinema titles in a movie library
//!
//! Periodically scans a movies directory, asks a local LLM (via Ollama)
//! whether each new folder is a Bollywood, Indian or Telugu production,
//! pushes an ntfy alert for matches, optionally deletes them from Radarr,
//! and remembers every folder it has classified.

pub mod cli;
pub mod config;
pub mod jobs;
pub mod models;
pub mod services;
