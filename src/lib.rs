//! Inbox Triage — email classification service backed by Gemini.

pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod normalize;
pub mod server;
