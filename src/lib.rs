//! infobot — multi-persona conversational assistant.

pub mod calculator;
pub mod chat;
pub mod config;
pub mod error;
pub mod extract;
pub mod flow;
pub mod llm;
pub mod persona;
pub mod profile;
pub mod store;
pub mod tone;
