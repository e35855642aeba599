//! `gc-domain`: types shared by every gchat-probe crate. The error
//! taxonomy, typed configuration, structured trace events and the
//! assistant-side chat history record.

pub mod chat;
pub mod config;
pub mod error;
pub mod trace;
