//! Midjourney plugin for chat bots
//!
//! Turns `$mj` / `$mju` chat commands into jobs on the LinkAI Midjourney
//! proxy, polls the jobs on a background runtime, and posts finished images
//! back to the chat they came from.

pub mod api;
pub mod app;
pub mod bot;
pub mod chat;
pub mod deliver;
pub mod dispatch;
pub mod error;
pub mod messages;
pub mod models;
pub mod poller;
pub mod registry;

pub use error::{Error, Result};
