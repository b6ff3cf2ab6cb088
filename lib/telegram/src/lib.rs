//! Telegram publish dispatcher for telepost.
//!
//! This crate provides:
//!
//! - **Render plan**: pure, type-specific validation and rendering choice
//! - **Client**: the Bot API transport (text, photo, poll, probes)
//!
//! Validation failures carry no side effect; only a valid plan ever
//! reaches the transport.

pub mod client;
pub mod publish;

pub use client::TelegramClient;
pub use publish::{MAX_POLL_OPTIONS, MIN_POLL_OPTIONS, RenderPlan, render_plan};
