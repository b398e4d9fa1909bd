//! Narration Studio: turn pasted scripture text into one narrated audio
//! file using a remote speech-synthesis backend.
//!
//! ```text
//! raw text ─▶ text::prepare ─▶ registry ─▶ scheduler (K workers) ─▶ backend /api/generate
//!                                 │
//!                                 └─▶ finalize: /api/merge ─▶ /api/treat ─▶ <title>.wav
//! ```

pub mod activity;
pub mod cli;
pub mod client;
pub mod config;
pub mod finalize;
pub mod profiles;
pub mod readiness;
pub mod registry;
pub mod scheduler;
pub mod studio;
pub mod text;
pub mod updater;
