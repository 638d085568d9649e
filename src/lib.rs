//! VidBay library crate.
//!
//! The server half (storage, HTTP handlers, router) and the client half
//! (upload queue, API client, modal UI) live side by side here; the two
//! binaries under `src/bin/` only wire them together. The upload queue in
//! [`queue`] is the piece with real invariants — everything else is glue
//! around the upload directory and the three HTTP endpoints.

use shadow_rs::shadow;

pub mod atomic;
pub mod client;
pub mod config;
pub mod error;
pub mod files;
pub mod http;
pub mod logging;
pub mod modal;
pub mod queue;
pub mod storage;
pub mod upload;

shadow!(build);
