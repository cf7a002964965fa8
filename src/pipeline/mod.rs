//! Pipeline stages for document-to-Markdown conversion.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the engine can be swapped without touching resolution or cleanup.
//!
//! ## Data Flow
//!
//! ```text
//! request ──▶ gate ──▶ input ──▶ engine ──▶ postprocess
//! (url/path)  (safety) (fetch)   (markitdown) (cleanup)
//! ```
//!
//! 1. [`gate`]  : refuse non-HTTP schemes and private-address targets
//! 2. [`input`] : normalize a local path, or fetch a URL into a transient
//!    file that is deleted when the resolved input is dropped
//! 3. [`engine`]: run the conversion engine on the resolved file; the only
//!    stage that spawns a subprocess
//! 4. [`postprocess`]: whitespace and invisible-character cleanup of the
//!    engine output

pub mod engine;
pub mod gate;
pub mod input;
pub mod postprocess;
