//! Ember: ephemeral, burn-after-reading note sharing.
//!
//! Notes live in a shared store under unguessable identifiers and
//! disappear when their view budget is spent or their TTL elapses,
//! whichever comes first. View accounting happens in a single atomic
//! store operation, so concurrent readers can never over-consume a
//! note, and multiple service instances over one store act as one.

pub mod config;
pub mod error;
pub mod id;
pub mod kv;
pub mod notes;
pub mod rate_limit;
pub mod server;
pub mod state;
pub mod time;

// Re-export the types most integrations need.
pub use config::EmberConfig;
pub use error::{NoteError, Result};
pub use notes::{CreateNoteRequest, NoteContents, NotePreview, NoteStore};
pub use rate_limit::{RateLimitAction, RateLimiter};
pub use state::AppState;
