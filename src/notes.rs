//! Note lifecycle: creation, metadata preview, and atomic consumption.

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::error::NoteError;
use crate::error::Result;
use crate::id::generate_note_id;
use crate::kv::StoreBackend;
use crate::time::current_time_secs;

/// Store key prefix namespacing notes away from rate-limit windows.
const NOTE_KEY_PREFIX: &str = "note:";

/// Validation limits and policy switches applied at note creation.
#[derive(Debug, Clone)]
pub struct NoteLimits {
    /// Maximum size of note contents in bytes.
    pub size_limit_bytes: usize,
    /// Maximum size of the metadata string in bytes.
    pub meta_limit_bytes: usize,
    /// Largest accepted view count.
    pub max_views: u32,
    /// Largest accepted expiration in minutes.
    pub max_expiration_minutes: u32,
    /// Length of generated note identifiers in characters.
    pub id_length: usize,
    /// Whether callers may pick view counts and expirations themselves.
    /// When disabled, every note is coerced to a single view with no TTL.
    pub allow_advanced: bool,
}

/// Note record as serialized into the shared store.
///
/// `views` is omitted from the JSON entirely when unlimited; the consume
/// path on both backends distinguishes view-limited records by field
/// presence alone, so a serialized `null` would be wrong here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    /// Payload exactly as supplied by the creator.
    pub contents: String,
    /// Creator-controlled metadata blob.
    pub meta: String,
    /// Remaining view budget; `None` means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<u32>,
    /// Creation time in unix seconds, informational only.
    pub created: u64,
}

/// Parameters accepted when creating a note.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateNoteRequest {
    /// Note payload.
    pub contents: String,
    /// Opaque metadata stored alongside the payload (e.g. client-side
    /// encryption parameters); visible via preview.
    pub meta: String,
    /// Requested view budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<u32>,
    /// Requested expiration in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<u32>,
}

/// Public description of a live note, served without consuming a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePreview {
    /// Creator-controlled metadata blob.
    pub meta: String,
}

/// Contents handed out by a consuming read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteContents {
    /// Note payload.
    pub contents: String,
    /// Creator-controlled metadata blob.
    pub meta: String,
}

/// Note lifecycle operations over a shared [`StoreBackend`].
///
/// Holds no state beyond the backend handle and the validation limits, so
/// instances in different processes sharing one store behave as one.
#[derive(Clone)]
pub struct NoteStore {
    backend: Arc<dyn StoreBackend>,
    limits: Arc<NoteLimits>,
}

impl NoteStore {
    /// Create a store over `backend` with the given limits.
    pub fn new(backend: Arc<dyn StoreBackend>, limits: NoteLimits) -> Self {
        Self {
            backend,
            limits: Arc::new(limits),
        }
    }

    fn note_key(id: &str) -> String {
        format!("{NOTE_KEY_PREFIX}{id}")
    }

    /// Validate `request`, mint an identifier, and persist the note.
    ///
    /// When both a view budget and an expiration are supplied, the views
    /// drive deletion and the expiration is still attached as the key's TTL,
    /// an upper bound on lifetime. With advanced policies disabled the
    /// request is coerced to a single view and no TTL before the range
    /// checks run, so out-of-range requested values are forgiven rather
    /// than rejected.
    pub async fn create(&self, request: CreateNoteRequest) -> Result<String> {
        let CreateNoteRequest {
            contents,
            meta,
            mut views,
            mut expiration,
        } = request;

        if contents.len() > self.limits.size_limit_bytes {
            return Err(NoteError::PayloadTooLarge {
                size: contents.len(),
                max: self.limits.size_limit_bytes,
            });
        }
        if meta.len() > self.limits.meta_limit_bytes {
            return Err(NoteError::InvalidMeta {
                size: meta.len(),
                max: self.limits.meta_limit_bytes,
            });
        }
        if views.is_none() && expiration.is_none() {
            return Err(NoteError::InvalidPolicy {
                reason: "at least one of views or expiration must be set".to_string(),
            });
        }

        if !self.limits.allow_advanced {
            views = Some(1);
            expiration = None;
        }

        if let Some(views) = views {
            if views < 1 || views > self.limits.max_views {
                return Err(NoteError::InvalidPolicy {
                    reason: format!("views must be between 1 and {}", self.limits.max_views),
                });
            }
        }
        if let Some(expiration) = expiration {
            if expiration < 1 || expiration > self.limits.max_expiration_minutes {
                return Err(NoteError::InvalidPolicy {
                    reason: format!(
                        "expiration must be between 1 and {} minutes",
                        self.limits.max_expiration_minutes
                    ),
                });
            }
        }

        let id = generate_note_id(self.limits.id_length);
        let record = NoteRecord {
            contents,
            meta,
            views,
            created: current_time_secs(),
        };
        let encoded = serde_json::to_string(&record).map_err(|err| NoteError::StoreUnavailable {
            reason: format!("failed to encode note record: {err}"),
        })?;

        let key = Self::note_key(&id);
        match expiration {
            Some(minutes) => {
                self.backend
                    .set_with_ttl(&key, &encoded, u64::from(minutes) * 60)
                    .await?
            }
            None => self.backend.set(&key, &encoded).await?,
        }

        debug!(id = %id, views = ?record.views, expiration_minutes = ?expiration, "note stored");
        Ok(id)
    }

    /// Fetch metadata for a live note without retiring a view.
    pub async fn preview(&self, id: &str) -> Result<NotePreview> {
        let raw = self
            .backend
            .get(&Self::note_key(id))
            .await?
            .ok_or(NoteError::NotFound)?;
        let record = decode_record(&raw)?;
        Ok(NotePreview { meta: record.meta })
    }

    /// Atomically retire one view and return the note contents.
    ///
    /// The decrement-or-delete happens in a single store-side step, so two
    /// readers racing on the last view cannot both succeed. Time-limited
    /// notes pass through unmodified and stay readable until their TTL.
    pub async fn consume(&self, id: &str) -> Result<NoteContents> {
        let raw = self
            .backend
            .consume_record(&Self::note_key(id))
            .await?
            .ok_or(NoteError::NotFound)?;
        let record = decode_record(&raw)?;

        debug!(id = %id, views_remaining = ?record.views, "note consumed");
        Ok(NoteContents {
            contents: record.contents,
            meta: record.meta,
        })
    }
}

fn decode_record(raw: &str) -> Result<NoteRecord> {
    serde_json::from_str(raw).map_err(|err| NoteError::StoreUnavailable {
        reason: format!("corrupted note record: {err}"),
    })
}
