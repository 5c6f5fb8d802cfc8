//! Blob Uploader (spec 4.E) and Server Availability Probe (spec 4.G).
//!
//! Both share the [`nsyte_types::ServerHealthTable`] circuit breaker and
//! an HTTP client. Upload and probe both use a bounded-batch worker pool,
//! generalized from `thread::spawn` chunks to `tokio::sync::Semaphore`-
//! bounded async tasks, since the fan-out here (tens of concurrent
//! relay/server round trips) is exactly tokio's sweet spot.

mod auth;
mod delete;
mod probe;
mod upload;

pub use auth::{build_delete_auth, build_upload_auth};
pub use delete::{delete_blob, delete_blob_everywhere, DeleteOutcome};
pub use probe::{probe_batch, probe_digest, ProbeOutcome, ProbeTimeouts};
pub use upload::{upload_batch, ProgressEvent, UploadOptions};
