//! simhub-uploader library crate.
//!
//! Drives resource uploads against the SimHub backend's presigned-URL
//! endpoints.  Small payloads take the single-shot path (token → PUT →
//! confirm); payloads above the multipart threshold are split into fixed
//! 5 MiB parts uploaded by a bounded pool of workers, then stitched
//! together with a completion call carrying the sorted part manifest.
//!
//! ```text
//! upload(data, meta)
//!    │
//!    ├─ ≤ 50 MiB: issue_token ──► PUT presigned ──► confirm
//!    │
//!    └─ > 50 MiB: init_multipart
//!                    │
//!            ┌───────┼───────┬───────┐
//!          worker  worker  worker  worker      (4, claim parts atomically)
//!            │       │       │       │
//!            └───────┴───┬───┴───────┘
//!                 sort by part number
//!                        │
//!                    complete(manifest, meta)
//! ```
//!
//! The backend endpoints are reached through the [`UploadApi`] trait so
//! the pool's concurrency behaviour is testable without a network.
//!
//! # Layout
//!
//! ```text
//! [simhub-uploader]
//!   ├── domain/           upload plan arithmetic, part records, metadata
//!   ├── application/      the worker-pool coordinator
//!   └── infrastructure/   reqwest implementation of UploadApi
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::coordinator::{Progress, UploadCoordinator, UploadError, UploadOutcome};
pub use domain::meta::UploadMetadata;
pub use domain::plan::{
    normalize_etag, PartRecord, UploadPlan, MULTIPART_THRESHOLD, PART_SIZE,
};
pub use infrastructure::api::{
    ApiError, HttpUploadApi, MultipartSession, TokenGrant, UploadApi,
};
