//! kycgate Provider: Typed gateway to the external verification provider.
//!
//! - `VerificationProvider`: one async operation per provider capability
//! - `HttpProvider`: HTTPS REST adapter (bearer auth, fixed host header,
//!   bounded concurrency, no retries)
//! - `SandboxProvider`: deterministic in-memory adapter for local runs and tests
//! - `normalize`: provider wire shapes → internal artifact schema

pub mod adapters;
pub mod auth;
pub mod error;
pub mod normalize;
pub mod traits;
pub mod types;
pub mod wire;

pub use adapters::http::HttpProvider;
pub use adapters::sandbox::{ProviderOp, SandboxOutcomes, SandboxProvider};
pub use adapters::build_provider;
pub use auth::TokenSource;
pub use traits::{ProviderResult, VerificationProvider};
pub use types::{DocumentSubmission, FaceComparison, FaceDetection, MaskScore, SubjectRef};
