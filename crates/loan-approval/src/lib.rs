//! Loan approval decision support.
//!
//! The crate turns raw applicant attributes into an approve/reject decision with a
//! confidence, a risk tier, and the model's most influential features. Training
//! produces an [`underwriting::ArtifactBundle`]; every decision is made against one
//! frozen bundle so that encoding stays identical between training and inference.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod underwriting;
