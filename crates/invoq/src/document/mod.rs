//! Document records and their lifecycle states.

pub mod artifact;
pub mod status;

pub use artifact::{DocumentArtifact, DocumentMetadata, StateVersion};
pub use status::{ProcessingStatus, ReviewStatus, VerificationSource};
