//! Creation-time placement of new posts.

pub mod classifier;
pub mod gate;

pub use classifier::{AiClassifier, Classification, HttpClassifier, UnconfiguredClassifier};
pub use gate::{Origin, Placement, SubmissionGate, SubmitPostRequest, CATEGORIES};
