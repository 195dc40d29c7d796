pub mod form_extractor;
pub mod geo_jitter;
pub mod html_scan;
pub mod outcome_classifier;
pub mod receipt;
pub mod retry_policy;
pub mod validators;

pub use outcome_classifier::{OutcomeClassifier, Verdict};
pub use retry_policy::RetryPolicy;
