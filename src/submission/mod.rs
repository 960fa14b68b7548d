pub mod metadata;
pub mod outcome;
pub mod parser;
pub mod pipeline;
pub mod validate;

pub use metadata::RequestMeta;
pub use outcome::{StepOutcome, Steps, SubmissionResult};
pub use pipeline::{MailRoute, Orchestrator, PipelineSettings};
