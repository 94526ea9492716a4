pub mod submission;

pub use submission::SubmissionWorker;
