pub use self::core::SubmissionQueue;
pub use entrypoint::Entrypoint;
pub use settings::SubmitterSettings;

mod core;
mod entrypoint;
mod pending;
mod settings;
