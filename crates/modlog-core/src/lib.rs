pub mod config;
pub mod error;
pub mod scheduler;
pub mod store;
pub mod types;
pub mod validate;

pub use config::{AppConfig, REPORT_JOB};
pub use error::ModlogError;
pub use scheduler::{ScheduledJob, Scheduler};
pub use store::ActionStore;
pub use types::{Action, ActionType, Messenger};
pub use validate::{validate_action, ActionInput, ValidationError};
