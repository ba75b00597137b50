pub mod command;
pub mod controller;
pub mod engine;
pub mod error;
pub mod force;
pub mod policy;
pub mod settings;
pub mod timer;
pub mod types;

pub use command::{Command, Reply};
pub use controller::Controller;
pub use engine::Scheduler;
pub use error::SchedulerError;
pub use settings::ScheduleSettings;
pub use types::{Decision, ForceOutcome, TickReport};
