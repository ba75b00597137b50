pub mod daily;
pub mod db;
pub mod memory;
pub mod model;
pub mod repository;
pub mod repository_sqlx;
pub mod store;

pub use daily::get_or_reset_daily_state;
pub use model::{
    ConfigError, Configuration, DailyState, ErrorEntry, ErrorLog, LastCommitInfo, ScheduleMode,
};
pub use store::StateStore;
