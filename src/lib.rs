pub mod arts;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod scheduler;
pub mod sessions;
pub mod workers;

pub use config::Config;
pub use db::SchedulerDb;
pub use error::SchedulerError;
pub use scheduler::{select_study_batch, update_priorities};
pub use sessions::{
    close_all_sessions, update_exercise_session, update_reading_session, SessionEvent,
};
