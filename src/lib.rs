pub mod aggregate;
pub mod alarm;
pub mod cli;
pub mod config;
pub mod database;
pub mod logging;
pub mod models;
pub mod notification;
pub mod repository;
pub mod service;
pub mod tui;
pub mod utils;
pub mod watcher;

pub use config::Config;
pub use database::Database;
pub use models::{NewTask, Task, TaskCounts, TimeCategory};
pub use repository::{Clock, SystemClock, TaskRepository};
pub use service::{ServiceError, TaskService};
pub use utils::Profile;
