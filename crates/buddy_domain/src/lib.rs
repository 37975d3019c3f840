pub mod focus;
pub mod habit;
pub mod planner;
pub mod service;
pub mod store;

pub use crate::service::{DashboardSnapshot, StudyService, StudyServiceBuilder};
