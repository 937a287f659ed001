mod dashboard;
mod events;

pub use dashboard::{DashboardChart, DashboardStore};
pub use events::{Event, EventTracker};
