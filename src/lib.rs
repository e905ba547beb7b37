//! Time and mileage tracking for small crews.
//!
//! Projects, team members and daily time entries are kept as three JSON
//! collections in a key-value store and served over HTTP by `shovel-d`.

pub mod api;
pub mod config;
pub mod error;
pub mod model;
pub mod mutate;
pub mod render;
pub mod report;
pub mod repository;
pub mod store;
pub mod telemetry;

pub use error::{RepositoryError, StoreError, ValidationError};
pub use model::{Collection, NewProject, NewTeamMember, NewTimeEntry, Project, TeamMember, TimeEntry};
pub use report::{Report, ReportQuery};
pub use repository::Repository;
