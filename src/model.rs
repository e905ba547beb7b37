use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(test, derive(fake::Dummy))]
pub struct Project {
    pub id: String,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(test, derive(fake::Dummy))]
pub struct TeamMember {
    pub id: String,
    pub name: String,
}

/// One day's hours and travel for a project-member pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: String,
    pub project_id: String,
    pub team_member_id: String,
    pub date: NaiveDate,
    pub hours: f64,
    pub kilometers: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTeamMember {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTimeEntry {
    pub project_id: String,
    pub team_member_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub hours: f64,
    #[serde(default)]
    pub kilometers: f64,
    #[serde(default)]
    pub description: Option<String>,
}

/// The three top-level arrays, each persisted under its own key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Projects,
    TeamMembers,
    TimeEntries,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Projects,
        Collection::TeamMembers,
        Collection::TimeEntries,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Collection::Projects => "shovel-projects",
            Collection::TeamMembers => "shovel-team-members",
            Collection::TimeEntries => "shovel-time-entries",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Collection::Projects => "projects",
            Collection::TeamMembers => "team members",
            Collection::TimeEntries => "time entries",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
