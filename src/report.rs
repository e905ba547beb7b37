//! Filtering and totals over time entries.

use std::cmp::Reverse;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::model::{Project, TeamMember, TimeEntry};

pub const UNKNOWN_PROJECT: &str = "Unknown Project";
pub const UNKNOWN_MEMBER: &str = "Unknown Member";
pub const RECENT_LIMIT: usize = 10;

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    // Entry dates carry no time of day, so they compare as-is.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberFilter {
    All,
    Member(String),
}

impl MemberFilter {
    /// `None`, an empty string and the literal `"all"` all mean no filtering.
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            None | Some("") | Some("all") => MemberFilter::All,
            Some(id) => MemberFilter::Member(id.to_string()),
        }
    }

    fn matches(&self, entry: &TimeEntry) -> bool {
        match self {
            MemberFilter::All => true,
            MemberFilter::Member(id) => &entry.team_member_id == id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub total_hours: f64,
    pub total_kilometers: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub projects: usize,
    pub team_members: usize,
    pub time_entries: usize,
}

pub fn filter_entries(
    entries: &[TimeEntry],
    range: Option<&DateRange>,
    member: &MemberFilter,
) -> Vec<TimeEntry> {
    entries
        .iter()
        .filter(|e| range.map_or(true, |r| r.contains(e.date)))
        .filter(|e| member.matches(e))
        .cloned()
        .collect()
}

pub fn aggregate(entries: &[TimeEntry]) -> Totals {
    entries.iter().fold(Totals::default(), |acc, e| Totals {
        total_hours: acc.total_hours + e.hours,
        total_kilometers: acc.total_kilometers + e.kilometers,
    })
}

pub fn resolve_project_label(project_id: &str, projects: &[Project]) -> String {
    projects
        .iter()
        .find(|p| p.id == project_id)
        .map(|p| format!("{} - {}", p.code, p.name))
        .unwrap_or_else(|| UNKNOWN_PROJECT.to_string())
}

pub fn resolve_member_label(team_member_id: &str, members: &[TeamMember]) -> String {
    members
        .iter()
        .find(|m| m.id == team_member_id)
        .map(|m| m.name.clone())
        .unwrap_or_else(|| UNKNOWN_MEMBER.to_string())
}

pub fn entries_on(entries: &[TimeEntry], date: NaiveDate) -> Vec<TimeEntry> {
    entries.iter().filter(|e| e.date == date).cloned().collect()
}

/// Most recent first; entries sharing a date keep their stored order.
pub fn recent_entries(entries: &[TimeEntry], limit: usize) -> Vec<TimeEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by_key(|e| Reverse(e.date));
    sorted.truncate(limit);
    sorted
}

/// Report parameters as they arrive in a query string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,
}

impl ReportQuery {
    /// A date filter only applies once both ends are picked.
    pub fn date_range(&self) -> Option<DateRange> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(DateRange::new(start, end)),
            _ => None,
        }
    }

    pub fn member_filter(&self) -> MemberFilter {
        MemberFilter::from_param(self.member.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub id: String,
    pub date: NaiveDate,
    pub member: String,
    pub project: String,
    pub hours: f64,
    pub kilometers: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub generated_at: NaiveDateTime,
    pub date_range: Option<DateRange>,
    /// Resolved name of the filtered member, `None` when reporting on everyone.
    pub member: Option<String>,
    pub totals: Totals,
    pub rows: Vec<ReportRow>,
}

impl Report {
    pub fn build(
        query: &ReportQuery,
        projects: &[Project],
        members: &[TeamMember],
        entries: &[TimeEntry],
        generated_at: NaiveDateTime,
    ) -> Report {
        let date_range = query.date_range();
        let member_filter = query.member_filter();

        let filtered = filter_entries(entries, date_range.as_ref(), &member_filter);
        let totals = aggregate(&filtered);

        let member = match &member_filter {
            MemberFilter::All => None,
            MemberFilter::Member(id) => Some(resolve_member_label(id, members)),
        };

        let rows = recent_entries(&filtered, filtered.len())
            .into_iter()
            .map(|e| ReportRow {
                member: resolve_member_label(&e.team_member_id, members),
                project: resolve_project_label(&e.project_id, projects),
                id: e.id,
                date: e.date,
                hours: e.hours,
                kilometers: e.kilometers,
                description: e.description,
            })
            .collect();

        Report {
            generated_at,
            date_range,
            member,
            totals,
            rows,
        }
    }
}
