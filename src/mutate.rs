//! Pure add/delete operations over whole collections.
//!
//! Each function takes the current collection(s) and returns replacements;
//! callers persist the returned values wholesale. Deleting a project or team
//! member also drops every time entry that referenced it.

use crate::error::ValidationError;
use crate::model::{new_id, NewProject, NewTeamMember, NewTimeEntry, Project, TeamMember, TimeEntry};

pub fn add_project(
    projects: &[Project],
    new_project: NewProject,
) -> Result<(Vec<Project>, Project), ValidationError> {
    if new_project.code.is_empty() {
        return Err(ValidationError::Missing("project code"));
    }
    if new_project.name.is_empty() {
        return Err(ValidationError::Missing("project name"));
    }

    let project = Project {
        id: new_id(),
        code: new_project.code,
        name: new_project.name,
    };

    let mut updated = projects.to_vec();
    updated.push(project.clone());

    Ok((updated, project))
}

pub fn delete_project(
    projects: &[Project],
    entries: &[TimeEntry],
    id: &str,
) -> (Vec<Project>, Vec<TimeEntry>) {
    let projects = projects.iter().filter(|p| p.id != id).cloned().collect();
    let entries = entries
        .iter()
        .filter(|e| e.project_id != id)
        .cloned()
        .collect();

    (projects, entries)
}

pub fn add_team_member(
    members: &[TeamMember],
    new_member: NewTeamMember,
) -> Result<(Vec<TeamMember>, TeamMember), ValidationError> {
    let name = new_member.name.trim();
    if name.is_empty() {
        return Err(ValidationError::Missing("team member name"));
    }

    let member = TeamMember {
        id: new_id(),
        name: name.to_string(),
    };

    let mut updated = members.to_vec();
    updated.push(member.clone());

    Ok((updated, member))
}

pub fn delete_team_member(
    members: &[TeamMember],
    entries: &[TimeEntry],
    id: &str,
) -> (Vec<TeamMember>, Vec<TimeEntry>) {
    let members = members.iter().filter(|m| m.id != id).cloned().collect();
    let entries = entries
        .iter()
        .filter(|e| e.team_member_id != id)
        .cloned()
        .collect();

    (members, entries)
}

pub fn add_time_entry(
    entries: &[TimeEntry],
    new_entry: NewTimeEntry,
) -> Result<(Vec<TimeEntry>, TimeEntry), ValidationError> {
    if new_entry.project_id.is_empty() {
        return Err(ValidationError::Missing("project"));
    }
    if new_entry.team_member_id.is_empty() {
        return Err(ValidationError::Missing("team member"));
    }
    check_quantity(new_entry.hours, "hours")?;
    check_quantity(new_entry.kilometers, "kilometers")?;
    if new_entry.hours == 0.0 && new_entry.kilometers == 0.0 {
        return Err(ValidationError::EmptyEntry);
    }

    let description = new_entry
        .description
        .filter(|d| !d.trim().is_empty());

    let entry = TimeEntry {
        id: new_id(),
        project_id: new_entry.project_id,
        team_member_id: new_entry.team_member_id,
        date: new_entry.date,
        hours: new_entry.hours,
        kilometers: new_entry.kilometers,
        description,
    };

    let mut updated = entries.to_vec();
    updated.push(entry.clone());

    Ok((updated, entry))
}

pub fn delete_time_entry(entries: &[TimeEntry], id: &str) -> Vec<TimeEntry> {
    entries.iter().filter(|e| e.id != id).cloned().collect()
}

fn check_quantity(value: f64, field: &'static str) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidQuantity(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fake::{Fake, Faker};

    fn entry(id: &str, project_id: &str, team_member_id: &str) -> TimeEntry {
        TimeEntry {
            id: id.to_string(),
            project_id: project_id.to_string(),
            team_member_id: team_member_id.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            hours: 1.0,
            kilometers: 0.0,
            description: None,
        }
    }

    fn new_entry(hours: f64, kilometers: f64) -> NewTimeEntry {
        NewTimeEntry {
            project_id: "p1".to_string(),
            team_member_id: "m1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            hours,
            kilometers,
            description: None,
        }
    }

    #[test]
    fn test_add_project() {
        let existing: Vec<Project> = vec![Faker.fake()];
        let (projects, created) = add_project(
            &existing,
            NewProject {
                code: "PRJ001".to_string(),
                name: "Bridge repair".to_string(),
            },
        )
        .unwrap();

        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0], existing[0]);
        assert_eq!(projects[1], created);
        assert_eq!(created.code, "PRJ001");
        assert!(!created.id.is_empty());
    }

    #[test]
    fn test_add_project_requires_code_and_name() {
        let res = add_project(
            &[],
            NewProject {
                code: String::new(),
                name: "Bridge repair".to_string(),
            },
        );
        assert_eq!(res.unwrap_err(), ValidationError::Missing("project code"));

        let res = add_project(
            &[],
            NewProject {
                code: "PRJ001".to_string(),
                name: String::new(),
            },
        );
        assert_eq!(res.unwrap_err(), ValidationError::Missing("project name"));
    }

    #[test]
    fn test_delete_project_cascades() {
        let mut keep: Project = Faker.fake();
        keep.id = "p2".to_string();
        let mut gone: Project = Faker.fake();
        gone.id = "p1".to_string();

        let entries = vec![entry("e1", "p1", "m1"), entry("e2", "p2", "m1"), entry("e3", "p1", "m2")];

        let (projects, entries) = delete_project(&[gone, keep.clone()], &entries, "p1");

        assert_eq!(projects, vec![keep]);
        assert_eq!(entries, vec![entry("e2", "p2", "m1")]);
    }

    #[test]
    fn test_delete_unknown_project_is_noop() {
        let projects: Vec<Project> = (0..2).map(|_| Faker.fake()).collect();
        let entries = vec![entry("e1", "p1", "m1")];

        let (after, after_entries) = delete_project(&projects, &entries, "missing");

        assert_eq!(after, projects);
        assert_eq!(after_entries, entries);
    }

    #[test]
    fn test_add_team_member_trims_name() {
        let (members, created) = add_team_member(
            &[],
            NewTeamMember {
                name: "  Alice  ".to_string(),
            },
        )
        .unwrap();

        assert_eq!(members, vec![created.clone()]);
        assert_eq!(created.name, "Alice");

        let res = add_team_member(&members, NewTeamMember { name: "   ".to_string() });
        assert_eq!(res.unwrap_err(), ValidationError::Missing("team member name"));
    }

    #[test]
    fn test_delete_team_member_cascades() {
        let mut alice: TeamMember = Faker.fake();
        alice.id = "m1".to_string();
        let mut bob: TeamMember = Faker.fake();
        bob.id = "m2".to_string();

        let entries = vec![entry("e1", "p1", "m1"), entry("e2", "p1", "m2")];
        let (members, entries) = delete_team_member(&[alice, bob.clone()], &entries, "m1");

        assert_eq!(members, vec![bob]);
        assert_eq!(entries, vec![entry("e2", "p1", "m2")]);
    }

    #[test]
    fn test_add_time_entry() {
        let mut input = new_entry(0.0, 35.5);
        input.description = Some("   ".to_string());

        let (entries, created) = add_time_entry(&[], input).unwrap();

        assert_eq!(entries, vec![created.clone()]);
        assert_eq!(created.kilometers, 35.5);
        assert_eq!(created.description, None);
    }

    #[test]
    fn test_add_time_entry_rejects_empty_and_negative() {
        assert_eq!(
            add_time_entry(&[], new_entry(0.0, 0.0)).unwrap_err(),
            ValidationError::EmptyEntry
        );
        assert_eq!(
            add_time_entry(&[], new_entry(-1.0, 3.0)).unwrap_err(),
            ValidationError::InvalidQuantity("hours")
        );
        assert_eq!(
            add_time_entry(&[], new_entry(1.0, f64::NAN)).unwrap_err(),
            ValidationError::InvalidQuantity("kilometers")
        );

        let mut input = new_entry(1.0, 0.0);
        input.team_member_id = String::new();
        assert_eq!(
            add_time_entry(&[], input).unwrap_err(),
            ValidationError::Missing("team member")
        );
    }

    #[test]
    fn test_delete_time_entry() {
        let entries = vec![entry("e1", "p1", "m1"), entry("e2", "p1", "m1")];
        assert_eq!(delete_time_entry(&entries, "e1"), vec![entry("e2", "p1", "m1")]);
    }
}
