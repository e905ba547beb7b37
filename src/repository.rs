//! In-memory copy of the three collections, persisted wholesale on change.
//!
//! Each collection sits behind its own async mutex that a mutation holds until
//! its write to the store completes, so writes to one collection are never
//! reordered. Locks are always taken projects, then team members, then time
//! entries.
//!
//! A failed write leaves the already-applied change in memory and reports the
//! failure; nothing is rolled back or retried.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::{RepositoryError, StoreError, ValidationError};
use crate::model::{Collection, NewProject, NewTeamMember, NewTimeEntry, Project, TeamMember, TimeEntry};
use crate::mutate;
use crate::render;
use crate::report::{self, Report, ReportQuery, Summary};
use crate::store::{self, KeyValueStore};

pub struct Repository {
    store: Arc<dyn KeyValueStore>,
    projects: Mutex<Vec<Project>>,
    team_members: Mutex<Vec<TeamMember>>,
    time_entries: Mutex<Vec<TimeEntry>>,
}

impl Repository {
    /// Reads every collection once. One that cannot be read starts out empty.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let projects = load_or_empty(store.as_ref(), Collection::Projects).await;
        let team_members = load_or_empty(store.as_ref(), Collection::TeamMembers).await;
        let time_entries = load_or_empty(store.as_ref(), Collection::TimeEntries).await;

        tracing::info!(
            backend = store.backend(),
            projects = projects.len(),
            team_members = team_members.len(),
            time_entries = time_entries.len(),
            "Loaded collections"
        );

        Repository {
            store,
            projects: Mutex::new(projects),
            team_members: Mutex::new(team_members),
            time_entries: Mutex::new(time_entries),
        }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub async fn projects(&self) -> Vec<Project> {
        self.projects.lock().await.clone()
    }

    pub async fn team_members(&self) -> Vec<TeamMember> {
        self.team_members.lock().await.clone()
    }

    pub async fn time_entries(&self) -> Vec<TimeEntry> {
        self.time_entries.lock().await.clone()
    }

    pub async fn fetch_projects(&self) -> Result<Vec<Project>, RepositoryError> {
        self.refresh(&self.projects, Collection::Projects).await
    }

    pub async fn fetch_team_members(&self) -> Result<Vec<TeamMember>, RepositoryError> {
        self.refresh(&self.team_members, Collection::TeamMembers).await
    }

    pub async fn fetch_time_entries(&self) -> Result<Vec<TimeEntry>, RepositoryError> {
        self.refresh(&self.time_entries, Collection::TimeEntries).await
    }

    pub async fn replace_projects(&self, projects: Vec<Project>) -> Result<(), RepositoryError> {
        self.replace(&self.projects, Collection::Projects, projects).await
    }

    pub async fn replace_team_members(&self, members: Vec<TeamMember>) -> Result<(), RepositoryError> {
        self.replace(&self.team_members, Collection::TeamMembers, members).await
    }

    pub async fn replace_time_entries(&self, entries: Vec<TimeEntry>) -> Result<(), RepositoryError> {
        self.replace(&self.time_entries, Collection::TimeEntries, entries).await
    }

    pub async fn add_project(&self, new_project: NewProject) -> Result<Project, RepositoryError> {
        let mut projects = self.projects.lock().await;
        let (updated, project) = mutate::add_project(&projects, new_project)?;
        *projects = updated;

        tracing::info!(project_id = %project.id, code = %project.code, "Added project");
        self.persist(Collection::Projects, projects.as_slice()).await?;

        Ok(project)
    }

    pub async fn delete_project(&self, id: &str) -> Result<(), RepositoryError> {
        let mut projects = self.projects.lock().await;
        let mut entries = self.time_entries.lock().await;

        let (remaining, kept_entries) = mutate::delete_project(&projects, &entries, id);
        tracing::info!(
            project_id = id,
            dropped_entries = entries.len() - kept_entries.len(),
            "Deleted project"
        );
        *projects = remaining;
        *entries = kept_entries;

        let projects_saved = self.persist(Collection::Projects, projects.as_slice()).await;
        let entries_saved = self.persist(Collection::TimeEntries, entries.as_slice()).await;
        projects_saved.and(entries_saved)
    }

    pub async fn add_team_member(&self, new_member: NewTeamMember) -> Result<TeamMember, RepositoryError> {
        let mut members = self.team_members.lock().await;
        let (updated, member) = mutate::add_team_member(&members, new_member)?;
        *members = updated;

        tracing::info!(team_member_id = %member.id, "Added team member");
        self.persist(Collection::TeamMembers, members.as_slice()).await?;

        Ok(member)
    }

    pub async fn delete_team_member(&self, id: &str) -> Result<(), RepositoryError> {
        let mut members = self.team_members.lock().await;
        let mut entries = self.time_entries.lock().await;

        let (remaining, kept_entries) = mutate::delete_team_member(&members, &entries, id);
        tracing::info!(
            team_member_id = id,
            dropped_entries = entries.len() - kept_entries.len(),
            "Deleted team member"
        );
        *members = remaining;
        *entries = kept_entries;

        let members_saved = self.persist(Collection::TeamMembers, members.as_slice()).await;
        let entries_saved = self.persist(Collection::TimeEntries, entries.as_slice()).await;
        members_saved.and(entries_saved)
    }

    /// Adds an entry for an existing project and team member.
    pub async fn add_time_entry(&self, new_entry: NewTimeEntry) -> Result<TimeEntry, RepositoryError> {
        let projects = self.projects.lock().await;
        let members = self.team_members.lock().await;
        let mut entries = self.time_entries.lock().await;

        let (updated, entry) = mutate::add_time_entry(&entries, new_entry)?;
        if !projects.iter().any(|p| p.id == entry.project_id) {
            return Err(ValidationError::UnknownProject(entry.project_id).into());
        }
        if !members.iter().any(|m| m.id == entry.team_member_id) {
            return Err(ValidationError::UnknownTeamMember(entry.team_member_id).into());
        }
        drop(members);
        drop(projects);

        *entries = updated;
        tracing::info!(
            time_entry_id = %entry.id,
            date = %entry.date,
            hours = entry.hours,
            kilometers = entry.kilometers,
            "Added time entry"
        );
        self.persist(Collection::TimeEntries, entries.as_slice()).await?;

        Ok(entry)
    }

    pub async fn delete_time_entry(&self, id: &str) -> Result<(), RepositoryError> {
        let mut entries = self.time_entries.lock().await;
        let remaining = mutate::delete_time_entry(&entries, id);
        *entries = remaining;

        tracing::info!(time_entry_id = id, "Deleted time entry");
        self.persist(Collection::TimeEntries, entries.as_slice()).await
    }

    pub async fn entries_on(&self, date: NaiveDate) -> Vec<TimeEntry> {
        report::entries_on(&self.time_entries.lock().await, date)
    }

    pub async fn recent_entries(&self, limit: usize) -> Vec<TimeEntry> {
        report::recent_entries(&self.time_entries.lock().await, limit)
    }

    pub async fn summary(&self) -> Summary {
        let projects = self.projects.lock().await;
        let members = self.team_members.lock().await;
        let entries = self.time_entries.lock().await;

        Summary {
            projects: projects.len(),
            team_members: members.len(),
            time_entries: entries.len(),
        }
    }

    pub async fn report(&self, query: &ReportQuery) -> Report {
        let projects = self.projects.lock().await;
        let members = self.team_members.lock().await;
        let entries = self.time_entries.lock().await;

        Report::build(query, &projects, &members, &entries, Local::now().naive_local())
    }

    pub async fn print(&self, query: &ReportQuery) -> String {
        render::render_html(&self.report(query).await)
    }

    pub async fn probe(&self) -> Result<String, StoreError> {
        store::probe(self.store.as_ref()).await
    }

    async fn refresh<T>(&self, slot: &Mutex<Vec<T>>, collection: Collection) -> Result<Vec<T>, RepositoryError>
    where
        T: DeserializeOwned + Clone,
    {
        let mut current = slot.lock().await;
        let fresh: Vec<T> = store::read_collection(self.store.as_ref(), collection)
            .await
            .map_err(|source| {
                tracing::error!(error = ?source, "Error fetching {}", collection);
                RepositoryError::Fetch { collection, source }
            })?;

        *current = fresh.clone();
        Ok(fresh)
    }

    async fn replace<T>(&self, slot: &Mutex<Vec<T>>, collection: Collection, items: Vec<T>) -> Result<(), RepositoryError>
    where
        T: Serialize,
    {
        let mut current = slot.lock().await;
        *current = items;

        tracing::info!(count = current.len(), "Replacing {}", collection);
        self.persist(collection, current.as_slice()).await
    }

    async fn persist<T: Serialize>(&self, collection: Collection, items: &[T]) -> Result<(), RepositoryError> {
        store::write_collection(self.store.as_ref(), collection, items)
            .await
            .map_err(|source| {
                tracing::error!(error = ?source, "Error saving {}", collection);
                RepositoryError::Persist { collection, source }
            })
    }
}

async fn load_or_empty<T: DeserializeOwned>(store: &dyn KeyValueStore, collection: Collection) -> Vec<T> {
    match store::read_collection(store, collection).await {
        Ok(items) => items,
        Err(e) => {
            tracing::error!(error = ?e, "Error fetching {}; starting empty", collection);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::FlakyStore;
    use crate::store::MemoryStore;
    use anyhow::Result;
    use std::sync::atomic::Ordering;

    fn new_project(code: &str) -> NewProject {
        NewProject {
            code: code.to_string(),
            name: format!("{} works", code),
        }
    }

    fn new_entry(project: &Project, member: &TeamMember, day: u32) -> NewTimeEntry {
        NewTimeEntry {
            project_id: project.id.clone(),
            team_member_id: member.id.clone(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            hours: 2.0,
            kilometers: 5.0,
            description: Some("trenching".to_string()),
        }
    }

    #[tokio::test]
    async fn test_mutations_are_persisted() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let repo = Repository::load(store.clone()).await;

        let project = repo.add_project(new_project("PRJ001")).await?;
        let member = repo.add_team_member(NewTeamMember { name: "Alice".to_string() }).await?;
        let entry = repo.add_time_entry(new_entry(&project, &member, 5)).await?;

        let reloaded = Repository::load(store).await;
        assert_eq!(reloaded.projects().await, vec![project]);
        assert_eq!(reloaded.team_members().await, vec![member]);
        assert_eq!(reloaded.time_entries().await, vec![entry]);

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_project_cascades_to_store() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let repo = Repository::load(store.clone()).await;

        let doomed = repo.add_project(new_project("PRJ001")).await?;
        let kept = repo.add_project(new_project("PRJ002")).await?;
        let member = repo.add_team_member(NewTeamMember { name: "Alice".to_string() }).await?;
        repo.add_time_entry(new_entry(&doomed, &member, 5)).await?;
        let survivor = repo.add_time_entry(new_entry(&kept, &member, 6)).await?;

        repo.delete_project(&doomed.id).await?;

        let reloaded = Repository::load(store).await;
        assert_eq!(reloaded.projects().await, vec![kept]);
        assert_eq!(reloaded.time_entries().await, vec![survivor]);

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_team_member_cascades() -> Result<()> {
        let repo = Repository::load(Arc::new(MemoryStore::new())).await;

        let project = repo.add_project(new_project("PRJ001")).await?;
        let alice = repo.add_team_member(NewTeamMember { name: "Alice".to_string() }).await?;
        let bob = repo.add_team_member(NewTeamMember { name: "Bob".to_string() }).await?;
        repo.add_time_entry(new_entry(&project, &alice, 5)).await?;
        let bobs = repo.add_time_entry(new_entry(&project, &bob, 5)).await?;

        repo.delete_team_member(&alice.id).await?;

        assert_eq!(repo.team_members().await, vec![bob]);
        assert_eq!(repo.time_entries().await, vec![bobs]);

        Ok(())
    }

    #[tokio::test]
    async fn test_entry_requires_known_references() -> Result<()> {
        let repo = Repository::load(Arc::new(MemoryStore::new())).await;
        let project = repo.add_project(new_project("PRJ001")).await?;
        let ghost = TeamMember {
            id: "ghost".to_string(),
            name: "Nobody".to_string(),
        };

        let res = repo.add_time_entry(new_entry(&project, &ghost, 5)).await;
        assert!(matches!(
            res,
            Err(RepositoryError::Invalid(ValidationError::UnknownTeamMember(_)))
        ));
        assert!(repo.time_entries().await.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_read_starts_empty() -> Result<()> {
        let store = Arc::new(FlakyStore::failing_reads());
        let repo = Repository::load(store).await;

        assert!(repo.projects().await.is_empty());
        assert!(matches!(
            repo.fetch_projects().await,
            Err(RepositoryError::Fetch { collection: Collection::Projects, .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_write_keeps_optimistic_state() -> Result<()> {
        let store = Arc::new(FlakyStore::failing_writes());
        let repo = Repository::load(store.clone()).await;

        let res = repo.add_project(new_project("PRJ001")).await;
        match res {
            Err(e @ RepositoryError::Persist { .. }) => assert_eq!(e.to_string(), "Failed to save projects"),
            other => panic!("expected persist failure, got {:?}", other),
        }

        assert_eq!(repo.projects().await.len(), 1);
        assert_eq!(store.raw(Collection::Projects.key()).await, None);

        // Re-triggering once the store recovers saves the accumulated state.
        store.fail_set.store(false, Ordering::SeqCst);
        repo.add_project(new_project("PRJ002")).await?;
        let saved: Vec<Project> = store::read_collection(&*store, Collection::Projects).await?;
        assert_eq!(saved.len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_picks_up_external_writes() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let repo = Repository::load(store.clone()).await;

        let members = vec![TeamMember {
            id: "m1".to_string(),
            name: "Carol".to_string(),
        }];
        store::write_collection(&*store, Collection::TeamMembers, &members).await?;

        assert!(repo.team_members().await.is_empty());
        assert_eq!(repo.fetch_team_members().await?, members);
        assert_eq!(repo.team_members().await, members);

        Ok(())
    }

    #[tokio::test]
    async fn test_report_and_print() -> Result<()> {
        let repo = Repository::load(Arc::new(MemoryStore::new())).await;
        let project = repo.add_project(new_project("PRJ001")).await?;
        let member = repo.add_team_member(NewTeamMember { name: "Alice".to_string() }).await?;
        repo.add_time_entry(new_entry(&project, &member, 5)).await?;
        repo.add_time_entry(new_entry(&project, &member, 9)).await?;

        let query = ReportQuery {
            member: Some(member.id.clone()),
            ..ReportQuery::default()
        };
        let report = repo.report(&query).await;
        assert_eq!(report.totals.total_hours, 4.0);
        assert_eq!(report.totals.total_kilometers, 10.0);
        assert_eq!(report.rows[0].project, "PRJ001 - PRJ001 works");

        let html = repo.print(&query).await;
        assert!(html.contains("Team Member: Alice"));
        assert!(html.contains("4.0h"));

        assert_eq!(
            repo.summary().await,
            Summary {
                projects: 1,
                team_members: 1,
                time_entries: 2
            }
        );

        Ok(())
    }
}
