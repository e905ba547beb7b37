use std::convert::Infallible;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use warp::reply::{Reply, Response};
use warp::{http, Filter};

use crate::error::RepositoryError;
use crate::model::{NewProject, NewTeamMember, NewTimeEntry, Project, TeamMember, TimeEntry};
use crate::report::{ReportQuery, RECENT_LIMIT};
use crate::repository::Repository;

// Whole collections travel in one body.
const BODY_LIMIT: u64 = 1024 * 1024 * 4;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone {
    warp::body::content_length_limit(BODY_LIMIT).and(warp::body::json())
}

fn with_repo(repo: Arc<Repository>) -> impl Filter<Extract = (Arc<Repository>,), Error = Infallible> + Clone {
    warp::any().map(move || repo.clone())
}

/// Every route the server exposes.
pub fn routes(repo: Arc<Repository>) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    get_projects(repo.clone())
        .or(save_projects(repo.clone()))
        .or(get_team_members(repo.clone()))
        .or(save_team_members(repo.clone()))
        .or(get_time_entries(repo.clone()))
        .or(save_time_entries(repo.clone()))
        .or(store_test(repo.clone()))
        .or(post_project(repo.clone()))
        .or(delete_project(repo.clone()))
        .or(post_team_member(repo.clone()))
        .or(delete_team_member(repo.clone()))
        .or(post_entry(repo.clone()))
        .or(delete_entry(repo.clone()))
        .or(get_entries_on(repo.clone()))
        .or(get_recent_entries(repo.clone()))
        .or(get_summary(repo.clone()))
        .or(get_report(repo.clone()))
        .or(print_report(repo))
}

// Filters
pub fn get_projects(repo: Arc<Repository>) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "projects")
        .and(warp::get())
        .and(with_repo(repo))
        .and_then(list_projects)
}

pub fn save_projects(repo: Arc<Repository>) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "projects")
        .and(warp::post())
        .and(json_body::<Vec<Project>>())
        .and(with_repo(repo))
        .and_then(replace_projects)
}

pub fn get_team_members(repo: Arc<Repository>) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "team-members")
        .and(warp::get())
        .and(with_repo(repo))
        .and_then(list_team_members)
}

pub fn save_team_members(repo: Arc<Repository>) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "team-members")
        .and(warp::post())
        .and(json_body::<Vec<TeamMember>>())
        .and(with_repo(repo))
        .and_then(replace_team_members)
}

pub fn get_time_entries(repo: Arc<Repository>) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "time-entries")
        .and(warp::get())
        .and(with_repo(repo))
        .and_then(list_time_entries)
}

pub fn save_time_entries(repo: Arc<Repository>) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "time-entries")
        .and(warp::post())
        .and(json_body::<Vec<TimeEntry>>())
        .and(with_repo(repo))
        .and_then(replace_time_entries)
}

pub fn store_test(repo: Arc<Repository>) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "test")
        .and(warp::get())
        .and(with_repo(repo))
        .and_then(probe_store)
}

pub fn post_project(repo: Arc<Repository>) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("project")
        .and(warp::post())
        .and(json_body::<NewProject>())
        .and(with_repo(repo))
        .and_then(new_project)
}

pub fn delete_project(repo: Arc<Repository>) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::post()
        .and(warp::path!("delete_project" / String))
        .and(with_repo(repo))
        .and_then(delete_project_handler)
}

pub fn post_team_member(repo: Arc<Repository>) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("team_member")
        .and(warp::post())
        .and(json_body::<NewTeamMember>())
        .and(with_repo(repo))
        .and_then(new_team_member)
}

pub fn delete_team_member(repo: Arc<Repository>) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::post()
        .and(warp::path!("delete_team_member" / String))
        .and(with_repo(repo))
        .and_then(delete_team_member_handler)
}

pub fn post_entry(repo: Arc<Repository>) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("entry")
        .and(warp::post())
        .and(json_body::<NewTimeEntry>())
        .and(with_repo(repo))
        .and_then(new_entry)
}

pub fn delete_entry(repo: Arc<Repository>) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::post()
        .and(warp::path!("delete_entry" / String))
        .and(with_repo(repo))
        .and_then(delete_entry_handler)
}

pub fn get_entries_on(repo: Arc<Repository>) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::get()
        .and(warp::path!("entries" / NaiveDate))
        .and(with_repo(repo))
        .and_then(entries_on)
}

pub fn get_recent_entries(repo: Arc<Repository>) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("recent_entries")
        .and(warp::get())
        .and(warp::query::<RecentQuery>())
        .and(with_repo(repo))
        .and_then(recent_entries)
}

pub fn get_summary(repo: Arc<Repository>) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("summary")
        .and(warp::get())
        .and(with_repo(repo))
        .and_then(summary)
}

pub fn get_report(repo: Arc<Repository>) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("report")
        .and(warp::get())
        .and(warp::query::<ReportQuery>())
        .and(with_repo(repo))
        .and_then(report)
}

pub fn print_report(repo: Arc<Repository>) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("report" / "print")
        .and(warp::get())
        .and(warp::query::<ReportQuery>())
        .and(with_repo(repo))
        .and_then(print)
}

// Handlers
async fn list_projects(repo: Arc<Repository>) -> Result<Response, Infallible> {
    match repo.fetch_projects().await {
        Ok(projects) => Ok(warp::reply::json(&projects).into_response()),
        Err(e) => Ok(error_response(e)),
    }
}

async fn replace_projects(projects: Vec<Project>, repo: Arc<Repository>) -> Result<Response, Infallible> {
    Ok(saved(repo.replace_projects(projects).await))
}

async fn list_team_members(repo: Arc<Repository>) -> Result<Response, Infallible> {
    match repo.fetch_team_members().await {
        Ok(members) => Ok(warp::reply::json(&members).into_response()),
        Err(e) => Ok(error_response(e)),
    }
}

async fn replace_team_members(members: Vec<TeamMember>, repo: Arc<Repository>) -> Result<Response, Infallible> {
    Ok(saved(repo.replace_team_members(members).await))
}

async fn list_time_entries(repo: Arc<Repository>) -> Result<Response, Infallible> {
    match repo.fetch_time_entries().await {
        Ok(entries) => Ok(warp::reply::json(&entries).into_response()),
        Err(e) => Ok(error_response(e)),
    }
}

async fn replace_time_entries(entries: Vec<TimeEntry>, repo: Arc<Repository>) -> Result<Response, Infallible> {
    Ok(saved(repo.replace_time_entries(entries).await))
}

async fn probe_store(repo: Arc<Repository>) -> Result<Response, Infallible> {
    match repo.probe().await {
        Ok(value) => Ok(warp::reply::json(&json!({
            "success": true,
            "message": "Store connection test",
            "value": value,
            "backend": repo.backend(),
        }))
        .into_response()),
        Err(e) => {
            tracing::error!(error = ?e, "Store connection test failed");
            Ok(warp::reply::with_status(
                warp::reply::json(&json!({
                    "success": false,
                    "error": e.to_string(),
                    "backend": repo.backend(),
                })),
                http::StatusCode::INTERNAL_SERVER_ERROR,
            )
            .into_response())
        }
    }
}

async fn new_project(project: NewProject, repo: Arc<Repository>) -> Result<Response, Infallible> {
    match repo.add_project(project).await {
        Ok(project) => Ok(warp::reply::json(&project).into_response()),
        Err(e) => Ok(error_response(e)),
    }
}

async fn delete_project_handler(id: String, repo: Arc<Repository>) -> Result<Response, Infallible> {
    Ok(saved(repo.delete_project(&id).await))
}

async fn new_team_member(member: NewTeamMember, repo: Arc<Repository>) -> Result<Response, Infallible> {
    match repo.add_team_member(member).await {
        Ok(member) => Ok(warp::reply::json(&member).into_response()),
        Err(e) => Ok(error_response(e)),
    }
}

async fn delete_team_member_handler(id: String, repo: Arc<Repository>) -> Result<Response, Infallible> {
    Ok(saved(repo.delete_team_member(&id).await))
}

async fn new_entry(entry: NewTimeEntry, repo: Arc<Repository>) -> Result<Response, Infallible> {
    match repo.add_time_entry(entry).await {
        Ok(entry) => Ok(warp::reply::json(&entry).into_response()),
        Err(e) => Ok(error_response(e)),
    }
}

async fn delete_entry_handler(id: String, repo: Arc<Repository>) -> Result<Response, Infallible> {
    Ok(saved(repo.delete_time_entry(&id).await))
}

async fn entries_on(date: NaiveDate, repo: Arc<Repository>) -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&repo.entries_on(date).await))
}

async fn recent_entries(query: RecentQuery, repo: Arc<Repository>) -> Result<impl Reply, Infallible> {
    let limit = query.limit.unwrap_or(RECENT_LIMIT);
    Ok(warp::reply::json(&repo.recent_entries(limit).await))
}

async fn summary(repo: Arc<Repository>) -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&repo.summary().await))
}

async fn report(query: ReportQuery, repo: Arc<Repository>) -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&repo.report(&query).await))
}

async fn print(query: ReportQuery, repo: Arc<Repository>) -> Result<impl Reply, Infallible> {
    Ok(warp::reply::html(repo.print(&query).await))
}

fn saved(result: Result<(), RepositoryError>) -> Response {
    match result {
        Ok(()) => warp::reply::json(&json!({ "success": true })).into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(e: RepositoryError) -> Response {
    let status = match e {
        RepositoryError::Invalid(_) => http::StatusCode::BAD_REQUEST,
        RepositoryError::Fetch { .. } | RepositoryError::Persist { .. } => {
            http::StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    warp::reply::with_status(warp::reply::json(&ErrorBody { error: e.to_string() }), status).into_response()
}
