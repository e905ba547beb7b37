use std::env;
use std::fs;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Duration, Local, NaiveDate};
use clap::{Arg, ArgAction, Command};
use dotenv::dotenv;
use prettytable::{row, Table};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use shovel::render::{describe_dates, describe_member, format_date, format_quantity};
use shovel::report::{resolve_member_label, resolve_project_label, Summary};
use shovel::{NewProject, NewTeamMember, NewTimeEntry, Project, Report, ReportQuery, TeamMember, TimeEntry};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

struct Shovel {
    base_url: String,
    client: Client,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let base_url: String = env::var("BASE_URL").context("BASE_URL env var must be set!")?;

    let shovel = Shovel {
        base_url: base_url.trim_end_matches('/').to_string(),
        client: Client::new(),
    };

    let matches = Command::new("shovel")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A time and mileage tracking command line program.")
        .arg(
            Arg::new("add_project")
                .short('a')
                .long("add-project")
                .num_args(2)
                .value_names(["code", "name"])
                .help("Add a new project."),
        )
        .arg(
            Arg::new("list_projects")
                .short('p')
                .long("list-projects")
                .action(ArgAction::SetTrue)
                .help("List all projects."),
        )
        .arg(
            Arg::new("delete_project")
                .long("delete-project")
                .value_name("project")
                .help("Delete a project and every entry booked against it."),
        )
        .arg(
            Arg::new("add_member")
                .long("add-member")
                .value_name("name")
                .help("Add a new team member."),
        )
        .arg(
            Arg::new("list_members")
                .short('m')
                .long("list-members")
                .action(ArgAction::SetTrue)
                .help("List all team members."),
        )
        .arg(
            Arg::new("delete_member")
                .long("delete-member")
                .value_name("member")
                .help("Delete a team member and all of their entries."),
        )
        .arg(
            Arg::new("entry")
                .short('e')
                .long("entry")
                .value_name("date|member|project|hours|km[|description]")
                .help("Add a new time entry. Member and project may be ids, names or codes."),
        )
        .arg(
            Arg::new("day")
                .short('d')
                .long("day")
                .value_name("date")
                .help("List entries for a day: YYYY-MM-DD, today or yesterday."),
        )
        .arg(
            Arg::new("recent")
                .long("recent")
                .action(ArgAction::SetTrue)
                .help("List the most recent entries."),
        )
        .arg(
            Arg::new("delete_entry")
                .long("delete-entry")
                .value_name("id")
                .help("Delete a time entry."),
        )
        .arg(
            Arg::new("summary")
                .short('s')
                .long("summary")
                .action(ArgAction::SetTrue)
                .help("Show how many projects, members and entries are stored."),
        )
        .arg(
            Arg::new("report")
                .short('r')
                .long("report")
                .action(ArgAction::SetTrue)
                .help("Print a time and travel report."),
        )
        .arg(
            Arg::new("print")
                .long("print")
                .value_name("file")
                .help("Write the report as a printable HTML file."),
        )
        .arg(
            Arg::new("start")
                .long("start")
                .value_name("date")
                .help("Use with '-r' or '--print'. First day of the report."),
        )
        .arg(
            Arg::new("end")
                .long("end")
                .value_name("date")
                .help("Use with '-r' or '--print'. Last day of the report."),
        )
        .arg(
            Arg::new("member")
                .long("member")
                .value_name("member")
                .help("Use with '-r' or '--print'. Limit the report to one team member."),
        )
        .get_matches();

    if let Some(values) = matches.get_many::<String>("add_project") {
        let values: Vec<&String> = values.collect();
        let new_project = NewProject {
            code: values[0].to_string(),
            name: values[1].to_string(),
        };
        let project: Project = shovel.post_json("project", &new_project).await?;
        println!("Project saved: {} - {} ({})", project.code, project.name, project.id);
    }

    if matches.get_flag("list_projects") {
        let projects: Vec<Project> = shovel.get_json("api/projects").await?;

        let mut table = Table::new();
        table.add_row(row![Fb => "Id", "Code", "Name"]);
        for project in projects {
            table.add_row(row![project.id, project.code, project.name]);
        }
        table.printstd();
    }

    if let Some(value) = matches.get_one::<String>("delete_project") {
        let projects: Vec<Project> = shovel.get_json("api/projects").await?;
        let id = find_project(&projects, value)?;
        shovel.post_empty(&format!("delete_project/{}", id)).await?;
        println!("Project deleted.");
    }

    if let Some(name) = matches.get_one::<String>("add_member") {
        let new_member = NewTeamMember { name: name.to_string() };
        let member: TeamMember = shovel.post_json("team_member", &new_member).await?;
        println!("Team member saved: {} ({})", member.name, member.id);
    }

    if matches.get_flag("list_members") {
        let members: Vec<TeamMember> = shovel.get_json("api/team-members").await?;

        let mut table = Table::new();
        table.add_row(row![Fb => "Id", "Name"]);
        for member in members {
            table.add_row(row![member.id, member.name]);
        }
        table.printstd();
    }

    if let Some(value) = matches.get_one::<String>("delete_member") {
        let members: Vec<TeamMember> = shovel.get_json("api/team-members").await?;
        let id = find_member(&members, value)?;
        shovel.post_empty(&format!("delete_team_member/{}", id)).await?;
        println!("Team member deleted.");
    }

    if let Some(value) = matches.get_one::<String>("entry") {
        match process_new_entry(&shovel, value).await {
            Ok(entry) => println!("Entry submitted ({}).", entry.id),
            Err(e) => {
                eprintln!("Error writing entry: {}", e);
                std::process::exit(1);
            }
        }
    }

    if let Some(value) = matches.get_one::<String>("day") {
        let date = parse_day(value)?;
        let entries: Vec<TimeEntry> = shovel.get_json(&format!("entries/{}", date)).await?;
        shovel.entry_table(entries).await?.printstd();
    }

    if matches.get_flag("recent") {
        let entries: Vec<TimeEntry> = shovel.get_json("recent_entries").await?;
        shovel.entry_table(entries).await?.printstd();
    }

    if let Some(id) = matches.get_one::<String>("delete_entry") {
        shovel.post_empty(&format!("delete_entry/{}", id)).await?;
        println!("Entry deleted.");
    }

    if matches.get_flag("summary") {
        let summary: Summary = shovel.get_json("summary").await?;
        println!(
            "Team members: {}\nProjects: {}\nTime entries: {}",
            summary.team_members, summary.projects, summary.time_entries
        );
    }

    if matches.get_flag("report") || matches.contains_id("print") {
        let query = build_query(
            &shovel,
            matches.get_one::<String>("start"),
            matches.get_one::<String>("end"),
            matches.get_one::<String>("member"),
        )
        .await?;

        if matches.get_flag("report") {
            let url = format!("{}/report", shovel.base_url);
            let res = shovel.client.get(&url).query(&query).send().await?;
            let report: Report = read_json(res).await?;
            print_report(&report);
        }

        if let Some(path) = matches.get_one::<String>("print") {
            let url = format!("{}/report/print", shovel.base_url);
            let res = shovel.client.get(&url).query(&query).send().await?;
            let html = check(res).await?.text().await?;
            fs::write(path, html).with_context(|| format!("Failed to write {}", path))?;
            println!("Report written to {}.", path);
        }
    }

    Ok(())
}

impl Shovel {
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        let res = self.client.get(&url).send().await?;
        read_json(res).await
    }

    async fn post_json<B: serde::Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        let res = self.client.post(&url).json(body).send().await?;
        read_json(res).await
    }

    async fn post_empty(&self, path: &str) -> Result<()> {
        let url = format!("{}/{}", self.base_url, path);
        let res = self.client.post(&url).send().await?;
        check(res).await?;
        Ok(())
    }

    async fn entry_table(&self, mut entries: Vec<TimeEntry>) -> Result<Table> {
        let projects: Vec<Project> = self.get_json("api/projects").await?;
        let members: Vec<TeamMember> = self.get_json("api/team-members").await?;
        entries.sort_by(|a, b| b.date.cmp(&a.date));

        let mut table = Table::new();
        table.add_row(row![Fb => "Id", "Date", "Team Member", "Project", "Hours", "Travel", "Description"]);
        for e in entries {
            table.add_row(row![
                e.id,
                format_date(e.date),
                resolve_member_label(&e.team_member_id, &members),
                resolve_project_label(&e.project_id, &projects),
                format_quantity(e.hours, "h"),
                format_quantity(e.kilometers, "km"),
                e.description.unwrap_or_default()
            ]);
        }

        Ok(table)
    }
}

async fn check(res: Response) -> Result<Response> {
    if res.status().is_success() {
        return Ok(res);
    }

    let status = res.status();
    match res.json::<ErrorBody>().await {
        Ok(body) => Err(anyhow!("{} ({})", body.error, status)),
        Err(_) => Err(anyhow!("Http error: {}", status)),
    }
}

async fn read_json<T: DeserializeOwned>(res: Response) -> Result<T> {
    Ok(check(res).await?.json::<T>().await?)
}

async fn process_new_entry(shovel: &Shovel, value: &str) -> Result<TimeEntry> {
    let values: Vec<&str> = value.split('|').map(str::trim).collect();
    if values.len() < 5 || values.len() > 6 {
        bail!("expected date|member|project|hours|km[|description]");
    }

    let members: Vec<TeamMember> = shovel.get_json("api/team-members").await?;
    let projects: Vec<Project> = shovel.get_json("api/projects").await?;

    let new_entry = NewTimeEntry {
        date: parse_day(values[0])?,
        team_member_id: find_member(&members, values[1])?,
        project_id: find_project(&projects, values[2])?,
        hours: parse_quantity(values[3])?,
        kilometers: parse_quantity(values[4])?,
        description: values.get(5).map(|d| d.to_string()),
    };

    shovel.post_json("entry", &new_entry).await
}

async fn build_query(
    shovel: &Shovel,
    start: Option<&String>,
    end: Option<&String>,
    member: Option<&String>,
) -> Result<ReportQuery> {
    let member = match member.map(String::as_str) {
        None | Some("all") => None,
        Some(value) => {
            let members: Vec<TeamMember> = shovel.get_json("api/team-members").await?;
            Some(find_member(&members, value)?)
        }
    };

    Ok(ReportQuery {
        start: start.map(|s| parse_day(s)).transpose()?,
        end: end.map(|s| parse_day(s)).transpose()?,
        member,
    })
}

fn print_report(report: &Report) {
    println!("{}", describe_dates(report));
    println!("{}", describe_member(report));
    println!(
        "Total hours: {}    Total travel: {}",
        format_quantity(report.totals.total_hours, "h"),
        format_quantity(report.totals.total_kilometers, "km")
    );

    let mut table = Table::new();
    table.add_row(row![Fb => "Date", "Team Member", "Project", "Hours", "Travel", "Description"]);
    if report.rows.is_empty() {
        table.add_row(row![H6 => shovel::render::NO_ENTRIES]);
    }
    for r in &report.rows {
        let description = match r.description.as_deref() {
            Some(d) if !d.is_empty() => d,
            _ => "-",
        };
        table.add_row(row![
            format_date(r.date),
            r.member,
            r.project,
            format_quantity(r.hours, "h"),
            format_quantity(r.kilometers, "km"),
            description
        ]);
    }
    table.printstd();
}

fn parse_day(value: &str) -> Result<NaiveDate> {
    let today = Local::now().date_naive();
    match value {
        "today" => Ok(today),
        "yesterday" => Ok(today - Duration::days(1)),
        _ => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .with_context(|| format!("Invalid date: {}", value)),
    }
}

fn parse_quantity(value: &str) -> Result<f64> {
    if value.is_empty() {
        return Ok(0.0);
    }
    value
        .parse::<f64>()
        .with_context(|| format!("Invalid number: {}", value))
}

fn find_member(members: &[TeamMember], value: &str) -> Result<String> {
    members
        .iter()
        .find(|m| m.id == value || m.name == value)
        .map(|m| m.id.clone())
        .ok_or_else(|| anyhow!("No team member matches {}", value))
}

fn find_project(projects: &[Project], value: &str) -> Result<String> {
    projects
        .iter()
        .find(|p| p.id == value || p.code == value)
        .map(|p| p.id.clone())
        .ok_or_else(|| anyhow!("No project matches {}", value))
}
