//! Printable HTML for a report.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::report::Report;

pub const TITLE: &str = "Shovel Project Time Tracker";
pub const NO_ENTRIES: &str = "No entries found for the selected criteria";

const STYLE: &str = "
    body { font-family: Arial, sans-serif; margin: 20px; }
    .header { text-align: center; margin-bottom: 30px; }
    .filters { margin-bottom: 20px; padding: 15px; background: #f5f5f5; }
    .totals { display: flex; gap: 20px; margin-bottom: 20px; }
    .total-card { flex: 1; padding: 15px; border: 1px solid #ddd; text-align: center; }
    .total-value { font-size: 24px; font-weight: bold; }
    table { width: 100%; border-collapse: collapse; margin-top: 20px; }
    th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
    th { background-color: #f5f5f5; font-weight: bold; }
    .no-data { text-align: center; padding: 20px; color: #666; }
    @media print {
        body { margin: 0; }
        .no-print { display: none; }
    }
";

pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %d, %Y").to_string()
}

/// Long date with an ordinal day and a 12-hour clock, e.g. `February 1st, 2024 at 3:04 PM`.
pub fn format_timestamp(at: NaiveDateTime) -> String {
    let day = at.day();
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!(
        "{} {}{}, {} at {}",
        at.format("%B"),
        day,
        suffix,
        at.year(),
        at.format("%-I:%M %p")
    )
}

/// One decimal place followed by the unit, e.g. `3.5h` or `12.0km`.
///
/// Ties round away from zero on the exact binary value, so `0.25` prints as `0.3`.
pub fn format_quantity(value: f64, unit: &str) -> String {
    match Decimal::from_f64_retain(value) {
        Some(exact) => {
            let mut rounded = exact.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
            rounded.rescale(1);
            format!("{}{}", rounded, unit)
        }
        None => format!("{:.1}{}", value, unit),
    }
}

pub fn describe_dates(report: &Report) -> String {
    match &report.date_range {
        Some(range) => format!(
            "Date Range: {} - {}",
            format_date(range.start),
            format_date(range.end)
        ),
        None => String::from("Date Range: All dates"),
    }
}

pub fn describe_member(report: &Report) -> String {
    match &report.member {
        Some(name) => format!("Team Member: {}", name),
        None => String::from("Team Member: All Team Members"),
    }
}

pub fn render_html(report: &Report) -> String {
    let mut rows = String::new();

    if report.rows.is_empty() {
        rows.push_str(&format!(
            "      <tr><td colspan=\"6\" class=\"no-data\">{}</td></tr>\n",
            NO_ENTRIES
        ));
    }

    for row in &report.rows {
        let description = match row.description.as_deref() {
            Some(d) if !d.is_empty() => escape(d),
            _ => String::from("-"),
        };

        rows.push_str(&format!(
            "      <tr>
        <td>{}</td>
        <td>{}</td>
        <td>{}</td>
        <td>{}</td>
        <td>{}</td>
        <td>{}</td>
      </tr>\n",
            format_date(row.date),
            escape(&row.member),
            escape(&row.project),
            format_quantity(row.hours, "h"),
            format_quantity(row.kilometers, "km"),
            description,
        ));
    }

    format!(
        "<!DOCTYPE html>
<html>
<head>
  <title>{title} - Report</title>
  <style>{style}</style>
</head>
<body>
  <div class=\"header\">
    <h1>{title}</h1>
    <h2>Time &amp; Travel Report</h2>
    <p>Generated on {generated}</p>
  </div>
  <div class=\"filters\">
    <strong>Report Filters:</strong><br>
    {dates}<br>
    {member}
  </div>
  <div class=\"totals\">
    <div class=\"total-card\">
      <div>Total Hours</div>
      <div class=\"total-value\">{hours}</div>
    </div>
    <div class=\"total-card\">
      <div>Total Travel</div>
      <div class=\"total-value\">{kilometers}</div>
    </div>
  </div>
  <table>
    <thead>
      <tr>
        <th>Date</th>
        <th>Team Member</th>
        <th>Project</th>
        <th>Hours</th>
        <th>Travel (km)</th>
        <th>Description</th>
      </tr>
    </thead>
    <tbody>
{rows}    </tbody>
  </table>
</body>
</html>
",
        title = TITLE,
        style = STYLE,
        generated = format_timestamp(report.generated_at),
        dates = escape(&describe_dates(report)),
        member = escape(&describe_member(report)),
        hours = format_quantity(report.totals.total_hours, "h"),
        kilometers = format_quantity(report.totals.total_kilometers, "km"),
        rows = rows,
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{DateRange, ReportRow, Totals};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn report(rows: Vec<ReportRow>) -> Report {
        Report {
            generated_at: date(2024, 2, 1).and_hms_opt(15, 4, 0).unwrap(),
            date_range: None,
            member: None,
            totals: Totals {
                total_hours: 3.5,
                total_kilometers: 3.0,
            },
            rows,
        }
    }

    fn row(id: &str, day: NaiveDate, description: Option<&str>) -> ReportRow {
        ReportRow {
            id: id.to_string(),
            date: day,
            member: "Alice".to_string(),
            project: "PRJ001 - Bridge repair".to_string(),
            hours: 2.0,
            kilometers: 3.0,
            description: description.map(String::from),
        }
    }

    #[test]
    fn test_empty_report() {
        let html = render_html(&report(vec![]));

        assert!(html.contains(NO_ENTRIES));
        assert!(html.contains("Date Range: All dates"));
        assert!(html.contains("Team Member: All Team Members"));
        assert!(html.contains("3.5h"));
        assert!(html.contains("3.0km"));
        assert!(html.contains("Generated on February 1st, 2024 at 3:04 PM"));
    }

    #[test]
    fn test_rows_and_filters() {
        let mut r = report(vec![
            row("a", date(2024, 1, 10), Some("Survey")),
            row("b", date(2024, 1, 5), None),
            row("c", date(2024, 1, 3), Some("")),
        ]);
        r.date_range = Some(DateRange::new(date(2024, 1, 5), date(2024, 1, 10)));
        r.member = Some("Alice".to_string());

        let html = render_html(&r);

        assert!(!html.contains(NO_ENTRIES));
        assert!(html.contains("Date Range: Jan 05, 2024 - Jan 10, 2024"));
        assert!(html.contains("Team Member: Alice"));
        assert!(html.contains("<td>2.0h</td>"));
        assert_eq!(html.matches("<td>-</td>").count(), 2);

        let first = html.find("Jan 10, 2024</td>").unwrap();
        let second = html.find("Jan 05, 2024</td>").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_user_text_is_escaped() {
        let html = render_html(&report(vec![row("a", date(2024, 1, 5), Some("<b>dig & fill</b>"))]));

        assert!(html.contains("&lt;b&gt;dig &amp; fill&lt;/b&gt;"));
        assert!(!html.contains("<b>dig"));
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(0.0, "h"), "0.0h");
        assert_eq!(format_quantity(12.34, "km"), "12.3km");
        assert_eq!(format_quantity(2.0, "h"), "2.0h");
    }

    #[test]
    fn test_quarter_hours_round_up() {
        assert_eq!(format_quantity(0.25, "h"), "0.3h");
        assert_eq!(format_quantity(0.75, "h"), "0.8h");
        assert_eq!(format_quantity(1.25, "h"), "1.3h");
        assert_eq!(format_quantity(8.25, "h"), "8.3h");
        assert_eq!(format_quantity(0.15, "km"), "0.1km");
    }

    #[test]
    fn test_format_timestamp_ordinals() {
        let at = |d: u32| date(2024, 3, d).and_hms_opt(0, 5, 0).unwrap();

        assert_eq!(format_timestamp(at(2)), "March 2nd, 2024 at 12:05 AM");
        assert_eq!(format_timestamp(at(3)), "March 3rd, 2024 at 12:05 AM");
        assert_eq!(format_timestamp(at(11)), "March 11th, 2024 at 12:05 AM");
        assert_eq!(format_timestamp(at(22)), "March 22nd, 2024 at 12:05 AM");
    }
}
