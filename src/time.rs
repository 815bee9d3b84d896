use chrono::{Datelike, Local, NaiveDate};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}

/// `YYYY-MM` for an ISO date.
pub fn month_key(date: &str) -> Option<String> {
    parse_date(date).map(|d| d.format("%Y-%m").to_string())
}

/// ISO week label, e.g. `2024-W05`. Weeks near new year belong to the ISO year.
pub fn week_key(date: &str) -> Option<String> {
    let week = parse_date(date)?.iso_week();
    Some(format!("{}-W{:02}", week.year(), week.week()))
}

/// Today's local date as `YYYY-MM-DD`.
pub fn today() -> String {
    Local::now().naive_local().date().format(DATE_FORMAT).to_string()
}

/// `Jan 5, 2024`. Unparseable dates come back unchanged.
pub fn display_date(date: &str) -> String {
    parse_date(date).map_or_else(|| date.to_string(), |d| d.format("%b %-d, %Y").to_string())
}
