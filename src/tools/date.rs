//! Current date tool.

use chrono::{Local, NaiveDate};

/// Display format for dates, e.g. `Monday, October 19, 2026`.
pub const DATE_FORMAT: &str = "%A, %B %d, %Y";

/// Today's local date. The input is ignored.
pub fn current_date(_input: &str) -> String {
    format_date(Local::now().date_naive())
}

/// Format a date the way the date tool reports it.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
