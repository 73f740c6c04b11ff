//! Plain-text rendering of the request list and form feedback.

use std::io::{self, BufRead, Write};

use chrono::Local;
use client_core::{FormState, ListState, RequestRow};
use shared::domain::RequestId;

pub const NO_DUPLICATES: &str = "No duplicate titles found";
pub const NO_MATCHES_HINT: &str = "Try adjusting your search terms";
pub const EMPTY_HINT: &str = "Get started by adding your first request";
pub const NO_IMAGE: &str = "No Image";
pub const RECENT_MARKER: &str = "New";

pub fn render_list(out: &mut impl Write, list: &ListState, rows: &[RequestRow]) -> io::Result<()> {
    let pagination = list.pagination();
    writeln!(out, "Total requests: {}", pagination.total_items)?;
    render_duplicates(out, list)?;
    writeln!(out)?;

    if rows.is_empty() {
        writeln!(out, "No requests found")?;
        let hint = if list.applied_query().search.trim().is_empty() {
            EMPTY_HINT
        } else {
            NO_MATCHES_HINT
        };
        writeln!(out, "{hint}")?;
        return Ok(());
    }

    render_rows(out, rows)?;
    writeln!(out)?;
    writeln!(
        out,
        "Page {} of {} (sorted by title, {})",
        pagination.current_page,
        pagination.total_pages,
        list.applied_query().order
    )
}

fn render_duplicates(out: &mut impl Write, list: &ListState) -> io::Result<()> {
    let duplicates = list.duplicates();
    if duplicates.is_empty() {
        return writeln!(out, "{NO_DUPLICATES}");
    }
    let chips: Vec<String> = duplicates
        .iter()
        .map(|(title, count)| format!("{title} ({count})"))
        .collect();
    writeln!(out, "Duplicate titles: {}", chips.join(", "))
}

fn render_rows(out: &mut impl Write, rows: &[RequestRow]) -> io::Result<()> {
    writeln!(
        out,
        "{:<26} {:<20} {:<12} {:<24} {:<17} {}",
        "ID", "NAME", "PHONE", "TITLE", "CREATED", "IMAGE"
    )?;
    for row in rows {
        let created = row
            .record
            .timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M");
        let title = if row.recent {
            format!("{} [{RECENT_MARKER}]", row.record.title)
        } else {
            row.record.title.clone()
        };
        writeln!(
            out,
            "{:<26} {:<20} {:<12} {:<24} {:<17} {}",
            row.record.id,
            row.record.name,
            row.record.phone,
            title,
            created.to_string(),
            row.image_url.as_deref().unwrap_or(NO_IMAGE)
        )?;
    }
    Ok(())
}

pub fn render_form_feedback(out: &mut impl Write, form: &FormState) -> io::Result<()> {
    let errors = form.errors();
    for (field, message) in [
        ("name", &errors.name),
        ("phone", &errors.phone),
        ("title", &errors.title),
    ] {
        if let Some(message) = message {
            writeln!(out, "{field}: {message}")?;
        }
    }
    if let Some(banner) = form.banner() {
        writeln!(out, "{banner}")?;
    }
    Ok(())
}

/// Anything other than `y`/`yes` declines.
pub fn confirm_delete(
    input: &mut impl BufRead,
    out: &mut impl Write,
    id: &RequestId,
) -> io::Result<bool> {
    write!(out, "Delete request {id}? This action cannot be undone. [y/N] ")?;
    out.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
