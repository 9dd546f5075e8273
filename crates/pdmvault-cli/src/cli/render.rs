//! Plain-text rendering of facade results.
//!
//! Every function returns a `String` so the output can be tested without a
//! terminal. Colour comes from `colored`, which turns itself off when stdout is
//! not a tty or `NO_COLOR` is set.

use colored::Colorize;
use pdmvault::commands::doctor::DoctorReport;
use pdmvault::commands::history::ItemHistory;
use pdmvault::metadata::DocumentProperties;
use pdmvault::model::{Entry, EntryKind, Listing, LockStatus};
use std::fmt::Write;
use std::path::PathBuf;
use unicode_width::UnicodeWidthStr;

const NAME_MIN_WIDTH: usize = 12;

/// Pads `text` to `width` terminal columns.
fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(fill))
}

fn kind_label(entry: &Entry) -> String {
    match entry.kind {
        EntryKind::Directory => "Dir".to_string(),
        EntryKind::VersionedDocument(variant) => variant.to_string(),
        EntryKind::PlainFile => "File".to_string(),
    }
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

pub fn listing(listing: &Listing) -> String {
    if listing.entries.is_empty() {
        return format!("{}\n", "(empty)".dimmed());
    }
    let name_width = listing
        .entries
        .iter()
        .map(|e| e.name.width() + usize::from(e.is_dir()))
        .max()
        .unwrap_or(0)
        .max(NAME_MIN_WIDTH);

    let mut out = String::new();
    for entry in &listing.entries {
        let number = entry.number.map(|n| n.to_string()).unwrap_or_default();
        let version = entry
            .sequence
            .map(|s| format!("v{}", s))
            .unwrap_or_default();
        let name = if entry.is_dir() {
            pad(&format!("{}/", entry.name), name_width).blue().bold()
        } else {
            pad(&entry.name, name_width).normal()
        };
        let size = match entry.kind {
            EntryKind::Directory => String::new(),
            _ => human_size(entry.size),
        };
        let _ = write!(
            out,
            "{:>5}  {}  {:<8} {:>4} {:>10}",
            number,
            name,
            kind_label(entry),
            version,
            size
        );
        if let Some(holder) = &entry.locked_by {
            let _ = write!(out, "  {}", format!("locked by {}", holder).yellow());
        }
        out.push('\n');
    }
    if !listing.purge_candidates.is_empty() {
        let _ = writeln!(
            out,
            "{}",
            format!(
                "{} superseded file(s) can be purged",
                listing.purge_candidates.len()
            )
            .dimmed()
        );
    }
    out
}

pub fn purge_preview(candidates: &[PathBuf]) -> String {
    if candidates.is_empty() {
        return "Nothing to purge\n".to_string();
    }
    let mut out = String::new();
    for path in candidates {
        let _ = writeln!(out, "  {}", path.display());
    }
    let _ = writeln!(
        out,
        "{} file(s) would be deleted; run again with --yes",
        candidates.len()
    );
    out
}

pub fn lock_status(number: u64, status: &LockStatus) -> String {
    match status {
        LockStatus::Unlocked => format!("Item {} is {}", number, "available".green()),
        LockStatus::LockedBy(holder) => {
            format!("Item {} is {} by {}", number, "checked out".yellow(), holder)
        }
    }
}

pub fn history(history: &ItemHistory) -> String {
    let mut out = String::new();
    let location = if history.dir.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", history.dir)
    };
    let _ = writeln!(
        out,
        "{} {} in {}",
        history.item.number.to_string().bold(),
        history.item.current_name.bold(),
        location
    );
    for rename in &history.item.rename_history {
        let _ = writeln!(
            out,
            "    {}",
            format!("was {} until {}", rename.old_name, rename.date).dimmed()
        );
    }
    for version in history.versions.iter().rev() {
        let purged = if version.purged { " (purged)" } else { "" };
        let _ = writeln!(
            out,
            "  v{:<3} {}  {}  {}{}",
            version.sequence,
            version.created_at,
            version.source_filename,
            version.description,
            purged.dimmed()
        );
        for line in &version.long_description {
            let _ = writeln!(out, "         {}", line);
        }
    }
    out
}

pub fn properties(props: &DocumentProperties) -> String {
    let rows = [
        ("Label", &props.label),
        ("Comment", &props.comment),
        ("Company", &props.company),
        ("Created by", &props.created_by),
        ("Created", &props.creation_date),
        ("Modified by", &props.last_modified_by),
        ("Modified", &props.last_modified_date),
        ("Id", &props.id),
        ("Uid", &props.uid),
    ];
    let mut out = String::new();
    let _ = writeln!(out, "{:<12} {}", "Type", props.variant);
    for (label, value) in rows {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            let _ = writeln!(out, "{:<12} {}", label, value);
        }
    }
    if let Some(thumbnail) = &props.thumbnail {
        let _ = writeln!(out, "{:<12} {}", "Thumbnail", thumbnail);
    }
    if !props.components.is_empty() {
        let _ = writeln!(out, "Components");
        for link in &props.components {
            let _ = writeln!(out, "  {}  {}", link.file, link.name.dimmed());
        }
    }
    out
}

pub fn doctor(report: &DoctorReport) -> String {
    if report.is_clean() {
        return format!("{}\n", "Vault is consistent".green());
    }
    let mut out = String::new();
    for (number, dir) in &report.relocated {
        let _ = writeln!(out, "Relocated item {} to /{}", number, dir);
    }
    for (number, name) in &report.adopted {
        let _ = writeln!(out, "Adopted item {} as {}", number, name);
    }
    for number in &report.dropped_entries {
        let _ = writeln!(out, "Dropped catalog entry {} (container missing)", number);
    }
    for number in &report.dropped_locks {
        let _ = writeln!(out, "Dropped lock on unknown item {}", number);
    }
    if let Some(counter) = report.counter_raised_to {
        let _ = writeln!(out, "Raised the index counter to {}", counter);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdmvault::model::DocumentVariant;

    fn no_color() {
        colored::control::set_override(false);
    }

    #[test]
    fn pads_by_display_width() {
        assert_eq!(pad("ab", 4), "ab  ");
        assert_eq!(pad("日本", 5), "日本 ");
        assert_eq!(pad("toolong", 3), "toolong");
    }

    #[test]
    fn sizes() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KiB");
    }

    #[test]
    fn listing_rows() {
        no_color();
        let rows = Listing {
            entries: vec![
                Entry::directory("parts"),
                Entry {
                    name: "frame.FCStd".to_string(),
                    kind: EntryKind::VersionedDocument(DocumentVariant::Assembly4),
                    size: 10,
                    number: Some(3),
                    sequence: Some(2),
                    locked_by: Some("bob".to_string()),
                },
            ],
            purge_candidates: vec![PathBuf::from("3/VER01/frame.FCStd")],
        };
        let out = listing(&rows);
        assert!(out.contains("parts/"));
        assert!(out.contains("A4-Assy"));
        assert!(out.contains("v2"));
        assert!(out.contains("locked by bob"));
        assert!(out.contains("1 superseded file(s)"));
    }

    #[test]
    fn empty_listing() {
        no_color();
        assert_eq!(listing(&Listing::default()), "(empty)\n");
    }

    #[test]
    fn clean_doctor_report() {
        no_color();
        assert_eq!(doctor(&DoctorReport::default()), "Vault is consistent\n");
    }

    #[test]
    fn doctor_lists_relocations() {
        no_color();
        let report = DoctorReport {
            relocated: vec![(4, "archive".to_string())],
            ..DoctorReport::default()
        };
        assert_eq!(doctor(&report), "Relocated item 4 to /archive\n");
    }
}
