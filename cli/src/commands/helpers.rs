use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::io::{self, BufRead, Write};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use vigil_core::models::{Prayer, ProgressRecord, Reflection, TOTAL_DAYS};

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Ask a yes/no question on stderr. Anything but `y`/`yes` is a no.
pub(crate) fn confirm(question: &str) -> Result<bool> {
    eprint!("{question} [y/N]: ");
    io::stderr().flush()?;
    let stdin = io::stdin();
    let line = stdin.lock().lines().next().context("No input")??;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

pub(crate) fn print_progress(record: &ProgressRecord) {
    if record.is_completed() {
        println!("Program completed! Run `vigil restart` to begin again next Sunday.");
    } else {
        println!(
            "Day {} of {TOTAL_DAYS} (week {})",
            record.current_day,
            record.current_week()
        );
    }
    println!("  Started:   {}", record.start_date.format("%A, %Y-%m-%d"));
    let favorites = record.sorted_favorites();
    if !favorites.is_empty() {
        let list: Vec<String> = favorites.iter().map(u32::to_string).collect();
        println!("  Favorites: {}", list.join(", "));
    }
}

pub(crate) fn print_reflection(reflection: &Reflection, favorite: bool) {
    let star = if favorite { " ★" } else { "" };
    println!(
        "=== Day {} · Week {} ==={star}\n",
        reflection.day, reflection.week
    );
    println!("{}", reflection.title);
    if !reflection.quote.is_empty() {
        println!("\n  \"{}\"", reflection.quote);
    }
    if !reflection.reflection.is_empty() {
        println!("\n{}", reflection.reflection);
    }
}

pub(crate) fn print_prayer(prayer: &Prayer) {
    println!("=== {} ===\n", prayer.title);
    for paragraph in prayer.paragraphs() {
        for line in paragraph.lines() {
            println!("  {line}");
        }
        println!();
    }
}

pub(crate) fn print_reflection_table(
    reflections: &[Reflection],
    current_day: Option<u32>,
    favorites: &[u32],
) {
    #[derive(Tabled)]
    struct ReflectionRow {
        #[tabled(rename = "Day")]
        day: u32,
        #[tabled(rename = "Week")]
        week: u32,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "")]
        marks: String,
    }

    let rows: Vec<ReflectionRow> = reflections
        .iter()
        .map(|r| {
            let mut marks = String::new();
            if current_day == Some(r.day) {
                marks.push_str("today");
            }
            if favorites.contains(&r.day) {
                if !marks.is_empty() {
                    marks.push(' ');
                }
                marks.push('★');
            }
            ReflectionRow {
                day: r.day,
                week: r.week,
                title: truncate(&r.title, 50),
                marks,
            }
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(0..2)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}
