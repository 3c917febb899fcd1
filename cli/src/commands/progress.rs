use anyhow::Result;

use vigil_core::ProgressTracker;
use vigil_core::content::ContentStore;
use vigil_core::db::Database;

use super::helpers::{confirm, parse_date, print_progress, print_reflection_table};

pub(crate) fn cmd_status(tracker: &ProgressTracker<Database>, json: bool) -> Result<()> {
    let status = tracker.status();

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    match &status.progress {
        Some(record) => print_progress(record),
        None if status.is_sunday => {
            println!("No program started. Today is Sunday: run `vigil start` to begin.");
        }
        None => {
            let days = status.days_until_sunday;
            let unit = if days == 1 { "day" } else { "days" };
            println!(
                "No program started. The program begins on a Sunday ({days} {unit} from now); \
                 use `vigil start --date <sunday>` to pick one."
            );
        }
    }
    Ok(())
}

pub(crate) fn cmd_start(
    tracker: &ProgressTracker<Database>,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = date.map(|d| parse_date(Some(d))).transpose()?;
    let record = tracker.start(date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!(
            "Program started on {}.",
            record.start_date.format("%A, %Y-%m-%d")
        );
        print_progress(&record);
    }
    Ok(())
}

pub(crate) fn cmd_set_day(tracker: &ProgressTracker<Database>, day: i64, json: bool) -> Result<()> {
    let record = tracker.set_manual_day(day)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_progress(&record);
    }
    Ok(())
}

pub(crate) fn cmd_set_start(
    tracker: &ProgressTracker<Database>,
    date: String,
    json: bool,
) -> Result<()> {
    let date = parse_date(Some(date))?;
    let record = tracker.set_start_date(date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_progress(&record);
    }
    Ok(())
}

pub(crate) fn cmd_favorite(tracker: &ProgressTracker<Database>, day: i64, json: bool) -> Result<()> {
    let record = tracker.toggle_favorite(day)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else if record.favorites.iter().any(|&d| i64::from(d) == day) {
        println!("Added day {day} to favorites");
    } else {
        println!("Removed day {day} from favorites");
    }
    Ok(())
}

pub(crate) fn cmd_favorites(
    tracker: &ProgressTracker<Database>,
    content: &ContentStore,
    json: bool,
) -> Result<()> {
    let favorites = tracker.favorites();

    if json {
        println!("{}", serde_json::json!({ "favorites": favorites }));
        return Ok(());
    }

    if favorites.is_empty() {
        eprintln!("No favorites yet. Use `vigil favorite <day>` to mark a day.");
        return Ok(());
    }

    let reflections: Vec<_> = content
        .all()
        .into_iter()
        .filter(|r| favorites.contains(&r.day))
        .collect();
    if reflections.len() < favorites.len() {
        let list: Vec<String> = favorites.iter().map(u32::to_string).collect();
        println!("Favorite days: {}", list.join(", "));
    }
    if !reflections.is_empty() {
        let current = tracker.read().map(|r| r.current_day);
        print_reflection_table(&reflections, current, &favorites);
    }
    Ok(())
}

pub(crate) fn cmd_reset(tracker: &ProgressTracker<Database>, yes: bool, json: bool) -> Result<()> {
    if !yes && !confirm("Delete all progress and favorites?")? {
        eprintln!("Aborted.");
        return Ok(());
    }
    tracker.reset()?;

    if json {
        println!("{}", serde_json::json!({ "reset": true }));
    } else {
        println!("Progress deleted.");
    }
    Ok(())
}

pub(crate) fn cmd_restart(tracker: &ProgressTracker<Database>, json: bool) -> Result<()> {
    let record = tracker.restart()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!(
            "Program restarts on {}. Favorites cleared.",
            record.start_date.format("%A, %Y-%m-%d")
        );
    }
    Ok(())
}
