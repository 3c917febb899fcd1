use anyhow::{Result, bail};

use vigil_core::ProgressTracker;
use vigil_core::content::ContentStore;
use vigil_core::db::Database;

use super::helpers::{print_prayer, print_reflection, print_reflection_table};

/// Show one day's reflection, defaulting to the current program day.
pub(crate) fn cmd_read(
    tracker: &ProgressTracker<Database>,
    content: &ContentStore,
    day: Option<i64>,
    json: bool,
) -> Result<()> {
    let progress = tracker.read();
    let day = match (day, &progress) {
        (Some(day), _) => day,
        (None, Some(record)) if record.is_completed() => {
            bail!("Program completed. Pass a day number or run `vigil restart`.")
        }
        (None, Some(record)) => i64::from(record.current_day),
        (None, None) => bail!("No program started. Run `vigil start` or pass a day number."),
    };

    let reflection = content.reflection(day)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reflection)?);
    } else {
        let favorite = progress.is_some_and(|r| r.is_favorite(reflection.day));
        print_reflection(&reflection, favorite);
    }
    Ok(())
}

/// List a week's reflections, or the whole program when `week` is `None`.
pub(crate) fn cmd_week(
    tracker: &ProgressTracker<Database>,
    content: &ContentStore,
    week: Option<i64>,
    json: bool,
) -> Result<()> {
    let reflections = match week {
        Some(week) => content.week(week)?,
        None => content.all(),
    };

    if json {
        match week {
            Some(week) => println!(
                "{}",
                serde_json::to_string_pretty(
                    &serde_json::json!({ "week": week, "reflections": reflections })
                )?
            ),
            None => println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({ "reflections": reflections }))?
            ),
        }
        return Ok(());
    }

    if reflections.is_empty() {
        eprintln!("No reflections available. Check the content path in your config.");
        return Ok(());
    }

    let progress = tracker.read();
    let current = progress.as_ref().map(|r| r.current_day);
    let favorites = progress.map(|r| r.favorites).unwrap_or_default();
    print_reflection_table(&reflections, current, &favorites);
    Ok(())
}

pub(crate) fn cmd_prayers(content: &ContentStore, json: bool) -> Result<()> {
    let prayers = content.prayers();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "prayers": prayers }))?
        );
        return Ok(());
    }

    if prayers.is_empty() {
        eprintln!(
            "No prayers available. Add a prayers.json file or set prayers_path in your config."
        );
        return Ok(());
    }

    for prayer in prayers {
        print_prayer(prayer);
    }
    Ok(())
}
