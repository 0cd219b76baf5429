//! Terminal rendering for the `stats` command. Purely presentational; the
//! numbers come out of the engine's snapshot untouched.

use ansi_term::Colour;

use crate::{engine::query::StatsSnapshot, utils::time::date_key};

const BAR_WIDTH: usize = 30;

pub fn render_snapshot(snapshot: &StatsSnapshot) -> String {
    let mut out = String::new();

    let since = snapshot
        .since
        .map(|date| format!(" since {}", date_key(date)))
        .unwrap_or_default();
    out.push_str(&format!(
        "{}  {}{since}\n\n",
        Colour::Cyan.bold().paint("Total visits:"),
        snapshot.total
    ));

    out.push_str(&format!("{}\n", Colour::Cyan.bold().paint("Last 7 days")));
    let max = snapshot
        .series
        .iter()
        .map(|point| point.count)
        .max()
        .unwrap_or(0);
    for point in &snapshot.series {
        out.push_str(&format!(
            "{}\t{}\t{}\n",
            point.label,
            point.count,
            bar(point.count, max)
        ));
    }

    out.push_str(&format!(
        "\n{}\n",
        Colour::Cyan.bold().paint("Time of day")
    ));
    let time = &snapshot.time;
    let time_rows = [
        ("morning (06-12)", time.morning),
        ("afternoon (12-18)", time.afternoon),
        ("evening (18-24)", time.evening),
        ("night (00-06)", time.night),
    ];
    let time_max = time_rows.iter().map(|(_, count)| *count).max().unwrap_or(0);
    for (label, count) in time_rows {
        out.push_str(&format!("{label}\t{count}\t{}\n", bar(count, time_max)));
    }

    out.push_str(&format!("\n{}\n", Colour::Cyan.bold().paint("Devices")));
    let devices = &snapshot.devices;
    let device_rows = [
        ("pc", devices.pc),
        ("mobile", devices.mobile),
        ("tablet", devices.tablet),
        ("other", devices.other),
    ];
    let device_max = device_rows
        .iter()
        .map(|(_, count)| *count)
        .max()
        .unwrap_or(0);
    for (label, count) in device_rows {
        out.push_str(&format!("{label}\t{count}\t{}\n", bar(count, device_max)));
    }

    out
}

/// Scales `count` against the row maximum into a fixed-width bar. A nonzero
/// count always shows at least one tick.
fn bar(count: u64, max: u64) -> String {
    if count == 0 || max == 0 {
        return String::new();
    }
    let ticks = ((count as f64 / max as f64) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(ticks.max(1))
}
