use chrono::{DateTime, Utc};

/// Formats the time between two timestamps, e.g. `"0.148s"` or `"2m 03.100s"`.
pub fn format_duration(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> String {
    let millis = (ended_at - started_at).num_milliseconds().max(0);
    let minutes = millis / 60_000;
    let seconds = (millis % 60_000) as f64 / 1000.0;

    if minutes > 0 {
        format!("{}m {:06.3}s", minutes, seconds)
    } else {
        format!("{:.3}s", seconds)
    }
}
