//! Human-readable formatting for amounts, rates and durations.

/// `1234.5` -> `"1.23K"`. Amounts below a thousand are floored.
pub fn format_number(value: f64) -> String {
    const SUFFIXES: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];

    if value.is_infinite() && value > 0.0 {
        return "∞".to_string();
    }
    if value.is_nan() {
        return "0".to_string();
    }
    for (scale, suffix) in SUFFIXES {
        if value >= scale {
            return format!("{:.2}{suffix}", value / scale);
        }
    }
    format!("{}", value.floor())
}

/// Per-second rate, e.g. `"0.50/s"`, `"0.005/s"`, `"1.20K/s"`.
pub fn format_rate(rate: f64) -> String {
    if rate == 0.0 {
        return "0.0/s".to_string();
    }
    let magnitude = rate.abs();
    if magnitude < 0.01 {
        format!("{rate:.3}/s")
    } else if magnitude < 10.0 {
        format!("{rate:.2}/s")
    } else {
        format!("{}/s", format_number(rate))
    }
}

/// Coarse two-unit duration: `"1d 2h"`, `"3h 5m"`, `"4m 10s"`, `"12s"`.
pub fn format_duration(millis: u64) -> String {
    let seconds = millis / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{days}d {}h", hours % 24)
    } else if hours > 0 {
        format!("{hours}h {}m", minutes % 60)
    } else if minutes > 0 {
        format!("{minutes}m {}s", seconds % 60)
    } else {
        format!("{seconds}s")
    }
}
