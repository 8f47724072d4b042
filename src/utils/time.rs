use chrono::Duration;

/// Formats a remaining cooldown as `"HHh MMm SSs"` for the status surface.
/// Negative durations clamp to zero.
pub fn format_remaining(remaining: Duration) -> String {
    let total_seconds = remaining.num_seconds().max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{}h {}m {}s", hours, minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_remaining_splits_units() {
        let remaining = Duration::hours(23) + Duration::minutes(59) + Duration::seconds(1);
        assert_eq!(format_remaining(remaining), "23h 59m 1s");
    }

    #[test]
    fn format_remaining_clamps_negative_to_zero() {
        assert_eq!(format_remaining(Duration::seconds(-5)), "0h 0m 0s");
    }

    #[test]
    fn format_remaining_handles_exact_minute() {
        assert_eq!(format_remaining(Duration::seconds(60)), "0h 1m 0s");
    }
}
