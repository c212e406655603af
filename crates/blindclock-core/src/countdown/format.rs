pub const SECS_PER_HOUR: u32 = 60 * 60;

/// Render a remaining duration as `MM:SS`, or `HH:MM:SS` when hours are
/// shown and non-zero.
///
/// Hours wrap at 24 and minutes at 60, so `3661` renders as `01:01` when
/// hours are hidden.
pub fn format_remaining(value: u32, show_hours: bool) -> String {
    let hours = (value / SECS_PER_HOUR) % 24;
    let minutes = (value / 60) % 60;
    let seconds = value % 60;

    if show_hours && hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_components_are_padded() {
        assert_eq!(format_remaining(0, false), "00:00");
        assert_eq!(format_remaining(59, false), "00:59");
        assert_eq!(format_remaining(60, false), "01:00");
        assert_eq!(format_remaining(600, false), "10:00");
    }

    #[test]
    fn hidden_hours_wrap_minutes() {
        assert_eq!(format_remaining(3661, false), "01:01");
        assert_eq!(format_remaining(3600, false), "00:00");
    }

    #[test]
    fn shown_hours_are_prepended() {
        assert_eq!(format_remaining(3661, true), "01:01:01");
        assert_eq!(format_remaining(7200, true), "02:00:00");
    }

    #[test]
    fn shown_hours_skip_zero_hour() {
        assert_eq!(format_remaining(3599, true), "59:59");
        assert_eq!(format_remaining(0, true), "00:00");
    }

    #[test]
    fn hours_wrap_at_a_day() {
        assert_eq!(format_remaining(24 * SECS_PER_HOUR + 5, true), "00:05");
    }

    proptest! {
        #[test]
        fn hidden_hours_is_always_mm_ss(v in 0u32..86_400) {
            let s = format_remaining(v, false);
            prop_assert_eq!(s.len(), 5);
            prop_assert_eq!(&s[2..3], ":");
            let minutes: u32 = s[..2].parse().unwrap();
            let seconds: u32 = s[3..].parse().unwrap();
            prop_assert_eq!(minutes, (v / 60) % 60);
            prop_assert_eq!(seconds, v % 60);
        }

        #[test]
        fn shown_hours_round_trips_below_a_day(v in 0u32..86_400) {
            let s = format_remaining(v, true);
            let total = s
                .split(':')
                .map(|part| part.parse::<u32>().unwrap())
                .fold(0, |acc, part| acc * 60 + part);
            prop_assert_eq!(total, v);
        }
    }
}
