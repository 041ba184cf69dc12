//! Content delivery time windows.

use chrono::NaiveDate;

/// Named time-of-day windows, each admitting at most one content delivery
/// per group per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowName {
    Morning,
    Midday,
    Afternoon,
    Evening,
}

impl WindowName {
    /// Stable string form, doubling as the category window tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowName::Morning => "morning",
            WindowName::Midday => "midday",
            WindowName::Afternoon => "afternoon",
            WindowName::Evening => "evening",
        }
    }

    /// Ledger occasion key for this window on a group-local date.
    pub fn occasion_key(&self, date: NaiveDate) -> String {
        format!("{}-{}", self.as_str(), date)
    }
}

/// A window's bounds within the group-local day.
///
/// Bounds are whole minutes after local midnight; the scheduler draws one
/// random minute in `start_minute..end_minute` per rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentWindow {
    pub name: WindowName,
    /// First eligible minute of the window.
    pub start_minute: u32,
    /// End of the window, exclusive.
    pub end_minute: u32,
}

/// The default four windows: morning 06-08, midday 11-13, afternoon 15-17,
/// evening 19-21, all group-local.
pub fn default_windows() -> Vec<ContentWindow> {
    vec![
        ContentWindow {
            name: WindowName::Morning,
            start_minute: 6 * 60,
            end_minute: 8 * 60,
        },
        ContentWindow {
            name: WindowName::Midday,
            start_minute: 11 * 60,
            end_minute: 13 * 60,
        },
        ContentWindow {
            name: WindowName::Afternoon,
            start_minute: 15 * 60,
            end_minute: 17 * 60,
        },
        ContentWindow {
            name: WindowName::Evening,
            start_minute: 19 * 60,
            end_minute: 21 * 60,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occasion_keys() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 16).unwrap();
        assert_eq!(WindowName::Morning.occasion_key(date), "morning-2026-01-16");
        assert_eq!(WindowName::Evening.occasion_key(date), "evening-2026-01-16");
    }

    #[test]
    fn test_default_windows_are_ordered_and_disjoint() {
        let windows = default_windows();
        assert_eq!(windows.len(), 4);
        for pair in windows.windows(2) {
            assert!(pair[0].end_minute <= pair[1].start_minute);
        }
        for w in &windows {
            assert!(w.start_minute < w.end_minute);
            assert!(w.end_minute <= 24 * 60);
        }
    }
}
