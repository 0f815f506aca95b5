use serde::{Deserialize, Serialize};

/// Rolling look-back windows used by the analytics endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimeWindow {
    #[serde(rename = "3d")]
    ThreeDays,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "15d")]
    FifteenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
    #[serde(rename = "90d")]
    NinetyDays,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 5] = [
        TimeWindow::ThreeDays,
        TimeWindow::SevenDays,
        TimeWindow::FifteenDays,
        TimeWindow::ThirtyDays,
        TimeWindow::NinetyDays,
    ];

    pub fn days(&self) -> i64 {
        match self {
            TimeWindow::ThreeDays => 3,
            TimeWindow::SevenDays => 7,
            TimeWindow::FifteenDays => 15,
            TimeWindow::ThirtyDays => 30,
            TimeWindow::NinetyDays => 90,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            TimeWindow::ThreeDays => "3d",
            TimeWindow::SevenDays => "7d",
            TimeWindow::FifteenDays => "15d",
            TimeWindow::ThirtyDays => "30d",
            TimeWindow::NinetyDays => "90d",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.key() == s)
    }

    /// The widest window; rows older than this are never counted.
    pub fn longest() -> Self {
        TimeWindow::NinetyDays
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_round_trip_through_parse() {
        for window in TimeWindow::ALL {
            assert_eq!(TimeWindow::parse(window.key()), Some(window));
        }
        assert_eq!(TimeWindow::parse("1d"), None);
    }

    #[test]
    fn test_windows_are_ordered_by_length() {
        let days: Vec<i64> = TimeWindow::ALL.iter().map(|w| w.days()).collect();
        assert_eq!(days, vec![3, 7, 15, 30, 90]);
        assert_eq!(TimeWindow::longest().days(), 90);
    }

    #[test]
    fn test_serializes_as_short_key() {
        let json = serde_json::to_string(&TimeWindow::FifteenDays).unwrap();
        assert_eq!(json, "\"15d\"");
    }
}
