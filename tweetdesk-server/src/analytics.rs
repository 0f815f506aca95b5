use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use tweetdesk_types::{TimeWindow, UserTweetStats};

/// Whole days elapsed between `ts` and `now`, rounded toward negative infinity.
pub fn age_in_days(now: DateTime<Utc>, ts: DateTime<Utc>) -> i64 {
    let seconds = (now - ts).num_seconds();
    seconds.div_euclid(86_400)
}

/// A row belongs to a window when its age in whole days does not exceed the
/// window length.
pub fn in_window(window: TimeWindow, age_days: i64) -> bool {
    age_days <= window.days()
}

/// Oldest instant whose age still falls inside `window`.
pub fn window_start(now: DateTime<Utc>, window: TimeWindow) -> DateTime<Utc> {
    now - Duration::days(window.days() + 1) + Duration::seconds(1)
}

/// Tweet counts keyed by window.
pub type WindowCounts = BTreeMap<TimeWindow, u32>;

pub fn empty_counts() -> WindowCounts {
    TimeWindow::ALL.into_iter().map(|w| (w, 0)).collect()
}

/// Count tweets per author in every window.
///
/// Authors with nothing inside the longest window are left out. The result is
/// sorted by the 90 day count, highest first, then by screen name.
pub fn count_by_screen_name<I>(now: DateTime<Utc>, rows: I) -> Vec<UserTweetStats>
where
    I: IntoIterator<Item = (String, DateTime<Utc>)>,
{
    let mut per_user: HashMap<String, WindowCounts> = HashMap::new();

    for (screen_name, created_at) in rows {
        let age = age_in_days(now, created_at);
        if !in_window(TimeWindow::longest(), age) {
            continue;
        }
        let counts = per_user.entry(screen_name).or_insert_with(empty_counts);
        for window in TimeWindow::ALL {
            if in_window(window, age) {
                *counts.entry(window).or_insert(0) += 1;
            }
        }
    }

    let mut stats: Vec<UserTweetStats> = per_user
        .into_iter()
        .map(|(screen_name, tweet_counts)| UserTweetStats {
            screen_name,
            tweet_counts,
        })
        .collect();

    let longest = |s: &UserTweetStats| s.tweet_counts.get(&TimeWindow::longest()).copied().unwrap_or(0);
    stats.sort_by(|a, b| longest(b).cmp(&longest(a)).then_with(|| a.screen_name.cmp(&b.screen_name)));
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        crate::timestamps::parse_storage("2024-06-30 12:00:00").unwrap()
    }

    #[test]
    fn test_age_in_days_floors() {
        let now = now();
        assert_eq!(age_in_days(now, now - Duration::hours(23)), 0);
        assert_eq!(age_in_days(now, now - Duration::hours(25)), 1);
        assert_eq!(age_in_days(now, now + Duration::hours(1)), -1);
    }

    #[test]
    fn test_window_start_is_inclusive_boundary() {
        let now = now();
        for window in TimeWindow::ALL {
            let start = window_start(now, window);
            assert!(in_window(window, age_in_days(now, start)));
            assert!(!in_window(window, age_in_days(now, start - Duration::seconds(1))));
        }
    }

    #[test]
    fn test_count_by_screen_name() {
        let now = now();
        let rows = vec![
            ("alice".to_string(), now - Duration::days(1)),
            ("alice".to_string(), now - Duration::days(10)),
            ("alice".to_string(), now - Duration::days(60)),
            ("bob".to_string(), now - Duration::days(2)),
            ("carol".to_string(), now - Duration::days(120)),
        ];

        let stats = count_by_screen_name(now, rows);
        assert_eq!(stats.len(), 2);

        assert_eq!(stats[0].screen_name, "alice");
        let alice = &stats[0].tweet_counts;
        assert_eq!(alice[&TimeWindow::ThreeDays], 1);
        assert_eq!(alice[&TimeWindow::SevenDays], 1);
        assert_eq!(alice[&TimeWindow::FifteenDays], 2);
        assert_eq!(alice[&TimeWindow::ThirtyDays], 2);
        assert_eq!(alice[&TimeWindow::NinetyDays], 3);

        assert_eq!(stats[1].screen_name, "bob");
        assert_eq!(stats[1].tweet_counts[&TimeWindow::ThreeDays], 1);
    }

    #[test]
    fn test_ties_sort_by_name() {
        let now = now();
        let rows = vec![
            ("zed".to_string(), now - Duration::days(1)),
            ("amy".to_string(), now - Duration::days(1)),
        ];
        let names: Vec<String> = count_by_screen_name(now, rows)
            .into_iter()
            .map(|s| s.screen_name)
            .collect();
        assert_eq!(names, vec!["amy", "zed"]);
    }

    proptest! {
        #[test]
        fn prop_windows_partition_by_age(ages in proptest::collection::vec(0i64..200 * 86_400, 0..60)) {
            let now = now();
            let rows: Vec<(String, DateTime<Utc>)> = ages
                .iter()
                .map(|secs| ("user".to_string(), now - Duration::seconds(*secs)))
                .collect();

            let stats = count_by_screen_name(now, rows);
            let counts = stats.first().map(|s| s.tweet_counts.clone()).unwrap_or_else(empty_counts);

            for window in TimeWindow::ALL {
                let expected = ages
                    .iter()
                    .filter(|secs| *secs / 86_400 <= window.days())
                    .count() as u32;
                prop_assert_eq!(counts[&window], expected);
            }

            let ordered: Vec<u32> = TimeWindow::ALL.iter().map(|w| counts[w]).collect();
            prop_assert!(ordered.windows(2).all(|pair| pair[0] <= pair[1]));
        }
    }
}
