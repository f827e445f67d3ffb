//! Friday-anchored weekly checkpoint grid.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Every Friday from `start` (inclusive, rolled forward) through `end` (inclusive).
///
/// Grid dates are calendar dates; a checkpoint that is not a trading day is
/// still part of the grid and keeps its index.
pub fn weekly_checkpoints(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut current = next_friday_on_or_after(start);
    while current <= end {
        dates.push(current);
        current += Duration::days(7);
    }
    dates
}

fn next_friday_on_or_after(date: NaiveDate) -> NaiveDate {
    let offset = (Weekday::Fri.num_days_from_monday() + 7
        - date.weekday().num_days_from_monday())
        % 7;
    date + Duration::days(offset as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_grid_rolls_forward_to_friday() {
        // 2020-01-01 is a Wednesday
        let grid = weekly_checkpoints(date(2020, 1, 1), date(2020, 1, 31));
        assert_eq!(
            grid,
            vec![
                date(2020, 1, 3),
                date(2020, 1, 10),
                date(2020, 1, 17),
                date(2020, 1, 24),
                date(2020, 1, 31),
            ]
        );
    }

    #[test]
    fn test_grid_includes_friday_start() {
        let grid = weekly_checkpoints(date(2020, 1, 3), date(2020, 1, 9));
        assert_eq!(grid, vec![date(2020, 1, 3)]);
    }

    #[test]
    fn test_empty_when_no_friday_in_range() {
        assert!(weekly_checkpoints(date(2020, 1, 4), date(2020, 1, 9)).is_empty());
        assert!(weekly_checkpoints(date(2020, 2, 1), date(2020, 1, 1)).is_empty());
    }

    #[test]
    fn test_all_dates_are_fridays() {
        let grid = weekly_checkpoints(date(2019, 6, 15), date(2021, 6, 15));
        assert!(grid.iter().all(|d| d.weekday() == Weekday::Fri));
        assert!(grid.windows(2).all(|w| (w[1] - w[0]).num_days() == 7));
    }
}
