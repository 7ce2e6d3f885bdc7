use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};

/// Longest stretch of skipped local time searched for when midnight does not exist.
const MAX_GAP_STEPS: i64 = 16;
const GAP_STEP: Duration = Duration::seconds(15 * 60);

/// Returns start of the next day.
pub fn next_day_start<Tz: TimeZone>(date: DateTime<Tz>) -> DateTime<Tz> {
    let tz = date.timezone();
    let next = date.date_naive().succ_opt().unwrap_or(NaiveDate::MAX);
    start_of_day(&tz, next).with_timezone(&tz)
}

/// Returns the first instant of `date` in `tz`. Some zones skip midnight on DST transitions, in
/// which case the first existing local time after it is used. When midnight happens twice the
/// earlier one starts the day.
pub fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..=MAX_GAP_STEPS)
        .find_map(
            |step| match tz.from_local_datetime(&(midnight + GAP_STEP * step as i32)) {
                LocalResult::Ambiguous(a, b) => Some(a.to_utc().min(b.to_utc())),
                other => other.single().map(|v| v.to_utc()),
            },
        )
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

pub fn format_duration(v: Duration) -> String {
    if v.num_hours() > 0 {
        format!(
            "{}h{}m{}s",
            v.num_hours(),
            v.num_minutes() % 60,
            v.num_seconds() % 60
        )
    } else if v.num_minutes() > 0 {
        format!("{}m{}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}

pub fn as_hours(v: Duration) -> f64 {
    v.num_milliseconds() as f64 / 3_600_000.
}


#[cfg(test)]
mod tests {
    use chrono::{Duration, FixedOffset, NaiveDate, TimeZone, Utc};

    use super::{format_duration, next_day_start, start_of_day, zones::MidnightFallBack};

    #[test]
    fn start_of_day_respects_offset() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let kyiv = FixedOffset::east_opt(2 * 3600).unwrap();

        assert_eq!(
            start_of_day(&Utc, date),
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            start_of_day(&kyiv, date),
            Utc.with_ymd_and_hms(2024, 1, 31, 22, 0, 0).unwrap()
        );
    }

    #[test]
    fn repeated_midnight_starts_at_first_occurrence() {
        let date = NaiveDate::from_ymd_opt(2024, 11, 3).unwrap();
        assert_eq!(
            start_of_day(&MidnightFallBack, date),
            Utc.with_ymd_and_hms(2024, 11, 3, 4, 0, 0).unwrap()
        );
        assert_eq!(
            start_of_day(&MidnightFallBack, date.succ_opt().unwrap()),
            Utc.with_ymd_and_hms(2024, 11, 4, 5, 0, 0).unwrap()
        );
    }

    #[test]
    fn next_day_in_offset() {
        let kyiv = FixedOffset::east_opt(2 * 3600).unwrap();
        let evening = kyiv.with_ymd_and_hms(2024, 2, 29, 23, 30, 0).unwrap();
        assert_eq!(
            next_day_start(evening),
            kyiv.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn format_duration_units() {
        assert_eq!(format_duration(Duration::seconds(42)), "42s");
        assert_eq!(format_duration(Duration::seconds(125)), "2m5s");
        assert_eq!(format_duration(Duration::seconds(3 * 3600 + 61)), "3h1m1s");
    }
}
