use chrono::{DateTime, Utc};

/// Odooへ送信する際の丸め単位（分）。
pub const BILLING_STEP_MINUTES: f64 = 15.0;

/// `start`から`now`までの経過時間を分で返す。
///
/// 時計のずれで`start`が未来になっている場合は0とする。
pub fn elapsed_minutes(start: &DateTime<Utc>, now: &DateTime<Utc>) -> f64 {
    let millis = (*now - *start).num_milliseconds();
    (millis as f64 / 60_000.0).max(0.0)
}

/// 端数の分を切り捨てた上で、`step`の倍数に切り上げる。
///
/// # Examples
///
/// ```ignore
/// assert_eq!(round_duration(37.0, 15.0), 45.0);
/// assert_eq!(round_duration(45.9, 15.0), 45.0);
/// ```
pub fn round_duration(duration: f64, step: f64) -> f64 {
    (duration.floor() / step).ceil() * step
}

/// `+15'`や`+1h`ボタン相当の加算を行う。
///
/// 既に`step`の倍数であれば`step`だけ加算し、そうでなければ次の倍数まで切り上げる。
pub fn add_duration_step(previous: f64, step: f64) -> f64 {
    if previous % step == 0.0 {
        previous + step
    } else {
        (previous / step).ceil() * step
    }
}

pub fn minutes_to_hours(minutes: f64) -> f64 {
    minutes / 60.0
}

/// 時間（小数）を`HH:MM`形式に整形する。
///
/// 例えば`6.25`は`06:15`になる。
pub fn format_float_time(hours: f64) -> String {
    let total_minutes = (hours * 60.0).round().max(0.0) as i64;
    format!("{:02}:{:02}", total_minutes / 60, total_minutes % 60)
}

/// 分を`HH:MM`形式に整形する。秒相当の端数は切り捨てる。
pub fn format_duration(minutes: f64) -> String {
    let total_minutes = minutes.floor().max(0.0) as i64;
    format!("{:02}:{:02}", total_minutes / 60, total_minutes % 60)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::zero(0.0, 0.0)]
    #[case::partial(37.0, 45.0)]
    #[case::aligned(45.0, 45.0)]
    #[case::fraction_dropped(45.9, 45.0)]
    #[case::just_over(46.2, 60.0)]
    #[case::under_one_minute(0.5, 0.0)]
    fn test_round_duration(#[case] input: f64, #[case] expected: f64) {
        assert_eq!(round_duration(input, 15.0), expected);
    }

    #[rstest]
    #[case::from_zero(0.0, 15.0, 15.0)]
    #[case::aligned(15.0, 15.0, 30.0)]
    #[case::ceil_to_next(20.0, 15.0, 30.0)]
    #[case::fractional(14.5, 15.0, 15.0)]
    #[case::hour_step(75.0, 60.0, 120.0)]
    fn test_add_duration_step(#[case] previous: f64, #[case] step: f64, #[case] expected: f64) {
        assert_eq!(add_duration_step(previous, step), expected);
    }

    #[test]
    fn test_elapsed_minutes() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let now = start + Duration::seconds(90);

        assert_eq!(elapsed_minutes(&start, &now), 1.5);
    }

    /// 開始時刻が未来の場合は負の経過時間にならない。
    #[test]
    fn test_elapsed_minutes_future_start() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let start = now + Duration::minutes(5);

        assert_eq!(elapsed_minutes(&start, &now), 0.0);
    }

    #[rstest]
    #[case(6.25, "06:15")]
    #[case(0.0, "00:00")]
    #[case(1.999, "02:00")]
    #[case(12.5, "12:30")]
    fn test_format_float_time(#[case] hours: f64, #[case] expected: &str) {
        assert_eq!(format_float_time(hours), expected);
    }

    #[rstest]
    #[case(0.0, "00:00")]
    #[case(59.9, "00:59")]
    #[case(135.0, "02:15")]
    fn test_format_duration(#[case] minutes: f64, #[case] expected: &str) {
        assert_eq!(format_duration(minutes), expected);
    }
}
