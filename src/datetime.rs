use chrono::{DateTime, Utc};

/// タイマーの計測に使う現在のUTC時刻を取得する。
#[cfg(not(test))]
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// テスト用の時計。スレッドごとに時刻を止めたり進めたりできる。
///
/// タイマーの経過時間はすべて`now()`から計算するため、テストでは
/// `freeze_at`で開始時刻を決め、`advance_minutes`で時間を進める。
#[cfg(test)]
pub mod mock_clock {
    use std::cell::Cell;

    use chrono::Duration;

    use super::{DateTime, Utc};

    thread_local! {
        static FROZEN_AT: Cell<Option<DateTime<Utc>>> = Cell::new(None);
    }

    /// 止めた時刻を返す。止めていなければ実時刻を返す。
    pub fn now() -> DateTime<Utc> {
        FROZEN_AT.with(|cell| cell.get()).unwrap_or_else(Utc::now)
    }

    pub fn freeze_at(at: DateTime<Utc>) {
        FROZEN_AT.with(|cell| cell.set(Some(at)));
    }

    /// 時計を`minutes`分進める。止めていなければ実時刻から止める。
    pub fn advance_minutes(minutes: i64) {
        freeze_at(now() + Duration::minutes(minutes));
    }

    pub fn unfreeze() {
        FROZEN_AT.with(|cell| cell.set(None));
    }
}

#[cfg(test)]
pub use mock_clock::now;

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::mock_clock;

    /// 止めていなければ実時刻に近い値を返す。
    #[test]
    fn test_unfrozen_follows_wall_clock() {
        mock_clock::unfreeze();

        let drift = Utc::now() - mock_clock::now();

        assert!(drift.num_seconds().abs() <= 1);
    }

    #[test]
    fn test_advance_minutes() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        mock_clock::freeze_at(start);

        mock_clock::advance_minutes(90);
        mock_clock::advance_minutes(15);

        assert_eq!(mock_clock::now(), start + Duration::minutes(105));
    }
}
