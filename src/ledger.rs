use log::debug;
use thiserror::Error;

use crate::datetime::now;
use crate::duration::add_duration_step;
use crate::timer::{ResourceKey, Timer};

#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("No timer for {0}")]
    TimerNotFound(ResourceKey),
    #[error("Duration must be a non-negative number of minutes, got {0}")]
    InvalidDuration(f64),
    #[error("Step must be a positive number of minutes, got {0}")]
    InvalidStep(f64),
}

/// ローカルのタイマー一覧。
///
/// 以下を常に保証する。
///
///  - 計測中（`start`あり）のタイマーは高々1つ。
///  - `(resource_id, resource_type)`が同じタイマーは1つだけ。
///  - `previous_duration`は負にならない。
///
/// 並び順は最後に操作したタイマーが先頭。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimerLedger {
    timers: Vec<Timer>,
}

impl TimerLedger {
    /// スナップショットから復元する。
    ///
    /// 重複したキーは先頭のものを残し、計測中のタイマーが複数あれば先頭以外を停止扱いにする。
    pub fn from_timers(timers: Vec<Timer>) -> Self {
        let mut ledger = Self::default();
        let mut has_running = false;
        for mut timer in timers {
            if ledger.position(&timer.key()).is_some() {
                debug!("Dropping duplicated timer for {}", timer.key());
                continue;
            }
            if timer.is_running() {
                if has_running {
                    timer.start = None;
                }
                has_running = true;
            }
            timer.previous_duration = timer.previous_duration.max(0.0);
            ledger.timers.push(timer);
        }
        ledger
    }

    pub fn timers(&self) -> &[Timer] {
        &self.timers
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn get(&self, key: &ResourceKey) -> Option<&Timer> {
        self.timers.iter().find(|timer| timer.key() == *key)
    }

    pub fn running_timer(&self) -> Option<&Timer> {
        self.timers.iter().find(|timer| timer.is_running())
    }

    /// タイマーを開始する。
    ///
    /// 既存のタイマーがあれば累積時間を引き継いで`bonus`を加算し、なければ`bonus`分で作成する。
    /// 別のタイマーが計測中であれば先に停止し、開始したタイマーを先頭に移動する。
    ///
    /// # Arguments
    ///
    /// * `key` - 開始する対象
    /// * `name` - 新規作成時の表示名
    /// * `bonus` - 開始と同時に加算する時間（分）
    pub fn start(&mut self, key: ResourceKey, name: &str, bonus: f64) -> Result<(), LedgerError> {
        validate_minutes(bonus)?;
        let now = now();

        for timer in self.timers.iter_mut() {
            if timer.key() != key && timer.is_running() {
                debug!("Stopping {} before starting {}", timer.key(), key);
                timer.fold_elapsed(&now);
            }
        }

        let mut timer = match self.position(&key) {
            Some(index) => {
                let mut timer = self.timers.remove(index);
                timer.previous_duration += bonus;
                timer
            }
            None => Timer::new(key, name, bonus),
        };
        if timer.start.is_none() {
            timer.start = Some(now);
        }
        self.timers.insert(0, timer);

        Ok(())
    }

    /// `key`のタイマーが計測中の場合のみ停止する。
    ///
    /// 停止した場合は`true`を返す。別のタイマーが計測中でも何もしない。
    pub fn stop(&mut self, key: &ResourceKey) -> bool {
        match self.running_timer() {
            Some(running) if running.key() == *key => self.stop_running_timer().is_some(),
            _ => false,
        }
    }

    /// 計測中のタイマーを、対象を問わず停止する。
    ///
    /// 停止したタイマーのキーを返す。
    pub fn stop_running_timer(&mut self) -> Option<ResourceKey> {
        let now = now();
        let timer = self.timers.iter_mut().find(|timer| timer.is_running())?;
        timer.fold_elapsed(&now);
        Some(timer.key())
    }

    /// タイマーを削除する。計測中だった場合も代わりのタイマーは開始しない。
    pub fn delete(&mut self, key: &ResourceKey) -> Result<Timer, LedgerError> {
        let index = self
            .position(key)
            .ok_or(LedgerError::TimerNotFound(*key))?;
        Ok(self.timers.remove(index))
    }

    /// 累積時間を`minutes`で上書きする。
    ///
    /// 計測中であれば二重に計上しないよう開始時刻を現在時刻に置き直す。
    pub fn set_duration(&mut self, key: &ResourceKey, minutes: f64) -> Result<(), LedgerError> {
        validate_minutes(minutes)?;
        let timer = self.get_mut(key)?;
        timer.previous_duration = minutes;
        if timer.is_running() {
            timer.start = Some(now());
        }
        Ok(())
    }

    /// 累積時間を`step`単位で進める。
    pub fn add_duration(&mut self, key: &ResourceKey, step: f64) -> Result<(), LedgerError> {
        if !(step.is_finite() && step > 0.0) {
            return Err(LedgerError::InvalidStep(step));
        }
        let timer = self.get_mut(key)?;
        timer.previous_duration = add_duration_step(timer.previous_duration, step);
        Ok(())
    }

    pub fn set_description(&mut self, key: &ResourceKey, text: &str) -> Result<(), LedgerError> {
        self.get_mut(key)?.description = text.to_string();
        Ok(())
    }

    pub fn rename(&mut self, key: &ResourceKey, name: &str) -> Result<(), LedgerError> {
        self.get_mut(key)?.resource_name = name.to_string();
        Ok(())
    }

    /// 計測せずに時間だけを登録する。
    ///
    /// 同じキーのタイマーがあれば時間を加算し、説明が空でなければ置き換える。
    pub fn add_timer(
        &mut self,
        key: ResourceKey,
        name: &str,
        minutes: f64,
        description: &str,
    ) -> Result<(), LedgerError> {
        validate_minutes(minutes)?;
        let mut timer = match self.position(&key) {
            Some(index) => {
                let mut timer = self.timers.remove(index);
                timer.previous_duration += minutes;
                timer
            }
            None => Timer::new(key, name, minutes),
        };
        if !description.is_empty() {
            timer.description = description.to_string();
        }
        self.timers.insert(0, timer);
        Ok(())
    }

    pub(crate) fn set_error(&mut self, key: &ResourceKey, message: &str) {
        if let Ok(timer) = self.get_mut(key) {
            timer.error = Some(message.to_string());
        }
    }

    pub(crate) fn retain_keys(&mut self, keys: &[ResourceKey]) {
        self.timers.retain(|timer| keys.contains(&timer.key()));
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }

    fn position(&self, key: &ResourceKey) -> Option<usize> {
        self.timers.iter().position(|timer| timer.key() == *key)
    }

    fn get_mut(&mut self, key: &ResourceKey) -> Result<&mut Timer, LedgerError> {
        self.timers
            .iter_mut()
            .find(|timer| timer.key() == *key)
            .ok_or(LedgerError::TimerNotFound(*key))
    }
}

fn validate_minutes(minutes: f64) -> Result<(), LedgerError> {
    if minutes.is_finite() && minutes >= 0.0 {
        Ok(())
    } else {
        Err(LedgerError::InvalidDuration(minutes))
    }
}
