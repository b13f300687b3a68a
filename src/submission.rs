use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};
use thiserror::Error;

use crate::duration::{round_duration, BILLING_STEP_MINUTES};
use crate::ledger::TimerLedger;
use crate::remote::{OdooRepository, RemoteError, TimesheetEntry};
use crate::timer::{ResourceKey, Timer};

#[derive(Debug, Error, PartialEq)]
pub enum SubmitError {
    #[error("A submission is already in progress")]
    AlreadyInFlight,
    #[error("Not authenticated: {0}")]
    Unauthenticated(String),
}

/// 送信結果の件数。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubmissionReport {
    pub submitted: usize,
    pub failed: usize,
}

/// 送信中フラグを`Drop`で戻すためのガード。
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// 台帳のタイマーをOdooのタイムシートとして送信する。
///
/// まず全件を1回で送信し、失敗した場合は1件ずつ送り直して拒否されたタイマーだけを
/// エラーメッセージ付きで台帳に残す。
pub struct SubmissionEngine<'a, T: OdooRepository> {
    repository: &'a T,
    in_flight: AtomicBool,
}

impl<'a, T: OdooRepository> SubmissionEngine<'a, T> {
    pub fn new(repository: &'a T) -> Self {
        Self {
            repository,
            in_flight: AtomicBool::new(false),
        }
    }

    /// 台帳のすべてのタイマーを送信する。
    ///
    /// 終了後の台帳には送信に失敗したタイマーだけが残る。
    /// 認証エラーの場合は計測中のタイマーを止めた以外は台帳を変更しない。
    ///
    /// # Arguments
    ///
    /// * `ledger` - 送信対象の台帳
    pub async fn submit_all(&self, ledger: &mut TimerLedger) -> Result<SubmissionReport, SubmitError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Ignoring submission while another one is in flight");
            return Err(SubmitError::AlreadyInFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        if let Some(key) = ledger.stop_running_timer() {
            info!("Stopped {} before submission", key);
        }
        if ledger.is_empty() {
            return Ok(SubmissionReport::default());
        }

        let entries: Vec<TimesheetEntry> = ledger.timers().iter().map(rounded_entry).collect();
        info!("Submitting {} timesheet entries", entries.len());

        let error = match self.repository.submit_timesheet_entries(&entries).await {
            Ok(()) => {
                ledger.clear();
                return Ok(SubmissionReport {
                    submitted: entries.len(),
                    failed: 0,
                });
            }
            Err(RemoteError::Unauthenticated(message)) => {
                return Err(SubmitError::Unauthenticated(message));
            }
            Err(error) => error,
        };

        if entries.len() == 1 {
            warn!("Timesheet entry rejected: {}", error);
            ledger.set_error(&entries[0].resource, &error.to_string());
            return Ok(SubmissionReport {
                submitted: 0,
                failed: 1,
            });
        }

        warn!("Batch submission failed ({}), retrying entries one by one", error);
        let mut failed: Vec<(ResourceKey, String)> = Vec::new();
        for entry in &entries {
            if let Err(error) = self
                .repository
                .submit_timesheet_entries(std::slice::from_ref(entry))
                .await
            {
                warn!("Timesheet entry for {} rejected: {}", entry.resource, error);
                failed.push((entry.resource, error.to_string()));
            }
        }

        let failed_keys: Vec<ResourceKey> = failed.iter().map(|(key, _)| *key).collect();
        ledger.retain_keys(&failed_keys);
        for (key, message) in &failed {
            ledger.set_error(key, message);
        }

        Ok(SubmissionReport {
            submitted: entries.len() - failed.len(),
            failed: failed.len(),
        })
    }
}

/// 15分単位に切り上げた送信用のエントリーを作る。台帳のタイマーは変更しない。
fn rounded_entry(timer: &Timer) -> TimesheetEntry {
    TimesheetEntry {
        resource: timer.key(),
        description: timer.description.clone(),
        duration_minutes: round_duration(timer.previous_duration, BILLING_STEP_MINUTES),
    }
}
