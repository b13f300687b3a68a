use anyhow::{Context, Result};
use log::info;

use crate::app_state::AppState;
use crate::console::ConsolePresenter;
use crate::datetime::now;
use crate::remote::OdooRepository;
use crate::submission::SubmissionEngine;

pub struct SubmitCommand<'a, T: OdooRepository> {
    engine: SubmissionEngine<'a, T>,
}

impl<'a, T: OdooRepository> SubmitCommand<'a, T> {
    /// 新しい`SubmitCommand`を返す。
    ///
    /// # Arguments
    /// * `odoo` - タイムシートを登録するリポジトリ
    pub fn new(odoo: &'a T) -> Self {
        Self {
            engine: SubmissionEngine::new(odoo),
        }
    }

    /// `submit`サブコマンドの処理を行う。
    ///
    /// 台帳のタイマーをすべて送信し、送信に失敗して残ったタイマーを表示する。
    pub async fn run<P: ConsolePresenter>(
        &self,
        state: &mut AppState,
        presenter: &mut P,
    ) -> Result<()> {
        let report = self
            .engine
            .submit_all(&mut state.ledger)
            .await
            .context("Failed to submit timesheets")?;
        info!(
            "Submission finished: {} submitted, {} failed",
            report.submitted, report.failed
        );

        presenter.show_submission(&report, state.ledger.timers(), &now())
    }
}
