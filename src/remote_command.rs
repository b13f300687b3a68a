use anyhow::{bail, Context, Result};
use log::info;

use crate::app_state::AppState;
use crate::console::ConsolePresenter;
use crate::remote::{OdooRepository, TaskFilters, User};
use crate::timesheet::aggregate_by_user;

/// `tasks`サブコマンドの引数。
///
/// 何も指定しなければ担当・レビュー・オーナーのいずれかであるタスクを表示する。
#[derive(Debug, clap::Args)]
pub struct TasksArgs {
    #[clap(long = "assignee", help = "Tasks assigned to me")]
    assignee: bool,

    #[clap(long = "reviewer", help = "Tasks I review")]
    reviewer: bool,

    #[clap(long = "owner", help = "Tasks I own")]
    owner: bool,
}

impl TasksArgs {
    fn filters(&self, user_id: i64) -> TaskFilters {
        if !(self.assignee || self.reviewer || self.owner) {
            return TaskFilters::all_for(user_id);
        }
        TaskFilters {
            user_id,
            assignee: self.assignee,
            reviewer: self.reviewer,
            owner: self.owner,
        }
    }
}

/// `timesheets`サブコマンドの引数。
#[derive(Debug, clap::Args)]
pub struct TimesheetsArgs {
    #[clap(help = "Odoo id of the task")]
    task_id: i64,
}

/// Odooの情報を参照するだけのサブコマンド。
pub struct RemoteCommand<'a, T: OdooRepository> {
    odoo: &'a T,
}

impl<'a, T: OdooRepository> RemoteCommand<'a, T> {
    /// 新しい`RemoteCommand`を返す。
    ///
    /// # Arguments
    /// * `odoo` - Odooと通信するためのリポジトリ
    pub fn new(odoo: &'a T) -> Self {
        Self { odoo }
    }

    /// `whoami`サブコマンドの処理を行う。
    pub async fn whoami<P: ConsolePresenter>(
        &self,
        state: &mut AppState,
        presenter: &mut P,
    ) -> Result<()> {
        let user = self.authenticate(state).await?;
        presenter.show_user(&user)
    }

    /// `tasks`サブコマンドの処理を行う。
    pub async fn tasks<P: ConsolePresenter>(
        &self,
        state: &mut AppState,
        args: TasksArgs,
        presenter: &mut P,
    ) -> Result<()> {
        let user = self.authenticate(state).await?;
        let tasks = state.fetch_tasks(self.odoo, &args.filters(user.id)).await;
        info!("{} tasks retrieved.", tasks.len());
        presenter.show_tasks(state.tasks())
    }

    /// `timesheets`サブコマンドの処理を行う。
    ///
    /// タスクのタイムシートをユーザーごとに集計し、自分の集計を最後に表示する。
    pub async fn timesheets<P: ConsolePresenter>(
        &self,
        state: &mut AppState,
        args: TimesheetsArgs,
        presenter: &mut P,
    ) -> Result<()> {
        let user = self.authenticate(state).await?;
        let lines = state.fetch_timesheets(self.odoo, args.task_id).await;
        presenter.show_timesheet_stats(&aggregate_by_user(&lines, user.id))
    }

    async fn authenticate(&self, state: &mut AppState) -> Result<User> {
        if !state.check_and_set_auth(self.odoo).await {
            bail!("Not authenticated, set ODOO_SESSION_ID to a valid Odoo session");
        }
        state
            .user()
            .cloned()
            .context("Failed to keep the authenticated user")
    }
}
