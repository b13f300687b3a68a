use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::timer::ResourceKey;

/// Odooのログインユーザー。
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub avatar_url: String,
}

/// Many2oneフィールドの参照先。
#[derive(Clone, Debug, PartialEq)]
pub struct Reference {
    pub id: i64,
    pub display_name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Task {
    pub id: i64,
    pub display_name: String,
    pub project: Option<Reference>,
    pub stage: Option<Reference>,
    pub assignees: Vec<Reference>,
    pub reviewer: Option<Reference>,
    pub owner: Option<Reference>,
    pub subscription: Option<Reference>,
    pub partner: Option<Reference>,
    pub allocated_hours: f64,
    pub effective_hours: f64,
    pub remaining_hours: f64,
}

/// タスクに登録済みのタイムシート行。`unit_amount`は時間単位。
#[derive(Clone, Debug, PartialEq)]
pub struct TimesheetLine {
    pub id: i64,
    pub name: String,
    pub unit_amount: f64,
    pub user: User,
    pub billable: bool,
}

/// タスク・プロジェクトの存在確認結果。
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceInfo {
    pub id: i64,
    pub display_name: String,
    pub can_timesheet: bool,
}

/// 1件のタイムシート送信内容。
#[derive(Clone, Debug, PartialEq)]
pub struct TimesheetEntry {
    pub resource: ResourceKey,
    pub description: String,
    pub duration_minutes: f64,
}

/// タスク一覧の絞り込み条件。
///
/// 有効な条件はORで結合される。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TaskFilters {
    pub user_id: i64,
    pub assignee: bool,
    pub reviewer: bool,
    pub owner: bool,
}

impl TaskFilters {
    pub fn all_for(user_id: i64) -> Self {
        Self {
            user_id,
            assignee: true,
            reviewer: true,
            owner: true,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum RemoteError {
    #[error("Not authenticated: {0}")]
    Unauthenticated(String),
    #[error("{message}")]
    Rejected { message: String },
    #[error("ResponseError: {0}")]
    Transport(String),
    #[error("ParsingError: {0}")]
    Parsing(String),
}

/// Odooとやり取りするためのリポジトリ。
///
/// テストでは`MockOdooRepository`で差し替える。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OdooRepository {
    /// セッションのユーザー情報を取得する。セッションがなければ`Unauthenticated`を返す。
    async fn fetch_current_user(&self) -> Result<User, RemoteError>;

    async fn fetch_tasks(&self, filters: &TaskFilters) -> Result<Vec<Task>, RemoteError>;

    async fn fetch_timesheet_lines(&self, task_id: i64) -> Result<Vec<TimesheetLine>, RemoteError>;

    /// 存在しない場合は`None`を返す。
    async fn fetch_resource_info(&self, key: ResourceKey)
        -> Result<Option<ResourceInfo>, RemoteError>;

    /// すべてのエントリーを1回の呼び出しで登録する。1件でも拒否されれば全体がエラーになる。
    async fn submit_timesheet_entries(&self, entries: &[TimesheetEntry]) -> Result<(), RemoteError>;
}
