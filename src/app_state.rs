use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::favorites::Favorites;
use crate::ledger::TimerLedger;
use crate::remote::{OdooRepository, RemoteError, ResourceInfo, Task, TaskFilters, TimesheetLine, User};
use crate::timer::{Favorite, ResourceKey, Timer, View};

/// 指定したタスク・プロジェクトがタイマーの対象にできない理由。
#[derive(Clone, Debug, Error, PartialEq)]
pub enum LookupMiss {
    #[error("There is no {} with ID {}.", .0.resource_type, .0.id)]
    NotFound(ResourceKey),
    #[error("This {} cannot be used for timesheets.", .0.resource_type)]
    NotTimesheetable(ResourceKey),
}

#[derive(Debug, Error, PartialEq)]
pub enum LookupError {
    #[error(transparent)]
    Miss(#[from] LookupMiss),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

#[derive(Debug, Error, PartialEq)]
pub enum FavoriteError {
    #[error("{0} is already a favorite")]
    AlreadyExists(ResourceKey),
    #[error("{0} is not a favorite")]
    NotFound(ResourceKey),
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// 永続化するアプリケーションの状態。
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub favorites: Vec<Favorite>,
    #[serde(default)]
    pub timers: Vec<Timer>,
    #[serde(default)]
    pub current_view: View,
}

/// タイマー台帳・お気に入り・表示中の画面などをまとめたアプリケーションの状態。
///
/// `main`で1つだけ作り、各コマンドへ参照で渡す。
#[derive(Debug, Default)]
pub struct AppState {
    pub ledger: TimerLedger,
    pub favorites: Favorites,
    pub current_view: View,
    user: Option<User>,
    tasks: Vec<Task>,
}

impl AppState {
    pub fn restore(snapshot: Snapshot) -> Self {
        Self {
            ledger: TimerLedger::from_timers(snapshot.timers),
            favorites: Favorites::from_items(snapshot.favorites),
            current_view: snapshot.current_view,
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            favorites: self.favorites.items().to_vec(),
            timers: self.ledger.timers().to_vec(),
            current_view: self.current_view,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn set_current_view(&mut self, view: View) {
        self.current_view = view;
    }

    /// セッションのユーザーを取得し、認証状態を更新する。
    ///
    /// 失敗した場合は未認証として扱い、エラーは返さない。
    pub async fn check_and_set_auth<T: OdooRepository>(&mut self, repository: &T) -> bool {
        match repository.fetch_current_user().await {
            Ok(user) => {
                info!("Authenticated as {}", user.username);
                self.user = Some(user);
            }
            Err(error) => {
                warn!("Failed to fetch the current user: {}", error);
                self.user = None;
            }
        }
        self.is_authenticated()
    }

    /// タスク一覧を更新する。失敗した場合は以前の一覧を保つ。
    pub async fn fetch_tasks<T: OdooRepository>(
        &mut self,
        repository: &T,
        filters: &TaskFilters,
    ) -> &[Task] {
        match repository.fetch_tasks(filters).await {
            Ok(tasks) => self.tasks = tasks,
            Err(error) => warn!("Failed to fetch tasks: {}", error),
        }
        &self.tasks
    }

    /// タスクのタイムシート行を取得する。失敗した場合は空を返す。
    pub async fn fetch_timesheets<T: OdooRepository>(
        &self,
        repository: &T,
        task_id: i64,
    ) -> Vec<TimesheetLine> {
        repository
            .fetch_timesheet_lines(task_id)
            .await
            .unwrap_or_else(|error| {
                warn!("Failed to fetch timesheets of task {}: {}", task_id, error);
                vec![]
            })
    }

    /// タイマーの対象にできるタスク・プロジェクトか確認する。
    pub async fn validate_resource<T: OdooRepository>(
        &self,
        repository: &T,
        key: ResourceKey,
    ) -> Result<ResourceInfo, LookupError> {
        let info = repository
            .fetch_resource_info(key)
            .await?
            .ok_or(LookupMiss::NotFound(key))?;
        if !info.can_timesheet {
            return Err(LookupMiss::NotTimesheetable(key).into());
        }
        Ok(info)
    }

    /// タイマーの表示名を決める。
    ///
    /// お気に入り、台帳の順に探し、見つからなければOdooに問い合わせる。
    pub async fn resolve_resource_name<T: OdooRepository>(
        &self,
        repository: &T,
        key: ResourceKey,
    ) -> Result<String, LookupError> {
        if let Some(favorite) = self.favorites.get(&key) {
            return Ok(favorite.name.clone());
        }
        if let Some(timer) = self.ledger.get(&key) {
            return Ok(timer.resource_name.clone());
        }
        let info = self.validate_resource(repository, key).await?;
        Ok(info.display_name)
    }

    /// お気に入りを追加する。名前を省略した場合はOdooの表示名を使う。
    ///
    /// 対象が存在しない、またはタイムシートに使えない場合は何も変更しない。
    pub async fn add_favorite<T: OdooRepository>(
        &mut self,
        repository: &T,
        key: ResourceKey,
        name: Option<&str>,
    ) -> Result<&Favorite, FavoriteError> {
        if self.favorites.contains(&key) {
            return Err(FavoriteError::AlreadyExists(key));
        }
        let info = self.validate_resource(repository, key).await?;
        let name = match name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => info.display_name,
        };
        self.favorites.insert(Favorite {
            id: key.id,
            resource_type: key.resource_type,
            name,
        });
        self.favorites
            .get(&key)
            .ok_or(FavoriteError::NotFound(key))
    }

    pub fn remove_favorite(&mut self, key: &ResourceKey) -> Result<Favorite, FavoriteError> {
        self.favorites
            .remove(key)
            .ok_or(FavoriteError::NotFound(*key))
    }

    /// お気に入りの名前を変更する。
    ///
    /// 空の名前を指定した場合はOdooの表示名に戻し、取得できなければ現在の名前のままにする。
    pub async fn rename_favorite<T: OdooRepository>(
        &mut self,
        repository: &T,
        key: &ResourceKey,
        name: &str,
    ) -> Result<&Favorite, FavoriteError> {
        let current = self
            .favorites
            .get(key)
            .ok_or(FavoriteError::NotFound(*key))?
            .name
            .clone();
        let name = if name.is_empty() {
            match repository.fetch_resource_info(*key).await {
                Ok(Some(info)) => info.display_name,
                Ok(None) => current,
                Err(error) => {
                    warn!("Failed to fetch the name of {}: {}", key, error);
                    current
                }
            }
        } else {
            name.to_string()
        };
        self.favorites.rename(key, &name);
        self.favorites.get(key).ok_or(FavoriteError::NotFound(*key))
    }
}
