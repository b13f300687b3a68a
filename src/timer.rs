use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duration::elapsed_minutes;

/// 時間を記録する対象の種類。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Task,
    Project,
}

#[derive(Debug, Error)]
#[error("Unknown resource type: {0} (expected `task` or `project`)")]
pub struct ParseResourceTypeError(String);

impl FromStr for ResourceType {
    type Err = ParseResourceTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "task" => Ok(Self::Task),
            "project" => Ok(Self::Project),
            _ => Err(ParseResourceTypeError(s.to_string())),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task => write!(f, "task"),
            Self::Project => write!(f, "project"),
        }
    }
}

/// タスクまたはプロジェクトを一意に特定するキー。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub id: i64,
    pub resource_type: ResourceType,
}

impl ResourceKey {
    pub fn new(id: i64, resource_type: ResourceType) -> Self {
        Self { id, resource_type }
    }

    #[cfg(test)]
    pub fn task(id: i64) -> Self {
        Self::new(id, ResourceType::Task)
    }

    #[cfg(test)]
    pub fn project(id: i64) -> Self {
        Self::new(id, ResourceType::Project)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.resource_type, self.id)
    }
}

/// ローカルで計測中、または計測済みのタイマー。
///
/// `start`が`Some`のタイマーは計測中であり、台帳内に高々1つしか存在しない。
/// `previous_duration`は計測中の区間を含まない累積時間（分）。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timer {
    pub resource_id: i64,
    pub resource_type: ResourceType,
    pub resource_name: String,
    pub start: Option<DateTime<Utc>>,
    pub previous_duration: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Timer {
    /// 停止状態の新しいタイマーを返す。
    pub fn new(key: ResourceKey, resource_name: impl Into<String>, previous_duration: f64) -> Self {
        Self {
            resource_id: key.id,
            resource_type: key.resource_type,
            resource_name: resource_name.into(),
            start: None,
            previous_duration,
            description: String::new(),
            error: None,
        }
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.resource_id, self.resource_type)
    }

    pub fn is_running(&self) -> bool {
        self.start.is_some()
    }

    /// 計測中の区間を含めた合計時間（分）。
    ///
    /// 表示のたびに計算する値であり、`previous_duration`には書き戻さない。
    pub fn full_duration(&self, now: &DateTime<Utc>) -> f64 {
        let current = self
            .start
            .map(|start| elapsed_minutes(&start, now))
            .unwrap_or(0.0);
        self.previous_duration + current
    }

    /// 計測中であれば経過時間を`previous_duration`へ畳み込み、停止する。
    pub(crate) fn fold_elapsed(&mut self, now: &DateTime<Utc>) {
        if let Some(start) = self.start.take() {
            self.previous_duration += elapsed_minutes(&start, now);
        }
    }
}

/// すぐにタイマーを開始するためのお気に入り。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: i64,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub name: String,
}

impl Favorite {
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.id, self.resource_type)
    }
}

/// 最後に表示していた画面。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum View {
    #[default]
    Today,
    InTheZone,
    Report,
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(Self::Today),
            "in-the-zone" => Ok(Self::InTheZone),
            "report" => Ok(Self::Report),
            _ => Err(format!(
                "Unknown view: {} (expected `today`, `in-the-zone` or `report`)",
                s
            )),
        }
    }
}
