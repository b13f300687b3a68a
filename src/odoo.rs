use async_trait::async_trait;
use log::{debug, info};
use reqwest::{header::CONTENT_TYPE, header::COOKIE, Client, StatusCode};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use crate::duration::minutes_to_hours;
use crate::remote::{
    OdooRepository, Reference, RemoteError, ResourceInfo, Task, TaskFilters, TimesheetEntry,
    TimesheetLine, User,
};
use crate::timer::{ResourceKey, ResourceType};

const SESSION_EXPIRED: &str = "odoo.http.SessionExpiredException";

/// JSON-RPCのレスポンス。`result`と`error`のどちらか一方が入る。
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    code: i64,
    message: String,
    data: Option<RpcErrorData>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorData {
    #[serde(default)]
    name: String,
    #[serde(default)]
    message: String,
}

impl From<RpcError> for RemoteError {
    fn from(error: RpcError) -> Self {
        let data = error.data.unwrap_or(RpcErrorData {
            name: String::new(),
            message: String::new(),
        });
        if data.name == SESSION_EXPIRED || error.code == 100 {
            return RemoteError::Unauthenticated(error.message);
        }
        let message = if data.message.is_empty() {
            error.message
        } else {
            data.message
        };
        RemoteError::Rejected { message }
    }
}

#[derive(Debug, Deserialize)]
struct SearchRead<T> {
    records: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RawSessionInfo {
    #[serde(default, deserialize_with = "false_as_none")]
    uid: Option<i64>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    username: String,
}

#[derive(Debug, Deserialize)]
struct RawReference {
    id: i64,
    #[serde(default)]
    display_name: String,
}

impl From<RawReference> for Reference {
    fn from(raw: RawReference) -> Self {
        Self {
            id: raw.id,
            display_name: raw.display_name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTask {
    id: i64,
    display_name: String,
    #[serde(default, deserialize_with = "false_as_none")]
    project_id: Option<RawReference>,
    #[serde(default, deserialize_with = "false_as_none")]
    stage_id: Option<RawReference>,
    #[serde(default)]
    user_ids: Vec<RawReference>,
    #[serde(default, deserialize_with = "false_as_none")]
    reviewer_id: Option<RawReference>,
    #[serde(default, deserialize_with = "false_as_none")]
    x_owner_id: Option<RawReference>,
    #[serde(default, deserialize_with = "false_as_none")]
    mnt_subscription_id: Option<RawReference>,
    #[serde(default, deserialize_with = "false_as_none")]
    partner_id: Option<RawReference>,
    #[serde(default)]
    allocated_hours: f64,
    #[serde(default)]
    effective_hours: f64,
    #[serde(default)]
    remaining_hours: f64,
}

impl From<RawTask> for Task {
    fn from(raw: RawTask) -> Self {
        Self {
            id: raw.id,
            display_name: raw.display_name,
            project: raw.project_id.map(Reference::from),
            stage: raw.stage_id.map(Reference::from),
            assignees: raw.user_ids.into_iter().map(Reference::from).collect(),
            reviewer: raw.reviewer_id.map(Reference::from),
            owner: raw.x_owner_id.map(Reference::from),
            subscription: raw.mnt_subscription_id.map(Reference::from),
            partner: raw.partner_id.map(Reference::from),
            allocated_hours: raw.allocated_hours,
            effective_hours: raw.effective_hours,
            remaining_hours: raw.remaining_hours,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTimesheetUser {
    id: i64,
    #[serde(default)]
    display_name: String,
    #[serde(default, deserialize_with = "false_as_none")]
    login: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTimesheetLine {
    id: i64,
    #[serde(default, deserialize_with = "false_as_none")]
    name: Option<String>,
    #[serde(default)]
    unit_amount: f64,
    #[serde(default, deserialize_with = "false_as_none")]
    user_id: Option<RawTimesheetUser>,
    #[serde(default, deserialize_with = "false_as_none")]
    timesheet_invoice_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawResourceInfo {
    id: i64,
    display_name: String,
    #[serde(default)]
    allow_timesheets: bool,
}

/// Many2oneなどで値がない場合に`false`が返るフィールドを`None`として読む。
fn false_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Bool(false) | Value::Null => Ok(None),
        value => serde_json::from_value(value)
            .map(Some)
            .map_err(de::Error::custom),
    }
}

/// `n`個のドメインを前置記法のORで結合する。
fn expression_or(domains: Vec<Value>) -> Vec<Value> {
    let ors = domains.len().saturating_sub(1);
    std::iter::repeat(json!("|"))
        .take(ors)
        .chain(domains)
        .collect()
}

/// タスク一覧のドメインを組み立てる。
///
/// 未完了かつプロジェクトに表示されるタスクのうち、担当者・レビュワー・オーナーのいずれかが
/// 自分であるものを対象とする。
fn task_domain(filters: &TaskFilters) -> Value {
    let mut domain = vec![
        json!(["date_last_stage_update", "!=", false]),
        json!(["display_in_project", "=", true]),
        json!(["is_closed", "=", false]),
    ];
    let mut roles = Vec::new();
    if filters.assignee {
        roles.push(json!(["user_ids", "in", [filters.user_id]]));
    }
    if filters.reviewer {
        roles.push(json!(["reviewer_id", "=", filters.user_id]));
    }
    if filters.owner {
        roles.push(json!(["x_owner_id", "=", filters.user_id]));
    }
    domain.extend(expression_or(roles));
    Value::Array(domain)
}

fn task_specification() -> Value {
    let reference = json!({"fields": {"display_name": {}}});
    json!({
        "display_name": {},
        "project_id": reference,
        "stage_id": reference,
        "user_ids": reference,
        "reviewer_id": reference,
        "x_owner_id": reference,
        "mnt_subscription_id": reference,
        "partner_id": reference,
        "allocated_hours": {},
        "effective_hours": {},
        "remaining_hours": {},
    })
}

fn resource_model(resource_type: ResourceType) -> &'static str {
    match resource_type {
        ResourceType::Task => "project.task",
        ResourceType::Project => "project.project",
    }
}

/// 送信用のタイムシート行の値を組み立てる。
///
/// Odooでは説明が必須のため、空の場合は`/`を送る。
fn timesheet_values(entry: &TimesheetEntry) -> Value {
    let name = if entry.description.trim().is_empty() {
        "/"
    } else {
        entry.description.as_str()
    };
    let resource_field = match entry.resource.resource_type {
        ResourceType::Task => "task_id",
        ResourceType::Project => "project_id",
    };
    json!({
        resource_field: entry.resource.id,
        "name": name,
        "unit_amount": minutes_to_hours(entry.duration_minutes),
    })
}

/// OdooのJSON-RPC APIと通信するためのクライアント。
///
/// 認証は行わず、ブラウザなどで取得済みのセッションIDをクッキーとして送る。
///
/// # Examples
///
/// ```ignore
/// let client = OdooClient::new("https://www.test.odoo.com", "session-id");
/// let user = client.fetch_current_user().await?;
/// ```
pub struct OdooClient {
    client: Client,
    base_url: String,
    session_id: String,
}

impl OdooClient {
    pub fn new(base_url: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_id: session_id.into(),
        }
    }

    fn avatar_url(&self, user_id: i64) -> String {
        format!("{}/web/image/res.users/{}/avatar_128", self.base_url, user_id)
    }

    async fn call<T: DeserializeOwned>(&self, path: &str, params: Value) -> Result<T, RemoteError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(COOKIE, format!("session_id={}", self.session_id))
            .json(&json!({
                "id": 1,
                "jsonrpc": "2.0",
                "method": "call",
                "params": params,
            }))
            .send()
            .await
            .map_err(|e| RemoteError::Transport(format!("Failed to send request to {}: {}", url, e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RemoteError::Unauthenticated(format!(
                "Odoo returned {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(RemoteError::Transport(format!(
                "Request returned an error status: {}",
                status
            )));
        }

        let body = response
            .json::<RpcResponse<T>>()
            .await
            .map_err(|e| RemoteError::Parsing(format!("Failed to deserialize response: {}", e)))?;
        match (body.result, body.error) {
            (_, Some(error)) => Err(error.into()),
            (Some(result), None) => Ok(result),
            (None, None) => Err(RemoteError::Parsing(
                "Response has neither result nor error".to_string(),
            )),
        }
    }

    async fn call_kw<T: DeserializeOwned>(
        &self,
        model: &str,
        method: &str,
        args: Value,
        kwargs: Value,
    ) -> Result<T, RemoteError> {
        self.call(
            "/web/dataset/call_kw",
            json!({
                "model": model,
                "method": method,
                "args": args,
                "kwargs": kwargs,
            }),
        )
        .await
    }
}

#[async_trait]
impl OdooRepository for OdooClient {
    async fn fetch_current_user(&self) -> Result<User, RemoteError> {
        let info: RawSessionInfo = self.call("/web/session/get_session_info", json!({})).await?;
        let id = info
            .uid
            .ok_or_else(|| RemoteError::Unauthenticated("No active session".to_string()))?;
        let username = match info.username.split_once('@') {
            Some((local, _)) => local.to_string(),
            None => info.username,
        };

        Ok(User {
            id,
            name: info.name,
            username,
            avatar_url: self.avatar_url(id),
        })
    }

    async fn fetch_tasks(&self, filters: &TaskFilters) -> Result<Vec<Task>, RemoteError> {
        let response: SearchRead<RawTask> = self
            .call_kw(
                "project.task",
                "web_search_read",
                json!([]),
                json!({
                    "domain": task_domain(filters),
                    "specification": task_specification(),
                    "limit": null,
                    "order": "date_last_stage_update desc",
                }),
            )
            .await?;
        info!("length of tasks: {}", response.records.len());

        Ok(response.records.into_iter().map(Task::from).collect())
    }

    async fn fetch_timesheet_lines(&self, task_id: i64) -> Result<Vec<TimesheetLine>, RemoteError> {
        let response: SearchRead<RawTimesheetLine> = self
            .call_kw(
                "account.analytic.line",
                "web_search_read",
                json!([]),
                json!({
                    "domain": [["task_id", "=", task_id]],
                    "specification": {
                        "name": {},
                        "unit_amount": {},
                        "user_id": {"fields": {"display_name": {}, "login": {}}},
                        "timesheet_invoice_type": {},
                    },
                    "order": "user_id desc",
                }),
            )
            .await?;

        let lines = response
            .records
            .into_iter()
            .map(|raw| {
                let user = match raw.user_id {
                    Some(user) => User {
                        id: user.id,
                        name: user.display_name,
                        username: user.login.unwrap_or_default(),
                        avatar_url: self.avatar_url(user.id),
                    },
                    None => User {
                        id: 0,
                        name: "Unknown".to_string(),
                        username: String::new(),
                        avatar_url: String::new(),
                    },
                };
                TimesheetLine {
                    id: raw.id,
                    name: raw.name.unwrap_or_default(),
                    unit_amount: raw.unit_amount,
                    user,
                    billable: raw.timesheet_invoice_type.as_deref() != Some("non_billable"),
                }
            })
            .collect();

        Ok(lines)
    }

    async fn fetch_resource_info(
        &self,
        key: ResourceKey,
    ) -> Result<Option<ResourceInfo>, RemoteError> {
        let response: SearchRead<RawResourceInfo> = self
            .call_kw(
                resource_model(key.resource_type),
                "web_search_read",
                json!([]),
                json!({
                    "domain": [["id", "=", key.id]],
                    "specification": {"display_name": {}, "allow_timesheets": {}},
                    "limit": 1,
                }),
            )
            .await?;

        Ok(response.records.into_iter().next().map(|raw| ResourceInfo {
            id: raw.id,
            display_name: raw.display_name,
            can_timesheet: raw.allow_timesheets,
        }))
    }

    async fn submit_timesheet_entries(&self, entries: &[TimesheetEntry]) -> Result<(), RemoteError> {
        let values: Vec<Value> = entries.iter().map(timesheet_values).collect();
        let ids: Value = self
            .call_kw("account.analytic.line", "create", json!([values]), json!({}))
            .await?;
        info!("Created timesheet lines: {}", ids);

        Ok(())
    }
}
