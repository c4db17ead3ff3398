//! Taskade REST client and the task-store seam the orchestrator runs
//! against.
//!
//! The [`TaskStore`] trait decouples the upsert decision logic from the
//! live HTTP client so the reconciliation paths can be exercised with an
//! in-memory double.

use std::future::Future;
use std::pin::Pin;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::http::HttpClient;
use crate::{AppError, Result};

/// Tokens that identify the dashboard task when the title does not match
/// exactly. Best-effort fallback carried over from the original heuristic.
const DASHBOARD_KEYWORDS: [&str; 3] = ["ktm", "status", "update"];

/// A task as reported by the Taskade list endpoint.
///
/// The identifier arrives as `id` or `task_id` depending on endpoint; both
/// are kept and resolved through [`RemoteTask::usable_id`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteTask {
    /// Primary identifier field.
    #[serde(default)]
    pub id: Option<String>,
    /// Alternate identifier field some responses use.
    #[serde(default)]
    pub task_id: Option<String>,
    /// Task title, absent for untitled nodes.
    #[serde(default)]
    pub title: Option<String>,
}

impl RemoteTask {
    /// The identifier to address this task with, if any field carries one.
    #[must_use]
    pub fn usable_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or(self.task_id.as_deref())
            .filter(|id| !id.trim().is_empty())
    }

    fn title_text(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }
}

/// Operations the upsert state machine needs from the remote task store.
pub trait TaskStore: Send + Sync {
    /// Create the dashboard task in a project.
    ///
    /// Returns `Ok(None)` when the service accepted the task but the
    /// response carried no parsable identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Upsert`](crate::AppError::Upsert) on an unexpected status and
    /// [`AppError::Transient`](crate::AppError::Transient) if the transport fails past the retry bound.
    fn create_task(
        &self,
        project_id: &str,
        content: &str,
        title: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + '_>>;

    /// Overwrite the content of an existing task.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Upsert`](crate::AppError::Upsert) on an unexpected status and
    /// [`AppError::Transient`](crate::AppError::Transient) if the transport fails past the retry bound.
    fn update_task(
        &self,
        task_id: &str,
        content: &str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Locate an existing dashboard task by title.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Upsert`](crate::AppError::Upsert) if the list endpoint answers with an
    /// unexpected status.
    fn find_task_by_title(
        &self,
        project_id: &str,
        title: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<RemoteTask>>> + Send + '_>>;
}

/// HTTP client for the Taskade REST API.
#[derive(Debug, Clone)]
pub struct TaskadeClient {
    http: HttpClient,
    base_url: String,
    headers: HeaderMap,
}

impl TaskadeClient {
    /// Build a client for the given API base URL and bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the token is not a valid header value.
    pub fn new(http: HttpClient, base_url: &str, api_token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {api_token}"))
            .map_err(|err| AppError::Config(format!("invalid api token: {err}")))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            headers,
        })
    }

    /// Create a markdown task at the top of a project.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Upsert` on a status outside 200/201 or an
    /// unparsable body; a success response missing the identifier path
    /// yields `Ok(None)`.
    pub async fn create_task(
        &self,
        project_id: &str,
        content: &str,
        title: &str,
    ) -> Result<Option<String>> {
        let url = format!("{}/projects/{project_id}/tasks", self.base_url);
        let payload = json!({
            "tasks": [{
                "taskId": null,
                "placement": "afterbegin",
                "contentType": "text/markdown",
                "content": content,
                "title": title,
            }]
        });

        info!(url, "creating dashboard task");
        let response = self
            .http
            .execute(Method::POST, &url, self.headers.clone(), Some(&payload), None)
            .await?;
        let status = response.status();
        if status != 200 && status != 201 {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upsert(format!(
                "create task failed: {status} {body}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| AppError::Upsert(format!("create response is not json: {err}")))?;
        match parse_created_task_id(&body) {
            Some(task_id) => {
                info!(task_id, "created dashboard task");
                Ok(Some(task_id))
            }
            None => {
                error!(
                    response = %body,
                    "create response missing item[0].id; task created but id unknown"
                );
                Ok(None)
            }
        }
    }

    /// Replace the content of an existing task.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Upsert` on a status outside 200/204.
    pub async fn update_task(&self, task_id: &str, content: &str) -> Result<()> {
        let url = format!("{}/tasks/{task_id}", self.base_url);
        info!(task_id, "updating dashboard task");
        let response = self
            .http
            .execute(
                Method::PUT,
                &url,
                self.headers.clone(),
                Some(&json!({ "content": content })),
                None,
            )
            .await?;
        let status = response.status();
        if status != 200 && status != 204 {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upsert(format!(
                "update task failed: {status} {body}"
            )));
        }
        Ok(())
    }

    /// List the tasks of a project. Unrecognized body shapes yield an
    /// empty list rather than an error.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Upsert` on a non-200 status.
    pub async fn list_tasks(&self, project_id: &str) -> Result<Vec<RemoteTask>> {
        let url = format!("{}/projects/{project_id}/tasks", self.base_url);
        let response = self
            .http
            .execute(Method::GET, &url, self.headers.clone(), None, None)
            .await?;
        let status = response.status();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upsert(format!(
                "list tasks failed: {status} {body}"
            )));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|err| AppError::Upsert(format!("list response is not json: {err}")))?;
        Ok(parse_task_list(body))
    }

    /// Scan a project's tasks for the dashboard task.
    ///
    /// # Errors
    ///
    /// Propagates the error from [`TaskadeClient::list_tasks`].
    pub async fn find_task_by_title(
        &self,
        project_id: &str,
        title: &str,
    ) -> Result<Option<RemoteTask>> {
        let items = self.list_tasks(project_id).await?;
        info!(count = items.len(), title, "scanning project tasks for dashboard");
        Ok(match_dashboard_task(&items, title).cloned())
    }
}

impl TaskStore for TaskadeClient {
    fn create_task(
        &self,
        project_id: &str,
        content: &str,
        title: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + '_>> {
        let (project_id, content, title) =
            (project_id.to_owned(), content.to_owned(), title.to_owned());
        Box::pin(async move { self.create_task(&project_id, &content, &title).await })
    }

    fn update_task(
        &self,
        task_id: &str,
        content: &str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let (task_id, content) = (task_id.to_owned(), content.to_owned());
        Box::pin(async move { self.update_task(&task_id, &content).await })
    }

    fn find_task_by_title(
        &self,
        project_id: &str,
        title: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<RemoteTask>>> + Send + '_>> {
        let (project_id, title) = (project_id.to_owned(), title.to_owned());
        Box::pin(async move { self.find_task_by_title(&project_id, &title).await })
    }
}

/// Pull the created task identifier out of a create response
/// (`item[0].id`), tolerating numeric identifiers.
#[must_use]
pub fn parse_created_task_id(body: &Value) -> Option<String> {
    let id = body.get("item")?.get(0)?.get("id")?;
    match id {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Interpret a list-tasks body: a bare array, or an object with an
/// `items` array; anything else is treated as an empty project.
#[must_use]
pub fn parse_task_list(body: Value) -> Vec<RemoteTask> {
    let items = match body {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut map) => match map.remove("items") {
            Some(items @ Value::Array(_)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    serde_json::from_value(items).unwrap_or_default()
}

/// First-match-wins dashboard task lookup: an exact case-insensitive
/// title match, falling back to the first title containing every
/// dashboard keyword.
#[must_use]
pub fn match_dashboard_task<'a>(
    items: &'a [RemoteTask],
    title: &str,
) -> Option<&'a RemoteTask> {
    let wanted = title.to_lowercase();
    if let Some(exact) = items
        .iter()
        .find(|item| item.title_text().trim().to_lowercase() == wanted)
    {
        return Some(exact);
    }
    items.iter().find(|item| {
        let t = item.title_text().to_lowercase();
        DASHBOARD_KEYWORDS.iter().all(|keyword| t.contains(keyword))
    })
}
