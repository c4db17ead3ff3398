//! Upsert decision machine and the end-to-end pipeline run.
//!
//! One invocation is a single synchronous pass: fetch → decode → extract
//! → render → upsert. The only state that survives the process is the
//! task id emitted on stdout for the caller to persist.

use tracing::{info, warn};

use crate::config::{RunConfig, DASHBOARD_TITLE, TASK_ID_ENV};
use crate::feed;
use crate::http::HttpClient;
use crate::report;
use crate::taskade::{TaskStore, TaskadeClient};
use crate::Result;

/// Terminal state of one upsert pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The configured task id was updated in place.
    UpdatedKnown {
        /// Identifier that was updated.
        task_id: String,
    },
    /// A task found by title search was updated; the id is new to the
    /// caller and must be persisted.
    UpdatedDiscovered {
        /// Identifier discovered by the title search.
        task_id: String,
    },
    /// A matching task was found but carried no usable id; content was
    /// not updated. Degraded, still a successful run.
    FoundWithoutId,
    /// A new dashboard task was created.
    Created {
        /// Identifier of the created task.
        task_id: String,
    },
    /// The create call succeeded but the response id could not be
    /// parsed. Degraded, still a successful run.
    CreatedWithoutId,
}

impl UpsertOutcome {
    /// Identifier the caller should persist for future runs, when this
    /// run produced one it does not already know.
    #[must_use]
    pub fn task_id_to_persist(&self) -> Option<&str> {
        match self {
            Self::UpdatedDiscovered { task_id } | Self::Created { task_id } => Some(task_id),
            Self::UpdatedKnown { .. } | Self::FoundWithoutId | Self::CreatedWithoutId => None,
        }
    }
}

/// Reconcile the dashboard task: update the known id, else discover one
/// by title and update it, else create a new task.
///
/// Runs once per invocation; request-level retry lives inside the HTTP
/// client, never here.
///
/// # Errors
///
/// Propagates any `AppError` from the task store unchanged; the two
/// degraded paths (`FoundWithoutId`, `CreatedWithoutId`) terminate as
/// successful outcomes instead.
pub async fn run_upsert(
    store: &dyn TaskStore,
    project_id: &str,
    known_task_id: Option<&str>,
    title: &str,
    content: &str,
) -> Result<UpsertOutcome> {
    if let Some(task_id) = known_task_id.map(str::trim).filter(|id| !id.is_empty()) {
        info!(task_id, "updating known dashboard task");
        store.update_task(task_id, content).await?;
        return Ok(UpsertOutcome::UpdatedKnown {
            task_id: task_id.to_owned(),
        });
    }

    info!(project_id, title, "no task id configured; searching project by title");
    if let Some(existing) = store.find_task_by_title(project_id, title).await? {
        return match existing.usable_id() {
            Some(task_id) => {
                info!(task_id, "found existing dashboard task; updating");
                store.update_task(task_id, content).await?;
                Ok(UpsertOutcome::UpdatedDiscovered {
                    task_id: task_id.to_owned(),
                })
            }
            None => {
                warn!(
                    title = ?existing.title,
                    "found dashboard task by title but no usable id; content not updated"
                );
                Ok(UpsertOutcome::FoundWithoutId)
            }
        };
    }

    info!(project_id, "no existing dashboard task; creating one");
    match store.create_task(project_id, content, title).await? {
        Some(task_id) => Ok(UpsertOutcome::Created { task_id }),
        None => {
            warn!("task created but no id could be parsed; caller cannot persist it");
            Ok(UpsertOutcome::CreatedWithoutId)
        }
    }
}

/// Execute one full fetch-render-publish cycle.
///
/// On the discover and create paths, prints a single-line JSON record
/// (`{"TASKADE_TASK_ID":"…"}`) to stdout for the caller to capture.
///
/// # Errors
///
/// Returns the first `AppError` raised by any stage; `main` maps it to a
/// process exit code.
pub async fn run(config: &RunConfig) -> Result<UpsertOutcome> {
    let http = HttpClient::new(config)?;
    let client = TaskadeClient::new(
        http.clone(),
        &config.taskade_base_url,
        &config.taskade_api_token,
    )?;

    let feed = feed::fetch_feed(&http, &config.feed_url).await?;
    let (feed_ts, records) = feed::extract_vehicles(&feed);
    info!(trains = records.len(), feed_ts = ?feed_ts, "extracted vehicle records");

    let content = report::render_report(feed_ts, &records);
    let outcome = run_upsert(
        &client,
        &config.taskade_project_id,
        config.taskade_task_id.as_deref(),
        DASHBOARD_TITLE,
        &content,
    )
    .await?;

    if let Some(task_id) = outcome.task_id_to_persist() {
        println!("{}", serde_json::json!({ TASK_ID_ENV: task_id }));
    }
    info!(outcome = ?outcome, "run complete");
    Ok(outcome)
}
