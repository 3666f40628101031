//! Job status page, result downloads and the JSON job record.

use axum::{
    extract::{Path, State},
    http::header,
    response::{Html, IntoResponse, Response},
    Json,
};
use minijinja::context;
use serde::Serialize;

use vinadock_common::VinadockError;
use vinadock_molecules::workspace::{LOG_FILE, OUTPUT_FILE};
use vinadock_molecules::{JobId, JobRecord, JobStatus};

use crate::handlers::WebError;
use crate::state::SharedState;
use crate::templates::render;

/// Flattened job record for the template.
#[derive(Debug, Serialize)]
struct JobView {
    id: String,
    status: &'static str,
    pending: bool,
    completed: bool,
    message: Option<String>,
    log: Option<String>,
    command: String,
    receptor_name: String,
    ligand_name: String,
    center: String,
    size: String,
    created_at: String,
    finished_at: Option<String>,
}

impl From<&JobRecord> for JobView {
    fn from(record: &JobRecord) -> Self {
        let result = record.result.as_ref();
        let b = record.docking_box;
        Self {
            id: record.id.to_string(),
            status: record.status.as_str(),
            pending: !record.status.is_terminal(),
            completed: record.status == JobStatus::Completed,
            message: result.and_then(|r| r.failure()).map(|f| f.to_string()),
            log: result.and_then(|r| r.log()).map(str::to_string),
            command: record.command.clone(),
            receptor_name: record.receptor_name.clone(),
            ligand_name: record.ligand_name.clone(),
            center: format!("({}, {}, {})", b.center.x, b.center.y, b.center.z),
            size: format!("{} × {} × {} Å", b.size.x, b.size.y, b.size.z),
            created_at: record.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            finished_at: record
                .finished_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        }
    }
}

/// Malformed ids are just unknown jobs.
async fn find(state: &SharedState, raw_id: &str) -> Result<JobRecord, WebError> {
    let not_found = || WebError::NotFound(format!("job {}", raw_id));
    let id: JobId = raw_id.parse().map_err(|_| not_found())?;
    state.jobs.get(&id).await.ok_or_else(not_found)
}

// ── Handlers ──────────────────────────────────────────────────────────────────

pub async fn job_page(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Html<String>, WebError> {
    let record = find(&state, &id).await?;
    let job = JobView::from(&record);
    render(&state.templates, "job.html", context! { job })
}

pub async fn api_job(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<JobRecord>, WebError> {
    Ok(Json(find(&state, &id).await?))
}

#[derive(Debug, Clone, Copy)]
enum Artifact {
    Output,
    Log,
}

pub async fn download_output(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Response, WebError> {
    download(&state, &id, Artifact::Output).await
}

pub async fn download_log(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Response, WebError> {
    download(&state, &id, Artifact::Log).await
}

/// Serve the file as it is on disk, byte for byte.
async fn download(state: &SharedState, id: &str, artifact: Artifact) -> Result<Response, WebError> {
    let record = find(state, id).await?;
    if record.status != JobStatus::Completed {
        return Err(WebError::NotFound(format!("no results for job {} ({})", record.id, record.status)));
    }

    let (path, file_name, content_type) = match artifact {
        Artifact::Output => (record.workspace.output_path(), OUTPUT_FILE, "chemical/x-pdbqt"),
        Artifact::Log => (record.workspace.log_path(), LOG_FILE, "text/plain; charset=utf-8"),
    };
    let bytes = tokio::fs::read(&path).await.map_err(VinadockError::from)?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response())
}
