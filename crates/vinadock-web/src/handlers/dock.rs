//! Docking form — upload, docking box inputs, submission.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use minijinja::context;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::info;

use vinadock_molecules::{DockingBox, DockingRequest, Upload, Vec3};

use crate::handlers::WebError;
use crate::state::SharedState;
use crate::templates::render;

// ── Form input ────────────────────────────────────────────────────────────────

pub const RECEPTOR_FIELD: &str = "receptor";
pub const LIGAND_FIELD: &str = "ligand";
pub const STRUCTURE_EXTENSION: &str = ".pdbqt";

/// (field name, label, default) for the six docking box inputs, in form order.
pub const BOX_FIELDS: [(&str, &str, f64); 6] = [
    ("center_x", "Center X", DockingBox::DEFAULT_CENTER),
    ("center_y", "Center Y", DockingBox::DEFAULT_CENTER),
    ("center_z", "Center Z", DockingBox::DEFAULT_CENTER),
    ("size_x", "Size X (Å)", DockingBox::DEFAULT_SIZE),
    ("size_y", "Size Y (Å)", DockingBox::DEFAULT_SIZE),
    ("size_z", "Size Z (Å)", DockingBox::DEFAULT_SIZE),
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("Please upload both receptor and ligand files.")]
    MissingFiles,

    #[error("The {field} file must be a .pdbqt file (got \"{file_name}\").")]
    WrongExtension { field: &'static str, file_name: String },

    #[error("{label} must be a number (got \"{value}\").")]
    InvalidNumber { label: &'static str, value: String },

    #[error("{label} must be greater than zero.")]
    NonPositiveSize { label: &'static str },
}

/// An input as shown back to the user.
#[derive(Debug, Clone, Serialize)]
pub struct FieldView {
    pub name: &'static str,
    pub label: &'static str,
    pub value: String,
}

pub fn default_fields() -> Vec<FieldView> {
    BOX_FIELDS
        .iter()
        .map(|&(name, label, default)| FieldView {
            name,
            label,
            value: format!("{:.1}", default),
        })
        .collect()
}

/// Raw multipart submission.
#[derive(Debug, Default)]
pub struct DockForm {
    pub receptor: Option<Upload>,
    pub ligand: Option<Upload>,
    pub values: HashMap<String, String>,
}

impl DockForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, WebError> {
        let mut form = DockForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| WebError::BadRequest(e.to_string()))?
        {
            let Some(name) = field.name().map(str::to_string) else { continue };
            match name.as_str() {
                RECEPTOR_FIELD | LIGAND_FIELD => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let content = field
                        .bytes()
                        .await
                        .map_err(|e| WebError::BadRequest(e.to_string()))?;
                    // Browsers send an empty part when no file was picked.
                    if content.is_empty() {
                        continue;
                    }
                    let upload = Upload::new(file_name, content.to_vec());
                    if name == RECEPTOR_FIELD {
                        form.receptor = Some(upload);
                    } else {
                        form.ligand = Some(upload);
                    }
                }
                n if BOX_FIELDS.iter().any(|(f, _, _)| *f == n) => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| WebError::BadRequest(e.to_string()))?;
                    form.values.insert(n.to_string(), text);
                }
                _ => {}
            }
        }
        Ok(form)
    }

    /// Submitted values for re-rendering; missing ones show the default.
    pub fn field_views(&self) -> Vec<FieldView> {
        default_fields()
            .into_iter()
            .map(|mut f| {
                if let Some(v) = self.values.get(f.name) {
                    f.value = v.clone();
                }
                f
            })
            .collect()
    }

    pub fn into_request(self) -> Result<DockingRequest, FormError> {
        let (receptor, ligand) = match (self.receptor, self.ligand) {
            (Some(r), Some(l)) => (r, l),
            _ => return Err(FormError::MissingFiles),
        };
        for (field, upload) in [(RECEPTOR_FIELD, &receptor), (LIGAND_FIELD, &ligand)] {
            if !upload.file_name.to_ascii_lowercase().ends_with(STRUCTURE_EXTENSION) {
                return Err(FormError::WrongExtension {
                    field,
                    file_name: upload.file_name.clone(),
                });
            }
        }

        let mut parsed = [0.0f64; 6];
        for (slot, &(name, label, default)) in parsed.iter_mut().zip(BOX_FIELDS.iter()) {
            *slot = parse_number(self.values.get(name).map(String::as_str), label, default)?;
        }
        let docking_box = DockingBox {
            center: Vec3::new(parsed[0], parsed[1], parsed[2]),
            size: Vec3::new(parsed[3], parsed[4], parsed[5]),
        };
        for (value, &(_, label, _)) in parsed[3..].iter().zip(BOX_FIELDS[3..].iter()) {
            if *value <= 0.0 {
                return Err(FormError::NonPositiveSize { label });
            }
        }

        Ok(DockingRequest { receptor, ligand, docking_box })
    }
}

fn parse_number(raw: Option<&str>, label: &'static str, default: f64) -> Result<f64, FormError> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Ok(default);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(FormError::InvalidNumber { label, value: raw.to_string() }),
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

pub async fn form_page(State(state): State<SharedState>) -> Result<Html<String>, WebError> {
    render_form(&state, default_fields(), None)
}

fn render_form(
    state: &SharedState,
    fields: Vec<FieldView>,
    error: Option<String>,
) -> Result<Html<String>, WebError> {
    let runner = state.jobs.runner();
    render(
        &state.templates,
        "form.html",
        context! {
            fields,
            error,
            vina_found => runner.is_available(),
            vina_path => runner.executable_path().display().to_string(),
        },
    )
}

pub async fn dock_submit(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Response, WebError> {
    let form = DockForm::from_multipart(multipart).await?;
    let fields = form.field_views();
    match form.into_request() {
        Ok(request) => {
            let id = state.jobs.submit(request).await?;
            Ok(Redirect::to(&format!("/jobs/{}", id)).into_response())
        }
        Err(e) => {
            info!("Rejected docking form: {}", e);
            let page = render_form(&state, fields, Some(e.to_string()))?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
    }
}

/// Same form contract as `POST /dock`, but waits for the job and answers with its JSON record.
pub async fn api_dock(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Response, WebError> {
    let form = DockForm::from_multipart(multipart).await?;
    let request = match form.into_request() {
        Ok(r) => r,
        Err(e) => {
            let body = serde_json::json!({ "status": "error", "error": e.to_string() });
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response());
        }
    };

    let id = state.jobs.submit(request).await?;
    let record = state
        .jobs
        .wait_for(id)
        .await
        .ok_or_else(|| WebError::NotFound(format!("job {} was evicted", id)))?;
    Ok(Json(record).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str) -> Option<Upload> {
        Some(Upload::new(name, b"ATOM".to_vec()))
    }

    fn form(values: &[(&str, &str)]) -> DockForm {
        DockForm {
            receptor: upload("rec.pdbqt"),
            ligand: upload("LIG.PDBQT"),
            values: values.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    #[test]
    fn test_blank_fields_take_defaults() {
        let request = form(&[("center_x", ""), ("size_y", "  ")]).into_request().unwrap();
        assert_eq!(request.docking_box, DockingBox::default());
    }

    #[test]
    fn test_values_are_parsed() {
        let request = form(&[("center_x", "12.5"), ("center_z", "-3"), ("size_x", "30")])
            .into_request()
            .unwrap();
        assert_eq!(request.docking_box.center, Vec3::new(12.5, 0.0, -3.0));
        assert_eq!(request.docking_box.size, Vec3::new(30.0, 20.0, 20.0));
    }

    #[test]
    fn test_one_file_is_not_enough() {
        let mut f = form(&[]);
        f.ligand = None;
        assert_eq!(f.into_request().unwrap_err(), FormError::MissingFiles);
        assert_eq!(
            FormError::MissingFiles.to_string(),
            "Please upload both receptor and ligand files."
        );
    }

    #[test]
    fn test_wrong_extension() {
        let mut f = form(&[]);
        f.receptor = upload("rec.pdb");
        assert!(matches!(
            f.into_request(),
            Err(FormError::WrongExtension { field: "receptor", .. })
        ));
    }

    #[test]
    fn test_rejects_garbage_and_non_finite() {
        assert!(matches!(
            form(&[("center_y", "abc")]).into_request(),
            Err(FormError::InvalidNumber { label: "Center Y", .. })
        ));
        assert!(matches!(
            form(&[("center_x", "NaN")]).into_request(),
            Err(FormError::InvalidNumber { .. })
        ));
        assert!(matches!(
            form(&[("size_z", "0")]).into_request(),
            Err(FormError::NonPositiveSize { label: "Size Z (Å)" })
        ));
    }

    #[test]
    fn test_field_views_keep_submitted_text() {
        let views = form(&[("center_x", "abc")]).field_views();
        assert_eq!(views[0].value, "abc");
        assert_eq!(views[3].value, "20.0");
    }
}
