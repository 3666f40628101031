//! Page templates, compiled into the binary.

use axum::response::Html;
use minijinja::Environment;
use serde::Serialize;

use vinadock_common::Result;

use crate::handlers::WebError;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("form.html", include_str!("../templates/form.html")),
    ("job.html", include_str!("../templates/job.html")),
];

/// Build the template environment. `.html` templates are auto-escaped.
pub fn environment() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    for &(name, source) in TEMPLATES {
        env.add_template(name, source).map_err(anyhow::Error::from)?;
    }
    Ok(env)
}

pub fn render<S: Serialize>(env: &Environment<'_>, name: &str, ctx: S) -> std::result::Result<Html<String>, WebError> {
    let html = env.get_template(name)?.render(ctx)?;
    Ok(Html(html))
}
