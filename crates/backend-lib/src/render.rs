// ============================
// secrets-backend-lib/src/render.rs
// ============================
//! HTML pages, rendered with minijinja from templates compiled into the binary.
use axum::response::Html;
use minijinja::Environment;
use serde::Serialize;

use crate::error::AppError;

const TEMPLATES: &[(&str, &str)] = &[
    ("layout.html", include_str!("../templates/layout.html")),
    ("_providers.html", include_str!("../templates/_providers.html")),
    ("home.html", include_str!("../templates/home.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("register.html", include_str!("../templates/register.html")),
    ("secrets.html", include_str!("../templates/secrets.html")),
    ("submit.html", include_str!("../templates/submit.html")),
];

/// Loaded template set; `.html` templates are auto-escaped
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, AppError> {
        let mut env = Environment::new();
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }

    pub fn render<C: Serialize>(&self, name: &str, ctx: C) -> Result<Html<String>, AppError> {
        let template = self.env.get_template(name)?;
        Ok(Html(template.render(ctx)?))
    }
}
