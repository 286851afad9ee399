//! Intake file and pull-request message for a new template

use rust_embed::Embed;
use serde::{Deserialize, Serialize};
use tera::Tera;
use thiserror::Error;

use crate::core::archive::TemplateId;
use crate::description::TemplateDescription;

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

const PR_MESSAGE_TEMPLATE: &str = "pr_message.md.tera";

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Template rendering error: {0}")]
    Render(String),

    #[error("failed to serialize intake file: {0}")]
    Toml(#[from] toml::ser::Error),
}

/// Content of `tpl-<ID>.toml` in the Archive repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeFile {
    pub osf: OsfLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsfLocation {
    /// OSF project holding the template's files
    pub project: String,
}

impl IntakeFile {
    pub fn new(osf_project: impl Into<String>) -> Self {
        Self {
            osf: OsfLocation {
                project: osf_project.into(),
            },
        }
    }

    pub fn to_toml(&self) -> Result<String, IntakeError> {
        Ok(toml::to_string(self)?)
    }
}

/// Renders pull-request messages from the embedded templates
pub struct MessageRenderer {
    tera: Tera,
}

impl MessageRenderer {
    pub fn new() -> Result<Self, IntakeError> {
        let mut tera = Tera::default();

        for file in EmbeddedTemplates::iter() {
            let filename = file.as_ref();
            if let Some(content) = EmbeddedTemplates::get(filename) {
                let source = std::str::from_utf8(&content.data)
                    .map_err(|e| IntakeError::Render(format!("{}: {}", filename, e)))?;
                tera.add_raw_template(filename, source)
                    .map_err(|e| IntakeError::Render(e.to_string()))?;
            }
        }

        if !tera.get_template_names().any(|n| n == PR_MESSAGE_TEMPLATE) {
            return Err(IntakeError::TemplateNotFound(PR_MESSAGE_TEMPLATE.to_string()));
        }

        Ok(Self { tera })
    }

    /// Message of the intake pull request for a template
    pub fn pr_message(
        &self,
        id: &TemplateId,
        description: &TemplateDescription,
        osf_project: &str,
    ) -> Result<String, IntakeError> {
        let mut context = tera::Context::new();
        context.insert("id", id.as_str());
        context.insert("name", description.display_name());
        context.insert("identifier", description.display_identifier());
        context.insert("osf_project", osf_project);
        context.insert("authors", &description.authors);
        context.insert("license", description.display_license());
        context.insert("cohorts", &description.cohort_count());
        context.insert("references", &description.references_and_links);

        self.tera
            .render(PR_MESSAGE_TEMPLATE, &context)
            .map_err(|e| IntakeError::Render(e.to_string()))
    }
}

/// Title of the intake pull request
pub fn pr_title(id: &TemplateId) -> String {
    format!("ADD: {}", id.dir_name())
}

/// Commit message for the intake file
pub fn commit_message(id: &TemplateId) -> String {
    format!("add({}): create intake file", id.dir_name())
}
