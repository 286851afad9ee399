//! Template metadata read from `template_description.json`

pub mod diagnostics;

pub use diagnostics::DescriptionSyntaxError;

use miette::Diagnostic;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File every template directory must carry
pub const DESCRIPTION_FILE: &str = "template_description.json";

/// The subset of the description tfmgr reads. Unknown keys are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateDescription {
    #[serde(rename = "Name")]
    pub name: Option<String>,

    #[serde(rename = "Identifier")]
    pub identifier: Option<String>,

    #[serde(rename = "Authors")]
    pub authors: Vec<String>,

    #[serde(rename = "License", alias = "Licence")]
    pub license: Option<String>,

    /// Either an object keyed by cohort label or a list of cohorts
    #[serde(default)]
    pub cohort: Option<serde_json::Value>,

    #[serde(rename = "ReferencesAndLinks", default)]
    pub references_and_links: Vec<String>,
}

#[derive(Debug, Error)]
pub enum DescriptionError {
    #[error("Missing template description <{}>", .0.display())]
    Missing(PathBuf),

    #[error(transparent)]
    Syntax(#[from] DescriptionSyntaxError),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// Written by hand rather than derived: the derive's `transparent` forwarding
// calls `inner.help()`, which resolves to the inherent
// `DescriptionSyntaxError::help` instead of the trait method.
impl Diagnostic for DescriptionError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        match self {
            Self::Missing(_) => Some(Box::new("tfmgr::description::missing")),
            Self::Syntax(inner) => Diagnostic::code(inner),
            Self::Io { .. } => None,
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        match self {
            Self::Missing(_) => Some(Box::new(
                "every template directory needs a template_description.json",
            )),
            Self::Syntax(inner) => Diagnostic::help(inner),
            Self::Io { .. } => None,
        }
    }

    fn severity(&self) -> Option<miette::Severity> {
        match self {
            Self::Syntax(inner) => Diagnostic::severity(inner),
            _ => None,
        }
    }

    fn url<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        match self {
            Self::Syntax(inner) => Diagnostic::url(inner),
            _ => None,
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Self::Syntax(inner) => Diagnostic::source_code(inner),
            _ => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        match self {
            Self::Syntax(inner) => Diagnostic::labels(inner),
            _ => None,
        }
    }

    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn Diagnostic> + 'a>> {
        match self {
            Self::Syntax(inner) => Diagnostic::related(inner),
            _ => None,
        }
    }

    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        match self {
            Self::Syntax(inner) => Diagnostic::diagnostic_source(inner),
            _ => None,
        }
    }
}

impl TemplateDescription {
    /// Read the description inside a template directory
    pub fn load(template_dir: &Path) -> Result<Self, DescriptionError> {
        let path = template_dir.join(DESCRIPTION_FILE);
        if !path.is_file() {
            return Err(DescriptionError::Missing(path));
        }

        let source = std::fs::read_to_string(&path).map_err(|source| DescriptionError::Io {
            path: path.clone(),
            source,
        })?;

        Self::parse(&source, &path.display().to_string())
    }

    pub fn parse(source: &str, filename: &str) -> Result<Self, DescriptionError> {
        serde_json::from_str(source).map_err(|e| {
            DescriptionError::Syntax(DescriptionSyntaxError::from_serde_error(
                &e, source, filename,
            ))
        })
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<missing Name>")
    }

    pub fn display_identifier(&self) -> &str {
        self.identifier.as_deref().unwrap_or("<missing Identifier>")
    }

    pub fn display_license(&self) -> &str {
        self.license.as_deref().unwrap_or("<missing License>")
    }

    /// Number of cohorts the dataset declares
    pub fn cohort_count(&self) -> usize {
        match &self.cohort {
            Some(serde_json::Value::Object(map)) => map.len(),
            Some(serde_json::Value::Array(list)) => list.len(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const FULL: &str = r#"{
  "Name": "Fischer 344 rat brain template",
  "Identifier": "Fischer344",
  "Authors": ["Goerzen D", "Fowler C"],
  "License": "CC-BY-4.0",
  "cohort": {"1": {"age": [1]}, "2": {"age": [2]}},
  "ReferencesAndLinks": ["https://doi.org/10.1016/j.neuroimage.2020.116709"],
  "TemplateFlowVersion": "1.0.0"
}"#;

    #[test]
    fn test_parse_full_description() {
        let desc = TemplateDescription::parse(FULL, "full.json").unwrap();
        assert_eq!(desc.display_name(), "Fischer 344 rat brain template");
        assert_eq!(desc.display_identifier(), "Fischer344");
        assert_eq!(desc.authors, vec!["Goerzen D", "Fowler C"]);
        assert_eq!(desc.display_license(), "CC-BY-4.0");
        assert_eq!(desc.cohort_count(), 2);
        assert_eq!(desc.references_and_links.len(), 1);
    }

    #[test]
    fn test_fallbacks_and_licence_alias() {
        let desc =
            TemplateDescription::parse(r#"{"Authors": [], "Licence": "CC0"}"#, "x.json").unwrap();
        assert_eq!(desc.display_name(), "<missing Name>");
        assert_eq!(desc.display_identifier(), "<missing Identifier>");
        assert_eq!(desc.display_license(), "CC0");
        assert_eq!(desc.cohort_count(), 0);
        assert!(desc.references_and_links.is_empty());

        let desc = TemplateDescription::parse(r#"{"Authors": ["A"]}"#, "x.json").unwrap();
        assert_eq!(desc.display_license(), "<missing License>");
    }

    #[test]
    fn test_cohort_list() {
        let desc =
            TemplateDescription::parse(r#"{"Authors": ["A"], "cohort": [1, 2, 3]}"#, "x.json")
                .unwrap();
        assert_eq!(desc.cohort_count(), 3);
    }

    #[test]
    fn test_missing_authors_is_error() {
        let err = TemplateDescription::parse(r#"{"Name": "X"}"#, "x.json").unwrap_err();
        match err {
            DescriptionError::Syntax(diag) => {
                assert!(diag.message().contains("Authors"));
                assert!(diag.help().is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = tempdir().unwrap();
        let err = TemplateDescription::load(tmp.path()).unwrap_err();
        assert!(matches!(err, DescriptionError::Missing(_)));
        assert!(err.to_string().contains("Missing template description"));
    }

    #[test]
    fn test_load_from_directory() {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join(DESCRIPTION_FILE), FULL).unwrap();
        let desc = TemplateDescription::load(tmp.path()).unwrap();
        assert_eq!(desc.authors.len(), 2);
    }
}
