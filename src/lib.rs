//! tfmanager: the TemplateFlow Archive manager
//!
//! Helps contributors upload templates to OSF storage and open intake pull
//! requests against the TemplateFlow Archive.

pub mod cli;
pub mod core;
pub mod description;
