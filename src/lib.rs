#![forbid(unsafe_code)]
//! Localizable resource persistence and cross-platform conversion for Rust.
//!
//! Stores simple strings, plurals and string arrays in flat, human-editable
//! properties files, exports them to Android `strings.xml` and Apple
//! `.strings` / `.stringsdict` / property list files, and imports those files
//! back under an overwrite policy.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use locforge::{ExportOptions, LocaleIsoCode, Platform, Project, Resource, ResourceId, ResourceType};
//!
//! let en = LocaleIsoCode::new("en")?;
//! let mut project = Project::create("my-project", en.clone())?;
//! let greeting = ResourceId::new("greeting")?;
//! project.create_resource(greeting.clone(), ResourceType::Strings)?;
//! project.update_localized_value(&greeting, &en, Resource::str("Hello %s"))?;
//!
//! let report = project.export(
//!     &ExportOptions::new()
//!         .with_output(Platform::Android, "out/android/res")
//!         .with_output(Platform::Ios, "out/ios"),
//! )?;
//! assert!(report.is_success());
//! project.flush();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Backing files
//!
//! - `project.properties`: default locale, locales and export folders
//! - `strings.properties`, `plurals.properties`, `arrays.properties`: one file
//!   per resource type, keyed `<id>.<locale>[.<quantity|index>]`
//!
//! Saves happen on a background thread; [`Project::flush`] waits for them.

pub mod error;
pub mod export;
pub mod formats;
pub mod import;
pub mod naming;
pub mod persist;
pub mod placeholder;
pub mod project;
pub mod properties;
pub mod sanitizer;
pub mod settings;
pub mod store;
pub mod traits;
pub mod types;

// Re-export most used types for easy consumption
pub use crate::{
    error::Error,
    export::{ExportReport, FileFailure, generate_files, generate_files_cancellable},
    import::{ImportReport, ImportSession, ImportedResources},
    project::Project,
    sanitizer::{Formatter, Sanitizer},
    settings::{ExportOptions, ImportOptions, ProjectSettings},
    store::ResourceStore,
    types::{
        GroupId, LocaleIsoCode, Platform, Quantity, Resource, ResourceId, ResourceMetadata,
        ResourceSet, ResourceTable, ResourceType,
    },
};
