//! Import engine: reads Android and Apple files back into a project.
//!
//! Files are discovered below one or more roots, parsed one at a time in
//! lexicographic path order, unescaped to authoring text and merged into the
//! project. A malformed file is reported and skipped; the rest of the batch
//! still runs.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

use ignore::WalkBuilder;
use log::{debug, error, info, warn};

use crate::{
    error::Error,
    export::FileFailure,
    formats::{
        self, ARRAYS_FILE_NAME, STRINGS_FILE_NAME, STRINGSDICT_FILE_NAME, android, array_plist,
        strings, stringsdict,
    },
    naming::{id_from_android_name, to_lower_camel_case},
    placeholder::{unescape_android, unescape_ios},
    project::Project,
    settings::ImportOptions,
    traits::Parser,
    types::{LocaleIsoCode, Platform, Quantity, Resource, ResourceId, ResourceType},
};

/// Everything read from one file, in authoring syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedResources {
    pub locale: LocaleIsoCode,
    pub strings: BTreeMap<ResourceId, String>,
    pub plurals: BTreeMap<ResourceId, BTreeMap<Quantity, String>>,
    pub arrays: BTreeMap<ResourceId, Vec<String>>,
}

impl ImportedResources {
    pub fn new(locale: LocaleIsoCode) -> Self {
        Self {
            locale,
            strings: BTreeMap::new(),
            plurals: BTreeMap::new(),
            arrays: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty() && self.plurals.is_empty() && self.arrays.is_empty()
    }

    pub fn len(&self) -> usize {
        self.strings.len() + self.plurals.len() + self.arrays.len()
    }
}

/// Outcome of one import run.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<FileFailure>,
    /// The run stopped early; files merged so far stay merged.
    pub cancelled: bool,
}

impl ImportReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }
}

fn parse_id(raw: &str, id: String) -> Option<ResourceId> {
    match ResourceId::new(&id) {
        Ok(id) => Some(id),
        Err(e) => {
            warn!("skipping `{}`: {}", raw, e);
            None
        }
    }
}

fn folder_name(path: &Path) -> Result<&str, Error> {
    path.parent()
        .and_then(Path::file_name)
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            Error::InvalidResource(format!("{} has no locale folder", path.display()))
        })
}

/// Whether `path` is a file of `platform` by folder and file name.
pub fn is_candidate(path: &Path, platform: Platform) -> bool {
    let (Ok(folder), Some(file_name)) = (
        folder_name(path),
        path.file_name().and_then(|name| name.to_str()),
    ) else {
        return false;
    };
    match platform {
        Platform::Android => {
            if !file_name.ends_with(".xml") {
                return false;
            }
            let is_locale_folder = formats::is_android_folder(folder);
            if !is_locale_folder && folder.starts_with("values-") {
                debug!("skipping {}: `{}` is not a locale folder", path.display(), folder);
            }
            is_locale_folder
        }
        Platform::Ios => {
            formats::is_apple_folder(folder)
                && [STRINGS_FILE_NAME, STRINGSDICT_FILE_NAME, ARRAYS_FILE_NAME].contains(&file_name)
        }
    }
}

/// Candidate files of `platform` below `root`, sorted by path.
pub fn discover_files(root: &Path, platform: Platform) -> Vec<PathBuf> {
    let walker = WalkBuilder::new(root)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .hidden(false)
        .ignore(false)
        .parents(false)
        .build();

    let mut files = Vec::new();
    for dent in walker {
        let dent = match dent {
            Ok(d) => d,
            Err(e) => {
                warn!("skipping unreadable entry below {}: {}", root.display(), e);
                continue;
            }
        };
        if !dent.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        if is_candidate(dent.path(), platform) {
            files.push(dent.into_path());
        }
    }
    files.sort();
    files
}

/// Parses one file of `platform`. The locale comes from the parent folder.
pub fn parse_file(
    path: &Path,
    platform: Platform,
    default_locale: &LocaleIsoCode,
) -> Result<ImportedResources, Error> {
    match platform {
        Platform::Android => parse_android(path, default_locale),
        Platform::Ios => parse_apple(path),
    }
}

fn parse_android(path: &Path, default_locale: &LocaleIsoCode) -> Result<ImportedResources, Error> {
    let locale = formats::locale_from_android_folder(folder_name(path)?, default_locale)?;
    let document = android::Format::read_from(path)?;
    let mut imported = ImportedResources::new(locale);

    for node in document.nodes {
        match node {
            android::Node::Comment(_) => {}
            android::Node::String { name, value } => {
                if let Some(id) = parse_id(&name, id_from_android_name(&name)) {
                    imported.strings.insert(id, unescape_android(&value));
                }
            }
            android::Node::Plurals { name, items } => {
                if let Some(id) = parse_id(&name, id_from_android_name(&name)) {
                    let items = items
                        .into_iter()
                        .map(|(quantity, text)| (quantity, unescape_android(&text)))
                        .collect();
                    imported.plurals.insert(id, items);
                }
            }
            android::Node::StringArray { name, items } => {
                if let Some(id) = parse_id(&name, id_from_android_name(&name)) {
                    let items = items.iter().map(|text| unescape_android(text)).collect();
                    imported.arrays.insert(id, items);
                }
            }
        }
    }
    Ok(imported)
}

fn parse_apple(path: &Path) -> Result<ImportedResources, Error> {
    let locale = formats::locale_from_apple_folder(folder_name(path)?)?;
    let mut imported = ImportedResources::new(locale);
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();

    match file_name {
        STRINGS_FILE_NAME => {
            let document = strings::Format::read_from(path)?;
            for (key, value) in document.pairs() {
                if let Some(id) = parse_id(key, to_lower_camel_case(key)) {
                    imported.strings.insert(id, unescape_ios(value));
                }
            }
        }
        STRINGSDICT_FILE_NAME => {
            let document = stringsdict::Format::read_from(path)?;
            for (key, items) in document.plurals() {
                if let Some(id) = parse_id(key, to_lower_camel_case(key)) {
                    let items = items
                        .iter()
                        .map(|(quantity, text)| (*quantity, unescape_ios(text)))
                        .collect();
                    imported.plurals.insert(id, items);
                }
            }
        }
        ARRAYS_FILE_NAME => {
            let document = array_plist::Format::read_from(path)?;
            for (key, items) in document.arrays() {
                if let Some(id) = parse_id(key, to_lower_camel_case(key)) {
                    let items = items.iter().map(|text| unescape_ios(text)).collect();
                    imported.arrays.insert(id, items);
                }
            }
        }
        _ => {
            return Err(Error::InvalidResource(format!(
                "{} is not an Apple resource file",
                path.display()
            )));
        }
    }
    Ok(imported)
}

/// Merge state shared by every file of one import run.
///
/// Ids created by this session target only the session's platform. Ids that
/// already existed keep their platform set.
#[derive(Debug)]
pub struct ImportSession {
    platform: Platform,
    overwrite: bool,
    created: BTreeSet<(ResourceType, ResourceId)>,
}

impl ImportSession {
    pub fn new(platform: Platform, overwrite: bool) -> Self {
        Self {
            platform,
            overwrite,
            created: BTreeSet::new(),
        }
    }

    /// Ids this session has created so far.
    pub fn created(&self) -> impl Iterator<Item = &(ResourceType, ResourceId)> {
        self.created.iter()
    }

    /// Merges `imported` into `target`. Values that fail validation are
    /// logged and skipped. Returns how many values changed.
    pub fn merge_with(&mut self, imported: &ImportedResources, target: &mut Project) -> usize {
        let locale = &imported.locale;
        if target.add_locale(locale.clone()) {
            info!("added locale `{}` found during import", locale);
        }

        let mut changed = 0;
        let mut tally = |id: &ResourceId, result: Result<bool, Error>| match result {
            Ok(true) => changed += 1,
            Ok(false) => {}
            Err(e) => warn!("skipping `{}` for `{}`: {}", id, locale, e),
        };

        for (id, text) in &imported.strings {
            tally(id, self.merge_string(target, id, locale, text));
        }
        for (id, items) in &imported.plurals {
            tally(id, self.merge_plural(target, id, locale, items));
        }
        for (id, items) in &imported.arrays {
            tally(id, self.merge_array(target, id, locale, items));
        }
        changed
    }

    /// Resolves `id` to the target's id, creating it when nothing collides.
    /// Returns the id to write to and whether this call created it.
    fn ensure_resource(
        &mut self,
        target: &mut Project,
        resource_type: ResourceType,
        id: &ResourceId,
    ) -> Result<(ResourceId, bool), Error> {
        let store = target.store_mut(resource_type);
        if let Some(existing) = store.conflicting_id(id) {
            if existing != id {
                debug!("merging imported `{}` into existing `{}`", id, existing);
            }
            return Ok((existing.clone(), false));
        }
        store.create_resource(id.clone())?;
        store.set_platforms(id, BTreeSet::from([self.platform]))?;
        self.created.insert((resource_type, id.clone()));
        debug!("created {} `{}` for {}", resource_type, id, self.platform);
        Ok((id.clone(), true))
    }

    /// Runs `apply` on the resolved id. A resource created for it is removed
    /// again when `apply` fails, so rejected values leave nothing behind.
    fn merge_into(
        &mut self,
        target: &mut Project,
        resource_type: ResourceType,
        id: &ResourceId,
        apply: impl FnOnce(&mut Project, &ResourceId) -> Result<bool, Error>,
    ) -> Result<bool, Error> {
        let (id, created) = self.ensure_resource(target, resource_type, id)?;
        let result = apply(target, &id);
        if result.is_err() && created {
            target.store_mut(resource_type).remove_resource(&id)?;
            self.created.remove(&(resource_type, id.clone()));
            debug!("dropped {} `{}`, its imported value was rejected", resource_type, id);
        }
        result
    }

    fn merge_string(
        &mut self,
        target: &mut Project,
        id: &ResourceId,
        locale: &LocaleIsoCode,
        text: &str,
    ) -> Result<bool, Error> {
        if text.is_empty() {
            return Ok(false);
        }
        let overwrite = self.overwrite;
        self.merge_into(target, ResourceType::Strings, id, |target, id| {
            let existing = target.localized_value(ResourceType::Strings, id, locale);
            let value = Resource::str(text);
            if existing == Some(&value) || (!overwrite && existing.is_some()) {
                return Ok(false);
            }
            target.update_localized_value(id, locale, value)?;
            Ok(true)
        })
    }

    fn merge_plural(
        &mut self,
        target: &mut Project,
        id: &ResourceId,
        locale: &LocaleIsoCode,
        items: &BTreeMap<Quantity, String>,
    ) -> Result<bool, Error> {
        if items.values().all(String::is_empty) {
            return Ok(false);
        }
        let overwrite = self.overwrite;
        self.merge_into(target, ResourceType::Plurals, id, |target, id| {
            let existing = target.localized_value(ResourceType::Plurals, id, locale);
            let mut merged = match existing {
                Some(Resource::Plural { items }) if !overwrite => items.clone(),
                _ => BTreeMap::new(),
            };
            for (quantity, text) in items {
                if !text.is_empty() && (overwrite || !merged.contains_key(quantity)) {
                    merged.insert(*quantity, text.clone());
                }
            }

            let value = Resource::plural(merged);
            if existing == Some(&value) {
                return Ok(false);
            }
            target.update_localized_value(id, locale, value)?;
            Ok(true)
        })
    }

    fn merge_array(
        &mut self,
        target: &mut Project,
        id: &ResourceId,
        locale: &LocaleIsoCode,
        items: &[String],
    ) -> Result<bool, Error> {
        if items.iter().all(String::is_empty) {
            return Ok(false);
        }
        let overwrite = self.overwrite;
        self.merge_into(target, ResourceType::Arrays, id, |target, id| {
            let current_size = target
                .store(ResourceType::Arrays)
                .metadata(id)
                .map_or(0, |m| m.size);
            let size = if overwrite || current_size == 0 {
                items.len()
            } else {
                current_size
            };
            if size != current_size {
                target.store_mut(ResourceType::Arrays).resize_array(id, size)?;
            }

            let existing = target.localized_value(ResourceType::Arrays, id, locale);
            let mut merged = match existing {
                Some(Resource::StringArray { items }) if !overwrite => items.clone(),
                _ => Vec::new(),
            };
            merged.resize(size, String::new());
            for (slot, text) in merged.iter_mut().zip(items) {
                if !text.is_empty() && (overwrite || slot.is_empty()) {
                    *slot = text.clone();
                }
            }

            let value = Resource::array(merged);
            if existing == Some(&value) {
                return Ok(false);
            }
            target.update_localized_value(id, locale, value)?;
            Ok(true)
        })
    }
}

/// Imports every candidate file below `roots` into `project`.
pub fn import_files(project: &mut Project, roots: &[&Path], options: &ImportOptions) -> ImportReport {
    let mut files: Vec<PathBuf> = roots
        .iter()
        .flat_map(|root| discover_files(root, options.platform))
        .collect();
    files.sort();
    files.dedup();

    let mut report = ImportReport::default();
    let mut session = ImportSession::new(options.platform, options.overwrite);

    for path in files {
        if options.cancel.is_cancelled() {
            report.cancelled = true;
            info!("import cancelled after {} files", report.succeeded.len());
            return report;
        }
        match parse_file(&path, options.platform, project.default_locale()) {
            Ok(imported) => {
                let changed = session.merge_with(&imported, project);
                debug!(
                    "imported {} ({} entries, {} changed)",
                    path.display(),
                    imported.len(),
                    changed
                );
                report.succeeded.push(path);
            }
            Err(e) => {
                error!("failed to import {}: {}", path.display(), e);
                let error = Error::import_error(&path, e);
                report.failed.push(FileFailure { path, error });
            }
        }
    }

    info!(
        "imported {} files ({} failed)",
        report.succeeded.len(),
        report.failed.len()
    );
    report
}
