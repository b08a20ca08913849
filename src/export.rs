//! Export engine: lowers a [`ResourceSet`] into Android and Apple files.
//!
//! Resources are walked in `(group, id)` order for every locale. A resource is
//! left out of a locale when its platform set excludes the target or when
//! [`ResourceTable::should_skip`] says so. The first resource of each
//! non-empty group is preceded by a comment naming the group.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

use log::{debug, error, info};
use tokio_util::sync::CancellationToken;

use crate::{
    error::Error,
    formats::{
        self, ACCESSORS_FILE_NAME, ANDROID_FILE_NAME, ARRAYS_FILE_NAME, HELPER_FILE_NAME,
        STRINGS_FILE_NAME, STRINGSDICT_FILE_NAME, android, array_plist, strings, stringsdict,
        swift::{self, Accessor},
    },
    naming::{android_name, apple_key},
    sanitizer::{Formatter, Sanitizer},
    traits::Parser,
    types::{
        GroupId, LocaleIsoCode, Platform, Quantity, Resource, ResourceId, ResourceMetadata,
        ResourceSet, ResourceTable, ResourceType,
    },
};

/// A file that could not be produced or consumed.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: Error,
}

/// Outcome of one export run.
#[derive(Debug, Default)]
pub struct ExportReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<FileFailure>,
    /// The run stopped early; files written so far are left in place.
    pub cancelled: bool,
}

impl ExportReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }

    fn record(&mut self, path: PathBuf, result: Result<(), Error>) {
        match result {
            Ok(()) => {
                debug!("wrote {}", path.display());
                self.written.push(path);
            }
            Err(e) => {
                error!("failed to write {}: {}", path.display(), e);
                self.failed.push(FileFailure { path, error: e });
            }
        }
    }
}

/// Exports `resources` for every platform in `platforms` into the folder
/// given by `output`. Locales are the default locale plus every locale with
/// a value.
pub fn generate_files(
    resources: &ResourceSet,
    default_locale: &LocaleIsoCode,
    platforms: &BTreeSet<Platform>,
    formatters: &[Formatter],
    output: &BTreeMap<Platform, PathBuf>,
) -> ExportReport {
    generate_files_cancellable(
        resources,
        default_locale,
        platforms,
        formatters,
        output,
        &CancellationToken::new(),
    )
}

/// [`generate_files`] that stops between files once `cancel` fires.
pub fn generate_files_cancellable(
    resources: &ResourceSet,
    default_locale: &LocaleIsoCode,
    platforms: &BTreeSet<Platform>,
    formatters: &[Formatter],
    output: &BTreeMap<Platform, PathBuf>,
    cancel: &CancellationToken,
) -> ExportReport {
    let mut locales = BTreeSet::from([default_locale.clone()]);
    for resource_type in ResourceType::ALL {
        locales.extend(resources.table(resource_type).locales());
    }
    export_resources(
        resources,
        &locales,
        default_locale,
        platforms,
        formatters,
        output,
        cancel,
    )
}

pub(crate) fn export_resources(
    resources: &ResourceSet,
    locales: &BTreeSet<LocaleIsoCode>,
    default_locale: &LocaleIsoCode,
    platforms: &BTreeSet<Platform>,
    formatters: &[Formatter],
    output: &BTreeMap<Platform, PathBuf>,
    cancel: &CancellationToken,
) -> ExportReport {
    let mut report = ExportReport::default();
    let walk = ExportWalk {
        resources,
        order: ordered_entries(resources),
        default_locale,
    };

    for platform in platforms {
        let Some(root) = output.get(platform) else {
            error!("no output location for {}, skipping", platform);
            continue;
        };
        let sanitizer = Sanitizer::new(formatters, *platform);
        let completed = match platform {
            Platform::Android => walk.android(root, locales, &sanitizer, cancel, &mut report),
            Platform::Ios => walk.ios(root, locales, &sanitizer, cancel, &mut report),
        };
        if !completed {
            report.cancelled = true;
            info!("export cancelled after {} files", report.written.len());
            return report;
        }
    }

    info!(
        "exported {} files ({} failed)",
        report.written.len(),
        report.failed.len()
    );
    report
}

struct Entry<'a> {
    resource_type: ResourceType,
    id: &'a ResourceId,
    metadata: &'a ResourceMetadata,
}

impl Entry<'_> {
    fn group(&self) -> &GroupId {
        &self.metadata.group
    }
}

/// Every resource of every type, sorted by group, then id, then type.
fn ordered_entries(resources: &ResourceSet) -> Vec<Entry<'_>> {
    let mut entries: Vec<Entry<'_>> = ResourceType::ALL
        .iter()
        .flat_map(|&resource_type| {
            resources
                .table(resource_type)
                .metadata
                .iter()
                .map(move |(id, metadata)| Entry {
                    resource_type,
                    id,
                    metadata,
                })
        })
        .collect();
    entries.sort_by(|a, b| {
        (a.group(), a.id, a.resource_type).cmp(&(b.group(), b.id, b.resource_type))
    });
    entries
}

/// Emits a group comment the first time each non-empty group shows up.
#[derive(Default)]
struct GroupTracker<'a> {
    current: Option<&'a GroupId>,
}

impl<'a> GroupTracker<'a> {
    fn enter(&mut self, group: &'a GroupId) -> Option<String> {
        if group.is_empty() || self.current == Some(group) {
            return None;
        }
        self.current = Some(group);
        Some(group.to_string())
    }
}

struct ExportWalk<'a> {
    resources: &'a ResourceSet,
    order: Vec<Entry<'a>>,
    default_locale: &'a LocaleIsoCode,
}

impl<'a> ExportWalk<'a> {
    fn table(&self, resource_type: ResourceType) -> &'a ResourceTable {
        self.resources.table(resource_type)
    }

    /// Entries exported to `platform` for `locale`, in walk order.
    fn included(
        &self,
        platform: Platform,
        locale: &LocaleIsoCode,
    ) -> impl Iterator<Item = &Entry<'a>> {
        self.order.iter().filter(move |entry| {
            entry.metadata.is_on(platform)
                && !self
                    .table(entry.resource_type)
                    .should_skip(entry.id, locale, self.default_locale)
        })
    }

    fn value(&self, entry: &Entry<'_>, locale: &LocaleIsoCode) -> Resource {
        let stored = self.table(entry.resource_type).get(entry.id, locale).cloned();
        match entry.resource_type {
            ResourceType::Strings => stored.unwrap_or_else(|| Resource::str("")),
            ResourceType::Plurals => stored.unwrap_or_else(|| Resource::plural([])),
            ResourceType::Arrays => {
                let mut items = match stored {
                    Some(Resource::StringArray { items }) => items,
                    _ => Vec::new(),
                };
                items.resize(entry.metadata.size.max(items.len()), String::new());
                Resource::StringArray { items }
            }
        }
    }

    /// Returns false when cancelled.
    fn android(
        &self,
        root: &Path,
        locales: &BTreeSet<LocaleIsoCode>,
        sanitizer: &Sanitizer,
        cancel: &CancellationToken,
        report: &mut ExportReport,
    ) -> bool {
        for locale in locales {
            if cancel.is_cancelled() {
                return false;
            }
            let mut groups = GroupTracker::default();
            let mut document = android::Format::default();

            for entry in self.included(Platform::Android, locale) {
                if let Some(comment) = groups.enter(entry.group()) {
                    document.nodes.push(android::Node::Comment(comment));
                }
                let name = android_name(entry.id.as_str());
                let node = match self.value(entry, locale) {
                    Resource::Str { text } => android::Node::String {
                        name,
                        value: sanitizer.sanitize(&text, true),
                    },
                    Resource::Plural { items } => android::Node::Plurals {
                        name,
                        items: sanitize_plural(&items, sanitizer, true),
                    },
                    Resource::StringArray { items } => android::Node::StringArray {
                        name,
                        items: items.iter().map(|t| sanitizer.sanitize(t, true)).collect(),
                    },
                };
                document.nodes.push(node);
            }

            let path = root
                .join(formats::android_folder(locale, self.default_locale))
                .join(ANDROID_FILE_NAME);
            report.record(path.clone(), document.write_to(&path));
        }
        true
    }

    /// Returns false when cancelled.
    fn ios(
        &self,
        root: &Path,
        locales: &BTreeSet<LocaleIsoCode>,
        sanitizer: &Sanitizer,
        cancel: &CancellationToken,
        report: &mut ExportReport,
    ) -> bool {
        for locale in locales {
            if cancel.is_cancelled() {
                return false;
            }
            let mut strings_doc = strings::Format::default();
            let mut plurals_doc = stringsdict::Format::default();
            let mut arrays_doc = array_plist::Format::default();
            let mut string_groups = GroupTracker::default();
            let mut plural_groups = GroupTracker::default();
            let mut array_groups = GroupTracker::default();

            for entry in self.included(Platform::Ios, locale) {
                let key = apple_key(entry.id.as_str());
                match self.value(entry, locale) {
                    Resource::Str { text } => {
                        if let Some(comment) = string_groups.enter(entry.group()) {
                            strings_doc.items.push(strings::Item::Comment(comment));
                        }
                        strings_doc.items.push(strings::Item::Pair {
                            key,
                            value: sanitizer.sanitize(&text, false),
                        });
                    }
                    Resource::Plural { items } => {
                        if let Some(comment) = plural_groups.enter(entry.group()) {
                            plurals_doc.nodes.push(stringsdict::Node::Comment(comment));
                        }
                        plurals_doc.nodes.push(stringsdict::Node::Plural {
                            key,
                            items: sanitize_plural(&items, sanitizer, true),
                        });
                    }
                    Resource::StringArray { items } => {
                        if let Some(comment) = array_groups.enter(entry.group()) {
                            arrays_doc.nodes.push(array_plist::Node::Comment(comment));
                        }
                        arrays_doc.nodes.push(array_plist::Node::Array {
                            key,
                            items: items.iter().map(|t| sanitizer.sanitize(t, true)).collect(),
                        });
                    }
                }
            }

            let folder = root.join(formats::apple_folder(locale));
            let path = folder.join(STRINGS_FILE_NAME);
            report.record(path.clone(), strings_doc.write_to(&path));
            if cancel.is_cancelled() {
                return false;
            }
            let path = folder.join(STRINGSDICT_FILE_NAME);
            report.record(path.clone(), plurals_doc.write_to(&path));
            if cancel.is_cancelled() {
                return false;
            }
            let path = folder.join(ARRAYS_FILE_NAME);
            report.record(path.clone(), arrays_doc.write_to(&path));
        }

        if cancel.is_cancelled() {
            return false;
        }
        let path = root.join(ACCESSORS_FILE_NAME);
        report.record(path.clone(), swift::write_accessors(&path, &self.accessors()));

        let path = root.join(HELPER_FILE_NAME);
        match swift::write_helper(&path) {
            Ok(true) => report.record(path, Ok(())),
            Ok(false) => debug!("kept existing {}", path.display()),
            Err(e) => report.record(path, Err(e)),
        }
        true
    }

    /// One accessor per Apple resource, with its default-locale example text.
    fn accessors(&self) -> Vec<Accessor> {
        self.order
            .iter()
            .filter(|entry| entry.metadata.is_on(Platform::Ios))
            .map(|entry| {
                let example = match self.value(entry, self.default_locale) {
                    Resource::Str { text } => text,
                    Resource::Plural { items } => {
                        items.get(&Quantity::Other).cloned().unwrap_or_default()
                    }
                    Resource::StringArray { items } => {
                        items.into_iter().next().unwrap_or_default()
                    }
                };
                Accessor {
                    resource_type: entry.resource_type,
                    group: entry.group().to_string(),
                    id: entry.id.to_string(),
                    example,
                }
            })
            .collect()
    }
}

fn sanitize_plural(
    items: &BTreeMap<Quantity, String>,
    sanitizer: &Sanitizer,
    is_xml: bool,
) -> Vec<(Quantity, String)> {
    items
        .iter()
        .map(|(quantity, text)| (*quantity, sanitizer.sanitize(text, is_xml)))
        .collect()
}
