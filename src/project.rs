//! One open project: its settings and the three resource stores.
//!
//! A project lives in one folder holding `project.properties` plus one
//! properties file per resource type. Every mutation is saved in the
//! background; call [`Project::flush`] to wait for the disk.

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use log::info;

use crate::{
    error::Error,
    export::{self, ExportReport},
    import::{self, ImportReport},
    persist::Saver,
    properties::PropertiesStore,
    settings::{ExportOptions, ImportOptions, PROJECT_FILE_NAME, ProjectSettings},
    store::ResourceStore,
    types::{LocaleIsoCode, Platform, Quantity, Resource, ResourceId, ResourceSet, ResourceType},
};

#[derive(Debug)]
pub struct Project {
    dir: PathBuf,
    settings: ProjectSettings,
    settings_store: PropertiesStore,
    strings: ResourceStore,
    plurals: ResourceStore,
    arrays: ResourceStore,
}

impl Project {
    /// Creates a new project in `dir`. Fails when `dir` already holds one.
    pub fn create<P: AsRef<Path>>(dir: P, default_locale: LocaleIsoCode) -> Result<Self, Error> {
        let dir = dir.as_ref();
        let settings_path = dir.join(PROJECT_FILE_NAME);
        if settings_path.exists() {
            return Err(Error::ProjectExists(dir.to_path_buf()));
        }
        std::fs::create_dir_all(dir)?;

        let saver = Saver::spawn()?;
        let mut settings_store = PropertiesStore::open(&settings_path, saver.clone())?;
        let settings = ProjectSettings::new(default_locale);
        settings.store(&mut settings_store);
        info!("created project in {}", dir.display());
        Self::with_settings(dir, settings, settings_store, saver)
    }

    /// Opens the project stored in `dir`.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, Error> {
        let dir = dir.as_ref();
        let saver = Saver::spawn()?;
        let settings_store = PropertiesStore::open(dir.join(PROJECT_FILE_NAME), saver.clone())?;
        let settings = ProjectSettings::from_properties(&settings_store)?;
        Self::with_settings(dir, settings, settings_store, saver)
    }

    fn with_settings(
        dir: &Path,
        settings: ProjectSettings,
        settings_store: PropertiesStore,
        saver: Saver,
    ) -> Result<Self, Error> {
        Ok(Self {
            dir: dir.to_path_buf(),
            settings,
            settings_store,
            strings: ResourceStore::open(dir, ResourceType::Strings, saver.clone())?,
            plurals: ResourceStore::open(dir, ResourceType::Plurals, saver.clone())?,
            arrays: ResourceStore::open(dir, ResourceType::Arrays, saver)?,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn settings(&self) -> &ProjectSettings {
        &self.settings
    }

    pub fn default_locale(&self) -> &LocaleIsoCode {
        &self.settings.default_locale
    }

    pub fn locales(&self) -> &BTreeSet<LocaleIsoCode> {
        &self.settings.locales
    }

    pub fn store(&self, resource_type: ResourceType) -> &ResourceStore {
        match resource_type {
            ResourceType::Strings => &self.strings,
            ResourceType::Plurals => &self.plurals,
            ResourceType::Arrays => &self.arrays,
        }
    }

    /// Direct access to a store for metadata and structural edits.
    pub fn store_mut(&mut self, resource_type: ResourceType) -> &mut ResourceStore {
        match resource_type {
            ResourceType::Strings => &mut self.strings,
            ResourceType::Plurals => &mut self.plurals,
            ResourceType::Arrays => &mut self.arrays,
        }
    }

    fn save_settings(&mut self) {
        self.settings.store(&mut self.settings_store);
    }

    /// Adds `locale` to the project. Returns false if it was already known.
    pub fn add_locale(&mut self, locale: LocaleIsoCode) -> bool {
        if !self.settings.locales.insert(locale) {
            return false;
        }
        self.save_settings();
        true
    }

    /// Removes `locale` and every value stored for it.
    pub fn delete_locale(&mut self, locale: &LocaleIsoCode) -> Result<(), Error> {
        if locale == self.default_locale() {
            return Err(Error::validation_error(format!(
                "cannot delete the default locale `{}`",
                locale
            )));
        }
        for resource_type in ResourceType::ALL {
            self.store_mut(resource_type).delete_locale(locale);
        }
        if self.settings.locales.remove(locale) {
            self.save_settings();
        }
        Ok(())
    }

    pub fn set_default_locale(&mut self, locale: LocaleIsoCode) -> Result<(), Error> {
        self.require_locale(&locale)?;
        self.settings.default_locale = locale;
        self.save_settings();
        Ok(())
    }

    /// Sets the folder `platform` exports to when no output is given.
    pub fn set_export_url(&mut self, platform: Platform, path: impl Into<PathBuf>) {
        self.settings.export_urls.insert(platform, path.into());
        self.save_settings();
    }

    fn require_locale(&self, locale: &LocaleIsoCode) -> Result<(), Error> {
        if self.settings.locales.contains(locale) {
            Ok(())
        } else {
            Err(Error::validation_error(format!(
                "locale `{}` is not part of the project",
                locale
            )))
        }
    }

    pub fn create_resource(
        &mut self,
        id: ResourceId,
        resource_type: ResourceType,
    ) -> Result<(), Error> {
        self.store_mut(resource_type).create_resource(id)
    }

    /// Upserts one localized value. The locale must belong to the project, and
    /// a default-locale plural must carry `other`.
    pub fn update_localized_value(
        &mut self,
        id: &ResourceId,
        locale: &LocaleIsoCode,
        value: Resource,
    ) -> Result<(), Error> {
        self.require_locale(locale)?;
        if let Resource::Plural { items } = &value {
            let has_other = items.get(&Quantity::Other).is_some_and(|v| !v.is_empty());
            if locale == self.default_locale() && !value.is_empty() && !has_other {
                return Err(Error::validation_error(format!(
                    "plural `{}` needs an `other` value in the default locale",
                    id
                )));
            }
        }
        self.store_mut(value.resource_type())
            .update_localized_value(id, locale, value)
    }

    /// The value of `id` for `locale`, if any.
    pub fn localized_value(
        &self,
        resource_type: ResourceType,
        id: &ResourceId,
        locale: &LocaleIsoCode,
    ) -> Option<&Resource> {
        self.store(resource_type).get(id, locale)
    }

    /// The default-locale value of `id`, which every resource must have.
    pub fn required_value(
        &self,
        resource_type: ResourceType,
        id: &ResourceId,
    ) -> Result<&Resource, Error> {
        let store = self.store(resource_type);
        if !store.contains(id) {
            return Err(Error::UnknownResource(id.to_string()));
        }
        let missing = || {
            Error::MissingValue(format!(
                "`{}` has no value for the default locale `{}`",
                id,
                self.default_locale()
            ))
        };
        let value = store.get(id, self.default_locale()).ok_or_else(missing)?;
        match value {
            Resource::Plural { items } if !items.contains_key(&Quantity::Other) => Err(missing()),
            value => Ok(value),
        }
    }

    /// A copy of every table, for export and import walks.
    pub fn snapshot(&self) -> ResourceSet {
        ResourceSet {
            strings: self.strings.table().clone(),
            plurals: self.plurals.table().clone(),
            arrays: self.arrays.table().clone(),
        }
    }

    /// Exports every requested platform. Each platform needs an output folder,
    /// from `options` or from the project settings.
    pub fn export(&self, options: &ExportOptions) -> Result<ExportReport, Error> {
        let mut output = options.output.clone();
        for platform in &options.platforms {
            if output.contains_key(platform) {
                continue;
            }
            let url = self.settings.export_url(*platform).ok_or_else(|| {
                Error::MissingValue(format!("no export location for {}", platform))
            })?;
            output.insert(*platform, self.dir.join(url));
        }

        let resources = self.snapshot();
        let mut locales = self.settings.locales.clone();
        locales.extend(ResourceType::ALL.iter().flat_map(|t| resources.table(*t).locales()));

        Ok(export::export_resources(
            &resources,
            &locales,
            self.default_locale(),
            &options.platforms,
            &options.formatters,
            &output,
            &options.cancel,
        ))
    }

    /// Imports every matching file below `root` and merges it in.
    pub fn import<P: AsRef<Path>>(&mut self, root: P, options: &ImportOptions) -> ImportReport {
        import::import_files(self, &[root.as_ref()], options)
    }

    /// Blocks until every pending save has reached the disk.
    pub fn flush(&self) {
        self.settings_store.flush();
    }
}
