//! Project configuration and the option structs of export and import.
//!
//! `project.properties` keys:
//!
//! | Key | Value |
//! |---|---|
//! | `defaultLocale` | normalized locale code |
//! | `locales` | comma-joined locale codes, default included |
//! | `exportUrls.<PLATFORM>` | output folder of the platform |

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    str::FromStr,
};

use log::warn;
use tokio_util::sync::CancellationToken;

use crate::{
    error::Error,
    properties::PropertiesStore,
    sanitizer::Formatter,
    types::{LocaleIsoCode, Platform},
};

pub const PROJECT_FILE_NAME: &str = "project.properties";

const DEFAULT_LOCALE_KEY: &str = "defaultLocale";
const LOCALES_KEY: &str = "locales";
const EXPORT_URL_PREFIX: &str = "exportUrls.";

/// Project-wide settings. The default locale is always part of `locales`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSettings {
    pub default_locale: LocaleIsoCode,
    pub locales: BTreeSet<LocaleIsoCode>,
    pub export_urls: BTreeMap<Platform, PathBuf>,
}

impl ProjectSettings {
    pub fn new(default_locale: LocaleIsoCode) -> Self {
        Self {
            locales: BTreeSet::from([default_locale.clone()]),
            default_locale,
            export_urls: BTreeMap::new(),
        }
    }

    /// Reads the settings stored in `props`.
    pub fn from_properties(props: &PropertiesStore) -> Result<Self, Error> {
        let default_locale = props
            .get(DEFAULT_LOCALE_KEY)
            .ok_or_else(|| {
                Error::MissingValue(format!(
                    "`{}` in {}",
                    DEFAULT_LOCALE_KEY,
                    props.path().display()
                ))
            })
            .and_then(LocaleIsoCode::new)?;

        let mut settings = Self::new(default_locale);
        for code in props.get(LOCALES_KEY).unwrap_or_default().split(',') {
            if code.trim().is_empty() {
                continue;
            }
            match LocaleIsoCode::new(code) {
                Ok(locale) => {
                    settings.locales.insert(locale);
                }
                Err(e) => warn!("ignoring stored locale `{}`: {}", code, e),
            }
        }

        for (key, value) in props.iter() {
            let Some(name) = key.strip_prefix(EXPORT_URL_PREFIX) else {
                continue;
            };
            match Platform::from_str(name) {
                Ok(platform) => {
                    settings.export_urls.insert(platform, PathBuf::from(value));
                }
                Err(e) => warn!("ignoring `{}`: {}", key, e),
            }
        }
        Ok(settings)
    }

    /// Every key this struct owns, rendered for the store.
    pub fn to_properties(&self) -> BTreeMap<String, String> {
        let mut entries = BTreeMap::new();
        entries.insert(
            DEFAULT_LOCALE_KEY.to_string(),
            self.default_locale.to_string(),
        );
        entries.insert(
            LOCALES_KEY.to_string(),
            self.locales
                .iter()
                .map(LocaleIsoCode::as_str)
                .collect::<Vec<_>>()
                .join(","),
        );
        for (platform, url) in &self.export_urls {
            entries.insert(
                format!("{}{}", EXPORT_URL_PREFIX, platform.name()),
                url.to_string_lossy().into_owned(),
            );
        }
        entries
    }

    /// Replaces the contents of `props` with these settings and saves.
    pub fn store(&self, props: &mut PropertiesStore) {
        let entries = self.to_properties();
        props.batch(|batch| {
            let stale: Vec<String> = batch
                .keys()
                .filter(|key| !entries.contains_key(*key))
                .cloned()
                .collect();
            for key in stale {
                batch.remove(&key);
            }
            for (key, value) in &entries {
                batch.put(key, value);
            }
        });
    }

    pub fn export_url(&self, platform: Platform) -> Option<&Path> {
        self.export_urls.get(&platform).map(PathBuf::as_path)
    }
}

/// Options of one export run.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Output folder per platform. Platforms without one fall back to the
    /// project's `exportUrls`.
    pub output: BTreeMap<Platform, PathBuf>,
    /// Substitution rules applied to every exported text.
    pub formatters: Vec<Formatter>,
    /// Platforms to generate.
    pub platforms: BTreeSet<Platform>,
    /// Checked between files.
    pub cancel: CancellationToken,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            output: BTreeMap::new(),
            formatters: Formatter::defaults(),
            platforms: Platform::all(),
            cancel: CancellationToken::new(),
        }
    }
}

impl ExportOptions {
    /// Creates default export options: every platform, default formatters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the output folder of `platform`.
    pub fn with_output(mut self, platform: Platform, path: impl Into<PathBuf>) -> Self {
        self.output.insert(platform, path.into());
        self
    }

    pub fn with_formatters(mut self, formatters: Vec<Formatter>) -> Self {
        self.formatters = formatters;
        self
    }

    /// Restricts the run to `platforms`.
    pub fn with_platforms(mut self, platforms: impl IntoIterator<Item = Platform>) -> Self {
        self.platforms = platforms.into_iter().collect();
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Options of one import run.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Format of the files being imported.
    pub platform: Platform,
    /// Replace existing values instead of only filling gaps.
    pub overwrite: bool,
    /// Checked between files.
    pub cancel: CancellationToken,
}

impl ImportOptions {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            overwrite: false,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::Saver;

    fn locale(code: &str) -> LocaleIsoCode {
        LocaleIsoCode::new(code).unwrap()
    }

    #[test]
    fn test_settings_round_trip_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROJECT_FILE_NAME);
        let saver = Saver::spawn().unwrap();

        let mut settings = ProjectSettings::new(locale("en"));
        settings.locales.insert(locale("es_ar"));
        settings
            .export_urls
            .insert(Platform::Android, PathBuf::from("out/android"));

        let mut props = PropertiesStore::open(&path, saver.clone()).unwrap();
        settings.store(&mut props);
        props.flush();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "defaultLocale=en\nexportUrls.ANDROID=out/android\nlocales=en,es_ar\n"
        );
        let reopened = PropertiesStore::open(&path, saver).unwrap();
        assert_eq!(ProjectSettings::from_properties(&reopened).unwrap(), settings);
    }

    #[test]
    fn test_missing_default_locale() {
        let dir = tempfile::tempdir().unwrap();
        let props =
            PropertiesStore::open(dir.path().join(PROJECT_FILE_NAME), Saver::spawn().unwrap())
                .unwrap();
        let err = ProjectSettings::from_properties(&props).unwrap_err();
        assert!(matches!(err, Error::MissingValue(_)));
    }

    #[test]
    fn test_default_locale_is_always_listed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROJECT_FILE_NAME);
        std::fs::write(&path, "defaultLocale=fr\nlocales=de,bogus locale\n").unwrap();
        let props = PropertiesStore::open(&path, Saver::spawn().unwrap()).unwrap();

        let settings = ProjectSettings::from_properties(&props).unwrap();
        assert_eq!(
            settings.locales,
            BTreeSet::from([locale("de"), locale("fr")])
        );
    }

    #[test]
    fn test_export_options_builder() {
        let options = ExportOptions::new()
            .with_output(Platform::Ios, "build/ios")
            .with_platforms([Platform::Ios]);
        assert_eq!(options.platforms, BTreeSet::from([Platform::Ios]));
        assert_eq!(options.output[&Platform::Ios], PathBuf::from("build/ios"));
        assert!(!options.formatters.is_empty());
        assert!(!ImportOptions::new(Platform::Android).overwrite);
    }
}
