//! Core, format-agnostic types for locforge.
//! The store decodes into these; the export engine lowers these; the import engine
//! lifts platform files back into these.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
    path::Path,
    str::FromStr,
};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

use crate::error::Error;

lazy_static! {
    static ref RESOURCE_ID_REGEX: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap();
}

/// A 2-letter language code, optionally followed by `_` and a 2-letter region.
///
/// Stored normalized: lowercase, underscore separated (`en`, `es_ar`). Accepts
/// `es-AR`, `es_AR` and `es_ar` on input.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocaleIsoCode(String);

impl LocaleIsoCode {
    pub fn new(code: &str) -> Result<Self, Error> {
        let code = code.trim();
        if code.is_empty() {
            return Err(Error::validation_error("locale code is blank"));
        }
        let lang_id: LanguageIdentifier = code
            .parse()
            .map_err(|_| Error::validation_error(format!("invalid locale code `{}`", code)))?;

        let language = lang_id.language.as_str();
        let region = lang_id.region.as_ref().map(|r| r.as_str());
        let valid = language.len() == 2
            && lang_id.script.is_none()
            && lang_id.variants().len() == 0
            && region.is_none_or(|r| r.len() == 2 && r.chars().all(|c| c.is_ascii_alphabetic()));
        if !valid {
            return Err(Error::validation_error(format!(
                "locale code `{}` must be a 2-letter language with an optional 2-letter region",
                code
            )));
        }

        Ok(match region {
            Some(region) => Self(format!("{}_{}", language, region.to_ascii_lowercase())),
            None => Self(language.to_string()),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn language(&self) -> &str {
        self.0.split('_').next().unwrap_or_default()
    }

    pub fn region(&self) -> Option<&str> {
        self.0.split_once('_').map(|(_, region)| region)
    }

    /// BCP 47 spelling used for Apple folder names (`es-AR`).
    pub fn to_bcp47(&self) -> String {
        match self.region() {
            Some(region) => format!("{}-{}", self.language(), region.to_ascii_uppercase()),
            None => self.language().to_string(),
        }
    }
}

impl FromStr for LocaleIsoCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LocaleIsoCode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<LocaleIsoCode> for String {
    fn from(value: LocaleIsoCode) -> Self {
        value.0
    }
}

impl Display for LocaleIsoCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named export target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Platform {
    /// Format A: `res/values*/strings.xml`.
    Android,
    /// Format B: `*.lproj/Localizable.strings` plus property lists.
    Ios,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Android, Platform::Ios];

    pub fn all() -> BTreeSet<Platform> {
        Self::ALL.into_iter().collect()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Android => "ANDROID",
            Platform::Ios => "IOS",
        }
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ANDROID" => Ok(Platform::Android),
            "IOS" => Ok(Platform::Ios),
            _ => Err(Error::validation_error(format!("unknown platform `{}`", s))),
        }
    }
}

/// Standard CLDR plural categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl Quantity {
    pub const ALL: [Quantity; 6] = [
        Quantity::Zero,
        Quantity::One,
        Quantity::Two,
        Quantity::Few,
        Quantity::Many,
        Quantity::Other,
    ];

    /// Lowercase label used in store keys and in both platform formats.
    pub fn label(&self) -> &'static str {
        match self {
            Quantity::Zero => "zero",
            Quantity::One => "one",
            Quantity::Two => "two",
            Quantity::Few => "few",
            Quantity::Many => "many",
            Quantity::Other => "other",
        }
    }

    /// `ONE` and `OTHER` must be authored for every plural.
    pub fn is_required(&self) -> bool {
        matches!(self, Quantity::One | Quantity::Other)
    }
}

impl FromStr for Quantity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ZERO" => Ok(Quantity::Zero),
            "ONE" => Ok(Quantity::One),
            "TWO" => Ok(Quantity::Two),
            "FEW" => Ok(Quantity::Few),
            "MANY" => Ok(Quantity::Many),
            "OTHER" => Ok(Quantity::Other),
            _ => Err(Error::validation_error(format!(
                "unknown plural quantity `{}`",
                s
            ))),
        }
    }
}

impl Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Identifier of one resource within its resource type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    /// Creates a new id: letters, digits and underscores, starting with a letter.
    pub fn new(id: &str) -> Result<Self, Error> {
        let id = id.trim();
        if !RESOURCE_ID_REGEX.is_match(id) {
            return Err(Error::validation_error(format!(
                "invalid resource id `{}`: use letters, digits and `_`, starting with a letter",
                id
            )));
        }
        Ok(Self(id.to_string()))
    }

    /// Accepts any id already persisted in a store: non-blank and free of the
    /// key separator.
    pub(crate) fn from_stored(id: &str) -> Result<Self, Error> {
        if id.trim().is_empty() || id.contains('.') {
            return Err(Error::validation_error(format!(
                "invalid stored resource id `{}`",
                id
            )));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ResourceId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_stored(&value)
    }
}

impl From<ResourceId> for String {
    fn from(value: ResourceId) -> Self {
        value.0
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Organizational tag. The empty group sorts first and means "ungrouped".
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(group: impl Into<String>) -> Self {
        Self(group.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-resource metadata. `size` is only meaningful for string arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    #[serde(default)]
    pub group: GroupId,
    pub platforms: BTreeSet<Platform>,
    #[serde(default)]
    pub size: usize,
}

impl Default for ResourceMetadata {
    fn default() -> Self {
        Self {
            group: GroupId::default(),
            platforms: Platform::all(),
            size: 0,
        }
    }
}

impl ResourceMetadata {
    pub fn is_on(&self, platform: Platform) -> bool {
        self.platforms.contains(&platform)
    }
}

/// The three resource kinds; each occupies its own store file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Strings,
    Plurals,
    Arrays,
}

impl ResourceType {
    pub const ALL: [ResourceType; 3] = [
        ResourceType::Strings,
        ResourceType::Plurals,
        ResourceType::Arrays,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            ResourceType::Strings => "strings.properties",
            ResourceType::Plurals => "plurals.properties",
            ResourceType::Arrays => "arrays.properties",
        }
    }
}

impl Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::Strings => write!(f, "strings"),
            ResourceType::Plurals => write!(f, "plurals"),
            ResourceType::Arrays => write!(f, "arrays"),
        }
    }
}

/// One localized value of a resource for a single locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resource {
    Str { text: String },
    Plural { items: BTreeMap<Quantity, String> },
    StringArray { items: Vec<String> },
}

impl Resource {
    pub fn str(text: impl Into<String>) -> Self {
        Resource::Str { text: text.into() }
    }

    pub fn plural(items: impl IntoIterator<Item = (Quantity, String)>) -> Self {
        Resource::Plural {
            items: items.into_iter().collect(),
        }
    }

    pub fn array(items: impl IntoIterator<Item = String>) -> Self {
        Resource::StringArray {
            items: items.into_iter().collect(),
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        match self {
            Resource::Str { .. } => ResourceType::Strings,
            Resource::Plural { .. } => ResourceType::Plurals,
            Resource::StringArray { .. } => ResourceType::Arrays,
        }
    }

    /// True when no text would be persisted for this value.
    pub fn is_empty(&self) -> bool {
        match self {
            Resource::Str { text } => text.is_empty(),
            Resource::Plural { items } => items.values().all(String::is_empty),
            Resource::StringArray { items } => items.iter().all(String::is_empty),
        }
    }

    /// Drops empty plural items and fits arrays to `size`. Returns `None` when
    /// nothing would be persisted, which is how the store represents absence.
    pub(crate) fn normalized(self, size: usize) -> Option<Resource> {
        let value = match self {
            Resource::Plural { items } => Resource::Plural {
                items: items.into_iter().filter(|(_, v)| !v.is_empty()).collect(),
            },
            Resource::StringArray { mut items } => {
                items.resize(size, String::new());
                Resource::StringArray { items }
            }
            value => value,
        };
        (!value.is_empty()).then_some(value)
    }
}

/// The metadata table and the localization table of one resource type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTable {
    pub metadata: BTreeMap<ResourceId, ResourceMetadata>,
    #[serde(default)]
    pub values: BTreeMap<ResourceId, BTreeMap<LocaleIsoCode, Resource>>,
}

impl ResourceTable {
    pub fn get(&self, id: &ResourceId, locale: &LocaleIsoCode) -> Option<&Resource> {
        self.values.get(id).and_then(|locales| locales.get(locale))
    }

    /// Whether `id` has nothing worth exporting for `locale`. The default
    /// locale is never skipped.
    pub fn should_skip(
        &self,
        id: &ResourceId,
        locale: &LocaleIsoCode,
        default_locale: &LocaleIsoCode,
    ) -> bool {
        if locale == default_locale {
            return false;
        }
        match self.get(id, locale) {
            None => true,
            Some(Resource::Str { text }) => text.is_empty(),
            Some(Resource::Plural { items }) => items
                .get(&Quantity::Other)
                .is_none_or(|other| other.is_empty()),
            Some(Resource::StringArray { items }) => items.iter().all(String::is_empty),
        }
    }

    /// All locales with at least one value in this table.
    pub fn locales(&self) -> BTreeSet<LocaleIsoCode> {
        self.values
            .values()
            .flat_map(|locales| locales.keys().cloned())
            .collect()
    }
}

/// A snapshot of every resource of a project, used by export and import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSet {
    pub strings: ResourceTable,
    pub plurals: ResourceTable,
    pub arrays: ResourceTable,
}

impl ResourceSet {
    pub fn table(&self, resource_type: ResourceType) -> &ResourceTable {
        match resource_type {
            ResourceType::Strings => &self.strings,
            ResourceType::Plurals => &self.plurals,
            ResourceType::Arrays => &self.arrays,
        }
    }

    pub fn table_mut(&mut self, resource_type: ResourceType) -> &mut ResourceTable {
        match resource_type {
            ResourceType::Strings => &mut self.strings,
            ResourceType::Plurals => &mut self.plurals,
            ResourceType::Arrays => &mut self.arrays,
        }
    }

    /// Caches the snapshot to a JSON file.
    pub fn cache_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let writer = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Loads a snapshot from a JSON cache file.
    pub fn load_from_cache<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let reader = std::io::BufReader::new(std::fs::File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}
