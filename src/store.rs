//! Resource store: maps one resource type onto an ordered key-value store.
//!
//! Keys are dot-segmented:
//!
//! | Key                          | Meaning                                  |
//! |------------------------------|------------------------------------------|
//! | `<id>.group`                 | group tag, absent means ungrouped        |
//! | `<id>.platforms`             | comma-joined platforms, absent means all |
//! | `<id>.size`                  | element count (arrays only)              |
//! | `<id>.<locale>`              | string text                              |
//! | `<id>.<locale>.<quantity>`   | plural text, lowercase quantity label    |
//! | `<id>.<locale>.<index>`      | array element, zero based                |
//!
//! Mutations are applied to the in-memory tables first; the backing file is
//! saved in the background and may lag behind.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use log::warn;

use crate::{
    error::Error,
    naming::{android_name, apple_key},
    persist::Saver,
    properties::{Batch, PropertiesStore},
    types::{
        GroupId, LocaleIsoCode, Platform, Quantity, Resource, ResourceId, ResourceMetadata,
        ResourceTable, ResourceType,
    },
};

const GROUP_KEY: &str = "group";
const PLATFORMS_KEY: &str = "platforms";
const SIZE_KEY: &str = "size";

fn meta_key(id: &ResourceId, field: &str) -> String {
    format!("{}.{}", id, field)
}

fn is_metadata_field(segment: &str) -> bool {
    matches!(segment, GROUP_KEY | PLATFORMS_KEY | SIZE_KEY)
}

fn join_platforms(platforms: &BTreeSet<Platform>) -> String {
    platforms
        .iter()
        .map(Platform::name)
        .collect::<Vec<_>>()
        .join(",")
}

/// Key/value pairs describing the metadata of `id`.
pub fn encode_metadata(
    resource_type: ResourceType,
    id: &ResourceId,
    metadata: &ResourceMetadata,
) -> Vec<(String, String)> {
    let mut pairs = vec![
        (meta_key(id, GROUP_KEY), metadata.group.to_string()),
        (meta_key(id, PLATFORMS_KEY), join_platforms(&metadata.platforms)),
    ];
    if resource_type == ResourceType::Arrays {
        pairs.push((meta_key(id, SIZE_KEY), metadata.size.to_string()));
    }
    pairs
}

/// Key/value pairs describing one localized value of `id`.
pub fn encode_value(
    id: &ResourceId,
    locale: &LocaleIsoCode,
    value: &Resource,
) -> Vec<(String, String)> {
    match value {
        Resource::Str { text } => vec![(format!("{}.{}", id, locale), text.clone())],
        Resource::Plural { items } => items
            .iter()
            .map(|(quantity, text)| {
                (
                    format!("{}.{}.{}", id, locale, quantity.label()),
                    text.clone(),
                )
            })
            .collect(),
        Resource::StringArray { items } => items
            .iter()
            .enumerate()
            .map(|(index, text)| (format!("{}.{}.{}", id, locale, index), text.clone()))
            .collect(),
    }
}

/// Encodes a whole table into flat key/value pairs. Empty values are dropped,
/// matching what the key-value store persists.
pub fn encode_table(resource_type: ResourceType, table: &ResourceTable) -> BTreeMap<String, String> {
    let metadata = table
        .metadata
        .iter()
        .flat_map(|(id, metadata)| encode_metadata(resource_type, id, metadata));
    let values = table.values.iter().flat_map(|(id, locales)| {
        locales
            .iter()
            .flat_map(move |(locale, value)| encode_value(id, locale, value))
    });
    metadata
        .chain(values)
        .filter(|(_, value)| !value.is_empty())
        .collect()
}

#[derive(Default)]
struct Decoded {
    metadata: BTreeMap<ResourceId, ResourceMetadata>,
    sizes: BTreeMap<ResourceId, usize>,
    strings: BTreeMap<ResourceId, BTreeMap<LocaleIsoCode, String>>,
    plurals: BTreeMap<ResourceId, BTreeMap<LocaleIsoCode, BTreeMap<Quantity, String>>>,
    arrays: BTreeMap<ResourceId, BTreeMap<LocaleIsoCode, BTreeMap<usize, String>>>,
}

impl Decoded {
    fn entry(&mut self, resource_type: ResourceType, id: ResourceId, rest: &str, value: &str) {
        let (locale, suffix) = match rest.split_once('.') {
            Some((locale, suffix)) => (locale, Some(suffix)),
            None => (rest, None),
        };
        let Ok(locale) = LocaleIsoCode::new(locale) else {
            warn!("ignoring key `{}.{}`: invalid locale", id, rest);
            return;
        };

        match (resource_type, suffix) {
            (ResourceType::Strings, None) => {
                self.strings
                    .entry(id)
                    .or_default()
                    .insert(locale, value.to_string());
            }
            (ResourceType::Plurals, Some(quantity)) => match quantity.parse::<Quantity>() {
                Ok(quantity) => {
                    self.plurals
                        .entry(id)
                        .or_default()
                        .entry(locale)
                        .or_default()
                        .insert(quantity, value.to_string());
                }
                Err(_) => warn!("ignoring key `{}.{}`: unknown quantity", id, rest),
            },
            (ResourceType::Arrays, Some(index)) => match index.parse::<usize>() {
                Ok(index) => {
                    self.arrays
                        .entry(id)
                        .or_default()
                        .entry(locale)
                        .or_default()
                        .insert(index, value.to_string());
                }
                Err(_) => warn!("ignoring key `{}.{}`: invalid index", id, rest),
            },
            _ => warn!("ignoring key `{}.{}` in {} store", id, rest, resource_type),
        }
    }
}

/// Decodes flat key/value pairs into a table.
///
/// Returns the ids whose metadata had to be repaired: ids with values but no
/// metadata key, and arrays with elements beyond their recorded size.
pub fn decode_table<'a>(
    resource_type: ResourceType,
    entries: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> (ResourceTable, BTreeSet<ResourceId>) {
    let mut decoded = Decoded::default();

    for (key, value) in entries {
        let Some((id, rest)) = key.split_once('.') else {
            warn!("ignoring key `{}`: no id prefix", key);
            continue;
        };
        let Ok(id) = ResourceId::from_stored(id) else {
            warn!("ignoring key `{}`: invalid id", key);
            continue;
        };

        if !is_metadata_field(rest) {
            decoded.entry(resource_type, id, rest, value);
            continue;
        }
        let metadata = decoded.metadata.entry(id.clone()).or_default();
        match rest {
            GROUP_KEY => metadata.group = GroupId::new(value),
            PLATFORMS_KEY => {
                let platforms: BTreeSet<Platform> = value
                    .split(',')
                    .filter(|p| !p.trim().is_empty())
                    .filter_map(|p| match p.parse() {
                        Ok(platform) => Some(platform),
                        Err(_) => {
                            warn!("ignoring unknown platform `{}` on `{}`", p, id);
                            None
                        }
                    })
                    .collect();
                if !platforms.is_empty() {
                    metadata.platforms = platforms;
                }
            }
            _ => match value.parse::<usize>() {
                Ok(size) => {
                    decoded.sizes.insert(id, size);
                }
                Err(_) => warn!("ignoring invalid size `{}` on `{}`", value, id),
            },
        }
    }

    let mut repaired = BTreeSet::new();
    let mut table = ResourceTable {
        metadata: decoded.metadata,
        values: BTreeMap::new(),
    };

    for (id, locales) in decoded.strings {
        let values = locales
            .into_iter()
            .map(|(locale, text)| (locale, Resource::Str { text }))
            .collect();
        table.values.insert(id, values);
    }
    for (id, locales) in decoded.plurals {
        let values = locales
            .into_iter()
            .map(|(locale, items)| (locale, Resource::Plural { items }))
            .collect();
        table.values.insert(id, values);
    }
    for (id, locales) in decoded.arrays {
        let highest = locales
            .values()
            .filter_map(|items| items.keys().next_back())
            .max()
            .map_or(0, |index| index + 1);
        let size = match decoded.sizes.get(&id) {
            Some(&size) => {
                if highest > size {
                    warn!("dropping elements of `{}` beyond size {}", id, size);
                    repaired.insert(id.clone());
                }
                size
            }
            None => {
                repaired.insert(id.clone());
                highest
            }
        };
        decoded.sizes.insert(id.clone(), size);

        let values: BTreeMap<_, _> = locales
            .into_iter()
            .filter_map(|(locale, items)| {
                let mut list = vec![String::new(); size];
                for (index, text) in items.into_iter().filter(|(i, _)| *i < size) {
                    list[index] = text;
                }
                Resource::StringArray { items: list }
                    .normalized(size)
                    .map(|value| (locale, value))
            })
            .collect();
        if !values.is_empty() {
            table.values.insert(id, values);
        }
    }

    for id in table.values.keys() {
        if !table.metadata.contains_key(id) {
            warn!("`{}` has values but no metadata, using defaults", id);
            table.metadata.insert(id.clone(), ResourceMetadata::default());
            repaired.insert(id.clone());
        }
    }
    if resource_type == ResourceType::Arrays {
        for (id, metadata) in table.metadata.iter_mut() {
            metadata.size = decoded.sizes.get(id).copied().unwrap_or_default();
        }
    }

    (table, repaired)
}

/// Removes every key holding the value of `id` for `locale`.
fn remove_value_keys(batch: &mut Batch<'_>, id: &ResourceId, locale: &LocaleIsoCode) {
    let key = format!("{}.{}", id, locale);
    batch.remove(&key);
    batch.drain_prefix(&format!("{}.", key));
}

/// CRUD operations over the resources of one type, persisted to one file.
#[derive(Debug)]
pub struct ResourceStore {
    resource_type: ResourceType,
    props: PropertiesStore,
    table: ResourceTable,
}

impl ResourceStore {
    /// Opens `<dir>/<type>.properties`.
    pub fn open(dir: &Path, resource_type: ResourceType, saver: Saver) -> Result<Self, Error> {
        let props = PropertiesStore::open(dir.join(resource_type.file_name()), saver)?;
        Ok(Self::from_properties(resource_type, props))
    }

    /// Decodes `props`, writing repaired metadata back through the next save.
    pub fn from_properties(resource_type: ResourceType, mut props: PropertiesStore) -> Self {
        let (table, repaired) = decode_table(resource_type, props.iter());

        if !repaired.is_empty() {
            props.batch(|batch| {
                for id in &repaired {
                    if let Some(metadata) = table.metadata.get(id) {
                        for (key, value) in encode_metadata(resource_type, id, metadata) {
                            batch.put(&key, &value);
                        }
                    }
                    if resource_type == ResourceType::Arrays {
                        let size = table.metadata.get(id).map_or(0, |m| m.size);
                        let stale: Vec<String> = batch
                            .keys()
                            .filter(|key| is_element_key_beyond(key, id, size))
                            .cloned()
                            .collect();
                        for key in stale {
                            batch.remove(&key);
                        }
                    }
                }
            });
        }

        Self {
            resource_type,
            props,
            table,
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn table(&self) -> &ResourceTable {
        &self.table
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.table.metadata.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ResourceId> {
        self.table.metadata.keys()
    }

    pub fn metadata(&self, id: &ResourceId) -> Option<&ResourceMetadata> {
        self.table.metadata.get(id)
    }

    pub fn get(&self, id: &ResourceId, locale: &LocaleIsoCode) -> Option<&Resource> {
        self.table.get(id, locale)
    }

    /// The raw key-value view, in key order.
    pub fn properties(&self) -> &PropertiesStore {
        &self.props
    }

    /// Waits for pending saves of this store's file.
    pub fn flush(&self) {
        self.props.flush();
    }

    fn require(&self, id: &ResourceId) -> Result<(), Error> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(Error::UnknownResource(id.to_string()))
        }
    }

    /// The existing id that `id` would collide with once exported: equal
    /// ignoring case, or the same Android name or Apple key.
    pub fn conflicting_id(&self, id: &ResourceId) -> Option<&ResourceId> {
        self.table
            .metadata
            .keys()
            .find(|existing| ids_collide(existing, id))
    }

    /// Creates `id` with default metadata and no values.
    pub fn create_resource(&mut self, id: ResourceId) -> Result<(), Error> {
        if let Some(existing) = self.conflicting_id(&id) {
            return Err(Error::IdAlreadyExists(if existing == &id {
                id.to_string()
            } else {
                format!("{} (collides with `{}`)", id, existing)
            }));
        }
        let metadata = ResourceMetadata::default();
        let pairs = encode_metadata(self.resource_type, &id, &metadata);
        self.props.batch(|batch| {
            for (key, value) in &pairs {
                batch.put(key, value);
            }
            // platforms is always written, so creation is never a no-op
            batch.touch();
        });
        self.table.metadata.insert(id, metadata);
        Ok(())
    }

    /// Moves every key of `old_id` under `new_id`.
    ///
    /// Fails without touching anything when `new_id` is taken.
    pub fn rename_resource(&mut self, old_id: &ResourceId, new_id: ResourceId) -> Result<(), Error> {
        self.require(old_id)?;
        if old_id == &new_id {
            return Ok(());
        }
        let taken = self
            .table
            .metadata
            .keys()
            .any(|existing| existing != old_id && ids_collide(existing, &new_id));
        if taken || self.table.values.contains_key(&new_id) {
            return Err(Error::IdAlreadyExists(new_id.to_string()));
        }

        let old_prefix = format!("{}.", old_id);
        self.props.batch(|batch| {
            for (key, value) in batch.drain_prefix(&old_prefix) {
                batch.put(&format!("{}.{}", new_id, &key[old_prefix.len()..]), &value);
            }
        });
        if let Some(metadata) = self.table.metadata.remove(old_id) {
            self.table.metadata.insert(new_id.clone(), metadata);
        }
        if let Some(values) = self.table.values.remove(old_id) {
            self.table.values.insert(new_id, values);
        }
        Ok(())
    }

    /// Upserts the value of `id` for `locale`. An empty value removes it.
    pub fn update_localized_value(
        &mut self,
        id: &ResourceId,
        locale: &LocaleIsoCode,
        value: Resource,
    ) -> Result<(), Error> {
        self.require(id)?;
        if value.resource_type() != self.resource_type {
            return Err(Error::DataMismatch(format!(
                "cannot store a {} value in the {} store",
                value.resource_type(),
                self.resource_type
            )));
        }
        let size = self.table.metadata.get(id).map_or(0, |m| m.size);
        if let Resource::StringArray { items } = &value {
            if items.len() > size {
                return Err(Error::validation_error(format!(
                    "`{}` has {} elements but its size is {}",
                    id,
                    items.len(),
                    size
                )));
            }
        }

        let value = value.normalized(size);
        self.props.batch(|batch| {
            remove_value_keys(batch, id, locale);
            if let Some(value) = &value {
                for (key, text) in encode_value(id, locale, value) {
                    batch.put(&key, &text);
                }
            }
        });

        match value {
            Some(value) => {
                self.table
                    .values
                    .entry(id.clone())
                    .or_default()
                    .insert(locale.clone(), value);
            }
            None => self.forget_value(id, locale),
        }
        Ok(())
    }

    /// Removes the value of `id` for `locale`, if any.
    pub fn remove_localized_value(
        &mut self,
        id: &ResourceId,
        locale: &LocaleIsoCode,
    ) -> Result<(), Error> {
        self.require(id)?;
        self.props.batch(|batch| remove_value_keys(batch, id, locale));
        self.forget_value(id, locale);
        Ok(())
    }

    fn forget_value(&mut self, id: &ResourceId, locale: &LocaleIsoCode) {
        if let Some(locales) = self.table.values.get_mut(id) {
            locales.remove(locale);
            if locales.is_empty() {
                self.table.values.remove(id);
            }
        }
    }

    /// Deletes the metadata and every value of `id`.
    pub fn remove_resource(&mut self, id: &ResourceId) -> Result<(), Error> {
        self.require(id)?;
        self.props.batch(|batch| {
            batch.drain_prefix(&format!("{}.", id));
        });
        self.table.metadata.remove(id);
        self.table.values.remove(id);
        Ok(())
    }

    /// Deletes every value stored for `locale`. Metadata is untouched.
    pub fn delete_locale(&mut self, locale: &LocaleIsoCode) {
        let ids: Vec<ResourceId> = self
            .table
            .values
            .iter()
            .filter(|(_, locales)| locales.contains_key(locale))
            .map(|(id, _)| id.clone())
            .collect();
        self.props.batch(|batch| {
            for id in &ids {
                remove_value_keys(batch, id, locale);
            }
        });
        for id in &ids {
            self.forget_value(id, locale);
        }
    }

    /// Assigns `group` to every id in `ids`. All ids must exist.
    pub fn set_group(&mut self, ids: &[ResourceId], group: GroupId) -> Result<(), Error> {
        if ids.is_empty() {
            return Ok(());
        }
        for id in ids {
            self.require(id)?;
        }
        self.props.batch(|batch| {
            for id in ids {
                batch.put(&meta_key(id, GROUP_KEY), group.as_str());
            }
        });
        for id in ids {
            if let Some(metadata) = self.table.metadata.get_mut(id) {
                metadata.group = group.clone();
            }
        }
        Ok(())
    }

    /// Flips membership of `platform`. A resource must keep at least one platform.
    pub fn toggle_platform(&mut self, id: &ResourceId, platform: Platform) -> Result<(), Error> {
        self.require(id)?;
        let mut platforms = self.table.metadata[id].platforms.clone();
        if !platforms.remove(&platform) {
            platforms.insert(platform);
        }
        self.set_platforms(id, platforms)
    }

    /// Replaces the platform set of `id`.
    pub fn set_platforms(
        &mut self,
        id: &ResourceId,
        platforms: BTreeSet<Platform>,
    ) -> Result<(), Error> {
        self.require(id)?;
        if platforms.is_empty() {
            return Err(Error::validation_error(format!(
                "`{}` must target at least one platform",
                id
            )));
        }
        self.props
            .set(&meta_key(id, PLATFORMS_KEY), &join_platforms(&platforms));
        if let Some(metadata) = self.table.metadata.get_mut(id) {
            metadata.platforms = platforms;
        }
        Ok(())
    }

    /// Sets the element count of an array, truncating or padding every locale.
    pub fn resize_array(&mut self, id: &ResourceId, new_size: usize) -> Result<(), Error> {
        if self.resource_type != ResourceType::Arrays {
            return Err(Error::DataMismatch(format!(
                "cannot resize `{}` in the {} store",
                id, self.resource_type
            )));
        }
        self.require(id)?;

        let stale: Vec<String> = self
            .props
            .keys_with_prefix(&format!("{}.", id))
            .into_iter()
            .filter(|key| is_element_key_beyond(key, id, new_size))
            .collect();
        self.props.batch(|batch| {
            for key in &stale {
                batch.remove(key);
            }
            batch.put(&meta_key(id, SIZE_KEY), &new_size.to_string());
        });

        if let Some(metadata) = self.table.metadata.get_mut(id) {
            metadata.size = new_size;
        }
        if let Some(locales) = self.table.values.get_mut(id) {
            let resized = std::mem::take(locales)
                .into_iter()
                .filter_map(|(locale, value)| value.normalized(new_size).map(|v| (locale, v)))
                .collect::<BTreeMap<_, _>>();
            if resized.is_empty() {
                self.table.values.remove(id);
            } else {
                *locales = resized;
            }
        }
        Ok(())
    }
}

/// Whether `key` is `<id>.<locale>.<index>` with `index >= size`.
fn is_element_key_beyond(key: &str, id: &ResourceId, size: usize) -> bool {
    key.strip_prefix(id.as_str())
        .and_then(|rest| rest.strip_prefix('.'))
        .and_then(|rest| rest.split_once('.'))
        .and_then(|(_, index)| index.parse::<usize>().ok())
        .is_some_and(|index| index >= size)
}

fn ids_collide(a: &ResourceId, b: &ResourceId) -> bool {
    a.as_str().eq_ignore_ascii_case(b.as_str())
        || android_name(a.as_str()) == android_name(b.as_str())
        || apple_key(a.as_str()) == apple_key(b.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ResourceId {
        ResourceId::new(s).unwrap()
    }

    fn locale(s: &str) -> LocaleIsoCode {
        LocaleIsoCode::new(s).unwrap()
    }

    fn open(dir: &Path, resource_type: ResourceType) -> ResourceStore {
        ResourceStore::open(dir, resource_type, Saver::spawn().unwrap()).unwrap()
    }

    fn keys(store: &ResourceStore) -> Vec<(String, String)> {
        store
            .properties()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_create_writes_platforms_eagerly() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path(), ResourceType::Strings);
        store.create_resource(id("greeting")).unwrap();

        assert_eq!(
            store.properties().get("greeting.platforms"),
            Some("ANDROID,IOS")
        );
        assert!(matches!(
            store.create_resource(id("greeting")),
            Err(Error::IdAlreadyExists(_))
        ));
    }

    #[test]
    fn test_ids_differing_only_in_case_or_style_collide() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path(), ResourceType::Strings);
        store.create_resource(id("greeting")).unwrap();
        store.create_resource(id("fooBar")).unwrap();

        for taken in ["Greeting", "GREETING", "foo_bar", "FooBar"] {
            assert!(
                matches!(
                    store.create_resource(id(taken)),
                    Err(Error::IdAlreadyExists(_))
                ),
                "{} should collide",
                taken
            );
        }
        assert_eq!(store.conflicting_id(&id("foo_bar")), Some(&id("fooBar")));
        assert!(store.conflicting_id(&id("farewell")).is_none());

        assert!(matches!(
            store.rename_resource(&id("greeting"), id("foo_bar")),
            Err(Error::IdAlreadyExists(_))
        ));
        // re-casing an id onto itself is fine
        store.rename_resource(&id("greeting"), id("Greeting")).unwrap();
        assert!(store.contains(&id("Greeting")));
        assert!(!store.contains(&id("greeting")));
    }

    #[test]
    fn test_update_and_reload_string() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path(), ResourceType::Strings);
        store.create_resource(id("greeting")).unwrap();
        store
            .update_localized_value(&id("greeting"), &locale("en"), Resource::str("Hello"))
            .unwrap();
        store
            .update_localized_value(&id("greeting"), &locale("es_ar"), Resource::str("Hola"))
            .unwrap();
        store.flush();

        let reopened = open(dir.path(), ResourceType::Strings);
        assert_eq!(reopened.table(), store.table());
        assert_eq!(
            reopened.get(&id("greeting"), &locale("es_ar")),
            Some(&Resource::str("Hola"))
        );
    }

    #[test]
    fn test_update_rejects_wrong_kind() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path(), ResourceType::Strings);
        store.create_resource(id("greeting")).unwrap();
        let result = store.update_localized_value(
            &id("greeting"),
            &locale("en"),
            Resource::plural([(Quantity::Other, "x".to_string())]),
        );
        assert!(matches!(result, Err(Error::DataMismatch(_))));
    }

    #[test]
    fn test_plural_update_removes_dropped_quantities() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path(), ResourceType::Plurals);
        let apples = id("apples");
        store.create_resource(apples.clone()).unwrap();
        store
            .update_localized_value(
                &apples,
                &locale("en"),
                Resource::plural([
                    (Quantity::One, "1 apple".to_string()),
                    (Quantity::Few, "a few apples".to_string()),
                    (Quantity::Other, "%d apples".to_string()),
                ]),
            )
            .unwrap();
        store
            .update_localized_value(
                &apples,
                &locale("en"),
                Resource::plural([
                    (Quantity::One, "1 apple".to_string()),
                    (Quantity::Other, "%d apples".to_string()),
                ]),
            )
            .unwrap();

        assert!(!store.properties().contains_key("apples.en.few"));
        assert_eq!(store.properties().get("apples.en.other"), Some("%d apples"));
    }

    #[test]
    fn test_rename_moves_every_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path(), ResourceType::Strings);
        store.create_resource(id("cat")).unwrap();
        store.set_group(&[id("cat")], GroupId::new("animals")).unwrap();
        store
            .update_localized_value(&id("cat"), &locale("en"), Resource::str("Cat"))
            .unwrap();

        store.rename_resource(&id("cat"), id("kitten")).unwrap();

        assert!(!store.contains(&id("cat")));
        assert!(store.properties().keys_with_prefix("cat.").is_empty());
        assert_eq!(store.properties().get("kitten.en"), Some("Cat"));
        assert_eq!(store.properties().get("kitten.group"), Some("animals"));
        assert_eq!(
            store.metadata(&id("kitten")).unwrap().group,
            GroupId::new("animals")
        );
    }

    #[test]
    fn test_failed_rename_leaves_keys_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path(), ResourceType::Strings);
        for name in ["cat", "dog"] {
            store.create_resource(id(name)).unwrap();
            store
                .update_localized_value(&id(name), &locale("en"), Resource::str(name))
                .unwrap();
        }
        let before = keys(&store);
        let table_before = store.table().clone();

        let result = store.rename_resource(&id("cat"), id("dog"));

        assert!(matches!(result, Err(Error::IdAlreadyExists(_))));
        assert_eq!(keys(&store), before);
        assert_eq!(store.table(), &table_before);
    }

    #[test]
    fn test_rename_does_not_touch_ids_sharing_a_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path(), ResourceType::Strings);
        store.create_resource(id("cat")).unwrap();
        store.create_resource(id("catalog")).unwrap();
        store
            .update_localized_value(&id("catalog"), &locale("en"), Resource::str("Catalog"))
            .unwrap();

        store.rename_resource(&id("cat"), id("feline")).unwrap();

        assert_eq!(store.properties().get("catalog.en"), Some("Catalog"));
        assert!(store.contains(&id("catalog")));
    }

    #[test]
    fn test_remove_resource_deletes_all_locales() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path(), ResourceType::Strings);
        store.create_resource(id("bye")).unwrap();
        for (code, text) in [("en", "Bye"), ("fr", "Au revoir")] {
            store
                .update_localized_value(&id("bye"), &locale(code), Resource::str(text))
                .unwrap();
        }
        store.remove_resource(&id("bye")).unwrap();

        assert!(store.properties().is_empty());
        assert!(store.table().values.is_empty());
        assert!(matches!(
            store.remove_resource(&id("bye")),
            Err(Error::UnknownResource(_))
        ));
    }

    #[test]
    fn test_delete_locale_keeps_metadata_and_similar_locales() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path(), ResourceType::Strings);
        store.create_resource(id("hi")).unwrap();
        for (code, text) in [("en", "Hi"), ("es", "Hola"), ("es_ar", "Che")] {
            store
                .update_localized_value(&id("hi"), &locale(code), Resource::str(text))
                .unwrap();
        }

        store.delete_locale(&locale("es"));

        assert!(store.get(&id("hi"), &locale("es")).is_none());
        assert_eq!(store.properties().get("hi.es_ar"), Some("Che"));
        assert!(store.properties().contains_key("hi.platforms"));
    }

    #[test]
    fn test_toggle_platform_keeps_at_least_one() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path(), ResourceType::Strings);
        let title = id("title");
        store.create_resource(title.clone()).unwrap();

        store.toggle_platform(&title, Platform::Ios).unwrap();
        assert_eq!(store.properties().get("title.platforms"), Some("ANDROID"));
        assert!(store.toggle_platform(&title, Platform::Android).is_err());

        store.toggle_platform(&title, Platform::Ios).unwrap();
        assert_eq!(store.metadata(&title).unwrap().platforms, Platform::all());
    }

    #[test]
    fn test_resize_array_truncates_and_pads() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path(), ResourceType::Arrays);
        let planets = id("planets");
        store.create_resource(planets.clone()).unwrap();
        store.resize_array(&planets, 3).unwrap();
        store
            .update_localized_value(
                &planets,
                &locale("en"),
                Resource::array(["Mercury", "Venus", "Earth"].map(String::from)),
            )
            .unwrap();
        store
            .update_localized_value(
                &planets,
                &locale("fr"),
                Resource::array(["Mercure".to_string()]),
            )
            .unwrap();

        store.resize_array(&planets, 2).unwrap();
        assert!(!store.properties().contains_key("planets.en.2"));
        assert_eq!(store.properties().get("planets.size"), Some("2"));
        assert_eq!(
            store.get(&planets, &locale("en")),
            Some(&Resource::array(["Mercury", "Venus"].map(String::from)))
        );

        store.resize_array(&planets, 4).unwrap();
        assert_eq!(
            store.get(&planets, &locale("fr")),
            Some(&Resource::array(
                ["Mercure", "", "", ""].map(String::from)
            ))
        );
        assert!(!store.properties().contains_key("planets.fr.3"));
    }

    #[test]
    fn test_array_longer_than_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path(), ResourceType::Arrays);
        store.create_resource(id("days")).unwrap();
        let result = store.update_localized_value(
            &id("days"),
            &locale("en"),
            Resource::array(["Mon".to_string()]),
        );
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_decode_repairs_missing_metadata() {
        let entries = [("orphan.en", "Hello"), ("kept.platforms", "IOS")];
        let (table, repaired) = decode_table(ResourceType::Strings, entries);

        assert!(repaired.contains(&id("orphan")));
        assert_eq!(table.metadata[&id("orphan")], ResourceMetadata::default());
        assert_eq!(
            table.metadata[&id("kept")].platforms,
            [Platform::Ios].into_iter().collect()
        );
    }

    #[test]
    fn test_decode_infers_missing_array_size_and_drops_out_of_range() {
        let entries = [
            ("a.en.0", "x"),
            ("a.en.2", "z"),
            ("b.size", "1"),
            ("b.en.0", "keep"),
            ("b.en.1", "drop"),
        ];
        let (table, repaired) = decode_table(ResourceType::Arrays, entries);

        assert_eq!(table.metadata[&id("a")].size, 3);
        assert_eq!(
            table.values[&id("a")][&locale("en")],
            Resource::array(["x", "", "z"].map(String::from))
        );
        assert_eq!(
            table.values[&id("b")][&locale("en")],
            Resource::array(["keep".to_string()])
        );
        assert!(repaired.contains(&id("a")));
        assert!(repaired.contains(&id("b")));
    }

    #[test]
    fn test_open_persists_repairs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("arrays.properties"),
            "b.en.0=keep\nb.en.1=drop\nb.size=1\n",
        )
        .unwrap();

        let store = open(dir.path(), ResourceType::Arrays);
        store.flush();

        let text = std::fs::read_to_string(dir.path().join("arrays.properties")).unwrap();
        assert_eq!(text, "b.en.0=keep\nb.platforms=ANDROID,IOS\nb.size=1\n");
    }
}
