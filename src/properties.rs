//! Ordered key-value store backed by a `.properties` file.
//!
//! Iteration is always lexicographic by key. An empty value is never stored:
//! writing one deletes the key. Keys and values use the usual properties-file
//! escaping; non-ASCII text is written as UTF-8.

use std::{
    collections::BTreeMap,
    fmt::Write as _,
    ops::Bound,
    path::{Path, PathBuf},
};

use log::debug;

use crate::{error::Error, persist::Saver};

/// Escapes a key: everything a value needs, plus all spaces.
pub fn escape_key(key: &str) -> String {
    escape(key, true)
}

/// Escapes a value. Only a leading space needs protection.
pub fn escape_value(value: &str) -> String {
    escape(value, false)
}

fn escape(text: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{c}' => out.push_str("\\f"),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Resolves escape sequences of one key or value.
pub fn unescape(text: &str) -> Result<String, Error> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let code = read_hex4(&mut chars)?;
                out.push(match code {
                    0xD800..=0xDBFF => {
                        // Java writes characters outside the BMP as a surrogate pair
                        let mut lookahead = chars.clone();
                        let low = match (lookahead.next(), lookahead.next()) {
                            (Some('\\'), Some('u')) => read_hex4(&mut lookahead)
                                .ok()
                                .filter(|low| (0xDC00..=0xDFFF).contains(low)),
                            _ => None,
                        };
                        match low {
                            Some(low) => {
                                chars = lookahead;
                                char::from_u32(0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00))
                                    .unwrap_or(char::REPLACEMENT_CHARACTER)
                            }
                            None => char::REPLACEMENT_CHARACTER,
                        }
                    }
                    code => char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER),
                });
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}

fn read_hex4(chars: &mut std::str::Chars<'_>) -> Result<u32, Error> {
    let hex: String = chars.by_ref().take(4).collect();
    u32::from_str_radix(&hex, 16)
        .ok()
        .filter(|_| hex.len() == 4)
        .ok_or_else(|| Error::DataMismatch(format!("malformed \\u escape `\\u{}`", hex)))
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Parses properties text into an ordered map.
pub fn parse(text: &str) -> Result<BTreeMap<String, String>, Error> {
    let mut entries = BTreeMap::new();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        let mut logical = trimmed.to_string();
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some(next) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let (key, value) = split_key_value(&logical);
        let key = unescape(key)?;
        let value = unescape(value)?;
        if !value.is_empty() {
            entries.insert(key, value);
        }
    }
    Ok(entries)
}

/// Splits at the first unescaped separator (`=`, `:` or whitespace).
fn split_key_value(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' | ' ' | '\t' | '\u{c}' => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let key = &line[..key_end];
    let rest = line[key_end..].trim_start_matches([' ', '\t', '\u{c}']);
    let rest = rest
        .strip_prefix(['=', ':'])
        .map(|r| r.trim_start_matches([' ', '\t', '\u{c}']))
        .unwrap_or(rest);
    (key, rest)
}

/// Renders entries as one `key=value` line each, in key order.
pub fn render<'a>(entries: impl IntoIterator<Item = (&'a String, &'a String)>) -> String {
    let mut out = String::new();
    for (key, value) in entries {
        out.push_str(&escape_key(key));
        out.push('=');
        out.push_str(&escape_value(value));
        out.push('\n');
    }
    out
}

fn upper_bound(prefix: &str) -> Bound<String> {
    // every key starting with `prefix` sorts below `prefix` + U+10FFFF
    Bound::Excluded(format!("{}{}", prefix, char::MAX))
}

/// A mutable string map persisted to one properties file.
#[derive(Debug)]
pub struct PropertiesStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    saver: Saver,
}

impl PropertiesStore {
    /// Loads `path`. A missing file yields an empty store; the file is created
    /// on the first save.
    pub fn open<P: AsRef<Path>>(path: P, saver: Saver) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) => parse(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} not found, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            entries,
            saver,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates all entries in lexicographic key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keys starting with `prefix`, in order.
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .range::<String, _>((Bound::Included(prefix.to_string()), upper_bound(prefix)))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Sets one key and saves. An empty value deletes the key.
    pub fn set(&mut self, key: &str, value: &str) {
        self.batch(|batch| batch.put(key, value));
    }

    /// Removes one key and saves.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.batch(|batch| batch.remove(key))
    }

    /// Applies several mutations, then saves once if anything changed.
    pub fn batch<T>(&mut self, f: impl FnOnce(&mut Batch<'_>) -> T) -> T {
        let mut batch = Batch {
            entries: &mut self.entries,
            dirty: false,
        };
        let result = f(&mut batch);
        if batch.dirty {
            self.save();
        }
        result
    }

    /// Dispatches the current state to the background saver.
    pub fn save(&self) {
        self.saver.save(&self.path, render(&self.entries));
    }

    /// Waits until every dispatched save has reached the disk.
    pub fn flush(&self) {
        self.saver.flush();
    }
}

/// Mutable view used inside [`PropertiesStore::batch`].
pub struct Batch<'a> {
    entries: &'a mut BTreeMap<String, String>,
    dirty: bool,
}

impl Batch<'_> {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn put(&mut self, key: &str, value: &str) {
        if value.is_empty() {
            self.remove(key);
            return;
        }
        if self.entries.get(key).map(String::as_str) != Some(value) {
            self.entries.insert(key.to_string(), value.to_string());
            self.dirty = true;
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let old = self.entries.remove(key);
        self.dirty |= old.is_some();
        old
    }

    /// Removes every key starting with `prefix` and returns the removed entries.
    pub fn drain_prefix(&mut self, prefix: &str) -> Vec<(String, String)> {
        let keys: Vec<String> = self
            .entries
            .range::<String, _>((Bound::Included(prefix.to_string()), upper_bound(prefix)))
            .map(|(k, _)| k.clone())
            .collect();
        keys.into_iter()
            .filter_map(|k| self.remove(&k).map(|v| (k, v)))
            .collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Marks the store dirty so a save is dispatched even without changes.
    pub fn touch(&mut self) {
        self.dirty = true;
    }
}
