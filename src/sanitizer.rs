//! Rewrites authoring-time text into platform-correct escaped text.
//!
//! A [`Sanitizer`] scans its input once, left to right. At each position the
//! first rule whose trigger matches wins; its replacement is emitted and the
//! scan skips past the trigger. Indexed rules share one counter that starts at
//! 1 and only advances after an indexed replacement.

use std::{collections::BTreeSet, fmt::Debug, sync::Arc};

use crate::{error::Error, types::Platform};

type Replacement = Arc<dyn Fn(usize, bool) -> String + Send + Sync>;

/// One substitution rule.
#[derive(Clone)]
pub struct Formatter {
    arg: String,
    first: char,
    platforms: BTreeSet<Platform>,
    indexed: bool,
    replacement: Replacement,
}

impl Debug for Formatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Formatter")
            .field("arg", &self.arg)
            .field("platforms", &self.platforms)
            .field("indexed", &self.indexed)
            .finish()
    }
}

impl Formatter {
    /// Creates a rule. `replacement` receives the running placeholder index and
    /// whether the destination is XML.
    pub fn new(
        arg: impl Into<String>,
        platforms: impl IntoIterator<Item = Platform>,
        indexed: bool,
        replacement: impl Fn(usize, bool) -> String + Send + Sync + 'static,
    ) -> Result<Self, Error> {
        let arg = arg.into();
        let first = arg
            .chars()
            .next()
            .ok_or_else(|| Error::validation_error("formatter trigger must not be empty"))?;
        let platforms: BTreeSet<Platform> = platforms.into_iter().collect();
        if platforms.is_empty() {
            return Err(Error::validation_error(format!(
                "formatter `{}` applies to no platform",
                arg
            )));
        }
        Ok(Self {
            arg,
            first,
            platforms,
            indexed,
            replacement: Arc::new(replacement),
        })
    }

    /// A non-indexed rule with a constant replacement.
    pub fn fixed(
        arg: impl Into<String>,
        platforms: impl IntoIterator<Item = Platform>,
        replacement: impl Into<String>,
    ) -> Result<Self, Error> {
        let replacement = replacement.into();
        Self::new(arg, platforms, false, move |_, _| replacement.clone())
    }

    /// The built-in rule set. Order matters.
    pub fn defaults() -> Vec<Formatter> {
        use Platform::{Android, Ios};

        fn indexed(kind: char) -> Formatter {
            Formatter::new(format!("%{}", kind), [Android], true, move |index, _| {
                format!("%{}${}", index, kind)
            })
            .expect("built-in formatter")
        }

        vec![
            Formatter::fixed("\\", Platform::ALL, "\\\\").expect("built-in formatter"),
            Formatter::fixed("\n", Platform::ALL, "\\n").expect("built-in formatter"),
            Formatter::fixed("'", [Android], "\\'").expect("built-in formatter"),
            indexed('s'),
            indexed('d'),
            indexed('f'),
            Formatter::fixed("%s", [Ios], "%@").expect("built-in formatter"),
            Formatter::new("\"", [Ios], false, |_, is_xml| {
                let quote = if is_xml { "\\\"" } else { "\"" };
                quote.to_string()
            })
            .expect("built-in formatter"),
        ]
    }

    pub fn arg(&self) -> &str {
        &self.arg
    }

    pub fn platforms(&self) -> &BTreeSet<Platform> {
        &self.platforms
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    pub fn applies_to(&self, platform: Platform) -> bool {
        self.platforms.contains(&platform)
    }

    pub fn replace(&self, index: usize, is_xml: bool) -> String {
        (self.replacement)(index, is_xml)
    }
}

/// The rules of one platform, ready to scan text.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    platform: Platform,
    rules: Vec<Formatter>,
}

impl Sanitizer {
    pub fn new(formatters: &[Formatter], platform: Platform) -> Self {
        Self {
            platform,
            rules: formatters
                .iter()
                .filter(|f| f.applies_to(platform))
                .cloned()
                .collect(),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn sanitize(&self, text: &str, is_xml: bool) -> String {
        let mut out = String::with_capacity(text.len());
        let mut index = 1;
        let mut pos = 0;

        while let Some(c) = text[pos..].chars().next() {
            let rest = &text[pos..];
            let rule = self
                .rules
                .iter()
                .find(|rule| rule.first == c && rest.starts_with(rule.arg.as_str()));
            match rule {
                Some(rule) => {
                    out.push_str(&rule.replace(index, is_xml));
                    if rule.indexed {
                        index += 1;
                    }
                    pos += rule.arg.len();
                }
                None => {
                    out.push(c);
                    pos += c.len_utf8();
                }
            }
        }
        out
    }
}
