//! Platform-native documents read and written by locforge.
//!
//! Format A is Android (`values*/strings.xml`). Format B is Apple: per
//! `*.lproj` folder a `.strings` file, a `.stringsdict` plural property list and
//! an array property list, plus generated Swift accessors.

pub mod android;
pub mod array_plist;
pub mod plist;
pub mod strings;
pub mod stringsdict;
pub mod swift;

use std::io::BufRead;

use quick_xml::{Reader, events::Event};

pub use android::Format as AndroidFormat;
pub use array_plist::Format as ArrayPlistFormat;
pub use strings::Format as StringsFormat;
pub use stringsdict::Format as StringsdictFormat;

use crate::{error::Error, types::LocaleIsoCode};

pub const ANDROID_FILE_NAME: &str = "strings.xml";
pub const STRINGS_FILE_NAME: &str = "Localizable.strings";
pub const STRINGSDICT_FILE_NAME: &str = "Localizable.stringsdict";
pub const ARRAYS_FILE_NAME: &str = "LocalizableArrays.plist";
pub const ACCESSORS_FILE_NAME: &str = "LocalizedStrings.swift";
pub const HELPER_FILE_NAME: &str = "String+Localized.swift";

const ANDROID_FOLDER: &str = "values";
const APPLE_FOLDER_SUFFIX: &str = ".lproj";

/// `values` for the default locale, `values-es-rAR` style otherwise.
pub fn android_folder(locale: &LocaleIsoCode, default_locale: &LocaleIsoCode) -> String {
    if locale == default_locale {
        return ANDROID_FOLDER.to_string();
    }
    match locale.region() {
        Some(region) => format!(
            "{}-{}-r{}",
            ANDROID_FOLDER,
            locale.language(),
            region.to_ascii_uppercase()
        ),
        None => format!("{}-{}", ANDROID_FOLDER, locale.language()),
    }
}

/// Locale of an Android resource folder: the suffix after the first hyphen, or
/// the default locale when there is none.
pub fn locale_from_android_folder(
    folder: &str,
    default_locale: &LocaleIsoCode,
) -> Result<LocaleIsoCode, Error> {
    match folder.split_once('-') {
        Some((_, qualifier)) => locale_from_android_qualifier(qualifier),
        None => Ok(default_locale.clone()),
    }
}

/// `fr` or `es-rAR`. Other qualifiers (`night`, `v21`, `sw600dp`) are errors.
fn locale_from_android_qualifier(qualifier: &str) -> Result<LocaleIsoCode, Error> {
    let code = match qualifier.split_once('-') {
        Some((language, region)) => {
            let region = region.strip_prefix('r').unwrap_or(region);
            format!("{}_{}", language, region)
        }
        None => qualifier.to_string(),
    };
    LocaleIsoCode::new(&code)
}

/// `es-AR.lproj` style folder name.
pub fn apple_folder(locale: &LocaleIsoCode) -> String {
    format!("{}{}", locale.to_bcp47(), APPLE_FOLDER_SUFFIX)
}

/// Locale of an Apple folder: the name before the first dot.
pub fn locale_from_apple_folder(folder: &str) -> Result<LocaleIsoCode, Error> {
    let code = folder.split('.').next().unwrap_or_default();
    LocaleIsoCode::new(code)
}

/// `values` or `values-<locale>`. Folders with other qualifiers hold no
/// translations.
pub fn is_android_folder(folder: &str) -> bool {
    match folder.strip_prefix("values-") {
        Some(qualifier) => locale_from_android_qualifier(qualifier).is_ok(),
        None => folder == ANDROID_FOLDER,
    }
}

pub fn is_apple_folder(folder: &str) -> bool {
    folder.ends_with(APPLE_FOLDER_SUFFIX)
}

/// Reads the text content of the element whose start tag was just consumed,
/// up to and including its end tag. Nested markup is dropped, its text kept.
pub(crate) fn read_element_text<R: BufRead>(reader: &mut Reader<R>) -> Result<String, Error> {
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(&e.unescape()?),
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(&e.into_inner())),
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => break,
            Event::End(_) => depth -= 1,
            Event::Eof => {
                return Err(Error::InvalidResource("unexpected end of file".to_string()));
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

/// Skips everything up to and including the end tag of the current element.
pub(crate) fn skip_element<R: BufRead>(reader: &mut Reader<R>) -> Result<(), Error> {
    read_element_text(reader).map(|_| ())
}

/// Makes `text` safe inside `<!-- -->`.
pub(crate) fn comment_text(text: &str) -> String {
    format!(" {} ", text.replace("--", "- -"))
}
