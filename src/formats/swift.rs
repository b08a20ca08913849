//! Generated Swift sources: typed accessors for every exported resource and
//! the `String` extension they call into.

use std::{fmt::Write as _, io::Write, path::Path};

use indoc::indoc;

use crate::{
    error::Error,
    naming::{apple_key, swift_identifier},
    placeholder::{ArgumentType, argument_types},
    types::ResourceType,
};

const ACCESSORS_HEADER: &str = indoc! {"
    // Generated by locforge. Do not edit.

    import Foundation

    enum LocalizedStrings {
"};

/// Contents of `String+Localized.swift`.
pub const HELPER_SOURCE: &str = indoc! {r#"
    // Generated by locforge.

    import Foundation

    extension String {
        var localized: String {
            NSLocalizedString(self, comment: "")
        }

        func localized(_ arguments: CVarArg...) -> String {
            String.localizedStringWithFormat(localized, arguments)
        }

        var localizedArray: [String] {
            guard let url = Bundle.main.url(forResource: "LocalizableArrays", withExtension: "plist"),
                  let arrays = NSDictionary(contentsOf: url) as? [String: [String]]
            else {
                return []
            }
            return arrays[self] ?? []
        }
    }
"#};

/// One generated accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessor {
    pub resource_type: ResourceType,
    pub group: String,
    /// Internal resource id.
    pub id: String,
    /// Default-locale text shown in the doc comment; for plurals the `other`
    /// form, for arrays the first element.
    pub example: String,
}

impl Accessor {
    fn arguments(&self) -> Vec<ArgumentType> {
        match self.resource_type {
            ResourceType::Strings => argument_types(&self.example),
            ResourceType::Plurals => {
                let arguments = argument_types(&self.example);
                if arguments.is_empty() {
                    vec![ArgumentType::Int]
                } else {
                    arguments
                }
            }
            ResourceType::Arrays => Vec::new(),
        }
    }

    fn render(&self, out: &mut String) {
        let key = apple_key(&self.id);
        let name = swift_identifier(&self.id);
        let indent = "        ";
        let example = self.example.replace('\n', "\\n");
        let _ = writeln!(out, "{}/// {}", indent, example);

        if self.resource_type == ResourceType::Arrays {
            let _ = writeln!(
                out,
                "{}static var {}: [String] {{ \"{}\".localizedArray }}",
                indent, name, key
            );
            return;
        }

        let arguments = self.arguments();
        if arguments.is_empty() {
            let _ = writeln!(
                out,
                "{}static var {}: String {{ \"{}\".localized }}",
                indent, name, key
            );
            return;
        }

        let params = arguments
            .iter()
            .enumerate()
            .map(|(i, ty)| format!("_ arg{}: {}", i + 1, ty.swift_name()))
            .collect::<Vec<_>>()
            .join(", ");
        let args = (1..=arguments.len())
            .map(|i| format!("arg{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            out,
            "{}static func {}({}) -> String {{ \"{}\".localized({}) }}",
            indent, name, params, key, args
        );
    }
}

fn section_name(resource_type: ResourceType) -> &'static str {
    match resource_type {
        ResourceType::Strings => "Strings",
        ResourceType::Plurals => "Plurals",
        ResourceType::Arrays => "Arrays",
    }
}

/// Renders `LocalizedStrings.swift`. Accessors are expected in export order;
/// a `MARK` line precedes each new non-empty group.
pub fn render_accessors(accessors: &[Accessor]) -> String {
    let mut out = String::from(ACCESSORS_HEADER);

    for resource_type in ResourceType::ALL {
        let section: Vec<&Accessor> = accessors
            .iter()
            .filter(|a| a.resource_type == resource_type)
            .collect();
        if section.is_empty() {
            continue;
        }
        let _ = writeln!(out, "    enum {} {{", section_name(resource_type));
        let mut current_group: Option<&str> = None;
        for accessor in section {
            if !accessor.group.is_empty() && current_group != Some(accessor.group.as_str()) {
                let _ = writeln!(out, "        // MARK: - {}", accessor.group);
            }
            current_group = Some(accessor.group.as_str());
            accessor.render(&mut out);
        }
        out.push_str("    }\n");
    }

    out.push_str("}\n");
    out
}

pub fn write_accessors<P: AsRef<Path>>(path: P, accessors: &[Accessor]) -> Result<(), Error> {
    write_file(path.as_ref(), &render_accessors(accessors))
}

/// Writes the helper unless a file already exists at `path`. Returns whether
/// it was written.
pub fn write_helper<P: AsRef<Path>>(path: P) -> Result<bool, Error> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(false);
    }
    write_file(path, HELPER_SOURCE)?;
    Ok(true)
}

fn write_file(path: &Path, contents: &str) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)?;
    file.write_all(contents.as_bytes())?;
    Ok(())
}
