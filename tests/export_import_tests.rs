use locforge::{
    ExportOptions, Formatter, ImportOptions, LocaleIsoCode, Platform, Project, Quantity, Resource,
    ResourceId, ResourceMetadata, ResourceSet, ResourceType, generate_files,
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

fn locale(code: &str) -> LocaleIsoCode {
    LocaleIsoCode::new(code).expect("valid locale")
}

fn id(value: &str) -> ResourceId {
    ResourceId::new(value).expect("valid id")
}

fn read(path: impl AsRef<Path>) -> String {
    std::fs::read_to_string(path.as_ref())
        .unwrap_or_else(|e| panic!("reading {}: {}", path.as_ref().display(), e))
}

fn greeting_set() -> ResourceSet {
    let mut set = ResourceSet::default();
    set.strings
        .metadata
        .insert(id("greeting"), ResourceMetadata::default());
    set.strings
        .values
        .entry(id("greeting"))
        .or_default()
        .insert(locale("en"), Resource::str("Hello %s"));
    set
}

#[test]
fn test_greeting_exports_to_both_platforms() {
    let dir = tempfile::tempdir().unwrap();
    let output = BTreeMap::from([
        (Platform::Android, dir.path().join("android")),
        (Platform::Ios, dir.path().join("ios")),
    ]);

    let report = generate_files(
        &greeting_set(),
        &locale("en"),
        &Platform::all(),
        &Formatter::defaults(),
        &output,
    );
    assert!(report.is_success(), "{:?}", report.failed);

    let xml = read(dir.path().join("android/values/strings.xml"));
    assert!(xml.contains(r#"<string name="greeting">Hello %1$s</string>"#));
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
    assert!(!xml.contains("DOCTYPE"));

    let strings = read(dir.path().join("ios/en.lproj/Localizable.strings"));
    assert!(strings.contains(r#""greeting" = "Hello %@";"#));

    let swift = read(dir.path().join("ios/LocalizedStrings.swift"));
    assert!(swift.contains("/// Hello %s"));
    assert!(swift.contains("static func greeting(_ arg1: String) -> String"));
    assert!(dir.path().join("ios/String+Localized.swift").exists());
    assert!(
        read(dir.path().join("ios/en.lproj/Localizable.stringsdict")).contains("<!DOCTYPE plist")
    );
}

#[test]
fn test_skip_rules_per_locale() {
    let mut set = ResourceSet::default();
    for table in [&mut set.strings, &mut set.plurals, &mut set.arrays] {
        table.metadata.insert(id("item"), ResourceMetadata::default());
    }
    set.arrays.metadata.get_mut(&id("item")).unwrap().size = 2;

    set.strings
        .values
        .entry(id("item"))
        .or_default()
        .insert(locale("en"), Resource::str("Item"));
    // French plural without `other`, German one with it
    let plurals = set.plurals.values.entry(id("item")).or_default();
    plurals.insert(
        locale("fr"),
        Resource::plural([(Quantity::One, "Un article".to_string())]),
    );
    plurals.insert(
        locale("de"),
        Resource::plural([(Quantity::Other, "%d Artikel".to_string())]),
    );

    let dir = tempfile::tempdir().unwrap();
    let output = BTreeMap::from([(Platform::Android, dir.path().to_path_buf())]);
    generate_files(
        &set,
        &locale("en"),
        &BTreeSet::from([Platform::Android]),
        &Formatter::defaults(),
        &output,
    );

    let en = read(dir.path().join("values/strings.xml"));
    assert!(en.contains("<string name=\"item\">Item</string>"));
    assert!(en.contains("<plurals name=\"item\""));
    assert!(en.contains("<string-array name=\"item\""));

    let fr = read(dir.path().join("values-fr/strings.xml"));
    assert!(!fr.contains("<string name=\"item\""));
    assert!(!fr.contains("<plurals"));
    assert!(!fr.contains("<string-array"));

    let de = read(dir.path().join("values-de/strings.xml"));
    assert!(de.contains("<item quantity=\"other\">%1$d Artikel</item>"));
    assert!(!de.contains("<string name=\"item\""));
}

#[test]
fn test_import_overwrite_policy() {
    let dir = tempfile::tempdir().unwrap();
    let res = dir.path().join("res");
    std::fs::create_dir_all(res.join("values")).unwrap();
    std::fs::write(
        res.join("values/strings.xml"),
        r#"<resources><string name="id">foo</string></resources>"#,
    )
    .unwrap();

    let mut project = Project::create(dir.path().join("project"), locale("en")).unwrap();
    project
        .create_resource(id("id"), ResourceType::Strings)
        .unwrap();
    project
        .update_localized_value(&id("id"), &locale("en"), Resource::str("bar"))
        .unwrap();

    let report = project.import(&res, &ImportOptions::new(Platform::Android));
    assert!(report.is_success());
    assert_eq!(
        project.localized_value(ResourceType::Strings, &id("id"), &locale("en")),
        Some(&Resource::str("bar"))
    );

    let report = project.import(
        &res,
        &ImportOptions::new(Platform::Android).with_overwrite(true),
    );
    assert!(report.is_success());
    assert_eq!(
        project.localized_value(ResourceType::Strings, &id("id"), &locale("en")),
        Some(&Resource::str("foo"))
    );
}

#[test]
fn test_export_then_import_restores_authoring_text() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = Project::create(dir.path().join("source"), locale("en")).unwrap();
    source.add_locale(locale("es_ar"));
    source
        .create_resource(id("welcomeMessage"), ResourceType::Strings)
        .unwrap();
    source
        .create_resource(id("apples"), ResourceType::Plurals)
        .unwrap();
    source
        .create_resource(id("planets"), ResourceType::Arrays)
        .unwrap();
    source
        .store_mut(ResourceType::Arrays)
        .resize_array(&id("planets"), 2)
        .unwrap();

    let values = [
        (
            "welcomeMessage",
            "en",
            Resource::str("Hi %s, it's \"%d\" days\nsince"),
        ),
        ("welcomeMessage", "es_ar", Resource::str("Hola %s")),
        (
            "apples",
            "en",
            Resource::plural([
                (Quantity::One, "One apple".to_string()),
                (Quantity::Other, "%d apples".to_string()),
            ]),
        ),
        (
            "planets",
            "en",
            Resource::array(vec!["Mercury".to_string(), "Venus".to_string()]),
        ),
    ];
    for (resource_id, code, value) in &values {
        source
            .update_localized_value(&id(resource_id), &locale(code), value.clone())
            .unwrap();
    }

    let out = dir.path().join("out");
    let report = source
        .export(
            &ExportOptions::new()
                .with_output(Platform::Android, out.join("android"))
                .with_output(Platform::Ios, out.join("ios")),
        )
        .unwrap();
    assert!(report.is_success(), "{:?}", report.failed);
    assert!(out.join("android/values-es-rAR/strings.xml").exists());
    assert!(out.join("ios/es-AR.lproj/Localizable.strings").exists());

    for platform in Platform::ALL {
        let root = match platform {
            Platform::Android => out.join("android"),
            Platform::Ios => out.join("ios"),
        };
        let mut target =
            Project::create(dir.path().join(format!("target-{}", platform)), locale("en")).unwrap();
        let report = target.import(&root, &ImportOptions::new(platform));
        assert!(report.is_success(), "{}: {:?}", platform, report.failed);

        for (resource_id, code, value) in &values {
            let resource_type = value.resource_type();
            assert_eq!(
                target.localized_value(resource_type, &id(resource_id), &locale(code)),
                Some(value),
                "{} {} {}",
                platform,
                resource_id,
                code
            );
            let metadata = target
                .store(resource_type)
                .metadata(&id(resource_id))
                .unwrap();
            assert_eq!(metadata.platforms, BTreeSet::from([platform]));
        }
        assert!(target.locales().contains(&locale("es_ar")));
    }
}

#[test]
fn test_failed_rename_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let mut project = Project::create(dir.path(), locale("en")).unwrap();
    for name in ["cat", "dog"] {
        project
            .create_resource(id(name), ResourceType::Strings)
            .unwrap();
        project
            .update_localized_value(&id(name), &locale("en"), Resource::str(name))
            .unwrap();
    }
    project.flush();
    let before = read(dir.path().join("strings.properties"));

    let err = project
        .store_mut(ResourceType::Strings)
        .rename_resource(&id("cat"), id("dog"))
        .unwrap_err();
    assert!(matches!(err, locforge::Error::IdAlreadyExists(_)));
    project.flush();

    assert_eq!(read(dir.path().join("strings.properties")), before);
    assert_eq!(
        project.localized_value(ResourceType::Strings, &id("cat"), &locale("en")),
        Some(&Resource::str("cat"))
    );
}

#[test]
fn test_backslashes_survive_export_and_import() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = Project::create(dir.path().join("source"), locale("en")).unwrap();
    let values = [
        ("aPath", r"C:\"),
        ("bTitle", "Title"),
        ("cMixed", r#"a\b \"quoted\" \n not a newline"#),
    ];
    for (name, text) in values {
        source
            .create_resource(id(name), ResourceType::Strings)
            .unwrap();
        source
            .update_localized_value(&id(name), &locale("en"), Resource::str(text))
            .unwrap();
    }

    let out = dir.path().join("out");
    let report = source
        .export(
            &ExportOptions::new()
                .with_output(Platform::Android, out.join("android"))
                .with_output(Platform::Ios, out.join("ios")),
        )
        .unwrap();
    assert!(report.is_success(), "{:?}", report.failed);
    assert!(
        read(out.join("ios/en.lproj/Localizable.strings")).contains(r#""aPath" = "C:\\";"#)
    );

    for platform in Platform::ALL {
        let root = match platform {
            Platform::Android => out.join("android"),
            Platform::Ios => out.join("ios"),
        };
        let mut target =
            Project::create(dir.path().join(format!("target-{}", platform)), locale("en")).unwrap();
        let report = target.import(&root, &ImportOptions::new(platform));
        assert!(report.is_success(), "{}: {:?}", platform, report.failed);
        for (name, text) in values {
            assert_eq!(
                target.localized_value(ResourceType::Strings, &id(name), &locale("en")),
                Some(&Resource::str(text)),
                "{} {}",
                platform,
                name
            );
        }
    }
}

#[test]
fn test_malformed_strings_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("ios");
    std::fs::create_dir_all(root.join("en.lproj")).unwrap();
    std::fs::write(
        root.join("en.lproj/Localizable.strings"),
        "\"ok\" = \"fine\";\n\"broken = \"oops\n garbage {{{",
    )
    .unwrap();

    let mut project = Project::create(dir.path().join("project"), locale("en")).unwrap();
    let report = project.import(&root, &ImportOptions::new(Platform::Ios));
    assert!(!report.is_success());
    assert!(report.succeeded.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(
        report.failed[0].path,
        root.join("en.lproj/Localizable.strings")
    );
    assert!(
        project
            .localized_value(ResourceType::Strings, &id("ok"), &locale("en"))
            .is_none()
    );
}
