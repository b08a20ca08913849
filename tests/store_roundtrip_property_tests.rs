use locforge::properties::{parse, render};
use locforge::store::{decode_table, encode_table};
use locforge::types::{
    GroupId, LocaleIsoCode, Platform, Quantity, Resource, ResourceId, ResourceMetadata,
    ResourceTable, ResourceType,
};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn id_strategy() -> impl Strategy<Value = ResourceId> {
    proptest::string::string_regex("[a-z][a-zA-Z0-9_]{0,10}")
        .expect("valid id regex")
        .prop_map(|id| ResourceId::new(&id).expect("generated id is valid"))
}

fn locale_strategy() -> impl Strategy<Value = LocaleIsoCode> {
    prop::sample::select(vec!["en", "fr", "de", "es_ar", "pt_br"])
        .prop_map(|code| LocaleIsoCode::new(code).expect("valid locale"))
}

fn text_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex(r#"[a-zA-Z0-9 %$@'"=:#!\\\n\té中]{1,20}"#)
        .expect("valid text regex")
}

fn metadata_strategy(size: std::ops::Range<usize>) -> impl Strategy<Value = ResourceMetadata> {
    (
        proptest::string::string_regex("[a-z]{0,6}").expect("valid group regex"),
        prop::sample::subsequence(Platform::ALL.to_vec(), 1..=2),
        size,
    )
        .prop_map(|(group, platforms, size)| ResourceMetadata {
            group: GroupId::new(group),
            platforms: platforms.into_iter().collect(),
            size,
        })
}

fn build_table(
    entries: BTreeMap<ResourceId, (ResourceMetadata, BTreeMap<LocaleIsoCode, Resource>)>,
) -> ResourceTable {
    let mut table = ResourceTable::default();
    for (id, (metadata, values)) in entries {
        table.metadata.insert(id.clone(), metadata);
        if !values.is_empty() {
            table.values.insert(id, values);
        }
    }
    table
}

fn strings_table() -> impl Strategy<Value = ResourceTable> {
    let values = prop::collection::btree_map(
        locale_strategy(),
        text_strategy().prop_map(Resource::str),
        0..3,
    );
    prop::collection::btree_map(id_strategy(), (metadata_strategy(0..1), values), 0..6)
        .prop_map(build_table)
}

fn plurals_table() -> impl Strategy<Value = ResourceTable> {
    let items = prop::collection::btree_map(
        prop::sample::select(Quantity::ALL.to_vec()),
        text_strategy(),
        1..4,
    )
    .prop_map(Resource::plural);
    let values = prop::collection::btree_map(locale_strategy(), items, 0..3);
    prop::collection::btree_map(id_strategy(), (metadata_strategy(0..1), values), 0..6)
        .prop_map(build_table)
}

fn arrays_table() -> impl Strategy<Value = ResourceTable> {
    let entry = metadata_strategy(1..4).prop_flat_map(|metadata| {
        let element = prop_oneof![Just(String::new()), text_strategy()];
        let items = prop::collection::vec(element, metadata.size)
            .prop_filter("at least one element", |items| {
                items.iter().any(|item| !item.is_empty())
            })
            .prop_map(Resource::array);
        (
            Just(metadata),
            prop::collection::btree_map(locale_strategy(), items, 0..3),
        )
    });
    prop::collection::btree_map(id_strategy(), entry, 0..6).prop_map(build_table)
}

fn round_trip(resource_type: ResourceType, table: &ResourceTable) -> ResourceTable {
    let encoded = encode_table(resource_type, table);
    let text = render(encoded.iter());
    let parsed = parse(&text).expect("rendered properties parse");
    assert_eq!(parsed, encoded);

    let (decoded, repaired) = decode_table(
        resource_type,
        parsed.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    );
    assert!(repaired.is_empty(), "nothing to repair in {:?}", repaired);
    decoded
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn prop_strings_table_round_trips(table in strings_table()) {
        prop_assert_eq!(round_trip(ResourceType::Strings, &table), table);
    }

    #[test]
    fn prop_plurals_table_round_trips(table in plurals_table()) {
        prop_assert_eq!(round_trip(ResourceType::Plurals, &table), table);
    }

    #[test]
    fn prop_arrays_table_round_trips(table in arrays_table()) {
        prop_assert_eq!(round_trip(ResourceType::Arrays, &table), table);
    }
}
