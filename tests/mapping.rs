mod common;

use common::headers;
use csv_bulkload::error::LoadError;
use csv_bulkload::mapping::{AliasTable, HeaderMapper, MatchKind, normalize_header};
use proptest::prelude::*;

fn product_mapper() -> HeaderMapper {
    let aliases = AliasTable::from_iter([
        ("productidx", "product_idx"),
        ("descr", "description"),
        ("inactiveflag", "inactive"),
    ]);
    HeaderMapper::new(
        "id",
        ["product_idx", "inactive", "description", "created_at"],
        aliases,
    )
}

#[test]
fn normalizes_before_matching() {
    let mapping = product_mapper()
        .map(&headers(&["  Product_IDX ", "DESCR", "Created_At"]))
        .expect("map");
    assert_eq!(
        mapping.targets(),
        vec!["product_idx", "description", "created_at"]
    );
    assert_eq!(mapping.columns[0].matched_by, MatchKind::Identity);
    assert_eq!(mapping.columns[1].matched_by, MatchKind::Alias);
    assert_eq!(mapping.columns[1].source, "descr");
}

#[test]
fn source_identifier_is_discarded() {
    let mapping = product_mapper()
        .map(&headers(&["ID", "productidx"]))
        .expect("map");
    assert!(mapping.discarded_identifier);
    assert_eq!(mapping.targets(), vec!["product_idx"]);
    assert!(mapping.ignored.is_empty());
}

#[test]
fn identifier_cannot_be_reached_through_an_alias() {
    let aliases = AliasTable::from_iter([("legacy_id", "id")]);
    let mapper = HeaderMapper::new("id", ["id", "gtin"], aliases);
    let mapping = mapper.map(&headers(&["legacy_id", "gtin"])).expect("map");
    assert_eq!(mapping.targets(), vec!["gtin"]);
    assert_eq!(mapping.ignored, vec!["legacy_id".to_string()]);
}

#[test]
fn unknown_columns_are_dropped_silently() {
    let mapping = product_mapper()
        .map(&headers(&["productidx", "extra_col", "Notes"]))
        .expect("map");
    assert_eq!(mapping.targets(), vec!["product_idx"]);
    assert_eq!(
        mapping.ignored,
        vec!["extra_col".to_string(), "notes".to_string()]
    );
}

#[test]
fn duplicate_sources_keep_first_claimant() {
    let mapping = product_mapper()
        .map(&headers(&["descr", "Description", "DESCRIPTION"]))
        .expect("map");
    assert_eq!(mapping.columns.len(), 1);
    // identity beats alias, then header order among identities
    assert_eq!(mapping.columns[0].source_index, 1);
    assert_eq!(
        mapping.ignored,
        vec!["descr".to_string(), "description".to_string()]
    );
}

#[test]
fn absent_header_row_is_a_configuration_error() {
    for input in [Vec::new(), headers(&["", "  "])] {
        let err = product_mapper().map(&input).expect_err("no header");
        assert!(matches!(
            err.downcast_ref::<LoadError>(),
            Some(LoadError::Config(_))
        ));
    }
}

proptest! {
    #[test]
    fn mapping_is_idempotent_under_renormalization(
        names in prop::collection::vec(
            prop_oneof![
                Just("ProductIdx".to_string()),
                Just(" descr ".to_string()),
                Just("INACTIVE".to_string()),
                Just("id".to_string()),
                "[A-Za-z_ ]{1,12}",
            ],
            1..8,
        )
    ) {
        prop_assume!(names.iter().any(|n| !n.trim().is_empty()));
        let mapper = product_mapper();
        let first = mapper.map(&names).expect("first map");
        let renormalized = names.iter().map(|n| normalize_header(n)).collect::<Vec<_>>();
        let second = mapper.map(&renormalized).expect("second map");
        prop_assert_eq!(first.targets(), second.targets());
        prop_assert_eq!(first.ignored, second.ignored);
    }
}
