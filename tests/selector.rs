mod common;

use common::headers;
use csv_bulkload::coerce::{Coercion, ColumnKinds};
use csv_bulkload::config::{LoadConfig, SynonymPair};
use csv_bulkload::error::LoadError;
use csv_bulkload::mapping::AliasTable;
use csv_bulkload::selector::{
    ColumnSelector, ColumnSource, DiscoveredSchemaSelector, FixedSchemaSelector,
};

fn kinds() -> ColumnKinds {
    LoadConfig::default().column_kinds()
}

fn fixed(targets: &[&str]) -> FixedSchemaSelector {
    FixedSchemaSelector::new(
        "id",
        headers(targets),
        headers(&["created_at", "updated_at"]),
        LoadConfig::default().aliases,
        kinds(),
    )
}

#[test]
fn fixed_schema_keeps_target_order_and_drops_extras() {
    let selection = fixed(&["product_idx", "inactive", "description"])
        .select(&headers(&["productidx", "descr", "extra_col"]))
        .expect("select");
    assert_eq!(
        selection.plan.names(),
        vec!["id", "product_idx", "description"]
    );
    assert_eq!(selection.missing_in_source, vec!["inactive".to_string()]);
    assert_eq!(selection.ignored_in_source, vec!["extra_col".to_string()]);
}

#[test]
fn fixed_schema_order_follows_target_not_header() {
    let selection = fixed(&["product_idx", "inactive", "description"])
        .select(&headers(&["descr", "InactiveFlag", "ProductIdx"]))
        .expect("select");
    let columns = selection.plan.columns();
    assert_eq!(
        selection.plan.names(),
        vec!["id", "product_idx", "inactive", "description"]
    );
    assert_eq!(columns[0].source, ColumnSource::Generated);
    assert_eq!(columns[0].coercion, Coercion::Identifier);
    assert_eq!(columns[1].source, ColumnSource::Field(2));
    assert_eq!(columns[1].coercion, Coercion::Integer);
    assert_eq!(columns[2].coercion, Coercion::Bit);
    assert_eq!(columns[3].coercion, Coercion::Text);
}

#[test]
fn fixed_schema_appends_timestamps_only_when_present() {
    let selector = fixed(&["gtin"]);
    let without = selector.select(&headers(&["gtin"])).expect("select");
    assert_eq!(without.plan.names(), vec!["id", "gtin"]);

    let with = selector
        .select(&headers(&["Updated_At", "gtin"]))
        .expect("select");
    assert_eq!(with.plan.names(), vec!["id", "gtin", "updated_at"]);
    assert_eq!(with.plan.columns()[2].coercion, Coercion::Timestamp);
    assert!(with.missing_in_source.is_empty());
}

#[test]
fn fixed_schema_ignores_source_identifier() {
    let selection = fixed(&["gtin"])
        .select(&headers(&["id", "gtin"]))
        .expect("select");
    assert_eq!(selection.plan.names(), vec!["id", "gtin"]);
    assert_eq!(selection.plan.columns()[0].source, ColumnSource::Generated);
    assert_eq!(selection.plan.columns()[1].source, ColumnSource::Field(1));
}

#[test]
fn fixed_schema_without_overlap_fails() {
    let err = fixed(&["gtin"])
        .select(&headers(&["id", "unrelated"]))
        .expect_err("no overlap");
    assert!(matches!(
        err.downcast_ref::<LoadError>(),
        Some(LoadError::SchemaMismatch(_))
    ));
}

#[test]
fn fixed_schema_plan_is_deterministic() {
    let selector = fixed(&["product_idx", "product_seq", "description", "gtin"]);
    let header = headers(&["gtin", "ProductSeg", "descr", "productidx"]);
    let first = selector.select(&header).expect("first");
    let second = selector.select(&header).expect("second");
    assert_eq!(first.plan, second.plan);
    assert_eq!(
        first.plan.names(),
        vec!["id", "product_idx", "product_seq", "description", "gtin"]
    );
}

fn discovered(table_columns: &[&str]) -> DiscoveredSchemaSelector {
    DiscoveredSchemaSelector::new(
        "id",
        headers(table_columns),
        AliasTable::new(),
        vec![SynonymPair("productseq".to_string(), "productseg".to_string())],
        kinds(),
    )
}

#[test]
fn discovered_schema_uses_table_order_and_spelling() {
    let selection = discovered(&["ID", "ProductIdx", "Descr", "ListIdx"])
        .select(&headers(&["descr", "listidx", "productidx", "extra"]))
        .expect("select");
    assert_eq!(
        selection.plan.names(),
        vec!["id", "ProductIdx", "Descr", "ListIdx"]
    );
    assert_eq!(selection.plan.columns()[1].coercion, Coercion::Integer);
    assert_eq!(selection.plan.columns()[3].coercion, Coercion::Integer);
    assert_eq!(selection.ignored_in_source, vec!["extra".to_string()]);
    assert!(selection.missing_in_source.is_empty());
}

#[test]
fn discovered_schema_renames_synonym_towards_declared_spelling() {
    let selection = discovered(&["id", "productseq"])
        .select(&headers(&["productseg"]))
        .expect("select");
    assert_eq!(selection.plan.names(), vec!["id", "productseq"]);
    assert_eq!(selection.plan.columns()[1].source, ColumnSource::Field(0));

    let selection = discovered(&["id", "productseg"])
        .select(&headers(&["productseq"]))
        .expect("select");
    assert_eq!(selection.plan.names(), vec!["id", "productseg"]);
}

#[test]
fn discovered_schema_prefers_exact_spelling_over_synonym() {
    let selection = discovered(&["id", "productseq"])
        .select(&headers(&["productseg", "productseq"]))
        .expect("select");
    assert_eq!(selection.plan.columns()[1].source, ColumnSource::Field(1));
    assert_eq!(selection.ignored_in_source, vec!["productseg".to_string()]);
}

#[test]
fn discovered_schema_warns_instead_of_failing() {
    let selection = discovered(&["id", "gtin", "description"])
        .select(&headers(&["unrelated"]))
        .expect("degraded selection");
    assert_eq!(selection.plan.names(), vec!["id"]);
    assert_eq!(
        selection.missing_in_source,
        vec!["gtin".to_string(), "description".to_string()]
    );
    assert_eq!(selection.ignored_in_source, vec!["unrelated".to_string()]);
}
