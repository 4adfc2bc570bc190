//! Property-based tests for the scanning pipeline:
//! 1. Reflection is deterministic and cached maps are shared.
//! 2. Binding the same columns twice yields identical (shared) plans.
//! 3. Postgres array literals round-trip through encode/decode.

use std::sync::Arc;

use proptest::prelude::*;

use rowscan_api::converter::ArrayDecoder;
use rowscan_api::value::Value;
use rowscan_api::Record;
use rowscan_engine::array::{encode_pg_array, PgTextArrayDecoder};
use rowscan_engine::bind::bind;
use rowscan_engine::config::{ColumnPolicy, TagPolicy};
use rowscan_engine::reflect::reflect;
use rowscan_engine::{MemoryCursor, ScanCache, ScanConfig, Scanner};

#[derive(Debug, Default, Record)]
struct Beer {
    id: i64,
    name: String,
    consumed: bool,
    rating: Option<f64>,
    tags: Vec<String>,
}

const BEER_COLUMNS: [&str; 5] = ["id", "name", "consumed", "rating", "tags"];

// =============================================================================
// Strategy helpers
// =============================================================================

fn tag_policy() -> impl Strategy<Value = TagPolicy> {
    prop_oneof![Just(TagPolicy::FieldName), Just(TagPolicy::Ignore), Just(TagPolicy::Require)]
}

/// A subset of the beer columns in random order, plus optional unknown
/// columns.
fn column_list() -> impl Strategy<Value = Vec<String>> {
    (
        Just(BEER_COLUMNS.to_vec()).prop_shuffle(),
        0..=BEER_COLUMNS.len(),
        prop::collection::vec("x_[a-z]{1,6}", 0..3),
    )
        .prop_map(|(shuffled, keep, extra)| {
            let mut columns: Vec<String> = shuffled[..keep].iter().map(|s| s.to_string()).collect();
            for name in extra {
                if !columns.contains(&name) {
                    columns.push(name);
                }
            }
            columns
        })
}

/// Array elements including the awkward ones: empty strings, the NULL
/// literal, delimiters, quotes, backslashes and whitespace.
fn element() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        1 => Just(None),
        1 => Just(Some(String::new())),
        1 => Just(Some("NULL".to_string())),
        6 => "[ -~]{0,12}".prop_map(Some),
        1 => "[a-zé\u{4e2d} ]{1,6}".prop_map(Some),
    ]
}

// =============================================================================
// Reflection
// =============================================================================

proptest! {
    #[test]
    fn reflect_is_deterministic(policy in tag_policy()) {
        let first = reflect::<Beer>(policy);
        let second = reflect::<Beer>(policy);
        match (first, second) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(a), Err(b)) => prop_assert_eq!(a.to_string(), b.to_string()),
            (a, b) => prop_assert!(false, "diverged: {:?} vs {:?}", a, b),
        }
    }

    #[test]
    fn cached_type_map_is_shared(policy in tag_policy()) {
        let cache = ScanCache::new(16);
        if let Ok(first) = cache.types().get_or_reflect::<Beer>(policy) {
            let second = cache.types().get_or_reflect::<Beer>(policy).unwrap();
            prop_assert!(Arc::ptr_eq(&first, &second));
        }
    }
}

// =============================================================================
// Binding
// =============================================================================

proptest! {
    #[test]
    fn bind_is_deterministic(columns in column_list()) {
        let map = reflect::<Beer>(TagPolicy::FieldName).unwrap();
        let a = bind(&map, &columns, ColumnPolicy::Lenient).unwrap();
        let b = bind(&map, &columns, ColumnPolicy::Lenient).unwrap();
        prop_assert_eq!(&a, &b);

        // every known column is bound to the field of the same name
        for binding in a.bindings() {
            prop_assert_eq!(&binding.entry.tag, &columns[binding.index]);
        }
        let unknown = columns.iter().filter(|c| c.starts_with("x_")).count();
        prop_assert_eq!(a.skipped().count(), unknown);

        let strict = bind(&map, &columns, ColumnPolicy::Strict);
        prop_assert_eq!(strict.is_ok(), unknown == 0);
    }

    #[test]
    fn cached_plan_is_shared(columns in column_list()) {
        let scanner = Scanner::with_cache(
            ScanConfig { columns: ColumnPolicy::Lenient, ..ScanConfig::default() },
            Arc::new(ScanCache::new(16)),
        );
        let a = scanner.plan::<Beer>(&columns).unwrap();
        let b = scanner.plan::<Beer>(&columns).unwrap();
        prop_assert!(Arc::ptr_eq(&a, &b));
    }
}

// =============================================================================
// Arrays
// =============================================================================

proptest! {
    #[test]
    fn pg_array_round_trip(items in prop::collection::vec(element(), 0..8)) {
        let values: Vec<Value<'static>> = items.iter().cloned().map(Value::from).collect();
        let literal = encode_pg_array(&values);
        let decoded = PgTextArrayDecoder::default().decode(&literal).unwrap();
        prop_assert_eq!(decoded, values);
    }

    #[test]
    fn pg_array_scans_into_vec(items in prop::collection::vec("[ -~]{0,12}", 0..8)) {
        let values: Vec<Value<'static>> = items.iter().cloned().map(Value::from).collect();
        let mut cursor = MemoryCursor::new(["id", "tags"])
            .with_row([Value::Int64(1), Value::from(encode_pg_array(&values))]);
        let scanner = Scanner::with_cache(ScanConfig::default(), Arc::new(ScanCache::new(4)));
        let beer: Beer = scanner.scan_one(&mut cursor).unwrap();
        prop_assert_eq!(beer.tags, items);
    }
}

#[test]
fn pg_array_literals() {
    let decoder = PgTextArrayDecoder::default();
    assert_eq!(
        decoder.decode(r#"{"a","b","c"}"#).unwrap(),
        [Value::from("a"), Value::from("b"), Value::from("c")]
    );
    assert!(decoder.decode("{}").unwrap().is_empty());
}
