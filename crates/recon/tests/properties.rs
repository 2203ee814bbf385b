// Property-based tests for row mapping and reconciliation.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashSet;

use proptest::prelude::*;
use payeekit_recon::{
    create_row_mapping, reconcile, standardize, Classification, ClassificationResult, Record,
};
use serde_json::{json, Value};

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Free-form payee cell: names, junk, blanks, nulls and non-strings.
fn arb_cell() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => r"[A-Za-z .,'&@-]{0,24}".prop_map(Value::from),
        1 => r"[0-9 ()+-]{0,14}".prop_map(Value::from),
        1 => Just(Value::Null),
        1 => any::<i64>().prop_map(Value::from),
    ]
}

/// Realistic payee built from a small vocabulary with affixes and noisy casing.
fn arb_payee() -> impl Strategy<Value = String> {
    let title = prop_oneof![Just(""), Just("Dr "), Just("Mr "), Just("mrs ")];
    let first = prop_oneof![
        Just("alice"),
        Just("Bob"),
        Just("CAROL"),
        Just("dave"),
        Just("Erin"),
        Just("globex"),
        Just("Initech"),
        Just("umbrella"),
    ];
    let last = prop_oneof![Just(""), Just(" smith"), Just(" Jones"), Just(" PATEL")];
    let suffix = prop_oneof![Just(""), Just(" Inc"), Just(" llc"), Just(" Jr"), Just(", Corp.")];
    (title, first, last, suffix).prop_map(|(t, f, l, s)| format!("{t}{f}{l}{s}"))
}

fn rows(cells: Vec<Value>) -> Vec<Record> {
    cells
        .into_iter()
        .map(|cell| {
            let mut r = Record::new();
            r.insert("payee".into(), cell);
            r
        })
        .collect()
}

fn results_for(names: &[String]) -> Vec<ClassificationResult> {
    names
        .iter()
        .enumerate()
        .map(|(i, n)| {
            if i % 5 == 4 {
                ClassificationResult::failed(n.clone(), "oracle unavailable")
            } else {
                ClassificationResult::success(n.clone(), Classification::Business, 75.0, "")
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn mappings_cover_every_row(cells in prop::collection::vec(arb_cell(), 1..80)) {
        let n = cells.len();
        let data = create_row_mapping(rows(cells), "payee").unwrap();

        prop_assert_eq!(data.row_mappings.len(), n);
        let mut seen: Vec<usize> = data.row_mappings.iter().map(|m| m.original_row_index).collect();
        seen.sort_unstable();
        prop_assert_eq!(seen, (0..n).collect::<Vec<_>>());
        for m in &data.row_mappings {
            prop_assert!(m.unique_payee_index < data.unique_payee_names.len());
            prop_assert!(!m.normalized_payee_name.is_empty());
        }
    }

    #[test]
    fn reconcile_preserves_row_count(cells in prop::collection::vec(arb_cell(), 1..80)) {
        let n = cells.len();
        let data = create_row_mapping(rows(cells), "payee").unwrap();
        let results = results_for(&data.unique_payee_names);
        let out = reconcile(&results, &data).unwrap();

        prop_assert_eq!(out.len(), n);
        for (m, row) in data.row_mappings.iter().zip(&out) {
            prop_assert_eq!(
                row.classification_status,
                results[m.unique_payee_index].status
            );
        }
    }

    #[test]
    fn distinct_names_stay_distinct(names in prop::collection::hash_set("Z[a-z]{3,8}", 1..60)) {
        let names: Vec<String> = names.into_iter().collect();
        let data = create_row_mapping(rows(names.iter().map(|n| json!(n)).collect()), "payee").unwrap();
        prop_assert_eq!(data.unique_payee_names.len(), data.original_file_data.len());
    }

    #[test]
    fn renormalizing_keeps_unique_set(names in prop::collection::vec(arb_payee(), 1..40)) {
        let first = create_row_mapping(rows(names.iter().map(|n| json!(n)).collect()), "payee").unwrap();
        let normalized: Vec<Value> = first
            .row_mappings
            .iter()
            .map(|m| json!(m.normalized_payee_name))
            .collect();
        let second = create_row_mapping(rows(normalized), "payee").unwrap();

        prop_assert_eq!(first.unique_count(), second.unique_count());
        prop_assert_eq!(&first.unique_normalized_names, &second.unique_normalized_names);
    }

    #[test]
    fn standardize_is_idempotent_on_payees(name in arb_payee()) {
        let once = standardize(Some(&name)).normalized;
        let twice = standardize(Some(&once)).normalized;
        prop_assert_eq!(once, twice);
    }
}

#[test]
fn vocabulary_collapses_as_expected() {
    let variants = ["Dr alice smith Jr", "ALICE SMITH", "alice smith, Corp."];
    let keys: HashSet<String> = variants
        .iter()
        .map(|v| standardize(Some(v)).normalized)
        .collect();
    assert_eq!(keys.len(), 1);
    assert!(keys.contains("Alice Smith"));
}
