// Property-based tests for decoding and CSV parsing.
// CI: 128 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use geomatrix_io::csv::read_table;
use geomatrix_io::{ReadOptions, DEFAULT_CHAIN};
use proptest::prelude::*;

fn config_128() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(128),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

/// Printable ASCII, including quotes, delimiters and padding.
fn arb_ascii_cell() -> impl Strategy<Value = String> {
    r"[ -~]{1,20}"
}

fn arb_rows() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec((arb_ascii_cell(), prop_oneof![Just(String::new()), arb_ascii_cell()]), 1..8)
}

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

proptest! {
    #![proptest_config(config_128())]

    #[test]
    fn ascii_tables_decode_identically_under_every_encoding(rows in arb_rows()) {
        let mut content = String::from("Geological_Feature,Setting\n");
        for (name, setting) in &rows {
            content.push_str(&format!("{},{}\n", quote(name), quote(setting)));
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geological_data.csv");
        std::fs::write(&path, &content).unwrap();

        let mut decoded = Vec::new();
        for encoding in DEFAULT_CHAIN {
            let options = ReadOptions {
                encodings: vec![encoding],
                delimiter: None,
            };
            let table = read_table(&path, &options).unwrap();
            prop_assert_eq!(table.encoding, Some(encoding));
            prop_assert_eq!(&table.headers, &vec!["Geological_Feature".to_string(), "Setting".to_string()]);

            let names: Vec<&str> = table.rows.iter().map(|r| r[0].as_str()).collect();
            let expected: Vec<&str> = rows.iter().map(|(n, _)| n.as_str()).collect();
            prop_assert_eq!(names, expected);

            decoded.push((table.headers, table.rows));
        }
        prop_assert!(decoded.windows(2).all(|w| w[0] == w[1]));
    }
}
