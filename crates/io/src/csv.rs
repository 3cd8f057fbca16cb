// CSV/TSV table import

use std::path::Path;

use crate::encoding::decode_with_fallback;
use crate::error::DataLoadError;
use crate::table::{RawTable, ReadOptions};

/// Read a delimited text file into a [`RawTable`].
///
/// The bytes go through the encoding chain in `options`; the first row is the
/// header row.
pub fn read_table(path: &Path, options: &ReadOptions) -> Result<RawTable, DataLoadError> {
    let origin = path.display().to_string();
    let bytes = std::fs::read(path).map_err(|source| DataLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let decoded = decode_with_fallback(&bytes, &options.encodings).map_err(|attempted| {
        DataLoadError::Encoding {
            origin: origin.clone(),
            attempted,
        }
    })?;

    let delimiter = options
        .delimiter
        .unwrap_or_else(|| sniff_delimiter(&decoded.text));

    let table = parse_table(&origin, &decoded.text, delimiter)?.with_encoding(decoded.encoding);
    tracing::debug!(
        origin = %origin,
        encoding = %decoded.encoding,
        delimiter = %(delimiter as char).escape_default(),
        rows = table.len(),
        "read csv table"
    );
    Ok(table)
}

/// Parse already-decoded text. Records may have fewer fields than the header.
pub fn parse_table(origin: &str, content: &str, delimiter: u8) -> Result<RawTable, DataLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let headers: Vec<String> = match records.next() {
        Some(result) => result
            .map_err(|e| csv_error(origin, e))?
            .iter()
            .map(str::to_string)
            .collect(),
        None => return Err(DataLoadError::Empty { origin: origin.to_string() }),
    };

    let mut rows = Vec::new();
    for result in records {
        let record = result.map_err(|e| csv_error(origin, e))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable::new(origin, headers, rows))
}

fn csv_error(origin: &str, err: csv::Error) -> DataLoadError {
    DataLoadError::Csv {
        origin: origin.to_string(),
        message: err.to_string(),
    }
}

/// Records sampled when sniffing a delimiter.
const SNIFF_RECORDS: usize = 10;

/// Pick the field delimiter from the first records of `content`.
///
/// Each candidate parses whole records, so a quoted feature name spanning
/// several lines counts once instead of as loose fragments. The header must
/// split into more than one field; the score is the header width times the
/// number of sampled records with that width. Ties keep the earlier candidate,
/// and comma wins when nothing splits the header.
pub fn sniff_delimiter(content: &str) -> u8 {
    let mut best = (0usize, b',');
    for delimiter in [b',', b';', b'\t', b'|'] {
        let widths = record_widths(content, delimiter);
        let Some(&header) = widths.first() else {
            continue;
        };
        if header <= 1 {
            continue;
        }
        let consistent = widths.iter().filter(|&&w| w == header).count();
        let score = consistent * header;
        if score > best.0 {
            best = (score, delimiter);
        }
    }
    best.1
}

/// Field counts of the first sampled records, stopping at the first malformed one.
fn record_widths(content: &str, delimiter: u8) -> Vec<usize> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes())
        .records()
        .take(SNIFF_RECORDS)
        .map_while(Result::ok)
        .map(|record| record.len())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{TextEncoding, DEFAULT_CHAIN};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "Geological_Feature;Setting;Process\nEsker;Glacial;Relief\nSand;Sediments;Lithology\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "Geological_Feature,Setting,Process\nEsker,Glacial,Relief\nSand,Sediments,Lithology\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "Geological_Feature\tSetting\nEsker\tGlacial\nSand\tSediments\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        let content = "Name;Process;Setting\n\"Peat (organic-rich)\";\"Lithology, relief\";Sediments\nSand;Lithology;Sediments\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_multiline_names_count_as_one_record() {
        let content = "name;Definition\n\"Glacifluvial delta\n(aka. glacier-fed\ndelta)\";Sand, gravel\nEsker;Ridge\n";
        assert_eq!(record_widths(content, b';'), vec![2, 2, 2]);
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_pipe_delimiter_with_quoted_breaks() {
        let content = "name|Blowout|Freespan development\n\"Shallow\ngas\"|x|\nEsker||x\n";
        assert_eq!(sniff_delimiter(content), b'|');
    }

    #[test]
    fn test_single_column_defaults_to_comma() {
        assert_eq!(sniff_delimiter("Geological_Feature\nEsker\n"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn test_parse_table_keeps_quoted_newlines() {
        let content = "Geological feature inventory,Definition\n\"Glacifluvial delta\n(aka. glacier-fed\ndelta)\",Delta\n";
        let table = parse_table("mem", content, b',').unwrap();
        assert_eq!(table.headers, vec!["Geological feature inventory", "Definition"]);
        assert_eq!(table.rows[0][0], "Glacifluvial delta\n(aka. glacier-fed\ndelta)");
    }

    #[test]
    fn test_parse_empty_content_is_an_error() {
        let err = parse_table("mem", "", b',').unwrap_err();
        assert!(matches!(err, DataLoadError::Empty { .. }));
    }

    #[test]
    fn test_read_table_missing_file() {
        let dir = tempdir().unwrap();
        let err = read_table(&dir.path().join("nope.csv"), &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, DataLoadError::Io { .. }));
    }

    #[test]
    fn test_read_table_latin1_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin1.csv");
        fs::write(&path, b"Geological_Feature,Setting\nS\xE9diment,Coastal\n").unwrap();

        let table = read_table(&path, &ReadOptions::default()).unwrap();
        assert_eq!(table.encoding, Some(TextEncoding::Latin1));
        assert_eq!(table.rows[0][0], "Sédiment");
    }

    #[test]
    fn test_read_table_encoding_failure_lists_attempts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, b"Name\n\xC3\x28\n").unwrap();

        let options = ReadOptions {
            encodings: vec![TextEncoding::Utf8],
            delimiter: None,
        };
        match read_table(&path, &options).unwrap_err() {
            DataLoadError::Encoding { attempted, .. } => {
                assert_eq!(attempted, vec![TextEncoding::Utf8]);
            }
            other => panic!("expected encoding error, got {other:?}"),
        }
    }

    #[test]
    fn test_ascii_content_is_identical_across_encodings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ascii.csv");
        fs::write(&path, "Geological_Feature,Piles_Assessment\nSoft mud,Higher Constraint\n").unwrap();

        let mut tables = Vec::new();
        for encoding in DEFAULT_CHAIN {
            let options = ReadOptions {
                encodings: vec![encoding],
                delimiter: None,
            };
            let table = read_table(&path, &options).unwrap();
            assert_eq!(table.encoding, Some(encoding));
            tables.push((table.headers, table.rows));
        }
        assert!(tables.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_explicit_delimiter_skips_sniffing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipe.csv");
        fs::write(&path, "a,b|c\n1,2|3\n").unwrap();

        let options = ReadOptions {
            delimiter: Some(b'|'),
            ..ReadOptions::default()
        };
        let table = read_table(&path, &options).unwrap();
        assert_eq!(table.headers, vec!["a,b", "c"]);
    }
}
