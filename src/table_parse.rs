// Header-delimited text tables from the precompute pipeline. The delimiter
// varies per file (the pipeline writes some tables with pandas defaults and
// some with French-locale semicolons), so it is sniffed from the header line.

use ahash::AHashMap;
use log::warn;

/// One decoded row: header name to trimmed field value.
pub type RawRow = AHashMap<String, String>;

/// Semicolon wins iff it splits the header into strictly more fields than
/// comma does.
pub fn detect_delimiter(header_line: &str) -> u8 {
    if header_line.split(';').count() > header_line.split(',').count() {
        b';'
    } else {
        b','
    }
}

/// Decode a whole table into header-keyed rows. A table with only a header
/// (or nothing at all) is an empty row sequence, not an error. Unreadable
/// records are skipped; short records fill missing fields with "".
pub fn parse_rows(text: &str) -> Vec<RawRow> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut lines = trimmed.lines();
    let header_line = lines.next().unwrap_or("");
    if lines.next().is_none() {
        return Vec::new();
    }

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(header_line))
        .flexible(true)
        .from_reader(trimmed.as_bytes());

    let headers: Vec<String> = match rdr.headers() {
        Ok(headers) => headers.iter().map(|h| h.trim().to_string()).collect(),
        Err(e) => {
            warn!("unreadable table header: {}", e);
            return Vec::new();
        }
    };

    let mut rows: Vec<RawRow> = Vec::new();

    for record in rdr.records() {
        let record = match record {
            Ok(record) => record,
            Err(_) => continue,
        };

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        let mut row: RawRow = AHashMap::with_capacity(headers.len());
        for (idx, header) in headers.iter().enumerate() {
            row.insert(
                header.clone(),
                record.get(idx).unwrap_or("").trim().to_string(),
            );
        }
        rows.push(row);
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_sniffing() {
        assert_eq!(detect_delimiter("origin;destination;delta_days"), b';');
        assert_eq!(detect_delimiter("origin,destination,delta_days"), b',');
        // a comma-delimited header containing one stray semicolon
        assert_eq!(detect_delimiter("origin,destination;note,delta"), b',');
    }

    #[test]
    fn header_only_is_empty() {
        assert!(parse_rows("delta_days,proba_open").is_empty());
        assert!(parse_rows("").is_empty());
        assert!(parse_rows("   \n").is_empty());
    }

    #[test]
    fn rows_are_header_keyed_and_trimmed() {
        let rows = parse_rows("delta_days;proba_open\n 3 ; 0.5 \n10;0.9\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["delta_days"], "3");
        assert_eq!(rows[0]["proba_open"], "0.5");
        assert_eq!(rows[1]["delta_days"], "10");
    }

    #[test]
    fn short_records_fill_with_empty() {
        let rows = parse_rows("a,b,c\n1,2\n");
        assert_eq!(rows[0]["c"], "");
    }

    #[test]
    fn blank_lines_are_skipped() {
        let rows = parse_rows("a,b\n1,2\n\n3,4\n");
        assert_eq!(rows.len(), 2);
    }
}
