use crate::error::{LaunchpadError, Result};
use crate::records::{ManifestNode, Record, Row};
use crate::store::RecordStore;
use log::info;
use std::fs;
use std::path::Path;

/// Parse CSV text into worksheet rows
///
/// The first non-blank record is the header. Quoted fields may span lines.
/// Short rows leave their trailing columns empty and extra fields beyond the
/// header are dropped.
///
/// # Examples
/// ```
/// use launchpad::loader::sheet_from_csv;
///
/// let rows = sheet_from_csv("Mission_ID,Node_ID\nFOUNDATION,1\n").unwrap();
/// assert_eq!(rows[0]["Node_ID"], "1");
/// ```
pub fn sheet_from_csv(content: &str) -> Result<Vec<Row>> {
    let mut records = parse_csv_records(content)
        .into_iter()
        .filter(|fields| fields.iter().any(|f| !f.trim().is_empty()));

    let header: Vec<String> = records
        .next()
        .ok_or_else(|| LaunchpadError::validation("csv", "CSV file is empty"))?
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for fields in records {
        let row: Row = header
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(i, name)| (name.clone(), fields.get(i).cloned().unwrap_or_default()))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

/// Read a CSV file into worksheet rows
pub fn from_csv(filepath: impl AsRef<Path>) -> Result<Vec<Row>> {
    let path = filepath.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        LaunchpadError::validation("csv file", format!("{}: {}", path.display(), e))
    })?;
    sheet_from_csv(&content)
}

/// Replace the Mission_Manifest worksheet with the contents of a CSV file
///
/// Every row is validated before anything is written; returns the number of
/// nodes imported.
pub fn import_manifest(store: &RecordStore, filepath: impl AsRef<Path>) -> Result<usize> {
    let rows = from_csv(filepath)?;
    let nodes = rows
        .iter()
        .enumerate()
        .map(|(i, row)| ManifestNode::from_row(row, i))
        .collect::<Result<Vec<_>>>()?;

    store.write_records(&nodes)?;
    info!("imported {} manifest nodes", nodes.len());
    Ok(nodes.len())
}

// Split CSV text into records of fields. Newlines inside quotes belong to
// the field; CRLF line endings are accepted.
fn parse_csv_records(content: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut current_record = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    // Doubled quote inside a quoted field
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                current_record.push(std::mem::take(&mut current_field));
            }
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => {
                current_record.push(std::mem::take(&mut current_field));
                records.push(std::mem::take(&mut current_record));
            }
            _ => {
                current_field.push(c);
            }
        }
    }

    if !current_field.is_empty() || !current_record.is_empty() {
        current_record.push(current_field);
        records.push(current_record);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_fields_keep_commas_and_quotes() {
        assert_eq!(
            parse_csv_records(r#"1,"Pandas, intro","say ""hi""""#),
            vec![vec!["1", "Pandas, intro", r#"say "hi""#]]
        );
        assert_eq!(parse_csv_records("a,,b\n"), vec![vec!["a", "", "b"]]);
    }

    #[test]
    fn quoted_newlines_stay_in_the_field() {
        let rows = sheet_from_csv("A,B\r\n\"line one\r\nline two\",x\r\n").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["A"], "line one\r\nline two");
        assert_eq!(rows[0]["B"], "x");
    }

    #[test]
    fn exported_csv_imports_unchanged() {
        use crate::downloader::to_csv;
        use crate::records::TableName;

        let mut row = Row::new();
        row.insert("Email".into(), "a@x.com".into());
        row.insert("Mission_ID".into(), "FOUNDATION".into());
        row.insert("Current_Node".into(), "2".into());
        row.insert("Status".into(), "Active".into());
        row.insert("Last_Update".into(), "2024-05-01 10:00:00".into());
        row.insert("Notes".into(), "first line\nsecond, \"quoted\"\rthird".into());

        let csv = to_csv(TableName::UserMissions, std::slice::from_ref(&row));
        assert_eq!(sheet_from_csv(&csv).unwrap(), vec![row]);
    }

    #[test]
    fn short_rows_are_padded() {
        let rows = sheet_from_csv("A,B,C\r\n1,2\r\n\r\n").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["A"], "1");
        assert_eq!(rows[0]["C"], "");
    }

    #[test]
    fn empty_csv_is_rejected() {
        assert!(sheet_from_csv("\n  \n").is_err());
    }
}
