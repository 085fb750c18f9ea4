use crate::records::{Row, TableName};

/// Column order for export: the worksheet's canonical columns first, then
/// any extra columns found in the rows, alphabetically.
pub fn column_order(table: TableName, rows: &[Row]) -> Vec<String> {
    let mut columns: Vec<String> = table.columns().iter().map(|c| c.to_string()).collect();
    let mut extras: Vec<&String> = rows
        .iter()
        .flat_map(|row| row.keys())
        .filter(|k| !table.columns().contains(&k.as_str()))
        .collect();
    extras.sort();
    extras.dedup();
    columns.extend(extras.into_iter().cloned());
    columns
}

/// Convert a worksheet to CSV text
///
/// Fields containing commas, quotes or newlines are quoted and inner quotes
/// doubled.
///
/// # Examples
/// ```
/// use launchpad::downloader::to_csv;
/// use launchpad::records::{Row, TableName};
///
/// let mut row = Row::new();
/// row.insert("Email".to_string(), "a@x.com".to_string());
/// let csv = to_csv(TableName::UserMissions, &[row]);
/// assert!(csv.starts_with("Email,Mission_ID,Current_Node,Status,Last_Update\n"));
/// ```
pub fn to_csv(table: TableName, rows: &[Row]) -> String {
    let columns = column_order(table, rows);
    let mut csv_content = columns.join(",");
    csv_content.push('\n');

    for row in rows {
        let line: Vec<String> = columns
            .iter()
            .map(|c| escape_field(row.get(c).map(|s| s.as_str()).unwrap_or("")))
            .collect();
        csv_content.push_str(&line.join(","));
        csv_content.push('\n');
    }

    csv_content
}

fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Convert whole worksheets to an XLSX workbook, one tab per worksheet
///
/// Checkbox columns are written as real spreadsheet booleans so the file
/// opens with ticked cells rather than text.
#[cfg(feature = "xlsx")]
pub fn to_xlsx(sheets: &[(TableName, Vec<Row>)]) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    use crate::records::coerce_bool;
    use rust_xlsxwriter::{Workbook, Worksheet};

    const BOOL_COLUMNS: [&str; 6] = [
        "Blog_Read",
        "Code_Done",
        "Quiz_Done",
        "Complete",
        "Has_Code",
        "Has_Quiz",
    ];

    let mut workbook = Workbook::new();

    for (table, rows) in sheets {
        let mut worksheet = Worksheet::new();
        worksheet.set_name(table.as_str())?;

        let columns = column_order(*table, rows);
        for (c, name) in columns.iter().enumerate() {
            worksheet.write_string(0, c as u16, name.as_str())?;
        }

        for (r, row) in rows.iter().enumerate() {
            let sheet_row = (r + 1) as u32;
            for (c, name) in columns.iter().enumerate() {
                let value = row.get(name).map(|s| s.as_str()).unwrap_or("");
                if BOOL_COLUMNS.contains(&name.as_str()) {
                    worksheet.write_boolean(sheet_row, c as u16, coerce_bool(value))?;
                } else {
                    worksheet.write_string(sheet_row, c as u16, value)?;
                }
            }
        }

        workbook.push_worksheet(worksheet);
    }

    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}
