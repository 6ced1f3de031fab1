//! Small tables reused by adapter and driver tests.

/// Column names of the `people` fixture.
pub const PEOPLE_COLUMNS: [&str; 4] = ["ID", "NAME", "SCORE", "JOINED"];

/// `people` rows as raw column text; `None` is SQL NULL.
pub fn people_rows() -> Vec<Vec<Option<String>>> {
    let raw: [[Option<&str>; 4]; 5] = [
        [Some("1"), Some("alice"), Some("91.50"), Some("2021-01-04")],
        [Some("2"), Some("bob"), None, Some("2022-06-30 08:15:00")],
        [Some("3"), None, Some("77.25"), None],
        [Some("4"), Some("dana"), Some("88.00"), Some("Mar 5, 2024 6:07:08 PM")],
        [Some("5"), Some("O'Neil"), Some("60.75"), Some("2023-11-11")],
    ];
    raw.iter()
        .map(|row| row.iter().map(|v| v.map(str::to_string)).collect())
        .collect()
}

/// The `people` fixture rendered as CSV with a header line. NULLs are empty
/// fields.
pub fn people_csv() -> String {
    let mut out = PEOPLE_COLUMNS.join(",");
    out.push('\n');
    for row in people_rows() {
        let fields: Vec<String> = row
            .into_iter()
            .map(|v| match v {
                Some(text) if text.contains(',') => format!("\"{text}\""),
                Some(text) => text,
                None => String::new(),
            })
            .collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}
