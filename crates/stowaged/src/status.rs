//! Fixed-column text rendering of the instance table.

use chrono::{DateTime, Utc};
use stowage_core::InstanceRecord;
use stowage_state::InstanceDirectory;

const HEADERS: [&str; 7] = [
    "container_id",
    "container_name",
    "path_backed",
    "container_dt_last_alive",
    "dt_last_backed",
    "size_last_backed",
    "dt_deleted",
];

fn timestamp(t: Option<DateTime<Utc>>) -> String {
    t.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn cells(record: &InstanceRecord) -> [String; 7] {
    [
        record.container_id.clone(),
        record.container_name.clone(),
        record.path_backed.clone(),
        timestamp(record.container_dt_last_alive),
        timestamp(record.dt_last_backed),
        record
            .size_last_backed
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string()),
        timestamp(record.dt_deleted),
    ]
}

/// One header line and one line per row, columns padded to the widest
/// cell. Trailing whitespace is trimmed.
pub fn render(dir: &InstanceDirectory) -> String {
    let rows: Vec<[String; 7]> = dir.records().iter().map(cells).collect();
    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(widths)
            .map(|(c, w)| format!("{c:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    std::iter::once(line(&header))
        .chain(rows.iter().map(|r| line(r)))
        .collect::<Vec<_>>()
        .join("\n")
}
