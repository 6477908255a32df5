//! CSV export of projected history.
//!
//! Columns are `Date,Type,User,<group term>,<location term>`. Only events
//! that place the item somewhere are rendered; the header is always written.

use std::io::Write;

use super::{HistoryDetail, HistoryRecord};
use crate::config::Terminology;
use crate::error::StoreError;

/// Date layout for the `Date` column, e.g. `Mon Jan  2 2006 15:04:05 UTC`.
pub const DATE_FORMAT: &str = "%a %b %e %Y %H:%M:%S UTC";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("csv write failed: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("csv flush failed: {0}")]
    Io(#[from] std::io::Error),
}

/// The CSV cells for `record`, or `None` for kinds that are not exported.
#[must_use]
pub fn csv_row(record: &HistoryRecord) -> Option<[String; 5]> {
    let (group, place) = match &record.data {
        HistoryDetail::Created {
            group,
            location_name,
            ..
        } => (group.clone(), location_name.clone().unwrap_or_default()),
        HistoryDetail::Tracked { location_name, .. } => {
            (String::new(), location_name.clone().unwrap_or_default())
        }
        HistoryDetail::TrackedToUser { user_name, .. } => {
            (String::new(), user_name.clone().unwrap_or_default())
        }
        HistoryDetail::Updated { .. } | HistoryDetail::Deleted | HistoryDetail::Restored => {
            return None;
        }
    };

    Some([
        record.date.format(DATE_FORMAT).to_string(),
        record.kind.label().to_string(),
        record.user_name.clone().unwrap_or_default(),
        group,
        place,
    ])
}

/// Write `records` as CSV to `writer`, returning the number of data rows.
///
/// Records are written in the order received. The first projection error
/// aborts the export.
///
/// # Errors
///
/// Returns [`ExportError`] if a record fails to project or the write fails.
pub fn write_history_csv<W, I>(
    writer: W,
    records: I,
    terms: &Terminology,
) -> Result<usize, ExportError>
where
    W: Write,
    I: IntoIterator<Item = Result<HistoryRecord, StoreError>>,
{
    let mut out = ::csv::Writer::from_writer(writer);
    out.write_record(["Date", "Type", "User", terms.group(), terms.location()])?;

    let mut rows = 0;
    for record in records {
        if let Some(row) = csv_row(&record?) {
            out.write_record(&row)?;
            rows += 1;
        }
    }
    out.flush()?;
    Ok(rows)
}
