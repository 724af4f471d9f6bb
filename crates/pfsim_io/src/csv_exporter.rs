use csv::Writer;
use std::path::Path;

use crate::{HostSnapshotRow, IoResult};

pub fn write_csv(path: impl AsRef<Path>, rows: &[HostSnapshotRow]) -> IoResult<()> {
    let mut wtr = Writer::from_path(path)?;

    wtr.write_record(&HostSnapshotRow::csv_headers())?;
    for row in rows {
        wtr.write_record(&row.to_csv_record())?;
    }

    wtr.flush()?;
    Ok(())
}
