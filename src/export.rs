use std::io;

use crate::core::Contribution;

/// Writes the history as CSV, one `amount,time` row per contribution.
pub fn write_csv<W: io::Write>(history: &[Contribution], writer: W) -> csv::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(["Amount", "Date"])?;
    for contribution in history {
        writer.write_record([contribution.amount.to_string(), contribution.time_string()])?;
    }
    writer.flush()?;
    Ok(())
}
