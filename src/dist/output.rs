//! write query output to file

use std::io::Write;
use std::path::Path;

use super::driver::DistMatrix;
use crate::errors::{Result, StrainError};

/// writes the tab separated table Query, Reference, Core, Accessory. Non estimable distances are NA.
pub fn write_distances<W: Write>(matrix: &DistMatrix, out: W) -> Result<usize> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(out);
    writer.write_record(["Query", "Reference", "Core", "Accessory"])?;
    for i in 0..matrix.nb_rows() {
        let (query, reference, core, accessory) = matrix.get_row(i);
        let core = core.map_or_else(|| "NA".to_string(), |v| v.to_string());
        let accessory = accessory.map_or_else(|| "NA".to_string(), |v| v.to_string());
        writer.write_record([query, reference, core.as_str(), accessory.as_str()])?;
    }
    writer.flush().map_err(|e| StrainError::io("distance table", e))?;
    Ok(matrix.nb_rows())
} // end of write_distances

/// dumps distance table in file path, returns number of rows
pub fn print_query_output(matrix: &DistMatrix, path: &Path) -> Result<usize> {
    log::info!("writing {} distances in {:?}", matrix.nb_rows(), path);
    let file = std::fs::File::create(path).map_err(|e| StrainError::io(path, e))?;
    write_distances(matrix, std::io::BufWriter::new(file))
}
