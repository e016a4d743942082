//! a small module dedicated to dump and reload of distance matrices, so that
//! cluster assignment or output can be redone without running mash again.

use std::fs::OpenOptions;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::dist::driver::DistMatrix;
use crate::errors::{Result, StrainError};

// json has no NaN, non estimable distances are stored as null
#[derive(Serialize, Deserialize)]
struct DistDump {
    rlist: Vec<usize>,
    qlist: Vec<usize>,
    dists: Vec<[Option<f64>; 2]>,
    qnames: Vec<String>,
    rnames: Vec<String>,
}

fn to_option(v: f64) -> Option<f64> {
    if v.is_nan() {
        None
    } else {
        Some(v)
    }
}

impl From<&DistMatrix> for DistDump {
    fn from(matrix: &DistMatrix) -> Self {
        let dists = matrix
            .dists
            .rows()
            .into_iter()
            .map(|row| [to_option(row[0]), to_option(row[1])])
            .collect();
        DistDump {
            rlist: matrix.rlist.clone(),
            qlist: matrix.qlist.clone(),
            dists,
            qnames: matrix.qnames.clone(),
            rnames: matrix.rnames.clone(),
        }
    }
} // end of From<&DistMatrix>

impl DistDump {
    fn into_matrix(self) -> Result<DistMatrix> {
        let nb_rows = self.dists.len();
        if self.qlist.len() != nb_rows || self.rlist.len() != nb_rows {
            return Err(StrainError::config(format!(
                "corrupted distance dump, {} rows, {} queries, {} references",
                nb_rows,
                self.qlist.len(),
                self.rlist.len()
            )));
        }
        if self.qlist.iter().any(|q| *q >= self.qnames.len())
            || self.rlist.iter().any(|r| *r >= self.rnames.len())
        {
            return Err(StrainError::config("corrupted distance dump, index out of name tables"));
        }
        let flat: Vec<f64> = self
            .dists
            .iter()
            .flat_map(|row| row.iter().map(|v| v.unwrap_or(f64::NAN)))
            .collect();
        let dists = Array2::from_shape_vec((nb_rows, 2), flat)
            .map_err(|e| StrainError::config(format!("corrupted distance dump : {}", e)))?;
        Ok(DistMatrix {
            rlist: self.rlist,
            qlist: self.qlist,
            dists,
            qnames: self.qnames,
            rnames: self.rnames,
        })
    }
} // end of impl DistDump

/// dumps (rlist, qlist, dists, query names, reference names) in a json file
pub fn dump_distances(matrix: &DistMatrix, filepath: &Path) -> Result<()> {
    log::info!("dumping distance matrix in json file : {:?}", filepath);
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(filepath)
        .map_err(|e| {
            log::error!("dump_distances : could not open file {:?}", filepath.as_os_str());
            StrainError::io(filepath, e)
        })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &DistDump::from(matrix))?;
    Ok(())
} // end of dump_distances

/// reload a matrix dumped by [dump_distances]
pub fn reload_distances(filepath: &Path) -> Result<DistMatrix> {
    log::info!("reloading distance matrix from {:?}", filepath);
    let file = OpenOptions::new()
        .read(true)
        .open(filepath)
        .map_err(|e| StrainError::io(filepath, e))?;
    let dump: DistDump = serde_json::from_reader(BufReader::new(file))?;
    let matrix = dump.into_matrix()?;
    log::info!("reloaded {} distances", matrix.nb_rows());
    Ok(matrix)
} // end of reload_distances
