//! structures related to processing parameters

use std::fs::OpenOptions;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::to_writer;

use crate::errors::{Result, StrainError};

/// name of parameters dump in a database directory
pub const PARAMETERS_FILE: &str = "parameters.json";

/// Kmer lengths and sketch size for each.
/// The same values must be used for construction and requests so the structure is json serialized
/// in the database directory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KmerParams {
    /// ascending kmer lengths
    klist: Vec<usize>,
    /// sketch size used for each kmer length, same length as klist
    sketch_sizes: Vec<usize>,
} // end of KmerParams

impl KmerParams {
    /// checks kmer lengths are positive, odd, strictly ascending, at least 2 of them (a regression needs 2 points)
    pub fn new(klist: Vec<usize>, sketch_sizes: Vec<usize>) -> Result<Self> {
        if klist.len() < 2 {
            return Err(StrainError::config(format!(
                "need at least 2 kmer lengths for regression, got {:?}",
                klist
            )));
        }
        if sketch_sizes.len() != klist.len() {
            return Err(StrainError::config(format!(
                "got {} sketch sizes for {} kmer lengths",
                sketch_sizes.len(),
                klist.len()
            )));
        }
        if let Some(k) = klist.iter().find(|k| **k == 0 || **k % 2 == 0) {
            return Err(StrainError::config(format!(
                "kmer lengths must be positive and odd, got {}",
                k
            )));
        }
        if klist.windows(2).any(|w| w[0] >= w[1]) {
            return Err(StrainError::config(format!(
                "kmer lengths must be strictly ascending, got {:?}",
                klist
            )));
        }
        if sketch_sizes.iter().any(|s| *s == 0) {
            return Err(StrainError::config("null sketch size"));
        }
        // requests check all database files were sketched with the same size
        if sketch_sizes.windows(2).any(|w| w[0] != w[1]) {
            return Err(StrainError::config(format!(
                "all kmer lengths must use the same sketch size, got {:?}",
                sketch_sizes
            )));
        }
        Ok(KmerParams {
            klist,
            sketch_sizes,
        })
    } // end of new

    /// kmer lengths from min_k to max_k (included) by step, with the same sketch size for all
    pub fn from_range(min_k: usize, max_k: usize, step: usize, sketch_size: usize) -> Result<Self> {
        if step == 0 || min_k > max_k {
            return Err(StrainError::config(format!(
                "bad kmer range min {} max {} step {}",
                min_k, max_k, step
            )));
        }
        let klist: Vec<usize> = (min_k..=max_k).step_by(step).collect();
        let sketch_sizes = vec![sketch_size; klist.len()];
        KmerParams::new(klist, sketch_sizes)
    }

    pub fn get_klist(&self) -> &[usize] {
        &self.klist
    }

    pub fn get_sketch_sizes(&self) -> &[usize] {
        &self.sketch_sizes
    }

    /// sketch size used for k, None if k is not in list
    pub fn get_sketch_size(&self, k: usize) -> Option<usize> {
        self.klist
            .iter()
            .position(|x| *x == k)
            .map(|i| self.sketch_sizes[i])
    }

    pub fn dump_json(&self, dirpath: &Path) -> Result<()> {
        //
        let filepath = dirpath.join(PARAMETERS_FILE);
        //
        log::info!("dumping KmerParams in json file : {:?}", filepath);
        //
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&filepath)
            .map_err(|e| {
                log::error!("KmerParams dump : could not open file {:?}", filepath.as_os_str());
                StrainError::io(&filepath, e)
            })?;
        //
        let mut writer = BufWriter::new(file);
        to_writer(&mut writer, &self)?;
        Ok(())
    } // end of dump_json

    /// reload from a json dump. Used in query mode to ensure coherence with database constitution
    pub fn reload_json(dirpath: &Path) -> Result<Self> {
        log::info!("in KmerParams::reload_json");
        //
        let filepath = dirpath.join(PARAMETERS_FILE);
        let file = OpenOptions::new().read(true).open(&filepath).map_err(|e| {
            log::error!(
                "KmerParams reload_json : could not open file {:?}",
                filepath.as_os_str()
            );
            StrainError::io(&filepath, e)
        })?;
        let reader = BufReader::new(file);
        let params: KmerParams = serde_json::from_reader(reader)?;
        // a hand edited dump must satisfy the same checks
        let params = KmerParams::new(params.klist, params.sketch_sizes)?;
        log::info!("KmerParams reloaded, klist : {:?}", params.klist);
        //
        Ok(params)
    } // end of reload_json
} // end of impl KmerParams

//=====================================================================================

/// Some others parameters not necessary for reload
#[derive(Clone, Debug)]
pub struct ComputingParams {
    /// total number of threads asked for
    threads: usize,
    /// mash executable
    mash_exec: String,
}

impl Default for ComputingParams {
    fn default() -> Self {
        ComputingParams {
            threads: 1,
            mash_exec: String::from("mash"),
        }
    }
}

impl ComputingParams {
    pub fn new(threads: usize, mash_exec: String) -> Result<Self> {
        if threads == 0 {
            return Err(StrainError::config("number of threads must be positive"));
        }
        Ok(ComputingParams { threads, mash_exec })
    }

    pub fn get_threads(&self) -> usize {
        self.threads
    }

    pub fn get_mash_exec(&self) -> &str {
        &self.mash_exec
    }

    /// threads each kmer length task gives to the external program.
    /// Kmer lengths share the total, at least one each.
    pub fn threads_per_kmer(&self, nb_kmer: usize) -> usize {
        (self.threads / nb_kmer.max(1)).max(1)
    }
} // end of ComputingParams
