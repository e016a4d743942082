//! sketch database layout and construction.
//!
//! A database is a directory DIR containing one mash sketch file DIR/DIR.k.msh for each kmer length,
//! the kmer parameters in DIR/parameters.json, the list of sketched assemblies DIR/DIR.refs
//! and the cluster table DIR/DIR_clusters.csv.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use cpu_time::ProcessTime;
use rayon::prelude::*;

use super::mashexec::MashExec;
use super::DistTool;
use crate::dist::rawmatch::RawMatchSet;
use crate::errors::{Result, StrainError};
use crate::utils::parameters::{ComputingParams, KmerParams};

// last component of database directory, used as prefix of files in it
fn db_prefix(dbdir: &Path) -> Result<String> {
    dbdir
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .ok_or_else(|| StrainError::config(format!("bad database directory {:?}", dbdir)))
}

/// sketch file (without .msh extension) for kmer k
pub fn database_prefix(dbdir: &Path, k: usize) -> Result<PathBuf> {
    let prefix = db_prefix(dbdir)?;
    Ok(dbdir.join(format!("{}.{}", prefix, k)))
}

/// sketch file for kmer k : DIR/DIR.k.msh
pub fn database_name(dbdir: &Path, k: usize) -> Result<PathBuf> {
    let prefix = db_prefix(dbdir)?;
    Ok(dbdir.join(format!("{}.{}.msh", prefix, k)))
}

/// cluster table of database : DIR/DIR_clusters.csv
pub fn clusters_file_name(dbdir: &Path) -> Result<PathBuf> {
    let prefix = db_prefix(dbdir)?;
    Ok(dbdir.join(format!("{}_clusters.csv", prefix)))
}

/// copy of the assembly list the database was sketched from : DIR/DIR.refs
pub fn references_file_name(dbdir: &Path) -> Result<PathBuf> {
    let prefix = db_prefix(dbdir)?;
    Ok(dbdir.join(format!("{}.refs", prefix)))
}

pub fn create_database_dir(dbdir: &Path) -> Result<()> {
    if !dbdir.is_dir() {
        log::info!("creating database directory {:?}", dbdir);
        std::fs::create_dir_all(dbdir).map_err(|e| {
            log::error!("cannot create output directory {:?}", dbdir);
            StrainError::io(dbdir, e)
        })?;
    }
    Ok(())
}

/// sketches all assemblies of assembly_list at each kmer length, one task per kmer length.
/// Sketch files already present are kept. Parameters are dumped in the database directory.
pub fn construct_database(
    assembly_list: &Path,
    kmer_params: &KmerParams,
    dbdir: &Path,
    computing: &ComputingParams,
) -> Result<()> {
    let start_t = SystemTime::now();
    let cpu_start = ProcessTime::now();
    //
    create_database_dir(dbdir)?;
    let mash = MashExec::new(computing.get_mash_exec());
    let klist = kmer_params.get_klist();
    let nb_threads = computing.get_threads().min(klist.len()).max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(nb_threads)
        .build()
        .map_err(|e| StrainError::config(format!("cannot build thread pool : {}", e)))?;
    //
    pool.install(|| {
        klist
            .par_iter()
            .zip(kmer_params.get_sketch_sizes().par_iter())
            .map(|(k, sketch_size)| {
                let dbname = database_name(dbdir, *k)?;
                if dbname.is_file() {
                    log::info!("found existing mash database {:?} for k = {}", dbname, k);
                    return Ok(());
                }
                log::info!("creating mash database for k = {}", k);
                mash.sketch(*k, *sketch_size, assembly_list, &database_prefix(dbdir, *k)?)
            })
            .collect::<Result<Vec<()>>>()
    })?;
    kmer_params.dump_json(dbdir)?;
    let refs = references_file_name(dbdir)?;
    if assembly_list != refs.as_path() {
        std::fs::copy(assembly_list, &refs).map_err(|e| StrainError::io(&refs, e))?;
    }
    //
    let cpu_time = cpu_start.elapsed().as_secs();
    let elapsed_t = start_t.elapsed().map(|d| d.as_secs_f32()).unwrap_or(0.);
    log::info!(
        "construct_database : cpu time(s) {}, elapsed time(s) {}",
        cpu_time,
        elapsed_t
    );
    Ok(())
} // end of construct_database

/// sketch sizes of the database files, one for each kmer in klist.
/// All files must have been sketched with the same size, otherwise the database is inconsistent.
pub fn get_sketch_size(dbdir: &Path, klist: &[usize], mash: &MashExec) -> Result<Vec<usize>> {
    let mut sizes = Vec::<usize>::with_capacity(klist.len());
    for k in klist {
        let dbname = database_name(dbdir, *k)?;
        let sketch = mash.info_sketch_size(&dbname)?;
        if let Some(previous) = sizes.last() {
            if *previous != sketch {
                log::error!(
                    "problem with database, sketch size for kmer length {} is {} but smaller kmers have sketch size {}",
                    k,
                    sketch,
                    previous
                );
                return Err(StrainError::config(format!(
                    "sketch size for kmer length {} is {}, smaller kmers have sketch sizes of {}",
                    k, sketch, previous
                )));
            }
        }
        sizes.push(sketch);
    }
    Ok(sizes)
} // end of get_sketch_size

/// checks sketch sizes reported by mash against the parameters dumped at construction
pub fn check_database(dbdir: &Path, kmer_params: &KmerParams, mash: &MashExec) -> Result<()> {
    let sizes = get_sketch_size(dbdir, kmer_params.get_klist(), mash)?;
    if sizes != kmer_params.get_sketch_sizes() {
        return Err(StrainError::config(format!(
            "database sketch sizes {:?} do not match parameters {:?}",
            sizes,
            kmer_params.get_sketch_sizes()
        )));
    }
    Ok(())
}

//=====================================================================================

/// runs mash dist against the database, in self mode if no query list is given
pub struct MashQuery<'a> {
    mash: MashExec,
    dbdir: &'a Path,
    query_list: Option<&'a Path>,
}

impl<'a> MashQuery<'a> {
    pub fn new(mash: MashExec, dbdir: &'a Path, query_list: Option<&'a Path>) -> Self {
        MashQuery {
            mash,
            dbdir,
            query_list,
        }
    }
}

impl<'a> DistTool for MashQuery<'a> {
    fn raw_matches(&self, k: usize, nb_threads: usize) -> Result<RawMatchSet> {
        log::info!("querying mash database for k = {}", k);
        let dbname = database_name(self.dbdir, k)?;
        self.mash.dist(k, &dbname, self.query_list, nb_threads)
    }
} // end of impl DistTool for MashQuery

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_names() {
        let dbdir = Path::new("run/mydb");
        assert_eq!(database_name(dbdir, 13).unwrap(), PathBuf::from("run/mydb/mydb.13.msh"));
        assert_eq!(database_prefix(dbdir, 17).unwrap(), PathBuf::from("run/mydb/mydb.17"));
        assert_eq!(
            clusters_file_name(dbdir).unwrap(),
            PathBuf::from("run/mydb/mydb_clusters.csv")
        );
        assert_eq!(references_file_name(dbdir).unwrap(), PathBuf::from("run/mydb/mydb.refs"));
    }

    #[test]
    fn test_create_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dbdir = tmp.path().join("db");
        create_database_dir(&dbdir).unwrap();
        assert!(dbdir.is_dir());
        // second call is a no op
        create_database_dir(&dbdir).unwrap();
    }
}
