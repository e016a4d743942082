//! Parallel computation of core and accessory distances.
//!
//! Two parallel stages separated by a barrier :
//! - one task per kmer length asks the [DistTool] for the raw jaccard fractions,
//! - once all kmer lengths are done, one task per batch of queries runs the regression for its pairs.
//!
//! Each batch fills its own matrix, batch results are concatenated in batch order, never in completion order.

use std::time::SystemTime;

use cpu_time::ProcessTime;
use ndarray::{s, Array2};
use rayon::prelude::*;

use super::rawmatch::{RawMatchSet, RawMatches};
use super::regression::{fit_distances, Jacobian};
use crate::errors::{Result, StrainError};
use crate::mash::DistTool;
use crate::utils::files::AssemblyList;
use crate::utils::parameters::ComputingParams;

/// Distances of all computed pairs.
/// Row i of dists holds (core, accessory) for query qlist[i] and reference rlist[i],
/// NaN in both columns if the pair distance could not be estimated.
#[derive(Clone, Debug)]
pub struct DistMatrix {
    /// reference index of each row
    pub rlist: Vec<usize>,
    /// query index of each row
    pub qlist: Vec<usize>,
    /// nb rows x 2
    pub dists: Array2<f64>,
    /// query names by index
    pub qnames: Vec<String>,
    /// reference names by index
    pub rnames: Vec<String>,
} // end of DistMatrix

impl DistMatrix {
    pub fn nb_rows(&self) -> usize {
        self.qlist.len()
    }

    /// (query name, reference name, core, accessory) of row i. core and accessory are None if not estimable
    pub fn get_row(&self, i: usize) -> (&str, &str, Option<f64>, Option<f64>) {
        let core = self.dists[[i, 0]];
        let accessory = self.dists[[i, 1]];
        let core = if core.is_nan() { None } else { Some(core) };
        let accessory = if accessory.is_nan() { None } else { Some(accessory) };
        (
            &self.qnames[self.qlist[i]],
            &self.rnames[self.rlist[i]],
            core,
            accessory,
        )
    }

    /// number of pairs with no estimable distance
    pub fn nb_not_estimable(&self) -> usize {
        (0..self.nb_rows())
            .filter(|i| self.dists[[*i, 0]].is_nan())
            .count()
    }
} // end of impl DistMatrix

/// the result of one batch
struct BatchDists {
    dists: Array2<f64>,
    qlist: Vec<usize>,
    rlist: Vec<usize>,
}

// rayon pool with nb_threads threads
fn build_pool(nb_threads: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(nb_threads.max(1))
        .build()
        .map_err(|e| StrainError::config(format!("cannot build thread pool : {}", e)))
}

/// runs the tool for each kmer length, at most one pool thread per kmer length, each run given
/// its share of threads. Any failure aborts the whole stage. Result is in klist order.
pub fn collect_raw_matches<T: DistTool>(
    tool: &T,
    klist: &[usize],
    computing: &ComputingParams,
) -> Result<Vec<RawMatchSet>> {
    let threads_per_k = computing.threads_per_kmer(klist.len());
    let pool = build_pool(computing.get_threads().min(klist.len()))?;
    log::info!(
        "collecting raw matches for {} kmer lengths, {} threads each",
        klist.len(),
        threads_per_k
    );
    pool.install(|| {
        klist
            .par_iter()
            .map(|k| tool.raw_matches(*k, threads_per_k))
            .collect::<Result<Vec<RawMatchSet>>>()
    })
} // end of collect_raw_matches

/// runs the regression for all pairs having their query in batch.
/// In self mode only pairs with reference index < query index are computed.
fn run_comparison(
    batch: &[usize],
    raw: &RawMatches,
    nb_refs: usize,
    jacobian: &Jacobian,
) -> BatchDists {
    let self_mode = raw.is_self_mode();
    let nb_dists: usize = if self_mode {
        batch.iter().sum()
    } else {
        batch.len() * nb_refs
    };
    let mut dists = Array2::<f64>::zeros((nb_dists, 2));
    let mut qlist = Vec::<usize>::with_capacity(nb_dists);
    let mut rlist = Vec::<usize>::with_capacity(nb_dists);
    //
    let mut row = 0;
    for query in batch {
        let nb_ref_query = if self_mode { *query } else { nb_refs };
        for reference in 0..nb_ref_query {
            let fractions = raw.fractions(*query, reference);
            match fit_distances(jacobian, &fractions) {
                Some(dist) => {
                    dists[[row, 0]] = dist.core;
                    dists[[row, 1]] = dist.accessory;
                }
                None => {
                    log::debug!("no distance estimable for query {} reference {}", query, reference);
                    dists[[row, 0]] = f64::NAN;
                    dists[[row, 1]] = f64::NAN;
                }
            }
            qlist.push(*query);
            rlist.push(reference);
            row += 1;
        }
    }
    assert_eq!(row, nb_dists);
    BatchDists { dists, qlist, rlist }
} // end of run_comparison

/// computes distances for all pairs from aggregated raw matches, one task per batch of queries.
pub fn compare_batches(
    raw: &RawMatches,
    queries: &AssemblyList,
    references: &AssemblyList,
    computing: &ComputingParams,
) -> Result<DistMatrix> {
    // Hessian = 0, so Jacobian for regression is a constant
    let jacobian = Jacobian::new(raw.get_klist())?;
    let batches = queries.get_batches();
    let pool = build_pool(computing.get_threads().min(batches.len()))?;
    let nb_refs = references.len();
    //
    let results: Vec<BatchDists> = pool.install(|| {
        batches
            .par_iter()
            .map(|batch| run_comparison(batch, raw, nb_refs, &jacobian))
            .collect()
    });
    // merge outputs in batch order
    let nb_rows: usize = results.iter().map(|b| b.qlist.len()).sum();
    let mut dists = Array2::<f64>::zeros((nb_rows, 2));
    let mut qlist = Vec::<usize>::with_capacity(nb_rows);
    let mut rlist = Vec::<usize>::with_capacity(nb_rows);
    let mut start = 0;
    for batch_res in results {
        let end = start + batch_res.qlist.len();
        dists.slice_mut(s![start..end, ..]).assign(&batch_res.dists);
        qlist.extend(batch_res.qlist);
        rlist.extend(batch_res.rlist);
        start = end;
    }
    //
    Ok(DistMatrix {
        rlist,
        qlist,
        dists,
        qnames: queries.get_names().to_vec(),
        rnames: references.get_names().to_vec(),
    })
} // end of compare_batches

/// Full distance computation.
/// In self mode queries are compared to each other, otherwise to the references
/// reported by the tool (or to the given reference list).
pub fn query_database<T: DistTool>(
    tool: &T,
    queries: &AssemblyList,
    references: Option<&AssemblyList>,
    klist: &[usize],
    self_mode: bool,
    computing: &ComputingParams,
) -> Result<DistMatrix> {
    let start_t = SystemTime::now();
    let cpu_start = ProcessTime::now();
    // fails early, before running anything, on an under determined kmer list
    Jacobian::new(klist)?;
    //
    let raw_sets = collect_raw_matches(tool, klist, computing)?;
    // barrier : all kmer lengths are done
    let derived_refs;
    let references = if self_mode {
        queries
    } else {
        match references {
            Some(refs) => refs,
            None => {
                let names = raw_sets
                    .first()
                    .map(|set| set.reference_names())
                    .unwrap_or_default();
                derived_refs = AssemblyList::from_names(names, 1)?;
                &derived_refs
            }
        }
    };
    let raw = RawMatches::aggregate(&raw_sets, klist, queries, references, self_mode)?;
    drop(raw_sets);
    log::info!(
        "raw matches aggregated, nb queries {}, nb references {}",
        queries.len(),
        references.len()
    );
    //
    let matrix = compare_batches(&raw, queries, references, computing)?;
    //
    let cpu_time = cpu_start.elapsed().as_secs();
    let elapsed_t = start_t.elapsed().map(|d| d.as_secs_f32()).unwrap_or(0.);
    log::info!(
        "query_database : {} distances, {} not estimable, cpu time(s) {}, elapsed time(s) {}",
        matrix.nb_rows(),
        matrix.nb_not_estimable(),
        cpu_time,
        elapsed_t
    );
    Ok(matrix)
} // end of query_database
