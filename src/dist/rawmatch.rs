//! Aggregation of raw jaccard fractions.
//!
//! The external distance program is run once for each kmer length and returns, for each
//! (query, reference) couple of names, the fraction of shared hashes. This module gathers these
//! results in one table per kmer length, addressed by global indices of assemblies.

use fxhash::{FxHashMap, FxHashSet};

use crate::errors::{Result, StrainError};
use crate::utils::files::AssemblyList;

/// jaccard fraction between a query and a reference at some kmer length
#[derive(Clone, Debug, PartialEq)]
pub struct RawMatch {
    pub query: String,
    pub reference: String,
    /// shared / total hashes
    pub fraction: f64,
}

impl RawMatch {
    pub fn new(query: String, reference: String, fraction: f64) -> Self {
        RawMatch {
            query,
            reference,
            fraction,
        }
    }
} // end of RawMatch

/// All raw matches produced by one run of the distance program at one kmer length.
#[derive(Clone, Debug)]
pub struct RawMatchSet {
    kmer: usize,
    matches: Vec<RawMatch>,
}

impl RawMatchSet {
    pub fn new(kmer: usize, matches: Vec<RawMatch>) -> Self {
        RawMatchSet { kmer, matches }
    }

    pub fn get_kmer(&self) -> usize {
        self.kmer
    }

    pub fn get_matches(&self) -> &[RawMatch] {
        &self.matches
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// reference names in order of first appearance.
    /// In query mode this defines the reference list when the database list is not at hand.
    pub fn reference_names(&self) -> Vec<String> {
        let mut seen = FxHashSet::<&str>::default();
        let mut names = Vec::<String>::new();
        for m in &self.matches {
            if seen.insert(m.reference.as_str()) {
                names.push(m.reference.clone());
            }
        }
        names
    }
} // end of impl RawMatchSet

//====================================================================

/// raw[k_index][(query, reference)] -> jaccard fraction, with global indices.
///
/// In self mode a couple is stored once with the larger index first so that
/// the symmetric line of the distance program output never overwrites it.
#[derive(Clone, Debug)]
pub struct RawMatches {
    klist: Vec<usize>,
    tables: Vec<FxHashMap<(usize, usize), f64>>,
    self_mode: bool,
} // end of RawMatches

impl RawMatches {
    /// sets must be given in the order of klist.
    /// In self mode queries and references must be the same list.
    pub fn aggregate(
        sets: &[RawMatchSet],
        klist: &[usize],
        queries: &AssemblyList,
        references: &AssemblyList,
        self_mode: bool,
    ) -> Result<Self> {
        if sets.len() != klist.len() {
            return Err(StrainError::config(format!(
                "got {} raw match sets for {} kmer lengths",
                sets.len(),
                klist.len()
            )));
        }
        let mut tables = Vec::<FxHashMap<(usize, usize), f64>>::with_capacity(klist.len());
        let mut first_refs: Option<FxHashSet<usize>> = None;
        //
        for (set, k) in sets.iter().zip(klist.iter()) {
            if set.get_kmer() != *k {
                return Err(StrainError::config(format!(
                    "raw match set for kmer {} found where kmer {} expected",
                    set.get_kmer(),
                    k
                )));
            }
            let mut table = FxHashMap::<(usize, usize), f64>::default();
            table.reserve(set.len());
            let mut refs = FxHashSet::<usize>::default();
            for m in set.get_matches() {
                let r = references.get_index(&m.reference).ok_or_else(|| {
                    StrainError::config(format!(
                        "kmer {} : reference {} not in reference list",
                        k, m.reference
                    ))
                })?;
                refs.insert(r);
                let q = queries.get_index(&m.query).ok_or_else(|| {
                    StrainError::config(format!(
                        "kmer {} : query {} not in query list",
                        k, m.query
                    ))
                })?;
                if self_mode {
                    if q == r {
                        continue;
                    }
                    table.entry((q.max(r), q.min(r))).or_insert(m.fraction);
                } else {
                    if m.query == m.reference {
                        continue;
                    }
                    table.entry((q, r)).or_insert(m.fraction);
                }
            }
            // all kmer lengths must see the same references
            match &first_refs {
                None => first_refs = Some(refs),
                Some(first) => {
                    if *first != refs {
                        log::error!(
                            "kmer {} sees {} references, kmer {} saw {}",
                            k,
                            refs.len(),
                            klist[0],
                            first.len()
                        );
                        return Err(StrainError::config(format!(
                            "inconsistent reference set for kmer {} compared to kmer {}",
                            k, klist[0]
                        )));
                    }
                }
            }
            log::debug!("kmer {} nb raw matches retained : {}", k, table.len());
            tables.push(table);
        }
        //
        Ok(RawMatches {
            klist: klist.to_vec(),
            tables,
            self_mode,
        })
    } // end of aggregate

    pub fn get_klist(&self) -> &[usize] {
        &self.klist
    }

    pub fn is_self_mode(&self) -> bool {
        self.self_mode
    }

    /// fraction for (query, reference) at kmer of rank k_index. None if the couple was not reported.
    pub fn get(&self, k_index: usize, query: usize, reference: usize) -> Option<f64> {
        let key = if self.self_mode {
            (query.max(reference), query.min(reference))
        } else {
            (query, reference)
        };
        self.tables[k_index].get(&key).copied()
    }

    /// fractions along klist for a couple, a couple not reported counts as no shared kmer.
    pub fn fractions(&self, query: usize, reference: usize) -> Vec<f64> {
        (0..self.klist.len())
            .map(|i| self.get(i, query, reference).unwrap_or(0.))
            .collect()
    }
} // end of impl RawMatches
