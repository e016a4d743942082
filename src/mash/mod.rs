//! interface to the external sketching and distance program (mash).
//!
//! The comparison driver only needs, for each kmer length, the set of raw jaccard fractions,
//! this is the [DistTool] trait. [MashQuery] implements it by running `mash dist` on the
//! sketch databases built by [database::construct_database].

pub mod database;
pub mod mashexec;

pub use database::*;
pub use mashexec::*;

use crate::dist::rawmatch::RawMatchSet;
use crate::errors::Result;

/// Something able to give the raw jaccard fractions at kmer length k, using nb_threads threads.
/// It is called concurrently for different kmer lengths.
pub trait DistTool: Sync {
    fn raw_matches(&self, k: usize, nb_threads: usize) -> Result<RawMatchSet>;
}
