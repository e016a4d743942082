//! core and accessory distances between assemblies.
//!
//! - [batch] splits the assembly list into batches for workers
//! - [rawmatch] gathers raw jaccard fractions of all kmer lengths
//! - [regression] fits the distances of one pair
//! - [driver] runs all of it in parallel
//! - [output] writes the distance table

pub mod batch;
pub mod driver;
pub mod output;
pub mod rawmatch;
pub mod regression;

pub use driver::{query_database, DistMatrix};
pub use regression::PairDist;
