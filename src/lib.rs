//! strainstruct estimates core and accessory genome distances between assemblies from
//! mash sketches computed at several kmer lengths, and assigns query assemblies to the
//! strain clusters of an existing database.
//!
//! - [dist] : batching of comparisons, aggregation of raw jaccard fractions, regression and parallel driver
//! - [cluster] : query graph components and incremental cluster assignment
//! - [mash] : the interface to the external sketching program and database construction
//! - [utils] : assembly lists, parameters, dump and reload of distance matrices

pub mod cluster;
pub mod dist;
pub mod errors;
pub mod mash;
pub mod utils;

pub use errors::{Result, StrainError};
