//! assignment of queries to strain clusters of a database
//!
//! - [graph] holds queries linked by distance and computes its components
//! - [assign] makes one decision per query

pub mod assign;
pub mod graph;

pub use assign::{
    assign_queries_to_clusters, read_links_file, Assignment, AssignmentState, ClusterDecision,
    ExistingClusters, QueryLinks,
};
pub use graph::{QueryComponents, QueryGraph};
