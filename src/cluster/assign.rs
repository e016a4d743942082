//! Incremental assignment of queries to strain clusters.
//!
//! Each query is assigned, in input order, to the existing cluster its reference links hit,
//! to the clusters hit by queries of its component, or to a new cluster.
//! When several existing clusters are hit they are all reported, merging is left to the caller.

use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;

use super::graph::{QueryComponents, QueryGraph};
use crate::errors::{Result, StrainError};

/// cluster membership of the assemblies already in the database
#[derive(Clone, Debug, Default)]
pub struct ExistingClusters {
    membership: HashMap<String, u64>,
    max_cluster: u64,
}

// merged clusters are written with a decimal part, we keep the integer part
fn parse_cluster_id(field: &str) -> Option<u64> {
    field.trim().split('.').next()?.parse::<u64>().ok()
}

impl ExistingClusters {
    pub fn new() -> Self {
        ExistingClusters::default()
    }

    pub fn insert(&mut self, name: &str, cluster: u64) {
        self.membership.insert(name.to_string(), cluster);
        self.max_cluster = self.max_cluster.max(cluster);
    }

    /// reads a csv table with header Taxon,Cluster
    pub fn from_reader<R: Read>(reader: R, origin: &str) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();
        if headers.get(0).map(|h| h.trim()) != Some("Taxon") {
            return Err(StrainError::Parse {
                origin: origin.to_string(),
                line: 1,
                msg: format!("expected header Taxon,Cluster got {:?}", headers),
            });
        }
        let mut clusters = ExistingClusters::new();
        for (i, record) in rdr.records().enumerate() {
            let record = record?;
            let line = i + 2;
            let (name, cluster) = match (record.get(0), record.get(1)) {
                (Some(name), Some(cluster)) => (name.trim(), cluster),
                _ => {
                    return Err(StrainError::Parse {
                        origin: origin.to_string(),
                        line,
                        msg: "expecting 2 fields".to_string(),
                    })
                }
            };
            let id = parse_cluster_id(cluster).ok_or_else(|| StrainError::Parse {
                origin: origin.to_string(),
                line,
                msg: format!("bad cluster id {}", cluster),
            })?;
            clusters.insert(name, id);
        }
        log::info!(
            "read {} assemblies in existing clusters, max cluster id : {}",
            clusters.len(),
            clusters.max_cluster
        );
        Ok(clusters)
    } // end of from_reader

    pub fn from_csv(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| StrainError::io(path, e))?;
        ExistingClusters::from_reader(std::io::BufReader::new(file), &path.to_string_lossy())
    }

    pub fn get_cluster(&self, name: &str) -> Option<u64> {
        self.membership.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.membership.contains_key(name)
    }

    /// 0 if there is no cluster yet
    pub fn get_max_cluster(&self) -> u64 {
        self.max_cluster
    }

    pub fn len(&self) -> usize {
        self.membership.len()
    }

    pub fn is_empty(&self) -> bool {
        self.membership.is_empty()
    }
} // end of impl ExistingClusters

//====================================================================================

/// queries in input order with the ids they are linked to
#[derive(Clone, Debug, Default)]
pub struct QueryLinks {
    queries: Vec<String>,
    links: Vec<Vec<String>>,
    index: HashMap<String, usize>,
}

impl QueryLinks {
    pub fn new() -> Self {
        QueryLinks::default()
    }

    /// registers query if not yet seen, returns its rank
    pub fn add_query(&mut self, query: &str) -> usize {
        if let Some(idx) = self.index.get(query) {
            return *idx;
        }
        let idx = self.queries.len();
        self.queries.push(query.to_string());
        self.links.push(Vec::new());
        self.index.insert(query.to_string(), idx);
        idx
    }

    pub fn add_link(&mut self, query: &str, linked: &str) {
        let idx = self.add_query(query);
        self.links[idx].push(linked.to_string());
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn get_queries(&self) -> &[String] {
        &self.queries
    }

    pub fn get_links(&self, query: &str) -> Option<&[String]> {
        self.index.get(query).map(|idx| self.links[*idx].as_slice())
    }

    pub fn get_rank(&self, query: &str) -> Option<usize> {
        self.index.get(query).copied()
    }
} // end of impl QueryLinks

/// Reads a tab separated links file, one `query<TAB>linked_id` per line.
/// A line with only a query declares it without any link.
/// Ids found in existing clusters are reference links, other ids are queries and give an edge of the query graph.
pub fn read_links<R: Read>(
    reader: R,
    origin: &str,
    existing: &ExistingClusters,
) -> Result<(QueryLinks, QueryGraph)> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(reader);
    let mut links = QueryLinks::new();
    let mut graph = QueryGraph::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let query = match record.get(0).map(|s| s.trim()) {
            Some(q) if !q.is_empty() => q,
            _ => {
                return Err(StrainError::Parse {
                    origin: origin.to_string(),
                    line: i + 1,
                    msg: "empty query field".to_string(),
                })
            }
        };
        links.add_query(query);
        graph.add_node(query);
        let linked = match record.get(1).map(|s| s.trim()) {
            Some(l) if !l.is_empty() && l != query => l,
            _ => continue,
        };
        links.add_link(query, linked);
        if !existing.contains(linked) {
            links.add_query(linked);
            graph.add_edge(query, linked);
        }
    }
    log::info!(
        "read links of {} queries, {} query-query edges",
        links.len(),
        graph.nb_edges()
    );
    Ok((links, graph))
} // end of read_links

pub fn read_links_file(path: &Path, existing: &ExistingClusters) -> Result<(QueryLinks, QueryGraph)> {
    let file = std::fs::File::open(path).map_err(|e| StrainError::io(path, e))?;
    read_links(std::io::BufReader::new(file), &path.to_string_lossy(), existing)
}

//====================================================================================

/// outcome of assignment for one query
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClusterDecision {
    /// the query belongs to one existing cluster
    Existing(u64),
    /// the query hits several existing clusters which should be merged
    MergeNeeded(Vec<u64>),
    /// the query founds a new cluster
    New(u64),
}

impl fmt::Display for ClusterDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterDecision::Existing(id) | ClusterDecision::New(id) => write!(f, "{}", id),
            ClusterDecision::MergeNeeded(ids) => {
                let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
                write!(f, "{}", ids.join(";"))
            }
        }
    }
}

/// running maximum cluster id and component to cluster translation of an assignment pass
#[derive(Clone, Debug)]
pub struct AssignmentState {
    max_cluster: u64,
    first_component_id: u64,
    translate: HashMap<usize, u64>,
}

impl AssignmentState {
    /// component of rank r gets id existing_max + 1 + r, isolated queries come after all components
    pub fn new(existing_max: u64, nb_components: usize) -> Self {
        AssignmentState {
            max_cluster: existing_max + nb_components as u64,
            first_component_id: existing_max + 1,
            translate: HashMap::new(),
        }
    }

    pub fn get_max_cluster(&self) -> u64 {
        self.max_cluster
    }

    /// translated id of component, set at first request
    pub fn component_cluster(&mut self, rank: usize) -> u64 {
        let id = self.first_component_id + rank as u64;
        *self.translate.entry(rank).or_insert(id)
    }

    pub fn mint(&mut self) -> u64 {
        self.max_cluster += 1;
        self.max_cluster
    }
} // end of impl AssignmentState

/// decisions for all queries, in input order
#[derive(Clone, Debug)]
pub struct Assignment {
    decisions: Vec<(String, ClusterDecision)>,
    existing_hits: Vec<Vec<u64>>,
    /// query -> row in decisions
    index: HashMap<String, usize>,
}

impl Assignment {
    pub fn get_decisions(&self) -> &[(String, ClusterDecision)] {
        &self.decisions
    }

    pub fn get_decision(&self, query: &str) -> Option<&ClusterDecision> {
        self.index.get(query).map(|i| &self.decisions[*i].1)
    }

    /// distinct existing clusters hit by the reference links of query
    pub fn get_existing_hits(&self, query: &str) -> Option<&[u64]> {
        self.index
            .get(query)
            .map(|i| self.existing_hits[*i].as_slice())
    }

    /// queries assigned to a new cluster
    pub fn additional_clusters(&self) -> Vec<(&str, u64)> {
        self.decisions
            .iter()
            .filter_map(|(q, d)| match d {
                ClusterDecision::New(id) => Some((q.as_str(), *id)),
                _ => None,
            })
            .collect()
    }

    pub fn nb_merge_needed(&self) -> usize {
        self.decisions
            .iter()
            .filter(|(_, d)| matches!(d, ClusterDecision::MergeNeeded(_)))
            .count()
    }

    /// csv with header Query,Cluster
    pub fn write_csv<W: Write>(&self, out: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(["Query", "Cluster"])?;
        for (query, decision) in &self.decisions {
            writer.write_record([query.as_str(), decision.to_string().as_str()])?;
        }
        writer.flush().map_err(|e| StrainError::io("cluster assignment", e))?;
        Ok(())
    }

    pub fn dump_csv(&self, path: &Path) -> Result<()> {
        log::info!("writing {} cluster assignments in {:?}", self.decisions.len(), path);
        let file = std::fs::File::create(path).map_err(|e| StrainError::io(path, e))?;
        self.write_csv(std::io::BufWriter::new(file))
    }
} // end of impl Assignment

// distinct values, first seen order
fn push_distinct(ids: &mut Vec<u64>, id: u64) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}

fn decision_from_hits(hits: &[u64]) -> Option<ClusterDecision> {
    match hits.len() {
        0 => None,
        1 => Some(ClusterDecision::Existing(hits[0])),
        _ => Some(ClusterDecision::MergeNeeded(hits.to_vec())),
    }
}

/// one pass over queries with an externally held state
pub fn assign_with_state(
    links: &QueryLinks,
    components: &QueryComponents,
    existing: &ExistingClusters,
    state: &mut AssignmentState,
) -> Assignment {
    // hits of all queries are needed before the pass for transitive inheritance
    let existing_hits: Vec<Vec<u64>> = links
        .queries
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let mut hits = Vec::new();
            for linked in &links.links[i] {
                if let Some(id) = existing.get_cluster(linked) {
                    push_distinct(&mut hits, id);
                }
            }
            hits
        })
        .collect();
    //
    let mut decisions = Vec::with_capacity(links.len());
    for (i, query) in links.queries.iter().enumerate() {
        let decision = match decision_from_hits(&existing_hits[i]) {
            Some(d) => d,
            None => match components.get_component(query) {
                Some(rank) => {
                    let mut inherited = Vec::new();
                    for member in components.get_members(rank) {
                        if member == query {
                            continue;
                        }
                        if let Some(m) = links.get_rank(member) {
                            for id in &existing_hits[m] {
                                push_distinct(&mut inherited, *id);
                            }
                        }
                    }
                    match decision_from_hits(&inherited) {
                        Some(d) => d,
                        None => ClusterDecision::New(state.component_cluster(rank)),
                    }
                }
                None => ClusterDecision::New(state.mint()),
            },
        };
        log::trace!("query {} : {:?}", query, decision);
        decisions.push((query.clone(), decision));
    }
    // rows follow the ranks of links
    let assignment = Assignment {
        decisions,
        existing_hits,
        index: links.index.clone(),
    };
    log::info!(
        "assigned {} queries, {} new clusters, {} needing merge, max cluster id : {}",
        assignment.decisions.len(),
        assignment.additional_clusters().len(),
        assignment.nb_merge_needed(),
        state.get_max_cluster()
    );
    assignment
} // end of assign_with_state

/// Assigns every query of links, in input order. New ids are strictly above the max existing id.
pub fn assign_queries_to_clusters(
    links: &QueryLinks,
    graph: &QueryGraph,
    existing: &ExistingClusters,
) -> Assignment {
    let components = graph.components();
    let mut state = AssignmentState::new(existing.get_max_cluster(), components.nb_components());
    assign_with_state(links, &components, existing, &mut state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc_clusters() -> ExistingClusters {
        let text = "Taxon,Cluster\nA,1\nB,1.2\nC,2\n";
        ExistingClusters::from_reader(text.as_bytes(), "test").unwrap()
    }

    fn run(links_text: &str) -> Assignment {
        let existing = abc_clusters();
        let (links, graph) = read_links(links_text.as_bytes(), "test", &existing).unwrap();
        assign_queries_to_clusters(&links, &graph, &existing)
    }

    #[test]
    fn test_existing_clusters() {
        let clusters = abc_clusters();
        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters.get_cluster("B"), Some(1));
        assert_eq!(clusters.get_max_cluster(), 2);
        assert!(ExistingClusters::from_reader("Name,Id\nA,1\n".as_bytes(), "t").is_err());
        assert!(ExistingClusters::from_reader("Taxon,Cluster\nA,x\n".as_bytes(), "t").is_err());
    }

    #[test]
    fn test_existing_and_merge() {
        let assignment = run("Q1\tA\nQ2\tA\nQ2\tC\n");
        assert_eq!(assignment.get_decision("Q1"), Some(&ClusterDecision::Existing(1)));
        assert_eq!(
            assignment.get_decision("Q2"),
            Some(&ClusterDecision::MergeNeeded(vec![1, 2]))
        );
        assert_eq!(assignment.get_existing_hits("Q2"), Some(&[1u64, 2][..]));
        assert!(assignment.additional_clusters().is_empty());
    }

    #[test]
    fn test_transitive_hit() {
        let assignment = run("Q1\tA\nQ3\tQ1\n");
        assert_eq!(assignment.get_decision("Q3"), Some(&ClusterDecision::Existing(1)));
        // transitive merge, member order gives precedence
        let assignment = run("Q1\tC\nQ2\tA\nQ3\tQ2\nQ3\tQ1\n");
        assert_eq!(
            assignment.get_decision("Q3"),
            Some(&ClusterDecision::MergeNeeded(vec![2, 1]))
        );
    }

    #[test]
    fn test_new_clusters() {
        // isolated queries mint above components
        let assignment = run("Q5\nQ6\nQ7\tQ8\n");
        assert_eq!(assignment.get_decision("Q7"), Some(&ClusterDecision::New(3)));
        assert_eq!(assignment.get_decision("Q8"), Some(&ClusterDecision::New(3)));
        assert_eq!(assignment.get_decision("Q5"), Some(&ClusterDecision::New(4)));
        assert_eq!(assignment.get_decision("Q6"), Some(&ClusterDecision::New(5)));
        assert_eq!(assignment.additional_clusters().len(), 4);
        for (_, id) in assignment.additional_clusters() {
            assert!(id > 2);
        }
    }

    #[test]
    fn test_idempotent_output() {
        let text = "Q1\tA\nQ2\tA\nQ2\tC\nQ3\tQ1\nQ4\nQ5\tQ6\n";
        let mut first = Vec::<u8>::new();
        run(text).write_csv(&mut first).unwrap();
        let mut second = Vec::<u8>::new();
        run(text).write_csv(&mut second).unwrap();
        assert_eq!(first, second);
        let first = String::from_utf8(first).unwrap();
        assert_eq!(
            first,
            "Query,Cluster\nQ1,1\nQ2,1;2\nQ3,1\nQ4,5\nQ5,4\nQ6,4\n"
        );
    }

    #[test]
    fn test_lookup_by_query() {
        let assignment = run("Q1\tA\nQ2\tQ1\nQ3\tC\nQ3\tB\n");
        for (query, decision) in assignment.get_decisions() {
            assert_eq!(assignment.get_decision(query), Some(decision));
        }
        assert_eq!(assignment.get_existing_hits("Q3"), Some(&[2u64, 1][..]));
        assert_eq!(assignment.get_existing_hits("Q2"), Some(&[] as &[u64]));
        assert_eq!(assignment.get_decision("unknown"), None);
        assert_eq!(assignment.get_existing_hits("unknown"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(ClusterDecision::MergeNeeded(vec![3, 1, 7]).to_string(), "3;1;7");
        assert_eq!(ClusterDecision::New(12).to_string(), "12");
    }
}
