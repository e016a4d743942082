//! Graph of queries. An edge between two queries means they are close enough to share a cluster,
//! the decision is made upstream from thresholded distances.
//!
//! Components are computed once with a union find, no graph mutation happens during assignment.

use std::collections::HashMap;

use petgraph::unionfind::UnionFind;

/// undirected graph over query names. Node order is insertion order and defines
/// the order of members inside components.
#[derive(Clone, Debug, Default)]
pub struct QueryGraph {
    names: Vec<String>,
    index: HashMap<String, usize>,
    edges: Vec<(usize, usize)>,
    degree: Vec<usize>,
} // end of QueryGraph

impl QueryGraph {
    pub fn new() -> Self {
        QueryGraph::default()
    }

    /// returns node index of name, inserting it if necessary
    pub fn add_node(&mut self, name: &str) -> usize {
        if let Some(idx) = self.index.get(name) {
            return *idx;
        }
        let idx = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), idx);
        self.degree.push(0);
        idx
    }

    /// self loops are ignored
    pub fn add_edge(&mut self, a: &str, b: &str) {
        let ia = self.add_node(a);
        let ib = self.add_node(b);
        if ia == ib {
            return;
        }
        self.edges.push((ia, ib));
        self.degree[ia] += 1;
        self.degree[ib] += 1;
    }

    pub fn nb_nodes(&self) -> usize {
        self.names.len()
    }

    pub fn nb_edges(&self) -> usize {
        self.edges.len()
    }

    /// true if name has at least one edge to another query
    pub fn is_connected(&self, name: &str) -> bool {
        self.index
            .get(name)
            .map(|idx| self.degree[*idx] > 0)
            .unwrap_or(false)
    }

    /// connected components of queries having at least one edge, isolated queries are left out.
    /// Components are ranked by decreasing size, equal sizes keep the order of their first member.
    pub fn components(&self) -> QueryComponents {
        let nb_nodes = self.names.len();
        let mut uf = UnionFind::<usize>::new(nb_nodes);
        for (a, b) in &self.edges {
            uf.union(*a, *b);
        }
        let labels = uf.into_labeling();
        // group by representative, groups in order of their first node
        let mut group_of_label: Vec<Option<usize>> = vec![None; nb_nodes];
        let mut groups = Vec::<Vec<usize>>::new();
        for node in 0..nb_nodes {
            if self.degree[node] == 0 {
                continue;
            }
            let label = labels[node];
            match group_of_label[label] {
                Some(g) => groups[g].push(node),
                None => {
                    group_of_label[label] = Some(groups.len());
                    groups.push(vec![node]);
                }
            }
        }
        // stable sort, size ties keep first member order
        groups.sort_by(|a, b| b.len().cmp(&a.len()));
        //
        let mut rank_of = HashMap::<String, usize>::new();
        let mut members = Vec::<Vec<String>>::with_capacity(groups.len());
        for (rank, group) in groups.iter().enumerate() {
            let names: Vec<String> = group.iter().map(|n| self.names[*n].clone()).collect();
            for name in &names {
                rank_of.insert(name.clone(), rank);
            }
            members.push(names);
        }
        log::debug!(
            "query graph : {} nodes, {} edges, {} components",
            nb_nodes,
            self.edges.len(),
            members.len()
        );
        QueryComponents { rank_of, members }
    } // end of components
} // end of impl QueryGraph

/// components of a [QueryGraph], identified by their rank
#[derive(Clone, Debug)]
pub struct QueryComponents {
    rank_of: HashMap<String, usize>,
    members: Vec<Vec<String>>,
}

impl QueryComponents {
    pub fn nb_components(&self) -> usize {
        self.members.len()
    }

    /// rank of component of query, None for an isolated query
    pub fn get_component(&self, name: &str) -> Option<usize> {
        self.rank_of.get(name).copied()
    }

    pub fn get_members(&self, rank: usize) -> &[String] {
        &self.members[rank]
    }
} // end of impl QueryComponents

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components_ranked_by_size() {
        let mut graph = QueryGraph::new();
        graph.add_node("lonely");
        graph.add_edge("a", "b");
        graph.add_edge("c", "d");
        graph.add_edge("d", "e");
        graph.add_edge("f", "f");
        let components = graph.components();
        assert_eq!(components.nb_components(), 2);
        assert_eq!(components.get_component("c"), Some(0));
        assert_eq!(components.get_component("e"), Some(0));
        assert_eq!(components.get_component("a"), Some(1));
        assert_eq!(components.get_component("lonely"), None);
        assert_eq!(components.get_component("f"), None);
        assert_eq!(components.get_members(0), &["c", "d", "e"]);
        assert!(!graph.is_connected("f"));
        assert!(graph.is_connected("b"));
    }

    #[test]
    fn test_equal_sizes_keep_insertion_order() {
        let mut graph = QueryGraph::new();
        graph.add_edge("x", "y");
        graph.add_edge("a", "b");
        graph.add_edge("b", "x");
        graph.add_edge("p", "q");
        graph.add_edge("m", "n");
        let components = graph.components();
        assert_eq!(components.get_members(0), &["x", "y", "a", "b"]);
        assert_eq!(components.get_members(1), &["p", "q"]);
        assert_eq!(components.get_members(2), &["m", "n"]);
    }
}
