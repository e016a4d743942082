//! cluster assignment from database cluster table and links file

use pretty_assertions::assert_eq;

use strainstruct::cluster::{
    assign_queries_to_clusters, read_links_file, ClusterDecision, ExistingClusters,
};
use strainstruct::mash::{clusters_file_name, create_database_dir};

const CLUSTERS: &str = "Taxon,Cluster\n\
ref_a.fa,1\n\
ref_b.fa,1\n\
ref_c.fa,2\n\
ref_d.fa,3.1\n";

// q1 hits cluster 1, q2 hits 1 and 2, q3 only knows q1, q4 and q5 are linked together, q6 is alone
const LINKS: &str = "q1.fa\tref_a.fa\n\
q2.fa\tref_b.fa\n\
q2.fa\tref_c.fa\n\
q2.fa\tref_a.fa\n\
q3.fa\tq1.fa\n\
q4.fa\tq5.fa\n\
q6.fa\n";

fn run_assignment(dir: &std::path::Path) -> String {
    let dbdir = dir.join("strains");
    let clusters_file = clusters_file_name(&dbdir).unwrap();
    let existing = ExistingClusters::from_csv(&clusters_file).unwrap();
    let (links, graph) = read_links_file(&dir.join("links.tsv"), &existing).unwrap();
    let assignment = assign_queries_to_clusters(&links, &graph, &existing);
    let out = dir.join("run_clusters.csv");
    assignment.dump_csv(&out).unwrap();
    std::fs::read_to_string(&out).unwrap()
}

#[test]
fn assignment_from_files() {
    let tmp = tempfile::tempdir().unwrap();
    let dbdir = tmp.path().join("strains");
    create_database_dir(&dbdir).unwrap();
    std::fs::write(clusters_file_name(&dbdir).unwrap(), CLUSTERS).unwrap();
    std::fs::write(tmp.path().join("links.tsv"), LINKS).unwrap();
    //
    let existing = ExistingClusters::from_csv(&clusters_file_name(&dbdir).unwrap()).unwrap();
    assert_eq!(existing.get_max_cluster(), 3);
    let (links, graph) = read_links_file(&tmp.path().join("links.tsv"), &existing).unwrap();
    assert_eq!(links.len(), 6);
    assert_eq!(graph.nb_edges(), 2);
    let assignment = assign_queries_to_clusters(&links, &graph, &existing);
    assert_eq!(assignment.get_decision("q1.fa"), Some(&ClusterDecision::Existing(1)));
    assert_eq!(
        assignment.get_decision("q2.fa"),
        Some(&ClusterDecision::MergeNeeded(vec![1, 2]))
    );
    assert_eq!(assignment.get_decision("q3.fa"), Some(&ClusterDecision::Existing(1)));
    // components {q1,q3} and {q4,q5} have ids 4 and 5, q6 comes after
    assert_eq!(assignment.get_decision("q4.fa"), Some(&ClusterDecision::New(5)));
    assert_eq!(assignment.get_decision("q5.fa"), Some(&ClusterDecision::New(5)));
    assert_eq!(assignment.get_decision("q6.fa"), Some(&ClusterDecision::New(6)));
    assert_eq!(
        assignment.additional_clusters(),
        vec![("q4.fa", 5), ("q5.fa", 5), ("q6.fa", 6)]
    );
    //
    let first = run_assignment(tmp.path());
    let second = run_assignment(tmp.path());
    assert_eq!(first, second);
    assert_eq!(
        first,
        "Query,Cluster\nq1.fa,1\nq2.fa,1;2\nq3.fa,1\nq4.fa,5\nq5.fa,5\nq6.fa,6\n"
    );
}
