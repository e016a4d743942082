//! distance pipeline with an in memory distance tool, table output and json dump/reload

use pretty_assertions::assert_eq;

use strainstruct::dist::output::{print_query_output, write_distances};
use strainstruct::dist::query_database;
use strainstruct::dist::rawmatch::{RawMatch, RawMatchSet};
use strainstruct::mash::DistTool;
use strainstruct::utils::dumpload::{dump_distances, reload_distances};
use strainstruct::utils::{AssemblyList, ComputingParams};
use strainstruct::Result;

// assemblies i and j have core distance c_ij and accessory distance a_ij,
// the core distance is the intercept of log J_k, the accessory distance its slope
struct ModelTool {
    names: Vec<String>,
}

fn core(i: usize, j: usize) -> f64 {
    0.002 * (i as f64 - j as f64).abs()
}

fn accessory(i: usize, j: usize) -> f64 {
    0.01 * (i + j) as f64
}

impl DistTool for ModelTool {
    fn raw_matches(&self, k: usize, _nb_threads: usize) -> Result<RawMatchSet> {
        let mut matches = Vec::new();
        for (i, r) in self.names.iter().enumerate() {
            for (j, q) in self.names.iter().enumerate() {
                let fraction = (1. - core(i, j)) * (1. - accessory(i, j)).powi(k as i32);
                matches.push(RawMatch::new(q.clone(), r.clone(), fraction));
            }
        }
        Ok(RawMatchSet::new(k, matches))
    }
}

fn names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("assembly_{}.fa", i)).collect()
}

#[test]
fn self_mode_recovers_model_distances() {
    let tool = ModelTool { names: names(9) };
    let computing = ComputingParams::new(4, "mash".to_string()).unwrap();
    let queries = AssemblyList::from_names(names(9), 4).unwrap();
    let matrix = query_database(&tool, &queries, None, &[13, 17, 21, 25, 29], true, &computing).unwrap();
    assert_eq!(matrix.nb_rows(), 36);
    assert_eq!(matrix.nb_not_estimable(), 0);
    for i in 0..matrix.nb_rows() {
        let (q, r) = (matrix.qlist[i], matrix.rlist[i]);
        assert!((matrix.dists[[i, 0]] - core(q, r)).abs() < 1e-6);
        assert!((matrix.dists[[i, 1]] - accessory(q, r)).abs() < 1e-6);
    }
}

#[test]
fn table_survives_dump_and_reload() {
    let tool = ModelTool { names: names(6) };
    let computing = ComputingParams::new(2, "mash".to_string()).unwrap();
    let queries = AssemblyList::from_names(names(6), 2).unwrap();
    let matrix = query_database(&tool, &queries, None, &[15, 19, 23], true, &computing).unwrap();
    //
    let tmp = tempfile::tempdir().unwrap();
    let json = tmp.path().join("run.json");
    dump_distances(&matrix, &json).unwrap();
    let reloaded = reload_distances(&json).unwrap();
    //
    let tsv = tmp.path().join("run.tsv");
    let nb = print_query_output(&reloaded, &tsv).unwrap();
    assert_eq!(nb, 15);
    let mut direct = Vec::<u8>::new();
    write_distances(&matrix, &mut direct).unwrap();
    let from_file = std::fs::read_to_string(&tsv).unwrap();
    assert_eq!(from_file, String::from_utf8(direct).unwrap());
    assert!(from_file.starts_with("Query\tReference\tCore\tAccessory\n"));
    assert_eq!(from_file.lines().count(), 16);
}

#[test]
fn queries_against_references() {
    let all = names(5);
    let tool = ModelTool { names: all.clone() };
    let computing = ComputingParams::new(3, "mash".to_string()).unwrap();
    let queries = AssemblyList::from_names(all[3..].to_vec(), 1).unwrap();
    let references = AssemblyList::from_names(all.clone(), 1).unwrap();
    // the model tool reports all assemblies as queries, keep only the real ones
    struct Restricted<'a> {
        inner: &'a ModelTool,
        queries: &'a AssemblyList,
    }
    impl<'a> DistTool for Restricted<'a> {
        fn raw_matches(&self, k: usize, nb_threads: usize) -> Result<RawMatchSet> {
            let set = self.inner.raw_matches(k, nb_threads)?;
            let kept = set
                .get_matches()
                .iter()
                .filter(|m| self.queries.get_index(&m.query).is_some())
                .cloned()
                .collect();
            Ok(RawMatchSet::new(k, kept))
        }
    }
    let restricted = Restricted {
        inner: &tool,
        queries: &queries,
    };
    let matrix = query_database(
        &restricted,
        &queries,
        Some(&references),
        &[13, 17, 21],
        false,
        &computing,
    )
    .unwrap();
    // 2 queries x 5 references, a query against itself is not estimable
    assert_eq!(matrix.nb_rows(), 10);
    assert_eq!(matrix.nb_not_estimable(), 2);
    for i in 0..matrix.nb_rows() {
        let (query, reference, core_d, _) = matrix.get_row(i);
        assert_eq!(core_d.is_none(), query == reference);
    }
}
