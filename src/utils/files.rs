//! This file contains reading of assembly lists.
//! The rank of an assembly in its list file is its global index, used everywhere else in place of its name.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::dist::batch::make_batches;
use crate::errors::{Result, StrainError};

/// An ordered list of assemblies (path to fasta file or any identifier).
/// Indexes are dense over [0, len) and follow the order of the list file.
#[derive(Clone, Debug)]
pub struct AssemblyList {
    /// names by index
    names: Vec<String>,
    /// name to global index
    indices: HashMap<String, usize>,
    /// batches of indices, one for each worker
    batches: Vec<Vec<usize>>,
} // end of AssemblyList

impl AssemblyList {
    /// builds list from names, names must be unique. threads gives the number of batches asked for.
    pub fn from_names(names: Vec<String>, threads: usize) -> Result<Self> {
        let mut indices = HashMap::<String, usize>::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if indices.insert(name.clone(), i).is_some() {
                return Err(StrainError::config(format!(
                    "assembly {} appears twice in list",
                    name
                )));
            }
        }
        let batches = make_batches(names.len(), threads)?;
        log::debug!(
            "AssemblyList nb assemblies : {}, nb batches : {}",
            names.len(),
            batches.len()
        );
        Ok(AssemblyList {
            names,
            indices,
            batches,
        })
    } // end of from_names

    /// reads a file with one assembly by line. Blank lines are skipped.
    pub fn from_file(path: &Path, threads: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .open(path)
            .map_err(|e| StrainError::io(path, e))?;
        let reader = BufReader::new(file);
        let mut names = Vec::<String>::new();
        for line in reader.lines() {
            let line = line.map_err(|e| StrainError::io(path, e))?;
            let assembly = line.trim_end();
            if !assembly.is_empty() {
                names.push(assembly.to_string());
            }
        }
        log::info!("read {} assemblies from {:?}", names.len(), path);
        AssemblyList::from_names(names, threads)
    } // end of from_file

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get_name(&self, index: usize) -> &str {
        &self.names[index]
    }

    pub fn get_index(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }

    pub fn get_names(&self) -> &[String] {
        &self.names
    }

    /// batches of indices balancing triangular comparison work, see [crate::dist::batch]
    pub fn get_batches(&self) -> &[Vec<usize>] {
        &self.batches
    }
} // end of impl AssemblyList

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_list_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "a.fa\nb.fa\n\nc.fa").unwrap();
        drop(f);
        let list = AssemblyList::from_file(&path, 2).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.get_index("c.fa"), Some(2));
        assert_eq!(list.get_name(1), "b.fa");
        let all: Vec<usize> = list.get_batches().iter().flatten().copied().collect();
        assert_eq!(all, vec![0, 1, 2]);
    }

    #[test]
    fn test_duplicate_assembly() {
        let names = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        let res = AssemblyList::from_names(names, 1);
        assert!(res.unwrap_err().is_config());
    }
}
