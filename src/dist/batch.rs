//! Splits an ordered list into batches of increasing size.
//!
//! In self comparison the assembly of rank i is compared to the i assemblies before it,
//! so the work of a batch grows with the rank of its elements. Batches start with 1 element
//! and grow arithmetically so that each worker gets roughly the same number of comparisons.

use crate::errors::{Result, StrainError};

/// split list into unequally sized batches.
/// nb_batch is the number of batches asked for, inc the size increment between consecutive batches.
/// The concatenation of the returned batches is always the input list.
pub fn split_list<T: Clone>(list: &[T], nb_batch: usize, inc: usize) -> Vec<Vec<T>> {
    let mut batches = Vec::<Vec<T>>::with_capacity(nb_batch);
    if nb_batch == 0 {
        return batches;
    }
    // remaining elements
    let mut zr = list.len();
    // start of next batch
    let mut st = 0;
    // remaining batches to construct
    let mut nr = nb_batch;
    // size of next batch
    let mut nc = 1;
    //
    while zr >= nc * nr && nr > 1 {
        batches.push(list[st..st + nc].to_vec());
        st += nc;
        zr -= nc;
        nr -= 1;
        nc += inc;
    }
    //
    let nc = zr / nr;
    for _ in 0..nr - 1 {
        batches.push(list[st..st + nc].to_vec());
        st += nc;
    }
    // last batch takes everything left
    batches.push(list[st..].to_vec());
    batches
} // end of split_list

/// batches of indices 0..nb_elem for threads workers, empty batches dropped.
pub fn make_batches(nb_elem: usize, threads: usize) -> Result<Vec<Vec<usize>>> {
    if threads == 0 {
        return Err(StrainError::config("number of batches must be positive"));
    }
    let indices: Vec<usize> = (0..nb_elem).collect();
    if threads == 1 {
        if indices.is_empty() {
            return Ok(Vec::new());
        }
        return Ok(vec![indices]);
    }
    let inc = nb_elem / threads;
    let batches: Vec<Vec<usize>> = split_list(&indices, threads, inc)
        .into_iter()
        .filter(|b| !b.is_empty())
        .collect();
    if log::log_enabled!(log::Level::Debug) {
        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        log::debug!("make_batches nb elem {}, batch sizes {:?}", nb_elem, sizes);
    }
    Ok(batches)
} // end of make_batches

#[cfg(test)]
mod tests {
    use super::*;

    fn concat(batches: &[Vec<usize>]) -> Vec<usize> {
        batches.iter().flatten().copied().collect()
    }

    #[test]
    fn test_split_sizes() {
        let list: Vec<usize> = (0..10).collect();
        let batches = split_list(&list, 3, 3);
        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![1, 4, 5]);
        assert_eq!(concat(&batches), list);
    }

    #[test]
    fn test_single_thread() {
        let batches = make_batches(7, 1).unwrap();
        assert_eq!(batches, vec![(0..7).collect::<Vec<usize>>()]);
    }

    #[test]
    fn test_partition_is_exact() {
        for nb_elem in 0..60 {
            for threads in 1..12 {
                let batches = make_batches(nb_elem, threads).unwrap();
                assert!(batches.len() <= threads);
                assert!(batches.iter().all(|b| !b.is_empty()));
                assert_eq!(concat(&batches), (0..nb_elem).collect::<Vec<usize>>());
            }
        }
    }

    #[test]
    fn test_empty_list() {
        for threads in 1..5 {
            assert!(make_batches(0, threads).unwrap().is_empty());
        }
    }

    #[test]
    fn test_more_threads_than_elements() {
        let batches = make_batches(3, 5).unwrap();
        assert_eq!(concat(&batches), vec![0, 1, 2]);
    }

    #[test]
    fn test_balanced_work() {
        // work of a batch in self mode is the sum of ranks
        let batches = make_batches(1000, 4).unwrap();
        let work: Vec<usize> = batches.iter().map(|b| b.iter().sum()).collect();
        let first_size = batches[0].len();
        let last_size = batches[batches.len() - 1].len();
        assert!(first_size < last_size);
        let max = *work.iter().max().unwrap() as f64;
        let total: usize = work.iter().sum();
        assert!(max < total as f64 * 0.75);
    }

    #[test]
    fn test_zero_threads() {
        assert!(make_batches(10, 0).is_err());
    }
}
