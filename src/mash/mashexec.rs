//! running the mash executable and parsing its output

use std::io::BufRead;
use std::path::Path;
use std::process::{Command, Output};

use crate::dist::rawmatch::{RawMatch, RawMatchSet};
use crate::errors::{Result, StrainError};

/// a mash executable
#[derive(Clone, Debug)]
pub struct MashExec {
    exec: String,
}

impl MashExec {
    pub fn new(exec: &str) -> Self {
        MashExec {
            exec: exec.to_string(),
        }
    }

    pub fn get_exec(&self) -> &str {
        &self.exec
    }

    // runs command, a non zero exit status is an error
    fn run(&self, args: &[String]) -> Result<Output> {
        let command = format!("{} {}", self.exec, args.join(" "));
        log::debug!("running : {}", command);
        let output = Command::new(&self.exec)
            .args(args)
            .output()
            .map_err(|e| StrainError::Tool {
                command: command.clone(),
                msg: e.to_string(),
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::error!("command {} failed : {}", command, stderr.trim_end());
            return Err(StrainError::Tool {
                command,
                msg: format!("exited with {}", output.status),
            });
        }
        Ok(output)
    } // end of run

    /// mash sketch -w 1 -s sketch_size -o out_prefix -k k -l assembly_list
    pub fn sketch(&self, k: usize, sketch_size: usize, assembly_list: &Path, out_prefix: &Path) -> Result<()> {
        let args = vec![
            "sketch".to_string(),
            "-w".to_string(),
            "1".to_string(),
            "-s".to_string(),
            sketch_size.to_string(),
            "-o".to_string(),
            out_prefix.to_string_lossy().to_string(),
            "-k".to_string(),
            k.to_string(),
            "-l".to_string(),
            assembly_list.to_string_lossy().to_string(),
        ];
        self.run(&args)?;
        Ok(())
    } // end of sketch

    /// sketch size of a sketch database, from mash info -t
    pub fn info_sketch_size(&self, dbname: &Path) -> Result<usize> {
        let args = vec![
            "info".to_string(),
            "-t".to_string(),
            dbname.to_string_lossy().to_string(),
        ];
        let output = self.run(&args)?;
        parse_info_sketch_size(&output.stdout[..], dbname)
    } // end of info_sketch_size

    /// mash dist -p nb_threads db db in self mode, mash dist -p nb_threads -l db query_list otherwise
    pub fn dist(&self, k: usize, dbname: &Path, query_list: Option<&Path>, nb_threads: usize) -> Result<RawMatchSet> {
        let mut args = vec![
            "dist".to_string(),
            "-p".to_string(),
            nb_threads.max(1).to_string(),
        ];
        match query_list {
            None => {
                args.push(dbname.to_string_lossy().to_string());
                args.push(dbname.to_string_lossy().to_string());
            }
            Some(qfile) => {
                args.push("-l".to_string());
                args.push(dbname.to_string_lossy().to_string());
                args.push(qfile.to_string_lossy().to_string());
            }
        }
        let output = self.run(&args)?;
        parse_dist_output(k, &output.stdout[..])
    } // end of dist
} // end of impl MashExec

/// parses mash dist output : reference, query, distance, p-value, shared/total. Tab separated.
/// Lines with less than 3 fields are ignored, the last field gives the jaccard fraction.
pub fn parse_dist_output<R: BufRead>(k: usize, reader: R) -> Result<RawMatchSet> {
    let origin = format!("mash dist output k={}", k);
    let mut matches = Vec::<RawMatch>::new();
    for (num, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| StrainError::Parse {
            origin: origin.clone(),
            line: num + 1,
            msg: e.to_string(),
        })?;
        let fields: Vec<&str> = line.trim_end().split('\t').collect();
        if fields.len() <= 2 {
            continue;
        }
        let fraction = parse_fraction(fields[fields.len() - 1]).ok_or_else(|| StrainError::Parse {
            origin: origin.clone(),
            line: num + 1,
            msg: format!("cannot read shared/total in {}", line),
        })?;
        matches.push(RawMatch::new(fields[1].to_string(), fields[0].to_string(), fraction));
    }
    log::debug!("parse_dist_output k = {}, nb lines {}", k, matches.len());
    Ok(RawMatchSet::new(k, matches))
} // end of parse_dist_output

// "shared/total" as a fraction
fn parse_fraction(field: &str) -> Option<f64> {
    let (shared, total) = field.split_once('/')?;
    let shared = shared.trim().parse::<f64>().ok()?;
    let total = total.trim().parse::<f64>().ok()?;
    if total <= 0. || shared < 0. || shared > total {
        return None;
    }
    Some(shared / total)
}

/// first non comment line of mash info -t is : hashes, length, id, comment
fn parse_info_sketch_size<R: BufRead>(reader: R, dbname: &Path) -> Result<usize> {
    let origin = format!("mash info {:?}", dbname);
    for (num, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| StrainError::Parse {
            origin: origin.clone(),
            line: num + 1,
            msg: e.to_string(),
        })?;
        if line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.trim_end().split('\t').collect();
        if !fields[0].is_empty() {
            return fields[0].trim().parse::<usize>().map_err(|e| StrainError::Parse {
                origin,
                line: num + 1,
                msg: e.to_string(),
            });
        }
    }
    Err(StrainError::config(format!(
        "no sketch found in {:?}",
        dbname
    )))
} // end of parse_info_sketch_size

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dist() {
        let out = "r1.fa\tq1.fa\t0.01\t0\t900/1000\n\
                   r2.fa\tq1.fa\t0.2\t1e-10\t0/1000\n\
                   \n\
                   garbage\n";
        let set = parse_dist_output(17, out.as_bytes()).unwrap();
        assert_eq!(set.get_kmer(), 17);
        assert_eq!(set.len(), 2);
        let m = &set.get_matches()[0];
        assert_eq!(m.query, "q1.fa");
        assert_eq!(m.reference, "r1.fa");
        assert!((m.fraction - 0.9).abs() < 1e-12);
        assert_eq!(set.get_matches()[1].fraction, 0.);
    }

    #[test]
    fn test_parse_dist_bad_fraction() {
        let out = "r1.fa\tq1.fa\t0.01\t0\tnot_a_fraction\n";
        assert!(parse_dist_output(17, out.as_bytes()).is_err());
        let out = "r1.fa\tq1.fa\t0.01\t0\t5/0\n";
        assert!(parse_dist_output(17, out.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_info() {
        let out = "#Hashes\tLength\tID\tComment\n10000\t2845421\tgenome1.fa\t[1 seqs]\n10000\t2900000\tgenome2.fa\t[1 seqs]\n";
        let size = parse_info_sketch_size(out.as_bytes(), Path::new("db.13.msh")).unwrap();
        assert_eq!(size, 10000);
        assert!(parse_info_sketch_size("#only header\n".as_bytes(), Path::new("x")).is_err());
    }

    #[test]
    fn test_missing_executable() {
        let mash = MashExec::new("/nonexistent/path/to/mash");
        let res = mash.info_sketch_size(Path::new("db.13.msh"));
        assert!(matches!(res, Err(StrainError::Tool { .. })));
    }
}
