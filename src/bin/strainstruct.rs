//! strainstruct : core and accessory distances between bacterial assemblies, and assignment of new assemblies to strain clusters.
//!
//! - strainstruct sketch --rfile LIST --db DIR --kmers 13,17,21,25,29 --sketch-size 10000 \[--threads T\] \[--mash EXE\]
//!
//!   sketches the assemblies listed (one path by line) in LIST at each kmer length, in database directory DIR.
//!   Sketch files already present in DIR are kept.
//!
//! - strainstruct dist --db DIR \[--qfile LIST\] --output PREFIX \[--threads T\] \[--mash EXE\] \[--dump\]
//!
//!   without --qfile all assemblies of the database are compared to each other,
//!   otherwise assemblies in LIST are compared to the database. Distances go in PREFIX.tsv,
//!   with --dump the distance matrix is also dumped in PREFIX.json.
//!
//! - strainstruct assign --db DIR --links FILE --output PREFIX
//!
//!   assigns queries to clusters of DIR/DIR_clusters.csv. FILE has one `query<TAB>linked_id` by line.
//!   Decisions go in PREFIX_clusters.csv.
//!
//! - strainstruct print --distances FILE.json --output PREFIX
//!
//!   writes the distance table PREFIX.tsv of a dumped matrix.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use env_logger::Builder;

use strainstruct::cluster::{assign_queries_to_clusters, read_links_file, ExistingClusters};
use strainstruct::dist::output::print_query_output;
use strainstruct::dist::query_database;
use strainstruct::mash::{
    check_database, clusters_file_name, construct_database, references_file_name, MashExec,
    MashQuery,
};
use strainstruct::utils::dumpload::{dump_distances, reload_distances};
use strainstruct::utils::*;

// install a logger facility
pub fn init_log() -> u64 {
    Builder::from_default_env().init();
    println!("\n ************** initializing logger *****************\n");
    1
}

fn get_computing_params(matches: &ArgMatches) -> anyhow::Result<ComputingParams> {
    let threads = *matches.get_one::<usize>("threads").unwrap_or(&1);
    let nb_cpus = num_cpus::get();
    if threads > nb_cpus {
        log::warn!("asked for {} threads, only {} cpus available", threads, nb_cpus);
    }
    let mash_exec = matches
        .get_one::<String>("mash")
        .cloned()
        .unwrap_or_else(|| String::from("mash"));
    Ok(ComputingParams::new(threads, mash_exec)?)
}

fn parse_klist(kmers: &str) -> anyhow::Result<Vec<usize>> {
    kmers
        .split(',')
        .map(|k| {
            k.trim()
                .parse::<usize>()
                .with_context(|| format!("bad kmer length {:?}", k))
        })
        .collect()
}

#[doc(hidden)]
fn do_sketch(matches: &ArgMatches) -> anyhow::Result<()> {
    log::debug!("in do_sketch");
    let rfile = matches.get_one::<String>("rfile").unwrap();
    let dbdir = matches.get_one::<String>("db").unwrap();
    let klist = parse_klist(matches.get_one::<String>("kmers").unwrap())?;
    let sketch_size = *matches.get_one::<usize>("sketch_size").unwrap();
    let computing = get_computing_params(matches)?;
    //
    let kmer_params = KmerParams::new(klist.clone(), vec![sketch_size; klist.len()])?;
    let rpath = Path::new(rfile);
    // check names before running the sketches
    let references = AssemblyList::from_file(rpath, 1)?;
    log::info!("sketching {} assemblies, kmers : {:?}", references.len(), klist);
    construct_database(rpath, &kmer_params, Path::new(dbdir), &computing)
        .with_context(|| format!("database construction in {}", dbdir))?;
    Ok(())
} // end of do_sketch

#[doc(hidden)]
fn do_dist(matches: &ArgMatches) -> anyhow::Result<()> {
    log::debug!("in do_dist");
    let dbdir = PathBuf::from(matches.get_one::<String>("db").unwrap());
    let output = matches.get_one::<String>("output").unwrap();
    let qfile = matches.get_one::<String>("qfile").map(PathBuf::from);
    let computing = get_computing_params(matches)?;
    //
    let kmer_params = KmerParams::reload_json(&dbdir)
        .with_context(|| format!("reloading parameters of database {:?}", dbdir))?;
    let mash = MashExec::new(computing.get_mash_exec());
    check_database(&dbdir, &kmer_params, &mash)?;
    let references = AssemblyList::from_file(&references_file_name(&dbdir)?, computing.get_threads())?;
    //
    let tool = MashQuery::new(mash, &dbdir, qfile.as_deref());
    let matrix = match &qfile {
        None => {
            log::info!("self mode, comparing {} database assemblies", references.len());
            query_database(&tool, &references, None, kmer_params.get_klist(), true, &computing)?
        }
        Some(qpath) => {
            let queries = AssemblyList::from_file(qpath, computing.get_threads())?;
            log::info!(
                "comparing {} queries to {} database assemblies",
                queries.len(),
                references.len()
            );
            query_database(
                &tool,
                &queries,
                Some(&references),
                kmer_params.get_klist(),
                false,
                &computing,
            )?
        }
    };
    //
    let tsv = PathBuf::from(format!("{}.tsv", output));
    print_query_output(&matrix, &tsv)?;
    if matches.get_flag("dump") {
        dump_distances(&matrix, &PathBuf::from(format!("{}.json", output)))?;
    }
    Ok(())
} // end of do_dist

#[doc(hidden)]
fn do_assign(matches: &ArgMatches) -> anyhow::Result<()> {
    log::debug!("in do_assign");
    let dbdir = PathBuf::from(matches.get_one::<String>("db").unwrap());
    let links_file = PathBuf::from(matches.get_one::<String>("links").unwrap());
    let output = matches.get_one::<String>("output").unwrap();
    //
    let clusters_file = clusters_file_name(&dbdir)?;
    let existing = if clusters_file.is_file() {
        ExistingClusters::from_csv(&clusters_file)?
    } else {
        log::warn!("no cluster table {:?}, all clusters will be new", clusters_file);
        ExistingClusters::new()
    };
    let (links, graph) = read_links_file(&links_file, &existing)
        .with_context(|| format!("reading links file {:?}", links_file))?;
    let assignment = assign_queries_to_clusters(&links, &graph, &existing);
    if log::log_enabled!(log::Level::Debug) {
        for (query, id) in assignment.additional_clusters() {
            log::debug!("query {} founds cluster {}", query, id);
        }
    }
    assignment.dump_csv(&PathBuf::from(format!("{}_clusters.csv", output)))?;
    Ok(())
} // end of do_assign

#[doc(hidden)]
fn do_print(matches: &ArgMatches) -> anyhow::Result<()> {
    let distances = PathBuf::from(matches.get_one::<String>("distances").unwrap());
    let output = matches.get_one::<String>("output").unwrap();
    let matrix = reload_distances(&distances)
        .with_context(|| format!("reloading distances from {:?}", distances))?;
    print_query_output(&matrix, &PathBuf::from(format!("{}.tsv", output)))?;
    Ok(())
}

fn threads_arg() -> Arg {
    Arg::new("threads")
        .short('t')
        .long("threads")
        .value_name("THREADS")
        .help("number of threads")
        .default_value("1")
        .value_parser(value_parser!(usize))
        .action(ArgAction::Set)
}

fn mash_arg() -> Arg {
    Arg::new("mash")
        .long("mash")
        .value_name("EXE")
        .help("mash executable")
        .default_value("mash")
        .value_parser(value_parser!(String))
        .action(ArgAction::Set)
}

fn db_arg() -> Arg {
    Arg::new("db")
        .short('d')
        .long("db")
        .value_name("DIR")
        .help("database directory")
        .required(true)
        .value_parser(value_parser!(String))
        .action(ArgAction::Set)
}

fn output_arg() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_name("PREFIX")
        .help("prefix of output files")
        .required(true)
        .value_parser(value_parser!(String))
        .action(ArgAction::Set)
}

//============================================================================================

fn main() -> anyhow::Result<()> {
    let _ = init_log();
    let start_t = chrono::Local::now();
    log::info!("strainstruct started at {}", start_t);
    //
    let sketch_cmd = Command::new("sketch")
        .about("sketch reference assemblies in a database, one mash sketch by kmer length")
        .arg(
            Arg::new("rfile")
                .short('r')
                .long("rfile")
                .value_name("LIST")
                .help("file with one assembly by line")
                .required(true)
                .value_parser(value_parser!(String))
                .action(ArgAction::Set),
        )
        .arg(db_arg())
        .arg(
            Arg::new("kmers")
                .short('k')
                .long("kmers")
                .value_name("K1,K2,...")
                .help("ascending odd kmer lengths")
                .default_value("13,17,21,25,29")
                .value_parser(value_parser!(String))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("sketch_size")
                .short('s')
                .long("sketch-size")
                .value_name("SIZE")
                .help("sketch size, the same for all kmer lengths")
                .default_value("10000")
                .value_parser(value_parser!(usize))
                .action(ArgAction::Set),
        )
        .arg(threads_arg())
        .arg(mash_arg());

    let dist_cmd = Command::new("dist")
        .about("core and accessory distances, between database assemblies or from queries to database")
        .arg(db_arg())
        .arg(
            Arg::new("qfile")
                .short('q')
                .long("qfile")
                .value_name("LIST")
                .help("file with one query assembly by line, compares the database to itself if absent")
                .required(false)
                .value_parser(value_parser!(String))
                .action(ArgAction::Set),
        )
        .arg(output_arg())
        .arg(threads_arg())
        .arg(mash_arg())
        .arg(
            Arg::new("dump")
                .long("dump")
                .help("dump distance matrix in json")
                .action(ArgAction::SetTrue),
        );

    let assign_cmd = Command::new("assign")
        .about("assign queries to clusters of the database")
        .arg(db_arg())
        .arg(
            Arg::new("links")
                .short('l')
                .long("links")
                .value_name("FILE")
                .help("tab separated file, a query and an id it is linked to by line")
                .required(true)
                .value_parser(value_parser!(String))
                .action(ArgAction::Set),
        )
        .arg(output_arg());

    let print_cmd = Command::new("print")
        .about("write the distance table of a dumped distance matrix")
        .arg(
            Arg::new("distances")
                .long("distances")
                .value_name("FILE.json")
                .help("json dump of distances")
                .required(true)
                .value_parser(value_parser!(String))
                .action(ArgAction::Set),
        )
        .arg(output_arg());
    //
    // the global command
    //
    let matches = Command::new("strainstruct")
        .version("0.1.0")
        .about("core and accessory distances between assemblies, assignment to strain clusters")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(sketch_cmd)
        .subcommand(dist_cmd)
        .subcommand(assign_cmd)
        .subcommand(print_cmd)
        .get_matches();
    //
    match matches.subcommand() {
        Some(("sketch", sub)) => do_sketch(sub)?,
        Some(("dist", sub)) => do_dist(sub)?,
        Some(("assign", sub)) => do_assign(sub)?,
        Some(("print", sub)) => do_print(sub)?,
        _ => unreachable!("subcommand is required"),
    }
    //
    let end_t = chrono::Local::now();
    log::info!(
        "strainstruct exiting, elapsed time(s) {}",
        (end_t - start_t).num_milliseconds() as f64 / 1000.
    );
    Ok(())
}
