//! Summarize what a scraping run has saved so far

// argument parsing
#[macro_use] extern crate clap;
extern crate env_logger;
// lastly, this library
extern crate parlance;

use parlance::errors::*;
use parlance::scrape::ScrapeConfig;
use parlance::scrape::checkpoint::FileCheckpoint;

pub fn main() {
    // Main can't return a Result, and the ? operator needs the enclosing function to return Result
    inner_main().expect("Could not recover. Exiting.");
}
pub fn inner_main() -> Result<()> {
    env_logger::init();
    let args = app_from_crate!()
        .arg_from_usage("[checkpoint] 'directory holding checkpoint.bin and valence_information.json (default ../exports/web_scraping/)'")
        .get_matches();

    let mut config = ScrapeConfig::default();
    if let Some(dir) = args.value_of("checkpoint") {
        config.output_dir = dir.into();
    }
    let checkpoint = FileCheckpoint::open(&config.output_dir)?;
    let snapshot = checkpoint.load_snapshot()?;
    println!("Scrapers (in run order):");
    for &(ref name, ref state) in &snapshot.scrapers {
        println!("  {} ({} bytes of state)", name, state.len());
    }

    let records = checkpoint.load_records()?;
    println!("{} records", records.len());
    if !records.is_empty() {
        let (min, max, sum) = records.iter().fold(
            (::std::f64::INFINITY, ::std::f64::NEG_INFINITY, 0.0),
            |(min, max, sum), r| (min.min(r.valence), max.max(r.valence), sum + r.valence));
        println!("valence min {:.3}, mean {:.3}, max {:.3}", min, sum / records.len() as f64, max);
    }
    Ok(())
}
