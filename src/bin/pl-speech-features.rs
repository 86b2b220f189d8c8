//! Words, syllables and speaking rate for a list of recordings
//!
//! The list has one recording per line: `subject<TAB>transcription file<TAB>wav file`.
//! Results go to `speech_features.csv` under a new timestamped run directory.

// argument parsing
#[macro_use] extern crate clap;
// logging
#[macro_use] extern crate log;
extern crate env_logger;
// lastly, this library
extern crate parlance;

use std::fs::File;
use std::io::{BufRead, BufReader};

use parlance::errors::*;
use parlance::export::{ExportConfig, Exporter, Table};
use parlance::speech::{wav_duration, SpeechFeatures, Transcription, VowelGroups};

pub fn main() {
    // Main can't return a Result, and the ? operator needs the enclosing function to return Result
    inner_main().expect("Could not recover. Exiting.");
}
pub fn inner_main() -> Result<()> {
    env_logger::init();
    let args = app_from_crate!()
        .arg_from_usage("<recordings> 'tab separated lines of subject, transcription and wav path'")
        .arg_from_usage("-o, --export-root=[DIR] 'where run directories are made (default ../results/)'")
        .get_matches();

    let mut config = ExportConfig::default();
    if let Some(root) = args.value_of("export-root") {
        config = ExportConfig::now(root);
    }
    let exporter = Exporter::new(config).with_directories(vec!["speech"]);

    let headers = ["Subject", "Number Words", "Number Syllables", "Audio Duration (s)",
        "Speaking Rate (words / s)", "Articulation Rate (syllables / s)"];
    let mut table = Table::new(headers.iter().map(|h| h.to_string()).collect());

    let list = File::open(args.value_of("recordings").unwrap())
        .map_err(|e| Error::MissingFile("recordings list", Some(e)))?;
    info!("Processing 'speech' analysis ...");
    for (line_i, line) in BufReader::new(list).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 3 {
            return Err(Error::InvalidFormat(format!(
                "line {} should have 3 tab separated fields but has {}", line_i + 1, fields.len())));
        }
        let transcription = match Transcription::from_file(fields[1]) {
            Ok(trans) => trans,
            Err(err) => {
                // Recordings without a transcription are left out
                warn!("Skipping {}: {}", fields[0], err);
                continue;
            }
        };
        let duration = wav_duration(fields[2])?;
        let features = SpeechFeatures::compute(&transcription, duration, &VowelGroups);
        if features.duration == 0 {
            warn!("{} is shorter than a second, no rates for it", fields[2]);
        }
        let rate = |r: Option<f64>| r.map(|r| r.to_string()).unwrap_or_default();
        table.push(vec![
            fields[0].to_string(),
            features.words.to_string(),
            features.syllables.to_string(),
            features.duration.to_string(),
            rate(features.speaking_rate),
            rate(features.articulation_rate),
        ])?;
    }

    let path = exporter.export_csv(&table, "speech_features", false)?;
    info!("Finished processing 'speech' analysis!");
    println!("{} recordings written to {}", table.rows.len(), path.display());
    Ok(())
}
