//! Checkpoints: the scrapers' cursors and everything scraped so far
//!
//! Both files are replaced whole at every checkpoint. Both are written to temporary files in
//! the same directory first and then renamed over the old ones, records before state. The
//! state remembers how many records it was saved with, and a pair that disagrees is rejected
//! when it is loaded.
use serde::{Deserialize, Serialize};
use serde_json::ser::{PrettyFormatter, Serializer};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use crate::errors::*;
use super::{ScrapeConfig, Scraper};
use super::record::ScrapedRecord;

pub const SNAPSHOT_VERSION: u32 = 1;
pub const RECORDS_FILENAME: &str = "valence_information.json";
pub const STATE_FILENAME: &str = "checkpoint.bin";

/// Receives every checkpoint of a run
pub trait CheckpointSink {
    fn save(&mut self, scrapers: &[Box<dyn Scraper>], records: &[ScrapedRecord]) -> Result<()>;
}

/// Saved cursors of the scrapers, in run order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScraperSnapshot {
    pub version: u32,
    /// Records saved alongside these cursors
    pub records: usize,
    pub scrapers: Vec<(String, Vec<u8>)>,
}

impl ScraperSnapshot {
    pub fn capture(scrapers: &[Box<dyn Scraper>], records: usize) -> Result<Self> {
        let mut states = Vec::with_capacity(scrapers.len());
        for scraper in scrapers {
            states.push((scraper.name().to_string(), scraper.snapshot()?));
        }
        Ok(ScraperSnapshot { version: SNAPSHOT_VERSION, records: records, scrapers: states })
    }
}

/// Checkpoints kept as two files in one directory
#[derive(Debug, Clone)]
pub struct FileCheckpoint {
    dir: PathBuf,
    writes: usize,
}

impl FileCheckpoint {
    /// Makes the directory if it doesn't exist yet
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(FileCheckpoint { dir: dir.as_ref().to_path_buf(), writes: 0 })
    }

    /// Checkpoints in the configured output directory
    pub fn from_config(config: &ScrapeConfig) -> Result<Self> {
        Self::new(&config.output_dir)
    }

    /// A directory an earlier run already checkpointed to
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        if !dir.as_ref().is_dir() {
            return Err(Error::MissingFile("checkpoint directory", fs::metadata(dir.as_ref()).err()));
        }
        Ok(FileCheckpoint { dir: dir.as_ref().to_path_buf(), writes: 0 })
    }

    pub fn records_path(&self) -> PathBuf {
        self.dir.join(RECORDS_FILENAME)
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILENAME)
    }

    /// Checkpoints written by this sink
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Whether an earlier run left a checkpoint here
    pub fn exists(&self) -> bool {
        self.records_path().is_file() && self.state_path().is_file()
    }

    /// Fully written temporary file, ready to be renamed into place
    fn stage<F>(&self, write: F) -> Result<NamedTempFile>
        where F: FnOnce(&mut BufWriter<&mut File>) -> Result<()> {
        let mut temp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            write(&mut writer)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        Ok(temp)
    }

    pub fn load_snapshot(&self) -> Result<ScraperSnapshot> {
        let file = File::open(self.state_path())
            .map_err(|e| Error::MissingFile("scraper checkpoint", Some(e)))?;
        let snapshot: ScraperSnapshot = bincode::deserialize_from(BufReader::new(file))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::InvalidFormat(format!(
                "scraper checkpoint version {} is not supported (only {})",
                snapshot.version, SNAPSHOT_VERSION)));
        }
        Ok(snapshot)
    }

    /// Put back the cursor of every scraper that has one in the checkpoint
    ///
    /// Scrapers are matched by name. Returns how many were restored.
    pub fn restore(&self, scrapers: &mut [Box<dyn Scraper>]) -> Result<usize> {
        let snapshot = self.load_snapshot()?;
        self.check_pair(&snapshot, self.read_records()?.len())?;
        let mut restored = 0;
        for scraper in scrapers.iter_mut() {
            let saved = snapshot.scrapers.iter().find(|&&(ref name, _)| name == scraper.name());
            match saved {
                Some(&(_, ref state)) => {
                    scraper.restore(state)?;
                    restored += 1;
                }
                None => warn!("No saved state for scraper {}, starting it fresh", scraper.name()),
            }
        }
        Ok(restored)
    }

    /// Records saved by the last checkpoint
    ///
    /// Fails if they don't belong with the saved scraper state.
    pub fn load_records(&self) -> Result<Vec<ScrapedRecord>> {
        let records = self.read_records()?;
        self.check_pair(&self.load_snapshot()?, records.len())?;
        Ok(records)
    }

    fn read_records(&self) -> Result<Vec<ScrapedRecord>> {
        let file = File::open(self.records_path())
            .map_err(|e| Error::MissingFile("scraped records", Some(e)))?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    fn check_pair(&self, snapshot: &ScraperSnapshot, records: usize) -> Result<()> {
        if snapshot.records != records {
            return Err(Error::InvalidFormat(format!(
                "checkpoint in {} is inconsistent: scraper state was saved with {} records but {} are saved",
                self.dir.display(), snapshot.records, records)));
        }
        Ok(())
    }
}

impl CheckpointSink for FileCheckpoint {
    fn save(&mut self, scrapers: &[Box<dyn Scraper>], records: &[ScrapedRecord]) -> Result<()> {
        let snapshot = ScraperSnapshot::capture(scrapers, records.len())?;
        let state = self.stage(|writer| {
            bincode::serialize_into(writer, &snapshot)?;
            Ok(())
        })?;
        let json = self.stage(|writer| {
            let mut serializer = Serializer::with_formatter(writer, PrettyFormatter::with_indent(b"    "));
            records.serialize(&mut serializer)?;
            Ok(())
        })?;
        // Records first: new records with old cursors are caught by the record count
        json.persist(self.records_path())?;
        state.persist(self.state_path())?;
        self.writes += 1;
        info!("Checkpoint {}: {} records saved to {}", self.writes, records.len(), self.dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_needs_an_existing_directory() {
        let dir = TempDir::new().unwrap();
        match FileCheckpoint::open(dir.path().join("nope")) {
            Err(Error::MissingFile(what, _)) => assert_eq!(what, "checkpoint directory"),
            other => panic!("expected a missing directory, got {:?}", other),
        }
        assert!(!FileCheckpoint::open(dir.path()).unwrap().exists());
    }

    #[test]
    fn empty_run_still_writes_both_files() {
        let dir = TempDir::new().unwrap();
        let mut sink = FileCheckpoint::new(dir.path()).unwrap();
        sink.save(&[], &[]).unwrap();
        assert!(sink.exists());
        assert_eq!(fs::read_to_string(sink.records_path()).unwrap(), "[]");
        assert_eq!(sink.load_snapshot().unwrap().scrapers.len(), 0);
    }

    #[test]
    fn rejects_other_snapshot_versions() {
        let dir = TempDir::new().unwrap();
        let sink = FileCheckpoint::new(dir.path()).unwrap();
        let future = ScraperSnapshot { version: SNAPSHOT_VERSION + 1, records: 0, scrapers: vec![] };
        fs::write(sink.state_path(), bincode::serialize(&future).unwrap()).unwrap();
        match sink.load_snapshot() {
            Err(Error::InvalidFormat(msg)) => assert!(msg.contains("version")),
            other => panic!("expected a version error, got {:?}", other),
        }
    }

    #[test]
    fn records_must_match_the_state() {
        let dir = TempDir::new().unwrap();
        let mut sink = FileCheckpoint::new(dir.path()).unwrap();
        sink.save(&[], &[]).unwrap();
        fs::write(sink.records_path(), r#"[{"metadata":{},"text":"extra","valence":0.0}]"#).unwrap();
        match sink.load_records() {
            Err(Error::InvalidFormat(msg)) => assert!(msg.contains("inconsistent")),
            other => panic!("expected an inconsistent checkpoint, got {:?}", other),
        }
        assert!(sink.restore(&mut []).is_err());
    }

    #[test]
    fn from_config_uses_output_dir() {
        let dir = TempDir::new().unwrap();
        let config = ScrapeConfig { output_dir: dir.path().join("web_scraping"), ..ScrapeConfig::default() };
        let sink = FileCheckpoint::from_config(&config).unwrap();
        assert!(config.output_dir.is_dir());
        assert_eq!(sink.records_path(), config.output_dir.join(RECORDS_FILENAME));
        assert_eq!(sink.state_path(), config.output_dir.join(STATE_FILENAME));
    }
}
