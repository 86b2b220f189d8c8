//! Drive site scrapers to completion, checkpointing as records accumulate
//!
//! Scrapers run one after another, never interleaved, all through the same request driver.
//! Every `checkpoint_every` records the scrapers' cursors and all records so far are saved,
//! and once more when the last scraper is exhausted. The request driver is shut down exactly
//! once when the run ends, however it ends.
pub mod checkpoint;
pub mod record;
pub mod request;

use std::path::PathBuf;
use crate::errors::*;
use self::checkpoint::CheckpointSink;
use self::record::{ScrapedInfo, ScrapedRecord, ValenceRange};
use self::request::RequestDriver;

/// A site specific scraper with a resumable cursor
pub trait Scraper {
    /// Identifies the scraper's state in a checkpoint
    fn name(&self) -> &str;

    /// The next item, or `None` once the site is exhausted
    fn next_item(&mut self, driver: &mut dyn RequestDriver) -> Result<Option<ScrapedInfo>>;

    /// The cursor, in whatever encoding the scraper likes
    fn snapshot(&self) -> Result<Vec<u8>>;

    fn restore(&mut self, state: &[u8]) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeConfig {
    pub output_dir: PathBuf,
    pub checkpoint_every: usize,
    pub valence: ValenceRange,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        ScrapeConfig {
            output_dir: PathBuf::from("../exports/web_scraping/"),
            checkpoint_every: 5000,
            valence: ValenceRange::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub records: Vec<ScrapedRecord>,
    /// Including the final one
    pub checkpoints: usize,
}

/// Calls `quit` on the request driver when dropped
struct QuitOnDrop<'a, D: RequestDriver + ?Sized + 'a>(&'a mut D);

impl<'a, D: RequestDriver + ?Sized> Drop for QuitOnDrop<'a, D> {
    fn drop(&mut self) {
        self.0.quit();
    }
}

pub struct ScrapeDriver {
    config: ScrapeConfig,
}

impl ScrapeDriver {
    pub fn new(config: ScrapeConfig) -> Result<Self> {
        if config.checkpoint_every == 0 {
            return Err(Error::InvalidRange("checkpoints need an interval of at least 1".to_string()));
        }
        Ok(ScrapeDriver { config: config })
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    /// Run every scraper from the start
    pub fn run<D, C>(&self, scrapers: &mut [Box<dyn Scraper>], driver: &mut D, sink: &mut C)
        -> Result<RunSummary>
        where D: RequestDriver, C: CheckpointSink + ?Sized {
        self.resume(scrapers, driver, sink, vec![])
    }

    /// Run the scrapers, adding to records kept from an earlier run
    ///
    /// The scrapers are expected to have been restored to the same checkpoint as `records`.
    pub fn resume<D, C>(&self, scrapers: &mut [Box<dyn Scraper>], driver: &mut D, sink: &mut C,
                        mut records: Vec<ScrapedRecord>) -> Result<RunSummary>
        where D: RequestDriver, C: CheckpointSink + ?Sized {
        let mut guard = QuitOnDrop(driver);
        let mut checkpoints = 0;
        for scraper_i in 0..scrapers.len() {
            info!("Scraping {} ({} of {}), {} records so far",
                scrapers[scraper_i].name(), scraper_i + 1, scrapers.len(), records.len());
            while let Some(info) = scrapers[scraper_i].next_item(&mut *guard.0)? {
                records.push(ScrapedRecord::new(info, &self.config.valence)?);
                if records.len() % self.config.checkpoint_every == 0 {
                    sink.save(scrapers, &records)?;
                    checkpoints += 1;
                }
            }
            info!("Finished {}", scrapers[scraper_i].name());
        }
        sink.save(scrapers, &records)?;
        checkpoints += 1;
        drop(guard);
        info!("Scraped {} records with {} checkpoints", records.len(), checkpoints);
        Ok(RunSummary { records: records, checkpoints: checkpoints })
    }
}
