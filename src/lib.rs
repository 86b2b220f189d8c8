//! Plumbing for a speech and language analysis pipeline
//!
//! Turns directories of pre-processed documents into sparse corpora for topic models, runs
//! checkpointed scrapes of rated text, measures speech rate, and files each run's tables and
//! charts under a timestamped directory. The binaries in `src/bin` cover the common cases.


#[macro_use] extern crate log;
extern crate ndarray;
extern crate farmhash;
pub mod errors;
pub mod farm;
pub mod document;
pub mod vocab;
pub mod corpus;
pub mod mm;
pub mod export;
pub mod speech;
pub mod scrape;
