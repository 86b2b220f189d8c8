//! Tokenize every text file in a directory into the document format
//!
//! Each `<name>.txt` (or any other regular file) in the input directory becomes `<name>.doc` in
//! the corpus directory: its lowercased unicode words, in order.

// argument parsing
#[macro_use] extern crate clap;
// logging
#[macro_use] extern crate log;
extern crate env_logger;
// lastly, this library
extern crate parlance;

use std::fs;
use std::path::Path;

use parlance::document::{tokenize, write_document};
use parlance::errors::*;

pub fn main() {
    // Main can't return a Result, and the ? operator needs the enclosing function to return Result
    inner_main().expect("Could not recover. Exiting.");
}
pub fn inner_main() -> Result<()> {
    env_logger::init();
    let args = app_from_crate!()
        .arg_from_usage("<input> 'directory of plain text files, one document each'")
        .arg_from_usage("<corpus> 'directory to write the documents to (created if needed)'")
        .get_matches();

    let input = Path::new(args.value_of("input").unwrap());
    let corpus = Path::new(args.value_of("corpus").unwrap());
    if !input.is_dir() {
        return Err(Error::MissingFile("input directory", fs::metadata(input).err()));
    }
    fs::create_dir_all(corpus)?;

    let mut written = 0;
    let mut tokens_total = 0;
    for entry in fs::read_dir(input)? {
        let path = entry?.path();
        if !path.is_file() { continue; }
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                warn!("Skipping {}: {}", path.display(), err);
                continue;
            }
        };
        let tokens = tokenize(&text);
        let stem = path.file_stem().unwrap_or_else(|| path.as_os_str());
        write_document(corpus.join(format!("{}.doc", stem.to_string_lossy())), &tokens)?;
        written += 1;
        tokens_total += tokens.len();
        if written % 10000 == 0 {
            info!("Wrote {} documents", written);
        }
    }

    println!("{} documents, {} tokens", written, tokens_total);
    Ok(())
}
