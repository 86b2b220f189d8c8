//! Write a corpus directory as a sparse Matrix Market file
//!
//! Every document (or a uniform sample of them) is counted against a dictionary in gensim's
//! text layout. Without a dictionary, one is built from the documents first and saved beside
//! the output. Rows follow the order the documents are read in.

// argument parsing
#[macro_use] extern crate clap;
// logging
#[macro_use] extern crate log;
extern crate env_logger;
extern crate rand;
// lastly, this library
extern crate parlance;

use rand::SeedableRng;
use rand::rngs::StdRng;

use parlance::corpus::Corpus;
use parlance::errors::*;
use parlance::mm::serialize_corpus;
use parlance::vocab::Vocabulary;

pub fn main() {
    // Main can't return a Result, and the ? operator needs the enclosing function to return Result
    inner_main().expect("Could not recover. Exiting.");
}
pub fn inner_main() -> Result<()> {
    env_logger::init();
    let args = app_from_crate!()
        .arg_from_usage("<corpus> 'directory of documents, one file each'")
        .arg_from_usage("<output> 'Matrix Market file to write'")
        .arg_from_usage("-d, --dictionary=[FILE] 'dictionary in gensim text format'")
        .arg_from_usage("-n, --sample=[N] 'use only N documents, chosen at random'")
        .arg_from_usage("-s, --seed=[SEED] 'seed for the sample, for repeatable runs'")
        .get_matches();

    let corpus_dir = args.value_of("corpus").unwrap();
    let output = args.value_of("output").unwrap();
    let sample = match args.value_of("sample") {
        Some(n) => Some(n.parse::<usize>()?),
        None => None,
    };

    let vocab = match args.value_of("dictionary") {
        Some(path) => Vocabulary::from_text_file(path)?,
        None => {
            info!("No dictionary given, building one from {}", corpus_dir);
            let vocab = Vocabulary::from_documents(Corpus::open(corpus_dir)?.iter());
            let dictionary_path = format!("{}.dict.txt", output);
            vocab.save_as_text(&dictionary_path)?;
            info!("Saved the dictionary to {}", dictionary_path);
            vocab
        }
    };
    info!("Dictionary has {} tokens", vocab.len());

    let corpus = match args.value_of("seed") {
        Some(seed) => Corpus::open_sample_with(corpus_dir, sample, &mut StdRng::seed_from_u64(seed.parse()?))?,
        None => Corpus::open_sample(corpus_dir, sample)?,
    };
    let num_terms = vocab.num_terms();
    let shape = serialize_corpus(output, corpus.bag_of_words(vocab).iter(), num_terms)?;

    println!("{} documents x {} terms, {} entries", shape.num_docs, shape.num_terms, shape.num_nnz);
    Ok(())
}
