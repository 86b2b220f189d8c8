//! Stream a directory of documents without loading it into memory
//!
//! The directory listing (and the sample, if one was asked for) is fixed when the corpus is
//! opened. Every pass over the corpus reads the files again, one at a time, in that same order.
use rand::Rng;
use rand::seq::index;
use std::fs;
use std::path::{Path, PathBuf};
use std::slice;
use crate::document::read_document;
use crate::errors::*;
use crate::vocab::{BagOfWords, Vocabulary};

/// What each document becomes as the corpus is streamed
pub trait Projection {
    type Item;
    fn project(&self, tokens: Vec<String>) -> Self::Item;
}

/// The documents as they are stored
#[derive(Debug, Clone, Copy, Default)]
pub struct Tokens;

impl Projection for Tokens {
    type Item = Vec<String>;
    fn project(&self, tokens: Vec<String>) -> Vec<String> {
        tokens
    }
}

/// The documents counted against a fixed vocabulary
#[derive(Debug, Clone)]
pub struct BagOfWordsOf(pub Vocabulary);

impl Projection for BagOfWordsOf {
    type Item = BagOfWords;
    fn project(&self, tokens: Vec<String>) -> BagOfWords {
        self.0.doc2bow(&tokens)
    }
}

#[derive(Debug, Clone)]
pub struct Corpus<P = Tokens> {
    root: PathBuf,
    filenames: Vec<PathBuf>,
    projection: P,
}

impl Corpus<Tokens> {
    /// Every document in the directory
    pub fn open<Q: AsRef<Path>>(root: Q) -> Result<Self> {
        let filenames = list_documents(root.as_ref())?;
        info!("Found {} documents in {}", filenames.len(), root.as_ref().display());
        Ok(Corpus { root: root.as_ref().to_path_buf(), filenames: filenames, projection: Tokens })
    }

    /// At most `limit` documents, sampled uniformly without replacement
    pub fn open_sample<Q: AsRef<Path>>(root: Q, limit: Option<usize>) -> Result<Self> {
        Self::open_sample_with(root, limit, &mut rand::thread_rng())
    }

    /// Like `open_sample` but with a caller provided random source
    pub fn open_sample_with<Q: AsRef<Path>, R: Rng + ?Sized>(root: Q, limit: Option<usize>, rng: &mut R)
        -> Result<Self> {
        let mut corpus = Self::open(root)?;
        if let Some(limit) = limit {
            let available = corpus.filenames.len();
            if limit > available {
                return Err(Error::SampleTooLarge { requested: limit, available: available });
            }
            let mut picked: Vec<Option<PathBuf>> = corpus.filenames.drain(..).map(Some).collect();
            corpus.filenames = index::sample(rng, available, limit)
                .into_iter()
                .filter_map(|i| picked[i].take())
                .collect();
            info!("Sampled {} of {} documents", corpus.filenames.len(), available);
        }
        Ok(corpus)
    }

    /// Count each document against `vocab` instead of returning its tokens
    pub fn bag_of_words(self, vocab: Vocabulary) -> Corpus<BagOfWordsOf> {
        self.with_projection(BagOfWordsOf(vocab))
    }
}

impl<P: Projection> Corpus<P> {
    pub fn with_projection<Q: Projection>(self, projection: Q) -> Corpus<Q> {
        Corpus { root: self.root, filenames: self.filenames, projection: projection }
    }

    pub fn projection(&self) -> &P {
        &self.projection
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Document files, in the order they are produced
    pub fn filenames(&self) -> &[PathBuf] {
        &self.filenames
    }

    pub fn len(&self) -> usize {
        self.filenames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filenames.is_empty()
    }

    /// Start a new pass over the documents
    pub fn iter(&self) -> Documents<P> {
        Documents { root: &self.root, names: self.filenames.iter(), projection: &self.projection }
    }
}

impl<'a, P: Projection> IntoIterator for &'a Corpus<P> {
    type Item = P::Item;
    type IntoIter = Documents<'a, P>;
    fn into_iter(self) -> Documents<'a, P> {
        self.iter()
    }
}

/// One pass over a corpus. Holds at most one document at a time.
pub struct Documents<'a, P: 'a> {
    root: &'a Path,
    names: slice::Iter<'a, PathBuf>,
    projection: &'a P,
}

impl<'a, P: Projection> Iterator for Documents<'a, P> {
    type Item = P::Item;

    fn next(&mut self) -> Option<P::Item> {
        for name in &mut self.names {
            let path = self.root.join(name);
            if !path.is_file() {
                debug!("Skipping {}, it is not a file", path.display());
                continue;
            }
            match read_document(&path) {
                Ok(tokens) => return Some(self.projection.project(tokens)),
                Err(err) => debug!("Skipping {}: {}", path.display(), err),
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.names.len()))
    }
}

/// Sorted names of the regular files directly inside `root`
fn list_documents(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        let err = fs::metadata(root).err();
        return Err(Error::MissingFile("corpus directory", err));
    }
    let mut names = vec![];
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.path().is_file() {
            names.push(PathBuf::from(entry.file_name()));
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::write_document;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn doc(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn corpus_dir(n: usize) -> TempDir {
        let dir = TempDir::new().unwrap();
        for i in 0..n {
            let tokens = doc(&["doc", &format!("n{}", i)]);
            write_document(dir.path().join(format!("{:03}.doc", i)), &tokens).unwrap();
        }
        dir
    }

    #[test]
    fn yields_every_document() {
        let dir = corpus_dir(4);
        let corpus = Corpus::open(dir.path()).unwrap();
        let docs: Vec<Vec<String>> = corpus.iter().collect();
        assert_eq!(docs.len(), 4);
        for (i, tokens) in docs.iter().enumerate() {
            assert_eq!(*tokens, doc(&["doc", &format!("n{}", i)]));
        }
    }

    #[test]
    fn skips_directories_and_foreign_files() {
        let dir = corpus_dir(2);
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a document").unwrap();
        let corpus = Corpus::open(dir.path()).unwrap();
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus.iter().count(), 2);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        match Corpus::open(dir.path().join("documents_clean")) {
            Err(Error::MissingFile(what, _)) => assert_eq!(what, "corpus directory"),
            other => panic!("expected a missing directory, got {:?}", other),
        }
    }

    #[test]
    fn sample_is_fixed_across_passes() {
        let dir = corpus_dir(10);
        let mut rng = StdRng::seed_from_u64(7);
        let corpus = Corpus::open_sample_with(dir.path(), Some(4), &mut rng).unwrap();
        let first: Vec<Vec<String>> = corpus.iter().collect();
        let second: Vec<Vec<String>> = corpus.iter().collect();
        assert_eq!(first.len(), 4);
        assert_eq!(first, second);
        let distinct: HashSet<&Vec<String>> = first.iter().collect();
        assert_eq!(distinct.len(), 4);
    }

    #[test]
    fn sample_larger_than_corpus() {
        let dir = corpus_dir(2);
        match Corpus::open_sample(dir.path(), Some(3)) {
            Err(Error::SampleTooLarge { requested: 3, available: 2 }) => {}
            other => panic!("expected a sample error, got {:?}", other),
        }
    }

    #[test]
    fn projects_to_bag_of_words() {
        let dir = TempDir::new().unwrap();
        write_document(dir.path().join("only"), &doc(&["a", "a", "b"])).unwrap();
        let vocab = Vocabulary::from_documents(vec![doc(&["a", "b"])]);
        let corpus = Corpus::open(dir.path()).unwrap().bag_of_words(vocab);
        let bows: Vec<BagOfWords> = corpus.iter().collect();
        let pairs: HashSet<(u32, u32)> = bows[0].iter().cloned().collect();
        let expected: HashSet<(u32, u32)> = vec![(0, 2), (1, 1)].into_iter().collect();
        assert_eq!(pairs, expected);
    }
}
