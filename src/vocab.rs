//! Vocabulary shared across a corpus: a stable integer id for every token
//!
//! The text layout is the one gensim's `Dictionary.save_as_text` uses, so dictionaries built
//! elsewhere can be read as is: a first line with the number of documents, then one
//! `id<TAB>token<TAB>document-frequency` line per token.
use nom::bytes::complete::{tag, take_till1};
use nom::character::complete::digit1;
use nom::combinator::{all_consuming, map_res};
use nom::sequence::tuple;
use nom::IResult;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use crate::errors::*;
use crate::farm::{new_farm, FarmMap};

/// Sparse bag-of-words: (token id, count) sorted by id
pub type BagOfWords = Vec<(u32, u32)>;

#[derive(Debug, Clone)]
pub struct Vocabulary {
    ids: FarmMap<String, u32>,
    tokens: BTreeMap<u32, (String, u32)>,
    num_docs: u64,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Vocabulary { ids: new_farm(), tokens: BTreeMap::new(), num_docs: 0 }
    }
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give every new token the next id, in the order they are first seen
    pub fn from_documents<I, D>(documents: I) -> Self
        where I: IntoIterator<Item=D>, D: AsRef<[String]> {
        let mut vocab = Vocabulary::new();
        for doc in documents {
            vocab.add_document(doc.as_ref());
        }
        vocab
    }

    /// Add the tokens of one document, counting document frequencies
    pub fn add_document(&mut self, tokens: &[String]) {
        self.num_docs += 1;
        let mut seen: FarmMap<&str, ()> = new_farm();
        for token in tokens {
            if seen.insert(token.as_str(), ()).is_some() {
                continue;
            }
            let next_id = self.num_terms() as u32;
            let id = *self.ids.entry(token.clone()).or_insert(next_id);
            self.tokens.entry(id).or_insert_with(|| (token.clone(), 0)).1 += 1;
        }
    }

    /// Read a dictionary in gensim's text layout
    pub fn from_text_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())
            .map_err(|e| Error::MissingFile("dictionary file", Some(e)))?;
        let mut lines = BufReader::new(file).lines();
        let mut vocab = Vocabulary::new();
        vocab.num_docs = match lines.next() {
            Some(line) => line?.trim().parse()?,
            None => return Err(Error::InvalidFormat(format!(
                "dictionary {} is empty", path.as_ref().display()))),
        };
        for (line_i, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let (_, (id, token, docfreq)) = dictionary_line(&line)
                .map_err(|_| Error::InvalidFormat(format!(
                    "line {} of dictionary {} should look like id<TAB>token<TAB>count but is {:?}",
                    line_i + 2, path.as_ref().display(), line)))?;
            vocab.insert(id, token, docfreq)?;
        }
        debug!("Read {} tokens from {}", vocab.len(), path.as_ref().display());
        Ok(vocab)
    }

    /// Write the dictionary in gensim's text layout, sorted by id
    pub fn save_as_text<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "{}", self.num_docs)?;
        for (id, &(ref token, docfreq)) in &self.tokens {
            writeln!(writer, "{}\t{}\t{}", id, token, docfreq)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn insert(&mut self, id: u32, token: &str, docfreq: u32) -> Result<()> {
        if self.ids.contains_key(token) || self.tokens.contains_key(&id) {
            return Err(Error::InvalidFormat(format!(
                "dictionary repeats the token {:?} or the id {}", token, id)));
        }
        self.ids.insert(token.to_string(), id);
        self.tokens.insert(id, (token.to_string(), docfreq));
        Ok(())
    }

    pub fn id(&self, token: &str) -> Option<u32> {
        self.ids.get(token).cloned()
    }

    pub fn token(&self, id: u32) -> Option<&str> {
        self.tokens.get(&id).map(|&(ref token, _)| token.as_str())
    }

    pub fn document_frequency(&self, id: u32) -> Option<u32> {
        self.tokens.get(&id).map(|&(_, docfreq)| docfreq)
    }

    pub fn num_docs(&self) -> u64 {
        self.num_docs
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of matrix columns needed for this vocabulary (largest id + 1)
    pub fn num_terms(&self) -> usize {
        self.tokens.keys().next_back().map(|&id| id as usize + 1).unwrap_or(0)
    }

    /// Count known tokens. Unknown tokens are ignored.
    pub fn doc2bow(&self, tokens: &[String]) -> BagOfWords {
        let mut counts: BTreeMap<u32, u32> = BTreeMap::new();
        for token in tokens {
            if let Some(id) = self.id(token) {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
        counts.into_iter().collect()
    }
}

fn number(input: &str) -> IResult<&str, u32> {
    map_res(digit1, |digits: &str| digits.parse::<u32>())(input)
}

fn dictionary_line(input: &str) -> IResult<&str, (u32, &str, u32)> {
    let (rest, (id, _, token, _, docfreq)) = all_consuming(tuple((
        number,
        tag("\t"),
        take_till1(|c: char| c == '\t'),
        tag("\t"),
        number,
    )))(input.trim_end_matches('\r'))?;
    Ok((rest, (id, token, docfreq)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn doc(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn counts_known_tokens() {
        let vocab = Vocabulary::from_documents(vec![doc(&["a", "b"])]);
        assert_eq!(vocab.id("a"), Some(0));
        assert_eq!(vocab.id("b"), Some(1));
        let mut bow = vocab.doc2bow(&doc(&["a", "a", "b", "zzz"]));
        bow.sort();
        assert_eq!(bow, vec![(0, 2), (1, 1)]);
    }

    #[test]
    fn document_frequencies() {
        let vocab = Vocabulary::from_documents(vec![
            doc(&["a", "a", "b"]),
            doc(&["b", "c"]),
        ]);
        assert_eq!(vocab.num_docs(), 2);
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.document_frequency(vocab.id("a").unwrap()), Some(1));
        assert_eq!(vocab.document_frequency(vocab.id("b").unwrap()), Some(2));
        assert_eq!(vocab.token(2), Some("c"));
    }

    #[test]
    fn reads_what_it_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dictionary.txt");
        let vocab = Vocabulary::from_documents(vec![doc(&["olá", "mundo"]), doc(&["mundo"])]);
        vocab.save_as_text(&path).unwrap();
        let back = Vocabulary::from_text_file(&path).unwrap();
        assert_eq!(back.num_docs(), 2);
        assert_eq!(back.id("olá"), Some(0));
        assert_eq!(back.id("mundo"), Some(1));
        assert_eq!(back.document_frequency(1), Some(2));
    }

    #[test]
    fn reads_gensim_layout_with_gaps() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dictionary.txt");
        ::std::fs::write(&path, "10\n4\tzebra\t3\n0\tabelha\t7\n").unwrap();
        let vocab = Vocabulary::from_text_file(&path).unwrap();
        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.num_terms(), 5);
        assert_eq!(vocab.id("zebra"), Some(4));
    }

    #[test]
    fn rejects_bad_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dictionary.txt");
        ::std::fs::write(&path, "1\n0 spaces 1\n").unwrap();
        match Vocabulary::from_text_file(&path) {
            Err(Error::InvalidFormat(msg)) => assert!(msg.contains("line 2")),
            other => panic!("expected a format error, got {:?}", other),
        }
    }

    #[test]
    fn missing_dictionary() {
        match Vocabulary::from_text_file("/definitely/not/here.txt") {
            Err(Error::MissingFile(what, _)) => assert_eq!(what, "dictionary file"),
            other => panic!("expected a missing file, got {:?}", other),
        }
    }
}
