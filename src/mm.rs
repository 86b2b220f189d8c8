//! Read and write corpora as sparse Matrix Market files
//!
//! One row per document (in iteration order) and one column per vocabulary id, both 1-based.
//! This is the layout gensim's `MmCorpus` reads and writes.
use nom::character::complete::{digit1, space0, space1};
use nom::combinator::{all_consuming, map_res};
use nom::number::complete::double;
use nom::sequence::{preceded, terminated, tuple};
use nom::IResult;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use crate::document::parent_of;
use crate::errors::*;

const BANNER: &str = "%%MatrixMarket matrix coordinate real general";
const VERSION_LINE: &str = "% parlance sparse corpus v1";
/// The dimensions are only known at the end, so leave room for three u64's
const DIMENSION_WIDTH: usize = 64;

/// Rows, columns and stored entries of a sparse matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub num_docs: usize,
    pub num_terms: usize,
    pub num_nnz: usize,
}

/// Write the whole corpus in one pass. Counts of zero are not stored.
///
/// `num_terms` is the width of the vocabulary. It only grows if a document uses a larger id.
/// The file is replaced at the end, so an interrupted run leaves no partial corpus behind.
pub fn serialize_corpus<P, I, D>(path: P, documents: I, num_terms: usize) -> Result<Shape>
    where P: AsRef<Path>, I: IntoIterator<Item=D>, D: AsRef<[(u32, u32)]> {
    let path = path.as_ref();
    let mut temp = NamedTempFile::new_in(parent_of(path))?;
    let mut shape = Shape { num_docs: 0, num_terms: num_terms, num_nnz: 0 };
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        writeln!(writer, "{}", BANNER)?;
        writeln!(writer, "{}", VERSION_LINE)?;
        let dimension_offset = writer.seek(SeekFrom::Current(0))?;
        writeln!(writer, "{}", " ".repeat(DIMENSION_WIDTH))?;

        for (doc_i, doc) in documents.into_iter().enumerate() {
            let mut entries = doc.as_ref().to_vec();
            entries.sort_by_key(|&(id, _)| id);
            for (id, count) in entries {
                if count == 0 { continue; }
                writeln!(writer, "{} {} {}", doc_i + 1, id as usize + 1, count)?;
                shape.num_nnz += 1;
                shape.num_terms = ::std::cmp::max(shape.num_terms, id as usize + 1);
            }
            shape.num_docs = doc_i + 1;
            if shape.num_docs % 10000 == 0 {
                info!("Serialized {} documents ({} entries)", shape.num_docs, shape.num_nnz);
            }
        }

        writer.seek(SeekFrom::Start(dimension_offset))?;
        let dimensions = format!("{} {} {}", shape.num_docs, shape.num_terms, shape.num_nnz);
        write!(writer, "{:width$}", dimensions, width = DIMENSION_WIDTH)?;
        writer.flush()?;
    }
    temp.persist(path)?;
    info!("Saved {} documents x {} terms ({} entries) to {}",
        shape.num_docs, shape.num_terms, shape.num_nnz, path.display());
    Ok(shape)
}

/// A serialized corpus on disk, streamed back one document at a time
#[derive(Debug, Clone)]
pub struct MmCorpus {
    path: PathBuf,
    shape: Shape,
}

impl MmCorpus {
    /// Read the header of a Matrix Market corpus
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())
            .map_err(|e| Error::MissingFile("serialized corpus", Some(e)))?;
        let mut lines = BufReader::new(file).lines();
        let shape = read_header(&mut lines, path.as_ref())?;
        Ok(MmCorpus { path: path.as_ref().to_path_buf(), shape: shape })
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.shape.num_docs
    }

    pub fn is_empty(&self) -> bool {
        self.shape.num_docs == 0
    }

    /// Start a new pass over the documents, as (0-based term id, value) pairs
    pub fn iter(&self) -> Result<MmDocuments> {
        let file = File::open(&self.path)
            .map_err(|e| Error::MissingFile("serialized corpus", Some(e)))?;
        let mut lines = BufReader::new(file).lines();
        read_header(&mut lines, &self.path)?;
        Ok(MmDocuments {
            lines: lines,
            num_docs: self.shape.num_docs,
            next_doc: 1,
            pending: None,
            failed: false,
        })
    }
}

fn read_header(lines: &mut Lines<BufReader<File>>, path: &Path) -> Result<Shape> {
    let banner = lines.next()
        .ok_or_else(|| Error::InvalidFormat(format!("{} is empty", path.display())))??;
    if !banner.starts_with("%%MatrixMarket matrix coordinate") {
        return Err(Error::InvalidFormat(format!(
            "{} does not start with a Matrix Market coordinate banner", path.display())));
    }
    for line in lines {
        let line = line?;
        if line.starts_with('%') || line.trim().is_empty() {
            continue;
        }
        let (_, (num_docs, num_terms, num_nnz)) = dimension_line(&line)
            .map_err(|_| Error::InvalidFormat(format!(
                "expected 'documents terms entries' in {} but found {:?}", path.display(), line)))?;
        return Ok(Shape { num_docs: num_docs, num_terms: num_terms, num_nnz: num_nnz });
    }
    Err(Error::InvalidFormat(format!("{} has no dimension line", path.display())))
}

/// One pass over a serialized corpus
pub struct MmDocuments {
    lines: Lines<BufReader<File>>,
    num_docs: usize,
    next_doc: usize,
    pending: Option<(usize, u32, f64)>,
    failed: bool,
}

impl MmDocuments {
    fn next_entry(&mut self) -> Result<Option<(usize, u32, f64)>> {
        if let Some(entry) = self.pending.take() {
            return Ok(Some(entry));
        }
        for line in &mut self.lines {
            let line = line?;
            if line.trim().is_empty() || line.starts_with('%') {
                continue;
            }
            let (_, (row, col, value)) = entry_line(&line)
                .map_err(|_| Error::InvalidFormat(format!("bad corpus entry {:?}", line)))?;
            if row == 0 || col == 0 {
                return Err(Error::InvalidFormat(format!("corpus entries are 1-based: {:?}", line)));
            }
            return Ok(Some((row, (col - 1) as u32, value)));
        }
        Ok(None)
    }

    fn next_document(&mut self) -> Result<Vec<(u32, f64)>> {
        let mut doc = vec![];
        while let Some((row, id, value)) = self.next_entry()? {
            if row < self.next_doc {
                return Err(Error::InvalidFormat(format!(
                    "entries for document {} come after document {}", row, self.next_doc)));
            } else if row == self.next_doc {
                doc.push((id, value));
            } else {
                self.pending = Some((row, id, value));
                break;
            }
        }
        self.next_doc += 1;
        Ok(doc)
    }
}

impl Iterator for MmDocuments {
    type Item = Result<Vec<(u32, f64)>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if self.next_doc > self.num_docs {
            // Anything left over is outside the declared dimensions
            let extra = match self.next_entry() {
                Ok(None) => return None,
                Ok(Some((row, _, _))) => Err(Error::InvalidFormat(format!(
                    "entry for document {} but the corpus declares {} documents", row, self.num_docs))),
                Err(err) => Err(err),
            };
            self.failed = true;
            return Some(extra);
        }
        let doc = self.next_document();
        self.failed = doc.is_err();
        Some(doc)
    }
}

fn usize_number(input: &str) -> IResult<&str, usize> {
    map_res(digit1, |digits: &str| digits.parse::<usize>())(input)
}

fn dimension_line(input: &str) -> IResult<&str, (usize, usize, usize)> {
    all_consuming(terminated(
        tuple((
            preceded(space0, usize_number),
            preceded(space1, usize_number),
            preceded(space1, usize_number),
        )),
        space0,
    ))(input)
}

fn entry_line(input: &str) -> IResult<&str, (usize, usize, f64)> {
    all_consuming(terminated(
        tuple((
            preceded(space0, usize_number),
            preceded(space1, usize_number),
            preceded(space1, double),
        )),
        space0,
    ))(input)
}
