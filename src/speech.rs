//! Speech features from a transcription and its recording
//!
//! Word and syllable counts come from the transcription, duration from the WAV header, and the
//! rates divide one by the other. Durations are truncated to whole seconds before dividing.
use byteorder::{LittleEndian, ReadBytesExt};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use crate::errors::*;

/// The utterances of one recording, in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcription {
    pub items: Vec<String>,
}

impl Transcription {
    pub fn from_items<I, S>(items: I) -> Self
        where I: IntoIterator<Item=S>, S: Into<String> {
        Transcription { items: items.into_iter().map(Into::into).collect() }
    }

    /// One utterance per non-empty line
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())
            .map_err(|e| Error::MissingFile("transcription", Some(e)))?;
        let mut items = vec![];
        for line in BufReader::new(file).lines() {
            let line = line?;
            if !line.trim().is_empty() {
                items.push(line.trim().to_string());
            }
        }
        Ok(Transcription { items: items })
    }

    pub fn words(&self) -> impl Iterator<Item=&str> {
        self.items.iter().flat_map(|item| item.split_whitespace())
    }
}

/// Splits words into syllables by inserting hyphens
pub trait Hyphenator {
    fn inserted(&self, word: &str) -> String;

    fn syllables(&self, word: &str) -> usize {
        self.inserted(word).split('-').count()
    }
}

/// Rough Portuguese syllabification: one syllable per vowel group
///
/// A single consonant between vowels starts the next syllable. In longer clusters the last
/// consonant does, unless the last two form an onset like "br" or "nh".
#[derive(Debug, Clone, Copy, Default)]
pub struct VowelGroups;

const VOWELS: &str = "aeiouyáàâãéêíóôõúü";
const ONSETS: &[&str] = &[
    "bl", "br", "cl", "cr", "dr", "fl", "fr", "gl", "gr", "pl", "pr", "tr", "vr",
    "ch", "lh", "nh",
];

fn is_vowel(c: char) -> bool {
    c.to_lowercase().any(|lower| VOWELS.contains(lower))
}

impl Hyphenator for VowelGroups {
    fn inserted(&self, word: &str) -> String {
        let chars: Vec<char> = word.chars().collect();
        // Start of every vowel group after the first
        let mut breaks = vec![];
        let mut seen_vowel = false;
        let mut i = 0;
        while i < chars.len() {
            if !is_vowel(chars[i]) {
                i += 1;
                continue;
            }
            let start = i;
            while i < chars.len() && is_vowel(chars[i]) {
                i += 1;
            }
            if seen_vowel {
                // consonants between the previous group and this one
                let mut cluster_start = start;
                while cluster_start > 0 && !is_vowel(chars[cluster_start - 1]) {
                    cluster_start -= 1;
                }
                let cluster = start - cluster_start;
                let onset = if cluster >= 2 {
                    let pair: String = chars[start - 2..start].iter().flat_map(|c| c.to_lowercase()).collect();
                    if ONSETS.contains(&pair.as_str()) { 2 } else { 1 }
                } else {
                    cluster
                };
                breaks.push(start - onset);
            }
            seen_vowel = true;
        }
        let mut out = String::with_capacity(word.len() + breaks.len());
        for (idx, c) in chars.iter().enumerate() {
            if breaks.contains(&idx) {
                out.push('-');
            }
            out.push(*c);
        }
        out
    }
}

pub fn count_words(transcription: &Transcription) -> usize {
    transcription.words().count()
}

pub fn count_syllables<H: Hyphenator + ?Sized>(transcription: &Transcription, hyphenator: &H) -> usize {
    transcription.words().map(|word| hyphenator.syllables(word)).sum()
}

/// Duration in seconds of an uncompressed RIFF/WAVE file
pub fn wav_duration<P: AsRef<Path>>(path: P) -> Result<f64> {
    let file = File::open(path.as_ref())
        .map_err(|e| Error::MissingFile("audio file", Some(e)))?;
    read_wav_duration(&mut BufReader::new(file))
        .map_err(|err| match err {
            Error::IOError(ref io_err) if io_err.kind() == io::ErrorKind::UnexpectedEof =>
                Error::InvalidFormat(format!("{} ends before its audio data", path.as_ref().display())),
            other => other,
        })
}

fn read_wav_duration<R: Read>(reader: &mut R) -> Result<f64> {
    let mut id = [0u8; 4];
    reader.read_exact(&mut id)?;
    let _riff_size = reader.read_u32::<LittleEndian>()?;
    let mut wave = [0u8; 4];
    reader.read_exact(&mut wave)?;
    if &id != b"RIFF" || &wave != b"WAVE" {
        return Err(Error::InvalidFormat("expected a RIFF/WAVE header".to_string()));
    }
    let mut byte_rate = None;
    loop {
        reader.read_exact(&mut id)?;
        let size = reader.read_u32::<LittleEndian>()?;
        match &id {
            b"fmt " => {
                if size < 16 {
                    return Err(Error::InvalidFormat(format!("fmt chunk of {} bytes is too short", size)));
                }
                let _audio_format = reader.read_u16::<LittleEndian>()?;
                let _channels = reader.read_u16::<LittleEndian>()?;
                let _sample_rate = reader.read_u32::<LittleEndian>()?;
                byte_rate = Some(reader.read_u32::<LittleEndian>()?);
                skip(reader, size as u64 - 12 + (size as u64 & 1))?;
            }
            b"data" => {
                return match byte_rate {
                    Some(rate) if rate > 0 => Ok(size as f64 / rate as f64),
                    _ => Err(Error::InvalidFormat(
                        "the data chunk comes before a usable fmt chunk".to_string())),
                };
            }
            // Chunks are padded to an even length
            _ => skip(reader, size as u64 + (size as u64 & 1))?,
        }
    }
}

fn skip<R: Read>(reader: &mut R, amount: u64) -> Result<()> {
    let skipped = io::copy(&mut reader.take(amount), &mut io::sink())?;
    if skipped < amount {
        return Err(Error::IOError(io::Error::new(io::ErrorKind::UnexpectedEof, "chunk is cut short")));
    }
    Ok(())
}

/// Features of one recording
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechFeatures {
    pub words: usize,
    pub syllables: usize,
    /// Whole seconds
    pub duration: u64,
    /// Words per second, missing when the recording is shorter than a second
    pub speaking_rate: Option<f64>,
    /// Syllables per second, missing when the recording is shorter than a second
    pub articulation_rate: Option<f64>,
}

impl SpeechFeatures {
    pub fn compute<H: Hyphenator + ?Sized>(transcription: &Transcription, duration_secs: f64, hyphenator: &H)
        -> SpeechFeatures {
        let words = count_words(transcription);
        let syllables = count_syllables(transcription, hyphenator);
        let duration = if duration_secs.is_finite() && duration_secs > 0.0 { duration_secs.trunc() as u64 } else { 0 };
        let rate = |count: usize| if duration == 0 { None } else { Some(count as f64 / duration as f64) };
        SpeechFeatures {
            words: words,
            syllables: syllables,
            duration: duration,
            speaking_rate: rate(words),
            articulation_rate: rate(syllables),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use std::io::Write;
    use tempfile::TempDir;

    /// 16-bit mono PCM with an extra chunk before the audio
    fn write_wav(path: &Path, sample_rate: u32, samples: u32) {
        let mut out = vec![];
        let data_size = samples * 2;
        out.write_all(b"RIFF").unwrap();
        out.write_u32::<LittleEndian>(36 + 10 + data_size).unwrap();
        out.write_all(b"WAVE").unwrap();
        out.write_all(b"fmt ").unwrap();
        out.write_u32::<LittleEndian>(16).unwrap();
        out.write_u16::<LittleEndian>(1).unwrap();
        out.write_u16::<LittleEndian>(1).unwrap();
        out.write_u32::<LittleEndian>(sample_rate).unwrap();
        out.write_u32::<LittleEndian>(sample_rate * 2).unwrap();
        out.write_u16::<LittleEndian>(2).unwrap();
        out.write_u16::<LittleEndian>(16).unwrap();
        out.write_all(b"LIST").unwrap();
        out.write_u32::<LittleEndian>(1).unwrap();
        out.write_all(&[0, 0]).unwrap();
        out.write_all(b"data").unwrap();
        out.write_u32::<LittleEndian>(data_size).unwrap();
        out.extend(vec![0u8; data_size as usize]);
        ::std::fs::write(path, out).unwrap();
    }

    #[test]
    fn counts_words_across_items() {
        let trans = Transcription::from_items(vec!["o gato  subiu", "", "ao telhado"]);
        assert_eq!(count_words(&trans), 5);
    }

    #[test]
    fn portuguese_syllables() {
        let h = VowelGroups;
        assert_eq!(h.inserted("casa"), "ca-sa");
        assert_eq!(h.inserted("palavra"), "pa-la-vra");
        assert_eq!(h.inserted("carro"), "car-ro");
        assert_eq!(h.inserted("trabalho"), "tra-ba-lho");
        assert_eq!(h.syllables("sol"), 1);
        assert_eq!(h.syllables("123"), 1);
    }

    #[test]
    fn wav_duration_from_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.wav");
        write_wav(&path, 8000, 20000);
        assert_eq!(wav_duration(&path).unwrap(), 2.5);
    }

    #[test]
    fn not_a_wav() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.wav");
        ::std::fs::write(&path, b"ID3\x03 not riff at all").unwrap();
        match wav_duration(&path) {
            Err(Error::InvalidFormat(_)) => {}
            other => panic!("expected a format error, got {:?}", other),
        }
    }

    #[test]
    fn rates_use_whole_seconds() {
        let trans = Transcription::from_items(vec!["casa casa casa casa"]);
        let features = SpeechFeatures::compute(&trans, 2.9, &VowelGroups);
        assert_eq!(features.words, 4);
        assert_eq!(features.syllables, 8);
        assert_eq!(features.duration, 2);
        assert_eq!(features.speaking_rate, Some(2.0));
        assert_eq!(features.articulation_rate, Some(4.0));
    }

    #[test]
    fn short_recordings_have_no_rate() {
        let trans = Transcription::from_items(vec!["sim"]);
        let features = SpeechFeatures::compute(&trans, 0.6, &VowelGroups);
        assert_eq!(features.duration, 0);
        assert_eq!(features.speaking_rate, None);
        assert_eq!(features.articulation_rate, None);
    }

    #[test]
    fn reads_transcription_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.txt");
        let mut file = File::create(&path).unwrap();
        write!(file, "bom dia\n\n  tudo bem  \n").unwrap();
        let trans = Transcription::from_file(&path).unwrap();
        assert_eq!(trans.items, vec!["bom dia".to_string(), "tudo bem".to_string()]);
    }
}
