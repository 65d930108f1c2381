//! Readers for sequence files.
//!
//! These readers turn FASTA and FASTQ stanzas into [`FastxRecord`]s, which can then be converted into [`Record`]s for a [`crate::Group`].
//! The run identifier is the first whitespace-separated token of the header line.
//! A header without any tokens produces an anonymous record.
//!
//! ### FASTA
//!
//! A record starts with a header line `>...` and continues with one or more sequence lines, which are concatenated.
//! Anything before the first header line is ignored.
//!
//! ### FASTQ
//!
//! A record is a stanza of four lines: `@header`, sequence, `+` (optionally followed by text), and quality values.
//! Empty lines between stanzas are ignored.
//!
//! Use [`read_records`] to read all records from a file selected by its extension.

use crate::{utils, Fingerprint, GroupIdentifier, Record, Result, RunIdentifier, StoreError};

use std::io::BufRead;
use std::path::Path;


//-----------------------------------------------------------------------------

/// A record from a FASTA or FASTQ file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FastxRecord {
    /// Run identifier from the header.
    pub id: Option<RunIdentifier>,
    /// Header line without the leading `>` or `@`.
    pub header: String,
    /// Sequence.
    pub sequence: String,
    /// Quality values (FASTQ only).
    pub quality: Option<String>,
}

impl FastxRecord {
    /// Creates a record and extracts the run identifier from the header.
    pub fn new(header: &str, sequence: String, quality: Option<String>) -> Self {
        let id = header.split_whitespace().next().map(RunIdentifier::from);
        FastxRecord {
            id,
            header: header.to_string(),
            sequence,
            quality,
        }
    }

    /// Returns the fingerprint of the sequence.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::derive(&self.sequence)
    }

    /// Converts the record into a [`Record`] in the given group.
    pub fn to_record(&self, group: &GroupIdentifier) -> Record {
        match self.id.as_ref() {
            Some(id) => Record::from_text(id, &self.sequence, group.clone()),
            None => Record::anonymous(&self.sequence, group.clone()),
        }
    }

    /// Returns the sequencing metadata from an Illumina-style header.
    ///
    /// Returns [`None`] if the header is not of the form described in [`IlluminaHeader`].
    pub fn metadata(&self) -> Option<IlluminaHeader> {
        IlluminaHeader::parse(&self.header)
    }
}

//-----------------------------------------------------------------------------

/// Sequencing metadata from an Illumina-style header.
///
/// The header consists of two whitespace-separated parts:
///
/// ```text
/// <instrument>:<run>:<flowcell>:<lane>:<tile>:<x>:<y> <member>:<filtered>:<control>:<indexseq>
/// ```
///
/// # Examples
///
/// ```
/// use toad_base::formats::FastxRecord;
///
/// let record = FastxRecord::new("M00967:43:A3JHG:1:1101:18327:1699 1:N:0:188", String::from("GATTACA"), None);
/// let metadata = record.metadata().unwrap();
/// assert_eq!(metadata.instrument, "M00967");
/// assert_eq!(metadata.tile, "1101");
/// assert!(!metadata.is_filtered());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IlluminaHeader {
    pub instrument: String,
    pub run: String,
    pub flowcell: String,
    pub lane: String,
    pub tile: String,
    pub x: String,
    pub y: String,
    /// Member of the pair (`1` or `2`).
    pub member: String,
    /// `Y` if the read was filtered out.
    pub filtered: String,
    pub control: String,
    /// Index sequence or sample number.
    pub indexseq: String,
}

impl IlluminaHeader {
    /// Number of fields in the run part of the header.
    pub const RUN_FIELDS: usize = 7;

    /// Number of fields in the read part of the header.
    pub const READ_FIELDS: usize = 4;

    /// Parses the header line without the leading `>` or `@`.
    pub fn parse(header: &str) -> Option<Self> {
        let mut parts = header.split_whitespace();
        let run_part = parts.next()?;
        let read_part = parts.next()?;

        let run_fields: Vec<&str> = run_part.split(':').collect();
        let read_fields: Vec<&str> = read_part.split(':').collect();
        match (run_fields.as_slice(), read_fields.as_slice()) {
            (
                [instrument, run, flowcell, lane, tile, x, y],
                [member, filtered, control, indexseq],
            ) => Some(IlluminaHeader {
                instrument: instrument.to_string(),
                run: run.to_string(),
                flowcell: flowcell.to_string(),
                lane: lane.to_string(),
                tile: tile.to_string(),
                x: x.to_string(),
                y: y.to_string(),
                member: member.to_string(),
                filtered: filtered.to_string(),
                control: control.to_string(),
                indexseq: indexseq.to_string(),
            }),
            _ => None,
        }
    }

    /// Returns `true` if the read was filtered out.
    pub fn is_filtered(&self) -> bool {
        self.filtered == "Y"
    }
}

//-----------------------------------------------------------------------------

// Line reader that tracks line numbers and strips line endings.
struct Lines<R: BufRead> {
    reader: R,
    line: usize,
}

impl<R: BufRead> Lines<R> {
    fn new(reader: R) -> Self {
        Lines { reader, line: 0 }
    }

    fn next_line(&mut self) -> Result<Option<String>> {
        let mut buf = String::new();
        let len = self.reader.read_line(&mut buf)?;
        if len == 0 {
            return Ok(None);
        }
        self.line += 1;
        let trimmed_len = buf.trim_end_matches(|c: char| c == '\n' || c == '\r').len();
        buf.truncate(trimmed_len);
        Ok(Some(buf))
    }

    fn error(&self, message: &str) -> StoreError {
        StoreError::Parse { line: self.line, message: message.to_string() }
    }
}

//-----------------------------------------------------------------------------

/// An iterator over the records in a FASTA file.
///
/// # Examples
///
/// ```
/// use toad_base::formats::FastaReader;
///
/// let input = ">r1 first\nGATT\nACA\n>r2\nATGC\n";
/// let records: Vec<_> = FastaReader::new(input.as_bytes()).collect::<Result<_, _>>().unwrap();
/// assert_eq!(records.len(), 2);
/// assert_eq!(records[0].sequence, "GATTACA");
/// assert_eq!(records[1].id.as_ref().unwrap().as_str(), "r2");
/// ```
pub struct FastaReader<R: BufRead> {
    lines: Lines<R>,
    header: Option<String>,
    done: bool,
}

impl<R: BufRead> FastaReader<R> {
    /// Creates a reader over the input.
    pub fn new(reader: R) -> Self {
        FastaReader {
            lines: Lines::new(reader),
            header: None,
            done: false,
        }
    }

    fn read_record(&mut self) -> Result<Option<FastxRecord>> {
        // Find the header.
        let header = match self.header.take() {
            Some(header) => header,
            None => loop {
                match self.lines.next_line()? {
                    Some(line) => {
                        if let Some(header) = line.strip_prefix('>') {
                            break header.to_string();
                        }
                    },
                    None => return Ok(None),
                }
            },
        };

        // Sequence lines until the next header.
        let mut sequence = String::new();
        while let Some(line) = self.lines.next_line()? {
            if let Some(next) = line.strip_prefix('>') {
                self.header = Some(next.to_string());
                break;
            }
            sequence.push_str(line.trim());
        }
        if sequence.is_empty() {
            return Err(self.lines.error(&format!("No sequence for header {}", header)));
        }

        Ok(Some(FastxRecord::new(&header, sequence, None)))
    }
}

impl<R: BufRead> Iterator for FastaReader<R> {
    type Item = Result<FastxRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.read_record().transpose();
        if !matches!(result, Some(Ok(_))) {
            self.done = true;
        }
        result
    }
}

//-----------------------------------------------------------------------------

/// An iterator over the records in a FASTQ file.
pub struct FastqReader<R: BufRead> {
    lines: Lines<R>,
    done: bool,
}

impl<R: BufRead> FastqReader<R> {
    /// Creates a reader over the input.
    pub fn new(reader: R) -> Self {
        FastqReader {
            lines: Lines::new(reader),
            done: false,
        }
    }

    fn required_line(&mut self) -> Result<String> {
        self.lines.next_line()?.ok_or_else(|| self.lines.error("Incomplete FASTQ stanza"))
    }

    fn read_record(&mut self) -> Result<Option<FastxRecord>> {
        let header = loop {
            match self.lines.next_line()? {
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => break line,
                None => return Ok(None),
            }
        };
        let header = header.strip_prefix('@').ok_or_else(|| self.lines.error("Expected a FASTQ header line"))?.to_string();

        let sequence = self.required_line()?.trim().to_string();
        let separator = self.required_line()?;
        if !separator.starts_with('+') {
            return Err(self.lines.error("Expected a FASTQ separator line"));
        }
        let quality = self.required_line()?.trim().to_string();
        if sequence.is_empty() || quality.is_empty() {
            return Err(self.lines.error("Empty sequence or quality line"));
        }
        if sequence.len() != quality.len() {
            return Err(self.lines.error("Sequence and quality lengths differ"));
        }

        Ok(Some(FastxRecord::new(&header, sequence, Some(quality))))
    }
}

impl<R: BufRead> Iterator for FastqReader<R> {
    type Item = Result<FastxRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.read_record().transpose();
        if !matches!(result, Some(Ok(_))) {
            self.done = true;
        }
        result
    }
}

//-----------------------------------------------------------------------------

/// Sequence file formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
    Fasta,
    Fastq,
}

impl FileFormat {
    /// Determines the format from the file name.
    ///
    /// Recognizes `.fasta`, `.fa`, `.fna`, `.fastq`, and `.fq`, each optionally followed by `.gz`.
    pub fn from_filename<P: AsRef<Path>>(filename: P) -> Option<Self> {
        let name = filename.as_ref().file_name()?.to_str()?.to_lowercase();
        let name = name.strip_suffix(".gz").unwrap_or(&name);
        let extension = name.rsplit_once('.')?.1;
        match extension {
            "fasta" | "fa" | "fna" => Some(FileFormat::Fasta),
            "fastq" | "fq" => Some(FileFormat::Fastq),
            _ => None,
        }
    }
}

/// Reads all records from the file and assigns them to the group.
///
/// The format is determined by [`FileFormat::from_filename`].
/// The file may be gzip-compressed.
pub fn read_records<P: AsRef<Path>>(filename: P, group: &GroupIdentifier) -> Result<Vec<Record>> {
    let format = FileFormat::from_filename(&filename).ok_or_else(|| {
        StoreError::Parse { line: 0, message: format!("Unknown file format: {}", filename.as_ref().display()) }
    })?;
    let reader = utils::open_file(&filename)?;
    let mut result = Vec::new();
    match format {
        FileFormat::Fasta => {
            for record in FastaReader::new(reader) {
                result.push(record?.to_record(group));
            }
        },
        FileFormat::Fastq => {
            for record in FastqReader::new(reader) {
                result.push(record?.to_record(group));
            }
        },
    }
    log::info!("Read {} records from {}", result.len(), filename.as_ref().display());
    Ok(result)
}

//-----------------------------------------------------------------------------
