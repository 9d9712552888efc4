use std::fmt;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::errors::SubtitleError;

// @module: Cue track parsing and serialization

// @const: Header marker emitted at the top of every track
pub const HEADER_MARKER: &str = "WEBVTT";

// @const: Separator that identifies a timestamp-range line
pub const TIMESTAMP_ARROW: &str = "-->";

// @struct: Single timed subtitle cue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    // @field: Original 0-based position, never reassigned
    pub index: usize,

    // @field: Lines preceding the timestamp (cue id, SRT counter)
    pub identifier: Option<String>,

    // @field: Timestamp-range line, verbatim
    pub timestamp: String,

    // @field: Cue text, possibly multi-line
    pub text: String,
}

impl Cue {
    /// Create a cue without an identifier line
    pub fn new(index: usize, timestamp: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            index,
            identifier: None,
            timestamp: timestamp.into(),
            text: text.into(),
        }
    }

    /// Attach the identifier line(s) that precede the timestamp
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Copy of this cue carrying different text. Index, identifier and
    /// timestamp are left untouched.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            index: self.index,
            identifier: self.identifier.clone(),
            timestamp: self.timestamp.clone(),
            text: text.into(),
        }
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(identifier) = &self.identifier {
            writeln!(f, "{}", identifier)?;
        }
        writeln!(f, "{}", self.timestamp)?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Translation outcome of a single cue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueStatus {
    /// Not yet processed
    Pending,
    /// Text replaced by a translation
    Translated,
    /// Translation could not be obtained, source text kept
    Fallback,
}

/// Parse subtitle text into an ordered list of cues.
///
/// Blocks are separated by blank lines. A leading `WEBVTT` header line is
/// dropped. A block becomes a cue only if one of its lines contains `-->`;
/// that line is kept verbatim as the timestamp, lines before it become the
/// identifier and lines after it the text. Other blocks (NOTE, STYLE,
/// header metadata) are skipped.
pub fn parse(text: &str) -> std::result::Result<Vec<Cue>, SubtitleError> {
    let normalized = text.replace("\r\n", "\n");
    let content = normalized.trim();

    let mut cues = Vec::new();
    let mut skipped = 0;

    for (block_number, mut block) in split_blocks(content).into_iter().enumerate() {
        if block_number == 0 && block.first().is_some_and(|line| line.trim().starts_with(HEADER_MARKER)) {
            block.remove(0);
            if block.is_empty() {
                continue;
            }
        }

        let Some(arrow_pos) = block.iter().position(|line| line.contains(TIMESTAMP_ARROW)) else {
            skipped += 1;
            continue;
        };

        let mut cue = Cue::new(cues.len(), block[arrow_pos], block[arrow_pos + 1..].join("\n"));
        if arrow_pos > 0 {
            cue = cue.with_identifier(block[..arrow_pos].join("\n"));
        }
        cues.push(cue);
    }

    if skipped > 0 {
        debug!("Skipped {} block(s) without a timestamp line", skipped);
    }

    if cues.is_empty() {
        warn!("No valid subtitle cues found in content");
        return Err(SubtitleError::NoValidCues);
    }

    Ok(cues)
}

/// Serialize cues back to track text, in ascending index order
pub fn serialize(cues: &[Cue]) -> String {
    let mut ordered: Vec<&Cue> = cues.iter().collect();
    ordered.sort_by_key(|cue| cue.index);

    let mut out = String::with_capacity(cues.iter().map(|c| c.timestamp.len() + c.text.len() + 4).sum::<usize>() + 8);
    out.push_str(HEADER_MARKER);
    out.push_str("\n\n");
    for cue in ordered {
        // Writing into a String cannot fail
        let _ = write!(out, "{}", cue);
    }

    let mut out = out.trim_end().to_string();
    out.push('\n');
    out
}

/// Format seconds as `HH:MM:SS.mmm`, truncating sub-millisecond precision
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let whole = seconds.trunc() as u64;
    let millis = ((seconds - seconds.trunc()) * 1000.0) as u64;

    format!(
        "{:02}:{:02}:{:02}.{:03}",
        whole / 3600,
        (whole % 3600) / 60,
        whole % 60,
        millis.min(999)
    )
}

fn split_blocks(content: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

/// An ordered cue list together with the file it came from
#[derive(Debug, Clone)]
pub struct CueTrack {
    /// Source filename, if the track was read from disk
    pub source_file: Option<PathBuf>,

    /// Cues in original order
    pub cues: Vec<Cue>,
}

impl CueTrack {
    /// Parse a track from text
    pub fn parse(text: &str) -> std::result::Result<Self, SubtitleError> {
        Ok(Self {
            source_file: None,
            cues: parse(text)?,
        })
    }

    /// Read and parse a track file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read subtitle file: {}", path.display()))?;

        let cues = parse(&content)
            .with_context(|| format!("Failed to parse subtitle file: {}", path.display()))?;

        Ok(Self {
            source_file: Some(path.to_path_buf()),
            cues,
        })
    }

    /// Build a track from speech-to-text segments given as
    /// `(start_seconds, end_seconds, text)` triples
    pub fn from_segments<S: AsRef<str>>(segments: &[(f64, f64, S)]) -> Self {
        let cues = segments
            .iter()
            .enumerate()
            .map(|(index, (start, end, text))| {
                let timestamp = format!("{} {} {}", format_timestamp(*start), TIMESTAMP_ARROW, format_timestamp(*end));
                Cue::new(index, timestamp, text.as_ref().trim())
            })
            .collect();

        Self {
            source_file: None,
            cues,
        }
    }

    /// Serialize the track
    pub fn serialize(&self) -> String {
        serialize(&self.cues)
    }

    /// Number of cues
    pub fn len(&self) -> usize {
        self.cues.len()
    }

    /// Whether the track has no cues
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}

impl fmt::Display for CueTrack {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Cue Track")?;
        if let Some(source) = &self.source_file {
            writeln!(f, "Source: {:?}", source)?;
        }
        writeln!(f, "Cues: {}", self.cues.len())
    }
}
