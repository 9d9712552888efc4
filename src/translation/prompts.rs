/*!
 * Prompt construction and response splitting.
 *
 * A batch request joins the cue texts with a delimiter line and asks the
 * model to answer with the same number of delimited segments. This module
 * owns both directions of that contract: building the prompt and cutting
 * the reply back into per-cue segments.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// Marker preceding the cue texts in a prompt
pub const INPUT_HEADER: &str = "INPUT TEXT:";

/// Marker after which the model is expected to answer
pub const OUTPUT_HEADER: &str = "OUTPUT TEXT:";

/// Alternates tried in order when the preferred delimiter occurs in cue text
pub const DELIMITER_CANDIDATES: &[&str] = &["<--->", "<<<===>>>", "#%#%#", "@@@@@@", "~~~~~~"];

// Trailing note the model likes to append, e.g. "(Note: literal translation)"
static TRAILING_NOTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\s*\(\s*(?:note|translator'?s\s+note|translation)\s*:[^()]*\)\s*$").unwrap()
});

/// Pick the delimiter for a batch.
///
/// The preferred delimiter is kept unless one of the texts contains it;
/// then the first candidate absent from every text is used. When all of
/// them collide the preferred one is returned and the segment count check
/// sorts it out.
pub fn choose_delimiter<'a, S: AsRef<str>>(preferred: &'a str, texts: &[S]) -> &'a str {
    let collides = |delimiter: &str| texts.iter().any(|t| t.as_ref().contains(delimiter));

    if !collides(preferred) {
        return preferred;
    }

    DELIMITER_CANDIDATES
        .iter()
        .copied()
        .find(|candidate| *candidate != preferred && !collides(candidate))
        .unwrap_or(preferred)
}

/// Join cue texts with the delimiter on its own line
pub fn join_texts<S: AsRef<str>>(texts: &[S], delimiter: &str) -> String {
    let separator = format!("\n{}\n", delimiter);
    texts.iter().map(|t| t.as_ref()).collect::<Vec<_>>().join(&separator)
}

/// Build the multi-cue translation prompt
pub fn build_batch_prompt<S: AsRef<str>>(
    source_language: &str,
    target_language: &str,
    delimiter: &str,
    texts: &[S],
) -> String {
    format!(
        "You are a machine translation service. Your only function is to translate {source} text to {target}.\n\
         Follow these rules exactly:\n\
         1. The input contains multiple text blocks separated by '{delimiter}'.\n\
         2. Translate each text block individually.\n\
         3. Your output MUST contain the exact same number of blocks as the input, separated by the same '{delimiter}'.\n\
         4. NEVER merge blocks. NEVER omit blocks.\n\
         5. If an input block is just punctuation (e.g., \"...\"), return it exactly as is.\n\
         6. Preserve HTML tags like <i>...</i>.\n\
         \n\
         {input_header}\n\
         {joined}\n\
         \n\
         {output_header}\n",
        source = source_language,
        target = target_language,
        delimiter = delimiter,
        input_header = INPUT_HEADER,
        joined = join_texts(texts, delimiter),
        output_header = OUTPUT_HEADER,
    )
}

/// Build the simplified prompt used for a single cue
pub fn build_single_prompt(source_language: &str, target_language: &str, text: &str) -> String {
    format!(
        "Translate the following {source} subtitle line to {target}.\n\
         Reply with the translated line only, without explanations or notes.\n\
         If the line is just punctuation, return it exactly as is. Preserve HTML tags like <i>...</i>.\n\
         \n\
         {input_header}\n\
         {text}\n\
         \n\
         {output_header}\n",
        source = source_language,
        target = target_language,
        input_header = INPUT_HEADER,
        text = text,
        output_header = OUTPUT_HEADER,
    )
}

/// Trim the reply and drop a surrounding markdown code fence
pub fn strip_wrapping(raw: &str) -> &str {
    let mut text = raw.trim();

    if text.starts_with("```") {
        text = match text.find('\n') {
            Some(newline) => &text[newline + 1..],
            None => "",
        };
        text = text.trim_end();
        if let Some(stripped) = text.strip_suffix("```") {
            text = stripped;
        }
        text = text.trim();
    }

    text
}

/// Split a batch reply into trimmed segments, every delimiter counting.
pub fn split_response_exact(raw: &str, delimiter: &str) -> Vec<String> {
    let body = strip_wrapping(raw);
    if body.is_empty() {
        return Vec::new();
    }

    body.split(delimiter).map(|segment| segment.trim().to_string()).collect()
}

/// Split a batch reply into trimmed segments.
///
/// A stray delimiter at the very start or end of the reply is ignored;
/// delimiters in between always separate segments, even empty ones.
pub fn split_response(raw: &str, delimiter: &str) -> Vec<String> {
    let mut body = strip_wrapping(raw);
    if body.is_empty() {
        return Vec::new();
    }

    if let Some(rest) = body.strip_prefix(delimiter) {
        body = rest.trim_start();
    }
    if let Some(rest) = body.strip_suffix(delimiter) {
        body = rest.trim_end();
    }

    body.split(delimiter).map(|segment| segment.trim().to_string()).collect()
}

/// Clean one translated segment against its source text.
///
/// Drops an appended translator note (unless the source itself ends with a
/// parenthesis), collapses blank lines that would break the cue block, and
/// keeps the source text when nothing is left.
pub fn clean_segment(source: &str, translated: &str) -> String {
    let mut text = translated.trim().to_string();

    if !source.trim_end().ends_with(')') {
        text = TRAILING_NOTE.replace(&text, "").trim().to_string();
    }

    // A whitespace-only line ends a cue block on re-read
    text = text
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if text.trim().is_empty() && !source.trim().is_empty() {
        return source.to_string();
    }

    text
}
