use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for prompt and file naming
///
/// Languages reach the application either as ISO 639-1 / 639-2 codes
/// ("ja", "jpn", "ger") or as English names ("japanese"). Prompts always
/// use the English name; output file names use the short code.
/// Map ISO 639-2/B codes to their ISO 639-2/T equivalent
fn bibliographic_to_terminology(code: &str) -> Option<&'static str> {
    let mapped = match code {
        "fre" => "fra",
        "ger" => "deu",
        "dut" => "nld",
        "gre" => "ell",
        "chi" => "zho",
        "cze" => "ces",
        "ice" => "isl",
        "alb" => "sqi",
        "arm" => "hye",
        "baq" => "eus",
        "bur" => "mya",
        "per" => "fas",
        "geo" => "kat",
        "may" => "msa",
        "mac" => "mkd",
        "rum" => "ron",
        "slo" => "slk",
        "wel" => "cym",
        _ => return None,
    };
    Some(mapped)
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 {
        if let Some(lang) = Language::from_639_1(&normalized_code) {
            return Ok(lang.to_639_3().to_string());
        }
    } else if normalized_code.len() == 3 {
        if Language::from_639_3(&normalized_code).is_some() {
            return Ok(normalized_code);
        }
        if let Some(part2t) = bibliographic_to_terminology(&normalized_code) {
            return Ok(part2t.to_string());
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Look up a language by code or by English name
fn lookup(input: &str) -> Option<Language> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(part2t) = normalize_to_part2t(trimmed) {
        return Language::from_639_3(&part2t);
    }

    // isolang names are title-cased ("Japanese")
    let lowered = trimmed.to_lowercase();
    let mut chars = lowered.chars();
    let title_cased = match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => return None,
    };
    Language::from_name(&title_cased)
}

/// Resolve a code or a name to the English language name used in prompts
pub fn resolve_language_name(input: &str) -> Result<String> {
    lookup(input)
        .map(|lang| lang.to_name().to_string())
        .ok_or_else(|| anyhow!("Unknown language: {}", input))
}

/// Resolve a code or a name to the short code used in file names
pub fn resolve_language_code(input: &str) -> Result<String> {
    let lang = lookup(input).ok_or_else(|| anyhow!("Unknown language: {}", input))?;
    Ok(lang.to_639_1().unwrap_or_else(|| lang.to_639_3()).to_string())
}
