//! Parsers for `openssl` command line output

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

static MODULUS_BITS: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)(public-key|modulus)\s*:?\s*\(\s*(\d+)\s*bit\s*\)").ok()
});

/// Modulus length from `openssl rsa -text` output.
///
/// Both the `Public-Key: (2048 bit)` and the older `Modulus (2048 bit):`
/// forms are recognised; the former wins when both appear.
pub fn parse_modulus_bits(output: &str) -> Option<u32> {
    let pattern = MODULUS_BITS.as_ref()?;
    let mut fallback = None;
    for captures in pattern.captures_iter(output) {
        let (Some(label), Some(digits)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        let Ok(bits) = digits.as_str().parse::<u32>() else {
            continue;
        };
        let label = label.as_str();
        if label.eq_ignore_ascii_case("public-key") {
            return Some(bits);
        }
        fallback.get_or_insert(bits);
    }
    fallback
}

/// The first `subject=` line of `openssl req -subject` output, trimmed
pub fn parse_subject_line(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("subject="))
        .map(str::to_string)
}

/// Every `CN=` value of a legacy subject line, in order
pub fn common_names_from_subject_line(subject: &str) -> Vec<String> {
    subject
        .trim_end()
        .split('/')
        .filter(|component| component.starts_with("CN="))
        .filter_map(|component| component.split_once('='))
        .map(|(_, value)| value.to_string())
        .collect()
}

/// Common name of a legacy subject line, when exactly one `CN=` is present
pub fn common_name_from_subject_line(subject: &str) -> Option<String> {
    let mut cns = common_names_from_subject_line(subject);
    if cns.len() == 1 {
        cns.pop()
    } else {
        None
    }
}

/// Entries of the `X509v3 Subject Alternative Name` block in `req -text`
/// output, split into DNS names and everything else
pub fn parse_san_entries(output: &str) -> (BTreeSet<String>, Vec<String>) {
    let mut dns = BTreeSet::new();
    let mut other = Vec::new();

    let mut lines = output.lines();
    while let Some(line) = lines.next() {
        if !line.contains("X509v3 Subject Alternative Name") {
            continue;
        }
        let Some(entries) = lines.next() else {
            break;
        };
        for entry in entries.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match entry.strip_prefix("DNS:") {
                Some(name) => {
                    dns.insert(name.to_string());
                }
                None => other.push(entry.to_string()),
            }
        }
    }
    (dns, other)
}
