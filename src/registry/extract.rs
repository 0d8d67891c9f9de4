//! Expiry date extraction from free-text registry output.

use std::sync::OnceLock;

use regex::Regex;

/// Labels tried in order; the first label with a non-empty value wins.
const EXPIRY_LABELS: [&str; 12] = [
    "Registry Expiry Date",
    "Registrar Registration Expiration Date",
    "Expiration Date",
    "Expiry Date",
    "Expires On",
    "Expire Date",
    "Expires",
    "paid-till",
    "Renewal Date",
    "Valid Until",
    "Expiration Time",
    "expire",
];

/// Characters of raw output kept for diagnostics when nothing matched.
pub const SAMPLE_CHARS: usize = 800;

fn labeled_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        EXPIRY_LABELS
            .iter()
            .map(|label| {
                // Some registries pad labels with dots: "expires.......: 1.2.2026"
                Regex::new(&format!(r"(?im){}[ \t.]*:[ \t]*(.+)$", regex::escape(label))).unwrap()
            })
            .collect()
    })
}

/// Value of the first labeled expiry field, in label priority order.
pub fn find_labeled_expiry(text: &str) -> Option<String> {
    labeled_patterns().iter().find_map(|re| {
        re.captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .find(|value| !value.is_empty())
    })
}

/// Loose fallback: the first line mentioning expiry.
///
/// Text after the first colon is the candidate; a line without a colon is
/// taken whole.
pub fn find_loose_expiry(text: &str) -> Option<String> {
    let line = text
        .lines()
        .find(|line| line.to_lowercase().contains("expir"))?;

    let candidate = match line.split_once(':') {
        Some((_, rest)) => rest.trim(),
        None => line.trim(),
    };

    if candidate.is_empty() {
        None
    } else {
        Some(candidate.to_string())
    }
}

/// Leading slice of `text` for error reports.
pub fn sample(text: &str) -> String {
    text.chars().take(SAMPLE_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERISIGN: &str = "   Domain Name: EXAMPLE.COM\r
   Registry Domain ID: 2336799_DOMAIN_COM-VRSN\r
   Updated Date: 2024-08-14T07:01:34Z\r
   Creation Date: 1995-08-14T04:00:00Z\r
   Registry Expiry Date: 2025-08-13T04:00:00Z\r
   Registrar: RESERVED-Internet Assigned Numbers Authority\r
";

    #[test]
    fn test_registry_expiry_date() {
        assert_eq!(
            find_labeled_expiry(VERISIGN).as_deref(),
            Some("2025-08-13T04:00:00Z")
        );
    }

    #[test]
    fn test_label_priority_beats_text_order() {
        let text = "Expiration Date: 2030-01-01\nRegistry Expiry Date: 2026-01-01T00:00:00Z\n";
        assert_eq!(
            find_labeled_expiry(text).as_deref(),
            Some("2026-01-01T00:00:00Z")
        );
    }

    #[test]
    fn test_ripn_and_dotted_labels() {
        assert_eq!(
            find_labeled_expiry("domain: EXAMPLE.RU\npaid-till: 2026-03-01T21:00:00Z\n").as_deref(),
            Some("2026-03-01T21:00:00Z")
        );
        assert_eq!(
            find_labeled_expiry("expires............: 1.2.2026 00:00:00\n").as_deref(),
            Some("1.2.2026 00:00:00")
        );
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let text = "Registry Expiry Date:\nRegistrar Registration Expiration Date: 2027-05-05\n";
        assert_eq!(find_labeled_expiry(text).as_deref(), Some("2027-05-05"));
    }

    #[test]
    fn test_loose_scan_after_colon() {
        let text = "Domain: example.xyz\nThis domain will expire at: 20-Jul-2025\n";
        assert_eq!(find_labeled_expiry(text), None);
        assert_eq!(find_loose_expiry(text).as_deref(), Some("20-Jul-2025"));
    }

    #[test]
    fn test_loose_scan_whole_line() {
        let text = "status: active\nEXPIRES 2026-02-02\n";
        assert_eq!(find_loose_expiry(text).as_deref(), Some("EXPIRES 2026-02-02"));
    }

    #[test]
    fn test_no_expiry_anywhere() {
        assert_eq!(find_loose_expiry("No match for domain"), None);
    }

    #[test]
    fn test_sample_is_char_bounded() {
        let text = "é".repeat(2000);
        assert_eq!(sample(&text).chars().count(), SAMPLE_CHARS);
        assert_eq!(sample("short"), "short");
    }
}
