//! Content-based echo detection against known bot phrasing.
//!
//! The cheapest and most semantically certain loop check: if an inbound text
//! contains one of the bot's own stock phrases, it is treated as an echo
//! even when timing and fingerprint state cannot catch it (e.g. right after
//! a restart cleared the in-memory history).

use relayguard_types::config::SignaturePatterns;

/// Case-insensitive matcher over a configured phrase table.
///
/// Patterns are lowercased once at construction; matching allocates only
/// the lowercased candidate text.
#[derive(Debug, Clone)]
pub struct SignatureMatcher {
    fragments: Vec<String>,
    openers: Vec<String>,
}

impl SignatureMatcher {
    pub fn new(patterns: &SignaturePatterns) -> Self {
        Self {
            fragments: patterns.fragments.iter().map(|p| p.to_lowercase()).collect(),
            openers: patterns.openers.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// True when the text contains any fragment or starts with any opener.
    pub fn matches(&self, text: &str) -> bool {
        let lower = text.to_lowercase();

        if let Some(fragment) = self.fragments.iter().find(|f| lower.contains(f.as_str())) {
            tracing::debug!(fragment = %fragment, "bot signature fragment matched");
            return true;
        }

        if let Some(opener) = self.openers.iter().find(|o| lower.starts_with(o.as_str())) {
            tracing::debug!(opener = %opener, "bot greeting opener matched");
            return true;
        }

        false
    }
}

impl Default for SignatureMatcher {
    fn default() -> Self {
        Self::new(&SignaturePatterns::default())
    }
}
