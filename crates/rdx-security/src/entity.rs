//! Named-entity fallback redaction
//!
//! Best-effort only. Spans come from an [`EntityRecognizer`]; every occurrence
//! of each span is replaced literally, persons first, then organizations, then
//! locations. A span that is a substring of a later category's span is
//! replaced first and can break the later match; that order is kept as is.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

pub const PERSON_SENTINEL: &str = "[REDACTED-PERSON]";
pub const ORGANIZATION_SENTINEL: &str = "[REDACTED-ORGANIZATION]";
pub const LOCATION_SENTINEL: &str = "[REDACTED-LOCATION]";

/// NER primitive
pub trait EntityRecognizer: Send + Sync {
    fn people(&self, text: &str) -> anyhow::Result<Vec<String>>;
    fn organizations(&self, text: &str) -> anyhow::Result<Vec<String>>;
    fn places(&self, text: &str) -> anyhow::Result<Vec<String>>;
}

pub struct EntityRedactor {
    recognizer: Box<dyn EntityRecognizer>,
}

impl EntityRedactor {
    pub fn new(recognizer: impl EntityRecognizer + 'static) -> Self {
        Self {
            recognizer: Box::new(recognizer),
        }
    }

    /// Redact entities; returns `text` unchanged if the recognizer fails
    pub fn redact(&self, text: &str) -> String {
        match self.try_redact(text) {
            Ok(redacted) => redacted,
            Err(e) => {
                tracing::warn!(error = %e, "Entity recognition failed; returning text unredacted");
                text.to_string()
            }
        }
    }

    fn try_redact(&self, text: &str) -> anyhow::Result<String> {
        let categories = [
            (self.recognizer.people(text)?, PERSON_SENTINEL),
            (self.recognizer.organizations(text)?, ORGANIZATION_SENTINEL),
            (self.recognizer.places(text)?, LOCATION_SENTINEL),
        ];

        let mut result = text.to_string();
        for (spans, sentinel) in categories {
            let mut seen = HashSet::new();
            for span in spans {
                if span.trim().is_empty() || !seen.insert(span.clone()) {
                    continue;
                }
                result = result.replace(&span, sentinel);
            }
        }

        Ok(result)
    }
}

static PERSON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:Mr|Mrs|Ms|Dr|Prof)\.?\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+){0,2})").unwrap()
});

static ORGANIZATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:[A-Z][A-Za-z&]+\s+){1,3}(?:Inc|Corp|Corporation|LLC|Ltd|GmbH|Company|Laboratories|Labs)\b\.?",
    )
    .unwrap()
});

static CITY_STATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)?,\s+[A-Z]{2}\b").unwrap()
});

static PREPOSITION_PLACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:in|from|near)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)").unwrap()
});

/// Regex heuristics standing in for a statistical NER model
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicRecognizer;

impl HeuristicRecognizer {
    fn captures(re: &Regex, text: &str, group: usize) -> Vec<String> {
        re.captures_iter(text)
            .filter_map(|c| c.get(group))
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

impl EntityRecognizer for HeuristicRecognizer {
    fn people(&self, text: &str) -> anyhow::Result<Vec<String>> {
        Ok(Self::captures(&PERSON_RE, text, 1))
    }

    fn organizations(&self, text: &str) -> anyhow::Result<Vec<String>> {
        Ok(Self::captures(&ORGANIZATION_RE, text, 0))
    }

    fn places(&self, text: &str) -> anyhow::Result<Vec<String>> {
        let mut places = Self::captures(&CITY_STATE_RE, text, 0);
        places.extend(Self::captures(&PREPOSITION_PLACE_RE, text, 1));
        Ok(places)
    }
}
