use rdx_core::{Error, Result, RulePattern};
use regex::{NoExpand, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Output of a text pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRedaction {
    pub text: String,
    pub matches_found: usize,
}

struct CompiledRule {
    regex: Regex,
    replacement: String,
    global: bool,
}

/// Applies an ordered rule list to text.
///
/// Rules run as sequential passes over one buffer, so a rule sees the
/// replacements written by every rule before it. Callers pass rules already
/// sorted by priority.
pub struct TextRedactor {
    rules: Vec<CompiledRule>,
}

impl TextRedactor {
    /// Compile rules, skipping any that fail to compile
    pub fn new(patterns: &[RulePattern]) -> Self {
        let rules = patterns
            .iter()
            .filter_map(|rule| match compile_rule(rule) {
                Ok(regex) => Some(CompiledRule {
                    regex,
                    replacement: rule.replacement.clone(),
                    global: rule.is_global,
                }),
                Err(e) => {
                    tracing::warn!(
                        pattern = %rule.pattern,
                        priority = rule.priority,
                        error = %e,
                        "Skipping redaction rule that failed to compile"
                    );
                    None
                }
            })
            .collect();

        Self { rules }
    }

    /// Number of rules that will be evaluated per pass
    pub fn patterns_applied(&self) -> usize {
        self.rules.len()
    }

    pub fn redact(&self, text: &str) -> TextRedaction {
        let mut buffer = text.to_string();
        let mut matches_found = 0;

        for rule in &self.rules {
            // Count against the buffer before this rule rewrites it
            let count = if rule.global {
                rule.regex.find_iter(&buffer).count()
            } else {
                usize::from(rule.regex.is_match(&buffer))
            };
            if count == 0 {
                continue;
            }
            matches_found += count;

            let replacement = NoExpand(rule.replacement.as_str());
            buffer = if rule.global {
                rule.regex.replace_all(&buffer, replacement).into_owned()
            } else {
                rule.regex.replacen(&buffer, 1, replacement).into_owned()
            };
        }

        TextRedaction {
            text: buffer,
            matches_found,
        }
    }
}

/// Build the matcher for one rule. Literal patterns are escaped.
pub fn compile_rule(rule: &RulePattern) -> Result<Regex> {
    if rule.pattern.is_empty() {
        return Err(Error::InvalidPattern {
            pattern: rule.pattern.clone(),
            reason: "empty pattern".to_string(),
        });
    }

    let source = if rule.is_regex {
        rule.pattern.clone()
    } else {
        regex::escape(&rule.pattern)
    };

    RegexBuilder::new(&source)
        .case_insensitive(!rule.case_sensitive)
        .build()
        .map_err(|e| Error::InvalidPattern {
            pattern: rule.pattern.clone(),
            reason: e.to_string(),
        })
}

/// One-shot form: compile `patterns` and redact `text`
pub fn redact_text(text: &str, patterns: &[RulePattern]) -> (String, usize) {
    let TextRedaction {
        text,
        matches_found,
    } = TextRedactor::new(patterns).redact(text);
    (text, matches_found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdx_core::default_rules;

    #[test]
    fn test_default_rules_on_contact_line() {
        let input = "Contact Dr. Jane Roe at jane.roe@example.com or 555-123-4567";
        let (redacted, matches) = redact_text(input, &default_rules());

        assert_eq!(
            redacted,
            "Contact [REDACTED-NAME] at [REDACTED-EMAIL] or [REDACTED-PHONE]"
        );
        assert_eq!(matches, 3);
    }

    #[test]
    fn test_ssn_and_parenthesized_phone() {
        let input = "SSN 123-45-6789, call (555) 987-6543.";
        let (redacted, matches) = redact_text(input, &default_rules());

        assert_eq!(redacted, "SSN [REDACTED-SSN], call [REDACTED-PHONE].");
        assert_eq!(matches, 2);
    }

    #[test]
    fn test_deterministic_output() {
        let rules = default_rules();
        let input = "Mr. John Smith (555) 111-2222 john@smith.org 321-54-9876";
        let first = redact_text(input, &rules);
        for _ in 0..10 {
            assert_eq!(redact_text(input, &rules), first);
        }
    }

    #[test]
    fn test_lower_priority_value_wins_overlap() {
        let p1 = RulePattern::literal("John Doe", "[REDACTED-P1]").with_priority(1);
        let p2 = RulePattern::regex(r"\b[A-Z][a-z]+ [A-Z][a-z]+\b", "[REDACTED-P2]")
            .with_priority(2)
            .case_sensitive();

        let (redacted, matches) = redact_text("Report by John Doe today", &[p1, p2]);

        assert_eq!(redacted, "Report by [REDACTED-P1] today");
        assert_eq!(matches, 1);
    }

    #[test]
    fn test_later_rule_sees_earlier_replacement() {
        let rules = vec![
            RulePattern::literal("badge", "ID 4417"),
            RulePattern::regex(r"\d+", "[NUM]"),
        ];

        let (redacted, matches) = redact_text("badge issued", &rules);

        assert_eq!(redacted, "ID [NUM] issued");
        assert_eq!(matches, 2);
    }

    #[test]
    fn test_malformed_rule_is_skipped() {
        let rules = vec![
            RulePattern::regex(r"(unclosed", "[X]"),
            RulePattern::literal("secret", "[S]"),
        ];

        let redactor = TextRedactor::new(&rules);
        let result = redactor.redact("a secret plan");

        assert_eq!(redactor.patterns_applied(), 1);
        assert_eq!(result.text, "a [S] plan");
        assert_eq!(result.matches_found, 1);
    }

    #[test]
    fn test_literal_is_escaped() {
        let rules = vec![RulePattern::literal("a.b", "[X]")];
        let (redacted, matches) = redact_text("axb a.b", &rules);

        assert_eq!(redacted, "axb [X]");
        assert_eq!(matches, 1);
    }

    #[test]
    fn test_case_sensitivity() {
        let insensitive = vec![RulePattern::literal("acme", "[ORG]")];
        let (redacted, matches) = redact_text("ACME and Acme", &insensitive);
        assert_eq!(redacted, "[ORG] and [ORG]");
        assert_eq!(matches, 2);

        let sensitive = vec![RulePattern::literal("acme", "[ORG]").case_sensitive()];
        let (redacted, matches) = redact_text("ACME and acme", &sensitive);
        assert_eq!(redacted, "ACME and [ORG]");
        assert_eq!(matches, 1);
    }

    #[test]
    fn test_first_only_rule() {
        let rules = vec![RulePattern::literal("lot", "[LOT]").first_only()];
        let (redacted, matches) = redact_text("lot 1, lot 2", &rules);

        assert_eq!(redacted, "[LOT] 1, lot 2");
        assert_eq!(matches, 1);
    }

    #[test]
    fn test_replacement_is_literal() {
        let rules = vec![RulePattern::regex(r"(\d{4})", "$1-hidden")];
        let (redacted, _) = redact_text("code 1234", &rules);

        assert_eq!(redacted, "code $1-hidden");
    }

    #[test]
    fn test_empty_pattern_rejected() {
        let rule = RulePattern::literal("", "[X]");
        assert!(matches!(
            compile_rule(&rule),
            Err(Error::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_no_matches_leaves_text() {
        let content = "Device classification: Class II";
        let (redacted, matches) = redact_text(content, &default_rules());

        assert_eq!(redacted, content);
        assert_eq!(matches, 0);
    }
}
