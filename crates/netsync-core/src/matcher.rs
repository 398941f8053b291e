// ── Ordered regex relation rules ──
//
// A relation list maps subject names (host names, VLAN names, group names)
// to values through `"<regex> = <value>"` entries. Entries are compiled once
// at load time; evaluation returns the value of the first matching entry.

use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::error::CoreError;

/// A single `pattern = value` rule.
#[derive(Debug, Clone)]
pub struct RelationRule {
    pattern: Regex,
    value: String,
}

impl RelationRule {
    pub fn new(pattern: &str, value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        let rule_text = format!("{pattern} = {value}");
        if pattern.is_empty() || value.is_empty() {
            return Err(CoreError::InvalidRule {
                rule: rule_text,
                reason: "pattern and value must both be non-empty".into(),
            });
        }
        let pattern = Regex::new(pattern).map_err(|e| CoreError::InvalidRule {
            rule: rule_text,
            reason: e.to_string(),
        })?;
        Ok(Self { pattern, value })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn matches(&self, subject: &str) -> bool {
        self.pattern.is_match(subject)
    }
}

impl FromStr for RelationRule {
    type Err = CoreError;

    /// Parses `"<regex> = <value>"`, splitting on the last `=`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let Some((pattern, value)) = raw.rsplit_once('=') else {
            return Err(CoreError::InvalidRule {
                rule: raw.to_owned(),
                reason: "expected '<regex> = <value>'".into(),
            });
        };
        Self::new(pattern.trim(), value.trim())
    }
}

impl fmt::Display for RelationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.pattern.as_str(), self.value)
    }
}

/// Ordered list of relation rules. Order is the tie-break: first match wins.
#[derive(Debug, Clone, Default)]
pub struct RegexRelations {
    rules: Vec<RelationRule>,
}

impl RegexRelations {
    /// Compile every entry, failing on the first malformed one.
    pub fn parse<I, S>(entries: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = entries
            .into_iter()
            .map(|entry| entry.as_ref().parse())
            .collect::<Result<Vec<RelationRule>, _>>()?;
        Ok(Self { rules })
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let rules = pairs
            .into_iter()
            .map(|(pattern, value)| RelationRule::new(pattern, value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn rules(&self) -> &[RelationRule] {
        &self.rules
    }

    /// Value of the first rule whose pattern matches `subject`.
    pub fn match_value(&self, subject: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matches(subject))
            .map(RelationRule::value)
    }

    /// Values of every matching rule, in rule order.
    pub fn matching_values<'a>(&'a self, subject: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.rules
            .iter()
            .filter(move |rule| rule.matches(subject))
            .map(RelationRule::value)
    }
}
