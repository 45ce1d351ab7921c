use chrono::{DateTime, Utc};
use git2::Oid;
use regex::Regex;

use crate::config::TrailersConfig;
use crate::error::{LineageError, Result};
use crate::git::CommitData;

/// Matches `+semver:` trailer lines in commit messages.
///
/// A trailer is a trimmed message line of the form `+semver: breaking`.
/// Matching is case-sensitive and the breaking/feature vocabularies are
/// independent of each other.
#[derive(Debug, Clone)]
pub struct TrailerMatcher {
    breaking: Regex,
    feature: Regex,
}

impl TrailerMatcher {
    /// Build a matcher from the configured trailer vocabulary.
    pub fn new(config: &TrailersConfig) -> Result<Self> {
        Ok(TrailerMatcher {
            breaking: Self::pattern(&config.prefix, &config.breaking_tokens)?,
            feature: Self::pattern(&config.prefix, &config.feature_tokens)?,
        })
    }

    fn pattern(prefix: &str, tokens: &[String]) -> Result<Regex> {
        let alternatives: Vec<String> = tokens.iter().map(|t| regex::escape(t)).collect();
        let pattern = format!(
            "^{}\\s*({})$",
            regex::escape(prefix),
            alternatives.join("|")
        );
        Regex::new(&pattern)
            .map_err(|e| LineageError::config(format!("Invalid trailer pattern: {}", e)))
    }

    /// True if any trimmed message line carries a breaking trailer.
    pub fn is_breaking(&self, message: &str) -> bool {
        message.lines().any(|line| self.breaking.is_match(line.trim()))
    }

    /// True if any trimmed message line carries a feature trailer.
    pub fn is_feature(&self, message: &str) -> bool {
        message.lines().any(|line| self.feature.is_match(line.trim()))
    }
}

/// An immutable commit record with its derived trailer flags.
///
/// Owned exclusively by the session's commit cache and shared by reference;
/// never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// The commit identity (content hash)
    pub id: Oid,
    /// Parent identities, in commit order
    pub parents: Vec<Oid>,
    /// Author name
    pub author: String,
    /// Author timestamp, in UTC
    pub authored_at: DateTime<Utc>,
    /// Committer name
    pub committer: String,
    /// Committer timestamp, in UTC
    pub committed_at: DateTime<Utc>,
    /// Full message text
    pub message: String,
    /// True if the message carries a breaking-change trailer
    pub is_breaking: bool,
    /// True if the message carries a feature trailer
    pub is_feature: bool,
}

impl Commit {
    /// Build a commit record from raw backend facts, deriving the trailer
    /// flags from the message.
    pub fn from_data(data: CommitData, matcher: &TrailerMatcher) -> Self {
        let is_breaking = matcher.is_breaking(&data.message);
        let is_feature = matcher.is_feature(&data.message);

        Commit {
            id: data.id,
            parents: data.parents,
            author: data.author,
            authored_at: data.authored_at,
            committer: data.committer,
            committed_at: data.committed_at,
            message: data.message,
            is_breaking,
            is_feature,
        }
    }

    /// The single parent of a linear-history commit.
    ///
    /// Returns `Ok(None)` for a root commit and an error for a merge commit,
    /// which the lineage traversals cannot fold across.
    pub fn linear_parent(&self) -> Result<Option<Oid>> {
        match self.parents.as_slice() {
            [] => Ok(None),
            [parent] => Ok(Some(*parent)),
            _ => Err(LineageError::history(format!(
                "Commit {} has {} parents; history must be linear",
                self.id,
                self.parents.len()
            ))),
        }
    }

    /// First four hex characters of the commit hash, as used in prerelease labels.
    pub fn short_hash(&self) -> String {
        self.id.to_string().chars().take(4).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn oid(n: u8) -> Oid {
        Oid::from_bytes(&[n; 20]).unwrap()
    }

    fn matcher() -> TrailerMatcher {
        TrailerMatcher::new(&TrailersConfig::default()).unwrap()
    }

    fn data(id: Oid, parents: Vec<Oid>, message: &str) -> CommitData {
        let when = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        CommitData {
            id,
            parents,
            author: "Author".to_string(),
            authored_at: when,
            committer: "Committer".to_string(),
            committed_at: when,
            message: message.to_string(),
        }
    }

    fn commit_with_message(message: &str) -> Commit {
        Commit::from_data(data(oid(1), vec![], message), &matcher())
    }

    #[test]
    fn test_breaking_trailer() {
        assert!(commit_with_message("Change API\n\n+semver: breaking").is_breaking);
        assert!(commit_with_message("Change API\n\n+semver: major").is_breaking);
        assert!(!commit_with_message("Change API\n\n+semver: breaking").is_feature);
    }

    #[test]
    fn test_feature_trailer() {
        assert!(commit_with_message("Add login\n\n+semver: feature").is_feature);
        assert!(commit_with_message("Add login\n\n+semver: minor").is_feature);
        assert!(!commit_with_message("Add login\n\n+semver: feature").is_breaking);
    }

    #[test]
    fn test_independent_flags() {
        let c = commit_with_message("Rework\n\n+semver: breaking\n+semver: feature");
        assert!(c.is_breaking);
        assert!(c.is_feature);
    }

    #[test]
    fn test_trailer_requires_whole_line() {
        assert!(!commit_with_message("mention +semver: breaking inline").is_breaking);
        assert!(!commit_with_message("+semver: breaking change ahead").is_breaking);
    }

    #[test]
    fn test_trailer_line_is_trimmed() {
        assert!(commit_with_message("msg\n\n  +semver: breaking  ").is_breaking);
    }

    #[test]
    fn test_trailer_matching_is_case_sensitive() {
        assert!(!commit_with_message("msg\n\n+SEMVER: breaking").is_breaking);
        assert!(!commit_with_message("msg\n\n+semver: BREAKING").is_breaking);
    }

    #[test]
    fn test_no_trailer() {
        let c = commit_with_message("Plain commit message");
        assert!(!c.is_breaking);
        assert!(!c.is_feature);
    }

    #[test]
    fn test_linear_parent() {
        let root = commit_with_message("root");
        assert_eq!(root.linear_parent().unwrap(), None);

        let child = Commit::from_data(data(oid(2), vec![oid(1)], "child"), &matcher());
        assert_eq!(child.linear_parent().unwrap(), Some(oid(1)));

        let merge = Commit::from_data(data(oid(3), vec![oid(1), oid(2)], "merge"), &matcher());
        assert!(merge.linear_parent().is_err());
    }

    #[test]
    fn test_short_hash() {
        let c = commit_with_message("msg");
        assert_eq!(c.short_hash(), "0101");
    }
}
