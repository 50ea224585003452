//! Archive path classification.
//!
//! The upload convention is `{event}/{flow}/{speech}/{member}/{file}`:
//! exactly five `/`-separated segments, none empty. Anything else (OS
//! metadata, thumbnails, stray readme files, nested-too-deep folders) is
//! rejected so the caller can skip it. Archives assembled by non-technical
//! operators always contain junk, and one stray file must never fail a
//! whole ingestion.

use std::fmt;

/// A path that matched the upload convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub event_name: String,
    pub flow_name: String,
    pub speech_name: String,
    pub member_name: String,
    pub file_name: String,
}

/// A path that did not match, with a human-readable reason for the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    pub path: String,
    pub reason: String,
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

const EXPECTED_SEGMENTS: usize = 5;

/// Classify one archive-internal path against the upload convention.
pub fn classify(path: &str) -> Result<ParsedPath, Rejected> {
    if path.ends_with('/') {
        return Err(Rejected {
            path: path.to_string(),
            reason: "directory entry".to_string(),
        });
    }

    let segments: Vec<&str> = path.split('/').collect();

    if segments.len() != EXPECTED_SEGMENTS {
        return Err(Rejected {
            path: path.to_string(),
            reason: format!(
                "expected {} path segments, found {}",
                EXPECTED_SEGMENTS,
                segments.len()
            ),
        });
    }

    if segments.iter().any(|s| s.is_empty()) {
        return Err(Rejected {
            path: path.to_string(),
            reason: "empty path segment".to_string(),
        });
    }

    Ok(ParsedPath {
        event_name: segments[0].to_string(),
        flow_name: segments[1].to_string(),
        speech_name: segments[2].to_string(),
        member_name: segments[3].to_string(),
        file_name: segments[4].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exactly_five_segments() {
        let parsed = classify("EventA/Morning/Solo/Jane/p1.jpg").unwrap();
        assert_eq!(parsed.event_name, "EventA");
        assert_eq!(parsed.flow_name, "Morning");
        assert_eq!(parsed.speech_name, "Solo");
        assert_eq!(parsed.member_name, "Jane");
        assert_eq!(parsed.file_name, "p1.jpg");
    }

    #[test]
    fn rejects_too_few_segments() {
        let rejected = classify("readme.txt").unwrap_err();
        assert!(rejected.reason.contains("found 1"));

        assert!(classify("EventA/Morning/Solo/p1.jpg").is_err());
    }

    #[test]
    fn rejects_too_many_segments() {
        assert!(classify("EventA/Morning/Solo/Jane/extra/p1.jpg").is_err());
    }

    #[test]
    fn rejects_directory_entries() {
        let rejected = classify("EventA/Morning/Solo/Jane/").unwrap_err();
        assert_eq!(rejected.reason, "directory entry");
    }

    #[test]
    fn rejects_empty_segments() {
        let rejected = classify("EventA//Solo/Jane/p1.jpg").unwrap_err();
        assert_eq!(rejected.reason, "empty path segment");
    }

    #[test]
    fn rejects_hidden_os_metadata() {
        // Typical junk from operator-built archives.
        assert!(classify("__MACOSX/._p1.jpg").is_err());
        assert!(classify(".DS_Store").is_err());
    }
}
