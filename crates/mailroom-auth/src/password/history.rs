//! Password reuse history.
//!
//! The history column holds a JSON array of previous digests, oldest first.
//! A new password must not verify against any of the last `keep` digests;
//! on change the new digest is appended and the list truncated to
//! `keep + 1` entries (the current digest plus its predecessors).

use super::hasher::PasswordHasher;

/// Whether `candidate` matches one of the last `keep` digests in the
/// stored history. Malformed history is treated as empty.
pub fn contains(
    hasher: &PasswordHasher,
    candidate: &str,
    history_json: Option<&str>,
    keep: usize,
) -> bool {
    let digests = parse(history_json);
    digests
        .iter()
        .rev()
        .take(keep)
        .any(|digest| hasher.verify(candidate, digest).unwrap_or(false))
}

/// Append `new_digest` to the history and truncate to `keep + 1` entries,
/// evicting the oldest.
pub fn push(new_digest: &str, history_json: Option<&str>, keep: usize) -> String {
    let mut digests = parse(history_json);
    digests.push(new_digest.to_string());
    let excess = digests.len().saturating_sub(keep + 1);
    digests.drain(..excess);
    serde_json::to_string(&digests).unwrap_or_else(|_| "[]".to_string())
}

fn parse(history_json: Option<&str>) -> Vec<String> {
    history_json
        .and_then(|raw| serde_json::from_str::<Vec<String>>(raw).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::with_params(1, 8, 1)
    }

    #[test]
    fn recent_password_is_detected() {
        let hasher = hasher();
        let digest = hasher.hash("Old-Password-1!").unwrap();
        let history = push(&digest, None, 3);
        assert!(contains(&hasher, "Old-Password-1!", Some(&history), 3));
        assert!(!contains(&hasher, "New-Password-2!", Some(&history), 3));
    }

    #[test]
    fn history_is_bounded_and_evicts_oldest() {
        let hasher = hasher();
        let digests: Vec<String> = (0..5)
            .map(|i| hasher.hash(&format!("Password-{i}!Aa")).unwrap())
            .collect();

        let mut history: Option<String> = None;
        for digest in &digests {
            history = Some(push(digest, history.as_deref(), 3));
        }

        let stored: Vec<String> = serde_json::from_str(history.as_ref().unwrap()).unwrap();
        assert_eq!(stored.len(), 4);
        // The two oldest digests were evicted.
        assert!(!stored.contains(&digests[0]));
        assert!(!stored.contains(&digests[1]));
        assert!(stored.contains(&digests[4]));
    }

    #[test]
    fn malformed_history_is_treated_as_empty() {
        let hasher = hasher();
        assert!(!contains(&hasher, "Whatever-1!Aa", Some("not json"), 3));
        let history = push("digest", Some("not json"), 3);
        let stored: Vec<String> = serde_json::from_str(&history).unwrap();
        assert_eq!(stored, vec!["digest".to_string()]);
    }
}
