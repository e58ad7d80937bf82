//! Shared User-Agent string for every portal request.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/course-sync";

/// Default User-Agent (identifies the tool and its version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("course-sync/{version} (+{PROJECT_UA_URL})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_carries_version_and_url() {
        let ua = default_user_agent();
        assert!(ua.contains(PROJECT_UA_URL), "Expected project URL in: {ua}");
        assert_eq!(
            ua.strip_prefix("course-sync/")
                .and_then(|s| s.split(' ').next()),
            Some(env!("CARGO_PKG_VERSION")),
            "Expected crate version in: {ua}"
        );
    }
}
