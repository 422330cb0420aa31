// Keeps the policy tables and the policies built from them in sync

use cmdguard::security::{
    CommandValidator, FORBIDDEN_CHARACTERS, FORBIDDEN_PATH_PREFIXES, PROCESS_EXECUTION_BINARIES,
    Policy, SHELL_QUERY_BINARIES,
};
use std::collections::HashSet;

#[test]
fn test_shell_query_is_subset_of_process_execution() {
    for binary in SHELL_QUERY_BINARIES {
        assert!(
            PROCESS_EXECUTION_BINARIES.contains(binary),
            "query binary {} missing from process-execution allowlist",
            binary
        );
    }
}

#[test]
fn test_policies_match_tables() {
    let process: HashSet<&str> = Policy::process_execution().allowed_binaries().collect();
    let query: HashSet<&str> = Policy::shell_query().allowed_binaries().collect();

    let expected_process: HashSet<&str> = PROCESS_EXECUTION_BINARIES.iter().copied().collect();
    let expected_query: HashSet<&str> = SHELL_QUERY_BINARIES.iter().copied().collect();

    assert_eq!(process, expected_process);
    assert_eq!(query, expected_query);
}

#[test]
fn test_validator_accepts_every_allowed_binary() {
    for (policy, binaries) in [
        (Policy::process_execution(), PROCESS_EXECUTION_BINARIES),
        (Policy::shell_query(), SHELL_QUERY_BINARIES),
    ] {
        let validator = CommandValidator::new(policy);
        for binary in binaries {
            let command = format!("{} --version", binary);
            let result = validator.validate(&command);
            assert!(
                result.is_ok(),
                "{} policy rejected allowed binary '{}': {:?}",
                policy.name(),
                binary,
                result.err()
            );
        }
    }
}

#[test]
fn test_forbidden_characters_cover_shell_operators() {
    for c in [';', '&', '|', '`', '$', '<', '>'] {
        assert!(FORBIDDEN_CHARACTERS.contains(&c), "missing {:?}", c);
    }
    assert!(!FORBIDDEN_CHARACTERS.contains(&'"'));
    assert!(!FORBIDDEN_CHARACTERS.contains(&'\''));
}

#[test]
fn test_forbidden_prefixes_are_absolute() {
    for prefix in FORBIDDEN_PATH_PREFIXES {
        assert!(prefix.starts_with('/'), "prefix {} is not absolute", prefix);
        assert!(Policy::process_execution().is_forbidden_path(prefix));
    }
}

#[test]
fn test_no_duplicates_in_tables() {
    let mut seen = HashSet::new();
    for entry in PROCESS_EXECUTION_BINARIES
        .iter()
        .chain(FORBIDDEN_PATH_PREFIXES.iter())
    {
        assert!(seen.insert(entry), "Duplicate entry in policy tables: {}", entry);
    }
}
