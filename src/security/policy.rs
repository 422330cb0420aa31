use std::collections::HashSet;
use std::sync::LazyLock;

use crate::security::{
    FORBIDDEN_CHARACTERS, FORBIDDEN_PATH_PREFIXES, PROCESS_EXECUTION_BINARIES,
    SHELL_QUERY_BINARIES,
};

static PROCESS_EXECUTION: LazyLock<Policy> = LazyLock::new(|| Policy {
    name: "process-execution",
    allowed_binaries: PROCESS_EXECUTION_BINARIES.iter().copied().collect(),
    supports_directory_change: true,
    reject_argument_traversal: false,
    forbidden_characters: FORBIDDEN_CHARACTERS,
    forbidden_path_prefixes: FORBIDDEN_PATH_PREFIXES,
});

static SHELL_QUERY: LazyLock<Policy> = LazyLock::new(|| Policy {
    name: "shell-query",
    allowed_binaries: SHELL_QUERY_BINARIES.iter().copied().collect(),
    supports_directory_change: false,
    reject_argument_traversal: true,
    forbidden_characters: FORBIDDEN_CHARACTERS,
    forbidden_path_prefixes: FORBIDDEN_PATH_PREFIXES,
});

/// Allowlist/denylist tables a command is validated against.
///
/// Policies are built once per process and only ever handed out by shared
/// reference, so validation needs no synchronization.
#[derive(Debug)]
pub struct Policy {
    name: &'static str,
    allowed_binaries: HashSet<&'static str>,
    supports_directory_change: bool,
    reject_argument_traversal: bool,
    forbidden_characters: &'static [char],
    forbidden_path_prefixes: &'static [&'static str],
}

impl Policy {
    /// Policy for commands that install or build: `composer`, `which`, with an
    /// optional `cd <dir> &&` prefix.
    pub fn process_execution() -> &'static Policy {
        &PROCESS_EXECUTION
    }

    /// Policy for read-only introspection such as `which composer`.
    pub fn shell_query() -> &'static Policy {
        &SHELL_QUERY
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn allows_binary(&self, binary: &str) -> bool {
        self.allowed_binaries.contains(binary)
    }

    pub fn allowed_binaries(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.allowed_binaries.iter().copied()
    }

    pub fn supports_directory_change(&self) -> bool {
        self.supports_directory_change
    }

    /// Whether `..` segments in arguments (not only in a `cd` target) are refused.
    pub fn rejects_argument_traversal(&self) -> bool {
        self.reject_argument_traversal
    }

    pub fn is_forbidden_char(&self, c: char) -> bool {
        self.forbidden_characters.contains(&c)
    }

    /// Check whether `path` is one of the protected roots or lives beneath one.
    ///
    /// Repeated and trailing slashes are collapsed first, so `//etc/` and
    /// `/etc` compare equal.
    pub fn is_forbidden_path(&self, path: &str) -> bool {
        let normalized = collapse_slashes(path);

        self.forbidden_path_prefixes.iter().any(|prefix| {
            if *prefix == "/" {
                return normalized == "/";
            }
            normalized == *prefix
                || normalized
                    .strip_prefix(*prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_slash = false;

    for c in path.chars() {
        if c == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        out.push(c);
    }

    if out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}
