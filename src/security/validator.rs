use std::borrow::Cow;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::security::Policy;

/// `cd <dir> && <rest>`, where `<dir>` is double-quoted, single-quoted or a bare token.
static DIRECTORY_CHANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*cd\s+(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<bare>[^\s"']\S*))\s+(?P<join>&&)\s+(?P<rest>.+)$"#,
    )
    .expect("directory change pattern must compile")
});

/// Characters of context shown on each side of a dangerous character.
const CONTEXT_CHARS: usize = 10;

/// Category of a rejected command, in the order the checks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    PathTraversal,
    DisallowedSystemPath,
    DangerousCharacter,
    UnauthorizedCommand,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::PathTraversal => "path_traversal",
            ViolationKind::DisallowedSystemPath => "disallowed_system_path",
            ViolationKind::DangerousCharacter => "dangerous_character",
            ViolationKind::UnauthorizedCommand => "unauthorized_command",
        }
    }
}

/// A command refused by the validator.
///
/// The same input always yields the same kind under the same policy; callers
/// must build a different command rather than retry.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{}", describe(.kind, .detail))]
pub struct SecurityError {
    kind: ViolationKind,
    detail: String,
}

fn describe(kind: &ViolationKind, detail: &str) -> String {
    match kind {
        ViolationKind::UnauthorizedCommand => format!("Commande non autorisée: {}", detail),
        ViolationKind::PathTraversal => {
            format!("Chemin invalide, path traversal détecté: {}", detail)
        }
        ViolationKind::DisallowedSystemPath => format!("Chemin système non autorisé: {}", detail),
        ViolationKind::DangerousCharacter => format!("Caractères dangereux détectés: {}", detail),
    }
}

impl SecurityError {
    pub fn new(kind: ViolationKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ViolationKind {
        self.kind
    }

    /// The offending substring: binary, path, or character with context.
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

/// An approved command, split into its optional `cd` target and the command proper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedCommand {
    pub directory_change: Option<String>,
    pub remainder: String,
}

impl ParsedCommand {
    /// The exact text handed to the shell.
    ///
    /// Directories that are not plain path tokens are single-quoted again so
    /// the shell receives the argument that was validated. A leading `~` is
    /// therefore passed literally and never expanded.
    pub fn command_line(&self) -> String {
        match &self.directory_change {
            Some(dir) => format!("cd {} && {}", quote_arg(dir), self.remainder),
            None => self.remainder.clone(),
        }
    }

    /// The binary named by the command, with surrounding quotes removed.
    pub fn binary(&self) -> &str {
        first_token(&self.remainder)
    }
}

/// Quote `arg` for a POSIX shell unless it is made only of path-safe characters.
pub fn quote_arg(arg: &str) -> Cow<'_, str> {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/' | '-'));

    if plain {
        Cow::Borrowed(arg)
    } else {
        Cow::Owned(format!("'{}'", arg.replace('\'', r"'\''")))
    }
}

/// Validates raw command strings against a single [`Policy`].
#[derive(Debug, Clone, Copy)]
pub struct CommandValidator<'p> {
    policy: &'p Policy,
}

impl CommandValidator<'static> {
    pub fn process_execution() -> Self {
        Self::new(Policy::process_execution())
    }

    pub fn shell_query() -> Self {
        Self::new(Policy::shell_query())
    }
}

impl<'p> CommandValidator<'p> {
    pub fn new(policy: &'p Policy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &'p Policy {
        self.policy
    }

    /// Validate a raw command.
    ///
    /// Checks run in a fixed order and stop at the first failure: `cd` path
    /// traversal, system path, dangerous characters, argument traversal when
    /// the policy asks for it, then the binary allowlist.
    pub fn validate(&self, raw: &str) -> Result<ParsedCommand, SecurityError> {
        let split = self.split_directory_change(raw);

        if let Some(dir) = split.directory {
            if has_traversal_segment(dir) {
                return Err(SecurityError::new(ViolationKind::PathTraversal, dir));
            }
        }

        if let Some(dir) = split.directory {
            if self.policy.is_forbidden_path(dir) {
                return Err(SecurityError::new(ViolationKind::DisallowedSystemPath, dir));
            }
        }

        self.check_dangerous_characters(raw, split.join.as_ref())?;

        if self.policy.rejects_argument_traversal() {
            self.check_argument_traversal(split.rest)?;
        }

        let binary = first_token(split.rest);
        if !self.policy.allows_binary(binary) {
            return Err(SecurityError::new(ViolationKind::UnauthorizedCommand, binary));
        }

        Ok(ParsedCommand {
            directory_change: split.directory.map(str::to_string),
            remainder: split.rest.to_string(),
        })
    }

    fn split_directory_change<'a>(&self, raw: &'a str) -> Split<'a> {
        let unsplit = Split {
            directory: None,
            join: None,
            rest: raw,
        };

        if !self.policy.supports_directory_change() {
            return unsplit;
        }

        let Some(caps) = DIRECTORY_CHANGE.captures(raw) else {
            return unsplit;
        };

        let directory = caps
            .name("dq")
            .or_else(|| caps.name("sq"))
            .or_else(|| caps.name("bare"))
            .map(|m| m.as_str());

        match (directory, caps.name("join"), caps.name("rest")) {
            (Some(directory), Some(join), Some(rest)) => Split {
                directory: Some(directory),
                join: Some(join.range()),
                rest: rest.as_str().trim_end(),
            },
            _ => unsplit,
        }
    }

    fn check_argument_traversal(&self, command: &str) -> Result<(), SecurityError> {
        for token in command.split_whitespace().map(strip_quotes) {
            if has_traversal_segment(token) {
                return Err(SecurityError::new(ViolationKind::PathTraversal, token));
            }
        }
        Ok(())
    }

    /// Scan the whole raw string; only the `&&` consumed as the `cd` join is exempt.
    fn check_dangerous_characters(
        &self,
        raw: &str,
        join: Option<&Range<usize>>,
    ) -> Result<(), SecurityError> {
        for (idx, c) in raw.char_indices() {
            if join.is_some_and(|range| range.contains(&idx)) {
                continue;
            }
            if self.policy.is_forbidden_char(c) {
                return Err(SecurityError::new(
                    ViolationKind::DangerousCharacter,
                    format!("{:?} près de \"{}\"", c, context_around(raw, idx)),
                ));
            }
        }
        Ok(())
    }
}

/// Validate `raw` against `policy`.
pub fn validate(raw: &str, policy: &Policy) -> Result<ParsedCommand, SecurityError> {
    CommandValidator::new(policy).validate(raw)
}

struct Split<'a> {
    directory: Option<&'a str>,
    join: Option<Range<usize>>,
    rest: &'a str,
}

fn first_token(command: &str) -> &str {
    command
        .split_whitespace()
        .next()
        .map(strip_quotes)
        .unwrap_or("")
}

fn strip_quotes(token: &str) -> &str {
    token.trim_matches(|c| c == '"' || c == '\'')
}

fn has_traversal_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| segment == "..")
}

fn context_around(raw: &str, idx: usize) -> String {
    let start = raw[..idx]
        .char_indices()
        .rev()
        .nth(CONTEXT_CHARS - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let end = raw[idx..]
        .char_indices()
        .nth(CONTEXT_CHARS + 1)
        .map(|(i, _)| idx + i)
        .unwrap_or(raw.len());

    raw[start..end].escape_debug().to_string()
}
