//! Settings discovery and the immutable [`EffectiveConfig`] one invocation
//! evaluates against.
//!
//! Search order: `$CLAUDE_PROJECT_DIR/.claude/settings.json` (falling back
//! to `./.claude/settings.json` when the env var is unset), then
//! `~/.claude/settings.json`. The first file that parses as JSON and
//! contains a `readonlyBashHook` key wins; anything else — missing file,
//! missing key, malformed JSON, wrong-typed field — silently falls back to
//! the default for that one field. A broken `extraCommands` array doesn't
//! poison `features.gitLocalWrites` if that field parses cleanly.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::fragment::{CommandFragment, HandlerOutcome};
use crate::handlers;
use crate::pipeline::Evaluator;

pub type HandlerFn = fn(&CommandFragment, &EffectiveConfig, &dyn Evaluator) -> HandlerOutcome;

/// The fixed default whitelist. Includes the three dangerous-mode
/// executables (`sed`, `find`, `xargs`) even though they're also
/// handler-gated: a handler's `Pass` only means "defer to the rest of the
/// pipeline", not "approve", so the executable still needs to clear the
/// whitelist afterward.
static DEFAULT_WHITELIST: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // display / output
        "echo", "printf", "cat", "head", "tail", "less", "more",
        // listing / finding
        "ls", "tree", "find", "fd", "locate", "which", "whereis", "type",
        // read-only text processing
        "grep", "rg", "cut", "sort", "uniq", "wc", "tr", "column", "paste", "join", "comm",
        "diff", "cmp", "fold", "fmt", "nl", "rev", "tac", "expand", "unexpand", "pr", "strings",
        "ag", "jq", "yq", "sed", "xargs",
        // checksums / encoding
        "sha256sum", "sha1sum", "md5sum", "cksum", "b2sum", "xxd", "hexdump", "od",
        // file info
        "file", "stat", "du", "df", "lsof", "readlink", "realpath", "basename", "dirname",
        // process / system info
        "ps", "top", "htop", "pgrep", "uptime", "whoami", "id", "groups", "uname", "hostname",
        // shell builtins-as-commands
        "true", "false", "test", "[", "read",
        // awk family: whitelisted but only reachable past never_approve/the
        // handler gate when awk_safe_mode is on (see `finalize`).
        "awk", "gawk", "mawk", "nawk",
    ]
    .into_iter()
    .collect()
});

/// Commands that are never approved regardless of arguments: shells,
/// interpreters, and anything that can itself execute arbitrary code. The
/// awk family starts here too — moved out by `finalize` when
/// `awk_safe_mode` is enabled, in favor of the handler gate.
static DEFAULT_NEVER_APPROVE: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "bash", "sh", "zsh", "ksh", "dash", "fish", "csh", "tcsh", "eval", "exec", "source", ".",
        "sudo", "su", "doas", "parallel", "python", "python3", "perl", "ruby", "node", "php",
        "awk", "gawk", "mawk", "nawk",
    ]
    .into_iter()
    .collect()
});

/// Wrapper commands that are transparently unwrapped before classification
/// (`env VAR=1 cmd`, `nice -n10 cmd`, ...).
static DEFAULT_WRAPPERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["env", "nice", "time", "command", "nohup"]
        .into_iter()
        .collect()
});

/// The always-on read-only git subcommands. `branch`/`tag`/`remote`/
/// `stash`/`add`/`config` are added only when `gitLocalWrites` is on — see
/// `finalize`.
static GIT_READONLY_SUBCOMMANDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "blame", "diff", "log", "ls-files", "ls-tree", "rev-parse", "show", "show-ref", "status",
    ]
    .into_iter()
    .collect()
});

static GIT_LOCAL_WRITE_SUBCOMMANDS: &[&str] =
    &["branch", "tag", "remote", "stash", "add", "config"];

const AWK_FAMILY: &[&str] = &["awk", "gawk", "mawk", "nawk"];

const SETTINGS_KEY: &str = "readonlyBashHook";

/// The fully-resolved configuration one invocation evaluates against.
/// Immutable once built; unrecognized JSON fields are preserved in
/// `unknown` so they round-trip harmlessly rather than erroring.
pub struct EffectiveConfig {
    pub whitelist: HashSet<String>,
    pub never_approve: HashSet<String>,
    pub wrappers: HashSet<&'static str>,
    pub handlers: HashMap<String, HandlerFn>,
    pub subcommand_whitelist: HashMap<String, HashSet<String>>,
    pub feature_git_local_writes: bool,
    pub feature_awk_safe_mode: bool,
    pub unknown: serde_json::Map<String, Value>,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        let mut handlers: HashMap<String, HandlerFn> = HashMap::new();
        handlers.insert("sed".to_string(), handlers::handle_sed);
        handlers.insert("find".to_string(), handlers::handle_find);
        handlers.insert("xargs".to_string(), handlers::handle_xargs);

        let mut subcommand_whitelist: HashMap<String, HashSet<String>> = HashMap::new();
        subcommand_whitelist.insert(
            "git".to_string(),
            GIT_READONLY_SUBCOMMANDS.iter().map(|s| s.to_string()).collect(),
        );

        EffectiveConfig {
            whitelist: DEFAULT_WHITELIST.iter().map(|s| s.to_string()).collect(),
            never_approve: DEFAULT_NEVER_APPROVE
                .iter()
                .map(|s| s.to_string())
                .collect(),
            wrappers: DEFAULT_WRAPPERS.clone(),
            handlers,
            subcommand_whitelist,
            feature_git_local_writes: false,
            feature_awk_safe_mode: false,
            unknown: serde_json::Map::new(),
        }
    }
}

impl EffectiveConfig {
    /// Discover and load settings for this invocation, falling back to
    /// defaults field-by-field on any error.
    pub fn load() -> Self {
        let mut config = EffectiveConfig::default();

        for path in candidate_settings_paths() {
            if let Some(section) = read_section(&path) {
                apply_section(&mut config, section);
                config.finalize();
                return config;
            }
        }
        config.finalize();
        config
    }

    /// Load settings from a single explicit path, skipping the usual
    /// project/user search. Used by `--config` for tests and debugging.
    pub fn load_from(path: &Path) -> Self {
        let mut config = EffectiveConfig::default();
        if let Some(section) = read_section(path) {
            apply_section(&mut config, section);
        }
        config.finalize();
        config
    }

    /// Reconcile feature flags with the tables they gate, once all
    /// settings fields have been applied. `pub(crate)` so tests elsewhere
    /// in the crate can flip a flag on an already-built config and re-sync
    /// it without going through the settings-file path.
    pub(crate) fn finalize(&mut self) {
        if self.feature_git_local_writes {
            let entry = self
                .subcommand_whitelist
                .entry("git".to_string())
                .or_default();
            for sub in GIT_LOCAL_WRITE_SUBCOMMANDS {
                entry.insert(sub.to_string());
            }
        }

        if self.feature_awk_safe_mode {
            for name in AWK_FAMILY {
                self.never_approve.remove(*name);
                self.handlers.insert(name.to_string(), handlers::handle_awk);
            }
        } else {
            for name in AWK_FAMILY {
                self.never_approve.insert(name.to_string());
                self.handlers.remove(*name);
            }
        }
    }

    pub fn is_wrapper(&self, name: &str) -> bool {
        self.wrappers.contains(name)
    }

    pub fn is_never_approved(&self, name: &str) -> bool {
        self.never_approve.contains(name)
    }

    pub fn is_whitelisted(&self, name: &str) -> bool {
        self.whitelist.contains(name)
    }

    pub fn handler_for(&self, name: &str) -> Option<HandlerFn> {
        self.handlers.get(name).copied()
    }

    pub fn subcommand_is_whitelisted(&self, program: &str, subcommand: &str) -> bool {
        self.subcommand_whitelist
            .get(program)
            .map(|set| set.contains(subcommand))
            .unwrap_or(false)
    }

    /// `git config` writes are only considered local when neither
    /// `--global` nor `--system` is present; used by the subcommand-
    /// whitelist pipeline step to reject non-local config writes even when
    /// `gitLocalWrites` is on.
    pub fn is_non_local_git_config_write(&self, args: &[String]) -> bool {
        self.feature_git_local_writes
            && args.iter().any(|a| a == "--global" || a == "--system")
    }
}

fn candidate_settings_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    let project_dir = std::env::var("CLAUDE_PROJECT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));
    paths.push(project_dir.join(".claude").join("settings.json"));

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".claude").join("settings.json"));
    }

    paths
}

/// Read `path`, parse as JSON, and pull out the `readonlyBashHook` object.
/// Returns `None` for any failure at all — missing file, bad JSON, missing
/// or non-object key — so the caller moves on to the next candidate path.
fn read_section(path: &Path) -> Option<Value> {
    let raw = std::fs::read_to_string(path).ok()?;
    let parsed: Value = serde_json::from_str(&raw).ok()?;
    let section = parsed.get(SETTINGS_KEY)?.clone();
    if section.is_object() {
        Some(section)
    } else {
        None
    }
}

/// Overlay a parsed `readonlyBashHook` object onto an already-defaulted
/// config, field by field. A malformed field is skipped, not fatal.
///
/// Recognized keys (spec.md §6): `extraCommands`, `removeCommands`,
/// `extraNeverApprove`, `features.gitLocalWrites`, `features.awkSafeMode`,
/// `subcommandWhitelist` (map of executable name to a list of
/// subcommands, unioned with the built-in defaults for `git`).
fn apply_section(config: &mut EffectiveConfig, section: Value) {
    let Value::Object(map) = section else {
        return;
    };

    if let Some(extra) = map.get("extraCommands").and_then(Value::as_array) {
        for v in extra {
            if let Some(s) = v.as_str() {
                config.whitelist.insert(s.to_string());
            }
        }
    }

    if let Some(removed) = map.get("removeCommands").and_then(Value::as_array) {
        for v in removed {
            if let Some(s) = v.as_str() {
                config.whitelist.remove(s);
            }
        }
    }

    if let Some(extra) = map.get("extraNeverApprove").and_then(Value::as_array) {
        for v in extra {
            if let Some(s) = v.as_str() {
                config.never_approve.insert(s.to_string());
            }
        }
    }

    if let Some(features) = map.get("features").and_then(Value::as_object) {
        if let Some(b) = features.get("gitLocalWrites").and_then(Value::as_bool) {
            config.feature_git_local_writes = b;
        }
        if let Some(b) = features.get("awkSafeMode").and_then(Value::as_bool) {
            config.feature_awk_safe_mode = b;
        }
    }

    if let Some(subcommands) = map.get("subcommandWhitelist").and_then(Value::as_object) {
        for (program, subs) in subcommands {
            let Some(subs) = subs.as_array() else {
                continue;
            };
            let entry = config
                .subcommand_whitelist
                .entry(program.clone())
                .or_default();
            for v in subs {
                if let Some(s) = v.as_str() {
                    entry.insert(s.to_string());
                }
            }
        }
    }

    for (key, value) in map {
        if !matches!(
            key.as_str(),
            "extraCommands"
                | "removeCommands"
                | "extraNeverApprove"
                | "features"
                | "subcommandWhitelist"
        ) {
            config.unknown.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_whitelist_common_readonly_tools() {
        let config = EffectiveConfig::default();
        assert!(config.is_whitelisted("cat"));
        assert!(config.is_whitelisted("grep"));
        assert!(!config.is_whitelisted("rm"));
    }

    #[test]
    fn defaults_whitelist_includes_dangerous_mode_executables() {
        let config = EffectiveConfig::default();
        assert!(config.is_whitelisted("sed"));
        assert!(config.is_whitelisted("find"));
        assert!(config.is_whitelisted("xargs"));
    }

    #[test]
    fn defaults_never_approve_interpreters_and_shells() {
        let config = EffectiveConfig::default();
        assert!(config.is_never_approved("bash"));
        assert!(config.is_never_approved("eval"));
        assert!(config.is_never_approved("sudo"));
    }

    #[test]
    fn awk_is_never_approved_until_safe_mode_is_enabled() {
        let mut config = EffectiveConfig::default();
        config.finalize();
        assert!(config.is_never_approved("awk"));
        assert!(config.handler_for("awk").is_none());

        config.feature_awk_safe_mode = true;
        config.finalize();
        assert!(!config.is_never_approved("awk"));
        assert!(config.handler_for("awk").is_some());
    }

    #[test]
    fn malformed_section_keeps_remaining_defaults() {
        let mut config = EffectiveConfig::default();
        let section: Value = serde_json::from_str(
            r#"{"extraCommands": "not-an-array", "features": {"gitLocalWrites": true}}"#,
        )
        .unwrap();
        apply_section(&mut config, section);
        assert!(config.feature_git_local_writes);
        // extraCommands was the wrong shape; whitelist is untouched but intact.
        assert!(config.is_whitelisted("cat"));
    }

    #[test]
    fn extra_commands_merge_into_whitelist() {
        let mut config = EffectiveConfig::default();
        let section: Value =
            serde_json::from_str(r#"{"extraCommands": ["dog", "moo"]}"#).unwrap();
        apply_section(&mut config, section);
        assert!(config.is_whitelisted("dog"));
        assert!(config.is_whitelisted("moo"));
    }

    #[test]
    fn remove_commands_strips_default_whitelist_entries() {
        let mut config = EffectiveConfig::default();
        let section: Value = serde_json::from_str(r#"{"removeCommands": ["cat"]}"#).unwrap();
        apply_section(&mut config, section);
        assert!(!config.is_whitelisted("cat"));
    }

    #[test]
    fn unknown_fields_are_preserved_not_rejected() {
        let mut config = EffectiveConfig::default();
        let section: Value = serde_json::from_str(r#"{"someFutureFlag": 42}"#).unwrap();
        apply_section(&mut config, section);
        assert_eq!(config.unknown.get("someFutureFlag"), Some(&Value::from(42)));
    }

    #[test]
    fn git_subcommand_whitelist_includes_status_but_not_push() {
        let config = EffectiveConfig::default();
        assert!(config.subcommand_is_whitelisted("git", "status"));
        assert!(!config.subcommand_is_whitelisted("git", "push"));
    }

    #[test]
    fn git_local_writes_off_keeps_config_and_branch_unwhitelisted() {
        let config = EffectiveConfig::default();
        assert!(!config.subcommand_is_whitelisted("git", "config"));
        assert!(!config.subcommand_is_whitelisted("git", "branch"));
    }

    #[test]
    fn git_local_writes_on_adds_config_and_branch() {
        let mut config = EffectiveConfig::default();
        config.feature_git_local_writes = true;
        config.finalize();
        assert!(config.subcommand_is_whitelisted("git", "config"));
        assert!(config.subcommand_is_whitelisted("git", "branch"));
    }

    #[test]
    fn non_local_git_config_write_is_detected_only_when_feature_is_on() {
        let mut config = EffectiveConfig::default();
        let args = vec!["config".to_string(), "--global".to_string(), "user.name".to_string()];
        assert!(!config.is_non_local_git_config_write(&args));
        config.feature_git_local_writes = true;
        assert!(config.is_non_local_git_config_write(&args));
    }

    #[test]
    fn generic_subcommand_whitelist_applies_to_arbitrary_executables() {
        let mut config = EffectiveConfig::default();
        let section: Value =
            serde_json::from_str(r#"{"subcommandWhitelist": {"docker": ["ps", "images"]}}"#)
                .unwrap();
        apply_section(&mut config, section);
        assert!(config.subcommand_is_whitelisted("docker", "ps"));
        assert!(!config.subcommand_is_whitelisted("docker", "run"));
    }
}
