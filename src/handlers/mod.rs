//! Dangerous-mode command handlers: `sed`, `find`, `xargs`, and (feature
//! gated) `awk`. Each decides only between [`HandlerOutcome::Pass`] (defer
//! to the rest of the pipeline) and [`HandlerOutcome::Reject`] — a handler
//! never gets to approve outright.
//!
//! `find` and `xargs` can themselves invoke an arbitrary inner command
//! (`find . -exec rm {} \;`, `xargs rm`); those two recurse into the
//! pipeline through the [`Evaluator`] capability rather than hardcoding a
//! second copy of the 7-step logic.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::EffectiveConfig;
use crate::fragment::{CommandFragment, HandlerOutcome};
use crate::pipeline::Evaluator;

const SED_WRITE_FLAGS: &[&str] = &["-i", "--in-place"];

/// `sed` is read-only unless `-i`/`--in-place` is present (with or without
/// a backup suffix argument, e.g. `-i.bak`).
pub fn handle_sed(
    fragment: &CommandFragment,
    _config: &EffectiveConfig,
    _evaluator: &dyn Evaluator,
) -> HandlerOutcome {
    let writes = fragment.args.iter().any(|arg| {
        SED_WRITE_FLAGS.iter().any(|flag| arg == flag)
            || arg.starts_with("-i") // `-i.bak` glued form
            || arg.starts_with("--in-place=")
    });
    if writes {
        HandlerOutcome::Reject
    } else {
        HandlerOutcome::Pass
    }
}

static FIND_DESTRUCTIVE_ACTIONS: &[&str] = &["-delete", "-fprint", "-fprint0", "-fprintf"];

/// `find` is rejected outright for `-delete` and similar in-place actions,
/// and recurses through the pipeline for `-exec`/`-execdir`/`-ok`/`-okdir`
/// so the inner command gets full classification instead of a blanket
/// reject.
pub fn handle_find(
    fragment: &CommandFragment,
    config: &EffectiveConfig,
    evaluator: &dyn Evaluator,
) -> HandlerOutcome {
    if fragment
        .args
        .iter()
        .any(|a| FIND_DESTRUCTIVE_ACTIONS.contains(&a.as_str()))
    {
        return HandlerOutcome::Reject;
    }

    let exec_flags: &[&str] = &["-exec", "-execdir", "-ok", "-okdir"];
    let mut i = 0;
    while i < fragment.args.len() {
        if exec_flags.contains(&fragment.args[i].as_str()) {
            let raw: Vec<String> = fragment.args[i + 1..]
                .iter()
                .take_while(|a| a.as_str() != ";" && a.as_str() != "+")
                .cloned()
                .collect();
            // `{}` is find's placeholder for the matched path, substituted
            // at execution time — never an executable or a meaningful arg.
            let inner: Vec<String> = raw.into_iter().filter(|a| a != "{}").collect();
            if inner.is_empty() {
                return HandlerOutcome::Reject;
            }
            let inner_fragment =
                CommandFragment::new(inner[0].clone(), inner[1..].to_vec());
            let _ = config;
            if evaluator.evaluate(&inner_fragment) != crate::fragment::FragmentVerdict::Approve {
                return HandlerOutcome::Reject;
            }
            // Advance past the whole -exec ... ; / -exec ... + block,
            // including the `{}` tokens the filter above dropped.
            let consumed = fragment.args[i + 1..]
                .iter()
                .take_while(|a| a.as_str() != ";" && a.as_str() != "+")
                .count();
            i += consumed + 2; // +1 for the terminator, +1 for the flag itself
        } else {
            i += 1;
        }
    }
    HandlerOutcome::Pass
}

/// Flags that consume the following token as their value rather than
/// being self-contained.
const XARGS_VALUE_FLAGS: &[&str] = &["-I", "-n", "-d", "-L", "-P", "-s", "-E", "-a"];

/// `xargs` always recurses: its entire purpose is running another command
/// per input line, so the handler has nothing to decide on its own beyond
/// finding where the inner command starts (first non-flag argument, after
/// skipping any value-consuming flag's value too).
pub fn handle_xargs(
    fragment: &CommandFragment,
    _config: &EffectiveConfig,
    evaluator: &dyn Evaluator,
) -> HandlerOutcome {
    let mut i = 0;
    while i < fragment.args.len() && fragment.args[i].starts_with('-') {
        if XARGS_VALUE_FLAGS.contains(&fragment.args[i].as_str()) {
            i += 2;
        } else {
            i += 1;
        }
    }
    let inner_start = &fragment.args[i.min(fragment.args.len())..];

    let Some((head, rest)) = inner_start.split_first() else {
        // Bare `xargs` with no inner command (reads commands from stdin
        // directly) is unanalyzable; reject.
        return HandlerOutcome::Reject;
    };

    let inner_fragment = CommandFragment::new(head.to_string(), rest.iter().map(|s| s.to_string()).collect());
    if evaluator.evaluate(&inner_fragment) == crate::fragment::FragmentVerdict::Approve {
        HandlerOutcome::Pass
    } else {
        HandlerOutcome::Reject
    }
}

static AWK_WRITE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(>>?|print\s*>|system\s*\()"#).unwrap());

/// `awk` is feature-gated off by default (spec.md's optional handler): its
/// scripting mini-language can redirect output or call `system()`, which a
/// plain flag scan can't fully rule out. When enabled, reject any script
/// argument that looks like it writes or shells out.
pub fn handle_awk(
    fragment: &CommandFragment,
    _config: &EffectiveConfig,
    _evaluator: &dyn Evaluator,
) -> HandlerOutcome {
    let suspicious = fragment
        .args
        .iter()
        .any(|arg| AWK_WRITE_PATTERN.is_match(arg));
    if suspicious {
        HandlerOutcome::Reject
    } else {
        HandlerOutcome::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::FragmentVerdict;

    struct AlwaysApprove;
    impl Evaluator for AlwaysApprove {
        fn evaluate(&self, _fragment: &CommandFragment) -> FragmentVerdict {
            FragmentVerdict::Approve
        }
    }

    struct AlwaysReject;
    impl Evaluator for AlwaysReject {
        fn evaluate(&self, _fragment: &CommandFragment) -> FragmentVerdict {
            FragmentVerdict::Reject
        }
    }

    #[test]
    fn sed_without_inplace_passes() {
        let f = CommandFragment::new("sed", vec!["s/a/b/".into(), "file.txt".into()]);
        let config = EffectiveConfig::default();
        assert_eq!(handle_sed(&f, &config, &AlwaysApprove), HandlerOutcome::Pass);
    }

    #[test]
    fn sed_with_inplace_rejects() {
        let f = CommandFragment::new("sed", vec!["-i".into(), "s/a/b/".into(), "file.txt".into()]);
        let config = EffectiveConfig::default();
        assert_eq!(handle_sed(&f, &config, &AlwaysApprove), HandlerOutcome::Reject);
    }

    #[test]
    fn sed_with_glued_backup_suffix_rejects() {
        let f = CommandFragment::new("sed", vec!["-i.bak".into(), "s/a/b/".into()]);
        let config = EffectiveConfig::default();
        assert_eq!(handle_sed(&f, &config, &AlwaysApprove), HandlerOutcome::Reject);
    }

    #[test]
    fn find_delete_rejects() {
        let f = CommandFragment::new("find", vec![".".into(), "-delete".into()]);
        let config = EffectiveConfig::default();
        assert_eq!(handle_find(&f, &config, &AlwaysApprove), HandlerOutcome::Reject);
    }

    #[test]
    fn find_exec_recurses_into_evaluator() {
        let f = CommandFragment::new(
            "find",
            vec![".".into(), "-exec".into(), "cat".into(), "{}".into(), ";".into()],
        );
        let config = EffectiveConfig::default();
        assert_eq!(handle_find(&f, &config, &AlwaysApprove), HandlerOutcome::Pass);
        assert_eq!(handle_find(&f, &config, &AlwaysReject), HandlerOutcome::Reject);
    }

    #[test]
    fn xargs_recurses_into_inner_command() {
        let f = CommandFragment::new("xargs", vec!["-0".into(), "cat".into()]);
        let config = EffectiveConfig::default();
        assert_eq!(handle_xargs(&f, &config, &AlwaysApprove), HandlerOutcome::Pass);
        assert_eq!(handle_xargs(&f, &config, &AlwaysReject), HandlerOutcome::Reject);
    }

    #[test]
    fn bare_xargs_with_no_inner_command_rejects() {
        let f = CommandFragment::new("xargs", vec!["-0".into()]);
        let config = EffectiveConfig::default();
        assert_eq!(handle_xargs(&f, &config, &AlwaysApprove), HandlerOutcome::Reject);
    }

    #[test]
    fn awk_print_redirect_rejects() {
        let f = CommandFragment::new("awk", vec!["{print $0 > \"out.txt\"}".into()]);
        let config = EffectiveConfig::default();
        assert_eq!(handle_awk(&f, &config, &AlwaysApprove), HandlerOutcome::Reject);
    }

    #[test]
    fn awk_plain_script_passes() {
        let f = CommandFragment::new("awk", vec!["{print $1}".into()]);
        let config = EffectiveConfig::default();
        assert_eq!(handle_awk(&f, &config, &AlwaysApprove), HandlerOutcome::Pass);
    }
}
