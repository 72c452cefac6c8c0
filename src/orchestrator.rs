//! Ties the parser, pipeline, and config together and reduces one command's
//! fragments into a single [`HookDecision`].
//!
//! A command approves only if *every* fragment the parser extracted
//! approves — one unrecognized or dangerous fragment anywhere in a
//! pipeline/chain/substitution tree is enough to fall through the whole
//! command. There is no partial approval.

use crate::config::EffectiveConfig;
use crate::fragment::{FragmentVerdict, HookDecision};
use crate::logging::DebugLog;
use crate::parser::{self, ParseOutcome};
use crate::pipeline::{Evaluator, Pipeline};

pub fn decide(command: &str, config: &EffectiveConfig, log: &DebugLog) -> HookDecision {
    let fragments = match parser::parse(command) {
        ParseOutcome::Fragments(f) => f,
        ParseOutcome::Unsupported(reason) => {
            log.log(1, &format!("fallthrough: unsupported: {reason}"));
            return HookDecision::Fallthrough;
        }
    };

    if fragments.is_empty() {
        // Nothing to execute (empty input, a bare assignment, a comment) is
        // a no-op, not a command to second-guess.
        log.log(1, "approve: no fragments extracted (no-op command)");
        return HookDecision::Approve;
    }

    log.log(3, &format!("parsed {} fragment(s): {:?}", fragments.len(), fragments));

    let pipeline = Pipeline::new(config);
    let mut decision = HookDecision::Approve;
    for fragment in &fragments {
        let verdict = pipeline.evaluate(fragment);
        log.log(2, &format!("{:?} -> {:?}", fragment, verdict));
        if verdict == FragmentVerdict::Reject {
            decision = HookDecision::Fallthrough;
            break;
        }
    }

    log.log(1, &format!("decision: {decision:?}"));
    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Verbosity;

    fn silent_log() -> DebugLog {
        DebugLog::new(Verbosity(0))
    }

    #[test]
    fn readonly_command_approves() {
        let config = EffectiveConfig::default();
        assert_eq!(
            decide("cat file.txt", &config, &silent_log()),
            HookDecision::Approve
        );
    }

    #[test]
    fn unknown_command_falls_through() {
        let config = EffectiveConfig::default();
        assert_eq!(
            decide("rm -rf /", &config, &silent_log()),
            HookDecision::Fallthrough
        );
    }

    #[test]
    fn one_bad_fragment_in_a_chain_falls_through_whole_command() {
        let config = EffectiveConfig::default();
        assert_eq!(
            decide("cat file.txt && rm file.txt", &config, &silent_log()),
            HookDecision::Fallthrough
        );
    }

    #[test]
    fn unparseable_command_falls_through() {
        let config = EffectiveConfig::default();
        assert_eq!(
            decide("if then fi fi (( ", &config, &silent_log()),
            HookDecision::Fallthrough
        );
    }

    #[test]
    fn pipeline_of_two_safe_commands_approves() {
        let config = EffectiveConfig::default();
        assert_eq!(
            decide("cat file.txt | grep foo", &config, &silent_log()),
            HookDecision::Approve
        );
    }

    #[test]
    fn empty_command_approves_as_a_no_op() {
        let config = EffectiveConfig::default();
        assert_eq!(decide("", &config, &silent_log()), HookDecision::Approve);
        assert_eq!(decide("   ", &config, &silent_log()), HookDecision::Approve);
        assert_eq!(decide("# just a comment", &config, &silent_log()), HookDecision::Approve);
        assert_eq!(decide("FOO=bar", &config, &silent_log()), HookDecision::Approve);
    }
}
