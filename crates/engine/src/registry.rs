use std::collections::{HashMap, HashSet};

use policyd_core::{Rule, RuleId};
use policyd_scheduler::PollTimer;

/// The in-memory rule registry. Every field here is guarded by the same
/// `parking_lot::Mutex` in [`crate::engine::Inner`]; a rule-id belongs to at
/// most one of `disabled`, `receive_subscribers`, `event_rules`, or
/// `poll_timers` at any time, matching the state-machine invariant.
#[derive(Default)]
pub(crate) struct Registry {
    pub(crate) rules: HashMap<RuleId, Rule>,
    pub(crate) disabled: HashSet<RuleId>,
    pub(crate) receive_subscribers: HashSet<RuleId>,
    pub(crate) event_rules: HashSet<RuleId>,
    pub(crate) poll_timers: HashMap<RuleId, PollTimer>,
}
