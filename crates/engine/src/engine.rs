use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Mutex, MutexGuard};
use policyd_core::{
    ApplicationMonitor, MonitorType, Rule, RuleId, STATUS_DISABLED_BY_ADMIN,
};
use policyd_eval::{ConditionEvaluator, substitute};
use policyd_executor::ActionRunner;
use policyd_scheduler::{PollTimer, ProcessingWorker, ReceiveQueue, next_poll_period_secs};
use policyd_store::RuleStore;

use crate::error::RuleError;
use crate::registry::Registry;

struct Inner {
    min_trigger_interval_secs: f64,
    store: RuleStore,
    action_runner: ActionRunner,
    registry: Mutex<Registry>,
    receive_queue: ReceiveQueue,
    processing_worker: ProcessingWorker,
}

/// The public rule-engine facade: registry of rules plus the scheduling
/// state that drives poll timers, the receive queue, and event dispatch.
///
/// Cheaply `Clone`-able (an `Arc` handle); every public method acquires the
/// control-plane lock for the span of its own registry mutation and releases
/// it before running any query/action subprocess or XPath evaluation, per
/// `DESIGN.md`'s concurrency resolution.
#[derive(Clone)]
pub struct RuleEngine {
    inner: Arc<Inner>,
}

enum PollOutcome {
    Stop,
    AutoDisable,
    Reschedule(f64),
}

impl RuleEngine {
    /// Construct a new engine over `store`, loading and registering every
    /// rule the store already holds. Must be called from within a running
    /// Tokio runtime: enabling a `poll` rule spawns its timer task.
    #[must_use]
    pub fn new(store: RuleStore, action_runner: ActionRunner, min_trigger_interval_secs: f64) -> Self {
        let inner = Arc::new(Inner {
            min_trigger_interval_secs,
            store,
            action_runner,
            registry: Mutex::new(Registry::default()),
            receive_queue: ReceiveQueue::new(),
            processing_worker: ProcessingWorker::new(),
        });
        let engine = Self { inner };
        engine.boot();
        engine
    }

    fn boot(&self) {
        for rule in self.inner.store.load_all() {
            let rule_id = rule.rule_id();
            if let Err(err) = self.add_rule_internal(rule, false) {
                tracing::error!(%rule_id, error = %err, "failed to register rule at boot");
            }
        }
    }

    #[must_use]
    pub fn has_rule(&self, rule_id: &RuleId) -> bool {
        self.inner.registry.lock().rules.contains_key(rule_id)
    }

    pub fn add_rule(&self, rule: Rule) -> Result<RuleId, RuleError> {
        self.add_rule_internal(rule, true)
    }

    fn add_rule_internal(&self, rule: Rule, persist: bool) -> Result<RuleId, RuleError> {
        let rule_id = rule.rule_id();
        let mut registry = self.inner.registry.lock();

        if registry.rules.contains_key(&rule_id) {
            return Err(RuleError::AlreadyExists(rule_id));
        }

        if persist {
            self.inner.store.write_rule(&rule)?;
        }

        let enabled = rule.is_status_enabled();
        registry.rules.insert(rule_id.clone(), rule);

        if enabled {
            self.enable_locked(&mut registry, &rule_id);
        } else {
            registry.disabled.insert(rule_id.clone());
        }

        tracing::debug!(%rule_id, "added rule");
        Ok(rule_id)
    }

    pub fn delete_rule(&self, application_name: &str, name: &str) -> Result<(), RuleError> {
        let rule_id = RuleId::new(application_name.to_owned(), name.to_owned());
        let mut registry = self.inner.registry.lock();
        Self::check_exists(&registry, &rule_id)?;

        if !registry.disabled.contains(&rule_id) {
            self.disable_locked(&mut registry, &rule_id);
        }
        registry.disabled.remove(&rule_id);
        registry.rules.remove(&rule_id);
        drop(registry);

        self.inner.store.delete_rule(application_name, name)?;
        tracing::debug!(%rule_id, "deleted rule");
        Ok(())
    }

    pub fn enable_rule(&self, application_name: &str, name: &str) -> Result<(), RuleError> {
        let rule_id = RuleId::new(application_name.to_owned(), name.to_owned());
        let mut registry = self.inner.registry.lock();
        Self::check_exists(&registry, &rule_id)?;

        if !registry.disabled.contains(&rule_id) {
            return Err(RuleError::AlreadyEnabled(rule_id));
        }

        self.enable_locked(&mut registry, &rule_id);
        let rule = registry.rules[&rule_id].clone();
        drop(registry);

        self.inner.store.write_rule(&rule)?;
        tracing::debug!(%rule_id, "enabled rule");
        Ok(())
    }

    pub fn disable_rule(&self, application_name: &str, name: &str) -> Result<(), RuleError> {
        let rule_id = RuleId::new(application_name.to_owned(), name.to_owned());
        let mut registry = self.inner.registry.lock();
        Self::check_exists(&registry, &rule_id)?;

        if registry.disabled.contains(&rule_id) {
            return Err(RuleError::AlreadyDisabled(rule_id));
        }

        self.disable_locked(&mut registry, &rule_id);
        let rule = registry.rules[&rule_id].clone();
        drop(registry);

        self.inner.store.write_rule(&rule)?;
        tracing::debug!(%rule_id, "disabled rule");
        Ok(())
    }

    pub fn get_rule(&self, application_name: &str, name: &str) -> Result<Rule, RuleError> {
        let rule_id = RuleId::new(application_name.to_owned(), name.to_owned());
        let registry = self.inner.registry.lock();
        Self::check_exists(&registry, &rule_id)?;
        Ok(registry.rules[&rule_id].clone())
    }

    #[must_use]
    pub fn get_rule_list(&self) -> Vec<Rule> {
        self.inner.registry.lock().rules.values().cloned().collect()
    }

    /// Enqueue `data` for every `receive`-mode rule subscribed to
    /// `application_name` and arm the processing worker if it is not
    /// already running.
    pub fn receive_application_data(&self, application_name: &str, data: Vec<u8>) {
        self.inner.receive_queue.push(application_name.to_owned(), data);
        self.arm_processing_worker();
    }

    /// Explicitly execute a rule regardless of its trigger mode, per §4.4.4:
    /// `poll` cancels and re-runs the poll handler inline, `receive` enqueues
    /// `application_data` as if it had arrived over the wire, `event` runs
    /// the event handler inline.
    pub async fn execute_rule(
        &self,
        application_name: &str,
        name: &str,
        application_data: Vec<u8>,
    ) -> Result<(), RuleError> {
        let rule_id = RuleId::new(application_name.to_owned(), name.to_owned());

        let monitor_type = {
            let mut registry = self.inner.registry.lock();
            Self::check_exists(&registry, &rule_id)?;
            if registry.disabled.contains(&rule_id) {
                return Err(RuleError::Disabled(rule_id));
            }

            let monitor_type = registry.rules[&rule_id].application_monitor.monitor_type;
            if monitor_type == MonitorType::Poll {
                Self::cancel_poll_timer_locked(&mut registry, &rule_id);
            }
            monitor_type
        };

        match monitor_type {
            MonitorType::Poll => self.poll_fire(rule_id).await,
            MonitorType::Receive => {
                self.inner
                    .receive_queue
                    .push(application_name.to_owned(), application_data);
                self.arm_processing_worker();
            }
            MonitorType::Event => self.execute_event(&rule_id).await,
        }

        Ok(())
    }

    fn check_exists(registry: &Registry, rule_id: &RuleId) -> Result<(), RuleError> {
        if registry.rules.contains_key(rule_id) {
            Ok(())
        } else {
            Err(RuleError::NotFound(rule_id.clone()))
        }
    }

    /// Transition a rule from `disabled` to the enabled state implied by its
    /// monitor type. Assumes the caller already holds `registry`'s lock and
    /// that the rule-id is present.
    fn enable_locked(&self, registry: &mut Registry, rule_id: &RuleId) {
        let monitor = registry.rules[rule_id].application_monitor.clone();
        registry.rules.get_mut(rule_id).expect("rule exists").set_status_enabled();
        registry.disabled.remove(rule_id);

        match monitor.monitor_type {
            MonitorType::Poll => {
                let delay = monitor.poll_period.unwrap_or(self.inner.min_trigger_interval_secs);
                self.arm_poll_timer_locked(registry, rule_id.clone(), delay);
            }
            MonitorType::Receive => {
                registry.receive_subscribers.insert(rule_id.clone());
            }
            MonitorType::Event => {
                registry.event_rules.insert(rule_id.clone());
            }
        }
    }

    /// Transition a rule to `disabled`, removing it from whichever enabled
    /// state set it occupied. Assumes the lock is already held.
    fn disable_locked(&self, registry: &mut Registry, rule_id: &RuleId) {
        if let Some(rule) = registry.rules.get_mut(rule_id) {
            rule.set_status(STATUS_DISABLED_BY_ADMIN);
        }
        Self::cancel_poll_timer_locked(registry, rule_id);
        registry.receive_subscribers.remove(rule_id);
        registry.event_rules.remove(rule_id);
        registry.disabled.insert(rule_id.clone());
    }

    fn arm_poll_timer_locked(&self, registry: &mut Registry, rule_id: RuleId, delay_secs: f64) {
        Self::cancel_poll_timer_locked(registry, &rule_id);

        let engine = self.clone();
        let timer_rule_id = rule_id.clone();
        let delay = Duration::from_secs_f64(delay_secs.max(0.0));

        tracing::debug!(%rule_id, delay_secs, "arming poll timer");
        let timer = PollTimer::spawn(delay, move || async move {
            engine.poll_fire(timer_rule_id).await;
        });
        registry.poll_timers.insert(rule_id, timer);
    }

    fn cancel_poll_timer_locked(registry: &mut Registry, rule_id: &RuleId) {
        if let Some(timer) = registry.poll_timers.remove(rule_id) {
            timer.cancel();
        }
    }

    fn arm_processing_worker(&self) {
        let engine = self.clone();
        self.inner
            .processing_worker
            .ensure_running(move || async move { engine.process().await });
    }

    /// Mark a rule invoked and return a clone of its current state, or
    /// `None` if it has since been deleted — the race the source's
    /// "re-check `hasRule` immediately on entry" rule absorbs.
    fn invoked_snapshot(&self, rule_id: &RuleId) -> Option<Rule> {
        let mut registry = self.inner.registry.lock();
        let rule = registry.rules.get_mut(rule_id)?;
        rule.application_monitor.rule_invoked();
        Some(rule.clone())
    }

    fn update_counter(&self, rule_id: &RuleId, f: impl FnOnce(&mut ApplicationMonitor)) {
        let mut registry = self.inner.registry.lock();
        if let Some(rule) = registry.rules.get_mut(rule_id) {
            f(&mut rule.application_monitor);
        }
    }

    /// Run `query_cmd` (if present) and evaluate conditions against its
    /// output. Returns `None` when the query command itself failed — in
    /// that case the action must be skipped entirely, matching the source's
    /// exception propagating past the action-invocation block. Returns
    /// `Some((triggered, substitutions))` otherwise, including the
    /// unconditional-trigger case when there is no query command at all.
    async fn query_then_evaluate(
        &self,
        rule_id: &RuleId,
        query_cmd: Option<&str>,
        xpath_variables: &[policyd_core::XPathVariable],
        conditions: &[policyd_core::Condition],
    ) -> Option<(bool, Vec<(String, String)>)> {
        let Some(cmd) = query_cmd else {
            return Some((true, Vec::new()));
        };

        match self.inner.action_runner.run_query(cmd).await {
            Ok(stdout) => {
                self.update_counter(rule_id, ApplicationMonitor::query_invocation_succeeded);
                let outcome =
                    ConditionEvaluator::evaluate(Some(stdout.as_slice()), xpath_variables, conditions);
                Some((outcome.triggered, outcome.substitutions))
            }
            Err(err) => {
                tracing::error!(%rule_id, error = %err, "query command failed");
                self.update_counter(rule_id, ApplicationMonitor::query_invocation_failed);
                None
            }
        }
    }

    /// Run `action_cmd` (with XPath substitutions applied) if `decision`
    /// says the conditions triggered and the query (if any) succeeded.
    async fn run_action_if_triggered(
        &self,
        rule_id: &RuleId,
        action_cmd: &str,
        decision: Option<(bool, Vec<(String, String)>)>,
    ) {
        let Some((triggered, substitutions)) = decision else {
            return;
        };

        if !triggered {
            tracing::debug!(%rule_id, "condition not satisfied, skipping action");
            return;
        }

        let resolved = substitute(action_cmd, &substitutions);
        tracing::debug!(%rule_id, command = %resolved, "invoking action");

        match self.inner.action_runner.run_action(&resolved).await {
            Ok(()) => {
                self.update_counter(rule_id, |m| m.action_invocation_succeeded(Utc::now()));
            }
            Err(err) => {
                tracing::error!(%rule_id, error = %err, "action command failed");
                self.update_counter(rule_id, ApplicationMonitor::action_invocation_failed);
            }
        }
    }

    /// §4.4.1: one poll-timer firing.
    async fn poll_fire(&self, rule_id: RuleId) {
        let Some(rule) = self.invoked_snapshot(&rule_id) else {
            tracing::debug!(%rule_id, "poll timer fired for missing rule, cancelled");
            return;
        };

        let monitor = &rule.application_monitor;
        let decision = self
            .query_then_evaluate(
                &rule_id,
                monitor.query_command.as_deref(),
                &rule.xpath_variables,
                &rule.conditions,
            )
            .await;
        self.run_action_if_triggered(&rule_id, &monitor.action_command, decision)
            .await;

        match self.decide_poll_outcome(&rule_id) {
            PollOutcome::Stop => {}
            PollOutcome::AutoDisable => {
                if let Err(err) = self.disable_rule(&rule.application_name, &rule.name) {
                    tracing::debug!(%rule_id, error = %err, "auto-disable skipped");
                }
            }
            PollOutcome::Reschedule(delay) => {
                let mut registry = self.inner.registry.lock();
                if registry.rules.contains_key(&rule_id) {
                    self.arm_poll_timer_locked(&mut registry, rule_id.clone(), delay);
                }
            }
        }
    }

    fn decide_poll_outcome(&self, rule_id: &RuleId) -> PollOutcome {
        let registry = self.inner.registry.lock();
        let Some(rule) = registry.rules.get(rule_id) else {
            return PollOutcome::Stop;
        };

        if rule.application_monitor.max_invocations_reached() {
            return PollOutcome::AutoDisable;
        }

        let poll_period = rule
            .application_monitor
            .poll_period
            .unwrap_or(self.inner.min_trigger_interval_secs);
        let delay = next_poll_period_secs(
            poll_period,
            rule.application_monitor.last_successful_action_invocation_time,
            self.inner.min_trigger_interval_secs,
            Utc::now(),
        );
        PollOutcome::Reschedule(delay)
    }

    /// §4.4.3: explicit-execution-only rule, run once, no rescheduling.
    async fn execute_event(&self, rule_id: &RuleId) {
        let Some(rule) = self.invoked_snapshot(rule_id) else {
            return;
        };

        let monitor = &rule.application_monitor;
        let decision = self
            .query_then_evaluate(
                rule_id,
                monitor.query_command.as_deref(),
                &rule.xpath_variables,
                &rule.conditions,
            )
            .await;
        self.run_action_if_triggered(rule_id, &monitor.action_command, decision).await;

        self.maybe_auto_disable(rule_id, &rule.application_name, &rule.name);
    }

    fn maybe_auto_disable(&self, rule_id: &RuleId, application_name: &str, name: &str) {
        let max_reached = {
            let registry = self.inner.registry.lock();
            registry
                .rules
                .get(rule_id)
                .is_some_and(|r| r.application_monitor.max_invocations_reached())
        };

        if max_reached {
            if let Err(err) = self.disable_rule(application_name, name) {
                tracing::debug!(%rule_id, error = %err, "auto-disable skipped");
            }
        }
    }

    /// §4.4.2: drain the receive queue until empty, evaluating each message
    /// against every currently-subscribed `receive` rule for that
    /// application name.
    async fn process(&self) {
        tracing::debug!("processing worker started");

        loop {
            let Some((application_name, data)) = self.inner.receive_queue.pop() else {
                break;
            };

            for rule in self.snapshot_receive_subscribers(&application_name) {
                let rule_id = rule.rule_id();
                let outcome = ConditionEvaluator::evaluate(
                    Some(data.as_slice()),
                    &rule.xpath_variables,
                    &rule.conditions,
                );
                self.run_action_if_triggered(
                    &rule_id,
                    &rule.application_monitor.action_command,
                    Some((outcome.triggered, outcome.substitutions)),
                )
                .await;

                self.maybe_auto_disable(&rule_id, &rule.application_name, &rule.name);
            }
        }

        self.inner.processing_worker.mark_stopped();
        tracing::debug!("processing worker stopped, queue drained");
    }

    fn snapshot_receive_subscribers(&self, application_name: &str) -> Vec<Rule> {
        let mut registry: MutexGuard<'_, Registry> = self.inner.registry.lock();
        let ids: Vec<RuleId> = registry.receive_subscribers.iter().cloned().collect();

        ids.into_iter()
            .filter_map(|id| {
                let rule = registry.rules.get_mut(&id)?;
                if rule.application_name != application_name {
                    return None;
                }
                rule.application_monitor.rule_invoked();
                Some(rule.clone())
            })
            .collect()
    }
}
