use std::time::Duration;

use policyd_core::{ApplicationMonitor, Condition, MonitorType, Rule, XPathVariable};
use policyd_executor::ActionRunner;
use policyd_engine::RuleEngine;
use policyd_store::RuleStore;

fn engine(dir: &std::path::Path) -> RuleEngine {
    RuleEngine::new(RuleStore::new(dir), ActionRunner::new(None), 1.0)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(150)).await;
}

#[tokio::test]
async fn numeric_poll_trigger_invokes_action() {
    let dir = tempfile::tempdir().unwrap();
    let monitor_xml = dir.path().join("monitor.xml");
    std::fs::write(&monitor_xml, "<m><v>42</v></m>").unwrap();
    let marker = dir.path().join("fired");

    let rules_dir = dir.path().join("rules");
    let engine = engine(&rules_dir);

    let mut monitor = ApplicationMonitor::new(MonitorType::Poll, format!("touch {}", marker.display()));
    monitor.poll_period = Some(0.0);
    monitor.max_action_invocations = Some(1);
    monitor.query_command = Some(format!("cat {}", monitor_xml.display()));
    let mut rule = Rule::new("clustermon", "high-load", monitor);
    rule.conditions.push(Condition::new("/m/v", ">", "10"));

    engine.add_rule(rule).unwrap();
    settle().await;

    assert!(marker.exists(), "numeric condition should have triggered the action");
}

#[tokio::test]
async fn string_fallback_trigger_invokes_action() {
    let dir = tempfile::tempdir().unwrap();
    let monitor_xml = dir.path().join("monitor.xml");
    std::fs::write(&monitor_xml, "<m><v>alpha</v></m>").unwrap();
    let marker = dir.path().join("fired");

    let rules_dir = dir.path().join("rules");
    let engine = engine(&rules_dir);

    let mut monitor = ApplicationMonitor::new(MonitorType::Poll, format!("touch {}", marker.display()));
    monitor.poll_period = Some(0.0);
    monitor.max_action_invocations = Some(1);
    monitor.query_command = Some(format!("cat {}", monitor_xml.display()));
    let mut rule = Rule::new("clustermon", "string-check", monitor);
    rule.conditions.push(Condition::new("/m/v", "==", "alpha"));

    engine.add_rule(rule).unwrap();
    settle().await;

    assert!(marker.exists(), "non-numeric operands should fall back to string comparison");
}

#[tokio::test]
async fn max_invocations_auto_disables_rule() {
    let dir = tempfile::tempdir().unwrap();
    let rules_dir = dir.path().join("rules");
    let engine = engine(&rules_dir);

    let mut monitor = ApplicationMonitor::new(MonitorType::Event, "true");
    monitor.max_action_invocations = Some(1);
    let rule = Rule::new("clustermon", "one-shot", monitor);
    engine.add_rule(rule).unwrap();

    engine.execute_rule("clustermon", "one-shot", Vec::new()).await.unwrap();

    let persisted = engine.get_rule("clustermon", "one-shot").unwrap();
    assert!(!persisted.is_status_enabled(), "rule should auto-disable once its invocation budget is spent");
}

#[tokio::test]
async fn receive_queue_drains_in_fifo_order() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("log");
    std::fs::write(&log, "").unwrap();
    let rules_dir = dir.path().join("rules");
    let engine = engine(&rules_dir);

    let mut monitor = ApplicationMonitor::new(
        MonitorType::Receive,
        format!("echo ${{value}} >> {}", log.display()),
    );
    monitor.query_command = None;
    let mut rule = Rule::new("clustermon", "receive-log", monitor);
    rule.xpath_variables.push(XPathVariable::new("${value}", "/m/v"));
    engine.add_rule(rule).unwrap();

    engine.receive_application_data("clustermon", b"<m><v>first</v></m>".to_vec());
    engine.receive_application_data("clustermon", b"<m><v>second</v></m>".to_vec());
    settle().await;

    let contents = std::fs::read_to_string(&log).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines, vec!["first", "second"], "messages must be applied in arrival order");
}

#[tokio::test]
async fn deleting_a_poll_rule_cancels_its_timer() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("fired");
    let rules_dir = dir.path().join("rules");
    let engine = engine(&rules_dir);

    let mut monitor = ApplicationMonitor::new(MonitorType::Poll, format!("touch {}", marker.display()));
    monitor.poll_period = Some(1.0);
    let rule = Rule::new("clustermon", "soon-deleted", monitor);
    engine.add_rule(rule).unwrap();

    engine.delete_rule("clustermon", "soon-deleted").unwrap();
    tokio::time::sleep(Duration::from_millis(1200)).await;

    assert!(!marker.exists(), "a deleted poll rule must never fire again");
    assert!(!engine.has_rule(&policyd_core::RuleId::new("clustermon", "soon-deleted")));
}

#[tokio::test]
async fn disabling_a_poll_rule_while_its_action_is_running_lets_the_action_finish() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("fired");
    let rules_dir = dir.path().join("rules");
    let engine = engine(&rules_dir);

    // The action sleeps before touching its marker, giving a disable call a
    // window to race against it while it is genuinely in flight.
    let mut monitor = ApplicationMonitor::new(
        MonitorType::Poll,
        format!("sleep 0.3 && touch {}", marker.display()),
    );
    monitor.poll_period = Some(0.0);
    monitor.max_action_invocations = Some(1);
    let rule = Rule::new("clustermon", "slow-action", monitor);
    engine.add_rule(rule).unwrap();

    // Let the poll timer fire and the action start running (it is now
    // blocked inside its own 300ms sleep).
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Race disable against the already-firing callback. Per spec.md, an
    // already-firing timer must be allowed to complete and no in-flight
    // subprocess may be cancelled: the action must still run to completion
    // and its success must still be counted.
    engine.disable_rule("clustermon", "slow-action").unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(
        marker.exists(),
        "an in-flight poll action must run to completion even when its rule is disabled mid-flight"
    );
    let persisted = engine.get_rule("clustermon", "slow-action").unwrap();
    assert_eq!(
        persisted.application_monitor.action_invocations_success, 1,
        "the in-flight action's success must still be counted after racing with disable"
    );
}

#[tokio::test]
async fn boot_skips_invalid_xml_but_loads_valid_rules() {
    let dir = tempfile::tempdir().unwrap();
    let rules_dir = dir.path().join("rules");
    let engine = engine(&rules_dir);

    let mut monitor = ApplicationMonitor::new(MonitorType::Event, "true");
    monitor.description = Some("valid rule".to_owned());
    let rule = Rule::new("clustermon", "valid", monitor);
    engine.add_rule(rule).unwrap();

    let bad_dir = rules_dir.join("clustermon");
    std::fs::write(bad_dir.join("broken.xml"), b"<rule><unterminated").unwrap();

    let reloaded = engine(&rules_dir);
    let rules = reloaded.get_rule_list();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].name, "valid");
}
