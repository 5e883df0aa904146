//! Encodes and decodes the on-disk rule XML document.
//!
//! A `<rule>` root carries the rule's identity as attributes, a nested
//! `<applicationMonitor>` describes the trigger, and zero or more
//! `<xPathVariable>` and `<condition>` children refine it. A trailing
//! `<counters>` element is this crate's own addition, used to persist the
//! runtime invocation counters across restarts (written only on lifecycle
//! transitions, never on every invocation — see DESIGN.md).

use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesText, Event};
use quick_xml::reader::Reader;

use policyd_core::{ApplicationMonitor, Condition, MonitorType, Rule, XPathVariable};

use crate::error::StoreError;

pub fn write_rule_xml(rule: &Rule) -> Result<Vec<u8>, StoreError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    let monitor = &rule.application_monitor;

    let rule_elem = writer
        .create_element("rule")
        .with_attribute(("name", rule.name.as_str()))
        .with_attribute(("applicationName", rule.application_name.as_str()));

    rule_elem
        .write_inner_content::<_, StoreError>(|writer| {
            if let Some(description) = &rule.description {
                write_text_element(writer, "description", description)?;
            }
            write_text_element(writer, "status", &rule.status)?;
            write_monitor(writer, monitor)?;
            for variable in &rule.xpath_variables {
                writer
                    .create_element("xPathVariable")
                    .with_attribute(("name", variable.name.as_str()))
                    .with_attribute(("xPath", variable.xpath_expr.as_str()))
                    .write_empty()
                    .map_err(xml_err)?;
            }
            for condition in &rule.conditions {
                write_condition(writer, condition)?;
            }
            write_counters(writer, monitor)?;
            Ok(())
        })
        .map_err(xml_err)?;

    Ok(writer.into_inner())
}

fn write_monitor(
    writer: &mut Writer<Vec<u8>>,
    monitor: &ApplicationMonitor,
) -> Result<(), StoreError> {
    let mut elem = writer
        .create_element("applicationMonitor")
        .with_attribute(("type", monitor.monitor_type.as_str()));

    let poll_period_text;
    if let Some(period) = monitor.poll_period {
        poll_period_text = period.to_string();
        elem = elem.with_attribute(("pollPeriod", poll_period_text.as_str()));
    }

    let max_invocations_text;
    if let Some(max) = monitor.max_action_invocations {
        max_invocations_text = max.to_string();
        elem = elem.with_attribute(("maxActionInvocations", max_invocations_text.as_str()));
    }

    elem.write_inner_content::<_, StoreError>(|writer| {
        if let Some(description) = &monitor.description {
            write_text_element(writer, "description", description)?;
        }
        if let Some(query) = &monitor.query_command {
            write_text_element(writer, "queryCommand", query)?;
        }
        if let Some(analyze) = &monitor.analyze_command {
            write_text_element(writer, "analyzeCommand", analyze)?;
        }
        write_text_element(writer, "actionCommand", &monitor.action_command)?;
        Ok(())
    })
    .map_err(xml_err)?;

    Ok(())
}

fn write_condition(writer: &mut Writer<Vec<u8>>, condition: &Condition) -> Result<(), StoreError> {
    let elem = writer
        .create_element("condition")
        .with_attribute(("metricXPath", condition.metric_xpath.as_str()))
        .with_attribute(("evaluationOperator", condition.evaluation_operator.as_str()))
        .with_attribute(("triggerValue", condition.trigger_value.as_str()));

    if let Some(description) = &condition.description {
        elem.write_inner_content::<_, StoreError>(|writer| {
            write_text_element(writer, "description", description)
        })
        .map_err(xml_err)?;
    } else {
        elem.write_empty().map_err(xml_err)?;
    }

    Ok(())
}

fn write_counters(
    writer: &mut Writer<Vec<u8>>,
    monitor: &ApplicationMonitor,
) -> Result<(), StoreError> {
    let last_success = monitor
        .last_successful_action_invocation_time
        .map(|t| t.to_rfc3339())
        .unwrap_or_default();

    writer
        .create_element("counters")
        .with_attribute(("ruleInvocations", monitor.rule_invocations.to_string().as_str()))
        .with_attribute((
            "queryInvocationSuccesses",
            monitor.query_invocations_success.to_string().as_str(),
        ))
        .with_attribute((
            "queryInvocationFailures",
            monitor.query_invocations_failure.to_string().as_str(),
        ))
        .with_attribute((
            "actionInvocationSuccesses",
            monitor.action_invocations_success.to_string().as_str(),
        ))
        .with_attribute((
            "actionInvocationFailures",
            monitor.action_invocations_failure.to_string().as_str(),
        ))
        .with_attribute(("lastSuccessfulActionInvocationTime", last_success.as_str()))
        .write_empty()
        .map_err(xml_err)?;

    Ok(())
}

fn write_text_element(
    writer: &mut Writer<Vec<u8>>,
    tag: &str,
    text: &str,
) -> Result<(), StoreError> {
    writer
        .create_element(tag)
        .write_text_content(BytesText::new(text))
        .map_err(xml_err)?;
    Ok(())
}

fn xml_err(err: quick_xml::Error) -> StoreError {
    StoreError::InvalidXml(err.to_string())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Monitor,
    Condition,
}

#[derive(Default)]
struct RawCounters {
    rule_invocations: u64,
    query_invocations_success: u64,
    query_invocations_failure: u64,
    action_invocations_success: u64,
    action_invocations_failure: u64,
    last_successful_action_invocation_time: Option<DateTime<Utc>>,
}

pub fn parse_rule_xml(bytes: &[u8]) -> Result<Rule, StoreError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text = true;
    let mut buf = Vec::new();

    let mut application_name: Option<String> = None;
    let mut name: Option<String> = None;
    let mut description: Option<String> = None;
    let mut status: Option<String> = None;

    let mut monitor_type = MonitorType::Event;
    let mut poll_period: Option<f64> = None;
    let mut max_action_invocations: Option<u64> = None;
    let mut monitor_description: Option<String> = None;
    let mut query_command: Option<String> = None;
    let mut analyze_command: Option<String> = None;
    let mut action_command: Option<String> = None;

    let mut xpath_variables = Vec::new();
    let mut conditions: Vec<Condition> = Vec::new();
    let mut counters = RawCounters::default();

    let mut section = Section::Root;
    let mut current_tag: Option<String> = None;
    let mut text = String::new();
    let mut current_condition: Option<Condition> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| StoreError::InvalidXml(e.to_string()))?;

        match event {
            Event::Eof => break,
            Event::Start(e) => {
                let tag = qname_str(e.name());
                text.clear();

                match tag.as_str() {
                    "rule" => {
                        for attr in attrs(&e)? {
                            match attr.0.as_str() {
                                "name" => name = Some(attr.1),
                                "applicationName" => application_name = Some(attr.1),
                                _ => {}
                            }
                        }
                    }
                    "applicationMonitor" => {
                        for attr in attrs(&e)? {
                            match attr.0.as_str() {
                                "type" => monitor_type = attr.1.parse().unwrap_or(MonitorType::Event),
                                "pollPeriod" => poll_period = attr.1.parse().ok(),
                                "maxActionInvocations" => {
                                    max_action_invocations = attr.1.parse().ok();
                                }
                                _ => {}
                            }
                        }
                        section = Section::Monitor;
                    }
                    "condition" => {
                        let mut metric_xpath = String::new();
                        let mut evaluation_operator = String::new();
                        let mut trigger_value = String::new();
                        for attr in attrs(&e)? {
                            match attr.0.as_str() {
                                "metricXPath" => metric_xpath = attr.1,
                                "evaluationOperator" => evaluation_operator = attr.1,
                                "triggerValue" => trigger_value = attr.1,
                                _ => {}
                            }
                        }
                        current_condition = Some(Condition::new(
                            metric_xpath,
                            evaluation_operator,
                            trigger_value,
                        ));
                        section = Section::Condition;
                    }
                    _ => current_tag = Some(tag),
                }
            }
            Event::Empty(e) => {
                let tag = qname_str(e.name());
                match tag.as_str() {
                    "xPathVariable" => {
                        let mut var_name = String::new();
                        let mut xpath_expr = String::new();
                        for attr in attrs(&e)? {
                            match attr.0.as_str() {
                                "name" => var_name = attr.1,
                                "xPath" => xpath_expr = attr.1,
                                _ => {}
                            }
                        }
                        xpath_variables.push(XPathVariable::new(var_name, xpath_expr));
                    }
                    "condition" => {
                        let mut metric_xpath = String::new();
                        let mut evaluation_operator = String::new();
                        let mut trigger_value = String::new();
                        for attr in attrs(&e)? {
                            match attr.0.as_str() {
                                "metricXPath" => metric_xpath = attr.1,
                                "evaluationOperator" => evaluation_operator = attr.1,
                                "triggerValue" => trigger_value = attr.1,
                                _ => {}
                            }
                        }
                        conditions.push(Condition::new(metric_xpath, evaluation_operator, trigger_value));
                    }
                    "counters" => {
                        for attr in attrs(&e)? {
                            match attr.0.as_str() {
                                "ruleInvocations" => {
                                    counters.rule_invocations = attr.1.parse().unwrap_or_default();
                                }
                                "queryInvocationSuccesses" => {
                                    counters.query_invocations_success =
                                        attr.1.parse().unwrap_or_default();
                                }
                                "queryInvocationFailures" => {
                                    counters.query_invocations_failure =
                                        attr.1.parse().unwrap_or_default();
                                }
                                "actionInvocationSuccesses" => {
                                    counters.action_invocations_success =
                                        attr.1.parse().unwrap_or_default();
                                }
                                "actionInvocationFailures" => {
                                    counters.action_invocations_failure =
                                        attr.1.parse().unwrap_or_default();
                                }
                                "lastSuccessfulActionInvocationTime" => {
                                    counters.last_successful_action_invocation_time =
                                        DateTime::parse_from_rfc3339(&attr.1)
                                            .ok()
                                            .map(|t| t.with_timezone(&Utc));
                                }
                                _ => {}
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(e) => {
                text.push_str(&e.unescape().map_err(|e| StoreError::InvalidXml(e.to_string()))?);
            }
            Event::End(e) => {
                let tag = qname_str(e.name());
                match (tag.as_str(), section) {
                    ("description", Section::Root) => description = Some(std::mem::take(&mut text)),
                    ("description", Section::Monitor) => {
                        monitor_description = Some(std::mem::take(&mut text));
                    }
                    ("description", Section::Condition) => {
                        if let Some(condition) = current_condition.as_mut() {
                            condition.description = Some(std::mem::take(&mut text));
                        }
                    }
                    ("status", Section::Root) => status = Some(std::mem::take(&mut text)),
                    ("queryCommand", Section::Monitor) => {
                        let value = std::mem::take(&mut text);
                        query_command = (!value.is_empty()).then_some(value);
                    }
                    ("analyzeCommand", Section::Monitor) => {
                        let value = std::mem::take(&mut text);
                        analyze_command = (!value.is_empty()).then_some(value);
                    }
                    ("actionCommand", Section::Monitor) => action_command = Some(std::mem::take(&mut text)),
                    ("applicationMonitor", _) => section = Section::Root,
                    ("condition", _) => {
                        if let Some(condition) = current_condition.take() {
                            conditions.push(condition);
                        }
                        section = Section::Root;
                    }
                    _ => {}
                }
                current_tag = None;
                text.clear();
            }
            _ => {}
        }
    }

    let _ = current_tag;

    let application_name = application_name.ok_or(StoreError::MissingField("applicationName"))?;
    let name = name.ok_or(StoreError::MissingField("name"))?;
    let action_command = action_command.ok_or(StoreError::MissingField("actionCommand"))?;

    let mut monitor = ApplicationMonitor::new(monitor_type, action_command);
    monitor.description = monitor_description;
    monitor.poll_period = poll_period;
    monitor.max_action_invocations = max_action_invocations;
    monitor.query_command = query_command;
    monitor.analyze_command = analyze_command;
    monitor.rule_invocations = counters.rule_invocations;
    monitor.query_invocations_success = counters.query_invocations_success;
    monitor.query_invocations_failure = counters.query_invocations_failure;
    monitor.action_invocations_success = counters.action_invocations_success;
    monitor.action_invocations_failure = counters.action_invocations_failure;
    monitor.last_successful_action_invocation_time =
        counters.last_successful_action_invocation_time;

    let mut rule = Rule::new(application_name, name, monitor);
    rule.description = description;
    if let Some(status) = status {
        rule.status = status;
    }
    rule.xpath_variables = xpath_variables;
    rule.conditions = conditions;

    Ok(rule)
}

fn qname_str(name: quick_xml::name::QName) -> String {
    String::from_utf8_lossy(name.as_ref()).into_owned()
}

fn attrs(e: &quick_xml::events::BytesStart) -> Result<Vec<(String, String)>, StoreError> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| StoreError::InvalidXml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| StoreError::InvalidXml(e.to_string()))?
            .into_owned();
        out.push((key, value));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rule() -> Rule {
        let mut monitor = ApplicationMonitor::new(MonitorType::Poll, "/bin/restart".to_owned());
        monitor.description = Some("watches queue depth".to_owned());
        monitor.poll_period = Some(30.0);
        monitor.max_action_invocations = Some(3);
        monitor.query_command = Some("/bin/query".to_owned());
        monitor.analyze_command = Some("/bin/analyze".to_owned());

        let mut rule = Rule::new("queue-app", "depth-rule", monitor);
        rule.description = Some("restart when queue is deep".to_owned());
        rule.xpath_variables = vec![XPathVariable::new("${host}", "/m/host")];
        rule.conditions = vec![Condition::new("/m/depth", ">", "100")];
        rule
    }

    #[test]
    fn round_trips_through_xml() {
        let rule = sample_rule();
        let xml = write_rule_xml(&rule).unwrap();
        let parsed = parse_rule_xml(&xml).unwrap();

        assert_eq!(parsed.application_name, rule.application_name);
        assert_eq!(parsed.name, rule.name);
        assert_eq!(parsed.description, rule.description);
        assert_eq!(parsed.status, rule.status);
        assert_eq!(parsed.application_monitor.monitor_type, rule.application_monitor.monitor_type);
        assert_eq!(parsed.application_monitor.poll_period, rule.application_monitor.poll_period);
        assert_eq!(
            parsed.application_monitor.max_action_invocations,
            rule.application_monitor.max_action_invocations
        );
        assert_eq!(parsed.application_monitor.action_command, rule.application_monitor.action_command);
        assert_eq!(parsed.xpath_variables.len(), 1);
        assert_eq!(parsed.conditions.len(), 1);
        assert_eq!(parsed.conditions[0].trigger_value, "100");
    }

    #[test]
    fn missing_action_command_is_rejected() {
        let xml = br#"<rule name="r" applicationName="a">
            <applicationMonitor type="event"></applicationMonitor>
        </rule>"#;
        assert!(parse_rule_xml(xml).is_err());
    }

    #[test]
    fn counters_round_trip_after_invocation() {
        let mut rule = sample_rule();
        rule.application_monitor.rule_invocations = 4;
        rule.application_monitor.action_invocations_success = 2;

        let xml = write_rule_xml(&rule).unwrap();
        let parsed = parse_rule_xml(&xml).unwrap();

        assert_eq!(parsed.application_monitor.rule_invocations, 4);
        assert_eq!(parsed.application_monitor.action_invocations_success, 2);
    }
}
