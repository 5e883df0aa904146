use policyd_core::{Condition, Operator, XPathVariable};

use crate::document::MonitorDocument;
use crate::error::EvalError;
use crate::substitution::substitute;

/// Result of evaluating one rule's conditions against one monitor document:
/// the trigger verdict, and the variable substitution map built along the
/// way (needed afterwards to resolve `${var}` tokens in the action command).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvalOutcome {
    pub triggered: bool,
    pub substitutions: Vec<(String, String)>,
}

/// Evaluates a rule's XPath variables and conditions against monitor XML.
///
/// Stateless: every input is passed in per call, so one evaluator can serve
/// any number of rules concurrently without shared state.
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Evaluate `conditions` against `xml` (absent when `queryCommand`
    /// produced no output). Never panics and never propagates an error: any
    /// failure is logged and forces the verdict to `false`.
    #[must_use]
    pub fn evaluate(
        xml: Option<&[u8]>,
        xpath_variables: &[XPathVariable],
        conditions: &[Condition],
    ) -> EvalOutcome {
        let Some(xml) = xml else {
            return EvalOutcome::default();
        };

        let doc = match MonitorDocument::parse(xml) {
            Ok(doc) => doc,
            Err(err) => {
                tracing::error!(error = %err, "could not parse monitor data, will not trigger action");
                return EvalOutcome::default();
            }
        };

        let substitutions = build_substitutions(&doc, xpath_variables);
        let triggered = evaluate_conditions(&doc, conditions, &substitutions);

        EvalOutcome {
            triggered,
            substitutions,
        }
    }
}

fn build_substitutions(doc: &MonitorDocument, vars: &[XPathVariable]) -> Vec<(String, String)> {
    vars.iter()
        .map(|v| {
            let value = doc.evaluate_xpath(&v.xpath_expr).unwrap_or_else(|err| {
                tracing::warn!(
                    variable = %v.name,
                    xpath = %v.xpath_expr,
                    error = %err,
                    "could not evaluate xpath variable, substituting empty string"
                );
                String::new()
            });
            (v.name.clone(), value)
        })
        .collect()
}

/// ALL conditions must hold, evaluated in declaration order with a
/// short-circuit on the first `false` (or error, which counts as `false`).
fn evaluate_conditions(
    doc: &MonitorDocument,
    conditions: &[Condition],
    substitutions: &[(String, String)],
) -> bool {
    for condition in conditions {
        match evaluate_one(doc, condition, substitutions) {
            Ok(true) => {}
            Ok(false) => return false,
            Err(err) => {
                tracing::error!(
                    metric_xpath = %condition.metric_xpath,
                    error = %err,
                    "condition evaluation failed, will not trigger action"
                );
                return false;
            }
        }
    }
    true
}

fn evaluate_one(
    doc: &MonitorDocument,
    condition: &Condition,
    substitutions: &[(String, String)],
) -> Result<bool, EvalError> {
    let metric = resolve_metric(doc, &condition.metric_xpath, substitutions)?;

    if metric.is_empty() || metric == "nan" {
        tracing::debug!(metric_xpath = %condition.metric_xpath, "metric undefined, will not trigger");
        return Ok(false);
    }

    let Ok(operator) = condition.evaluation_operator.parse::<Operator>() else {
        tracing::debug!(
            operator = %condition.evaluation_operator,
            "unrecognized evaluation operator, will not trigger"
        );
        return Ok(false);
    };

    let trigger_value = substitute(&condition.trigger_value, substitutions);

    let triggered = evaluate_numeric(&metric, operator, &trigger_value)
        .unwrap_or_else(|| evaluate_string(&metric, operator, &trigger_value));

    Ok(triggered)
}

/// Resolve a condition's `metricXPath`: substitute first; only if no
/// substitution took place (the string came back unchanged) is it evaluated
/// as an XPath expression against the document.
fn resolve_metric(
    doc: &MonitorDocument,
    metric_xpath: &str,
    substitutions: &[(String, String)],
) -> Result<String, EvalError> {
    let substituted = substitute(metric_xpath, substitutions);
    if substituted == metric_xpath {
        doc.evaluate_xpath(metric_xpath)
    } else {
        Ok(substituted)
    }
}

/// Numeric tier: parse both operands as `f64` and compare. `None` (rather
/// than a hard error) signals "fall through to the string tier" for operands
/// that aren't numeric.
///
/// The original builds this tier as `exec('trigger = %s %s %s' % (metric,
/// operator, triggerValue))`: a bare word like `inf`/`infinity`/`nan` is not
/// a Python numeric literal, so `exec` raises `NameError` and falls through
/// to the string tier. `f64::from_str` is more permissive than that literal
/// grammar — it happily parses `"inf"`, `"infinity"`, `"NaN"`, etc. — so
/// operands are validated against a strict numeric-literal shape first.
fn evaluate_numeric(metric: &str, op: Operator, trigger_value: &str) -> Option<bool> {
    let lhs = parse_numeric_literal(metric)?;
    let rhs = parse_numeric_literal(trigger_value)?;
    lhs.partial_cmp(&rhs).map(|ordering| op.apply(ordering))
}

/// Parse `s` as `f64` only if it is a strict numeric literal: optional sign,
/// digits, optional `.digits`, optional `e`/`E` exponent with its own
/// optional sign and digits. Word-based spellings (`inf`, `infinity`, `nan`,
/// in any casing) are rejected rather than silently accepted as numbers.
fn parse_numeric_literal(s: &str) -> Option<f64> {
    if !is_numeric_literal(s.trim()) {
        return None;
    }
    s.trim().parse().ok()
}

fn is_numeric_literal(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;

    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }

    let mut has_digits = false;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
        has_digits = true;
    }

    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            has_digits = true;
        }
    }

    if !has_digits {
        return false;
    }

    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let mut exponent_digits = false;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            exponent_digits = true;
        }
        if !exponent_digits {
            return false;
        }
    }

    i == bytes.len()
}

/// String tier: plain lexicographic comparison of the operand text.
fn evaluate_string(metric: &str, op: Operator, trigger_value: &str) -> bool {
    op.apply(metric.cmp(trigger_value))
}
