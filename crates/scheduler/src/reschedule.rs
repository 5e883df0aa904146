use chrono::{DateTime, Utc};

/// Computes the poll period (in seconds) to use for the *next* poll timer,
/// reproducing the source's rate-limit check verbatim:
///
/// ```text
/// possibleNewSuccessfulActionTime = now + pollPeriod - lastSuccessfulActionTime
/// if possibleNewSuccessfulActionTime < minTriggerInterval:
///     pollPeriod = minTriggerInterval
/// ```
///
/// With no prior successful action, the configured `poll_period_secs` is
/// used unchanged — there is nothing to rate-limit against yet.
#[must_use]
pub fn next_poll_period_secs(
    poll_period_secs: f64,
    last_successful_action_time: Option<DateTime<Utc>>,
    min_trigger_interval_secs: f64,
    now: DateTime<Utc>,
) -> f64 {
    let Some(last) = last_successful_action_time else {
        return poll_period_secs;
    };

    let elapsed_secs = (now - last).num_milliseconds() as f64 / 1000.0;
    let possible_new_successful_action_time = elapsed_secs + poll_period_secs;

    if possible_new_successful_action_time < min_trigger_interval_secs {
        min_trigger_interval_secs
    } else {
        poll_period_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn uses_configured_period_with_no_prior_success() {
        let now = Utc::now();
        assert_eq!(next_poll_period_secs(30.0, None, 60.0, now), 30.0);
    }

    #[test]
    fn widens_to_min_trigger_interval_when_firing_too_soon() {
        let now = Utc::now();
        let last = now - ChronoDuration::seconds(5);
        // elapsed(5) + pollPeriod(30) = 35 < minTriggerInterval(60)
        assert_eq!(next_poll_period_secs(30.0, Some(last), 60.0, now), 60.0);
    }

    #[test]
    fn keeps_configured_period_when_spacing_is_sufficient() {
        let now = Utc::now();
        let last = now - ChronoDuration::seconds(120);
        // elapsed(120) + pollPeriod(30) = 150 >= minTriggerInterval(60)
        assert_eq!(next_poll_period_secs(30.0, Some(last), 60.0, now), 30.0);
    }
}
