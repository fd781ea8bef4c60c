// src/parameter.rs
//
// Automation timeline for a single parameter.

/// One scheduled change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Automation {
    /// Step to `value` at `time`.
    SetValue { value: f32, time: f64 },

    /// Exponential approach to `target` starting at `start`.
    SetTarget {
        target: f32,
        start: f64,
        time_constant: f64,
    },
}

impl Automation {
    #[inline]
    pub fn time(&self) -> f64 {
        match *self {
            Automation::SetValue { time, .. } => time,
            Automation::SetTarget { start, .. } => start,
        }
    }

    /// The value this event moves the parameter towards.
    #[inline]
    pub fn value(&self) -> f32 {
        match *self {
            Automation::SetValue { value, .. } => value,
            Automation::SetTarget { target, .. } => target,
        }
    }
}

/// A parameter's default value plus its scheduled events.
///
/// Events are kept sorted by time. Among events at the same time, later
/// calls sort after earlier ones and so win.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamTimeline {
    default: f32,
    events: Vec<Automation>,
}

impl ParamTimeline {
    pub fn new(default: f32) -> Self {
        Self {
            default,
            events: Vec::new(),
        }
    }

    #[inline]
    pub fn default_value(&self) -> f32 {
        self.default
    }

    pub fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(Automation::SetValue { value, time });
    }

    pub fn set_target_at_time(&mut self, target: f32, start: f64, time_constant: f64) {
        self.insert(Automation::SetTarget {
            target,
            start,
            time_constant,
        });
    }

    fn insert(&mut self, event: Automation) {
        let at = self
            .events
            .partition_point(|e| e.time().total_cmp(&event.time()).is_le());
        self.events.insert(at, event);
    }

    /// Scheduled events in time order.
    pub fn events(&self) -> &[Automation] {
        &self.events
    }

    /// Evaluate the parameter at time `t`.
    pub fn value_at(&self, t: f64) -> f32 {
        let mut value = self.default;
        // (from, target, start, time_constant) of the approach in progress
        let mut approach: Option<(f32, f32, f64, f64)> = None;

        for event in self.events.iter().take_while(|e| e.time() <= t) {
            if let Some(active) = approach.take() {
                value = approach_value(active, event.time());
            }
            match *event {
                Automation::SetValue { value: v, .. } => value = v,
                Automation::SetTarget {
                    target,
                    start,
                    time_constant,
                } => approach = Some((value, target, start, time_constant)),
            }
        }

        match approach {
            Some(active) => approach_value(active, t),
            None => value,
        }
    }
}

#[inline]
fn approach_value((from, target, start, time_constant): (f32, f32, f64, f64), t: f64) -> f32 {
    if time_constant <= 0.0 {
        return target;
    }
    let k = (-(t - start) / time_constant).exp() as f32;
    target + (from - target) * k
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_without_events() {
        let timeline = ParamTimeline::new(0.5);
        assert_eq!(timeline.value_at(10.0), 0.5);
    }

    #[test]
    fn test_set_value_steps() {
        let mut timeline = ParamTimeline::new(0.0);
        timeline.set_value_at_time(1.0, 1.0);
        assert_eq!(timeline.value_at(0.5), 0.0);
        assert_eq!(timeline.value_at(1.0), 1.0);
    }

    #[test]
    fn test_later_call_wins_at_same_time() {
        let mut timeline = ParamTimeline::new(0.0);
        timeline.set_value_at_time(1.0, 0.0);
        timeline.set_value_at_time(0.25, 0.0);
        assert_eq!(timeline.value_at(0.0), 0.25);
    }

    #[test]
    fn test_events_sorted_on_insert() {
        let mut timeline = ParamTimeline::new(0.0);
        timeline.set_value_at_time(0.5, 2.0);
        timeline.set_value_at_time(1.0, 1.0);
        timeline.set_value_at_time(0.75, 1.0);

        let times: Vec<f64> = timeline.events().iter().map(Automation::time).collect();
        assert_eq!(times, vec![1.0, 1.0, 2.0]);
        assert_eq!(timeline.value_at(1.5), 0.75);
        assert_eq!(timeline.value_at(2.0), 0.5);
    }

    #[test]
    fn test_exponential_approach() {
        let mut timeline = ParamTimeline::new(0.0);
        timeline.set_target_at_time(1.0, 0.0, 0.5);

        // One time constant covers ~63% of the distance
        assert_relative_eq!(
            timeline.value_at(0.5),
            1.0 - (-1.0f32).exp(),
            epsilon = 1e-6
        );
        // Never quite arrives
        assert!(timeline.value_at(2.0) < 1.0);
    }

    #[test]
    fn test_approach_interrupted_by_step() {
        let mut timeline = ParamTimeline::new(1.0);
        timeline.set_target_at_time(0.0, 0.0, 1.0);
        timeline.set_value_at_time(0.75, 2.0);
        assert_eq!(timeline.value_at(3.0), 0.75);
    }

    #[test]
    fn test_approach_continues_from_current_value() {
        let mut timeline = ParamTimeline::new(0.0);
        timeline.set_target_at_time(1.0, 0.0, 1.0);
        timeline.set_target_at_time(0.0, 1.0, 1.0);

        let at_one = 1.0 - (-1.0f32).exp();
        assert_relative_eq!(
            timeline.value_at(2.0),
            at_one * (-1.0f32).exp(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_zero_time_constant_jumps() {
        let mut timeline = ParamTimeline::new(0.0);
        timeline.set_target_at_time(0.8, 0.0, 0.0);
        assert_eq!(timeline.value_at(0.0), 0.8);
    }
}
