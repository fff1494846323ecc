/*
Parameter Automation
====================

A parameter's value over time is described by an ordered list of events:

  Set(value, t)       jump to `value` at time t
  Ramp(value, t)      move linearly from the previous event to `value`,
                      arriving at time t

Evaluating at time t walks the list: the last event at or before t gives the
held value, unless the next event is a ramp, in which case we interpolate
between the previous event and the ramp target.

  value
   1.0 ┤        ╱‾‾‾‾╲
       │       ╱      ╲_______
   0.5 ┤      ╱
       │     ╱
   0.0 ┼────●────────────────────→ t
          Set  Ramp  Ramp

Cancel-and-hold
---------------
Re-triggering an envelope while a previous ramp is still in flight must not
jump. `cancel_and_hold_at(t)` snapshots the value at t, discards everything
scheduled after t (including a ramp that would end later) and appends
`Set(held, t)`. New ramps then start from exactly where the level was.

History
-------
Nothing before the last event at or before t can change a value at t or
later, so `forget_before(t)` drops it. The hold above is such an anchor, and
the provider forgets everything before its clock on every write, so a
timeline only ever holds one anchor plus what is still scheduled.

Ties keep insertion order, so two events at the same timestamp apply in the
order they were scheduled. The envelope adds a small safety gap between phase
transitions so this case does not come up in practice.
*/

#[derive(Debug, Clone, Copy, PartialEq)]
enum EventKind {
    Set,
    LinearRamp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct AutomationEvent {
    time: f64,
    value: f32,
    kind: EventKind,
}

#[derive(Debug, Clone)]
pub struct AutomationTimeline {
    /// Value when no event applies
    intrinsic: f32,
    events: Vec<AutomationEvent>,
}

impl AutomationTimeline {
    pub fn new(intrinsic: f32) -> Self {
        Self {
            intrinsic,
            events: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn set_value_at(&mut self, value: f32, time: f64) {
        self.insert(AutomationEvent {
            time,
            value,
            kind: EventKind::Set,
        });
    }

    /// `now` anchors the ramp start when nothing was scheduled before it.
    pub fn linear_ramp_to_value_at(&mut self, value: f32, end_time: f64, now: f64) {
        if self.events.is_empty() {
            self.set_value_at(self.intrinsic, now.min(end_time));
        }
        self.insert(AutomationEvent {
            time: end_time,
            value,
            kind: EventKind::LinearRamp,
        });
    }

    pub fn cancel_and_hold_at(&mut self, time: f64) {
        let held = self.value_at(time);
        self.events.retain(|e| e.time <= time);
        self.set_value_at(held, time);
        self.forget_before(time);
    }

    /// Drop events that cannot affect values at `time` or later. Values
    /// before `time` are no longer reproduced.
    pub fn forget_before(&mut self, time: f64) {
        let applied = self.events.partition_point(|e| e.time <= time);
        if applied > 1 {
            self.events.drain(..applied - 1);
        }
    }

    pub fn value_at(&self, time: f64) -> f32 {
        let mut prev_time = f64::NEG_INFINITY;
        let mut prev_value = self.intrinsic;

        for event in &self.events {
            if event.time <= time {
                prev_time = event.time;
                prev_value = event.value;
                continue;
            }

            return match event.kind {
                EventKind::Set => prev_value,
                EventKind::LinearRamp if prev_time.is_finite() => {
                    let progress = ((time - prev_time) / (event.time - prev_time)) as f32;
                    prev_value + (event.value - prev_value) * progress
                }
                EventKind::LinearRamp => prev_value,
            };
        }

        prev_value
    }

    fn insert(&mut self, event: AutomationEvent) {
        let index = self.events.partition_point(|e| e.time <= event.time);
        self.events.insert(index, event);
    }
}
