use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

/// Identifies one scheduled timer. Ids are allocated by the model and never
/// reused, which lets the core ignore completions of timers it has abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(pub u64);

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimerOperation {
    Start { id: TimerId, millis: u64 },
    Cancel { id: TimerId },
}

/// Resolution of a `Start` request. A cancelled timer resolves with
/// `Cancelled` instead of `Fired`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimerOutput {
    Fired { id: TimerId },
    Cancelled { id: TimerId },
}

impl TimerOutput {
    pub const fn id(self) -> TimerId {
        match self {
            Self::Fired { id } | Self::Cancelled { id } => id,
        }
    }

    /// The id of a timer that actually elapsed.
    pub const fn fired(self) -> Option<TimerId> {
        match self {
            Self::Fired { id } => Some(id),
            Self::Cancelled { .. } => None,
        }
    }
}

impl Operation for TimerOperation {
    type Output = TimerOutput;
}

pub struct Timer<Ev> {
    context: CapabilityContext<TimerOperation, Ev>,
}

impl<Ev> Capability<Ev> for Timer<Ev> {
    type Operation = TimerOperation;
    type MappedSelf<MappedEv> = Timer<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Timer::new(self.context.map_event(f))
    }
}

impl<Ev> Timer<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<TimerOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn start<F>(&self, id: TimerId, millis: u64, callback: F)
    where
        F: FnOnce(TimerOutput) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let output = ctx.request_from_shell(TimerOperation::Start { id, millis }).await;
            ctx.update_app(callback(output));
        });
    }

    pub fn cancel(&self, id: TimerId) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(TimerOperation::Cancel { id }).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_accessors() {
        let fired = TimerOutput::Fired { id: TimerId(4) };
        let cancelled = TimerOutput::Cancelled { id: TimerId(5) };
        assert_eq!(fired.id(), TimerId(4));
        assert_eq!(fired.fired(), Some(TimerId(4)));
        assert_eq!(cancelled.id(), TimerId(5));
        assert_eq!(cancelled.fired(), None);
    }

    #[test]
    fn test_timer_id_display() {
        assert_eq!(TimerId(12).to_string(), "timer-12");
    }
}
