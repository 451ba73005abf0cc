use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Cue {
    /// One countdown digit.
    Tick,
    /// Played once when the SOS fires.
    Alarm,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SoundOperation {
    Play(Cue),
}

impl Operation for SoundOperation {
    type Output = ();
}

pub struct Sound<Ev> {
    context: CapabilityContext<SoundOperation, Ev>,
}

impl<Ev> Capability<Ev> for Sound<Ev> {
    type Operation = SoundOperation;
    type MappedSelf<MappedEv> = Sound<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Sound::new(self.context.map_event(f))
    }
}

impl<Ev> Sound<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<SoundOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn play(&self, cue: Cue) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(SoundOperation::Play(cue)).await;
        });
    }
}
