mod http;
mod kv;
mod launcher;
mod location;
mod sound;
mod timer;

pub use self::http::{
    Http, HttpError, HttpHeaders, HttpMethod, HttpRequest, HttpResponse, HttpResult,
    ValidatedUrl,
};
pub use self::kv::{KeyValue, KvError, KvKey, KvOutput, KvResult, StorageErrorCode};
pub use self::launcher::{Launcher, LauncherError, LauncherOperation, LauncherOutput, LauncherResult};
pub use self::location::{
    Accuracy, Location, LocationError, LocationOperation, LocationOutput, LocationResult,
    PermissionState, PositionFix,
};
pub use self::sound::{Cue, Sound, SoundOperation};
pub use self::timer::{Timer, TimerId, TimerOperation, TimerOutput};

pub use crux_core::render::Render;

pub type AppHttp = Http<Event>;
pub type AppKv = KeyValue<Event>;

// The Effect derive looks up `App` by name.
use crate::app::App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub kv: KeyValue<Event>,
    pub location: Location<Event>,
    pub timer: Timer<Event>,
    pub launcher: Launcher<Event>,
    pub sound: Sound<Event>,
    pub render: Render<Event>,
}
