//! Drives the core the way a shell would: run an event, collect the effects,
//! resolve them by hand and feed the resulting events back in.

#![allow(dead_code)]

use crux_core::capability::Operation;
use crux_core::testing::{AppTester, Update};
use crux_core::Request;
use serde_json::Value;

use crux_http::protocol::{HttpRequest, HttpResponse, HttpResult};
use crux_kv::value::Value as Stored;
use crux_kv::{KeyValueOperation, KeyValueResponse, KeyValueResult};
use sheild_core::capabilities::{
    HttpMethod, LauncherOperation, LocationOperation, SoundOperation, TimerId, TimerOperation,
    TimerOutput,
};
use sheild_core::{App, Effect, Event, Model};

#[derive(Default)]
pub struct Effects {
    pub http: Vec<Request<HttpRequest>>,
    pub kv: Vec<Request<KeyValueOperation>>,
    pub location: Vec<Request<LocationOperation>>,
    pub timer: Vec<Request<TimerOperation>>,
    pub launcher: Vec<Request<LauncherOperation>>,
    pub sound: Vec<Request<SoundOperation>>,
    pub renders: usize,
}

impl Effects {
    fn push(&mut self, effect: Effect) {
        match effect {
            Effect::Http(r) => self.http.push(r),
            Effect::KeyValue(r) => self.kv.push(r),
            Effect::Location(r) => self.location.push(r),
            Effect::Timer(r) => self.timer.push(r),
            Effect::Launcher(r) => self.launcher.push(r),
            Effect::Sound(r) => self.sound.push(r),
            Effect::Render(_) => self.renders += 1,
        }
    }

    pub fn merge(&mut self, other: Effects) {
        self.http.extend(other.http);
        self.kv.extend(other.kv);
        self.location.extend(other.location);
        self.timer.extend(other.timer);
        self.launcher.extend(other.launcher);
        self.sound.extend(other.sound);
        self.renders += other.renders;
    }

    /// Removes the single HTTP request to `path` (query string ignored).
    pub fn take_http(&mut self, path: &str) -> Request<HttpRequest> {
        let index = self
            .http
            .iter()
            .position(|r| url_path(&r.operation) == path)
            .unwrap_or_else(|| panic!("no request to {path} in {:?}", self.http_paths()));
        self.http.remove(index)
    }

    pub fn has_http(&self, path: &str) -> bool {
        self.http.iter().any(|r| url_path(&r.operation) == path)
    }

    pub fn http_paths(&self) -> Vec<String> {
        self.http
            .iter()
            .map(|r| url_path(&r.operation).to_string())
            .collect()
    }

    /// Removes the storage request touching `key`.
    pub fn take_kv(&mut self, key: &str) -> Request<KeyValueOperation> {
        let index = self
            .kv
            .iter()
            .position(|r| stored_key(&r.operation) == Some(key))
            .unwrap_or_else(|| panic!("no storage request for {key}"));
        self.kv.remove(index)
    }

    pub fn kv_writes(&self) -> Vec<(String, Option<Vec<u8>>)> {
        self.kv
            .iter()
            .filter_map(|r| match &r.operation {
                KeyValueOperation::Set { key, value } => Some((key.clone(), Some(value.clone()))),
                KeyValueOperation::Delete { key } => Some((key.clone(), None)),
                _ => None,
            })
            .collect()
    }

    /// Removes the pending timer start, returning its id and duration.
    pub fn take_timer_start(&mut self) -> (Request<TimerOperation>, TimerId, u64) {
        let index = self
            .timer
            .iter()
            .position(|r| matches!(r.operation, TimerOperation::Start { .. }))
            .expect("a timer should have been started");
        let request = self.timer.remove(index);
        let TimerOperation::Start { id, millis } = request.operation else {
            unreachable!()
        };
        (request, id, millis)
    }

    pub fn cancelled_timers(&self) -> Vec<TimerId> {
        self.timer
            .iter()
            .filter_map(|r| match r.operation {
                TimerOperation::Cancel { id } => Some(id),
                TimerOperation::Start { .. } => None,
            })
            .collect()
    }

    pub fn take_location(&mut self) -> Request<LocationOperation> {
        assert!(!self.location.is_empty(), "a location request was expected");
        self.location.remove(0)
    }

    pub fn take_launcher(&mut self) -> Request<LauncherOperation> {
        assert!(!self.launcher.is_empty(), "a launcher request was expected");
        self.launcher.remove(0)
    }
}

fn stored_key(operation: &KeyValueOperation) -> Option<&str> {
    match operation {
        KeyValueOperation::Get { key }
        | KeyValueOperation::Set { key, .. }
        | KeyValueOperation::Delete { key } => Some(key),
        _ => None,
    }
}

/// Read-only view of a request the core handed to the shell.
pub struct Sent<'a>(&'a HttpRequest);

impl Sent<'_> {
    pub fn method(&self) -> HttpMethod {
        match self.0.method.to_ascii_uppercase().as_str() {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "DELETE" => HttpMethod::Delete,
            other => panic!("unexpected method {other}"),
        }
    }

    pub fn url(&self) -> &str {
        &self.0.url
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.0
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_slice(&self.0.body).ok()
    }
}

pub fn request_of(request: &Request<HttpRequest>) -> Sent<'_> {
    Sent(&request.operation)
}

fn url_path(request: &HttpRequest) -> &str {
    let url = request.url.as_str();
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = without_scheme
        .find('/')
        .map_or("/", |i| &without_scheme[i..]);
    path.split('?').next().unwrap_or(path)
}

pub fn ok_json(status: u16, body: Value) -> HttpResult {
    HttpResult::Ok(HttpResponse::status(status).body(body.to_string()).build())
}

/// The shell never reached the server.
pub fn offline() -> HttpResult {
    HttpResult::Err(crux_http::Error::Io("network is unreachable".to_string()))
}

pub fn stored(value: &str) -> KeyValueResult {
    KeyValueResult::Ok {
        response: KeyValueResponse::Get {
            value: Stored::Bytes(value.as_bytes().to_vec()),
        },
    }
}

pub fn missing() -> KeyValueResult {
    KeyValueResult::Ok {
        response: KeyValueResponse::Get { value: Stored::None },
    }
}

pub fn fired(id: TimerId) -> TimerOutput {
    TimerOutput::Fired { id }
}

pub struct Shell {
    pub app: AppTester<App, Effect>,
    pub model: Model,
}

impl Shell {
    pub fn new() -> Self {
        Self {
            app: AppTester::default(),
            model: Model::default(),
        }
    }

    pub fn send(&mut self, event: Event) -> Effects {
        let update = self.app.update(event, &mut self.model);
        self.absorb(update)
    }

    pub fn resolve<Op: Operation>(&mut self, request: &mut Request<Op>, output: Op::Output) -> Effects {
        let update = self
            .app
            .resolve(request, output)
            .expect("request should be resolvable");
        self.absorb(update)
    }

    fn absorb(&mut self, update: Update<Effect, Event>) -> Effects {
        let mut effects = Effects::default();
        for effect in update.effects {
            effects.push(effect);
        }
        for event in update.events {
            let more = self.send(event);
            effects.merge(more);
        }
        effects
    }

    /// Starts the core and answers the startup reads: an empty store unless
    /// `access_token` is given. Leaves the app past the splash screen.
    pub fn boot(access_token: Option<&str>) -> (Self, Effects) {
        let mut shell = Self::new();
        let mut effects = shell.send(Event::AppStarted { config: None });
        let mut after = Effects::default();

        for key in ["accessToken", "refreshToken", "user", "CURRENT_LOCATION_V1"] {
            let mut read = effects.take_kv(key);
            let output = match (key, access_token) {
                ("accessToken", Some(token)) => stored(token),
                ("refreshToken", Some(_)) => stored("refresh-1"),
                ("user", Some(_)) => stored(r#"{"_id":"u1","full_name":"Ayesha Khan","email":"ayesha@example.com"}"#),
                _ => missing(),
            };
            after.merge(shell.resolve(&mut read, output));
        }

        let (mut splash, id, _) = effects.take_timer_start();
        after.merge(shell.resolve(&mut splash, fired(id)));
        (shell, after)
    }
}
