use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hands URLs (`tel:`, `sms:`, `whatsapp:`, `https:`, `geo:`) and share-sheet
/// text to the operating system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LauncherOperation {
    CanOpen { url: String },
    Open { url: String },
    Share { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LauncherOutput {
    Supported(bool),
    Opened,
    Shared { completed: bool },
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum LauncherError {
    #[error("No application can open {url}")]
    CannotOpen { url: String },

    #[error("Could not open the share sheet: {message}")]
    ShareFailed { message: String },

    #[error("Unexpected launcher response")]
    UnexpectedOutput,
}

pub type LauncherResult = Result<LauncherOutput, LauncherError>;

impl Operation for LauncherOperation {
    type Output = LauncherResult;
}

pub struct Launcher<Ev> {
    context: CapabilityContext<LauncherOperation, Ev>,
}

impl<Ev> Capability<Ev> for Launcher<Ev> {
    type Operation = LauncherOperation;
    type MappedSelf<MappedEv> = Launcher<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Launcher::new(self.context.map_event(f))
    }
}

impl<Ev> Launcher<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<LauncherOperation, Ev>) -> Self {
        Self { context }
    }

    fn request<F>(&self, operation: LauncherOperation, callback: F)
    where
        F: FnOnce(LauncherResult) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx.request_from_shell(operation).await;
            ctx.update_app(callback(result));
        });
    }

    /// Whether some installed app handles `url`. Errors count as `false`.
    pub fn can_open<F>(&self, url: impl Into<String>, callback: F)
    where
        F: FnOnce(bool) -> Ev + Send + 'static,
    {
        self.request(LauncherOperation::CanOpen { url: url.into() }, move |result| {
            callback(matches!(result, Ok(LauncherOutput::Supported(true))))
        });
    }

    pub fn open<F>(&self, url: impl Into<String>, callback: F)
    where
        F: FnOnce(LauncherResult) -> Ev + Send + 'static,
    {
        self.request(LauncherOperation::Open { url: url.into() }, callback);
    }

    pub fn share<F>(&self, message: impl Into<String>, callback: F)
    where
        F: FnOnce(LauncherResult) -> Ev + Send + 'static,
    {
        self.request(
            LauncherOperation::Share {
                message: message.into(),
            },
            callback,
        );
    }
}
