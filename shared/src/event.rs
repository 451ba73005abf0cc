use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::account::{LoginForm, SignupForm};
use crate::capabilities::{
    HttpMethod, HttpResult, KvResult, LauncherResult, LocationError, LocationResult, PositionFix,
    TimerOutput,
};
use crate::config::AppConfig;
use crate::contacts::ContactDraft;
use crate::geo::GeoPoint;
use crate::geocode::Placemark;
use crate::model::{Screen, SettingToggle};
use crate::session::StorageKey;

// --- Request bookkeeping carried through capability callbacks ---

/// What an API call was for. Decides how its response is applied.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ApiPurpose {
    Login,
    Register,
    VerifyOtp,
    SendOtp,
    Logout,
    Profile,
    ListContacts,
    CreateContact,
    UpdateContact { id: String },
    DeleteContact { id: String },
    PickerContacts,
    ListSafePlaces,
    CreateSafePlace,
    DeleteSafePlace { id: String },
    SosAlert,
    ContactsAlert,
}

impl ApiPurpose {
    /// Status codes that mean "the access token is no longer good".
    #[must_use]
    pub fn is_auth_failure(&self, status: u16) -> bool {
        match self {
            Self::Profile => matches!(status, 401 | 403),
            _ => status == 401,
        }
    }
}

/// Everything needed to send (or resend) one API request.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ApiCall {
    pub purpose: ApiPurpose,
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
    pub authenticated: bool,
    pub retried: bool,
}

impl ApiCall {
    #[must_use]
    pub fn new(purpose: ApiPurpose, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            purpose,
            method,
            path: path.into(),
            body: None,
            authenticated: true,
            retried: false,
        }
    }

    #[must_use]
    pub fn get(purpose: ApiPurpose, path: impl Into<String>) -> Self {
        Self::new(purpose, HttpMethod::Get, path)
    }

    #[must_use]
    pub fn post(purpose: ApiPurpose, path: impl Into<String>, body: Value) -> Self {
        Self::new(purpose, HttpMethod::Post, path).with_body(body)
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// For login, signup and OTP calls a 401 means bad credentials, not an
    /// expired token, so no refresh is attempted.
    #[must_use]
    pub fn anonymous(mut self) -> Self {
        self.authenticated = false;
        self
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocationPurpose {
    SafeSpaces,
    Sos,
    Refresh,
}

/// A reverse geocode in flight, with the fix it was taken for.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GeocodeRequest {
    pub point: GeoPoint,
    pub timestamp_ms: u64,
    pub purpose: LocationPurpose,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerPurpose {
    Splash,
    Onboarding,
    CountdownTick,
    DispatchGap,
    Toast,
    SafetyTip,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum LaunchAction {
    Call { number: String },
    Directions,
    WhatsApp,
    WhatsAppWeb,
    Share,
    Sms,
    DispatchSms,
    DispatchShare,
    Resource,
}

// --- Event enum: large variants boxed ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    // Lifecycle & navigation
    AppStarted {
        config: Option<Box<AppConfig>>,
    },
    Navigate(Screen),
    Back,
    OnboardingNext,
    OnboardingSkip,
    DismissError,
    DismissToast,

    // Account
    LoginSubmitted(LoginForm),
    SignupSubmitted(Box<SignupForm>),
    VerifyOtpSubmitted {
        code: String,
    },
    ResendOtp,
    Logout,
    SettingToggled {
        toggle: SettingToggle,
        on: bool,
    },
    CancelPinChanged(String),
    NextSafetyTip,

    // Contacts
    ContactFormOpened,
    EditContact {
        id: String,
    },
    ContactFormChanged(Box<ContactDraft>),
    ContactFormCancelled,
    SaveContact,
    DeleteContact {
        id: String,
    },
    CallNumber {
        number: String,
    },
    SupportShowAllToggled,

    // Safe places
    MapTapped {
        latitude: f64,
        longitude: f64,
    },
    PlaceDraftNameChanged(String),
    SavePlaceDraft,
    CancelPlaceDraft,
    DeletePlace {
        id: String,
    },
    NavigateToTarget,
    RefreshLocation,

    // SOS
    CancelSos,
    CloseSos,
    ShareWhatsApp,
    ShareNative,
    SmsContact {
        phone: Option<String>,
    },
    OpenContactPicker,
    ContactPickerClosed,
    ContactToggled {
        id: String,
    },
    SendToSelectedContacts,

    // Legal support
    CallHelpline {
        id: String,
    },
    OpenResource {
        id: String,
    },

    // Pushed by the shell while a position watch is active
    PositionChanged(PositionFix),

    // Capability responses
    ApiResponse {
        call: Box<ApiCall>,
        result: Box<HttpResult>,
    },
    SessionRefreshed {
        call: Box<ApiCall>,
        result: Box<HttpResult>,
    },
    StorageLoaded {
        key: StorageKey,
        result: Box<KvResult>,
    },
    StorageWritten {
        key: StorageKey,
        result: Box<KvResult>,
    },
    PermissionResolved {
        purpose: LocationPurpose,
        force: bool,
        result: Result<(), LocationError>,
    },
    PositionResolved {
        purpose: LocationPurpose,
        force: bool,
        result: Box<Result<PositionFix, LocationError>>,
    },
    GeocodeResolved {
        request: Box<GeocodeRequest>,
        result: Box<Result<Vec<Placemark>, LocationError>>,
    },
    LocationSaved {
        point: GeoPoint,
        result: Box<KvResult>,
    },
    WatchStarted(Box<LocationResult>),
    DraftAddressResolved {
        point: GeoPoint,
        result: Box<Result<Vec<Placemark>, LocationError>>,
    },
    TimerFinished {
        purpose: TimerPurpose,
        output: TimerOutput,
    },
    CallChecked {
        number: String,
        supported: bool,
    },
    WhatsAppChecked {
        supported: bool,
    },
    Launched {
        action: LaunchAction,
        result: Box<LauncherResult>,
    },
}

impl Event {
    /// Stable name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AppStarted { .. } => "app_started",
            Self::Navigate(_) => "navigate",
            Self::Back => "back",
            Self::OnboardingNext => "onboarding_next",
            Self::OnboardingSkip => "onboarding_skip",
            Self::DismissError => "dismiss_error",
            Self::DismissToast => "dismiss_toast",
            Self::LoginSubmitted(_) => "login_submitted",
            Self::SignupSubmitted(_) => "signup_submitted",
            Self::VerifyOtpSubmitted { .. } => "verify_otp_submitted",
            Self::ResendOtp => "resend_otp",
            Self::Logout => "logout",
            Self::SettingToggled { .. } => "setting_toggled",
            Self::CancelPinChanged(_) => "cancel_pin_changed",
            Self::NextSafetyTip => "next_safety_tip",
            Self::ContactFormOpened => "contact_form_opened",
            Self::EditContact { .. } => "edit_contact",
            Self::ContactFormChanged(_) => "contact_form_changed",
            Self::ContactFormCancelled => "contact_form_cancelled",
            Self::SaveContact => "save_contact",
            Self::DeleteContact { .. } => "delete_contact",
            Self::CallNumber { .. } => "call_number",
            Self::SupportShowAllToggled => "support_show_all_toggled",
            Self::MapTapped { .. } => "map_tapped",
            Self::PlaceDraftNameChanged(_) => "place_draft_name_changed",
            Self::SavePlaceDraft => "save_place_draft",
            Self::CancelPlaceDraft => "cancel_place_draft",
            Self::DeletePlace { .. } => "delete_place",
            Self::NavigateToTarget => "navigate_to_target",
            Self::RefreshLocation => "refresh_location",
            Self::CancelSos => "cancel_sos",
            Self::CloseSos => "close_sos",
            Self::ShareWhatsApp => "share_whatsapp",
            Self::ShareNative => "share_native",
            Self::SmsContact { .. } => "sms_contact",
            Self::OpenContactPicker => "open_contact_picker",
            Self::ContactPickerClosed => "contact_picker_closed",
            Self::ContactToggled { .. } => "contact_toggled",
            Self::SendToSelectedContacts => "send_to_selected_contacts",
            Self::CallHelpline { .. } => "call_helpline",
            Self::OpenResource { .. } => "open_resource",
            Self::PositionChanged(_) => "position_changed",
            Self::ApiResponse { .. } => "api_response",
            Self::SessionRefreshed { .. } => "session_refreshed",
            Self::StorageLoaded { .. } => "storage_loaded",
            Self::StorageWritten { .. } => "storage_written",
            Self::PermissionResolved { .. } => "permission_resolved",
            Self::PositionResolved { .. } => "position_resolved",
            Self::GeocodeResolved { .. } => "geocode_resolved",
            Self::LocationSaved { .. } => "location_saved",
            Self::WatchStarted(_) => "watch_started",
            Self::DraftAddressResolved { .. } => "draft_address_resolved",
            Self::TimerFinished { .. } => "timer_finished",
            Self::CallChecked { .. } => "call_checked",
            Self::WhatsAppChecked { .. } => "whatsapp_checked",
            Self::Launched { .. } => "launched",
        }
    }

    /// Events that come from a person tapping something, as opposed to
    /// capability responses and shell pushes.
    #[must_use]
    pub fn is_user_initiated(&self) -> bool {
        !matches!(
            self,
            Self::AppStarted { .. }
                | Self::PositionChanged(_)
                | Self::ApiResponse { .. }
                | Self::SessionRefreshed { .. }
                | Self::StorageLoaded { .. }
                | Self::StorageWritten { .. }
                | Self::PermissionResolved { .. }
                | Self::PositionResolved { .. }
                | Self::GeocodeResolved { .. }
                | Self::LocationSaved { .. }
                | Self::WatchStarted(_)
                | Self::DraftAddressResolved { .. }
                | Self::TimerFinished { .. }
                | Self::CallChecked { .. }
                | Self::WhatsAppChecked { .. }
                | Self::Launched { .. }
        )
    }
}
