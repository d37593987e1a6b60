//! Runtime policy settings injected into the pipeline.
//!
//! The surrounding process owns settings storage; the pipeline receives one
//! explicit [`AuthSettings`] value at construction rather than reading
//! ambient global state.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::authorize::push::PushKind;

const ENV_STRESS_TEST: &str = "APROBO_STRESS_TEST";
const ENV_PIN_MODE: &str = "APROBO_PIN_MODE";
const ENV_SSO_PUSH: &str = "APROBO_SSO_PUSH";

/// Global PIN requirement policy.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinMode {
    /// PINs are never checked, even when set.
    Disabled,
    /// A set PIN is checked; users without one may still connect.
    Optional,
    /// Users without a PIN are denied.
    Required,
}

impl PinMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Optional => "optional",
            Self::Required => "required",
        }
    }

    #[must_use]
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "disabled" => Some(Self::Disabled),
            "optional" => Some(Self::Optional),
            "required" => Some(Self::Required),
            _ => None,
        }
    }
}

/// Identity of the host dispatching plugin events.
#[derive(Clone, Debug)]
pub struct HostIdentity {
    id: Uuid,
    name: String,
}

impl HostIdentity {
    #[must_use]
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Pipeline-wide toggles, loaded once at startup.
#[derive(Clone, Debug)]
pub struct AuthSettings {
    stress_test: bool,
    pin_mode: PinMode,
    sso_push: HashSet<PushKind>,
    host: HostIdentity,
}

impl AuthSettings {
    #[must_use]
    pub fn new(host: HostIdentity) -> Self {
        Self {
            stress_test: false,
            pin_mode: PinMode::Optional,
            sso_push: HashSet::new(),
            host,
        }
    }

    /// Disable all secondary checks, used for load testing.
    #[must_use]
    pub fn with_stress_test(mut self, stress_test: bool) -> Self {
        self.stress_test = stress_test;
        self
    }

    #[must_use]
    pub fn with_pin_mode(mut self, pin_mode: PinMode) -> Self {
        self.pin_mode = pin_mode;
        self
    }

    /// Enable push approval through `kind`.
    #[must_use]
    pub fn with_sso_push(mut self, kind: PushKind) -> Self {
        self.sso_push.insert(kind);
        self
    }

    #[must_use]
    pub fn stress_test(&self) -> bool {
        self.stress_test
    }

    #[must_use]
    pub fn pin_mode(&self) -> PinMode {
        self.pin_mode
    }

    pub(crate) fn sso_push_enabled(&self, kind: PushKind) -> bool {
        self.sso_push.contains(&kind)
    }

    #[must_use]
    pub fn host(&self) -> &HostIdentity {
        &self.host
    }

    /// Load toggles from environment variables.
    ///
    /// `APROBO_STRESS_TEST` disables all secondary checks for load testing;
    /// `APROBO_PIN_MODE` is one of `disabled`/`optional`/`required`;
    /// `APROBO_SSO_PUSH` is a comma-separated provider list (`duo`,
    /// `saml_okta`). Unset or unparsable values keep the defaults.
    #[must_use]
    pub fn from_env(host: HostIdentity) -> Self {
        let mut settings = Self::new(host);

        settings.stress_test = parse_bool_env(ENV_STRESS_TEST).unwrap_or(false);

        if let Some(mode) = std::env::var(ENV_PIN_MODE)
            .ok()
            .and_then(|value| PinMode::from_str(&value))
        {
            settings.pin_mode = mode;
        }

        if let Ok(kinds) = std::env::var(ENV_SSO_PUSH) {
            settings.sso_push = kinds.split(',').filter_map(PushKind::from_str).collect();
        }

        settings
    }
}

fn parse_bool_env(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|value| match value.trim() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
}
