//! Out-of-band push approval.
//!
//! Flow Overview:
//! 1) The push check selects a provider once per attempt (Duo wins over Okta
//!    when both are provisioned) and builds the device label shown in the
//!    approval prompt.
//! 2) The final decision forks to [`PushContinuation`], a detached task that
//!    owns the result sink; the synchronous caller returns before the
//!    provider answers.
//!
//! Security boundaries:
//! - A rejected push records its audit event before the denial is delivered.
//! - Provider faults collapse to the same generic denial the pipeline uses,
//!   so this path also delivers exactly one result.
//! - No timeout is applied to the provider call; a provider that never
//!   responds leaves the attempt undelivered.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::error;

use crate::authorize::context::Platform;
use crate::authorize::directory::{AuditKind, UserAccount};
use crate::authorize::settings::AuthSettings;
use crate::authorize::sink::ResultSink;
use crate::authorize::{DenyReason, UNKNOWN_ERROR};

/// Flow tag sent with every push approval request.
pub const CONNECTION_FLOW: &str = "Connection";

/// Push approval providers, in selection priority order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PushKind {
    Duo,
    OktaPush,
}

impl PushKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Duo => "duo",
            Self::OktaPush => "saml_okta",
        }
    }

    #[must_use]
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "duo" => Some(Self::Duo),
            "saml_okta" => Some(Self::OktaPush),
            _ => None,
        }
    }
}

/// Pick the push provider for this attempt, if any is eligible.
///
/// A provider is eligible when it is enabled globally and provisioned in the
/// user's authentication factors; Duo strictly takes priority.
pub(crate) fn select_push_kind(settings: &AuthSettings, user_types: &[String]) -> Option<PushKind> {
    [PushKind::Duo, PushKind::OktaPush]
        .into_iter()
        .find(|kind| {
            settings.sso_push_enabled(*kind) && user_types.iter().any(|t| t == kind.as_str())
        })
}

/// Device label shown in the provider's approval prompt; unrecognized
/// platforms carry no family suffix.
pub(crate) fn device_label(platform: &Platform, device_name: Option<&str>) -> Option<String> {
    let name = device_name?;
    match platform.family() {
        Some(family) => Some(format!("{name} ({family})")),
        None => Some(name.to_string()),
    }
}

/// Context shown to the user in the approval prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushInfo {
    /// Server the connection targets.
    pub server: String,
    /// Device label, when the client reported a device name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

/// One push approval request.
#[derive(Debug, Clone, Serialize)]
pub struct PushRequest {
    pub username: String,
    pub remote_ip: IpAddr,
    /// Always [`CONNECTION_FLOW`] for connection attempts.
    pub flow: &'static str,
    pub info: PushInfo,
}

/// Provider answer; `detail` is opaque provider data and is ignored.
#[derive(Debug, Clone, Default)]
pub struct PushApproval {
    pub allow: bool,
    pub detail: Option<String>,
}

/// Client for the configured push approval providers.
#[async_trait]
pub trait PushProvider: Send + Sync {
    async fn approve(&self, kind: PushKind, request: PushRequest) -> Result<PushApproval>;
}

/// Detached continuation that finishes a forked attempt.
///
/// Owns the result sink from the moment the pipeline forks and applies the
/// same fault discipline as the synchronous path.
pub(crate) struct PushContinuation {
    user: Arc<dyn UserAccount>,
    remote_ip: IpAddr,
    kind: PushKind,
    info: PushInfo,
    provider: Arc<dyn PushProvider>,
    sink: Box<dyn ResultSink>,
}

impl PushContinuation {
    pub(crate) fn new(
        user: Arc<dyn UserAccount>,
        remote_ip: IpAddr,
        kind: PushKind,
        info: PushInfo,
        provider: Arc<dyn PushProvider>,
        sink: Box<dyn ResultSink>,
    ) -> Self {
        Self {
            user,
            remote_ip,
            kind,
            info,
            provider,
            sink,
        }
    }

    pub(crate) async fn run(self) {
        let Self {
            user,
            remote_ip,
            kind,
            info,
            provider,
            sink,
        } = self;

        match Self::verify(user, remote_ip, kind, info, provider).await {
            Ok(true) => sink.deliver(true, None),
            Ok(false) => sink.deliver(false, Some(DenyReason::PushRejected.to_string())),
            Err(err) => {
                error!("Exception in push authorize: {err:#}");
                sink.deliver(false, Some(UNKNOWN_ERROR.to_string()));
            }
        }
    }

    async fn verify(
        user: Arc<dyn UserAccount>,
        remote_ip: IpAddr,
        kind: PushKind,
        info: PushInfo,
        provider: Arc<dyn PushProvider>,
    ) -> Result<bool> {
        let server = info.server.clone();
        let request = PushRequest {
            username: user.name().to_string(),
            remote_ip,
            flow: CONNECTION_FLOW,
            info,
        };

        let approval = provider.approve(kind, request).await?;
        if !approval.allow {
            user.audit_event(
                AuditKind::UserConnection,
                &format!("User connection to \"{server}\" denied. Push authentication failed"),
                remote_ip,
            )
            .await?;
            return Ok(false);
        }

        Ok(true)
    }
}
