//! Connection authorization pipeline.
//!
//! Flow Overview:
//! 1) primary — server group membership and account enablement.
//! 2) credential — OTP code (certificate-bound accounts) and PIN policy.
//! 3) single sign-on — secondary verification against the identity provider.
//! 4) plugin policy — registered plugins vote in order, first disallow wins.
//! 5) push — out-of-band approval, forked to a background continuation.
//!    Skipped entirely when the attempt is a reauth.
//!
//! Security boundaries:
//! - Every denial records its audit event before the denial is reported.
//! - The result sink consumes itself on delivery, so exactly one result is
//!   produced per attempt, on whichever path completes it.
//! - A forked attempt hands the sink to the continuation before the provider
//!   outcome is known; the synchronous caller never sees the push result.
//! - Faults are caught once at the pipeline boundary and reported as a
//!   generic denial; internal error detail never reaches the caller.

pub mod context;
pub mod directory;
pub mod plugins;
pub mod push;
pub mod settings;
pub mod sink;
pub mod spawner;


pub use context::{ConnectContext, Platform};
pub use directory::{AccountKind, AuditKind, ServerPolicy, UserAccount};
pub use plugins::{ConnectEvent, PluginRegistry, PluginVerdict, USER_CONNECT};
pub use push::{CONNECTION_FLOW, PushApproval, PushInfo, PushKind, PushProvider, PushRequest};
pub use settings::{AuthSettings, HostIdentity, PinMode};
pub use sink::ResultSink;
pub use spawner::{BackgroundTask, TaskSpawner, TokioSpawner};

use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::{debug, error};

use crate::authorize::context::split_otp_code;
use crate::authorize::push::{device_label, select_push_kind, PushContinuation};

/// Reason reported when an attempt fails for anything other than a policy
/// denial. The misspelling is load-bearing; connecting clients match on it.
pub const UNKNOWN_ERROR: &str = "Unknown error occured";

/// User-facing reasons an authorization attempt can be denied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DenyReason {
    #[error("User not in servers groups")]
    GroupMismatch,
    #[error("User is disabled")]
    UserDisabled,
    #[error("Invalid OTP code")]
    InvalidOtpCode,
    #[error("Invalid pin")]
    InvalidPin,
    #[error("User does not have a pin set")]
    PinNotSet,
    #[error("Failed secondary authentication")]
    SecondaryFailed,
    #[error("User failed push authentication")]
    PushRejected,
    /// Verdict reason from the first disallowing plugin, verbatim.
    #[error("{0}")]
    Plugin(String),
}

/// Outcome of a single pipeline check.
///
/// `Forked` is a control transfer, not an error: the sink has already moved
/// to a background continuation and the pipeline must stop without
/// delivering anything.
#[derive(Debug)]
pub(crate) enum StepOutcome {
    Continue,
    Deny(DenyReason),
    Forked,
}

/// Single-attempt authorization pipeline.
///
/// One authorizer is built per connection attempt and consumed by
/// [`Authorizer::authorize`]. All collaborators are injected; the pipeline
/// itself performs no storage or network I/O.
pub struct Authorizer {
    context: ConnectContext,
    settings: AuthSettings,
    plugins: Arc<dyn PluginRegistry>,
    push: Arc<dyn PushProvider>,
    spawner: Arc<dyn TaskSpawner>,
    sink: Option<Box<dyn ResultSink>>,
}

impl Authorizer {
    #[must_use]
    pub fn new(
        context: ConnectContext,
        settings: AuthSettings,
        plugins: Arc<dyn PluginRegistry>,
        push: Arc<dyn PushProvider>,
        spawner: Arc<dyn TaskSpawner>,
        sink: Box<dyn ResultSink>,
    ) -> Self {
        Self {
            context,
            settings,
            plugins,
            push,
            spawner,
            sink: Some(sink),
        }
    }

    /// Run the checks in order and deliver exactly one result through the
    /// sink.
    ///
    /// Returns once the attempt has been decided or forked; a forked attempt
    /// delivers its result later, from the background continuation.
    pub async fn authorize(mut self) {
        match self.run_checks().await {
            Ok(StepOutcome::Continue) => self.finish(true, None),
            Ok(StepOutcome::Deny(reason)) => self.finish(false, Some(reason.to_string())),
            Ok(StepOutcome::Forked) => {
                debug!(
                    user = %self.context.user().name(),
                    "authorization forked to push continuation"
                );
            }
            Err(err) => {
                error!("Exception in user authorize: {err:#}");
                self.finish(false, Some(UNKNOWN_ERROR.to_string()));
            }
        }
    }

    fn finish(&mut self, success: bool, reason: Option<String>) {
        match self.sink.take() {
            Some(sink) => sink.deliver(success, reason),
            // Contract violation; the sink only leaves through delivery or a fork.
            None => error!("authorization result already delivered"),
        }
    }

    async fn run_checks(&mut self) -> Result<StepOutcome> {
        match self.check_primary().await? {
            StepOutcome::Continue => {}
            halt => return Ok(halt),
        }
        match self.check_credential().await? {
            StepOutcome::Continue => {}
            halt => return Ok(halt),
        }
        match self.check_sso().await? {
            StepOutcome::Continue => {}
            halt => return Ok(halt),
        }
        match self.check_plugins().await? {
            StepOutcome::Continue => {}
            halt => return Ok(halt),
        }
        if !self.context.reauth() {
            match self.check_push().await? {
                StepOutcome::Continue => {}
                halt => return Ok(halt),
            }
        }
        Ok(StepOutcome::Continue)
    }

    /// Group membership and account enablement.
    async fn check_primary(&self) -> Result<StepOutcome> {
        let user = self.context.user();

        if !self.context.server().groups_authorized(user.groups()) {
            self.audit_denial("User not in servers groups").await?;
            return Ok(StepOutcome::Deny(DenyReason::GroupMismatch));
        }

        if user.disabled() {
            self.audit_denial("User is disabled").await?;
            return Ok(StepOutcome::Deny(DenyReason::UserDisabled));
        }

        Ok(StepOutcome::Continue)
    }

    /// OTP code extraction/verification and PIN policy.
    async fn check_credential(&mut self) -> Result<StepOutcome> {
        if self.secondary_bypassed() {
            return Ok(StepOutcome::Continue);
        }

        if self.context.server().requires_otp()
            && self.context.user().account_kind() == AccountKind::CertClient
        {
            let split = split_otp_code(self.context.secret());
            let verified = match split {
                Some((effective, code)) => {
                    // Single write: later checks and plugins see the prefix.
                    self.context.set_secret(effective);
                    self.context
                        .user()
                        .verify_otp(&code, self.context.remote_ip())
                        .await?
                }
                // A secret shorter than the code length cannot carry one.
                None => false,
            };

            if !verified {
                self.audit_denial("User failed two-step authentication")
                    .await?;
                return Ok(StepOutcome::Deny(DenyReason::InvalidOtpCode));
            }
        }

        if self.context.user().has_pin() && self.settings.pin_mode() != PinMode::Disabled {
            if !self
                .context
                .user()
                .verify_pin(self.context.secret())
                .await?
            {
                self.audit_denial("User failed pin authentication").await?;
                return Ok(StepOutcome::Deny(DenyReason::InvalidPin));
            }
        } else if self.settings.pin_mode() == PinMode::Required {
            self.audit_denial("User does not have a pin set").await?;
            return Ok(StepOutcome::Deny(DenyReason::PinNotSet));
        }

        Ok(StepOutcome::Continue)
    }

    /// Secondary verification against the identity provider.
    async fn check_sso(&self) -> Result<StepOutcome> {
        if self.secondary_bypassed() {
            return Ok(StepOutcome::Continue);
        }

        if !self
            .context
            .user()
            .verify_sso(self.context.secret(), self.context.remote_ip())
            .await?
        {
            self.audit_denial("Single sign-on authentication failed")
                .await?;
            return Ok(StepOutcome::Deny(DenyReason::SecondaryFailed));
        }

        Ok(StepOutcome::Continue)
    }

    /// Plugin verdicts for certificate-bound accounts, first disallow wins.
    ///
    /// Plugins record their own audit events; the pipeline only relays the
    /// verdict reason.
    async fn check_plugins(&self) -> Result<StepOutcome> {
        if self.context.user().account_kind() != AccountKind::CertClient {
            return Ok(StepOutcome::Continue);
        }

        let event = ConnectEvent::from_attempt(self.settings.host(), &self.context);
        let verdicts = self
            .plugins
            .dispatch(USER_CONNECT, serde_json::to_value(&event)?)
            .await?;

        for verdict in verdicts {
            if !verdict.allow {
                return Ok(StepOutcome::Deny(DenyReason::Plugin(verdict.reason)));
            }
        }

        Ok(StepOutcome::Continue)
    }

    /// Out-of-band push approval, forked to a background continuation.
    async fn check_push(&mut self) -> Result<StepOutcome> {
        if self.secondary_bypassed() {
            return Ok(StepOutcome::Continue);
        }

        let Some(kind) =
            select_push_kind(&self.settings, self.context.user().authorization_types())
        else {
            return Ok(StepOutcome::Continue);
        };
        self.context.set_push_kind(kind);

        let info = PushInfo {
            server: self.context.server().name().to_string(),
            device: device_label(self.context.platform(), self.context.device_name()),
        };

        // Sink ownership moves to the continuation before the provider is
        // called; from here the synchronous path must not deliver anything.
        let sink = self
            .sink
            .take()
            .ok_or_else(|| anyhow!("result sink already taken before push fork"))?;

        let continuation = PushContinuation::new(
            self.context.user_handle(),
            self.context.remote_ip(),
            kind,
            info,
            Arc::clone(&self.push),
            sink,
        );
        self.spawner.spawn(Box::pin(continuation.run()));

        Ok(StepOutcome::Forked)
    }

    fn secondary_bypassed(&self) -> bool {
        self.context.user().bypass_secondary() || self.settings.stress_test()
    }

    async fn audit_denial(&self, detail: &str) -> Result<()> {
        let message = format!(
            "User connection to \"{}\" denied. {detail}",
            self.context.server().name()
        );
        self.context
            .user()
            .audit_event(
                AuditKind::UserConnection,
                &message,
                self.context.remote_ip(),
            )
            .await
    }
}
