//! User and server directory capabilities consumed by the pipeline.
//!
//! The surrounding system owns persistent user/server records and the
//! cryptographic verifiers behind them; the pipeline only sees these traits.
//! Verification calls may hit storage or the network, so they are async and
//! fallible — a verifier fault is distinct from a clean `false` and collapses
//! to the pipeline's generic denial.

use anyhow::Result;
use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use uuid::Uuid;

/// Account variants a connecting identity can hold.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    /// Certificate-bound client account; OTP and plugin checks apply.
    CertClient,
    /// Server-side certificate account; OTP and plugin checks are skipped.
    CertServer,
}

/// Audit trail entry categories recorded by the pipeline.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuditKind {
    UserConnection,
}

impl AuditKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserConnection => "user_connection",
        }
    }
}

/// Server-side connection policy.
pub trait ServerPolicy: Send + Sync {
    fn id(&self) -> Uuid;
    fn name(&self) -> &str;
    /// Whether connecting clients must append a one-time code to the secret.
    fn requires_otp(&self) -> bool;
    /// Whether any of the given groups grant access to this server.
    fn groups_authorized(&self, groups: &[String]) -> bool;
}

/// Directory record and verification capabilities for one user.
#[async_trait]
pub trait UserAccount: Send + Sync {
    fn id(&self) -> Uuid;
    fn name(&self) -> &str;
    fn org_id(&self) -> Uuid;
    fn org_name(&self) -> &str;
    fn groups(&self) -> &[String];
    fn disabled(&self) -> bool;
    fn account_kind(&self) -> AccountKind;
    /// Authentication factors provisioned for this user (`"duo"`,
    /// `"saml_okta"`, ...).
    fn authorization_types(&self) -> &[String];
    /// Per-user exemption from credential, SSO, and push checks.
    fn bypass_secondary(&self) -> bool;
    fn has_pin(&self) -> bool;

    /// Verify a one-time code split off the connecting secret.
    async fn verify_otp(&self, code: &str, remote_ip: IpAddr) -> Result<bool>;
    /// Verify the effective secret against the user's PIN.
    async fn verify_pin(&self, secret: &SecretString) -> Result<bool>;
    /// Verify the effective secret with the user's single sign-on provider.
    async fn verify_sso(&self, secret: &SecretString, remote_ip: IpAddr) -> Result<bool>;
    /// Append an entry to the user's audit trail.
    async fn audit_event(&self, kind: AuditKind, message: &str, remote_ip: IpAddr) -> Result<()>;
}
