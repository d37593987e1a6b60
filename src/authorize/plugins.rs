//! Policy plugin dispatch.
//!
//! Plugins run inside an external engine; the pipeline serializes the
//! connection attempt into a flat field map, dispatches one event, and
//! evaluates the verdicts in plugin registration order — the first disallow
//! wins and its reason is reported to the user verbatim. Denying plugins
//! record their own audit events.

use anyhow::Result;
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Serialize;
use std::net::IpAddr;
use uuid::Uuid;

use crate::authorize::context::ConnectContext;
use crate::authorize::settings::HostIdentity;

/// Event dispatched for every certificate-bound connection attempt.
pub const USER_CONNECT: &str = "user_connect";

/// Verdict returned by one registered plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginVerdict {
    pub allow: bool,
    /// User-facing reason, only meaningful when `allow` is false.
    pub reason: String,
}

/// Field map serialized into the `user_connect` dispatch payload.
#[derive(Debug, Serialize)]
pub struct ConnectEvent {
    pub host_id: Uuid,
    pub host_name: String,
    pub server_id: Uuid,
    pub server_name: String,
    pub org_id: Uuid,
    pub org_name: String,
    pub user_id: Uuid,
    pub user_name: String,
    pub remote_ip: IpAddr,
    pub platform: String,
    pub device_name: Option<String>,
    pub password: String,
}

impl ConnectEvent {
    /// Snapshot the attempt for plugin dispatch.
    ///
    /// The effective secret is exposed here: plugins receive the same
    /// credential material the remaining checks verify against.
    pub(crate) fn from_attempt(host: &HostIdentity, context: &ConnectContext) -> Self {
        Self {
            host_id: host.id(),
            host_name: host.name().to_string(),
            server_id: context.server().id(),
            server_name: context.server().name().to_string(),
            org_id: context.user().org_id(),
            org_name: context.user().org_name().to_string(),
            user_id: context.user().id(),
            user_name: context.user().name().to_string(),
            remote_ip: context.remote_ip(),
            platform: context.platform().as_str().to_string(),
            device_name: context.device_name().map(str::to_string),
            password: context.secret().expose_secret().to_string(),
        }
    }
}

/// Interface to the external plugin execution engine.
#[async_trait]
pub trait PluginRegistry: Send + Sync {
    /// Dispatch `event` with the serialized field map and collect one verdict
    /// per registered plugin, in registration order. An empty list means no
    /// plugin is registered for the event.
    async fn dispatch(&self, event: &str, fields: serde_json::Value) -> Result<Vec<PluginVerdict>>;
}
