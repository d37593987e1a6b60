//! Per-attempt connection context.
//!
//! One context is built per authorization attempt and discarded after the
//! attempt's single result fires. Two fields are written after construction,
//! each at most once and both strictly before any later check reads them:
//! the credential secret (replaced by its prefix when an OTP code is split
//! off) and the selected push kind. After the push fork the context is only
//! read, so the background continuation never races the synchronous path.

use secrecy::{ExposeSecret, SecretString};
use std::net::IpAddr;
use std::sync::Arc;

use crate::authorize::directory::{ServerPolicy, UserAccount};
use crate::authorize::push::PushKind;

/// Number of trailing secret characters treated as the one-time code.
pub(crate) const OTP_CODE_LEN: usize = 6;

/// Client platform tag reported by the connecting device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Mac,
    Ios,
    Win,
    Chrome,
    /// Tag outside the recognized set, kept verbatim for plugin dispatch.
    Other(String),
}

impl Platform {
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "linux" => Self::Linux,
            "mac" => Self::Mac,
            "ios" => Self::Ios,
            "win" => Self::Win,
            "chrome" => Self::Chrome,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Linux => "linux",
            Self::Mac => "mac",
            Self::Ios => "ios",
            Self::Win => "win",
            Self::Chrome => "chrome",
            Self::Other(tag) => tag,
        }
    }

    /// Device family shown in push approval prompts; unrecognized tags have
    /// no family label.
    pub(crate) fn family(&self) -> Option<&'static str> {
        match self {
            Self::Linux => Some("Linux"),
            Self::Mac | Self::Ios => Some("Apple"),
            Self::Win => Some("Windows"),
            Self::Chrome => Some("Chrome OS"),
            Self::Other(_) => None,
        }
    }
}

/// State for one authorization attempt.
pub struct ConnectContext {
    server: Arc<dyn ServerPolicy>,
    user: Arc<dyn UserAccount>,
    remote_ip: IpAddr,
    platform: Platform,
    device_name: Option<String>,
    secret: SecretString,
    reauth: bool,
    push_kind: Option<PushKind>,
}

impl ConnectContext {
    #[must_use]
    pub fn new(
        server: Arc<dyn ServerPolicy>,
        user: Arc<dyn UserAccount>,
        remote_ip: IpAddr,
        platform: Platform,
        secret: SecretString,
    ) -> Self {
        Self {
            server,
            user,
            remote_ip,
            platform,
            device_name: None,
            secret,
            reauth: false,
            push_kind: None,
        }
    }

    #[must_use]
    pub fn with_device_name(mut self, device_name: impl Into<String>) -> Self {
        self.device_name = Some(device_name.into());
        self
    }

    /// Mark the attempt as a renewal of an existing session; reauth attempts
    /// never reach the push check.
    #[must_use]
    pub fn with_reauth(mut self, reauth: bool) -> Self {
        self.reauth = reauth;
        self
    }

    pub(crate) fn server(&self) -> &dyn ServerPolicy {
        self.server.as_ref()
    }

    pub(crate) fn user(&self) -> &dyn UserAccount {
        self.user.as_ref()
    }

    pub(crate) fn user_handle(&self) -> Arc<dyn UserAccount> {
        Arc::clone(&self.user)
    }

    pub(crate) fn remote_ip(&self) -> IpAddr {
        self.remote_ip
    }

    pub(crate) fn platform(&self) -> &Platform {
        &self.platform
    }

    pub(crate) fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    pub(crate) fn secret(&self) -> &SecretString {
        &self.secret
    }

    pub(crate) fn set_secret(&mut self, secret: SecretString) {
        self.secret = secret;
    }

    pub(crate) fn reauth(&self) -> bool {
        self.reauth
    }

    pub(crate) fn set_push_kind(&mut self, kind: PushKind) {
        self.push_kind = Some(kind);
    }

    /// Push provider selected for this attempt, unset until the push check
    /// has run.
    #[must_use]
    pub fn push_kind(&self) -> Option<PushKind> {
        self.push_kind
    }
}

/// Split the trailing one-time code off a combined secret.
///
/// Pure: returns the remaining prefix as the effective secret plus the code,
/// or `None` when the secret is too short to carry a code. The split counts
/// characters, not bytes, so multibyte secrets cannot be cut mid-character.
pub(crate) fn split_otp_code(secret: &SecretString) -> Option<(SecretString, String)> {
    let exposed = secret.expose_secret();
    let split = exposed.char_indices().rev().nth(OTP_CODE_LEN - 1)?.0;
    Some((
        SecretString::from(exposed[..split].to_string()),
        exposed[split..].to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_otp_code_takes_trailing_six() {
        let (secret, code) = split_otp_code(&SecretString::from("mypass123456".to_string()))
            .expect("long enough");
        assert_eq!(secret.expose_secret(), "mypass");
        assert_eq!(code, "123456");
    }

    #[test]
    fn split_otp_code_exact_length_leaves_empty_secret() {
        let (secret, code) =
            split_otp_code(&SecretString::from("123456".to_string())).expect("long enough");
        assert_eq!(secret.expose_secret(), "");
        assert_eq!(code, "123456");
    }

    #[test]
    fn split_otp_code_rejects_short_secret() {
        assert!(split_otp_code(&SecretString::from("12345".to_string())).is_none());
        assert!(split_otp_code(&SecretString::from(String::new())).is_none());
    }

    #[test]
    fn split_otp_code_counts_characters_not_bytes() {
        let (secret, code) =
            split_otp_code(&SecretString::from("päss123456".to_string())).expect("long enough");
        assert_eq!(secret.expose_secret(), "päss");
        assert_eq!(code, "123456");
    }

    #[test]
    fn platform_families() {
        assert_eq!(Platform::from_tag("linux").family(), Some("Linux"));
        assert_eq!(Platform::from_tag("mac").family(), Some("Apple"));
        assert_eq!(Platform::from_tag("ios").family(), Some("Apple"));
        assert_eq!(Platform::from_tag("win").family(), Some("Windows"));
        assert_eq!(Platform::from_tag("chrome").family(), Some("Chrome OS"));
        assert_eq!(Platform::from_tag("beos").family(), None);
    }

    #[test]
    fn platform_keeps_unrecognized_tags_verbatim() {
        assert_eq!(Platform::from_tag("beos").as_str(), "beos");
        assert_eq!(Platform::from_tag("linux").as_str(), "linux");
    }
}
