//! # Aprobo (Connection Authorization Pipeline)
//!
//! `aprobo` decides whether a connecting identity may establish a session on a
//! managed server. It runs an ordered sequence of checks (group membership and
//! enablement, OTP/PIN credentials, single sign-on, policy plugins, and
//! out-of-band push approval) and reports exactly one pass/fail outcome
//! through a one-shot [`authorize::ResultSink`].
//!
//! ## Decision Model
//!
//! Each check yields one of three outcomes: continue to the next check, deny
//! with a user-facing reason, or fork the final decision to a background push
//! continuation. The pipeline stops at the first denial (after the denying
//! check has recorded its audit event) and at a fork it returns without
//! delivering a result — the spawned continuation owns the sink from then on.
//!
//! ## Capability Boundaries
//!
//! The crate performs no storage, cryptography, or network I/O of its own.
//! User and server records, OTP/PIN/SSO verification, push providers, the
//! plugin engine, and audit persistence are all consumed through the traits
//! in [`authorize::directory`], [`authorize::plugins`], and
//! [`authorize::push`]; runtime toggles arrive as an explicit
//! [`authorize::AuthSettings`] value, never as ambient global state.
//!
//! ## Delivery Guarantee
//!
//! The [`authorize::ResultSink`] consumes itself on delivery, so a result can
//! be produced at most once per attempt, across both the synchronous path and
//! the background push path. The only path that produces no result at all is
//! a push provider that never responds; the pipeline applies no timeout of
//! its own.

pub mod authorize;
