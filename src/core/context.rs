//! Per-invocation context and credential propagation.
//!
//! Every tool call receives its own [`InvocationContext`], built by the
//! [`ContextFactory`] from the credential the transport resolved: the
//! session token for STDIO, the bearer token of the request for HTTP.
//! The platform client bound to that credential lives only inside the
//! context, so concurrent requests never observe each other's client.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::protocol::ClientInfo;
use crate::clients::{PlatformApi, PlatformConnector};
use crate::domains::tools::{ToolError, ToolResult};

/// An upstream API token.
///
/// The secret is only reachable through [`Credential::expose`]; `Debug`
/// output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token, rejecting blank values.
    pub fn new(token: impl AsRef<str>) -> Option<Self> {
        let token = token.as_ref().trim();
        if token.is_empty() {
            None
        } else {
            Some(Self(token.to_string()))
        }
    }

    /// The raw token, for the outbound `Authorization` header or CLI env.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// Which transport an invocation arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Stdio,
    Http,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Carrier of everything a single tool invocation may need from its caller.
///
/// Cloning is cheap and only meant for handing the same invocation's
/// context to an owned future; contexts are never reused across calls.
#[derive(Clone)]
pub struct InvocationContext {
    credential: Option<Credential>,
    platform: Option<Arc<dyn PlatformApi>>,
    caller: Option<ClientInfo>,
    transport: TransportKind,
    cancellation: CancellationToken,
}

impl InvocationContext {
    /// The platform client bound to this invocation's credential.
    ///
    /// Returns a domain error (not a panic) when the invocation has no
    /// credential, so the caller learns how to provide one.
    pub fn platform(&self) -> ToolResult<&dyn PlatformApi> {
        self.platform
            .as_deref()
            .ok_or(ToolError::MissingCredential)
    }

    /// The raw credential, for collaborators that are not HTTP clients.
    pub fn credential(&self) -> ToolResult<&Credential> {
        self.credential.as_ref().ok_or(ToolError::MissingCredential)
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Caller identity from the `initialize` handshake (STDIO only).
    pub fn caller(&self) -> Option<&ClientInfo> {
        self.caller.as_ref()
    }

    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    /// Cancelled when the process shuts down.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("credential", &self.credential)
            .field("caller", &self.caller)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

/// Builds a fresh [`InvocationContext`] for every invocation.
///
/// Holds no per-caller state: only the connector used to bind a platform
/// client to a credential and the process-wide shutdown token.
#[derive(Clone)]
pub struct ContextFactory {
    connector: Arc<dyn PlatformConnector>,
    shutdown: CancellationToken,
}

impl ContextFactory {
    pub fn new(connector: Arc<dyn PlatformConnector>, shutdown: CancellationToken) -> Self {
        Self {
            connector,
            shutdown,
        }
    }

    /// Construct the context for one invocation.
    pub fn build(
        &self,
        credential: Option<Credential>,
        transport: TransportKind,
        caller: Option<ClientInfo>,
    ) -> InvocationContext {
        let platform = credential
            .as_ref()
            .map(|credential| self.connector.connect(credential));

        InvocationContext {
            credential,
            platform,
            caller,
            transport,
            cancellation: self.shutdown.child_token(),
        }
    }

    /// The process-wide shutdown token.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }
}
