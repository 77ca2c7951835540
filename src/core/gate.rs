//! Session gate: decides when the feature tabs may be shown.
//!
//! The reveal runs as three explicit steps over a [`GateView`]:
//! [`validate`] the credential, [`apply_visibility`] to the panels, then
//! [`render_status`] for the status line. Nothing here touches the network;
//! the optional verification round-trip is delegated to a
//! [`CredentialVerifier`] supplied by the caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::core::credential::Credential;
use crate::core::dispatch::DispatchError;

pub const INVALID_TOKEN: &str = "Invalid Token";
pub const TOKEN_VALIDATED: &str = "Token Validated Successfully";
pub const VERIFYING_TOKEN: &str = "Verifying token...";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GatePolicy {
    /// Reveal as soon as a non-empty credential is submitted.
    #[default]
    SkipVerification,
    /// Reveal only after the remote verification call succeeds.
    VerifyThenReveal,
}

impl GatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatePolicy::SkipVerification => "skip-verification",
            GatePolicy::VerifyThenReveal => "verify-then-reveal",
        }
    }
}

impl fmt::Display for GatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip-verification" | "skip" => Ok(GatePolicy::SkipVerification),
            "verify-then-reveal" | "verify" => Ok(GatePolicy::VerifyThenReveal),
            other => Err(format!(
                "unknown gate policy '{other}' (expected skip-verification or verify-then-reveal)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateResult {
    Revealed,
    Rejected(String),
}

/// Outcome of [`SessionGate::begin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateStep {
    Decided(GateResult),
    /// Presence check passed; the caller must run the verifier and report
    /// back through [`SessionGate::finish_verification`].
    AwaitVerification(Credential),
}

/// Visibility flags for the credential form and the feature tabs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateView {
    pub credential_input_visible: bool,
    pub submit_visible: bool,
    pub tabs_visible: bool,
    pub status: Option<String>,
}

impl Default for GateView {
    fn default() -> Self {
        Self {
            credential_input_visible: true,
            submit_visible: true,
            tabs_visible: false,
            status: None,
        }
    }
}

/// Checks a remote service for credential validity.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, credential: &Credential) -> Result<(), DispatchError>;
}

/// Presence check. Never performs I/O.
pub fn validate(credential: &Credential) -> GateResult {
    if credential.is_empty() {
        GateResult::Rejected(INVALID_TOKEN.to_string())
    } else {
        GateResult::Revealed
    }
}

pub fn apply_visibility(view: GateView, result: &GateResult) -> GateView {
    match result {
        GateResult::Revealed => GateView {
            credential_input_visible: false,
            submit_visible: false,
            tabs_visible: true,
            ..view
        },
        GateResult::Rejected(_) => view,
    }
}

pub fn render_status(view: GateView, result: &GateResult) -> GateView {
    let status = match result {
        GateResult::Revealed => TOKEN_VALIDATED.to_string(),
        GateResult::Rejected(reason) => reason.clone(),
    };
    GateView {
        status: Some(status),
        ..view
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Locked,
    Verifying,
    Revealed,
}

#[derive(Debug)]
pub struct SessionGate {
    policy: GatePolicy,
    state: GateState,
    view: GateView,
    credential: Option<Credential>,
    pending: Option<Credential>,
}

impl SessionGate {
    pub fn new(policy: GatePolicy) -> Self {
        Self {
            policy,
            state: GateState::Locked,
            view: GateView::default(),
            credential: None,
            pending: None,
        }
    }

    pub fn policy(&self) -> GatePolicy {
        self.policy
    }

    pub fn view(&self) -> &GateView {
        &self.view
    }

    pub fn is_revealed(&self) -> bool {
        self.state == GateState::Revealed
    }

    pub fn is_verifying(&self) -> bool {
        self.state == GateState::Verifying
    }

    /// The live credential; `None` until the gate has opened.
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Starts a submission. The reveal is one-way, so submissions after it
    /// (or while a verification is outstanding) change nothing.
    pub fn begin(&mut self, credential: Credential) -> GateStep {
        match self.state {
            GateState::Revealed => return GateStep::Decided(GateResult::Revealed),
            GateState::Verifying => {
                return GateStep::Decided(GateResult::Rejected(VERIFYING_TOKEN.to_string()))
            }
            GateState::Locked => {}
        }

        let result = validate(&credential);
        match (&result, self.policy) {
            (GateResult::Rejected(reason), _) => {
                debug!(%reason, "gate rejected submission");
                self.settle(credential, result)
            }
            (GateResult::Revealed, GatePolicy::SkipVerification) => {
                self.settle(credential, result)
            }
            (GateResult::Revealed, GatePolicy::VerifyThenReveal) => {
                self.state = GateState::Verifying;
                self.view.status = Some(VERIFYING_TOKEN.to_string());
                self.pending = Some(credential.clone());
                GateStep::AwaitVerification(credential)
            }
        }
    }

    pub fn finish_verification(&mut self, outcome: Result<(), DispatchError>) -> GateResult {
        if self.state != GateState::Verifying {
            return if self.is_revealed() {
                GateResult::Revealed
            } else {
                GateResult::Rejected(INVALID_TOKEN.to_string())
            };
        }

        let credential = self.pending.take().unwrap_or_default();
        let result = match outcome {
            Ok(()) => GateResult::Revealed,
            Err(err) => GateResult::Rejected(match err {
                DispatchError::EmptyCredential => INVALID_TOKEN.to_string(),
                other => format!("{INVALID_TOKEN} ({other})"),
            }),
        };
        self.state = GateState::Locked;
        match self.settle(credential, result) {
            GateStep::Decided(result) => result,
            GateStep::AwaitVerification(_) => GateResult::Rejected(INVALID_TOKEN.to_string()),
        }
    }

    /// Runs a whole submission, awaiting `verifier` when the policy asks for it.
    pub async fn submit(
        &mut self,
        credential: Credential,
        verifier: &dyn CredentialVerifier,
    ) -> GateResult {
        match self.begin(credential) {
            GateStep::Decided(result) => result,
            GateStep::AwaitVerification(credential) => {
                let outcome = verifier.verify(&credential).await;
                self.finish_verification(outcome)
            }
        }
    }

    fn settle(&mut self, credential: Credential, result: GateResult) -> GateStep {
        let view = std::mem::take(&mut self.view);
        let view = apply_visibility(view, &result);
        self.view = render_status(view, &result);

        if result == GateResult::Revealed {
            info!(policy = %self.policy, "credential accepted; tabs revealed");
            self.state = GateState::Revealed;
            self.credential = Some(credential);
        }
        GateStep::Decided(result)
    }
}
