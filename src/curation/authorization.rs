//! Deletion authorization: three ordered confirmations, a shared secret, and a
//! mandatory protection re-check.
//!
//! ```text
//! Draft → AwaitingConfirmation1 → AwaitingConfirmation2 → AwaitingConfirmation3
//!       → AwaitingSecret → Authorized
//!                    (any) → Rejected
//! ```
//!
//! Interactive callers drive an [`AuthorizationSession`] one step at a time.
//! Request/response callers hand a complete [`DeletionRequest`] to
//! [`DeletionAuthorizer::authorize`], which replays it through the same
//! machine. Either way the only output that can reach the executor is an
//! [`AuthorizedBatch`], which nothing outside this module can construct.

#![allow(missing_docs)]

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::core::config::{Config, Secret};
use crate::curation::protection::ProtectionSnapshot;
use crate::library::item::ItemId;
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};

/// Number of explicit confirmations a deletion needs.
pub const CONFIRMATION_STEPS: u8 = 3;

/// Why a deletion was refused. Every variant is fail-closed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    #[error("no items were selected for deletion")]
    EmptyRequest,

    #[error("confirmation {first_missing} of 3 was not given")]
    IncompleteConfirmation { first_missing: u8 },

    #[error("invalid deletion secret")]
    InvalidSecret,

    #[error("request includes protected items: {}", join_ids(.ids))]
    ProtectedItemsIncluded { ids: Vec<ItemId> },

    #[error("authorization session already completed")]
    SessionClosed,
}

impl RejectionReason {
    /// Stable machine-readable slug.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyRequest => "empty_request",
            Self::IncompleteConfirmation { .. } => "incomplete_confirmation",
            Self::InvalidSecret => "invalid_secret",
            Self::ProtectedItemsIncluded { .. } => "protected_items_included",
            Self::SessionClosed => "session_closed",
        }
    }

    /// HTTP status a front end should answer with.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::EmptyRequest | Self::IncompleteConfirmation { .. } => 400,
            Self::InvalidSecret => 401,
            Self::ProtectedItemsIncluded { .. } => 403,
            Self::SessionClosed => 409,
        }
    }

    #[must_use]
    pub fn protected_ids(&self) -> &[ItemId] {
        match self {
            Self::ProtectedItemsIncluded { ids } => ids,
            _ => &[],
        }
    }
}

fn join_ids(ids: &[ItemId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationState {
    Draft,
    AwaitingConfirmation1,
    AwaitingConfirmation2,
    AwaitingConfirmation3,
    AwaitingSecret,
    Authorized,
    Rejected,
}

impl AuthorizationState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Authorized | Self::Rejected)
    }

    /// The confirmation step this state waits for, if any.
    #[must_use]
    pub const fn pending_confirmation(self) -> Option<u8> {
        match self {
            Self::AwaitingConfirmation1 => Some(1),
            Self::AwaitingConfirmation2 => Some(2),
            Self::AwaitingConfirmation3 => Some(3),
            _ => None,
        }
    }

    const fn after_confirmation(step: u8) -> Self {
        match step {
            1 => Self::AwaitingConfirmation2,
            2 => Self::AwaitingConfirmation3,
            _ => Self::AwaitingSecret,
        }
    }
}

/// A complete deletion request as submitted by a client.
#[derive(Debug, Clone)]
pub struct DeletionRequest {
    pub candidate_ids: Vec<ItemId>,
    pub confirmations: [bool; 3],
    pub secret_attempt: Secret,
    pub also_delete_physical_files: bool,
}

impl DeletionRequest {
    /// Unconfirmed request without a secret.
    #[must_use]
    pub fn new(candidate_ids: impl IntoIterator<Item = ItemId>) -> Self {
        Self {
            candidate_ids: candidate_ids.into_iter().collect(),
            confirmations: [false; 3],
            secret_attempt: Secret::default(),
            also_delete_physical_files: false,
        }
    }

    #[must_use]
    pub const fn with_confirmations(mut self, confirmations: [bool; 3]) -> Self {
        self.confirmations = confirmations;
        self
    }

    #[must_use]
    pub const fn confirmed(self) -> Self {
        self.with_confirmations([true; 3])
    }

    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret_attempt = Secret::new(secret);
        self
    }

    #[must_use]
    pub const fn deleting_files(mut self, also_delete_physical_files: bool) -> Self {
        self.also_delete_physical_files = also_delete_physical_files;
        self
    }
}

/// Proof that a set of ids passed authorization. Only the authorizer builds these.
#[derive(Debug, Clone)]
pub struct AuthorizedBatch {
    ids: Vec<ItemId>,
    also_delete_files: bool,
    snapshot: ProtectionSnapshot,
    authorized_at: DateTime<Utc>,
}

impl AuthorizedBatch {
    #[must_use]
    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub const fn also_delete_files(&self) -> bool {
        self.also_delete_files
    }

    /// Protection set the batch was checked against.
    #[must_use]
    pub const fn snapshot(&self) -> &ProtectionSnapshot {
        &self.snapshot
    }

    #[must_use]
    pub const fn authorized_at(&self) -> DateTime<Utc> {
        self.authorized_at
    }
}

/// Holds the configured secret (as a digest) and validates requests against it.
#[derive(Debug, Clone)]
pub struct DeletionAuthorizer {
    secret_digest: Option<[u8; 32]>,
    logger: Option<ActivityLoggerHandle>,
}

impl DeletionAuthorizer {
    /// An empty secret disables deletion entirely: no attempt can match it.
    #[must_use]
    pub fn new(secret: &Secret) -> Self {
        Self {
            secret_digest: (!secret.is_empty()).then(|| digest(secret.expose())),
            logger: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.deletion.secret)
    }

    #[must_use]
    pub fn with_logger(mut self, logger: ActivityLoggerHandle) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Start an interactive session for `candidate_ids`.
    #[must_use]
    pub fn begin(
        &self,
        candidate_ids: impl IntoIterator<Item = ItemId>,
        also_delete_files: bool,
    ) -> AuthorizationSession<'_> {
        AuthorizationSession::begin(self, candidate_ids, also_delete_files)
    }

    /// Validate a complete request. All-or-nothing: any failed check rejects
    /// the whole batch.
    ///
    /// Checks run in order: non-empty, confirmations, secret, protection.
    pub fn authorize(
        &self,
        request: &DeletionRequest,
        snapshot: &ProtectionSnapshot,
    ) -> Result<AuthorizedBatch, RejectionReason> {
        let mut session = self.begin(
            request.candidate_ids.iter().copied(),
            request.also_delete_physical_files,
        );
        for step in 1..=CONFIRMATION_STEPS {
            if request.confirmations[usize::from(step - 1)] {
                session.acknowledge(step)?;
            } else {
                return Err(session.reject(RejectionReason::IncompleteConfirmation {
                    first_missing: step,
                }));
            }
        }
        session.submit_secret(&request.secret_attempt)?;
        session.finalize(snapshot)
    }

    fn secret_matches(&self, attempt: &Secret) -> bool {
        self.secret_digest
            .is_some_and(|expected| constant_time_eq(&expected, &digest(attempt.expose())))
    }

    fn log(&self, event: ActivityEvent) {
        if let Some(logger) = &self.logger {
            logger.send(event);
        }
    }
}

/// One in-progress authorization.
#[derive(Debug)]
pub struct AuthorizationSession<'a> {
    authorizer: &'a DeletionAuthorizer,
    candidate_ids: Vec<ItemId>,
    also_delete_files: bool,
    state: AuthorizationState,
    secret_verified: bool,
    rejection: Option<RejectionReason>,
}

impl<'a> AuthorizationSession<'a> {
    /// Open a session. Duplicate ids are dropped, first occurrence wins.
    pub fn begin(
        authorizer: &'a DeletionAuthorizer,
        candidate_ids: impl IntoIterator<Item = ItemId>,
        also_delete_files: bool,
    ) -> Self {
        let mut seen = HashSet::new();
        let candidate_ids: Vec<ItemId> = candidate_ids
            .into_iter()
            .filter(|id| seen.insert(*id))
            .collect();
        let mut session = Self {
            authorizer,
            candidate_ids,
            also_delete_files,
            state: AuthorizationState::Draft,
            secret_verified: false,
            rejection: None,
        };
        if session.candidate_ids.is_empty() {
            session.reject(RejectionReason::EmptyRequest);
        } else {
            session.state = AuthorizationState::AwaitingConfirmation1;
        }
        session
    }

    #[must_use]
    pub const fn state(&self) -> AuthorizationState {
        self.state
    }

    #[must_use]
    pub const fn rejection(&self) -> Option<&RejectionReason> {
        self.rejection.as_ref()
    }

    #[must_use]
    pub fn candidate_ids(&self) -> &[ItemId] {
        &self.candidate_ids
    }

    /// Acknowledge confirmation `step` (1-based). Steps must arrive in order;
    /// skipping ahead rejects the session.
    pub fn acknowledge(&mut self, step: u8) -> Result<AuthorizationState, RejectionReason> {
        self.ensure_open()?;
        match self.state.pending_confirmation() {
            Some(expected) if expected == step => {
                self.state = AuthorizationState::after_confirmation(step);
                Ok(self.state)
            }
            Some(expected) => Err(self.reject(RejectionReason::IncompleteConfirmation {
                first_missing: expected,
            })),
            // All confirmations are in; a repeated acknowledgement changes nothing.
            None => Ok(self.state),
        }
    }

    /// Check the secret. Only valid once every confirmation is in.
    pub fn submit_secret(
        &mut self,
        attempt: &Secret,
    ) -> Result<AuthorizationState, RejectionReason> {
        self.ensure_open()?;
        if let Some(first_missing) = self.state.pending_confirmation() {
            return Err(self.reject(RejectionReason::IncompleteConfirmation { first_missing }));
        }
        if !self.authorizer.secret_matches(attempt) {
            return Err(self.reject(RejectionReason::InvalidSecret));
        }
        self.secret_verified = true;
        Ok(self.state)
    }

    /// Re-check protection against `snapshot` and issue the batch.
    pub fn finalize(
        &mut self,
        snapshot: &ProtectionSnapshot,
    ) -> Result<AuthorizedBatch, RejectionReason> {
        self.ensure_open()?;
        if let Some(first_missing) = self.state.pending_confirmation() {
            return Err(self.reject(RejectionReason::IncompleteConfirmation { first_missing }));
        }
        if !self.secret_verified {
            return Err(self.reject(RejectionReason::InvalidSecret));
        }
        let protected = snapshot.intersection(&self.candidate_ids);
        if !protected.is_empty() {
            return Err(self.reject(RejectionReason::ProtectedItemsIncluded { ids: protected }));
        }

        self.state = AuthorizationState::Authorized;
        self.authorizer.log(ActivityEvent::AuthorizationGranted {
            item_count: self.candidate_ids.len(),
        });
        Ok(AuthorizedBatch {
            ids: self.candidate_ids.clone(),
            also_delete_files: self.also_delete_files,
            snapshot: snapshot.clone(),
            authorized_at: Utc::now(),
        })
    }

    fn ensure_open(&self) -> Result<(), RejectionReason> {
        match (self.state, &self.rejection) {
            (AuthorizationState::Rejected, Some(reason)) => Err(reason.clone()),
            (AuthorizationState::Authorized | AuthorizationState::Rejected, _) => {
                Err(RejectionReason::SessionClosed)
            }
            _ => Ok(()),
        }
    }

    fn reject(&mut self, reason: RejectionReason) -> RejectionReason {
        self.state = AuthorizationState::Rejected;
        self.rejection = Some(reason.clone());
        self.authorizer.log(ActivityEvent::AuthorizationRejected {
            reason: reason.to_string(),
            protected_ids: reason.protected_ids().iter().map(|id| id.0).collect(),
        });
        reason
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
