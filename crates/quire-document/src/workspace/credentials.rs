// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Credential capability — how a load asks for a document password.

use crossbeam_channel::{Receiver, Sender, bounded};
use tracing::debug;

/// A password prompt for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRequest {
    pub document: String,
    /// 1-based attempt number.
    pub attempt: u32,
    /// Whether the previous attempt's password was rejected.
    pub previous_failed: bool,
}

/// Supplies passwords on demand. Returning `None` gives up on the document.
pub trait CredentialSource {
    fn request(&self, request: &CredentialRequest) -> Option<String>;
}

/// Never has a password.
pub struct NoCredentials;

impl CredentialSource for NoCredentials {
    fn request(&self, _request: &CredentialRequest) -> Option<String> {
        None
    }
}

/// Answers attempt `n` with the `n`th password of a fixed list, for every
/// document.
#[derive(Debug, Clone, Default)]
pub struct FixedCredentials {
    passwords: Vec<String>,
}

impl FixedCredentials {
    pub fn new<I, S>(passwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            passwords: passwords.into_iter().map(Into::into).collect(),
        }
    }
}

impl CredentialSource for FixedCredentials {
    fn request(&self, request: &CredentialRequest) -> Option<String> {
        let index = usize::try_from(request.attempt.checked_sub(1)?).ok()?;
        self.passwords.get(index).cloned()
    }
}

/// Requesting half of a channel pair: each request blocks until the
/// [`CredentialResponder`] answers, or returns `None` once it is dropped.
pub struct ChannelCredentials {
    requests: Sender<CredentialRequest>,
    answers: Receiver<Option<String>>,
}

/// Answering half, typically held by a UI thread.
pub struct CredentialResponder {
    requests: Receiver<CredentialRequest>,
    answers: Sender<Option<String>>,
}

impl ChannelCredentials {
    pub fn pair() -> (ChannelCredentials, CredentialResponder) {
        let (request_tx, request_rx) = bounded(1);
        let (answer_tx, answer_rx) = bounded(1);
        (
            ChannelCredentials {
                requests: request_tx,
                answers: answer_rx,
            },
            CredentialResponder {
                requests: request_rx,
                answers: answer_tx,
            },
        )
    }
}

impl CredentialSource for ChannelCredentials {
    fn request(&self, request: &CredentialRequest) -> Option<String> {
        if self.requests.send(request.clone()).is_err() {
            debug!(document = %request.document, "Credential responder gone");
            return None;
        }
        self.answers.recv().ok().flatten()
    }
}

impl CredentialResponder {
    /// Wait for the next prompt. `None` once the requesting side is dropped.
    pub fn next_request(&self) -> Option<CredentialRequest> {
        self.requests.recv().ok()
    }

    /// Answer the pending prompt. Returns `false` if nobody is waiting.
    pub fn answer(&self, password: Option<String>) -> bool {
        self.answers.send(password).is_ok()
    }

    /// Answer prompts with `respond` until the requesting side is dropped.
    pub fn serve(&self, mut respond: impl FnMut(&CredentialRequest) -> Option<String>) {
        while let Some(request) = self.next_request() {
            if !self.answer(respond(&request)) {
                break;
            }
        }
    }
}
