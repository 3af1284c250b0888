//! Asking a human before a mutation commits.
//!
//! A stock take sends a [`ConfirmationRequest`] and waits on its oneshot. The
//! mutation only goes ahead on `true`. A dropped responder or a closed
//! channel counts as a cancel, so nobody answering never mutates anything.

use std::fmt;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

/// What the user is asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// The ULD is already recorded at this location; mark it found again?
    AlreadyFound { identifier: String, location: String },
    /// The ULD was found elsewhere; move it here?
    ConfirmMove {
        identifier: String,
        from: String,
        to: String,
    },
    /// The ULD goes back to its catalog location.
    MoveBack { identifier: String, location: String },
}

impl Prompt {
    pub fn title(&self) -> &'static str {
        match self {
            Prompt::AlreadyFound { .. } => "ULD already found",
            Prompt::ConfirmMove { .. } => "Move ULD",
            Prompt::MoveBack { .. } => "Move ULD back",
        }
    }

    pub fn identifier(&self) -> &str {
        match self {
            Prompt::AlreadyFound { identifier, .. }
            | Prompt::ConfirmMove { identifier, .. }
            | Prompt::MoveBack { identifier, .. } => identifier,
        }
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prompt::AlreadyFound { identifier, location } => write!(
                f,
                "ULD {identifier} was already found in {location}. It will be marked as found."
            ),
            Prompt::ConfirmMove { identifier, from, to } => write!(
                f,
                "ULD {identifier} was already found in {from}. Move it to {to}?"
            ),
            Prompt::MoveBack { identifier, location } => write!(
                f,
                "Move ULD {identifier} back to its original location {location}?"
            ),
        }
    }
}

#[derive(Debug)]
pub struct ConfirmationRequest {
    pub prompt: Prompt,
    pub respond_to: oneshot::Sender<bool>,
}

/// Sending half of the confirmation boundary.
#[derive(Clone, Debug)]
pub struct Confirmer {
    sender: mpsc::Sender<ConfirmationRequest>,
}

impl Confirmer {
    pub fn channel(buffer_size: usize) -> (Self, mpsc::Receiver<ConfirmationRequest>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        (Self { sender }, receiver)
    }

    /// Resolves to the user's answer, or `false` if no one can answer.
    #[instrument(skip(self), fields(uld = %prompt.identifier(), title = prompt.title()))]
    pub async fn request_confirmation(&self, prompt: Prompt) -> bool {
        debug!("Asking for confirmation");
        let (respond_to, response) = oneshot::channel();
        if self
            .sender
            .send(ConfirmationRequest { prompt, respond_to })
            .await
            .is_err()
        {
            warn!("Confirmation channel closed; treating as cancel");
            return false;
        }
        match response.await {
            Ok(answer) => {
                info!(answer, "Confirmation resolved");
                answer
            }
            Err(_) => {
                warn!("Confirmation dropped unanswered; treating as cancel");
                false
            }
        }
    }
}

/// Answers every prompt with the same value. Useful for unattended runs.
pub fn auto_confirm(answer: bool, buffer_size: usize) -> Confirmer {
    let (confirmer, mut receiver) = Confirmer::channel(buffer_size);
    tokio::spawn(async move {
        while let Some(request) = receiver.recv().await {
            debug!(prompt = %request.prompt, answer, "Auto-answering prompt");
            let _ = request.respond_to.send(answer);
        }
    });
    confirmer
}
