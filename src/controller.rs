//! Interaction controller: turns a Bib Number typed by the user into a
//! certificate download or a status message.
//!
//! The controller owns the busy flag and the single visible notification.
//! Everything the user sees goes through an injected [`Presenter`].

use crate::directory::{normalize_identifier, Directory};
use crate::rendering::{Certificate, CertificateRenderer, RenderRequest, Surface};
use futures::FutureExt;
use log::error;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

pub const MSG_MISSING_IDENTIFIER: &str = "Please enter a Bib Number to search";
pub const MSG_STILL_LOADING: &str =
    "Participant data is still loading. Please wait a moment and try again.";
pub const MSG_GENERATION_FAILED: &str =
    "An error occurred while generating your certificate. Please try again or contact support.";
pub const MSG_SUCCESS: &str = "Certificate downloaded successfully!";

fn not_found_message(identifier: &str) -> String {
    format!(
        "No participant found with Bib Number \"{}\". Please verify your Bib Number and try again.",
        identifier
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Warning,
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

/// The visual layer: progress indicator, disabled inputs and status messages.
pub trait Presenter: Send + Sync {
    /// Busy: input and search trigger disabled, progress shown.
    fn set_busy(&self, busy: bool);
    /// Replace whatever status is showing.
    fn show(&self, notification: &Notification);
    fn clear(&self);
}

/// Presenter that shows nothing.
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn set_busy(&self, _busy: bool) {}
    fn show(&self, _notification: &Notification) {}
    fn clear(&self) {}
}

/// What a call to [`Controller::search`] did.
#[derive(Debug)]
pub enum SearchOutcome {
    /// A search was already running; the trigger was ignored
    Ignored,
    MissingIdentifier,
    StillLoading,
    NotFound(String),
    Generated(Certificate),
    Failed,
}

impl SearchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SearchOutcome::Generated(_))
    }
}

// Clears the busy flag when dropped, including while unwinding.
struct BusyGuard<'a> {
    controller: &'a Controller,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.controller.busy.store(false, Ordering::SeqCst);
        self.controller.presenter.set_busy(false);
    }
}

pub struct Controller {
    directory: Arc<Directory>,
    renderer: CertificateRenderer,
    surface: tokio::sync::Mutex<Box<dyn Surface>>,
    presenter: Arc<dyn Presenter>,
    pacing_delay: Duration,
    busy: AtomicBool,
    notification: Mutex<Option<Notification>>,
}

impl Controller {
    pub fn new(
        directory: Arc<Directory>,
        renderer: CertificateRenderer,
        surface: Box<dyn Surface>,
        presenter: Arc<dyn Presenter>,
        pacing_delay: Duration,
    ) -> Self {
        Self {
            directory,
            renderer,
            surface: tokio::sync::Mutex::new(surface),
            presenter,
            pacing_delay,
            busy: AtomicBool::new(false),
            notification: Mutex::new(None),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// The notification currently visible, if any.
    pub fn notification(&self) -> Option<Notification> {
        self.notification.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    fn notify(&self, kind: NotificationKind, message: impl Into<String>) {
        let n = Notification { kind, message: message.into() };
        self.presenter.show(&n);
        *self.notification.lock().unwrap_or_else(PoisonError::into_inner) = Some(n);
    }

    fn clear_notification(&self) {
        *self.notification.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.presenter.clear();
    }

    fn enter_busy(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        self.clear_notification();
        self.presenter.set_busy(true);
        Some(BusyGuard { controller: self })
    }

    /// Handle one search trigger (button click or Enter).
    pub async fn search(&self, raw_input: &str) -> SearchOutcome {
        if self.is_busy() {
            return SearchOutcome::Ignored;
        }

        let identifier = normalize_identifier(raw_input);
        if identifier.is_empty() {
            self.notify(NotificationKind::Warning, MSG_MISSING_IDENTIFIER);
            return SearchOutcome::MissingIdentifier;
        }
        if !self.directory.is_ready() {
            self.notify(NotificationKind::Warning, MSG_STILL_LOADING);
            return SearchOutcome::StillLoading;
        }

        let Some(busy) = self.enter_busy() else {
            return SearchOutcome::Ignored;
        };

        tokio::time::sleep(self.pacing_delay).await;

        let Some(participant) = self.directory.find_by_identifier(&identifier) else {
            drop(busy);
            self.notify(NotificationKind::Error, not_found_message(&identifier));
            return SearchOutcome::NotFound(identifier);
        };

        let attempt = AssertUnwindSafe(async {
            let mut surface = self.surface.lock().await;
            let request = RenderRequest::new(participant, surface.width(), surface.height());
            self.renderer.render(surface.as_mut(), &request).await
        })
        .catch_unwind()
        .await;
        drop(busy);

        match attempt {
            Ok(Ok(certificate)) => {
                self.notify(NotificationKind::Success, MSG_SUCCESS);
                SearchOutcome::Generated(certificate)
            }
            Ok(Err(e)) => {
                error!("Certificate generation error for Bib {}: {}", identifier, e);
                self.notify(NotificationKind::Error, MSG_GENERATION_FAILED);
                SearchOutcome::Failed
            }
            Err(panic) => {
                error!(
                    "Certificate generation for Bib {} panicked: {}",
                    identifier,
                    panic_message(panic.as_ref())
                );
                self.notify(NotificationKind::Error, MSG_GENERATION_FAILED);
                SearchOutcome::Failed
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
