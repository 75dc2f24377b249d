//! Annotation pipeline
//!
//! `Annotator` owns the pin state and the VCS handle. Every host event runs
//! one full cycle: pick the target, fetch the diff, classify, project, redraw.

use log::{debug, info};
use std::path::PathBuf;

use crate::hunk::classify;
use crate::pin::{PinChoice, PinController, PinError, PinOutcome, PinPrompt, PinStep};
use crate::projector::{project, DecorationSurface, Document, Projection};
use crate::vcs::{fetch_diff, Vcs};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

/// Editor surface the annotator drives
pub trait Host {
    fn active_document(&self) -> Option<&dyn Document>;
    /// Decorations of the active document
    fn decorations(&mut self) -> Option<&mut dyn DecorationSurface>;
    fn set_indicator(&mut self, text: &str, tooltip: &str);
    fn notify(&mut self, notice: Notice);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    FocusChanged,
    Saved(PathBuf),
    Refresh,
}

pub struct Annotator<V> {
    vcs: V,
    pins: PinController,
    default_target: String,
}

impl<V: Vcs> Annotator<V> {
    pub fn new(vcs: V, default_target: impl Into<String>) -> Self {
        Self {
            vcs,
            pins: PinController::new(),
            default_target: default_target.into(),
        }
    }

    pub fn pins(&self) -> &PinController {
        &self.pins
    }

    pub fn target(&self) -> &str {
        self.pins.target(&self.default_target)
    }

    /// Diff, classify and project for one document against the active target
    pub fn annotate(&self, document: &dyn Document) -> Projection {
        let target = self.target();
        let diff = fetch_diff(&self.vcs, target, document.path());
        let classification = classify(&diff);
        if classification.is_empty() {
            debug!("{}: no changes against {}", document.path().display(), target);
        } else {
            debug!(
                "{}: {} changed lines against {}",
                document.path().display(),
                classification.total(),
                target
            );
        }
        project(&classification, document)
    }

    /// Redraw the active document. Returns false when nothing was applied.
    pub fn refresh(&self, host: &mut dyn Host) -> bool {
        let (path, projection) = match host.active_document() {
            Some(document) => (document.path().to_path_buf(), self.annotate(document)),
            None => return false,
        };

        if host.active_document().map(|d| d.path()) != Some(path.as_path()) {
            debug!("Active document changed, dropping result for {}", path.display());
            return false;
        }

        match host.decorations() {
            Some(surface) => {
                projection.apply_to(surface);
                true
            }
            None => false,
        }
    }

    pub fn handle(&self, event: &HostEvent, host: &mut dyn Host) {
        match event {
            HostEvent::FocusChanged => debug!("Focus changed"),
            HostEvent::Saved(path) => debug!("Saved {}", path.display()),
            HostEvent::Refresh => debug!("Refresh requested"),
        }
        self.refresh(host);
    }

    pub fn show_indicator(&self, host: &mut dyn Host) {
        let (text, tooltip) = self.pins.indicator();
        host.set_indicator(&text, &tooltip);
    }

    /// Start of the toggle command
    pub fn begin_toggle(&self) -> PinPrompt {
        self.pins.begin()
    }

    /// Change/clear answer. Returns the follow-up prompt, if any.
    pub fn choose(&mut self, choice: Option<PinChoice>, host: &mut dyn Host) -> Option<PinPrompt> {
        match self.pins.choose(choice) {
            PinStep::Prompt(prompt) => Some(prompt),
            PinStep::Finished(outcome) => {
                self.finish(Ok(outcome), host);
                None
            }
        }
    }

    /// Pin without a host, for one-shot use
    pub fn pin(&mut self, reference: &str) -> Result<PinOutcome, PinError> {
        self.pins.submit(Some(reference), &self.vcs)
    }

    /// Typed reference answer; `None` means the prompt was dismissed
    pub fn submit(&mut self, input: Option<&str>, host: &mut dyn Host) {
        let result = self.pins.submit(input, &self.vcs);
        self.finish(result, host);
    }

    pub fn clear(&mut self, host: &mut dyn Host) {
        let outcome = self.pins.clear();
        self.finish(Ok(outcome), host);
    }

    /// Every toggle ends here, whatever happened: indicator and redraw
    fn finish(&self, result: Result<PinOutcome, PinError>, host: &mut dyn Host) {
        match result {
            Ok(outcome) => {
                if let Some(message) = outcome.message(&self.default_target) {
                    info!("{message}");
                    host.notify(Notice::Info(message));
                }
            }
            Err(err) => {
                info!("Rejected pin: {err}");
                host.notify(Notice::Error(err.to_string()));
            }
        }
        debug!("Pin state: {:?}", self.pins.state());
        self.show_indicator(host);
        self.refresh(host);
    }
}
