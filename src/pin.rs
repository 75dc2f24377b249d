//! Pinned comparison reference
//!
//! Holds the reference the working file is compared against. The toggle is a
//! short dialogue (choose, then type a ref) that the host walks through one
//! prompt at a time.

use thiserror::Error;

use crate::vcs::Vcs;

pub const DEFAULT_TARGET: &str = "HEAD";
pub const INPUT_PROMPT: &str = "Enter git reference to pin";
pub const INPUT_PLACEHOLDER: &str = "e.g., main, origin/develop, a1b2c3d, HEAD~2";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PinError {
    #[error("Invalid git reference: {0}")]
    InvalidReference(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PinState {
    #[default]
    Unpinned,
    Pinned(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinChoice {
    Change,
    Clear,
}

impl PinChoice {
    pub const ALL: [PinChoice; 2] = [PinChoice::Change, PinChoice::Clear];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Change => "Change pinned reference",
            Self::Clear => "Clear pinned reference",
        }
    }
}

/// Next question for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinPrompt {
    Choose {
        placeholder: String,
    },
    Input {
        prompt: &'static str,
        placeholder: &'static str,
        initial: Option<String>,
    },
}

/// Result of a completed toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinOutcome {
    Pinned(String),
    Updated(String),
    Cleared,
    Unchanged,
}

impl PinOutcome {
    pub fn message(&self, default_target: &str) -> Option<String> {
        match self {
            Self::Pinned(r) => Some(format!("Reference pinned: {}", display_ref(r))),
            Self::Updated(r) => Some(format!("Pinned reference updated to: {}", display_ref(r))),
            Self::Cleared => Some(format!(
                "Pinned reference cleared. Now comparing against {default_target}."
            )),
            Self::Unchanged => None,
        }
    }
}

/// Either another prompt or the end of the dialogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinStep {
    Prompt(PinPrompt),
    Finished(PinOutcome),
}

/// Long refs (full SHAs) shorten to 7 characters
pub fn short_ref(reference: &str) -> &str {
    if reference.chars().count() > 10 {
        let end = reference
            .char_indices()
            .nth(7)
            .map_or(reference.len(), |(i, _)| i);
        &reference[..end]
    } else {
        reference
    }
}

fn display_ref(reference: &str) -> String {
    let short = short_ref(reference);
    if short.len() < reference.len() {
        format!("{short}...")
    } else {
        short.to_string()
    }
}

#[derive(Debug, Default)]
pub struct PinController {
    state: PinState,
}

impl PinController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PinState {
        &self.state
    }

    pub fn pinned(&self) -> Option<&str> {
        match &self.state {
            PinState::Pinned(r) => Some(r),
            PinState::Unpinned => None,
        }
    }

    /// Active comparison target
    pub fn target<'a>(&'a self, default_target: &'a str) -> &'a str {
        self.pinned().unwrap_or(default_target)
    }

    /// First prompt of the toggle dialogue
    pub fn begin(&self) -> PinPrompt {
        match self.pinned() {
            Some(current) => PinPrompt::Choose {
                placeholder: format!("Current pinned reference: {}", display_ref(current)),
            },
            None => PinPrompt::Input {
                prompt: INPUT_PROMPT,
                placeholder: INPUT_PLACEHOLDER,
                initial: None,
            },
        }
    }

    /// Answer to the change/clear question; `None` means dismissed
    pub fn choose(&mut self, choice: Option<PinChoice>) -> PinStep {
        match choice {
            Some(PinChoice::Clear) => PinStep::Finished(self.clear()),
            Some(PinChoice::Change) => PinStep::Prompt(PinPrompt::Input {
                prompt: INPUT_PROMPT,
                placeholder: INPUT_PLACEHOLDER,
                initial: self.pinned().map(str::to_string),
            }),
            None => PinStep::Finished(PinOutcome::Unchanged),
        }
    }

    /// Validate and store a typed reference. Blank or dismissed input changes nothing.
    pub fn submit(&mut self, input: Option<&str>, vcs: &dyn Vcs) -> Result<PinOutcome, PinError> {
        let Some(candidate) = input.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(PinOutcome::Unchanged);
        };

        // Anything starting with '-' would be read as an option by git
        if candidate.starts_with('-') || vcs.verify_reference(candidate).is_err() {
            return Err(PinError::InvalidReference(candidate.to_string()));
        }

        let outcome = match self.state {
            PinState::Unpinned => PinOutcome::Pinned(candidate.to_string()),
            PinState::Pinned(_) => PinOutcome::Updated(candidate.to_string()),
        };
        self.state = PinState::Pinned(candidate.to_string());
        Ok(outcome)
    }

    pub fn clear(&mut self) -> PinOutcome {
        match std::mem::take(&mut self.state) {
            PinState::Pinned(_) => PinOutcome::Cleared,
            PinState::Unpinned => PinOutcome::Unchanged,
        }
    }

    /// Status indicator text and tooltip
    pub fn indicator(&self) -> (String, String) {
        match self.pinned() {
            Some(r) => (
                format!("📌 {}", short_ref(r)),
                format!("Pinned reference: {r}. Click to change or clear."),
            ),
            None => (
                "📌 Pin Reference".to_string(),
                "Click to pin a commit SHA, branch, or remote reference for highlighting changes"
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::tests::FakeVcs;

    const SHA: &str = "a1b2c3d4e5f60718293a4b5c6d7e8f9012345678";

    #[test]
    fn test_pin_valid_reference() {
        let vcs = FakeVcs::default().with_ref("main");
        let mut pins = PinController::new();

        let outcome = pins.submit(Some("  main "), &vcs).unwrap();
        assert_eq!(outcome, PinOutcome::Pinned("main".to_string()));
        assert_eq!(pins.state(), &PinState::Pinned("main".to_string()));
        assert_eq!(pins.target(DEFAULT_TARGET), "main");
    }

    #[test]
    fn test_invalid_reference_keeps_previous_pin() {
        let vcs = FakeVcs::default().with_ref("main");
        let mut pins = PinController::new();
        pins.submit(Some("main"), &vcs).unwrap();

        let err = pins.submit(Some("nope"), &vcs).unwrap_err();
        assert_eq!(err, PinError::InvalidReference("nope".to_string()));
        assert_eq!(err.to_string(), "Invalid git reference: nope");
        assert_eq!(pins.pinned(), Some("main"));
    }

    #[test]
    fn test_option_like_reference_rejected() {
        let vcs = FakeVcs::default().with_ref("--help");
        let mut pins = PinController::new();
        assert!(pins.submit(Some("--help"), &vcs).is_err());
        assert_eq!(pins.state(), &PinState::Unpinned);
    }

    #[test]
    fn test_blank_or_dismissed_input_is_unchanged() {
        let vcs = FakeVcs::default();
        let mut pins = PinController::new();
        assert_eq!(pins.submit(None, &vcs), Ok(PinOutcome::Unchanged));
        assert_eq!(pins.submit(Some("   "), &vcs), Ok(PinOutcome::Unchanged));
        assert_eq!(pins.state(), &PinState::Unpinned);
    }

    #[test]
    fn test_change_replaces_reference() {
        let vcs = FakeVcs::default().with_ref("main").with_ref("origin/dev");
        let mut pins = PinController::new();
        pins.submit(Some("main"), &vcs).unwrap();

        let step = pins.choose(Some(PinChoice::Change));
        assert_eq!(
            step,
            PinStep::Prompt(PinPrompt::Input {
                prompt: INPUT_PROMPT,
                placeholder: INPUT_PLACEHOLDER,
                initial: Some("main".to_string()),
            })
        );
        assert_eq!(
            pins.submit(Some("origin/dev"), &vcs),
            Ok(PinOutcome::Updated("origin/dev".to_string()))
        );
        assert_eq!(pins.pinned(), Some("origin/dev"));
    }

    #[test]
    fn test_clear_and_dismiss() {
        let vcs = FakeVcs::default().with_ref("main");
        let mut pins = PinController::new();
        assert_eq!(pins.clear(), PinOutcome::Unchanged);

        pins.submit(Some("main"), &vcs).unwrap();
        assert_eq!(pins.choose(None), PinStep::Finished(PinOutcome::Unchanged));
        assert_eq!(pins.pinned(), Some("main"));

        assert_eq!(
            pins.choose(Some(PinChoice::Clear)),
            PinStep::Finished(PinOutcome::Cleared)
        );
        assert_eq!(pins.target(DEFAULT_TARGET), DEFAULT_TARGET);
    }

    #[test]
    fn test_begin_depends_on_state() {
        let vcs = FakeVcs::default().with_ref(SHA);
        let mut pins = PinController::new();
        assert!(matches!(pins.begin(), PinPrompt::Input { initial: None, .. }));

        pins.submit(Some(SHA), &vcs).unwrap();
        assert_eq!(
            pins.begin(),
            PinPrompt::Choose {
                placeholder: "Current pinned reference: a1b2c3d...".to_string(),
            }
        );
    }

    #[test]
    fn test_indicator_and_messages() {
        let vcs = FakeVcs::default().with_ref(SHA).with_ref("develop");
        let mut pins = PinController::new();
        assert_eq!(pins.indicator().0, "📌 Pin Reference");

        let outcome = pins.submit(Some(SHA), &vcs).unwrap();
        assert_eq!(
            outcome.message(DEFAULT_TARGET).unwrap(),
            "Reference pinned: a1b2c3d..."
        );
        let (text, tooltip) = pins.indicator();
        assert_eq!(text, "📌 a1b2c3d");
        assert_eq!(tooltip, format!("Pinned reference: {SHA}. Click to change or clear."));

        let outcome = pins.submit(Some("develop"), &vcs).unwrap();
        assert_eq!(
            outcome.message(DEFAULT_TARGET).unwrap(),
            "Pinned reference updated to: develop"
        );
        assert_eq!(
            pins.clear().message(DEFAULT_TARGET).unwrap(),
            "Pinned reference cleared. Now comparing against HEAD."
        );
        assert_eq!(PinOutcome::Unchanged.message(DEFAULT_TARGET), None);
    }

    #[test]
    fn test_short_ref() {
        assert_eq!(short_ref("main"), "main");
        assert_eq!(short_ref("0123456789"), "0123456789");
        assert_eq!(short_ref("origin/feature"), "origin/");
    }
}
