//! First-use certificate-trust wizard with persisted completion.
//!
//! Some deployments serve the reservation backend over a certificate the
//! user must accept manually before the embed can load. The wizard walks
//! through that procedure once; completion is remembered across sessions
//! under a single storage key.

use fg_core::EmbedResult;
use fg_storage::KeyValueStore;

/// Storage key recording that the user finished the trust guide.
pub const GUIDE_VISITED_KEY: &str = "reservation_guide_visited";

const COMPLETED_VALUE: &str = "true";

/// Wizard position. `Completed` is terminal for the session but the guide
/// stays re-enterable via `enter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideStep {
    NotShown,
    Step1,
    Step2,
    Step3,
    Step4,
    Completed,
}

impl GuideStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotShown => "not_shown",
            Self::Step1 => "step_1",
            Self::Step2 => "step_2",
            Self::Step3 => "step_3",
            Self::Step4 => "step_4",
            Self::Completed => "completed",
        }
    }

    /// 1-based step number while inside the wizard.
    pub fn step_number(self) -> Option<u8> {
        match self {
            Self::Step1 => Some(1),
            Self::Step2 => Some(2),
            Self::Step3 => Some(3),
            Self::Step4 => Some(4),
            Self::NotShown | Self::Completed => None,
        }
    }
}

/// Multi-step trust walkthrough layered over one persisted flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustGuideFlow {
    step: GuideStep,
    required: bool,
}

impl TrustGuideFlow {
    /// Reads the persisted flag and positions the flow. A flow that is not
    /// required, or was completed in an earlier session, starts completed;
    /// any stored value other than the literal `"true"` means incomplete.
    pub fn load(store: &impl KeyValueStore, required: bool) -> EmbedResult<Self> {
        let completed = store
            .get(GUIDE_VISITED_KEY)?
            .is_some_and(|value| value == COMPLETED_VALUE);

        let step = if !required || completed {
            GuideStep::Completed
        } else {
            GuideStep::NotShown
        };

        Ok(Self { step, required })
    }

    pub fn step(&self) -> GuideStep {
        self.step
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.step, GuideStep::Completed)
    }

    /// Opens (or re-opens) the wizard at step 1.
    pub fn enter(&mut self) {
        self.step = GuideStep::Step1;
    }

    /// Advances one step, bounded at step 4.
    pub fn next(&mut self) {
        self.step = match self.step {
            GuideStep::NotShown => GuideStep::Step1,
            GuideStep::Step1 => GuideStep::Step2,
            GuideStep::Step2 => GuideStep::Step3,
            GuideStep::Step3 | GuideStep::Step4 => GuideStep::Step4,
            GuideStep::Completed => GuideStep::Completed,
        };
    }

    /// Moves one step back, bounded at step 1.
    pub fn previous(&mut self) {
        self.step = match self.step {
            GuideStep::NotShown => GuideStep::NotShown,
            GuideStep::Step1 | GuideStep::Step2 => GuideStep::Step1,
            GuideStep::Step3 => GuideStep::Step2,
            GuideStep::Step4 => GuideStep::Step3,
            GuideStep::Completed => GuideStep::Completed,
        };
    }

    /// Marks the guide done from any step and persists the flag so later
    /// sessions skip straight to the embed.
    pub fn complete_and_proceed(&mut self, store: &mut impl KeyValueStore) -> EmbedResult<()> {
        store.set(GUIDE_VISITED_KEY, COMPLETED_VALUE)?;
        self.step = GuideStep::Completed;
        Ok(())
    }

    /// Clears the persisted flag and restarts the wizard at step 1.
    pub fn reset(&mut self, store: &mut impl KeyValueStore) -> EmbedResult<()> {
        store.remove(GUIDE_VISITED_KEY)?;
        self.step = GuideStep::Step1;
        Ok(())
    }
}
