//! Capability sandbox policy for embedded-content regions.

use fg_core::EmbedResult;

/// Capability grants applied to one embedded-content region.
///
/// Defaults match what the reservation system needs to function inside the
/// frame; top-level navigation stays blocked as a security boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSandbox {
    pub allow_same_origin: bool,
    pub allow_scripts: bool,
    pub allow_popups: bool,
    pub allow_forms: bool,
    pub allow_top_navigation: bool,
}

impl Default for FrameSandbox {
    fn default() -> Self {
        Self {
            allow_same_origin: true,
            allow_scripts: true,
            allow_popups: true,
            allow_forms: true,
            allow_top_navigation: false,
        }
    }
}

impl FrameSandbox {
    pub fn validate(&self) -> EmbedResult<()> {
        if self.allow_top_navigation {
            return Err(fg_core::EmbedError::new(
                "sandbox.invalid_policy",
                "top-level navigation must stay blocked",
            ));
        }

        Ok(())
    }

    /// Renders the `sandbox` attribute value for the frame element.
    pub fn attribute_value(&self) -> String {
        let mut tokens: Vec<&str> = Vec::new();
        if self.allow_same_origin {
            tokens.push("allow-same-origin");
        }
        if self.allow_scripts {
            tokens.push("allow-scripts");
        }
        if self.allow_popups {
            tokens.push("allow-popups");
        }
        if self.allow_forms {
            tokens.push("allow-forms");
        }

        tokens.join(" ")
    }
}
