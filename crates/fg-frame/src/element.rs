//! The embedded-content element and its security attributes.

use fg_core::EmbedError;
use fg_core::EmbedResult;
use fg_sandbox::FrameSandbox;

/// In-page frame element owned by one loader.
///
/// `src` starts absent and is only ever assigned a resolved, non-empty
/// value; an empty assignment is a precondition violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameElement {
    title: String,
    height: String,
    sandbox: FrameSandbox,
    src: Option<String>,
}

impl FrameElement {
    pub fn new(
        title: impl Into<String>,
        height: impl Into<String>,
        sandbox: FrameSandbox,
    ) -> EmbedResult<Self> {
        sandbox.validate()?;

        Ok(Self {
            title: title.into(),
            height: height.into(),
            sandbox,
            src: None,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn height(&self) -> &str {
        &self.height
    }

    pub fn sandbox_attribute(&self) -> String {
        self.sandbox.attribute_value()
    }

    pub fn src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    pub fn assign_source(&mut self, src: &str) -> EmbedResult<()> {
        if src.trim().is_empty() {
            return Err(EmbedError::new(
                "frame.empty_src",
                "frame element must not receive an empty src",
            ));
        }

        self.src = Some(src.to_owned());
        Ok(())
    }
}
