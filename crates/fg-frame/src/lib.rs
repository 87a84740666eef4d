//! Secure frame loading: source resolution, failure detection, bounded retry.

pub mod element;
pub mod loader;
pub mod resolve;

pub use element::FrameElement;
pub use loader::FrameEvent;
pub use loader::FrameState;
pub use loader::RetrySettings;
pub use loader::SecureFrameLoader;
pub use resolve::ProxyRules;
