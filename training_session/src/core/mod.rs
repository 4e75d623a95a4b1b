//! Core types for the training session.

pub mod episode_state;
pub mod experience_buffer;
pub mod session_state;
pub mod transition;

pub use episode_state::EpisodeState;
pub use experience_buffer::ExperienceBuffer;
pub use session_state::SessionState;
pub use transition::{StepOutcome, Transition};
