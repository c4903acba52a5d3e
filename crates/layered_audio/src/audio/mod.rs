//! Audio system
//!
//! Layered music and sound orchestration:
//!
//! - [`music::SlotMusicScheduler`]: five priority-ordered music slots sharing
//!   one output channel
//! - [`sound_pool::SoundEffectPool`]: fire-and-forget sound effect instances
//! - [`provider::ExternalMusicProviderRegistry`]: pluggable music sources
//!   (an in-game radio, a jukebox) feeding the `User` slot
//! - [`orchestrator::AudioOrchestrator`]: the façade gameplay and UI code
//!   talk to, driven once per tick
//!
//! Output goes through the [`backend::OutputBackend`] trait and clips are
//! resolved through [`clip::ResourceProvider`].

pub mod backend;
pub mod clip;
pub mod music;
pub mod orchestrator;
pub mod provider;
pub mod sound_pool;

#[cfg(test)]
pub(crate) mod test_support;

pub use backend::{AudioBackendConfig, ChannelHandle, ChannelId, OutputBackend, SharedBackend};
pub use clip::{AudioClip, ClipHandle, ClipLibrary, ResourceProvider, SoundCategory};
pub use music::{ClipReleaser, MusicSlot, SlotDesiredState, SlotMusicScheduler};
pub use orchestrator::{AudioOrchestrator, AudioServices};
pub use provider::{ExternalMusicProvider, ExternalMusicProviderRegistry, PanelDescriptor, SharedProvider};
pub use sound_pool::{PlaybackParams, SoundEffectPool, SoundInstanceId};

/// Errors raised by the audio layer
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// Name resolution failed
    #[error("Clip '{name}' not found in category {category}")]
    ClipNotFound {
        /// Requested clip name
        name: String,
        /// Category searched
        category: SoundCategory,
    },

    /// Operation on a music slot with no entry
    #[error("Music slot {0:?} has no entry")]
    SlotNotFound(MusicSlot),

    /// A provider of this type is already registered
    #[error("A music provider of type '{0}' is already registered")]
    DuplicateProviderType(String),

    /// No provider registered under this type
    #[error("No music provider of type '{0}' is registered")]
    ProviderNotFound(String),

    /// Backend has no channel left to hand out
    #[error("Channel allocation failed: {0}")]
    ChannelAllocationFailed(String),

    /// Channel id unknown to the backend
    #[error("Invalid channel handle")]
    InvalidChannel,

    /// Backend used before `initialize`
    #[error("Audio backend not initialized")]
    BackendNotInitialized,

    /// Backend could not open its output
    #[error("Audio backend initialization failed: {0}")]
    BackendInitFailed(String),

    /// Backend refused a playback operation
    #[error("Playback failed: {0}")]
    PlaybackFailed(String),
}

/// Result alias for the audio layer
pub type AudioResult<T> = Result<T, AudioError>;
