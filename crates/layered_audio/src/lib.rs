//! # Layered Audio
//!
//! Music and sound orchestration for games, driven once per tick.
//!
//! ## Features
//!
//! - **Music slots**: five priority-ordered slots (`Ambient` < `Event` <
//!   `User` < `Cinematic` < `Override`) sharing one music channel; the
//!   highest slot flagged to play wins
//! - **Sound effect pool**: fire-and-forget instances reclaimed by a periodic
//!   sweep and on scene unload
//! - **Music providers**: pluggable sources (radio, jukebox) that feed the
//!   `User` slot and get every clip they hand over back
//! - **Event driven**: configuration and music toggles arrive on an event bus
//!   drained each tick
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use layered_audio::prelude::*;
//! use std::rc::Rc;
//!
//! fn main() -> Result<(), AudioError> {
//!     let settings = AudioSettings::default();
//!     let shared = SharedSettings::new(settings.clone());
//!
//!     let mut library = ClipLibrary::new();
//!     library.insert(SoundCategory::Music, AudioClip::silence("theme", 44_100, 2.0));
//!     library.insert(SoundCategory::Sound, AudioClip::silence("click", 44_100, 0.1));
//!
//!     let events = EventBus::new();
//!     let services = AudioServices {
//!         backend: create_backend(&AudioBackendConfig::default())?,
//!         resources: Rc::new(library),
//!         config: Rc::new(shared.clone()),
//!         events: events.clone(),
//!     };
//!     let mut audio = AudioOrchestrator::new(services, &settings)?;
//!
//!     audio.set_music("theme", MusicSlot::Ambient, 0.8, true, false)?;
//!     audio.start_music(MusicSlot::Ambient, true);
//!     audio.play_ui_sound("click");
//!
//!     shared.set_music_volume(0.5);
//!     events.send(AudioEvent::ConfigChanged);
//!     audio.tick(1.0 / 60.0);
//!     Ok(())
//! }
//! ```

pub mod foundation;
pub mod config;
pub mod events;
pub mod audio;

/// Common imports for audio users
pub mod prelude {
    pub use crate::{
        audio::{
            backend::create_backend,
            AudioBackendConfig, AudioClip, AudioError, AudioOrchestrator, AudioResult, AudioServices,
            ClipHandle, ClipLibrary, ExternalMusicProvider, MusicSlot, PanelDescriptor, PlaybackParams,
            ResourceProvider, SharedProvider, SoundCategory, SoundInstanceId,
        },
        config::{AudioSettings, Config, ConfigStore, SettingsFormat, SharedSettings},
        events::{AudioEvent, EventBus},
        foundation::math::Vec3,
    };
}
