//! Audio backend implementations
//!
//! Platform-independent abstraction over audio output. The engine only ever
//! talks to a backend through per-channel primitives; mixing, decoding and
//! spatialisation live behind the trait.
//!
//! # Threading
//! Backends are NOT `Send + Sync`. The whole audio layer is single-threaded
//! and tick-driven, so the backend is shared through [`SharedBackend`]
//! (`Rc<RefCell<..>>`).

pub mod simulated;
#[cfg(feature = "rodio")]
pub mod rodio_backend;

use crate::audio::clip::ClipHandle;
use crate::audio::{AudioError, AudioResult};
use crate::foundation::math::Vec3;
use std::cell::RefCell;
use std::rc::Rc;

/// Identifier of one output channel inside a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId {
    /// Unique identifier for the channel
    pub id: u32,
    /// Generation counter for handle validation
    pub generation: u32,
}

impl ChannelId {
    /// Create a new channel id
    pub fn new(id: u32, generation: u32) -> Self {
        Self { id, generation }
    }
}

/// Output backend trait for platform abstraction
pub trait OutputBackend {
    /// Initialize the audio backend
    fn initialize(&mut self, config: &AudioBackendConfig) -> AudioResult<()>;

    /// Shutdown the audio backend
    fn shutdown(&mut self);

    /// Check if backend is initialized
    fn is_initialized(&self) -> bool;

    /// Advance the backend by one tick
    fn update(&mut self, delta_time: f32);

    /// Stop every allocated channel
    fn stop_all(&mut self);

    /// Allocate a fresh, empty channel
    fn allocate_channel(&mut self) -> AudioResult<ChannelId>;

    /// Destroy a channel; unknown ids are ignored
    fn release_channel(&mut self, channel: ChannelId);

    /// Whether the channel is still allocated
    fn is_channel_valid(&self, channel: ChannelId) -> bool;

    /// Load a clip, rewinding to the start in a stopped state
    fn load(&mut self, channel: ChannelId, clip: &ClipHandle) -> AudioResult<()>;

    /// Drop whatever clip the channel holds
    fn unload(&mut self, channel: ChannelId) -> AudioResult<()>;

    /// Clip currently loaded on the channel
    fn loaded_clip(&self, channel: ChannelId) -> Option<ClipHandle>;

    /// Start or resume playback
    fn play(&mut self, channel: ChannelId) -> AudioResult<()>;

    /// Pause, keeping the position
    fn pause(&mut self, channel: ChannelId) -> AudioResult<()>;

    /// Stop and rewind to the start
    fn stop(&mut self, channel: ChannelId) -> AudioResult<()>;

    /// Set channel volume (0.0 = silent, 1.0 = full volume)
    fn set_volume(&mut self, channel: ChannelId, volume: f32) -> AudioResult<()>;

    /// Enable or disable looping
    fn set_loop(&mut self, channel: ChannelId, looping: bool) -> AudioResult<()>;

    /// Jump to `time` seconds into the clip
    fn seek(&mut self, channel: ChannelId, time: f32) -> AudioResult<()>;

    /// Place the emitter in the world, or make it non-positional with `None`
    fn set_position(&mut self, channel: ChannelId, position: Option<Vec3>) -> AudioResult<()> {
        let _ = (channel, position);
        Ok(())
    }

    /// Check if a channel is audibly playing
    fn is_playing(&self, channel: ChannelId) -> bool;

    /// Playback position in seconds
    fn position(&self, channel: ChannelId) -> f32;

    /// Playback position in frames; equals the clip's sample count once a
    /// non-looping clip has played to its end
    fn position_samples(&self, channel: ChannelId) -> u32;
}

/// Backend shared by every channel handle
pub type SharedBackend = Rc<RefCell<dyn OutputBackend>>;

/// Owned handle to one allocated output channel
///
/// Dropping the handle releases the channel in the backend.
pub struct ChannelHandle {
    id: ChannelId,
    backend: SharedBackend,
}

impl ChannelHandle {
    /// Allocate a new channel from the backend
    pub fn allocate(backend: &SharedBackend) -> AudioResult<Self> {
        let id = backend.borrow_mut().allocate_channel()?;
        Ok(Self { id, backend: Rc::clone(backend) })
    }

    /// Backend id of this channel
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Whether the backend still knows this channel
    pub fn is_valid(&self) -> bool {
        self.backend.borrow().is_channel_valid(self.id)
    }

    /// Load a clip
    pub fn load(&self, clip: &ClipHandle) -> AudioResult<()> {
        self.backend.borrow_mut().load(self.id, clip)
    }

    /// Unload the current clip
    pub fn unload(&self) -> AudioResult<()> {
        self.backend.borrow_mut().unload(self.id)
    }

    /// Currently loaded clip
    pub fn loaded_clip(&self) -> Option<ClipHandle> {
        self.backend.borrow().loaded_clip(self.id)
    }

    /// Start or resume playback
    pub fn play(&self) -> AudioResult<()> {
        self.backend.borrow_mut().play(self.id)
    }

    /// Pause playback
    pub fn pause(&self) -> AudioResult<()> {
        self.backend.borrow_mut().pause(self.id)
    }

    /// Stop and rewind
    pub fn stop(&self) -> AudioResult<()> {
        self.backend.borrow_mut().stop(self.id)
    }

    /// Set volume
    pub fn set_volume(&self, volume: f32) -> AudioResult<()> {
        self.backend.borrow_mut().set_volume(self.id, volume)
    }

    /// Set looping
    pub fn set_loop(&self, looping: bool) -> AudioResult<()> {
        self.backend.borrow_mut().set_loop(self.id, looping)
    }

    /// Seek to `time` seconds
    pub fn seek(&self, time: f32) -> AudioResult<()> {
        self.backend.borrow_mut().seek(self.id, time)
    }

    /// Set emitter position
    pub fn set_position(&self, position: Option<Vec3>) -> AudioResult<()> {
        self.backend.borrow_mut().set_position(self.id, position)
    }

    /// Whether the channel is audibly playing
    pub fn is_playing(&self) -> bool {
        self.backend.borrow().is_playing(self.id)
    }

    /// Position in seconds
    pub fn position(&self) -> f32 {
        self.backend.borrow().position(self.id)
    }

    /// Position in frames
    pub fn position_samples(&self) -> u32 {
        self.backend.borrow().position_samples(self.id)
    }

    /// Sample count of the loaded clip, zero when empty
    pub fn sample_count(&self) -> u32 {
        self.loaded_clip().map_or(0, |clip| clip.sample_count())
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        match self.backend.try_borrow_mut() {
            Ok(mut backend) => backend.release_channel(self.id),
            Err(_) => log::error!("Backend busy while releasing channel {:?}; channel leaked", self.id),
        }
    }
}

impl std::fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHandle").field("id", &self.id).finish()
    }
}

/// Configuration for audio backend
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Sample rate (e.g., 44100, 48000)
    pub sample_rate: u32,
    /// Number of output channels (1=mono, 2=stereo)
    pub channels: u16,
    /// Buffer size for audio processing
    pub buffer_size: usize,
    /// Maximum simultaneously allocated playback channels
    pub max_channels: usize,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            buffer_size: 4096,
            max_channels: 32,
        }
    }
}

/// Create the default audio backend for the platform
///
/// With the `rodio` feature this opens the default output device; otherwise
/// the deterministic [`simulated::SimulatedBackend`] is used.
pub fn create_backend(config: &AudioBackendConfig) -> AudioResult<SharedBackend> {
    #[cfg(feature = "rodio")]
    {
        let mut backend = rodio_backend::RodioBackend::new();
        backend.initialize(config)?;
        let shared: SharedBackend = Rc::new(RefCell::new(backend));
        Ok(shared)
    }
    #[cfg(not(feature = "rodio"))]
    {
        let mut backend = simulated::SimulatedBackend::new();
        backend.initialize(config)?;
        let shared: SharedBackend = Rc::new(RefCell::new(backend));
        Ok(shared)
    }
}

pub(crate) fn invalid_channel<T>(channel: ChannelId) -> AudioResult<T> {
    log::trace!("Operation on unknown channel {:?}", channel);
    Err(AudioError::InvalidChannel)
}
