//! Rodio audio backend implementation
//!
//! Uses the Rodio library for cross-platform audio playback. Each channel
//! owns one [`Sink`]; clips are fed to the sink as in-memory sample buffers.
//!
//! # Example
//!
//! ```no_run
//! use layered_audio::audio::backend::{AudioBackendConfig, OutputBackend};
//! use layered_audio::audio::backend::rodio_backend::RodioBackend;
//! use layered_audio::audio::clip::{AudioClip, ClipHandle};
//!
//! let mut backend = RodioBackend::new();
//! backend.initialize(&AudioBackendConfig::default()).unwrap();
//!
//! let channel = backend.allocate_channel().unwrap();
//! let clip = ClipHandle::new(AudioClip::silence("hush", 44_100, 1.0));
//! backend.load(channel, &clip).unwrap();
//! backend.set_volume(channel, 0.5).unwrap();
//! backend.play(channel).unwrap();
//!
//! backend.release_channel(channel);
//! backend.shutdown();
//! ```

use super::{invalid_channel, AudioBackendConfig, ChannelId, OutputBackend};
use crate::audio::clip::ClipHandle;
use crate::audio::{AudioError, AudioResult};
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use std::collections::HashMap;
use std::time::Duration;

/// One output channel backed by a sink
struct RodioChannel {
    sink: Sink,
    clip: Option<ClipHandle>,
    looping: bool,
    volume: f32,
    /// Offset the current sink source started at
    start_offset: Duration,
}

impl RodioChannel {
    fn elapsed(&self) -> Duration {
        let raw = self.start_offset + self.sink.get_pos();
        match &self.clip {
            Some(clip) if self.looping && !clip.duration().is_zero() => {
                let length = clip.duration().as_secs_f64();
                Duration::from_secs_f64(raw.as_secs_f64() % length)
            }
            Some(clip) => raw.min(clip.duration()),
            None => Duration::ZERO,
        }
    }

    fn finished(&self) -> bool {
        self.clip.is_some() && !self.looping && self.sink.empty()
    }
}

/// Rodio-based audio backend
pub struct RodioBackend {
    /// Audio output stream (must be kept alive)
    _output_stream: Option<OutputStream>,
    /// Output stream handle for creating sinks
    stream_handle: Option<OutputStreamHandle>,
    /// Live channels
    channels: HashMap<u32, RodioChannel>,
    /// Next channel ID for handle generation
    next_id: u32,
    /// Channel budget
    max_channels: usize,
    /// Initialization state
    initialized: bool,
}

impl RodioBackend {
    /// Create a new Rodio backend
    pub fn new() -> Self {
        Self {
            _output_stream: None,
            stream_handle: None,
            channels: HashMap::new(),
            next_id: 0,
            max_channels: AudioBackendConfig::default().max_channels,
            initialized: false,
        }
    }

    fn new_sink(&self) -> AudioResult<Sink> {
        let stream_handle = self.stream_handle.as_ref().ok_or(AudioError::BackendNotInitialized)?;
        let sink = Sink::try_new(stream_handle)
            .map_err(|e| AudioError::PlaybackFailed(format!("Failed to create sink: {}", e)))?;
        sink.pause();
        Ok(sink)
    }

    fn channel(&self, channel: ChannelId) -> Option<&RodioChannel> {
        self.channels.get(&channel.id)
    }

    fn channel_mut(&mut self, channel: ChannelId) -> AudioResult<&mut RodioChannel> {
        match self.channels.get_mut(&channel.id) {
            Some(rodio_channel) => Ok(rodio_channel),
            None => invalid_channel(channel),
        }
    }

    /// Replace the channel's sink with a fresh one starting at `offset`
    fn rebuild(&mut self, channel: ChannelId, offset: Duration, paused: bool) -> AudioResult<()> {
        let sink = self.new_sink()?;
        let state = self.channel_mut(channel)?;
        state.sink.stop();

        if let Some(clip) = &state.clip {
            let data = clip.clip();
            let buffer = SamplesBuffer::new(data.channels(), data.sample_rate(), data.samples().to_vec());
            if state.looping {
                sink.append(buffer.repeat_infinite().skip_duration(offset));
            } else {
                sink.append(buffer.skip_duration(offset));
            }
        }

        sink.set_volume(state.volume);
        if !paused {
            sink.play();
        }
        state.sink = sink;
        state.start_offset = offset;
        Ok(())
    }
}

impl OutputBackend for RodioBackend {
    fn initialize(&mut self, config: &AudioBackendConfig) -> AudioResult<()> {
        if self.initialized {
            return Ok(());
        }

        // Create output stream
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| AudioError::BackendInitFailed(format!("Failed to create audio output: {}", e)))?;

        self._output_stream = Some(stream);
        self.stream_handle = Some(stream_handle);
        self.max_channels = config.max_channels;
        self.initialized = true;

        log::info!("Rodio audio backend initialized");
        Ok(())
    }

    fn shutdown(&mut self) {
        if !self.initialized {
            return;
        }

        for (_id, channel) in self.channels.drain() {
            channel.sink.stop();
        }

        // Drop stream handle and output
        self.stream_handle = None;
        self._output_stream = None;
        self.initialized = false;

        log::info!("Rodio audio backend shutdown");
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn update(&mut self, _delta_time: f32) {
        // Rodio advances on its own thread
    }

    fn stop_all(&mut self) {
        for channel in self.channels.values_mut() {
            channel.sink.stop();
            channel.clip = None;
            channel.start_offset = Duration::ZERO;
        }
    }

    fn allocate_channel(&mut self) -> AudioResult<ChannelId> {
        if self.channels.len() >= self.max_channels {
            return Err(AudioError::ChannelAllocationFailed(format!(
                "all {} sinks in use",
                self.max_channels
            )));
        }
        let sink = self.new_sink()?;
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.channels.insert(
            id,
            RodioChannel { sink, clip: None, looping: false, volume: 1.0, start_offset: Duration::ZERO },
        );
        Ok(ChannelId::new(id, 0))
    }

    fn release_channel(&mut self, channel: ChannelId) {
        if let Some(state) = self.channels.remove(&channel.id) {
            state.sink.stop();
        }
    }

    fn is_channel_valid(&self, channel: ChannelId) -> bool {
        self.channels.contains_key(&channel.id)
    }

    fn load(&mut self, channel: ChannelId, clip: &ClipHandle) -> AudioResult<()> {
        self.channel_mut(channel)?.clip = Some(clip.clone());
        self.rebuild(channel, Duration::ZERO, true)
    }

    fn unload(&mut self, channel: ChannelId) -> AudioResult<()> {
        self.channel_mut(channel)?.clip = None;
        self.rebuild(channel, Duration::ZERO, true)
    }

    fn loaded_clip(&self, channel: ChannelId) -> Option<ClipHandle> {
        self.channel(channel).and_then(|state| state.clip.clone())
    }

    fn play(&mut self, channel: ChannelId) -> AudioResult<()> {
        let state = self.channel_mut(channel)?;
        if state.clip.is_none() {
            return Err(AudioError::PlaybackFailed("no clip loaded".to_string()));
        }
        if state.finished() {
            return self.rebuild(channel, Duration::ZERO, false);
        }
        state.sink.play();
        Ok(())
    }

    fn pause(&mut self, channel: ChannelId) -> AudioResult<()> {
        self.channel_mut(channel)?.sink.pause();
        Ok(())
    }

    fn stop(&mut self, channel: ChannelId) -> AudioResult<()> {
        self.channel_mut(channel)?;
        self.rebuild(channel, Duration::ZERO, true)
    }

    fn set_volume(&mut self, channel: ChannelId, volume: f32) -> AudioResult<()> {
        let state = self.channel_mut(channel)?;
        state.volume = volume;
        state.sink.set_volume(volume);
        Ok(())
    }

    fn set_loop(&mut self, channel: ChannelId, looping: bool) -> AudioResult<()> {
        let state = self.channel_mut(channel)?;
        if state.looping == looping {
            return Ok(());
        }
        let offset = state.elapsed();
        let paused = state.sink.is_paused();
        state.looping = looping;
        self.rebuild(channel, offset, paused)
    }

    fn seek(&mut self, channel: ChannelId, time: f32) -> AudioResult<()> {
        let state = self.channel_mut(channel)?;
        let paused = state.sink.is_paused();
        let mut offset = Duration::from_secs_f32(time.max(0.0));
        if let Some(clip) = &state.clip {
            offset = offset.min(clip.duration());
        }
        self.rebuild(channel, offset, paused)
    }

    fn is_playing(&self, channel: ChannelId) -> bool {
        self.channel(channel)
            .map(|state| !state.sink.is_paused() && !state.sink.empty())
            .unwrap_or(false)
    }

    fn position(&self, channel: ChannelId) -> f32 {
        self.channel(channel).map_or(0.0, |state| state.elapsed().as_secs_f32())
    }

    fn position_samples(&self, channel: ChannelId) -> u32 {
        let Some(state) = self.channel(channel) else {
            return 0;
        };
        let Some(clip) = &state.clip else {
            return 0;
        };
        if state.finished() {
            return clip.sample_count();
        }
        let frames = state.elapsed().as_secs_f64() * f64::from(clip.clip().sample_rate());
        (frames.floor() as u32).min(clip.sample_count())
    }
}

impl Default for RodioBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RodioBackend {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_initialization() {
        let mut backend = RodioBackend::new();
        assert!(!backend.is_initialized());

        let config = AudioBackendConfig::default();
        let result = backend.initialize(&config);

        // May fail in CI/test environments without audio device
        if result.is_ok() {
            assert!(backend.is_initialized());
            backend.shutdown();
            assert!(!backend.is_initialized());
        }
    }

    #[test]
    fn test_allocation_without_initialization() {
        let mut backend = RodioBackend::new();
        let result = backend.allocate_channel();
        assert!(matches!(result, Err(AudioError::BackendNotInitialized)));
    }

    #[test]
    fn test_invalid_channel_operations() {
        let mut backend = RodioBackend::new();
        let config = AudioBackendConfig::default();

        if backend.initialize(&config).is_ok() {
            let invalid = ChannelId::new(999, 0);

            assert!(matches!(backend.pause(invalid), Err(AudioError::InvalidChannel)));
            assert!(matches!(backend.play(invalid), Err(AudioError::InvalidChannel)));
            assert!(matches!(backend.set_volume(invalid, 0.5), Err(AudioError::InvalidChannel)));
            assert!(!backend.is_playing(invalid));

            backend.shutdown();
        }
    }
}
