//! Deterministic in-memory backend
//!
//! Playback advances only through [`OutputBackend::update`], so tests and
//! headless tools can step time exactly. A non-looping channel that reaches
//! the end of its clip stops with its position parked on the last frame
//! boundary (`position_samples == sample_count`).

use super::{invalid_channel, AudioBackendConfig, ChannelId, OutputBackend};
use crate::audio::clip::ClipHandle;
use crate::audio::{AudioError, AudioResult};
use crate::foundation::math::Vec3;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct SimChannel {
    clip: Option<ClipHandle>,
    playing: bool,
    looping: bool,
    volume: f32,
    /// Position in frames
    cursor: f64,
    position: Option<Vec3>,
    load_count: u32,
}

impl SimChannel {
    fn frame_count(&self) -> f64 {
        self.clip.as_ref().map_or(0.0, |clip| f64::from(clip.sample_count()))
    }

    fn sample_rate(&self) -> f64 {
        self.clip.as_ref().map_or(1.0, |clip| f64::from(clip.clip().sample_rate()))
    }

    fn at_end(&self) -> bool {
        self.clip.is_some() && self.cursor >= self.frame_count()
    }
}

/// Backend that simulates playback without touching an audio device
#[derive(Debug)]
pub struct SimulatedBackend {
    channels: HashMap<u32, SimChannel>,
    next_id: u32,
    max_channels: usize,
    initialized: bool,
}

impl SimulatedBackend {
    /// Create a backend with the default channel budget
    pub fn new() -> Self {
        Self::with_max_channels(AudioBackendConfig::default().max_channels)
    }

    /// Create a backend allowing at most `max_channels` live channels
    pub fn with_max_channels(max_channels: usize) -> Self {
        Self {
            channels: HashMap::new(),
            next_id: 0,
            max_channels,
            initialized: true,
        }
    }

    fn channel(&self, channel: ChannelId) -> Option<&SimChannel> {
        self.channels.get(&channel.id)
    }

    fn channel_mut(&mut self, channel: ChannelId) -> AudioResult<&mut SimChannel> {
        match self.channels.get_mut(&channel.id) {
            Some(sim) => Ok(sim),
            None => invalid_channel(channel),
        }
    }

    /// Number of live channels
    pub fn allocated_channels(&self) -> usize {
        self.channels.len()
    }

    /// Volume last applied to a channel
    pub fn volume(&self, channel: ChannelId) -> Option<f32> {
        self.channel(channel).map(|sim| sim.volume)
    }

    /// Whether a channel loops
    pub fn is_looping(&self, channel: ChannelId) -> bool {
        self.channel(channel).is_some_and(|sim| sim.looping)
    }

    /// How many times a clip was loaded onto the channel
    pub fn load_count(&self, channel: ChannelId) -> u32 {
        self.channel(channel).map_or(0, |sim| sim.load_count)
    }

    /// Emitter position of a channel
    pub fn emitter_position(&self, channel: ChannelId) -> Option<Vec3> {
        self.channel(channel).and_then(|sim| sim.position)
    }

    /// Ids of every live channel, in allocation order
    pub fn channel_ids(&self) -> Vec<ChannelId> {
        let mut ids: Vec<u32> = self.channels.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter().map(|id| ChannelId::new(id, 0)).collect()
    }

    /// Externally stop a channel as a device reset would, keeping its position
    pub fn interrupt(&mut self, channel: ChannelId) {
        if let Some(sim) = self.channels.get_mut(&channel.id) {
            sim.playing = false;
        }
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputBackend for SimulatedBackend {
    fn initialize(&mut self, config: &AudioBackendConfig) -> AudioResult<()> {
        self.max_channels = config.max_channels;
        self.initialized = true;
        log::info!("Simulated audio backend initialized ({} channels)", self.max_channels);
        Ok(())
    }

    fn shutdown(&mut self) {
        if !self.initialized {
            return;
        }
        self.stop_all();
        self.initialized = false;
        log::info!("Simulated audio backend shutdown");
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn update(&mut self, delta_time: f32) {
        let delta_time = f64::from(delta_time.max(0.0));
        for sim in self.channels.values_mut() {
            if !sim.playing {
                continue;
            }
            let frames = sim.frame_count();
            if frames <= 0.0 {
                sim.playing = false;
                continue;
            }
            sim.cursor += delta_time * sim.sample_rate();
            if sim.cursor >= frames {
                if sim.looping {
                    sim.cursor %= frames;
                } else {
                    sim.cursor = frames;
                    sim.playing = false;
                }
            }
        }
    }

    fn stop_all(&mut self) {
        for sim in self.channels.values_mut() {
            sim.playing = false;
            sim.cursor = 0.0;
        }
    }

    fn allocate_channel(&mut self) -> AudioResult<ChannelId> {
        if !self.initialized {
            return Err(AudioError::BackendNotInitialized);
        }
        if self.channels.len() >= self.max_channels {
            return Err(AudioError::ChannelAllocationFailed(format!(
                "all {} channels in use",
                self.max_channels
            )));
        }
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.channels.insert(id, SimChannel { volume: 1.0, ..SimChannel::default() });
        Ok(ChannelId::new(id, 0))
    }

    fn release_channel(&mut self, channel: ChannelId) {
        self.channels.remove(&channel.id);
    }

    fn is_channel_valid(&self, channel: ChannelId) -> bool {
        self.channels.contains_key(&channel.id)
    }

    fn load(&mut self, channel: ChannelId, clip: &ClipHandle) -> AudioResult<()> {
        let sim = self.channel_mut(channel)?;
        sim.clip = Some(clip.clone());
        sim.playing = false;
        sim.cursor = 0.0;
        sim.load_count += 1;
        Ok(())
    }

    fn unload(&mut self, channel: ChannelId) -> AudioResult<()> {
        let sim = self.channel_mut(channel)?;
        sim.clip = None;
        sim.playing = false;
        sim.cursor = 0.0;
        Ok(())
    }

    fn loaded_clip(&self, channel: ChannelId) -> Option<ClipHandle> {
        self.channel(channel).and_then(|sim| sim.clip.clone())
    }

    fn play(&mut self, channel: ChannelId) -> AudioResult<()> {
        let sim = self.channel_mut(channel)?;
        if sim.clip.is_none() {
            return Err(AudioError::PlaybackFailed("no clip loaded".to_string()));
        }
        // Playing a finished clip starts it over
        if sim.at_end() {
            sim.cursor = 0.0;
        }
        sim.playing = true;
        Ok(())
    }

    fn pause(&mut self, channel: ChannelId) -> AudioResult<()> {
        self.channel_mut(channel)?.playing = false;
        Ok(())
    }

    fn stop(&mut self, channel: ChannelId) -> AudioResult<()> {
        let sim = self.channel_mut(channel)?;
        sim.playing = false;
        sim.cursor = 0.0;
        Ok(())
    }

    fn set_volume(&mut self, channel: ChannelId, volume: f32) -> AudioResult<()> {
        self.channel_mut(channel)?.volume = volume;
        Ok(())
    }

    fn set_loop(&mut self, channel: ChannelId, looping: bool) -> AudioResult<()> {
        self.channel_mut(channel)?.looping = looping;
        Ok(())
    }

    fn seek(&mut self, channel: ChannelId, time: f32) -> AudioResult<()> {
        let sim = self.channel_mut(channel)?;
        let target = f64::from(time.max(0.0)) * sim.sample_rate();
        sim.cursor = target.min(sim.frame_count());
        Ok(())
    }

    fn set_position(&mut self, channel: ChannelId, position: Option<Vec3>) -> AudioResult<()> {
        self.channel_mut(channel)?.position = position;
        Ok(())
    }

    fn is_playing(&self, channel: ChannelId) -> bool {
        self.channel(channel).is_some_and(|sim| sim.playing)
    }

    fn position(&self, channel: ChannelId) -> f32 {
        self.channel(channel)
            .map_or(0.0, |sim| (sim.cursor / sim.sample_rate()) as f32)
    }

    fn position_samples(&self, channel: ChannelId) -> u32 {
        self.channel(channel).map_or(0, |sim| sim.cursor.floor() as u32)
    }
}
