//! Sound effect pool
//!
//! Owns every fire-and-forget sound instance. Each instance owns exactly one
//! output channel; removing the instance drops its [`ChannelHandle`], which
//! releases the channel in the backend.
//!
//! Finished instances are reclaimed by a periodic sweep running on simulated
//! time, and a scene unload reclaims everything that is not retained and
//! still playing.

use crate::audio::backend::{ChannelHandle, SharedBackend};
use crate::audio::clip::ClipHandle;
use crate::audio::AudioResult;
use crate::foundation::math::{clamp_volume, Vec3};
use crate::foundation::time::IntervalTimer;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle to a sound instance in the pool
    pub struct SoundInstanceId;
}

/// Default seconds between sweeps of finished instances
pub const DEFAULT_SWEEP_INTERVAL: f32 = 2.5;

/// How a sound instance should be played
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackParams {
    /// Survive scene unloads while still playing
    pub retain: bool,
    /// Keep playing while the game is paused
    pub ignore_pause: bool,
    /// Loop until stopped
    pub loop_flag: bool,
    /// World position for positional sounds
    pub position: Option<Vec3>,
    /// Instance volume
    pub volume: f32,
}

impl Default for PlaybackParams {
    fn default() -> Self {
        Self {
            retain: false,
            ignore_pause: false,
            loop_flag: false,
            position: None,
            volume: 1.0,
        }
    }
}

impl PlaybackParams {
    /// Set the retain flag
    pub fn retained(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    /// Play at a world position
    pub fn at(mut self, position: Vec3) -> Self {
        self.position = Some(position);
        self
    }

    /// Set instance volume
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Loop until stopped
    pub fn looping(mut self) -> Self {
        self.loop_flag = true;
        self
    }

    /// Keep playing through game pause
    pub fn ignoring_pause(mut self) -> Self {
        self.ignore_pause = true;
        self
    }
}

/// One playing sound effect
#[derive(Debug)]
struct SoundInstance {
    clip: ClipHandle,
    channel: ChannelHandle,
    retain: bool,
    ignore_pause: bool,
    /// Held by the game pause; never counts as finished
    paused_by_game: bool,
}

impl SoundInstance {
    fn is_active(&self) -> bool {
        self.paused_by_game || (self.channel.is_valid() && self.channel.is_playing())
    }
}

/// Pool of fire-and-forget sound instances
pub struct SoundEffectPool {
    backend: SharedBackend,
    instances: SlotMap<SoundInstanceId, SoundInstance>,
    sweep_timer: IntervalTimer,
    game_paused: bool,
}

impl SoundEffectPool {
    /// Create a pool sweeping finished sounds every `sweep_interval` seconds
    pub fn new(backend: SharedBackend, sweep_interval: f32) -> Self {
        Self {
            backend,
            instances: SlotMap::with_key(),
            sweep_timer: IntervalTimer::new(sweep_interval),
            game_paused: false,
        }
    }

    /// Allocate a channel, configure it and start playing `clip`
    ///
    /// # Errors
    /// - `ChannelAllocationFailed` when the backend has no free channel
    /// - any backend error raised while configuring the channel
    pub fn play(&mut self, clip: ClipHandle, params: &PlaybackParams) -> AudioResult<SoundInstanceId> {
        let channel = ChannelHandle::allocate(&self.backend)?;
        channel.load(&clip)?;
        channel.set_loop(params.loop_flag)?;
        channel.set_volume(clamp_volume(params.volume))?;
        channel.set_position(params.position)?;

        let held = self.game_paused && !params.ignore_pause;
        if !held {
            channel.play()?;
        }

        let id = self.instances.insert(SoundInstance {
            clip,
            channel,
            retain: params.retain,
            ignore_pause: params.ignore_pause,
            paused_by_game: held,
        });
        Ok(id)
    }

    /// Advance the sweep cadence, sweeping when the interval elapsed
    pub fn update(&mut self, delta_time: f32) {
        if self.sweep_timer.tick(delta_time) {
            self.sweep_finished();
        }
    }

    /// Destroy every instance whose channel is gone or stopped playing
    pub fn sweep_finished(&mut self) -> usize {
        let before = self.instances.len();
        self.instances.retain(|_, instance| instance.is_active());
        let removed = before - self.instances.len();
        if removed > 0 {
            log::trace!("Swept {} finished sound(s)", removed);
        }
        removed
    }

    /// Destroy every instance that is not retained or already finished
    pub fn sweep_on_unload(&mut self) -> usize {
        let before = self.instances.len();
        self.instances.retain(|_, instance| instance.retain && instance.is_active());
        let removed = before - self.instances.len();
        log::debug!("Scene unload removed {} sound(s), {} retained", removed, self.instances.len());
        removed
    }

    /// Destroy every instance immediately
    pub fn clear_all(&mut self) {
        let count = self.instances.len();
        self.instances.clear();
        if count > 0 {
            log::debug!("Cleared {} sound(s)", count);
        }
    }

    /// Stop and destroy one instance
    pub fn stop(&mut self, id: SoundInstanceId) -> bool {
        self.instances.remove(id).is_some()
    }

    /// Pause or resume every instance that honours the game pause
    pub fn set_game_paused(&mut self, paused: bool) {
        if self.game_paused == paused {
            return;
        }
        self.game_paused = paused;

        for instance in self.instances.values_mut() {
            if instance.ignore_pause {
                continue;
            }
            if paused {
                // Already finished sounds are left for the sweep
                if instance.channel.is_playing() {
                    if let Err(e) = instance.channel.pause() {
                        log::warn!("Failed to pause '{}': {}", instance.clip.name(), e);
                    }
                    instance.paused_by_game = true;
                }
            } else if instance.paused_by_game {
                instance.paused_by_game = false;
                if let Err(e) = instance.channel.play() {
                    log::warn!("Failed to resume '{}': {}", instance.clip.name(), e);
                }
            }
        }
    }

    /// Whether the game pause is active
    pub fn is_game_paused(&self) -> bool {
        self.game_paused
    }

    /// Whether an instance still exists
    pub fn contains(&self, id: SoundInstanceId) -> bool {
        self.instances.contains_key(id)
    }

    /// Whether an instance is audibly playing
    pub fn is_playing(&self, id: SoundInstanceId) -> bool {
        self.instances.get(id).is_some_and(|instance| instance.channel.is_playing())
    }

    /// Clip an instance plays
    pub fn clip(&self, id: SoundInstanceId) -> Option<&ClipHandle> {
        self.instances.get(id).map(|instance| &instance.clip)
    }

    /// Backend channel of an instance
    pub fn channel(&self, id: SoundInstanceId) -> Option<&ChannelHandle> {
        self.instances.get(id).map(|instance| &instance.channel)
    }

    /// Number of tracked instances
    pub fn active_count(&self) -> usize {
        self.instances.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::OutputBackend;
    use crate::audio::test_support::{clip, simulated_backend};
    use crate::audio::AudioError;

    #[test]
    fn test_play_allocates_and_starts() {
        let (sim, backend) = simulated_backend(4);
        let mut pool = SoundEffectPool::new(backend, DEFAULT_SWEEP_INTERVAL);

        let id = pool.play(clip("laser", 1.0), &PlaybackParams::default().with_volume(3.0)).unwrap();
        assert!(pool.is_playing(id));
        assert_eq!(pool.active_count(), 1);
        assert_eq!(sim.borrow().allocated_channels(), 1);

        let channel = pool.channel(id).unwrap().id();
        assert_eq!(sim.borrow().volume(channel), Some(1.0));
    }

    #[test]
    fn test_positional_sound() {
        let (sim, backend) = simulated_backend(4);
        let mut pool = SoundEffectPool::new(backend, DEFAULT_SWEEP_INTERVAL);
        let position = Vec3::new(1.0, 2.0, 3.0);

        let id = pool.play(clip("boom", 1.0), &PlaybackParams::default().at(position)).unwrap();
        let channel = pool.channel(id).unwrap().id();
        assert_eq!(sim.borrow().emitter_position(channel), Some(position));
    }

    #[test]
    fn test_channel_exhaustion_propagates() {
        let (_sim, backend) = simulated_backend(1);
        let mut pool = SoundEffectPool::new(backend, DEFAULT_SWEEP_INTERVAL);
        pool.play(clip("a", 1.0), &PlaybackParams::default()).unwrap();

        let result = pool.play(clip("b", 1.0), &PlaybackParams::default());
        assert!(matches!(result, Err(AudioError::ChannelAllocationFailed(_))));
        assert_eq!(pool.active_count(), 1);
    }

    #[test]
    fn test_periodic_sweep_cadence() {
        let (sim, backend) = simulated_backend(4);
        let mut pool = SoundEffectPool::new(backend, DEFAULT_SWEEP_INTERVAL);
        pool.play(clip("short", 0.5), &PlaybackParams::default()).unwrap();
        pool.play(clip("long", 10.0), &PlaybackParams::default()).unwrap();

        sim.borrow_mut().update(1.0);
        pool.update(1.0);
        // Finished but not yet swept
        assert_eq!(pool.active_count(), 2);

        sim.borrow_mut().update(1.5);
        pool.update(1.5);
        assert_eq!(pool.active_count(), 1);
        assert_eq!(sim.borrow().allocated_channels(), 1);
    }

    #[test]
    fn test_unload_retention_rules() {
        let (sim, backend) = simulated_backend(8);
        let mut pool = SoundEffectPool::new(backend, DEFAULT_SWEEP_INTERVAL);
        let finished_transient = pool.play(clip("t_short", 0.5), &PlaybackParams::default()).unwrap();
        let playing_transient = pool.play(clip("t_long", 10.0), &PlaybackParams::default()).unwrap();
        let finished_retained = pool.play(clip("r_short", 0.5), &PlaybackParams::default().retained(true)).unwrap();
        let playing_retained = pool.play(clip("r_long", 10.0), &PlaybackParams::default().retained(true)).unwrap();

        sim.borrow_mut().update(1.0);
        assert_eq!(pool.sweep_on_unload(), 3);

        assert!(!pool.contains(finished_transient));
        assert!(!pool.contains(playing_transient));
        assert!(!pool.contains(finished_retained));
        assert!(pool.contains(playing_retained));
        assert_eq!(sim.borrow().allocated_channels(), 1);
    }

    #[test]
    fn test_clear_all_releases_channels() {
        let (sim, backend) = simulated_backend(8);
        let mut pool = SoundEffectPool::new(backend, DEFAULT_SWEEP_INTERVAL);
        for name in ["a", "b", "c"] {
            pool.play(clip(name, 10.0), &PlaybackParams::default().retained(true).looping()).unwrap();
        }

        pool.clear_all();
        assert_eq!(pool.active_count(), 0);
        assert_eq!(sim.borrow().allocated_channels(), 0);
    }

    #[test]
    fn test_game_pause_holds_sounds() {
        let (sim, backend) = simulated_backend(8);
        let mut pool = SoundEffectPool::new(backend, DEFAULT_SWEEP_INTERVAL);
        let gameplay = pool.play(clip("footstep", 1.0), &PlaybackParams::default()).unwrap();
        let menu = pool.play(clip("click", 1.0), &PlaybackParams::default().ignoring_pause()).unwrap();

        pool.set_game_paused(true);
        assert!(!pool.is_playing(gameplay));
        assert!(pool.is_playing(menu));

        // Paused sounds survive sweeps
        assert_eq!(pool.sweep_finished(), 0);

        let queued = pool.play(clip("door", 1.0), &PlaybackParams::default()).unwrap();
        assert!(!pool.is_playing(queued));

        pool.set_game_paused(false);
        assert!(pool.is_playing(gameplay));
        assert!(pool.is_playing(queued));
        let channel = pool.channel(gameplay).unwrap().id();
        assert!(sim.borrow().is_playing(channel));
    }

    #[test]
    fn test_stop_single_instance() {
        let (sim, backend) = simulated_backend(4);
        let mut pool = SoundEffectPool::new(backend, DEFAULT_SWEEP_INTERVAL);
        let id = pool.play(clip("alarm", 5.0), &PlaybackParams::default().looping()).unwrap();

        assert!(pool.stop(id));
        assert!(!pool.stop(id));
        assert_eq!(sim.borrow().allocated_channels(), 0);
    }
}
