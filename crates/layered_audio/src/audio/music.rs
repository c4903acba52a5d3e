//! Music system
//!
//! Five priority-ordered slots compete for a single shared music channel.
//! Each slot holds the *desired* state (clip, volume, looping, whether it
//! should be audible). After every mutation the scheduler resolves which slot
//! wins and reconciles the physical channel with that slot's desired state.
//!
//! Slots never play concurrently. A lower slot keeps its desired state while
//! a higher one is audible and takes the channel back once the higher slot
//! stops or is cleared.

use crate::audio::backend::{ChannelHandle, SharedBackend};
use crate::audio::clip::ClipHandle;
use crate::audio::{AudioError, AudioResult};
use crate::config::ConfigStore;
use crate::foundation::math::clamp_volume;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Logical music slot; ordering is priority (higher overrides lower)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MusicSlot {
    /// Background ambience of the current area
    Ambient = 0,
    /// Gameplay events (combat, boss fights)
    Event = 1,
    /// Player-chosen music, fed by external providers
    User = 2,
    /// Cutscenes
    Cinematic = 3,
    /// Hard override (menus, debugging)
    Override = 4,
}

impl MusicSlot {
    /// Every slot, lowest priority first
    pub const ALL: [MusicSlot; 5] = [
        MusicSlot::Ambient,
        MusicSlot::Event,
        MusicSlot::User,
        MusicSlot::Cinematic,
        MusicSlot::Override,
    ];

    /// Numeric priority
    pub fn priority(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for MusicSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Desired state of one occupied slot
#[derive(Debug, Clone)]
pub struct SlotDesiredState {
    /// Clip to play; providers may leave the `User` slot empty while loading
    pub clip: Option<ClipHandle>,
    /// Display/lookup name
    pub name: Option<String>,
    /// Slot-local volume before global scaling
    pub volume: f32,
    /// Loop the clip
    pub loop_flag: bool,
    /// Survive scene unloads
    pub retain: bool,
    /// Whether the slot should be audible
    pub playing: bool,
    /// One-shot seek applied on the next reconciliation
    pub pending_seek: Option<f32>,
}

impl SlotDesiredState {
    fn for_clip(clip: ClipHandle) -> Self {
        Self {
            name: Some(clip.name().to_string()),
            clip: Some(clip),
            volume: 1.0,
            loop_flag: true,
            retain: false,
            playing: false,
            pending_seek: None,
        }
    }
}

/// Receives clips displaced from the `User` slot
///
/// Providers own the clips they feed in, so the scheduler hands every clip it
/// drops from the `User` slot back instead of letting it vanish.
pub trait ClipReleaser {
    /// Take back a clip that is no longer used
    fn release_clip(&mut self, clip: ClipHandle);
}

/// Scheduler driving the shared music channel from per-slot desired state
pub struct SlotMusicScheduler {
    slots: BTreeMap<MusicSlot, SlotDesiredState>,
    channel: ChannelHandle,
    config: Rc<dyn ConfigStore>,
    current_slot: Option<MusicSlot>,
    music_enabled: bool,
    provider_attached: bool,
}

impl SlotMusicScheduler {
    /// Create a scheduler, allocating the shared music channel
    pub fn new(backend: &SharedBackend, config: Rc<dyn ConfigStore>) -> AudioResult<Self> {
        Ok(Self {
            slots: BTreeMap::new(),
            channel: ChannelHandle::allocate(backend)?,
            config,
            current_slot: None,
            music_enabled: true,
            provider_attached: false,
        })
    }

    /// Insert or replace a slot's desired state
    ///
    /// Keeps the previous `playing` flag and queues a seek to the start.
    #[allow(clippy::too_many_arguments)]
    pub fn set_music(
        &mut self,
        slot: MusicSlot,
        clip: ClipHandle,
        name: Option<String>,
        volume: f32,
        loop_flag: bool,
        retain: bool,
        releaser: &mut dyn ClipReleaser,
    ) {
        let playing = match self.slots.get(&slot) {
            Some(previous) => {
                if slot == MusicSlot::User {
                    release_if_replaced(previous.clip.as_ref(), &clip, releaser);
                }
                previous.playing
            }
            None => false,
        };

        self.slots.insert(
            slot,
            SlotDesiredState {
                clip: Some(clip),
                name,
                volume,
                loop_flag,
                retain,
                playing,
                pending_seek: Some(0.0),
            },
        );
        self.reconcile();
    }

    /// Replace only the clip of a slot, creating the slot with defaults if absent
    pub fn set_music_clip(&mut self, clip: ClipHandle, slot: MusicSlot, releaser: &mut dyn ClipReleaser) {
        match self.slots.get_mut(&slot) {
            Some(state) => {
                if slot == MusicSlot::User {
                    release_if_replaced(state.clip.as_ref(), &clip, releaser);
                }
                state.clip = Some(clip);
            }
            None => {
                self.slots.insert(slot, SlotDesiredState::for_clip(clip));
            }
        }
        self.reconcile();
    }

    /// Change looping of an occupied slot
    pub fn set_music_looping(&mut self, loop_flag: bool, slot: MusicSlot) {
        if let Some(state) = self.slots.get_mut(&slot) {
            state.loop_flag = loop_flag;
            self.reconcile();
        }
    }

    /// Change the slot-local volume of an occupied slot
    pub fn set_music_volume(&mut self, volume: f32, slot: MusicSlot) {
        if let Some(state) = self.slots.get_mut(&slot) {
            state.volume = volume;
            self.reconcile();
        }
    }

    /// Remove a slot entirely
    pub fn clear_music(&mut self, slot: MusicSlot, releaser: &mut dyn ClipReleaser) {
        if let Some(state) = self.slots.remove(&slot) {
            if slot == MusicSlot::User {
                if let Some(clip) = state.clip {
                    releaser.release_clip(clip);
                }
            }
        }
        self.reconcile();
    }

    /// Remove every slot
    pub fn clear_all(&mut self, releaser: &mut dyn ClipReleaser) {
        if let Some(clip) = self.slots.remove(&MusicSlot::User).and_then(|state| state.clip) {
            releaser.release_clip(clip);
        }
        self.slots.clear();
        self.reconcile();
    }

    /// Mark a slot as audible, optionally restarting from the beginning
    pub fn start_music(&mut self, slot: MusicSlot, restart: bool) -> AudioResult<()> {
        let state = self.slots.get_mut(&slot).ok_or(AudioError::SlotNotFound(slot))?;
        state.playing = true;
        if restart {
            state.pending_seek = Some(0.0);
        }
        self.reconcile();
        Ok(())
    }

    /// Mark a slot as silent
    pub fn stop_music(&mut self, slot: MusicSlot) -> AudioResult<()> {
        let state = self.slots.get_mut(&slot).ok_or(AudioError::SlotNotFound(slot))?;
        state.playing = false;
        self.reconcile();
        Ok(())
    }

    /// Queue a seek for a slot
    pub fn seek_music(&mut self, slot: MusicSlot, time: f32) -> AudioResult<()> {
        let state = self.slots.get_mut(&slot).ok_or(AudioError::SlotNotFound(slot))?;
        state.pending_seek = Some(time);
        self.reconcile();
        Ok(())
    }

    /// Drop every slot not marked `retain`
    pub fn sweep_on_unload(&mut self, releaser: &mut dyn ClipReleaser) -> usize {
        let before = self.slots.len();
        let mut released = None;
        self.slots.retain(|slot, state| {
            if state.retain {
                return true;
            }
            if *slot == MusicSlot::User {
                released = state.clip.take();
            }
            false
        });
        if let Some(clip) = released {
            releaser.release_clip(clip);
        }
        let removed = before - self.slots.len();
        if removed > 0 {
            log::debug!("Scene unload cleared {} music slot(s)", removed);
        }
        self.reconcile();
        removed
    }

    /// Take the clip out of the `User` slot, silencing the channel if it was
    /// playing it; the slot entry itself stays
    pub fn release_user_clip(&mut self) -> Option<ClipHandle> {
        let clip = self.slots.get_mut(&MusicSlot::User)?.clip.take()?;
        if self.current_slot == Some(MusicSlot::User) {
            log_failure("stop", self.channel.stop());
            log_failure("unload", self.channel.unload());
            self.current_slot = None;
        }
        Some(clip)
    }

    /// Enable or disable all music output, reconciling immediately
    pub fn set_music_enabled(&mut self, enabled: bool) {
        if self.music_enabled != enabled {
            log::info!("Music {}", if enabled { "enabled" } else { "disabled" });
        }
        self.music_enabled = enabled;
        self.reconcile();
    }

    /// Whether music output is enabled
    pub fn music_enabled(&self) -> bool {
        self.music_enabled
    }

    /// Record whether an external provider currently owns the `User` slot
    ///
    /// Does not reconcile; callers decide when the change should be heard.
    pub fn set_provider_attached(&mut self, attached: bool) {
        self.provider_attached = attached;
    }

    /// Slot that should drive the channel right now
    ///
    /// Highest slot flagged `playing`. The `User` slot also wins whenever a
    /// provider is attached, entry or not, since providers handle play/pause
    /// themselves.
    pub fn resolve_slot(&self) -> Option<MusicSlot> {
        MusicSlot::ALL.iter().rev().copied().find(|slot| {
            (*slot == MusicSlot::User && self.provider_attached)
                || self.slots.get(slot).is_some_and(|state| state.playing)
        })
    }

    /// Bring the shared channel in line with the resolved slot
    pub fn reconcile(&mut self) {
        if !self.music_enabled {
            log_failure("pause", self.channel.pause());
            self.current_slot = None;
            return;
        }

        let Some(slot) = self.resolve_slot() else {
            log_failure("pause", self.channel.pause());
            if self.current_slot.take().is_some() {
                log::debug!("No music slot active");
            }
            return;
        };

        if self.current_slot != Some(slot) {
            log::debug!("Music slot {} now drives the channel", slot);
        }
        self.current_slot = Some(slot);

        let global_volume = self.config.music_volume();
        let channel = &self.channel;
        let loaded = channel.loaded_clip();

        // Provider attached but nothing handed over yet
        let Some((state, clip)) = self
            .slots
            .get_mut(&slot)
            .and_then(|state| state.clip.clone().map(|clip| (state, clip)))
        else {
            if loaded.is_some() {
                log_failure("stop", channel.stop());
                log_failure("unload", channel.unload());
            }
            return;
        };
        let clip = &clip;

        if loaded.as_ref() != Some(clip) {
            log_failure("stop", channel.stop());
            log_failure("load", channel.load(clip));
        }

        log_failure("set_loop", channel.set_loop(state.loop_flag));
        log_failure("set_volume", channel.set_volume(clamp_volume(state.volume * global_volume)));

        if let Some(time) = state.pending_seek.take() {
            log_failure("seek", channel.seek(time));
        }

        // A clip parked on its last sample has finished; only a seek or a
        // new clip starts it again
        let parked = !state.loop_flag
            && clip.sample_count() > 0
            && channel.position_samples() >= clip.sample_count();
        if !channel.is_playing() && !parked {
            log_failure("play", channel.play());
        }
    }

    /// Display name of a slot
    pub fn get_music_name(&self, slot: MusicSlot) -> Option<String> {
        self.slots.get(&slot).and_then(|state| state.name.clone())
    }

    /// Whether the slot is the one currently allowed to drive the channel
    pub fn is_music_playing(&self, slot: MusicSlot) -> bool {
        self.music_enabled && self.resolve_slot() == Some(slot)
    }

    /// Whether the slot is flagged to play, audible or not
    pub fn is_music_set_to_play(&self, slot: MusicSlot) -> bool {
        self.slots.get(&slot).is_some_and(|state| state.playing)
    }

    /// Whether the slot has content
    ///
    /// The `User` slot counts as having content whenever it has an entry, so
    /// providers can manage their own readiness.
    pub fn music_has_clip(&self, slot: MusicSlot) -> bool {
        match self.slots.get(&slot) {
            Some(_) if slot == MusicSlot::User => true,
            Some(state) => state.clip.is_some(),
            None => false,
        }
    }

    /// Desired state of a slot
    pub fn slot_state(&self, slot: MusicSlot) -> Option<&SlotDesiredState> {
        self.slots.get(&slot)
    }

    /// Slot that drove the channel on the last reconciliation
    pub fn current_slot(&self) -> Option<MusicSlot> {
        self.current_slot
    }

    /// The shared music channel
    pub fn channel(&self) -> &ChannelHandle {
        &self.channel
    }

    /// Playback position of the shared channel in seconds
    pub fn channel_position(&self) -> f32 {
        self.channel.position()
    }

    /// Clip of the `User` slot if it has just played to its very last sample
    pub fn finished_user_clip(&self) -> Option<ClipHandle> {
        if self.current_slot != Some(MusicSlot::User) || self.channel.is_playing() {
            return None;
        }
        let clip = self.slots.get(&MusicSlot::User)?.clip.clone()?;
        let loaded = self.channel.loaded_clip()?;
        if !loaded.same_clip(&clip) || clip.sample_count() == 0 {
            return None;
        }
        (self.channel.position_samples() == clip.sample_count()).then_some(clip)
    }
}

fn release_if_replaced(previous: Option<&ClipHandle>, incoming: &ClipHandle, releaser: &mut dyn ClipReleaser) {
    if let Some(old) = previous {
        if !old.same_clip(incoming) {
            releaser.release_clip(old.clone());
        }
    }
}

fn log_failure(operation: &str, result: AudioResult<()>) {
    if let Err(e) = result {
        log::warn!("Music channel {} failed: {}", operation, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::simulated::SimulatedBackend;
    use crate::audio::backend::{ChannelId, OutputBackend};
    use crate::audio::test_support::{clip, simulated_backend};
    use approx::assert_relative_eq;
    use std::cell::RefCell;

    fn scheduler(volume: f32) -> (Rc<RefCell<SimulatedBackend>>, SlotMusicScheduler) {
        let (sim, backend) = simulated_backend(8);
        let music = SlotMusicScheduler::new(&backend, Rc::new(volume)).unwrap();
        (sim, music)
    }

    fn channel_id(music: &SlotMusicScheduler) -> ChannelId {
        music.channel().id()
    }

    fn set(music: &mut SlotMusicScheduler, slot: MusicSlot, c: &ClipHandle, releaser: &mut Vec<ClipHandle>) {
        music.set_music(slot, c.clone(), Some(c.name().to_string()), 1.0, true, false, releaser);
    }

    #[test]
    fn test_slot_ordering_is_priority() {
        assert!(MusicSlot::Ambient < MusicSlot::Event);
        assert!(MusicSlot::Event < MusicSlot::User);
        assert!(MusicSlot::User < MusicSlot::Cinematic);
        assert!(MusicSlot::Cinematic < MusicSlot::Override);
        assert_eq!(MusicSlot::Override.priority(), 4);
    }

    #[test]
    fn test_highest_playing_slot_wins() {
        let (sim, mut music) = scheduler(1.0);
        let mut released = Vec::new();
        let ambient = clip("ambient", 10.0);
        let cinematic = clip("cutscene", 10.0);

        set(&mut music, MusicSlot::Ambient, &ambient, &mut released);
        set(&mut music, MusicSlot::Cinematic, &cinematic, &mut released);
        music.start_music(MusicSlot::Ambient, true).unwrap();
        music.start_music(MusicSlot::Cinematic, true).unwrap();

        assert_eq!(music.current_slot(), Some(MusicSlot::Cinematic));
        assert!(music.is_music_playing(MusicSlot::Cinematic));
        assert!(!music.is_music_playing(MusicSlot::Ambient));
        assert!(music.is_music_set_to_play(MusicSlot::Ambient));
        assert_eq!(sim.borrow().loaded_clip(channel_id(&music)), Some(cinematic));
    }

    #[test]
    fn test_set_music_does_not_autostart() {
        let (sim, mut music) = scheduler(1.0);
        let mut released = Vec::new();
        set(&mut music, MusicSlot::Ambient, &clip("calm", 5.0), &mut released);

        assert_eq!(music.current_slot(), None);
        assert!(!sim.borrow().is_playing(channel_id(&music)));
    }

    #[test]
    fn test_set_music_keeps_playing_flag_and_queues_seek() {
        let (_sim, mut music) = scheduler(1.0);
        let mut released = Vec::new();
        set(&mut music, MusicSlot::Event, &clip("a", 5.0), &mut released);
        music.start_music(MusicSlot::Event, true).unwrap();
        music.stop_music(MusicSlot::Event).unwrap();
        music.start_music(MusicSlot::Event, false).unwrap();

        set(&mut music, MusicSlot::Event, &clip("b", 5.0), &mut released);
        let state = music.slot_state(MusicSlot::Event).unwrap();
        assert!(state.playing);
        // Consumed by the reconciliation that followed
        assert_eq!(state.pending_seek, None);
        assert!(released.is_empty());
    }

    #[test]
    fn test_volume_clamped() {
        let (sim, mut music) = scheduler(0.9);
        let mut released = Vec::new();
        set(&mut music, MusicSlot::Ambient, &clip("loud", 5.0), &mut released);
        music.start_music(MusicSlot::Ambient, true).unwrap();
        music.set_music_volume(5.0, MusicSlot::Ambient);

        let volume = sim.borrow().volume(channel_id(&music)).unwrap();
        assert!(volume <= 1.0);
        assert_relative_eq!(volume, 1.0);
    }

    #[test]
    fn test_effective_volume_scaled_by_global() {
        let (sim, mut music) = scheduler(0.5);
        let mut released = Vec::new();
        let theme = clip("theme", 5.0);
        music.set_music(MusicSlot::Ambient, theme, None, 0.8, true, true, &mut released);
        music.start_music(MusicSlot::Ambient, true).unwrap();

        assert_relative_eq!(sim.borrow().volume(channel_id(&music)).unwrap(), 0.4);
    }

    #[test]
    fn test_looping_and_volume_ignore_absent_slot() {
        let (_sim, mut music) = scheduler(1.0);
        music.set_music_looping(false, MusicSlot::Event);
        music.set_music_volume(0.1, MusicSlot::Event);
        assert!(music.slot_state(MusicSlot::Event).is_none());
    }

    #[test]
    fn test_missing_slot_operations_error() {
        let (_sim, mut music) = scheduler(1.0);
        assert!(matches!(music.start_music(MusicSlot::Event, true), Err(AudioError::SlotNotFound(MusicSlot::Event))));
        assert!(matches!(music.stop_music(MusicSlot::User), Err(AudioError::SlotNotFound(_))));
        assert!(matches!(music.seek_music(MusicSlot::Ambient, 3.0), Err(AudioError::SlotNotFound(_))));
    }

    #[test]
    fn test_clear_music_idempotent() {
        let (_sim, mut music) = scheduler(1.0);
        let mut released = Vec::new();
        set(&mut music, MusicSlot::Ambient, &clip("a", 5.0), &mut released);
        music.start_music(MusicSlot::Ambient, true).unwrap();

        music.clear_music(MusicSlot::Ambient, &mut released);
        let once = (music.current_slot(), music.slot_state(MusicSlot::Ambient).is_none());
        music.clear_music(MusicSlot::Ambient, &mut released);
        let twice = (music.current_slot(), music.slot_state(MusicSlot::Ambient).is_none());

        assert_eq!(once, (None, true));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_user_clip_replacement_releases_old_clip_once() {
        let (_sim, mut music) = scheduler(1.0);
        let mut released = Vec::new();
        let first = clip("song1", 5.0);
        let second = clip("song2", 5.0);

        music.set_music_clip(first.clone(), MusicSlot::User, &mut released);
        music.set_music_clip(first.clone(), MusicSlot::User, &mut released);
        assert!(released.is_empty());

        music.set_music_clip(second.clone(), MusicSlot::User, &mut released);
        assert_eq!(released, vec![first]);
        assert!(!released.contains(&second));
    }

    #[test]
    fn test_non_user_clip_replacement_is_silent() {
        let (_sim, mut music) = scheduler(1.0);
        let mut released = Vec::new();
        music.set_music_clip(clip("a", 5.0), MusicSlot::Event, &mut released);
        music.set_music_clip(clip("b", 5.0), MusicSlot::Event, &mut released);
        assert!(released.is_empty());
    }

    #[test]
    fn test_set_music_clip_defaults() {
        let (_sim, mut music) = scheduler(1.0);
        let mut released = Vec::new();
        music.set_music_clip(clip("radio", 5.0), MusicSlot::User, &mut released);

        let state = music.slot_state(MusicSlot::User).unwrap();
        assert_eq!(state.volume, 1.0);
        assert!(state.loop_flag);
        assert!(!state.retain);
        assert!(!state.playing);
        assert_eq!(music.get_music_name(MusicSlot::User).as_deref(), Some("radio"));
    }

    #[test]
    fn test_provider_makes_user_slot_active() {
        let (sim, mut music) = scheduler(1.0);
        let mut released = Vec::new();
        let song = clip("song", 5.0);
        music.set_music_clip(song.clone(), MusicSlot::User, &mut released);
        assert!(!music.is_music_playing(MusicSlot::User));

        music.set_provider_attached(true);
        assert!(music.is_music_playing(MusicSlot::User));
        assert!(!music.is_music_set_to_play(MusicSlot::User));

        music.reconcile();
        assert!(sim.borrow().is_playing(channel_id(&music)));
        assert_eq!(sim.borrow().loaded_clip(channel_id(&music)), Some(song));
    }

    #[test]
    fn test_user_slot_has_clip_without_clip() {
        let (_sim, mut music) = scheduler(1.0);
        let mut released = Vec::new();
        music.set_music_clip(clip("x", 1.0), MusicSlot::User, &mut released);
        assert!(music.release_user_clip().is_some());
        assert!(music.music_has_clip(MusicSlot::User));

        music.set_music_clip(clip("y", 1.0), MusicSlot::Event, &mut released);
        assert!(music.music_has_clip(MusicSlot::Event));
        assert!(!music.music_has_clip(MusicSlot::Ambient));
    }

    #[test]
    fn test_music_disabled_pauses_without_touching_state() {
        let (sim, mut music) = scheduler(1.0);
        let mut released = Vec::new();
        set(&mut music, MusicSlot::Ambient, &clip("a", 5.0), &mut released);
        music.start_music(MusicSlot::Ambient, true).unwrap();

        music.set_music_enabled(false);
        assert!(!sim.borrow().is_playing(channel_id(&music)));
        assert!(music.is_music_set_to_play(MusicSlot::Ambient));
        assert!(!music.is_music_playing(MusicSlot::Ambient));

        music.set_music_enabled(true);
        assert!(sim.borrow().is_playing(channel_id(&music)));
        assert_eq!(music.current_slot(), Some(MusicSlot::Ambient));
    }

    #[test]
    fn test_seek_applied_once() {
        let (sim, mut music) = scheduler(1.0);
        let mut released = Vec::new();
        set(&mut music, MusicSlot::Ambient, &clip("a", 10.0), &mut released);
        music.start_music(MusicSlot::Ambient, true).unwrap();
        music.seek_music(MusicSlot::Ambient, 4.0).unwrap();

        assert_relative_eq!(sim.borrow().position(channel_id(&music)), 4.0, epsilon = 1e-3);
        assert_eq!(music.slot_state(MusicSlot::Ambient).unwrap().pending_seek, None);
    }

    #[test]
    fn test_sweep_on_unload_keeps_retained() {
        let (_sim, mut music) = scheduler(1.0);
        let mut released = Vec::new();
        let radio = clip("radio", 5.0);
        music.set_music(MusicSlot::Ambient, clip("a", 5.0), None, 1.0, true, true, &mut released);
        music.set_music(MusicSlot::Event, clip("b", 5.0), None, 1.0, true, false, &mut released);
        music.set_music_clip(radio.clone(), MusicSlot::User, &mut released);

        assert_eq!(music.sweep_on_unload(&mut released), 2);
        assert!(music.slot_state(MusicSlot::Ambient).is_some());
        assert!(music.slot_state(MusicSlot::Event).is_none());
        assert_eq!(released, vec![radio]);
    }

    #[test]
    fn test_finished_user_clip_detection() {
        let (sim, mut music) = scheduler(1.0);
        let mut released = Vec::new();
        let song = clip("song", 1.0);
        music.set_music_clip(song.clone(), MusicSlot::User, &mut released);
        music.set_music_looping(false, MusicSlot::User);
        music.set_provider_attached(true);
        music.reconcile();
        assert_eq!(music.finished_user_clip(), None);

        sim.borrow_mut().update(2.0);
        assert_eq!(music.finished_user_clip(), Some(song));
    }

    #[test]
    fn test_finished_clip_stays_parked_until_restarted() {
        let (sim, mut music) = scheduler(1.0);
        let mut released = Vec::new();
        let sting = clip("sting", 1.0);
        let id = channel_id(&music);
        music.set_music(MusicSlot::Cinematic, sting.clone(), None, 1.0, false, false, &mut released);
        music.start_music(MusicSlot::Cinematic, true).unwrap();
        sim.borrow_mut().update(1.5);
        assert!(!sim.borrow().is_playing(id));

        music.set_music_volume(0.5, MusicSlot::Cinematic);
        music.reconcile();
        assert!(!sim.borrow().is_playing(id));
        assert_eq!(sim.borrow().position_samples(id), sting.sample_count());
        assert_relative_eq!(sim.borrow().volume(id).unwrap(), 0.5);

        music.start_music(MusicSlot::Cinematic, true).unwrap();
        assert!(sim.borrow().is_playing(id));
        assert_eq!(sim.borrow().position_samples(id), 0);
    }

    #[test]
    fn test_attached_provider_claims_channel_without_entry() {
        let (sim, mut music) = scheduler(1.0);
        let mut released = Vec::new();
        let id = channel_id(&music);
        set(&mut music, MusicSlot::Ambient, &clip("a", 5.0), &mut released);
        music.start_music(MusicSlot::Ambient, true).unwrap();
        assert!(sim.borrow().is_playing(id));

        music.set_provider_attached(true);
        music.reconcile();
        assert!(music.is_music_playing(MusicSlot::User));
        assert_eq!(music.current_slot(), Some(MusicSlot::User));
        assert!(!sim.borrow().is_playing(id));
        assert_eq!(sim.borrow().loaded_clip(id), None);

        music.set_provider_attached(false);
        music.reconcile();
        assert_eq!(music.current_slot(), Some(MusicSlot::Ambient));
        assert!(sim.borrow().is_playing(id));
    }

    #[test]
    fn test_scenario_priority_handoff() {
        let (sim, mut music) = scheduler(0.5);
        let mut released = Vec::new();
        let theme = clip("theme_a", 30.0);
        let battle = clip("battle", 30.0);
        let id = channel_id(&music);

        music.set_music(MusicSlot::Ambient, theme.clone(), Some("theme_a".into()), 0.8, true, true, &mut released);
        music.start_music(MusicSlot::Ambient, true).unwrap();
        assert_eq!(sim.borrow().loaded_clip(id), Some(theme.clone()));
        assert_relative_eq!(sim.borrow().volume(id).unwrap(), 0.4);
        assert!(sim.borrow().is_looping(id));

        music.set_music(MusicSlot::Event, battle.clone(), Some("battle".into()), 1.0, false, false, &mut released);
        music.start_music(MusicSlot::Event, true).unwrap();
        assert_eq!(sim.borrow().loaded_clip(id), Some(battle));
        assert!(music.slot_state(MusicSlot::Ambient).is_some());
        assert!(!music.is_music_playing(MusicSlot::Ambient));

        music.stop_music(MusicSlot::Event).unwrap();
        assert_eq!(sim.borrow().loaded_clip(id), Some(theme));
        assert_eq!(music.current_slot(), Some(MusicSlot::Ambient));
        assert!(sim.borrow().is_playing(id));
    }
}
