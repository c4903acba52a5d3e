//! Audio orchestrator
//!
//! The single entry point gameplay and UI code talk to. Owns the music
//! scheduler, the sound effect pool and the provider registry, resolves clip
//! names through the resource provider and turns bus events into calls on
//! those components once per tick.
//!
//! # Tick order
//! 1. The backend advances playback
//! 2. The selected provider is fed the playback position and track ends
//! 3. Bus events are handled strictly in arrival order
//! 4. The sound pool runs its periodic sweep
//!
//! Sound playback is best effort: every `play_*` call logs failures and
//! returns `None` instead of an error.

use crate::audio::backend::SharedBackend;
use crate::audio::clip::{ClipHandle, ResourceProvider, SoundCategory};
use crate::audio::music::{MusicSlot, SlotMusicScheduler};
use crate::audio::provider::{ExternalMusicProviderRegistry, PanelDescriptor, SharedProvider};
use crate::audio::sound_pool::{PlaybackParams, SoundEffectPool, SoundInstanceId};
use crate::audio::{AudioError, AudioResult};
use crate::config::{AudioSettings, ConfigStore};
use crate::events::{AudioEvent, EventBus};
use crate::foundation::math::Vec3;
use std::rc::Rc;

/// External collaborators the orchestrator is wired to
pub struct AudioServices {
    /// Output backend shared by music and sound channels
    pub backend: SharedBackend,
    /// Clip name resolution
    pub resources: Rc<dyn ResourceProvider>,
    /// Live global music volume
    pub config: Rc<dyn ConfigStore>,
    /// Bus drained once per tick
    pub events: EventBus,
}

/// Façade over music slots, sound effects and music providers
pub struct AudioOrchestrator {
    backend: SharedBackend,
    resources: Rc<dyn ResourceProvider>,
    events: EventBus,
    music: SlotMusicScheduler,
    sounds: SoundEffectPool,
    providers: ExternalMusicProviderRegistry,
    ui_sound_volume: f32,
}

impl AudioOrchestrator {
    /// Wire up the audio system
    ///
    /// # Errors
    /// Fails if the backend cannot provide the shared music channel.
    pub fn new(services: AudioServices, settings: &AudioSettings) -> AudioResult<Self> {
        let AudioServices { backend, resources, config, events } = services;

        let mut music = SlotMusicScheduler::new(&backend, config)?;
        music.set_music_enabled(settings.music_enabled);
        let sounds = SoundEffectPool::new(Rc::clone(&backend), settings.sweep_interval_secs);

        log::info!(
            "Audio orchestrator initialized (music {}, sweep every {}s)",
            if settings.music_enabled { "on" } else { "off" },
            settings.sweep_interval_secs
        );

        Ok(Self {
            backend,
            resources,
            events,
            music,
            sounds,
            providers: ExternalMusicProviderRegistry::new(),
            ui_sound_volume: settings.ui_sound_volume,
        })
    }

    /// Advance the audio system by one tick
    pub fn tick(&mut self, delta_time: f32) {
        self.backend.borrow_mut().update(delta_time);

        // Track ends are read before any event touches the channel
        if self.providers.has_selection() && self.music.current_slot() == Some(MusicSlot::User) {
            self.providers.report_time(self.music.channel_position());
            self.providers.observe_track_end(self.music.finished_user_clip());
        }

        for event in self.events.drain(delta_time) {
            self.handle_event(event);
        }

        self.sounds.update(delta_time);
    }

    fn handle_event(&mut self, event: AudioEvent) {
        log::trace!("Handling {:?}", event);
        match event {
            AudioEvent::ConfigChanged => {
                // Re-applies volume and resumes a channel stopped by a reset
                self.music.reconcile();
                self.providers.broadcast_audio_restarted();
            }
            AudioEvent::MusicEnabled => self.set_music_enabled(true),
            AudioEvent::MusicDisabled => self.set_music_enabled(false),
            AudioEvent::SceneUnloaded => self.scene_unloaded(),
        }
    }

    // ========================================================================
    // Sound effects
    // ========================================================================

    /// Play an interface sound: retained, unaffected by game pause
    pub fn play_ui_sound(&mut self, name: &str) -> Option<SoundInstanceId> {
        let params = PlaybackParams::default()
            .retained(true)
            .ignoring_pause()
            .with_volume(self.ui_sound_volume);
        self.play_sound_with(name, SoundCategory::Sound, &params)
    }

    /// Play a non-positional sound
    pub fn play_sound(&mut self, name: &str, category: SoundCategory, retain: bool) -> Option<SoundInstanceId> {
        self.play_sound_with(name, category, &PlaybackParams::default().retained(retain))
    }

    /// Play a sound at a world position
    pub fn play_sound_positional(
        &mut self,
        name: &str,
        category: SoundCategory,
        retain: bool,
        position: Vec3,
    ) -> Option<SoundInstanceId> {
        self.play_sound_with(name, category, &PlaybackParams::default().retained(retain).at(position))
    }

    /// Play a sound with full control over its parameters
    pub fn play_sound_with(
        &mut self,
        name: &str,
        category: SoundCategory,
        params: &PlaybackParams,
    ) -> Option<SoundInstanceId> {
        match self.try_play_sound(name, category, params) {
            Ok(id) => Some(id),
            Err(e) => {
                log::error!("Failed to play sound '{}': {}", name, e);
                None
            }
        }
    }

    /// Play a sound, returning why it could not start
    pub fn try_play_sound(
        &mut self,
        name: &str,
        category: SoundCategory,
        params: &PlaybackParams,
    ) -> AudioResult<SoundInstanceId> {
        let clip = self.resolve(name, category)?;
        self.sounds.play(clip, params)
    }

    /// Stop every sound effect immediately
    pub fn clear_all_sounds(&mut self) {
        self.sounds.clear_all();
    }

    /// Stop one sound effect
    pub fn stop_sound(&mut self, id: SoundInstanceId) -> bool {
        self.sounds.stop(id)
    }

    /// Pause or resume every sound that honours the game pause
    pub fn set_game_paused(&mut self, paused: bool) {
        log::debug!("Game pause {}", if paused { "on" } else { "off" });
        self.sounds.set_game_paused(paused);
    }

    /// Volume used by [`Self::play_ui_sound`]
    pub fn set_ui_sound_volume(&mut self, volume: f32) {
        self.ui_sound_volume = volume;
    }

    // ========================================================================
    // Music
    // ========================================================================

    /// Put a clip from the music library into a slot
    ///
    /// Does not start the slot. Nothing changes if the name does not resolve.
    pub fn set_music(
        &mut self,
        name: &str,
        slot: MusicSlot,
        volume: f32,
        loop_flag: bool,
        retain: bool,
    ) -> AudioResult<()> {
        let clip = self.resolve(name, SoundCategory::Music).inspect_err(|e| {
            log::error!("Cannot set {} music: {}", slot, e);
        })?;
        self.music
            .set_music(slot, clip, Some(name.to_string()), volume, loop_flag, retain, &mut self.providers);
        Ok(())
    }

    /// Put an already resolved clip into a slot
    pub fn set_music_clip(&mut self, clip: ClipHandle, slot: MusicSlot) {
        self.music.set_music_clip(clip, slot, &mut self.providers);
    }

    /// Change looping of an occupied slot
    pub fn set_music_looping(&mut self, loop_flag: bool, slot: MusicSlot) {
        self.music.set_music_looping(loop_flag, slot);
    }

    /// Change the volume of an occupied slot
    pub fn set_music_volume(&mut self, volume: f32, slot: MusicSlot) {
        self.music.set_music_volume(volume, slot);
    }

    /// Flag a slot to play; `restart` rewinds it
    pub fn start_music(&mut self, slot: MusicSlot, restart: bool) {
        warn_missing_slot("start", self.music.start_music(slot, restart));
    }

    /// Flag a slot as silent
    pub fn stop_music(&mut self, slot: MusicSlot) {
        warn_missing_slot("stop", self.music.stop_music(slot));
    }

    /// Seek a slot to `time` seconds
    pub fn seek_music(&mut self, slot: MusicSlot, time: f32) {
        warn_missing_slot("seek", self.music.seek_music(slot, time));
    }

    /// Remove a slot
    pub fn clear_music(&mut self, slot: MusicSlot) {
        self.music.clear_music(slot, &mut self.providers);
    }

    /// Remove every slot, handing the `User` clip back to its provider
    pub fn clear_all_music(&mut self) {
        self.music.clear_all(&mut self.providers);
    }

    /// Switch music output on or off
    pub fn set_music_enabled(&mut self, enabled: bool) {
        self.music.set_music_enabled(enabled);
    }

    /// Display name of a slot
    pub fn get_music_name(&self, slot: MusicSlot) -> Option<String> {
        self.music.get_music_name(slot)
    }

    /// Whether the slot is the one driving the music channel
    pub fn is_music_playing(&self, slot: MusicSlot) -> bool {
        self.music.is_music_playing(slot)
    }

    /// Whether the slot is flagged to play
    pub fn is_music_set_to_play(&self, slot: MusicSlot) -> bool {
        self.music.is_music_set_to_play(slot)
    }

    /// Whether the slot has content
    pub fn music_has_clip(&self, slot: MusicSlot) -> bool {
        self.music.music_has_clip(slot)
    }

    /// Slot currently driving the music channel
    pub fn current_slot(&self) -> Option<MusicSlot> {
        self.music.current_slot()
    }

    /// Whether music output is enabled
    pub fn music_enabled(&self) -> bool {
        self.music.music_enabled()
    }

    // ========================================================================
    // Providers
    // ========================================================================

    /// Register an external music provider
    pub fn register_provider(&mut self, provider: SharedProvider) -> AudioResult<()> {
        self.providers.register(provider)
    }

    /// Unregister a provider, deselecting it first if needed
    pub fn unregister_provider(&mut self, provider: &SharedProvider) -> AudioResult<()> {
        self.providers.unregister(provider, &mut self.music)
    }

    /// Select a provider by type key, or none
    pub fn select_provider(&mut self, type_name: Option<&str>) -> AudioResult<()> {
        self.providers.select(type_name, &mut self.music)
    }

    /// Type key of the selected provider
    pub fn selected_provider_name(&self) -> Option<String> {
        self.providers.current_selected_name()
    }

    /// Type keys of every registered provider
    pub fn registered_provider_names(&self) -> Vec<&'static str> {
        self.providers.registered_names()
    }

    /// Control panels offered by registered providers
    pub fn provider_panels(&self) -> Vec<(&'static str, PanelDescriptor)> {
        self.providers.panels()
    }

    // ========================================================================
    // Scene lifecycle and inspection
    // ========================================================================

    /// Drop everything not retained across scenes
    pub fn scene_unloaded(&mut self) {
        let sounds = self.sounds.sweep_on_unload();
        let slots = self.music.sweep_on_unload(&mut self.providers);
        log::info!("Scene unloaded: removed {} sound(s) and {} music slot(s)", sounds, slots);
    }

    /// Number of tracked sound effects
    pub fn active_sound_count(&self) -> usize {
        self.sounds.active_count()
    }

    /// Bus the orchestrator drains
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Music scheduler, for inspection
    pub fn music(&self) -> &SlotMusicScheduler {
        &self.music
    }

    /// Sound pool, for inspection
    pub fn sounds(&self) -> &SoundEffectPool {
        &self.sounds
    }

    fn resolve(&self, name: &str, category: SoundCategory) -> AudioResult<ClipHandle> {
        self.resources.resolve(name, category).ok_or_else(|| AudioError::ClipNotFound {
            name: name.to_string(),
            category,
        })
    }
}

fn warn_missing_slot(operation: &str, result: AudioResult<()>) {
    if let Err(e) = result {
        log::warn!("Cannot {} music: {}", operation, e);
    }
}
