//! External music providers
//!
//! A provider is a pluggable music source (an in-game radio, a jukebox) that
//! feeds clips into [`MusicSlot::User`] and manages its own play/pause
//! semantics. Providers are created and owned by gameplay code and registered
//! once per type key; at most one is selected at a time.
//!
//! Clip release happens on deselect or replacement, never on destruction:
//! a provider may be deselected and selected again later without
//! re-registering, and must get back every clip it handed over.

use crate::audio::clip::ClipHandle;
use crate::audio::music::{ClipReleaser, MusicSlot, SlotMusicScheduler};
use crate::audio::{AudioError, AudioResult};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// UI description a provider offers for its control panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelDescriptor {
    /// Panel title
    pub title: String,
    /// Labels of the controls the panel shows
    pub controls: Vec<String>,
}

/// Pluggable source of music for the `User` slot
pub trait ExternalMusicProvider {
    /// Type key; at most one provider per key can be registered
    fn type_name(&self) -> &'static str;

    /// Human readable name
    fn nice_name(&self) -> String {
        self.type_name().to_string()
    }

    /// Whether the provider is the selected one
    fn is_enabled(&self) -> bool;

    /// Selection changed
    fn set_enabled(&mut self, enabled: bool);

    /// Playback position of the provider's current clip, reported every tick
    fn report_time(&mut self, time: f32);

    /// The provider's clip played to its end
    fn signal_track_ended(&mut self);

    /// A clip the provider handed over is no longer used
    fn report_clip_released(&mut self, clip: ClipHandle);

    /// Audio output was reset or reconfigured
    fn signal_audio_restarted(&mut self);

    /// Optional control panel description
    fn panel_descriptor(&self) -> Option<PanelDescriptor> {
        None
    }
}

/// Provider shared between its owner and the registry
pub type SharedProvider = Rc<RefCell<dyn ExternalMusicProvider>>;

/// Registry of external providers and the current selection
#[derive(Default)]
pub struct ExternalMusicProviderRegistry {
    providers: BTreeMap<&'static str, SharedProvider>,
    selected: Option<&'static str>,
    /// Clip whose end was already signalled
    ended_clip: Option<ClipHandle>,
}

impl ExternalMusicProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its type key
    pub fn register(&mut self, provider: SharedProvider) -> AudioResult<()> {
        let key = provider.borrow().type_name();
        if self.providers.contains_key(key) {
            return Err(AudioError::DuplicateProviderType(key.to_string()));
        }
        log::info!("Registered music provider '{}'", key);
        self.providers.insert(key, provider);
        Ok(())
    }

    /// Remove a provider, deselecting it first if it is selected
    pub fn unregister(&mut self, provider: &SharedProvider, music: &mut SlotMusicScheduler) -> AudioResult<()> {
        let key = provider.borrow().type_name();
        let registered = self
            .providers
            .get(key)
            .filter(|registered| same_provider(registered, provider))
            .ok_or_else(|| AudioError::ProviderNotFound(key.to_string()))?;
        let nice_name = registered.borrow().nice_name();

        if self.selected == Some(key) {
            self.deselect_current(music);
            music.reconcile();
        }
        self.providers.remove(key);
        log::info!("Unregistered music provider '{}'", nice_name);
        Ok(())
    }

    /// Select a provider by type key, or clear the selection with `None`
    ///
    /// The outgoing provider gets its `User` clip back and is disabled. An
    /// unknown key fails before anything changes. Selecting a provider does
    /// not reconcile: the provider hands over content when it is ready.
    pub fn select(&mut self, type_name: Option<&str>, music: &mut SlotMusicScheduler) -> AudioResult<()> {
        let incoming = match type_name {
            Some(name) => Some(
                self.providers
                    .get_key_value(name)
                    .map(|(key, provider)| (*key, Rc::clone(provider)))
                    .ok_or_else(|| AudioError::ProviderNotFound(name.to_string()))?,
            ),
            None => None,
        };

        self.deselect_current(music);

        match incoming {
            None => {
                music.reconcile();
            }
            Some((key, provider)) => {
                with_provider(&provider, |p| p.set_enabled(true));
                self.selected = Some(key);
                music.set_provider_attached(true);
                log::info!("Selected music provider '{}'", key);
            }
        }
        Ok(())
    }

    /// Release the selected provider's clip and disable it
    fn deselect_current(&mut self, music: &mut SlotMusicScheduler) {
        let Some(key) = self.selected.take() else {
            return;
        };
        music.set_provider_attached(false);
        self.ended_clip = None;

        let Some(provider) = self.providers.get(key) else {
            return;
        };
        let released = music.release_user_clip();
        with_provider(provider, |p| {
            if let Some(clip) = released {
                p.report_clip_released(clip);
            }
            p.set_enabled(false);
        });
        log::info!("Deselected music provider '{}'", key);
    }

    /// Type key of the selected provider
    pub fn current_selected_name(&self) -> Option<String> {
        self.selected.map(str::to_string)
    }

    /// The selected provider
    pub fn selected(&self) -> Option<SharedProvider> {
        self.selected.and_then(|key| self.providers.get(key)).cloned()
    }

    /// Whether a provider is selected
    pub fn has_selection(&self) -> bool {
        self.selected.is_some()
    }

    /// Whether a provider type is registered
    pub fn is_registered(&self, type_name: &str) -> bool {
        self.providers.contains_key(type_name)
    }

    /// Registered type keys in sorted order
    pub fn registered_names(&self) -> Vec<&'static str> {
        self.providers.keys().copied().collect()
    }

    /// Panels of every registered provider that offers one
    pub fn panels(&self) -> Vec<(&'static str, PanelDescriptor)> {
        self.providers
            .iter()
            .filter_map(|(key, provider)| with_provider(provider, |p| p.panel_descriptor()).flatten().map(|panel| (*key, panel)))
            .collect()
    }

    /// Forward the playback position to the selected provider
    pub fn report_time(&mut self, time: f32) {
        if let Some(provider) = self.selected() {
            with_provider(&provider, |p| p.report_time(time));
        }
    }

    /// Signal the selected provider once per finished clip
    ///
    /// `finished` is the `User` clip if it is parked on its last sample,
    /// `None` otherwise (which re-arms the signal).
    pub fn observe_track_end(&mut self, finished: Option<ClipHandle>) {
        let Some(clip) = finished else {
            self.ended_clip = None;
            return;
        };
        if self.ended_clip.as_ref().is_some_and(|ended| ended.same_clip(&clip)) {
            return;
        }
        self.ended_clip = Some(clip);
        if let Some(provider) = self.selected() {
            log::debug!("Track ended for provider '{}'", self.selected.unwrap_or_default());
            with_provider(&provider, |p| p.signal_track_ended());
        }
    }

    /// Tell every registered provider the audio output restarted
    pub fn broadcast_audio_restarted(&mut self) {
        for provider in self.providers.values() {
            with_provider(provider, |p| p.signal_audio_restarted());
        }
    }
}

impl ClipReleaser for ExternalMusicProviderRegistry {
    fn release_clip(&mut self, clip: ClipHandle) {
        match self.selected() {
            Some(provider) => {
                with_provider(&provider, |p| p.report_clip_released(clip));
            }
            None => log::trace!("Dropped {} clip '{}' with no provider selected", MusicSlot::User, clip.name()),
        }
    }
}

/// Run `f` against a provider, logging instead of panicking if its owner holds
/// a borrow right now
fn with_provider<R>(provider: &SharedProvider, f: impl FnOnce(&mut dyn ExternalMusicProvider) -> R) -> Option<R> {
    match provider.try_borrow_mut() {
        Ok(mut guard) => Some(f(&mut *guard)),
        Err(_) => {
            log::error!("Music provider is borrowed elsewhere; callback skipped");
            None
        }
    }
}

fn same_provider(a: &SharedProvider, b: &SharedProvider) -> bool {
    std::ptr::eq(Rc::as_ptr(a).cast::<()>(), Rc::as_ptr(b).cast::<()>())
}
