//! Shared fixtures for the audio tests

use crate::audio::backend::simulated::SimulatedBackend;
use crate::audio::backend::SharedBackend;
use crate::audio::clip::{AudioClip, ClipHandle};
use crate::audio::music::ClipReleaser;
use crate::audio::provider::{ExternalMusicProvider, PanelDescriptor, SharedProvider};
use std::cell::RefCell;
use std::rc::Rc;

/// Sample rate of test clips; low so positions stay exact
pub const TEST_SAMPLE_RATE: u32 = 1_000;

pub fn simulated_backend(max_channels: usize) -> (Rc<RefCell<SimulatedBackend>>, SharedBackend) {
    let sim = Rc::new(RefCell::new(SimulatedBackend::with_max_channels(max_channels)));
    let backend: SharedBackend = sim.clone();
    (sim, backend)
}

pub fn clip(name: &str, seconds: f32) -> ClipHandle {
    ClipHandle::new(AudioClip::silence(name, TEST_SAMPLE_RATE, seconds))
}

impl ClipReleaser for Vec<ClipHandle> {
    fn release_clip(&mut self, clip: ClipHandle) {
        self.push(clip);
    }
}

/// Provider that records every callback it receives
#[derive(Debug, Default)]
pub struct RecordingProvider {
    pub type_name: &'static str,
    pub enabled: bool,
    pub times: Vec<f32>,
    pub tracks_ended: u32,
    pub released: Vec<ClipHandle>,
    pub restarts: u32,
}

impl RecordingProvider {
    pub fn shared(type_name: &'static str) -> (Rc<RefCell<RecordingProvider>>, SharedProvider) {
        let provider = Rc::new(RefCell::new(RecordingProvider { type_name, ..Default::default() }));
        let shared: SharedProvider = provider.clone();
        (provider, shared)
    }
}

impl ExternalMusicProvider for RecordingProvider {
    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn report_time(&mut self, time: f32) {
        self.times.push(time);
    }

    fn signal_track_ended(&mut self) {
        self.tracks_ended += 1;
    }

    fn report_clip_released(&mut self, clip: ClipHandle) {
        self.released.push(clip);
    }

    fn signal_audio_restarted(&mut self) {
        self.restarts += 1;
    }

    fn panel_descriptor(&self) -> Option<PanelDescriptor> {
        Some(PanelDescriptor {
            title: format!("{} controls", self.type_name),
            controls: vec!["next".to_string(), "previous".to_string()],
        })
    }
}
