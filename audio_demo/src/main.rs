//! Radio demo application
//!
//! Runs a scripted half minute of game time through the audio orchestrator:
//! area ambience, a battle that overrides it, an in-game radio feeding the
//! user slot track after track, a cutscene on top, settings changes arriving
//! over the event bus and a scene unload.
//!
//! Usage: `radio_demo [settings.toml|settings.ron]`

use layered_audio::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

const FRAME_RATE: u32 = 60;
const DEMO_SECONDS: u32 = 30;
const SAMPLE_RATE: u32 = 8_000;

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),
    #[error("Settings error: {0}")]
    Config(#[from] layered_audio::config::ConfigError),
}

/// In-game radio cycling through a fixed playlist
struct Radio {
    playlist: Vec<ClipHandle>,
    next_track: usize,
    enabled: bool,
    wants_track: bool,
    returned: usize,
}

impl Radio {
    fn new(playlist: Vec<ClipHandle>) -> Self {
        Self {
            playlist,
            next_track: 0,
            enabled: false,
            wants_track: false,
            returned: 0,
        }
    }

    /// Next clip to hand over, if the radio asked for one
    fn take_request(&mut self) -> Option<ClipHandle> {
        if !self.wants_track || self.playlist.is_empty() {
            return None;
        }
        self.wants_track = false;
        let clip = self.playlist[self.next_track % self.playlist.len()].clone();
        self.next_track += 1;
        Some(clip)
    }
}

impl ExternalMusicProvider for Radio {
    fn type_name(&self) -> &'static str {
        "radio"
    }

    fn nice_name(&self) -> String {
        "Wasteland FM".to_string()
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.wants_track = enabled;
    }

    fn report_time(&mut self, time: f32) {
        log::trace!("Radio at {:.2}s", time);
    }

    fn signal_track_ended(&mut self) {
        log::info!("Radio track finished, queueing the next one");
        self.wants_track = true;
    }

    fn report_clip_released(&mut self, clip: ClipHandle) {
        log::info!("Radio got '{}' back", clip.name());
        self.returned += 1;
    }

    fn signal_audio_restarted(&mut self) {
        log::info!("Radio notified of audio restart");
    }

    fn panel_descriptor(&self) -> Option<PanelDescriptor> {
        Some(PanelDescriptor {
            title: self.nice_name(),
            controls: vec!["skip".to_string()],
        })
    }
}

fn tone(name: &str, seconds: f32) -> AudioClip {
    AudioClip::silence(name, SAMPLE_RATE, seconds)
}

fn load_settings() -> Result<AudioSettings, DemoError> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(AudioSettings::default());
    };
    let settings = AudioSettings::load_from_file(&path)?;
    settings.validate()?;
    log::info!("Loaded audio settings from {}", path);
    Ok(settings)
}

fn build_library() -> ClipLibrary {
    let mut library = ClipLibrary::new();
    library.insert(SoundCategory::Music, tone("town", 12.0));
    library.insert(SoundCategory::Music, tone("battle", 8.0));
    library.insert(SoundCategory::Music, tone("cutscene", 4.0));
    library.insert(SoundCategory::Sound, tone("menu_click", 0.1));
    library.insert(SoundCategory::Sound, tone("sword_hit", 0.4));
    library.insert(SoundCategory::Voice, tone("shopkeeper", 2.5));
    library
}

/// Scripted actions keyed by whole seconds of game time
fn run_script(audio: &mut AudioOrchestrator, settings: &SharedSettings, second: u32) -> Result<(), DemoError> {
    let events = audio.events().clone();
    match second {
        0 => {
            audio.set_music("town", MusicSlot::Ambient, 0.7, true, true)?;
            audio.start_music(MusicSlot::Ambient, true);
            audio.play_sound("shopkeeper", SoundCategory::Any, false);
        }
        3 => {
            audio.set_music("battle", MusicSlot::Event, 1.0, true, false)?;
            audio.start_music(MusicSlot::Event, true);
            audio.play_sound_positional("sword_hit", SoundCategory::Sound, false, Vec3::new(2.0, 0.0, 1.0));
        }
        6 => audio.stop_music(MusicSlot::Event),
        8 => {
            audio.play_ui_sound("menu_click");
            audio.select_provider(Some("radio"))?;
        }
        15 => {
            audio.set_game_paused(true);
            audio.set_music("cutscene", MusicSlot::Cinematic, 1.0, false, false)?;
            audio.start_music(MusicSlot::Cinematic, true);
        }
        19 => {
            audio.clear_music(MusicSlot::Cinematic);
            audio.set_game_paused(false);
        }
        20 => {
            settings.set_music_volume(0.4);
            events.send(AudioEvent::ConfigChanged);
        }
        22 => events.send(AudioEvent::MusicDisabled),
        24 => events.send(AudioEvent::MusicEnabled),
        26 => events.post(0.5, AudioEvent::SceneUnloaded),
        28 => audio.select_provider(None)?,
        _ => {}
    }
    Ok(())
}

fn run() -> Result<(), DemoError> {
    let settings = load_settings()?;
    let shared_settings = SharedSettings::new(settings.clone());

    let backend_config = AudioBackendConfig {
        max_channels: settings.max_channels,
        ..AudioBackendConfig::default()
    };
    let services = AudioServices {
        backend: create_backend(&backend_config)?,
        resources: Rc::new(build_library()),
        config: Rc::new(shared_settings.clone()),
        events: EventBus::new(),
    };
    let mut audio = AudioOrchestrator::new(services, &settings)?;

    let radio = Rc::new(RefCell::new(Radio::new(vec![
        ClipHandle::new(tone("radio_song_a", 3.0)),
        ClipHandle::new(tone("radio_song_b", 2.0)),
    ])));
    let shared_radio: SharedProvider = radio.clone();
    audio.register_provider(Rc::clone(&shared_radio))?;
    for (key, panel) in audio.provider_panels() {
        log::info!("Provider '{}' offers panel '{}' {:?}", key, panel.title, panel.controls);
    }

    let delta_time = 1.0 / FRAME_RATE as f32;
    let mut last_slot = None;
    for frame in 0..DEMO_SECONDS * FRAME_RATE {
        if frame % FRAME_RATE == 0 {
            run_script(&mut audio, &shared_settings, frame / FRAME_RATE)?;
        }

        // Provider callbacks only flag requests; content is handed over here
        let request = radio.borrow_mut().take_request();
        if let Some(clip) = request {
            log::info!("Radio now playing '{}'", clip.name());
            audio.set_music_clip(clip, MusicSlot::User);
            audio.set_music_looping(false, MusicSlot::User);
        }

        audio.tick(delta_time);

        let slot = audio.current_slot();
        if slot != last_slot {
            log::info!(
                "[{:>5.2}s] music slot {:?} ({})",
                frame as f32 * delta_time,
                slot,
                slot.and_then(|s| audio.get_music_name(s)).unwrap_or_else(|| "-".to_string())
            );
            last_slot = slot;
        }

        #[cfg(feature = "rodio")]
        std::thread::sleep(std::time::Duration::from_secs_f32(delta_time));
    }

    audio.unregister_provider(&shared_radio)?;
    log::info!(
        "Demo finished: {} sound(s) alive, radio got {} clip(s) back",
        audio.active_sound_count(),
        radio.borrow().returned
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Starting radio demo");

    match run() {
        Ok(()) => {
            log::info!("Radio demo completed successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Radio demo failed: {}", e);
            Err(e.into())
        }
    }
}
