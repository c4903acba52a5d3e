//! Decoded clips and name resolution
//!
//! A [`ClipHandle`] is a cheap, shared reference to decoded audio. The engine
//! never mutates clip content; it only holds and drops handles. Identity is
//! pointer identity, so two clips with the same name loaded twice are
//! different clips.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Namespace a clip name is resolved in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCategory {
    /// Try Sound, Voice, Music then Root, returning the first hit
    Any,
    /// Sound effects
    Sound,
    /// Dialogue and barks
    Voice,
    /// Music tracks
    Music,
    /// Top-level resources outside the named namespaces
    Root,
}

impl SoundCategory {
    /// Lookup order used for [`SoundCategory::Any`]
    pub const SEARCH_ORDER: [SoundCategory; 4] = [
        SoundCategory::Sound,
        SoundCategory::Voice,
        SoundCategory::Music,
        SoundCategory::Root,
    ];
}

impl fmt::Display for SoundCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SoundCategory::Any => "any",
            SoundCategory::Sound => "sound",
            SoundCategory::Voice => "voice",
            SoundCategory::Music => "music",
            SoundCategory::Root => "root",
        };
        f.write_str(name)
    }
}

/// Decoded, interleaved PCM audio
#[derive(Debug, Clone)]
pub struct AudioClip {
    name: String,
    sample_rate: u32,
    channels: u16,
    samples: Vec<f32>,
}

impl AudioClip {
    /// Create a clip from interleaved samples
    pub fn new(name: impl Into<String>, sample_rate: u32, channels: u16, samples: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            sample_rate: sample_rate.max(1),
            channels: channels.max(1),
            samples,
        }
    }

    /// Mono silence of the given length
    pub fn silence(name: impl Into<String>, sample_rate: u32, seconds: f32) -> Self {
        let frames = (sample_rate as f32 * seconds.max(0.0)).round() as usize;
        Self::new(name, sample_rate, 1, vec![0.0; frames])
    }

    /// Clip name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Frames per second
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Interleaved channel count
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Raw interleaved samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Length in frames (samples per channel)
    pub fn sample_count(&self) -> u32 {
        u32::try_from(self.samples.len() / usize::from(self.channels)).unwrap_or(u32::MAX)
    }

    /// Length in seconds
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(f64::from(self.sample_count()) / f64::from(self.sample_rate))
    }
}

/// Shared handle to a decoded clip
#[derive(Clone)]
pub struct ClipHandle(Rc<AudioClip>);

impl ClipHandle {
    /// Wrap a decoded clip
    pub fn new(clip: AudioClip) -> Self {
        Self(Rc::new(clip))
    }

    /// Whether both handles point at the same decoded clip
    pub fn same_clip(&self, other: &ClipHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The decoded clip
    pub fn clip(&self) -> &AudioClip {
        &self.0
    }

    /// Clip name
    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// Length in frames
    pub fn sample_count(&self) -> u32 {
        self.0.sample_count()
    }

    /// Length in seconds
    pub fn duration(&self) -> Duration {
        self.0.duration()
    }
}

impl PartialEq for ClipHandle {
    fn eq(&self, other: &Self) -> bool {
        self.same_clip(other)
    }
}

impl Eq for ClipHandle {}

impl fmt::Debug for ClipHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipHandle")
            .field("name", &self.name())
            .field("sample_count", &self.sample_count())
            .finish()
    }
}

impl From<AudioClip> for ClipHandle {
    fn from(clip: AudioClip) -> Self {
        Self::new(clip)
    }
}

/// Resolves logical names to decoded clips
pub trait ResourceProvider {
    /// Look a clip up by name within a category
    fn resolve(&self, name: &str, category: SoundCategory) -> Option<ClipHandle>;
}

/// In-memory clip store with one namespace per concrete category
#[derive(Debug, Default)]
pub struct ClipLibrary {
    namespaces: HashMap<SoundCategory, HashMap<String, ClipHandle>>,
}

impl ClipLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a clip under its own name, replacing any previous entry
    ///
    /// `SoundCategory::Any` is not a namespace; such clips land in `Root`.
    pub fn insert(&mut self, category: SoundCategory, clip: impl Into<ClipHandle>) -> ClipHandle {
        let handle = clip.into();
        let category = match category {
            SoundCategory::Any => SoundCategory::Root,
            other => other,
        };
        self.namespaces
            .entry(category)
            .or_default()
            .insert(handle.name().to_string(), handle.clone());
        handle
    }

    /// Remove a clip from one namespace
    pub fn remove(&mut self, category: SoundCategory, name: &str) -> Option<ClipHandle> {
        self.namespaces.get_mut(&category)?.remove(name)
    }

    /// Check whether a name resolves in the given category
    pub fn contains(&self, category: SoundCategory, name: &str) -> bool {
        self.resolve(name, category).is_some()
    }

    /// Number of clips across all namespaces
    pub fn len(&self) -> usize {
        self.namespaces.values().map(HashMap::len).sum()
    }

    /// Whether the library holds no clips
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, category: SoundCategory, name: &str) -> Option<ClipHandle> {
        self.namespaces.get(&category)?.get(name).cloned()
    }
}

impl ResourceProvider for ClipLibrary {
    fn resolve(&self, name: &str, category: SoundCategory) -> Option<ClipHandle> {
        match category {
            SoundCategory::Any => SoundCategory::SEARCH_ORDER
                .iter()
                .find_map(|&namespace| self.lookup(namespace, name)),
            concrete => self.lookup(concrete, name),
        }
    }
}
