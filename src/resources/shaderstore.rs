//! Shader prototype storage.
//!
//! Stores the shared shader prototypes keyed by string IDs. Overlays never
//! draw with a prototype directly: backends duplicate a prototype into a
//! private instance (see [`crate::render::pool::ShaderPool`]), and the store
//! itself is only ever read.
//!
//! # Manifest Format
//!
//! ```json
//! {
//!     "Radiation": { "fragment": "radiation.fs" },
//!     "SalvageBeam": { "vertex": "beam.vs", "fragment": "salvage_beam.fs" }
//! }
//! ```
//!
//! Paths are relative to the manifest file.

use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

pub const RADIATION: &str = "Radiation";
pub const RADIATION_DISTORTION: &str = "RadiationDistortion";
pub const SALVAGE_BEAM: &str = "SalvageBeam";

/// GLSL sources of a shader prototype. A missing vertex stage uses the
/// backend's default.
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderPrototype {
    pub vertex: Option<String>,
    pub fragment: String,
}

impl ShaderPrototype {
    pub fn fragment_only(fragment: impl Into<String>) -> Self {
        Self {
            vertex: None,
            fragment: fragment.into(),
        }
    }
}

#[derive(Deserialize)]
struct ManifestEntry {
    #[serde(default)]
    vertex: Option<PathBuf>,
    fragment: PathBuf,
}

/// Error raised while loading a shader manifest.
#[derive(Debug)]
pub enum ManifestError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestError::Io { path, source } => {
                write!(f, "Failed to read '{}': {}", path.display(), source)
            }
            ManifestError::Parse { path, source } => {
                write!(f, "Failed to parse shader manifest '{}': {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ManifestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ManifestError::Io { source, .. } => Some(source),
            ManifestError::Parse { source, .. } => Some(source),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ShaderStore {
    prototypes: FxHashMap<String, ShaderPrototype>,
}

impl ShaderStore {
    /// Creates a new empty shader store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding the prototypes the overlays need, compiled into the binary.
    pub fn builtin() -> Self {
        let mut store = Self::new();
        store.add(
            RADIATION,
            ShaderPrototype::fragment_only(include_str!("../../assets/shaders/radiation.fs")),
        );
        store.add(
            RADIATION_DISTORTION,
            ShaderPrototype::fragment_only(include_str!(
                "../../assets/shaders/radiation_distortion.fs"
            )),
        );
        store.add(
            SALVAGE_BEAM,
            ShaderPrototype::fragment_only(include_str!("../../assets/shaders/salvage_beam.fs")),
        );
        store
    }

    /// Loads every prototype listed in a JSON manifest.
    pub fn load_manifest(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let text = read(path)?;
        let entries: FxHashMap<String, ManifestEntry> =
            serde_json::from_str(&text).map_err(|source| ManifestError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let mut store = Self::new();
        for (name, entry) in entries {
            let vertex = match entry.vertex {
                Some(vs) => Some(read(&base.join(vs))?),
                None => None,
            };
            let fragment = read(&base.join(entry.fragment))?;
            store.add(&name, ShaderPrototype { vertex, fragment });
        }
        log::info!("Loaded {} shader prototype(s) from {}", store.len(), path.display());
        Ok(store)
    }

    /// Adds a prototype to the store with the given ID.
    ///
    /// If a prototype with the same ID already exists, it will be replaced.
    pub fn add(&mut self, id: &str, prototype: ShaderPrototype) {
        self.prototypes.insert(id.to_string(), prototype);
    }

    pub fn get(&self, id: &str) -> Option<&ShaderPrototype> {
        self.prototypes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.prototypes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.prototypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prototypes.is_empty()
    }
}

fn read(path: &Path) -> Result<String, ManifestError> {
    std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })
}
