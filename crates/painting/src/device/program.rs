//! Compiled programs and the variant naming scheme
//!
//! Shader variants are produced by an external build step: each variant is a
//! program compiled with one tag from every variation list defined. The engine
//! only looks programs up by their concatenated name.

use std::collections::HashMap;

use super::{AttributeSlot, UniformSlot};

/// Uniform names bound by the brush programs
pub mod uniforms {
    /// Sampled snapshot of the destination tile
    pub const DEST: &str = "dest";
    /// Footprint transform: unit quad → world
    pub const BRUSH: &str = "brush";
    /// Tile-local pixel space → clip space
    pub const PROJECTION: &str = "projection";
    pub const CHUNK_SIZE: &str = "chunkSize";
    /// World position of the tile's top-left pixel
    pub const CHUNK_OFFSET: &str = "chunkOffset";
    pub const COLOUR: &str = "colour";
    pub const BIAS: &str = "bias";
    pub const GAIN: &str = "gain";
    pub const BLEND_STRENGTH: &str = "blendStrength";

    pub const ALL: [&str; 9] = [
        DEST,
        BRUSH,
        PROJECTION,
        CHUNK_SIZE,
        CHUNK_OFFSET,
        COLOUR,
        BIAS,
        GAIN,
        BLEND_STRENGTH,
    ];
}

/// Device-side identity of a compiled program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub u32);

/// A compiled program variant.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub(crate) handle: ProgramHandle,
    pub(crate) name: String,
    pub(crate) uniforms: HashMap<String, UniformSlot>,
    pub(crate) attributes: HashMap<String, AttributeSlot>,
}

impl Program {
    pub fn new(handle: ProgramHandle, name: impl Into<String>) -> Self {
        Self {
            handle,
            name: name.into(),
            uniforms: HashMap::new(),
            attributes: HashMap::new(),
        }
    }

    /// Declare uniforms in slot order
    pub fn with_uniforms<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        for name in names {
            let slot = UniformSlot(self.uniforms.len() as u32);
            self.uniforms.entry(name.to_string()).or_insert(slot);
        }
        self
    }

    /// Declare vertex attributes in slot order
    pub fn with_attributes<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        for name in names {
            let slot = AttributeSlot(self.attributes.len() as u32);
            self.attributes.entry(name.to_string()).or_insert(slot);
        }
        self
    }

    #[inline]
    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Slot of a named uniform, if the program declares it
    pub fn uniform(&self, name: &str) -> Option<UniformSlot> {
        self.uniforms.get(name).copied()
    }

    pub fn attribute(&self, name: &str) -> Option<AttributeSlot> {
        self.attributes.get(name).copied()
    }
}

/// Lookup of compiled programs by variant name.
pub trait ProgramLibrary {
    fn get_program(&self, name: &str) -> Option<&Program>;
}

/// Map-backed program library.
#[derive(Debug, Default, Clone)]
pub struct ProgramCache {
    programs: HashMap<String, Program>,
}

impl ProgramCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a program, replacing any previous one of the same name
    pub fn insert(&mut self, program: Program) -> Option<Program> {
        self.programs.insert(program.name.clone(), program)
    }

    pub fn remove(&mut self, name: &str) -> Option<Program> {
        self.programs.remove(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Names of every cached program, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.programs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl ProgramLibrary for ProgramCache {
    fn get_program(&self, name: &str) -> Option<&Program> {
        self.programs.get(name)
    }
}

/// Source-level description of a program family, as handed to a device for compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramInfo {
    /// Base name; variant tags are appended to it
    pub name: String,
    pub uniforms: Vec<String>,
    pub attributes: Vec<String>,
    /// One list of tags per variation axis. An empty tag means "no define".
    pub variations: Vec<Vec<String>>,
}

impl ProgramInfo {
    /// Every variant as its list of tags, in cartesian order
    pub fn variants(&self) -> Vec<Vec<&str>> {
        let axes: Vec<Vec<&str>> = self
            .variations
            .iter()
            .map(|axis| axis.iter().map(String::as_str).collect())
            .collect();
        variant_list(&axes)
    }

    /// Full program name for one variant
    pub fn variant_name(&self, tags: &[&str]) -> String {
        let mut name = self.name.clone();
        for tag in tags {
            name.push_str(tag);
        }
        name
    }
}

/// Cartesian product of variation axes, last axis varying fastest.
///
/// No axes yields a single empty variant; any empty axis yields none.
pub fn variant_list<'a>(axes: &[Vec<&'a str>]) -> Vec<Vec<&'a str>> {
    let mut variants: Vec<Vec<&'a str>> = vec![Vec::new()];
    for axis in axes {
        variants = variants
            .iter()
            .flat_map(|prefix| {
                axis.iter().map(move |tag| {
                    let mut variant = prefix.clone();
                    variant.push(*tag);
                    variant
                })
            })
            .collect();
    }
    variants
}
