//! Element Archive & Revision Control
//!
//! The load/save boundary of a [`Scene`]. The core never touches files on its
//! own; it reads and writes through an [`ElementArchive`], and `save` asks a
//! [`RevisionControl`] implementation to open the target for edit first.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SceneError};
use crate::scene::node::SceneNode;
use crate::scene::Scene;

/// Reads and writes flat element lists.
pub trait ElementArchive {
    fn load_elements(&self, path: &Path) -> Result<Vec<SceneNode>>;
    fn save_elements(&self, elements: &[SceneNode], path: &Path) -> Result<()>;
}

/// Revision control hooks invoked before a scene is written.
pub trait RevisionControl {
    /// Whether `path` is under revision control.
    fn is_managed(&self, path: &Path) -> bool;
    /// Opens `path` for edit (or add).
    fn open(&self, path: &Path) -> Result<()>;
}

/// Revision control stand-in for unmanaged workspaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRevisionControl;

impl RevisionControl for NullRevisionControl {
    fn is_managed(&self, _path: &Path) -> bool {
        false
    }

    fn open(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

/// JSON document holding every element of a scene.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonArchive {
    pub pretty: bool,
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    version: u32,
    elements: &'a [SceneNode],
}

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    version: u32,
    elements: Vec<SceneNode>,
}

const ARCHIVE_VERSION: u32 = 1;

impl JsonArchive {
    #[must_use]
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    pub fn encode(&self, elements: &[SceneNode]) -> Result<String> {
        let doc = DocumentRef {
            version: ARCHIVE_VERSION,
            elements,
        };
        let text = if self.pretty {
            serde_json::to_string_pretty(&doc)?
        } else {
            serde_json::to_string(&doc)?
        };
        Ok(text)
    }

    pub fn decode(&self, text: &str) -> Result<Vec<SceneNode>> {
        let doc: Document = serde_json::from_str(text)?;
        if doc.version > ARCHIVE_VERSION {
            log::warn!(
                "Archive version {} is newer than supported version {ARCHIVE_VERSION}",
                doc.version
            );
        }
        Ok(doc.elements)
    }
}

impl ElementArchive for JsonArchive {
    fn load_elements(&self, path: &Path) -> Result<Vec<SceneNode>> {
        let text = fs::read_to_string(path)?;
        self.decode(&text)
    }

    fn save_elements(&self, elements: &[SceneNode], path: &Path) -> Result<()> {
        let text = self.encode(elements)?;
        fs::write(path, text)?;
        Ok(())
    }
}

impl Scene {
    /// Adds every element in `path` and runs [`update`](Self::update).
    pub fn load(&mut self, path: &Path, archive: &dyn ElementArchive) -> Result<()> {
        let elements = archive.load_elements(path)?;
        log::info!("Loaded {} element(s) from {}", elements.len(), path.display());
        self.add_elements(elements)
    }

    /// Adds already decoded elements and runs [`update`](Self::update).
    pub fn add_elements(&mut self, elements: Vec<SceneNode>) -> Result<()> {
        for element in elements {
            self.add(element);
        }
        self.update()
    }

    /// Writes every node to `path`, opening it through `rcs` first.
    pub fn save(
        &self,
        path: &Path,
        archive: &dyn ElementArchive,
        rcs: &dyn RevisionControl,
    ) -> Result<()> {
        if rcs.is_managed(path) {
            rcs.open(path).map_err(|err| match err {
                SceneError::RevisionControl { .. } => err,
                other => SceneError::RevisionControl {
                    path: path.to_path_buf(),
                    reason: other.to_string(),
                },
            })?;
        }
        let elements: Vec<SceneNode> = self.nodes().cloned().collect();
        archive.save_elements(&elements, path)?;
        log::info!("Saved {} element(s) to {}", elements.len(), path.display());
        Ok(())
    }
}
