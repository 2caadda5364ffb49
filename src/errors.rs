//! Error Types
//!
//! This module defines the error types used throughout the processor.
//!
//! # Overview
//!
//! The main error type [`SceneError`] covers the structural failures of the
//! scene graph and the I/O boundary of the archive collaborators:
//! - Hierarchy-dependent passes invoked while nodes are still staged
//! - Missing nodes referenced by an explicit request
//! - Archive (de)serialization and revision control failures
//!
//! Referential misses inside the graph itself (a skin pointing at a joint that
//! was never added, a parent that does not resolve) are *not* errors. Those
//! are logged and the entity is treated as a root or as unweighted.
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, SceneError>`.
//!
//! ```rust,ignore
//! use content_scene::errors::Result;
//!
//! fn prepare(scene: &mut Scene) -> Result<()> {
//!     scene.update()?;
//!     scene.optimize()
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

use crate::scene::Identifier;

/// The main error type for the content scene processor.
#[derive(Error, Debug)]
pub enum SceneError {
    // ========================================================================
    // Structural Errors
    // ========================================================================
    /// A hierarchy-dependent pass ran while added nodes were not yet committed.
    #[error("Scene has {staged} staged node(s); call commit() or update() first")]
    Uncommitted { staged: usize },

    /// The requested node does not exist in the scene.
    #[error("Node not found: {0}")]
    NodeNotFound(Identifier),

    /// Re-parenting would make a node its own ancestor.
    #[error("Parenting {child} under {parent} would create a cycle")]
    CycleDetected { child: Identifier, parent: Identifier },

    /// The root joint supplied for rigid skin fallback is not in the joint map.
    #[error("Root joint {0} is missing from the joint index map")]
    MissingRootJoint(Identifier),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A processor setting is outside its valid range.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    // ========================================================================
    // Archive & Revision Control Errors
    // ========================================================================
    /// Generic I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Element archive could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The revision control collaborator refused to open a file for edit.
    #[error("Revision control failed for {path:?}: {reason}")]
    RevisionControl { path: PathBuf, reason: String },
}

/// Alias for `Result<T, SceneError>`.
pub type Result<T> = std::result::Result<T, SceneError>;
