//! Docking request model.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Search region handed to Vina: box center and edge lengths in Ångström.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DockingBox {
    pub center: Vec3,
    pub size: Vec3,
}

impl DockingBox {
    pub const DEFAULT_CENTER: f64 = 0.0;
    pub const DEFAULT_SIZE: f64 = 20.0;
}

impl Default for DockingBox {
    fn default() -> Self {
        Self {
            center: Vec3::new(Self::DEFAULT_CENTER, Self::DEFAULT_CENTER, Self::DEFAULT_CENTER),
            size: Vec3::new(Self::DEFAULT_SIZE, Self::DEFAULT_SIZE, Self::DEFAULT_SIZE),
        }
    }
}

/// An uploaded structure file. Content is passed through untouched.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DockingRequest {
    pub receptor: Upload,
    pub ligand: Upload,
    pub docking_box: DockingBox,
}
