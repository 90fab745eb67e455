//! Face-mesh landmarks and the eye points the gaze estimator reads

use serde::{Deserialize, Serialize};

use crate::DmsError;

/// Normalized face-mesh point.
///
/// `x` and `y` are relative to frame width and height (0..1); `z` is the
/// model's relative depth and is not used for gaze.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// Mesh indices for one eye
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyeIndices {
    pub outer: usize,
    pub inner: usize,
    pub pupil: usize,
    pub bottom: usize,
    pub top: usize,
}

/// Mesh indices for both eyes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshIndices {
    pub left: EyeIndices,
    pub right: EyeIndices,
}

/// Eye landmark indices in the 478-point refined face mesh.
///
/// The eyelid references are crossed between the eyes: the right eye's
/// `bottom` is the left eye's `top` index (386) and vice versa (159).
/// The thresholds in [`crate::gaze::GazeThresholds`] assume this mapping.
pub const MESH_INDICES: MeshIndices = MeshIndices {
    left: EyeIndices {
        outer: 33,
        inner: 133,
        pupil: 468,
        bottom: 159,
        top: 386,
    },
    right: EyeIndices {
        outer: 362,
        inner: 263,
        pupil: 473,
        bottom: 386,
        top: 159,
    },
};

impl MeshIndices {
    /// Smallest mesh length that covers every index
    pub fn required_len(&self) -> usize {
        [self.left, self.right]
            .iter()
            .flat_map(|e| [e.outer, e.inner, e.pupil, e.bottom, e.top])
            .max()
            .map_or(0, |max| max + 1)
    }
}

/// The five points of one eye
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeLandmarks {
    pub outer: Landmark,
    pub inner: Landmark,
    pub pupil: Landmark,
    pub bottom: Landmark,
    pub top: Landmark,
}

impl EyeLandmarks {
    fn from_mesh(mesh: &[Landmark], indices: &EyeIndices) -> Result<Self, DmsError> {
        let at = |index: usize| {
            mesh.get(index)
                .copied()
                .ok_or(DmsError::LandmarkIndexOutOfRange {
                    index,
                    len: mesh.len(),
                })
        };
        Ok(Self {
            outer: at(indices.outer)?,
            inner: at(indices.inner)?,
            pupil: at(indices.pupil)?,
            bottom: at(indices.bottom)?,
            top: at(indices.top)?,
        })
    }
}

/// Named eye landmarks for one detected face
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceLandmarks {
    pub left: EyeLandmarks,
    pub right: EyeLandmarks,
}

impl FaceLandmarks {
    /// Pick the eye points out of a raw face mesh using [`MESH_INDICES`]
    pub fn from_mesh(mesh: &[Landmark]) -> Result<Self, DmsError> {
        Self::from_mesh_with(mesh, &MESH_INDICES)
    }

    /// Pick the eye points out of a raw face mesh using a custom index table
    pub fn from_mesh_with(mesh: &[Landmark], indices: &MeshIndices) -> Result<Self, DmsError> {
        Ok(Self {
            left: EyeLandmarks::from_mesh(mesh, &indices.left)?,
            right: EyeLandmarks::from_mesh(mesh, &indices.right)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_mesh(len: usize) -> Vec<Landmark> {
        (0..len)
            .map(|i| Landmark::new(i as f32 / 1000.0, i as f32 / 1000.0))
            .collect()
    }

    #[test]
    fn test_required_len_covers_iris_points() {
        assert_eq!(MESH_INDICES.required_len(), 474);
    }

    #[test]
    fn test_from_mesh_reads_named_points() {
        let mesh = numbered_mesh(478);
        let face = FaceLandmarks::from_mesh(&mesh).unwrap();

        assert_eq!(face.left.outer, mesh[33]);
        assert_eq!(face.left.inner, mesh[133]);
        assert_eq!(face.left.pupil, mesh[468]);
        assert_eq!(face.right.outer, mesh[362]);
        assert_eq!(face.right.inner, mesh[263]);
        assert_eq!(face.right.pupil, mesh[473]);
    }

    #[test]
    fn test_eyelids_are_crossed_between_eyes() {
        let mesh = numbered_mesh(478);
        let face = FaceLandmarks::from_mesh(&mesh).unwrap();

        assert_eq!(face.left.bottom, mesh[159]);
        assert_eq!(face.left.top, mesh[386]);
        assert_eq!(face.right.bottom, face.left.top);
        assert_eq!(face.right.top, face.left.bottom);
    }

    #[test]
    fn test_mesh_without_iris_is_rejected() {
        // 468-point mesh has no refined iris landmarks
        let mesh = numbered_mesh(468);
        let err = FaceLandmarks::from_mesh(&mesh).unwrap_err();
        assert!(matches!(
            err,
            DmsError::LandmarkIndexOutOfRange { index: 468, len: 468 }
        ));
    }
}
