//! Pose Value Types
//!
//! Position and rotation as reported by clients. Coordinates are f64 because
//! browser clients send IEEE doubles and the relay echoes them verbatim.

use serde::{Deserialize, Serialize};

/// A 3D coordinate triple.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vec3 {
    /// Create from components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// An entity's placement: position plus Euler rotation.
///
/// Poses are client-reported and trusted verbatim. There is no plausibility
/// check and no movement-speed cap; the relay is not authoritative over
/// movement. This is a deliberate simplification carried over from the
/// original design, not an oversight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// World position.
    pub position: Vec3,
    /// Euler rotation (x, y, z).
    pub rotation: Vec3,
}

impl Pose {
    /// Create from position and rotation.
    pub const fn new(position: Vec3, rotation: Vec3) -> Self {
        Self { position, rotation }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_json_shape() {
        let pose = Pose::new(Vec3::new(1.5, 0.0, -2.25), Vec3::new(0.0, 3.14, 0.0));
        let json = serde_json::to_string(&pose).unwrap();

        assert!(json.contains("\"position\""));
        assert!(json.contains("\"rotation\""));

        let parsed: Pose = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, pose);
    }

    #[test]
    fn test_pose_accepts_arbitrary_coordinates() {
        // No validation by design: any finite coordinates are relayed as-is.
        let json = r#"{"position":{"x":1e9,"y":-1e9,"z":0.0},"rotation":{"x":0.0,"y":0.0,"z":0.0}}"#;
        let pose: Pose = serde_json::from_str(json).unwrap();
        assert_eq!(pose.position.x, 1e9);
    }
}
