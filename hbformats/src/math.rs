//! `glam` views of decoded geometry, for consumers that do math on it.

use crate::{BoundingSphere, Skeleton, Sprite, VertexAttributes};
use glam::{Vec2, Vec3, Vec4};

impl BoundingSphere {
    pub fn center_vec3(&self) -> Vec3 {
        Vec3::from_array(self.center)
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.center_vec3().distance_squared(point) <= self.radius * self.radius
    }
}

impl Skeleton {
    /// Rest position of each bone relative to its parent.
    pub fn rest_positions(&self) -> Vec<Vec3> {
        self.positions.iter().copied().map(Vec3::from_array).collect()
    }
}

impl VertexAttributes {
    pub fn position_vec3s(&self) -> Vec<Vec3> {
        self.positions.iter().copied().map(Vec3::from_array).collect()
    }

    pub fn normal_vec3s(&self) -> Vec<Vec3> {
        self.normals.iter().copied().map(Vec3::from_array).collect()
    }

    pub fn tangent_vec4s(&self) -> Vec<Vec4> {
        self.tangents.iter().copied().map(Vec4::from_array).collect()
    }

    pub fn texcoord_vec2s(&self, set: usize) -> Vec<Vec2> {
        self.texcoords
            .get(set)
            .map(|uvs| uvs.iter().copied().map(Vec2::from_array).collect())
            .unwrap_or_default()
    }

    /// Axis-aligned bounds of the positions, `None` when there are none.
    pub fn position_bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut points = self.positions.iter().copied().map(Vec3::from_array);
        let first = points.next()?;
        Some(points.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }
}

impl Sprite {
    /// Normalized texture rectangle as `(min, max)` corners.
    pub fn uv_rect(&self) -> (Vec2, Vec2) {
        let [x, y, w, h] = self.rect;
        (Vec2::new(x, y), Vec2::new(x + w, y + h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_cover_every_position() {
        let attributes = VertexAttributes {
            positions: vec![[1.0, -2.0, 0.0], [-1.0, 4.0, 3.0], [0.5, 0.0, -3.0]],
            ..VertexAttributes::default()
        };
        let (min, max) = attributes.position_bounds().unwrap();
        assert_eq!(min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(max, Vec3::new(1.0, 4.0, 3.0));
        assert!(VertexAttributes::default().position_bounds().is_none());
    }

    #[test]
    fn sphere_containment() {
        let sphere = BoundingSphere {
            center: [0.0, 1.0, 0.0],
            radius: 2.0,
        };
        assert!(sphere.contains_point(Vec3::new(0.0, 3.0, 0.0)));
        assert!(!sphere.contains_point(Vec3::new(0.0, 3.5, 0.0)));
    }

    #[test]
    fn missing_texcoord_set_is_empty() {
        let attributes = VertexAttributes::default();
        assert!(attributes.texcoord_vec2s(7).is_empty());
    }
}
