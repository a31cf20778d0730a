use glam::{Mat4, Vec3, Vec4};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl AABB {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        AABB { min, max }
    }

    pub fn is_visible(&self, frustum_planes: &[Vec4; 6]) -> bool {
        let margin = Vec3::splat(2.0);
        let expanded_min = self.min - margin;
        let expanded_max = self.max + margin;

        for plane in frustum_planes {
            let p = Vec3::new(
                if plane.x > 0.0 {
                    expanded_max.x
                } else {
                    expanded_min.x
                },
                if plane.y > 0.0 {
                    expanded_max.y
                } else {
                    expanded_min.y
                },
                if plane.z > 0.0 {
                    expanded_max.z
                } else {
                    expanded_min.z
                },
            );
            if plane.truncate().dot(p) + plane.w < 0.0 {
                return false;
            }
        }
        true
    }
}

pub fn extract_frustum_planes(view_proj: &Mat4) -> [Vec4; 6] {
    let r0 = view_proj.row(0);
    let r1 = view_proj.row(1);
    let r2 = view_proj.row(2);
    let r3 = view_proj.row(3);

    let mut planes = [
        // Left
        r3 + r0,
        // Right
        r3 - r0,
        // Bottom
        r3 + r1,
        // Top
        r3 - r1,
        // Near (depth is [0, 1])
        r2,
        // Far
        r3 - r2,
    ];

    // Normalize planes so that distances are in world units
    for plane in &mut planes {
        let length = plane.truncate().length();
        if length > 0.0 {
            *plane /= length;
        }
    }

    planes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_behind_camera_is_culled() {
        let proj = Mat4::perspective_rh(70f32.to_radians(), 1.0, 0.1, 1000.0);
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y);
        let planes = extract_frustum_planes(&(proj * view));

        let ahead = AABB::new(Vec3::new(-8.0, -8.0, -64.0), Vec3::new(8.0, 8.0, -48.0));
        let behind = AABB::new(Vec3::new(-8.0, -8.0, 48.0), Vec3::new(8.0, 8.0, 64.0));
        assert!(ahead.is_visible(&planes));
        assert!(!behind.is_visible(&planes));
    }
}
