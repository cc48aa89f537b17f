use nalgebra as na;
use tiny_solver::factors::Factor;

use crate::camera_model::distort_normalized;

/// Pixel residual of one board corner.
///
/// Parameter blocks: `[fx, fy, cx, cy]`, `[k1, k2, p1, p2, k3]`, `rvec`, `tvec`.
#[derive(Debug, Clone)]
pub struct ReprojectionFactor {
    pub p3d: na::Point3<f64>,
    pub p2d: na::Vector2<f64>,
}

impl ReprojectionFactor {
    pub fn new(p3d: &glam::Vec3, p2d: &glam::Vec2) -> ReprojectionFactor {
        let p3d = na::Point3::new(p3d.x as f64, p3d.y as f64, p3d.z as f64);
        let p2d = na::Vector2::new(p2d.x as f64, p2d.y as f64);
        ReprojectionFactor { p3d, p2d }
    }
}

impl<T: na::RealField> Factor<T> for ReprojectionFactor {
    fn residual_func(&self, params: &[na::DVector<T>]) -> na::DVector<T> {
        let intrinsics = &params[0];
        let rvec = na::Vector3::new(
            params[2][0].clone(),
            params[2][1].clone(),
            params[2][2].clone(),
        );
        let tvec = na::Vector3::new(
            params[3][0].clone(),
            params[3][1].clone(),
            params[3][2].clone(),
        );
        let transform = na::Isometry3::new(tvec, rvec);
        let p3d_t = transform * self.p3d.cast::<T>();
        let x = p3d_t.x.clone() / p3d_t.z.clone();
        let y = p3d_t.y.clone() / p3d_t.z.clone();
        let (xd, yd) = distort_normalized(x, y, params[1].as_slice());
        let u = intrinsics[0].clone() * xd + intrinsics[2].clone();
        let v = intrinsics[1].clone() * yd + intrinsics[3].clone();

        na::dvector![
            u - na::convert::<f64, T>(self.p2d.x),
            v - na::convert::<f64, T>(self.p2d.y)
        ]
    }
}
