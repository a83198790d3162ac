use serde::{Deserialize, Serialize};

/// Symmetric perspective frustum. `fovy` and the screen-space-error
/// denominator are derived whenever `fov` or `aspect_ratio` change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FrustumParameters", into = "FrustumParameters")]
pub struct PerspectiveFrustum {
    fov: f64,
    aspect_ratio: f64,
    pub near: f64,
    pub far: f64,
    fovy: f64,
    sse_denominator: f64,
}

#[derive(Serialize, Deserialize)]
struct FrustumParameters {
    fov: f64,
    aspect_ratio: f64,
    near: f64,
    far: f64,
}
impl From<FrustumParameters> for PerspectiveFrustum {
    fn from(p: FrustumParameters) -> Self {
        PerspectiveFrustum::new(p.fov, p.aspect_ratio, p.near, p.far)
    }
}
impl From<PerspectiveFrustum> for FrustumParameters {
    fn from(f: PerspectiveFrustum) -> Self {
        FrustumParameters {
            fov: f.fov,
            aspect_ratio: f.aspect_ratio,
            near: f.near,
            far: f.far,
        }
    }
}

impl Default for PerspectiveFrustum {
    fn default() -> Self {
        Self::new(60.0f64.to_radians(), 1.0, 1.0, 500000000.0)
    }
}
impl PerspectiveFrustum {
    pub fn new(fov: f64, aspect_ratio: f64, near: f64, far: f64) -> Self {
        let mut frustum = Self {
            fov,
            aspect_ratio,
            near,
            far,
            fovy: -1.0,
            sse_denominator: -1.0,
        };
        frustum.update_self();
        return frustum;
    }
    pub fn fov(&self) -> f64 {
        self.fov
    }
    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }
    pub fn fovy(&self) -> f64 {
        self.fovy
    }
    pub fn sse_denominator(&self) -> f64 {
        self.sse_denominator
    }
    pub fn set_fov(&mut self, fov: f64) {
        self.fov = fov;
        self.update_self();
    }
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f64) {
        self.aspect_ratio = aspect_ratio;
        self.update_self();
    }
    fn update_self(&mut self) {
        self.fovy = if self.aspect_ratio <= 1.0 {
            self.fov
        } else {
            ((self.fov * 0.5).tan() / self.aspect_ratio).atan() * 2.0
        };
        self.sse_denominator = 2.0 * (0.5 * self.fovy).tan();
    }
}
