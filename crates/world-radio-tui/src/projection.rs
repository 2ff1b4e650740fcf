//! Orthographic globe camera.
//!
//! Coordinates handed out by `project` are on the unit disc: the camera
//! centre is (0, 0), the visible rim has radius 1, `y` grows northwards.
//! Callers scale by `zoom` and the pane size.

use world_radio_proto::geo::GeoPoint;

pub const MIN_ZOOM: f64 = 0.8;
pub const MAX_ZOOM: f64 = 8.0;
const MAX_TILT: f64 = 85.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Latitude of the point facing the viewer, degrees.
    pub lat: f64,
    /// Longitude of the point facing the viewer, degrees in -180..180.
    pub lon: f64,
    pub zoom: f64,
    /// Where `step` is flying to, if anywhere.
    target: Option<GeoPoint>,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            lat: 20.0,
            lon: 0.0,
            zoom: 1.0,
            target: None,
        }
    }
}

impl Camera {
    pub fn centre(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }

    /// Rotate by degrees. Cancels any flight in progress.
    pub fn rotate(&mut self, dlat: f64, dlon: f64) {
        self.target = None;
        self.lat = (self.lat + dlat).clamp(-MAX_TILT, MAX_TILT);
        self.lon = wrap_lon(self.lon + dlon);
    }

    pub fn zoom_by(&mut self, factor: f64) {
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Start flying towards `p`; `step` moves the camera there.
    pub fn fly_to(&mut self, p: GeoPoint) {
        self.target = Some(GeoPoint::new(p.lat.clamp(-MAX_TILT, MAX_TILT), wrap_lon(p.lon)));
    }

    pub fn is_flying(&self) -> bool {
        self.target.is_some()
    }

    /// Advance a flight by a fraction of the remaining arc. Returns `true`
    /// while the camera is still moving.
    pub fn step(&mut self) -> bool {
        let Some(t) = self.target else {
            return false;
        };
        let dlat = t.lat - self.lat;
        let dlon = wrap_lon(t.lon - self.lon);
        if dlat.abs() < 0.5 && dlon.abs() < 0.5 {
            self.lat = t.lat;
            self.lon = t.lon;
            self.target = None;
            return false;
        }
        self.lat += dlat * 0.3;
        self.lon = wrap_lon(self.lon + dlon * 0.3);
        true
    }

    /// Unit-disc position of `p`, or `None` when it is on the far side.
    pub fn project(&self, p: GeoPoint) -> Option<(f64, f64)> {
        let (phi, lambda) = (p.lat.to_radians(), p.lon.to_radians());
        let (phi0, lambda0) = (self.lat.to_radians(), self.lon.to_radians());
        let dl = lambda - lambda0;

        let cos_c = phi0.sin() * phi.sin() + phi0.cos() * phi.cos() * dl.cos();
        if cos_c < 0.0 {
            return None;
        }
        let x = phi.cos() * dl.sin();
        let y = phi0.cos() * phi.sin() - phi0.sin() * phi.cos() * dl.cos();
        Some((x, y))
    }

    /// Inverse of `project`. `None` outside the disc.
    pub fn unproject(&self, x: f64, y: f64) -> Option<GeoPoint> {
        let rho = (x * x + y * y).sqrt();
        if rho > 1.0 {
            return None;
        }
        if rho < 1e-12 {
            return Some(self.centre());
        }
        let (phi0, lambda0) = (self.lat.to_radians(), self.lon.to_radians());
        let c = rho.asin();
        let (sin_c, cos_c) = (c.sin(), c.cos());

        let phi = (cos_c * phi0.sin() + y * sin_c * phi0.cos() / rho).asin();
        let lambda = lambda0 + (x * sin_c).atan2(rho * cos_c * phi0.cos() - y * sin_c * phi0.sin());
        Some(GeoPoint::new(phi.to_degrees(), wrap_lon(lambda.to_degrees())))
    }
}

/// Normalise a longitude into -180..180.
pub fn wrap_lon(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 {
        180.0
    } else {
        wrapped
    }
}
