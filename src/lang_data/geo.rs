use std::path::Path;

use egui::{Pos2, Rect, Vec2, pos2};
use serde::Deserialize;

use crate::error::Result;

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: serde_json::Value,
    geometry: Option<Geometry>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
    #[serde(other)]
    Unsupported,
}

/// A country outline; each ring is a closed list of (longitude, latitude).
#[derive(Clone, Debug, Default)]
pub struct Country {
    pub name: String,
    pub rings: Vec<Vec<(f64, f64)>>,
}

#[derive(Clone, Debug, Default)]
pub struct Basemap {
    pub countries: Vec<Country>,
}

impl Basemap {
    pub fn from_geojson_str(s: &str) -> Result<Self> {
        let fc: FeatureCollection = serde_json::from_str(s)?;
        let mut countries = Vec::with_capacity(fc.features.len());
        for f in fc.features {
            let name = f
                .properties
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let polygons = match f.geometry {
                Some(Geometry::Polygon { coordinates }) => vec![coordinates],
                Some(Geometry::MultiPolygon { coordinates }) => coordinates,
                Some(Geometry::Unsupported) | None => continue,
            };
            let rings = polygons
                .into_iter()
                .flatten()
                .map(|ring| {
                    ring.into_iter()
                        .filter(|p| p.len() >= 2)
                        .map(|p| (p[0], p[1]))
                        .collect::<Vec<_>>()
                })
                .filter(|ring| ring.len() >= 3)
                .collect::<Vec<_>>();
            countries.push(Country { name, rings });
        }
        Ok(Basemap { countries })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_geojson_str(&s)
    }

    pub fn ring_count(&self) -> usize {
        self.countries.iter().map(|c| c.rings.len()).sum()
    }
}

/// Natural Earth I pseudo-cylindrical projection into viewport-local pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NaturalEarth {
    pub scale: f64,
    pub translate: (f64, f64),
}

impl NaturalEarth {
    /// Fits the world to a viewport: scale `width / 7`, centred.
    pub fn for_viewport(size: Vec2) -> Self {
        Self {
            scale: size.x as f64 / 7.0,
            translate: (size.x as f64 / 2.0, size.y as f64 / 2.0),
        }
    }

    fn raw(lambda: f64, phi: f64) -> (f64, f64) {
        let phi2 = phi * phi;
        let phi4 = phi2 * phi2;
        (
            lambda * (0.8707 - 0.131979 * phi2 + phi4 * (-0.013791 + phi4 * (0.003971 * phi2 - 0.001529 * phi4))),
            phi * (1.007226 + phi2 * (0.015085 + phi4 * (-0.044475 + 0.028874 * phi2 - 0.005916 * phi4))),
        )
    }

    pub fn project(&self, longitude: f64, latitude: f64) -> Pos2 {
        let (x, y) = Self::raw(longitude.to_radians(), latitude.to_radians());
        pos2(
            (self.translate.0 + self.scale * x) as f32,
            (self.translate.1 - self.scale * y) as f32,
        )
    }

    /// Projected bounds of the whole sphere.
    pub fn world_extent(&self) -> Rect {
        let left = self.project(-180.0, 0.0);
        let right = self.project(180.0, 0.0);
        let top = self.project(0.0, 90.0);
        let bottom = self.project(0.0, -90.0);
        Rect::from_min_max(pos2(left.x, top.y), pos2(right.x, bottom.y))
    }
}
