//! Country boundary polygons from a Natural Earth style GeoJSON collection.
//!
//! The set is loaded once at startup and shared read-only afterwards.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::directory::USER_AGENT;
use crate::protocol::is_http_url;

#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("boundary source {0:?} is neither an existing file nor an http(s) URL")]
    UnknownSource(String),
    #[error("fetching boundaries from {url}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("boundary request to {url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("reading {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing GeoJSON")]
    Parse(#[from] serde_json::Error),
    #[error("dataset contains no country polygons")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BBox {
    fn from_slice(v: &[f64]) -> Option<Self> {
        // [west, south, east, north], optionally with altitude bounds
        let (min_lon, min_lat, max_lon, max_lat) = match v.len() {
            4 => (v[0], v[1], v[2], v[3]),
            6 => (v[0], v[1], v[3], v[4]),
            _ => return None,
        };
        Some(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    fn around<'a>(points: impl Iterator<Item = &'a GeoPoint>) -> Option<Self> {
        let mut bbox: Option<Self> = None;
        for p in points {
            let b = bbox.get_or_insert(Self {
                min_lon: p.lon,
                min_lat: p.lat,
                max_lon: p.lon,
                max_lat: p.lat,
            });
            b.min_lon = b.min_lon.min(p.lon);
            b.min_lat = b.min_lat.min(p.lat);
            b.max_lon = b.max_lon.max(p.lon);
            b.max_lat = b.max_lat.max(p.lat);
        }
        bbox
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        p.lon >= self.min_lon && p.lon <= self.max_lon && p.lat >= self.min_lat && p.lat <= self.max_lat
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }
}

/// One polygon: the outer ring first, holes after.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub rings: Vec<Vec<GeoPoint>>,
}

impl Polygon {
    pub fn exterior(&self) -> &[GeoPoint] {
        self.rings.first().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        let Some((outer, holes)) = self.rings.split_first() else {
            return false;
        };
        ring_contains(outer, p) && !holes.iter().any(|h| ring_contains(h, p))
    }
}

/// Even-odd ray cast in plain lon/lat space.
fn ring_contains(ring: &[GeoPoint], p: GeoPoint) -> bool {
    let mut inside = false;
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (ring[i], ring[j]);
        if (a.lat > p.lat) != (b.lat > p.lat) {
            let cross = (b.lon - a.lon) * (p.lat - a.lat) / (b.lat - a.lat) + a.lon;
            if p.lon < cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[derive(Debug, Clone, PartialEq)]
pub struct Country {
    /// ISO 3166-1 alpha-2, `None` when the dataset has no usable code.
    pub code: Option<String>,
    pub name: String,
    pub polygons: Vec<Polygon>,
    pub bbox: BBox,
}

impl Country {
    pub fn is_selectable(&self) -> bool {
        self.code.is_some()
    }

    /// Where the camera looks when this country is selected.
    pub fn focus_point(&self) -> GeoPoint {
        self.bbox.center()
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        self.bbox.contains(p) && self.polygons.iter().any(|poly| poly.contains(p))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CountrySet {
    countries: Vec<Country>,
}

impl CountrySet {
    pub fn new(countries: Vec<Country>) -> Self {
        Self { countries }
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Country> {
        self.countries.iter()
    }

    pub fn selectable(&self) -> impl Iterator<Item = &Country> {
        self.countries.iter().filter(|c| c.is_selectable())
    }

    pub fn by_code(&self, code: &str) -> Option<&Country> {
        let code = code.trim();
        self.countries
            .iter()
            .find(|c| c.code.as_deref().is_some_and(|cc| cc.eq_ignore_ascii_case(code)))
    }

    /// Selectable countries whose name contains `query`, prefix matches
    /// first, each group alphabetical.
    pub fn search(&self, query: &str) -> Vec<&Country> {
        let q = query.trim().to_lowercase();
        let mut hits: Vec<(bool, &Country)> = self
            .selectable()
            .filter_map(|c| {
                let name = c.name.to_lowercase();
                name.contains(&q).then(|| (!name.starts_with(&q), c))
            })
            .collect();
        hits.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.name.cmp(&b.1.name)));
        hits.into_iter().map(|(_, c)| c).collect()
    }

    pub fn country_at(&self, p: GeoPoint) -> Option<&Country> {
        self.countries.iter().find(|c| c.contains(p))
    }
}

// ── GeoJSON ───────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Properties,
    #[serde(default)]
    bbox: Option<Vec<f64>>,
    #[serde(default)]
    geometry: Option<RawGeometry>,
}

#[derive(Deserialize, Default)]
struct Properties {
    #[serde(rename = "ADMIN", default)]
    admin: Option<String>,
    #[serde(rename = "NAME", default)]
    name: Option<String>,
    #[serde(rename = "ISO_A2", default)]
    iso_a2: Option<String>,
    #[serde(rename = "ISO_A2_EH", default)]
    iso_a2_eh: Option<String>,
}

#[derive(Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: serde_json::Value,
}

type RawRing = Vec<Vec<f64>>;

fn ring(raw: RawRing) -> Vec<GeoPoint> {
    raw.into_iter()
        .filter(|pos| pos.len() >= 2)
        .map(|pos| GeoPoint::new(pos[1], pos[0]))
        .collect()
}

fn polygon(raw: Vec<RawRing>) -> Polygon {
    Polygon {
        rings: raw.into_iter().map(ring).filter(|r| !r.is_empty()).collect(),
    }
}

impl RawGeometry {
    fn into_polygons(self) -> Result<Option<Vec<Polygon>>, serde_json::Error> {
        Ok(match self.kind.as_str() {
            "Polygon" => {
                let rings: Vec<RawRing> = serde_json::from_value(self.coordinates)?;
                Some(vec![polygon(rings)])
            }
            "MultiPolygon" => {
                let polys: Vec<Vec<RawRing>> = serde_json::from_value(self.coordinates)?;
                Some(polys.into_iter().map(polygon).collect())
            }
            _ => None,
        })
    }
}

fn iso_code(raw: Option<&str>) -> Option<String> {
    let code = raw?.trim();
    (code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()))
        .then(|| code.to_ascii_uppercase())
}

impl Properties {
    /// `ISO_A2`, or `ISO_A2_EH` where the former is the `-99` placeholder.
    fn code(&self) -> Option<String> {
        iso_code(self.iso_a2.as_deref()).or_else(|| iso_code(self.iso_a2_eh.as_deref()))
    }

    fn display_name(&self) -> Option<String> {
        self.admin
            .as_deref()
            .or(self.name.as_deref())
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }
}

/// Parses a FeatureCollection. Features without polygon geometry are skipped.
pub fn parse_countries(json: &str) -> Result<CountrySet, GeoError> {
    let collection: FeatureCollection = serde_json::from_str(json)?;
    let mut countries = Vec::with_capacity(collection.features.len());

    for feature in collection.features {
        let Some(geometry) = feature.geometry else {
            continue;
        };
        let kind = geometry.kind.clone();
        let Some(polygons) = geometry.into_polygons()? else {
            debug!("skipping {} feature", kind);
            continue;
        };
        let polygons: Vec<Polygon> = polygons.into_iter().filter(|p| !p.rings.is_empty()).collect();
        if polygons.is_empty() {
            continue;
        }

        let code = feature.properties.code();
        let name = feature
            .properties
            .display_name()
            .or_else(|| code.clone())
            .unwrap_or_else(|| "Unknown".to_string());
        let bbox = feature
            .bbox
            .as_deref()
            .and_then(BBox::from_slice)
            .or_else(|| BBox::around(polygons.iter().flat_map(|p| p.exterior().iter())));
        let Some(bbox) = bbox else {
            continue;
        };

        countries.push(Country {
            code,
            name,
            polygons,
            bbox,
        });
    }

    if countries.is_empty() {
        return Err(GeoError::Empty);
    }
    Ok(CountrySet::new(countries))
}

// ── Source ────────────────────────────────────────────────────────────────────

/// Loads the boundary set from a local file or a URL. Downloads are mirrored
/// to `cache_file` and read back from there when the network is unavailable.
pub struct GeoDataSource {
    source: String,
    cache_file: Option<PathBuf>,
}

impl GeoDataSource {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            cache_file: None,
        }
    }

    pub fn with_cache(mut self, cache_file: PathBuf) -> Self {
        self.cache_file = Some(cache_file);
        self
    }

    pub async fn load(&self) -> Result<CountrySet, GeoError> {
        let set = self.load_set().await?;
        info!(
            "loaded {} countries ({} selectable) from {}",
            set.len(),
            set.selectable().count(),
            self.source
        );
        Ok(set)
    }

    async fn load_set(&self) -> Result<CountrySet, GeoError> {
        let path = Path::new(&self.source);
        if path.is_file() {
            return parse_countries(&read_file(path).await?);
        }
        if !is_http_url(&self.source) {
            return Err(GeoError::UnknownSource(self.source.clone()));
        }

        // The cache is only overwritten with a body that parsed.
        let fresh = match download(&self.source).await {
            Ok(text) => parse_countries(&text).map(|set| (set, text)),
            Err(e) => Err(e),
        };
        match fresh {
            Ok((set, text)) => {
                if let Some(cache) = &self.cache_file {
                    if let Err(e) = write_cache(cache, &text).await {
                        warn!("could not cache boundaries at {}: {}", cache.display(), e);
                    }
                }
                Ok(set)
            }
            Err(e) => match &self.cache_file {
                Some(cache) if cache.is_file() => {
                    warn!("{}; using cached boundaries at {}", e, cache.display());
                    parse_countries(&read_file(cache).await?)
                }
                _ => Err(e),
            },
        }
    }
}

async fn read_file(path: &Path) -> Result<String, GeoError> {
    tokio::fs::read_to_string(path).await.map_err(|source| GeoError::Io {
        path: path.to_path_buf(),
        source,
    })
}

async fn write_cache(path: &Path, text: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, text).await
}

async fn download(url: &str) -> Result<String, GeoError> {
    let fetch_err = |source| GeoError::Fetch {
        url: url.to_string(),
        source,
    };
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(fetch_err)?;
    let resp = client.get(url).send().await.map_err(fetch_err)?;
    let status = resp.status();
    if !status.is_success() {
        return Err(GeoError::Status {
            url: url.to_string(),
            status,
        });
    }
    resp.text().await.map_err(fetch_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        {
          "type": "Feature",
          "properties": {"ADMIN": "Squareland", "ISO_A2": "SQ"},
          "bbox": [0.0, 0.0, 10.0, 10.0],
          "geometry": {"type": "Polygon", "coordinates": [
            [[0,0],[10,0],[10,10],[0,10],[0,0]],
            [[4,4],[6,4],[6,6],[4,6],[4,4]]
          ]}
        },
        {
          "type": "Feature",
          "properties": {"ADMIN": "France", "ISO_A2": "-99", "ISO_A2_EH": "FR"},
          "geometry": {"type": "MultiPolygon", "coordinates": [
            [[[-5,42],[8,42],[8,51],[-5,51],[-5,42]]],
            [[[8.5,41.3],[9.6,41.3],[9.6,43.1],[8.5,43.1],[8.5,41.3]]]
          ]}
        },
        {
          "type": "Feature",
          "properties": {"ADMIN": "Disputed", "ISO_A2": "-99", "ISO_A2_EH": "-99"},
          "geometry": {"type": "Polygon", "coordinates": [[[20,20],[21,20],[21,21],[20,20]]]}
        },
        {
          "type": "Feature",
          "properties": {"ADMIN": "Pin"},
          "geometry": {"type": "Point", "coordinates": [1, 1]}
        }
      ]
    }"#;

    #[test]
    fn parses_polygons_and_multipolygons() {
        let set = parse_countries(SAMPLE).unwrap();
        assert_eq!(set.len(), 3);
        let fr = set.by_code("fr").unwrap();
        assert_eq!(fr.name, "France");
        assert_eq!(fr.polygons.len(), 2);
        assert_eq!(set.by_code("SQ").unwrap().polygons[0].rings.len(), 2);
    }

    #[test]
    fn placeholder_code_falls_back_then_becomes_unselectable() {
        let set = parse_countries(SAMPLE).unwrap();
        assert_eq!(set.by_code("FR").unwrap().code.as_deref(), Some("FR"));
        let disputed = set.iter().find(|c| c.name == "Disputed").unwrap();
        assert!(!disputed.is_selectable());
        assert_eq!(set.selectable().count(), 2);
    }

    #[test]
    fn focus_point_is_bbox_midpoint() {
        let set = parse_countries(SAMPLE).unwrap();
        assert_eq!(set.by_code("SQ").unwrap().focus_point(), GeoPoint::new(5.0, 5.0));
        // computed from rings when the feature carries no bbox
        let fr = set.by_code("FR").unwrap();
        assert_eq!(fr.bbox.min_lon, -5.0);
        assert_eq!(fr.bbox.max_lon, 9.6);
        assert_eq!(fr.focus_point(), GeoPoint::new((41.3 + 51.0) / 2.0, (-5.0 + 9.6) / 2.0));
    }

    #[test]
    fn hit_test_respects_holes_and_parts() {
        let set = parse_countries(SAMPLE).unwrap();
        let at = |lat, lon| set.country_at(GeoPoint::new(lat, lon)).map(|c| c.name.clone());
        assert_eq!(at(2.0, 2.0).as_deref(), Some("Squareland"));
        assert_eq!(at(5.0, 5.0), None);
        assert_eq!(at(46.0, 2.0).as_deref(), Some("France"));
        assert_eq!(at(42.0, 9.0).as_deref(), Some("France"));
        assert_eq!(at(-30.0, 100.0), None);
    }

    #[test]
    fn search_prefers_prefix_matches() {
        let set = parse_countries(SAMPLE).unwrap();
        let names: Vec<_> = set.search("an").iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["France", "Squareland"]);
        let names: Vec<_> = set.search("SQU").iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Squareland"]);
        // unselectable countries never show up
        assert!(set.search("disp").is_empty());
    }

    #[test]
    fn empty_collection_is_an_error() {
        assert!(matches!(
            parse_countries(r#"{"type":"FeatureCollection","features":[]}"#),
            Err(GeoError::Empty)
        ));
        assert!(matches!(parse_countries("nope"), Err(GeoError::Parse(_))));
    }

    #[tokio::test]
    async fn loads_from_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("countries.geojson");
        std::fs::write(&path, SAMPLE).unwrap();
        let set = GeoDataSource::new(path.to_string_lossy()).load().await.unwrap();
        assert_eq!(set.selectable().count(), 2);
    }

    #[tokio::test]
    async fn rejects_unknown_source() {
        let err = GeoDataSource::new("/definitely/not/here.geojson")
            .load()
            .await
            .unwrap_err();
        assert!(matches!(err, GeoError::UnknownSource(_)));
    }
}
