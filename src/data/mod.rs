use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use geojson::{GeoJson, Geometry, Value};
use surface_tiles::render::raster::fill_circle;
use surface_tiles::render::Texture;
use surface_tiles::{
    Color, LatLon, PathType, Sector, ShapeAttributes, SharedObject, SurfaceIcons, SurfaceImage, SurfaceShape,
};

/// Ground size of point markers, meters.
const MARKER_SIZE: f64 = 250_000.0;

/// Fill colors cycled across loaded polygons.
const PALETTE: [Color; 6] = [
    Color::rgb(86, 180, 233),
    Color::rgb(230, 159, 0),
    Color::rgb(0, 158, 115),
    Color::rgb(204, 121, 167),
    Color::rgb(240, 228, 66),
    Color::rgb(213, 94, 0),
];

fn fill_attributes(color: Color) -> ShapeAttributes {
    ShapeAttributes {
        interior_color: color,
        outline_color: color,
        interior_opacity: 0.3,
        ..ShapeAttributes::default()
    }
}

fn line_attributes(color: Color) -> ShapeAttributes {
    ShapeAttributes {
        draw_interior: false,
        outline_color: color,
        ..ShapeAttributes::default()
    }
}

/// Round marker used for point features.
fn marker_icon(color: Color) -> Texture {
    let mut icon = Texture::new(16, 16);
    fill_circle(&mut icon, 8, 8, 7, color);
    icon
}

fn to_locations(coords: &[Vec<f64>]) -> Vec<LatLon> {
    coords.iter().filter(|c| c.len() >= 2).map(|c| LatLon::new(c[1], c[0])).collect()
}

/// Collects scene objects from GeoJSON geometries.
#[derive(Default)]
struct SceneBuilder {
    objects: Vec<SharedObject>,
    points: Vec<LatLon>,
}

impl SceneBuilder {
    fn add_polygon(&mut self, ring: Vec<LatLon>, name: Option<&str>) -> Result<()> {
        if ring.len() < 3 {
            return Ok(());
        }
        let color = PALETTE[self.objects.len() % PALETTE.len()];
        let mut shape = SurfaceShape::polygon(ring).with_attributes(fill_attributes(color))?;
        if let Some(name) = name {
            shape = shape.with_name(name);
        }
        self.objects.push(Arc::new(shape));
        Ok(())
    }

    fn add_line(&mut self, line: Vec<LatLon>, name: Option<&str>) -> Result<()> {
        if line.len() < 2 {
            return Ok(());
        }
        let mut shape = SurfaceShape::polyline(line, false).with_attributes(line_attributes(Color::WHITE))?;
        if let Some(name) = name {
            shape = shape.with_name(name);
        }
        self.objects.push(Arc::new(shape));
        Ok(())
    }

    fn add_geometry(&mut self, geometry: &Geometry, name: Option<&str>) -> Result<()> {
        match &geometry.value {
            Value::Point(coords) => self.points.extend(to_locations(std::slice::from_ref(coords))),
            Value::MultiPoint(coords) => self.points.extend(to_locations(coords)),
            Value::LineString(coords) => self.add_line(to_locations(coords), name)?,
            Value::MultiLineString(lines) => {
                for coords in lines {
                    self.add_line(to_locations(coords), name)?;
                }
            }
            Value::Polygon(rings) => {
                if let Some(exterior) = rings.first() {
                    self.add_polygon(to_locations(exterior), name)?;
                }
            }
            Value::MultiPolygon(polygons) => {
                for rings in polygons {
                    if let Some(exterior) = rings.first() {
                        self.add_polygon(to_locations(exterior), name)?;
                    }
                }
            }
            Value::GeometryCollection(geometries) => {
                for g in geometries {
                    self.add_geometry(g, name)?;
                }
            }
        }
        Ok(())
    }

    fn add_geojson(&mut self, geojson: &GeoJson) -> Result<()> {
        match geojson {
            GeoJson::FeatureCollection(fc) => {
                for feature in &fc.features {
                    let name = feature
                        .properties
                        .as_ref()
                        .and_then(|p| p.get("name"))
                        .and_then(|v| v.as_str());
                    if let Some(ref geometry) = feature.geometry {
                        self.add_geometry(geometry, name)?;
                    }
                }
            }
            GeoJson::Feature(f) => {
                let name = f.properties.as_ref().and_then(|p| p.get("name")).and_then(|v| v.as_str());
                if let Some(ref geometry) = f.geometry {
                    self.add_geometry(geometry, name)?;
                }
            }
            GeoJson::Geometry(geometry) => self.add_geometry(geometry, None)?,
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<SharedObject>> {
        if !self.points.is_empty() {
            let icons = SurfaceIcons::new(marker_icon(Color::YELLOW), self.points)
                .with_size(MARKER_SIZE)?
                .with_name("points");
            self.objects.push(Arc::new(icons));
        }
        Ok(self.objects)
    }
}

/// Parse one GeoJSON document into surface objects: polygons filled, line
/// strings outlined, points stamped as markers.
pub fn parse_geojson(content: &str) -> Result<Vec<SharedObject>> {
    let geojson: GeoJson = content.parse()?;
    let mut builder = SceneBuilder::default();
    builder.add_geojson(&geojson)?;
    builder.finish()
}

/// Load every `.json`/`.geojson` file in `data_dir`, in name order. Files
/// that fail to load are skipped.
pub fn load_all_geojson(data_dir: &Path) -> Result<Vec<SharedObject>> {
    let mut paths: Vec<_> = fs::read_dir(data_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == "json" || ext == "geojson")
        })
        .collect();
    paths.sort();

    let mut objects = Vec::new();
    for path in paths {
        match fs::read_to_string(&path).map_err(anyhow::Error::from).and_then(|c| parse_geojson(&c)) {
            Ok(loaded) => objects.extend(loaded),
            Err(e) => log::warn!("failed to load {}: {}", path.display(), e),
        }
    }
    Ok(objects)
}

/// Meridians and parallels every 30 degrees, drawn under everything else so
/// the globe is visible where there is no data.
pub fn graticule() -> Result<Vec<SharedObject>> {
    let color = Color::rgb(70, 70, 90);
    let mut lines: Vec<SharedObject> = Vec::new();
    for lon in (-180..180).step_by(30) {
        let meridian = (-80..=80).step_by(10).map(|lat| LatLon::new(lat as f64, lon as f64)).collect();
        let shape = SurfaceShape::polyline(meridian, false)
            .with_path_type(PathType::Linear)
            .with_attributes(line_attributes(color))?;
        lines.push(Arc::new(shape));
    }
    for lat in (-60..=60).step_by(30) {
        let parallel = (-180..=180).step_by(10).map(|lon| LatLon::new(lat as f64, lon as f64)).collect();
        let shape = SurfaceShape::polyline(parallel, false)
            .with_path_type(PathType::Linear)
            .with_attributes(line_attributes(color))?;
        lines.push(Arc::new(shape));
    }
    Ok(lines)
}

fn ring(points: &[(f64, f64)]) -> Vec<LatLon> {
    points.iter().map(|&(lon, lat)| LatLon::new(lat, lon)).collect()
}

/// Generate a sample scene for when no data file is available: rough
/// continents, a polygon straddling the date line, a ring around the south
/// pole, an ellipse, a translucent image and city markers.
pub fn generate_sample_scene() -> Result<Vec<SharedObject>> {
    let continents: [(&str, &[(f64, f64)]); 6] = [
        (
            "North America",
            &[
                (-168.0, 65.0), (-166.0, 60.0), (-141.0, 60.0), (-130.0, 55.0),
                (-125.0, 48.0), (-124.0, 40.0), (-117.0, 32.0), (-110.0, 25.0),
                (-97.0, 25.0), (-97.0, 28.0), (-82.0, 24.0), (-80.0, 25.0),
                (-81.0, 31.0), (-75.0, 35.0), (-70.0, 41.0), (-67.0, 45.0),
                (-65.0, 47.0), (-55.0, 47.0), (-52.0, 47.0), (-55.0, 52.0),
                (-58.0, 55.0), (-64.0, 60.0), (-73.0, 62.0), (-80.0, 63.0),
                (-95.0, 62.0), (-110.0, 68.0), (-130.0, 70.0), (-145.0, 70.0),
            ],
        ),
        (
            "South America",
            &[
                (-80.0, 10.0), (-75.0, 5.0), (-70.0, 5.0), (-60.0, 5.0),
                (-50.0, 0.0), (-35.0, -5.0), (-35.0, -10.0), (-38.0, -15.0),
                (-40.0, -22.0), (-48.0, -25.0), (-55.0, -34.0), (-58.0, -38.0),
                (-65.0, -42.0), (-68.0, -50.0), (-75.0, -52.0), (-75.0, -45.0),
                (-72.0, -40.0), (-72.0, -30.0), (-70.0, -20.0), (-70.0, -15.0),
                (-80.0, -5.0), (-80.0, 0.0),
            ],
        ),
        (
            "Europe",
            &[
                (-10.0, 36.0), (-5.0, 36.0), (0.0, 38.0), (5.0, 43.0),
                (10.0, 44.0), (15.0, 45.0), (20.0, 40.0), (25.0, 37.0),
                (30.0, 40.0), (35.0, 42.0), (40.0, 43.0), (40.0, 55.0),
                (30.0, 60.0), (25.0, 65.0), (20.0, 70.0), (10.0, 71.0),
                (5.0, 62.0), (5.0, 58.0), (-5.0, 58.0), (-10.0, 52.0),
                (-5.0, 48.0), (-5.0, 43.0),
            ],
        ),
        (
            "Africa",
            &[
                (-17.0, 15.0), (-17.0, 20.0), (-15.0, 28.0), (-5.0, 35.0),
                (10.0, 37.0), (20.0, 33.0), (25.0, 32.0), (35.0, 30.0),
                (35.0, 20.0), (42.0, 12.0), (50.0, 12.0), (45.0, 5.0),
                (35.0, -5.0), (35.0, -20.0), (35.0, -25.0), (30.0, -30.0),
                (20.0, -35.0), (18.0, -35.0), (15.0, -30.0), (10.0, -15.0),
                (10.0, 0.0), (5.0, 5.0), (-5.0, 5.0), (-10.0, 10.0),
            ],
        ),
        (
            "Asia",
            &[
                (35.0, 42.0), (40.0, 43.0), (50.0, 40.0), (55.0, 37.0),
                (60.0, 25.0), (65.0, 25.0), (70.0, 20.0), (75.0, 15.0),
                (80.0, 8.0), (80.0, 15.0), (88.0, 22.0), (92.0, 22.0),
                (95.0, 16.0), (100.0, 14.0), (105.0, 10.0), (110.0, 20.0),
                (115.0, 22.0), (120.0, 22.0), (122.0, 25.0), (125.0, 30.0),
                (130.0, 35.0), (135.0, 35.0), (140.0, 40.0), (145.0, 45.0),
                (145.0, 50.0), (140.0, 55.0), (135.0, 55.0), (130.0, 52.0),
                (130.0, 43.0), (120.0, 40.0), (110.0, 45.0), (90.0, 50.0),
                (70.0, 55.0), (60.0, 55.0), (50.0, 50.0),
            ],
        ),
        (
            "Australia",
            &[
                (115.0, -20.0), (120.0, -18.0), (130.0, -12.0), (140.0, -12.0),
                (145.0, -15.0), (150.0, -25.0), (153.0, -30.0), (150.0, -35.0),
                (145.0, -38.0), (140.0, -38.0), (135.0, -35.0), (130.0, -32.0),
                (125.0, -32.0), (115.0, -35.0), (115.0, -25.0),
            ],
        ),
    ];

    let mut objects: Vec<SharedObject> = Vec::new();
    for (idx, (name, outline)) in continents.iter().enumerate() {
        let shape = SurfaceShape::polygon(ring(outline))
            .with_path_type(PathType::Linear)
            .with_attributes(fill_attributes(PALETTE[idx % PALETTE.len()]))?
            .with_name(*name);
        objects.push(Arc::new(shape));
    }

    let fiji = SurfaceShape::polygon(ring(&[(170.0, -25.0), (-170.0, -25.0), (-170.0, -10.0), (170.0, -10.0)]))
        .with_attributes(fill_attributes(Color::RED))?
        .with_name("Date line box");
    objects.push(Arc::new(fiji));

    let southern_ring: Vec<(f64, f64)> = (-180..180).step_by(20).map(|lon| (lon as f64, -65.0)).collect();
    let antarctic = SurfaceShape::polygon(ring(&southern_ring))
        .with_path_type(PathType::RhumbLine)
        .with_attributes(fill_attributes(Color::WHITE))?
        .with_name("Antarctic ring");
    objects.push(Arc::new(antarctic));

    let ellipse = SurfaceShape::ellipse(LatLon::new(20.0, -150.0), 1_500_000.0, 800_000.0, 30.0)?
        .with_attributes(fill_attributes(Color::CYAN))?
        .with_name("Pacific ellipse");
    objects.push(Arc::new(ellipse));

    let mut checker = Texture::new(8, 8);
    for y in 0..8 {
        for x in 0..8 {
            let color = if (x + y) % 2 == 0 { Color::GREEN } else { Color::TRANSPARENT };
            checker.set_pixel(x, y, color);
        }
    }
    let image = SurfaceImage::new(Sector::new(60.0, 80.0, -60.0, -20.0), checker)
        .with_opacity(0.6)?
        .with_name("Greenland image");
    objects.push(Arc::new(image));

    let cities = [
        (-74.0, 40.7), (-0.1, 51.5), (2.3, 48.9), (139.7, 35.7), (151.2, -33.9),
        (-43.2, -22.9), (37.6, 55.8), (116.4, 39.9), (77.2, 28.6), (-118.2, 34.0),
        (-77.0, 38.9), (-99.1, 19.4), (-58.4, -34.6),
    ];
    let icons = SurfaceIcons::new(marker_icon(Color::YELLOW), ring(&cities))
        .with_size(MARKER_SIZE)?
        .with_name("Cities");
    objects.push(Arc::new(icons));

    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use surface_tiles::SurfaceObject;

    #[test]
    fn test_parse_feature_collection() {
        let content = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"name": "box"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "LineString", "coordinates": [[0,0],[5,5]]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Point", "coordinates": [1,2]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "MultiPoint", "coordinates": [[3,4],[5,6]]}}
            ]
        }"#;
        let objects = parse_geojson(content).expect("valid geojson");
        // Polygon, line string, then one marker set for all points.
        assert_eq!(objects.len(), 3);
        assert_eq!(objects[0].display_name().as_deref(), Some("box"));
        assert_eq!(objects[2].display_name().as_deref(), Some("points"));
    }

    #[test]
    fn test_degenerate_geometries_skipped() {
        let content = r#"{"type": "LineString", "coordinates": [[0,0]]}"#;
        assert!(parse_geojson(content).expect("valid geojson").is_empty());
        assert!(parse_geojson("not json").is_err());
    }

    #[test]
    fn test_sample_scene_includes_wrapping_shapes() {
        let objects = generate_sample_scene().expect("valid sample");
        let names: Vec<String> = objects.iter().filter_map(|o| o.display_name()).collect();
        assert!(names.iter().any(|n| n == "Date line box"));
        assert!(names.iter().any(|n| n == "Antarctic ring"));
        assert!(objects.iter().all(|o| o.is_visible()));
    }

    #[test]
    fn test_graticule_lines() {
        assert_eq!(graticule().expect("valid graticule").len(), 12 + 5);
    }
}
