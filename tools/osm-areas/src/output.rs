use anyhow::{Context, Result};
use geo::{LineString, MultiPolygon};
use geojson::{feature::Id, Feature, FeatureCollection, GeoJson, Geometry, Value};
use osm_multipolygon::prelude::*;
use serde::Serialize;
use std::path::Path;

/// A relation that produced no area, as written to the errors file
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub relation_id: i64,
    pub error: String,
}

/// Collects everything the relation collector reports
#[derive(Default)]
pub struct AreaSink {
    pub areas: Vec<Area>,
    pub errors: Vec<ErrorRecord>,
}

impl AreaHandler for AreaSink {
    fn area(&mut self, area: Area) {
        self.areas.push(area);
    }

    fn failure(&mut self, relation_id: i64, error: &BuildError) {
        self.errors.push(ErrorRecord {
            relation_id,
            error: error.to_string(),
        });
    }

    fn incomplete(&mut self, relation_id: i64, missing: usize) {
        self.errors.push(ErrorRecord {
            relation_id,
            error: format!("incomplete: {} member ways missing", missing),
        });
    }
}

fn ring_to_positions(ring: &LineString<f64>) -> Vec<Vec<f64>> {
    ring.0.iter().map(|c| vec![c.x, c.y]).collect()
}

/// Convert a geo MultiPolygon to GeoJSON Value
fn multipolygon_to_geojson(mp: &MultiPolygon<f64>) -> Value {
    let polygons: Vec<Vec<Vec<Vec<f64>>>> = mp
        .0
        .iter()
        .map(|poly| {
            let mut rings = vec![ring_to_positions(poly.exterior())];
            rings.extend(poly.interiors().iter().map(ring_to_positions));
            rings
        })
        .collect();

    Value::MultiPolygon(polygons)
}

/// Create a GeoJSON Feature from an area, tags first and OSM metadata under `osm_*` keys
fn area_to_feature(area: &Area) -> Feature {
    let mut properties = serde_json::Map::new();

    let mut keys: Vec<&String> = area.tags.keys().collect();
    keys.sort();
    for key in keys {
        properties.insert(key.clone(), serde_json::json!(area.tags[key]));
    }

    properties.insert("osm_id".to_string(), serde_json::json!(area.origin.id()));
    properties.insert("osm_type".to_string(), serde_json::json!(area.origin.type_name()));
    properties.insert("area_kind".to_string(), serde_json::json!(area.kind.as_str()));
    properties.insert("osm_version".to_string(), serde_json::json!(area.meta.version));
    properties.insert("osm_changeset".to_string(), serde_json::json!(area.meta.changeset));
    properties.insert("osm_timestamp".to_string(), serde_json::json!(area.meta.timestamp));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(multipolygon_to_geojson(&area.geometry))),
        id: Some(Id::String(format!(
            "{}/{}",
            area.origin.type_name(),
            area.origin.id()
        ))),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Write areas to a GeoJSON file, one feature per area
pub fn write_areas_geojson(areas: &[Area], output_path: &Path) -> Result<()> {
    log::info!("Writing {} areas to {}", areas.len(), output_path.display());

    let feature_collection = FeatureCollection {
        bbox: None,
        features: areas.iter().map(area_to_feature).collect(),
        foreign_members: None,
    };

    let geojson = GeoJson::from(feature_collection);
    let json_string =
        serde_json::to_string_pretty(&geojson).context("Failed to serialize GeoJSON")?;

    std::fs::write(output_path, json_string)
        .with_context(|| format!("Failed to write GeoJSON to {}", output_path.display()))?;

    Ok(())
}

/// Write failed and incomplete relations to a JSON array
pub fn write_errors_json(errors: &[ErrorRecord], output_path: &Path) -> Result<()> {
    log::info!("Writing {} relation errors to {}", errors.len(), output_path.display());

    let json_string =
        serde_json::to_string_pretty(errors).context("Failed to serialize errors")?;

    std::fs::write(output_path, json_string)
        .with_context(|| format!("Failed to write errors to {}", output_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Polygon};

    fn square_area() -> Area {
        let poly: Polygon<f64> = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ];
        let mut tags = Tags::new();
        tags.insert("natural".into(), "water".into());
        Area {
            origin: Origin::Relation(42),
            kind: AreaKind::Multipolygon,
            geometry: MultiPolygon(vec![poly]),
            tags,
            meta: Meta {
                version: 3,
                changeset: 77,
                timestamp: 1_600_000_000_000,
                uid: 5,
            },
        }
    }

    #[test]
    fn test_area_to_feature() {
        let feature = area_to_feature(&square_area());

        assert_eq!(feature.id, Some(Id::String("relation/42".to_string())));

        let props = feature.properties.unwrap();
        assert_eq!(props["natural"], serde_json::json!("water"));
        assert_eq!(props["osm_id"], serde_json::json!(42));
        assert_eq!(props["osm_type"], serde_json::json!("relation"));
        assert_eq!(props["area_kind"], serde_json::json!("multipolygon"));
        assert_eq!(props["osm_version"], serde_json::json!(3));
        assert_eq!(props["osm_timestamp"], serde_json::json!(1_600_000_000_000i64));

        match feature.geometry.unwrap().value {
            Value::MultiPolygon(polys) => {
                assert_eq!(polys.len(), 1);
                assert_eq!(polys[0].len(), 1);
                assert_eq!(polys[0][0].len(), 5);
            }
            other => panic!("unexpected geometry {:?}", other),
        }
    }

    #[test]
    fn test_sink_records_failures() {
        let mut sink = AreaSink::default();
        sink.area(square_area());
        sink.failure(7, &BuildError::NoRings);
        sink.incomplete(8, 2);

        assert_eq!(sink.areas.len(), 1);
        assert_eq!(sink.errors.len(), 2);
        assert_eq!(sink.errors[0].relation_id, 7);
        assert_eq!(sink.errors[1].relation_id, 8);
        assert!(sink.errors[1].error.contains('2'));

        let json = serde_json::to_value(&sink.errors).unwrap();
        assert_eq!(json[0]["relation_id"], serde_json::json!(7));
    }
}
