use district_registry::crs::SourceCrs;
use district_registry::{BoundarySource, LonLat, Registry, RegistryCache, RegistryError};
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;

const DISTRICTS: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": { "OMSCHR": "Stadshagen" },
      "geometry": { "type": "Polygon", "coordinates": [[[6.00, 52.50], [6.05, 52.50], [6.05, 52.55], [6.00, 52.55], [6.00, 52.50]]] }
    },
    {
      "type": "Feature",
      "properties": { "OMSCHR": "Assendorp" },
      "geometry": { "type": "Polygon", "coordinates": [[[6.05, 52.50], [6.10, 52.50], [6.10, 52.55], [6.05, 52.55], [6.05, 52.50]]] }
    },
    {
      "type": "Feature",
      "properties": { "OMSCHR": "Berkum" },
      "geometry": { "type": "MultiPolygon", "coordinates": [
        [[[6.10, 52.50], [6.15, 52.50], [6.15, 52.52], [6.10, 52.52], [6.10, 52.50]]],
        [[[6.12, 52.53], [6.14, 52.53], [6.14, 52.54], [6.12, 52.54], [6.12, 52.53]]]
      ] }
    },
    {
      "type": "Feature",
      "properties": { "OMSCHR": "Holtenbroek" },
      "geometry": { "type": "Polygon", "coordinates": [[[6.00, 52.55], [6.10, 52.55], [6.10, 52.60], [6.08, 52.60], [6.08, 52.57], [6.02, 52.57], [6.02, 52.60], [6.00, 52.60], [6.00, 52.55]]] }
    }
  ]
}"#;

fn write_fixture(file_name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("district_registry_tests");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(file_name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn source(path: PathBuf) -> BoundarySource {
    BoundarySource {
        path,
        name_column: "OMSCHR".to_string(),
        crs: None,
    }
}

// Each test writes its own copy; tests run in parallel.
fn load_fixture(tag: &str) -> Registry {
    let path = write_fixture(&format!("districts_{}.geojson", tag), DISTRICTS);
    Registry::load(&source(path)).unwrap()
}

#[test]
fn names_are_sorted_and_match_source() {
    let registry = load_fixture("names");
    let names = registry.list_names();

    assert_eq!(names, vec!["Assendorp", "Berkum", "Holtenbroek", "Stadshagen"]);
    assert!(names.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn every_district_contains_its_interior_point() {
    let registry = load_fixture("interior");

    for name in registry.list_names() {
        let p = registry.interior_point_of(&name).unwrap();
        let hit = registry.find_containing(p).unwrap();
        assert_eq!(hit.map(|d| d.name.clone()), Some(name));
    }
}

#[test]
fn convex_districts_contain_their_centroid() {
    let registry = load_fixture("centroid");

    for name in ["Stadshagen", "Assendorp"] {
        let c = registry.centroid_of(name).unwrap();
        let hit = registry.find_containing(c).unwrap();
        assert_eq!(hit.map(|d| d.name.as_str()), Some(name));
    }
}

#[test]
fn points_far_outside_the_city_match_nothing() {
    let registry = load_fixture("outside");
    let mut rng = rand::thread_rng();

    for _ in 0..200 {
        // Anywhere in the southern hemisphere is well clear of Zwolle.
        let p = LonLat::new(rng.gen_range(-180.0..180.0), rng.gen_range(-90.0..0.0));
        assert!(registry.find_containing(p).unwrap().is_none());
    }
}

#[test]
fn shared_edge_goes_to_first_loaded() {
    let registry = load_fixture("edge");
    let hit = registry.find_containing(LonLat::new(6.05, 52.52)).unwrap();
    assert_eq!(hit.map(|d| d.name.as_str()), Some("Stadshagen"));
}

#[test]
fn loading_twice_gives_equal_registries() {
    let a = load_fixture("twice_a");
    let b = load_fixture("twice_b");

    assert_eq!(a.list_names(), b.list_names());
    for (da, db) in a.districts().iter().zip(b.districts()) {
        assert_eq!(da, db);
    }
}

#[test]
fn centroid_is_deterministic() {
    let registry = load_fixture("deterministic");
    let first = registry.centroid_of("Berkum").unwrap();

    for _ in 0..5 {
        let again = registry.centroid_of("Berkum").unwrap();
        assert_eq!(first.lon.to_bits(), again.lon.to_bits());
        assert_eq!(first.lat.to_bits(), again.lat.to_bits());
    }
}

#[test]
fn missing_name_attribute_fails_the_load() {
    let path = write_fixture(
        "wrong_column.geojson",
        r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"NAAM":"A"},
             "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}}
        ]}"#,
    );

    let err = Registry::load(&source(path)).err().unwrap();
    assert!(matches!(err, RegistryError::DataLoad { .. }));
}

#[test]
fn duplicate_names_fail_the_load() {
    let path = write_fixture(
        "duplicates.geojson",
        r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"OMSCHR":"A"},
             "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
            {"type":"Feature","properties":{"OMSCHR":"A"},
             "geometry":{"type":"Polygon","coordinates":[[[1,0],[2,0],[2,1],[1,1],[1,0]]]}}
        ]}"#,
    );

    let err = Registry::load(&source(path)).err().unwrap();
    assert!(matches!(err, RegistryError::DataLoad { .. }));
}

#[test]
fn corrupt_file_fails_the_load() {
    let path = write_fixture("corrupt.geojson", "{ not json");
    let err = Registry::load(&source(path)).err().unwrap();
    assert!(matches!(err, RegistryError::DataLoad { .. }));
}

#[test]
fn null_names_and_points_are_skipped() {
    let path = write_fixture(
        "skips.geojson",
        r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"OMSCHR":null},
             "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
            {"type":"Feature","properties":{"OMSCHR":"Marker"},
             "geometry":{"type":"Point","coordinates":[0.5,0.5]}},
            {"type":"Feature","properties":{"OMSCHR":"Kept"},
             "geometry":{"type":"Polygon","coordinates":[[[1,0],[2,0],[2,1],[1,1],[1,0]]]}}
        ]}"#,
    );

    let registry = Registry::load(&source(path)).unwrap();
    assert_eq!(registry.list_names(), vec!["Kept"]);
}

#[test]
fn rd_new_boundaries_are_reprojected() {
    // A 4 km square around Zwolle centre in RD New metres.
    let path = write_fixture(
        "rd_new.geojson",
        r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"OMSCHR":"Binnenstad"},
             "geometry":{"type":"Polygon","coordinates":[[
                [201000,501000],[205000,501000],[205000,505000],[201000,505000],[201000,501000]
             ]]}}
        ]}"#,
    );
    let mut src = source(path);
    src.crs = Some(SourceCrs::Epsg(28992));

    let registry = Registry::load(&src).unwrap();
    let c = registry.centroid_of("Binnenstad").unwrap();
    assert!((c.lon - 6.09).abs() < 0.05, "lon was {}", c.lon);
    assert!((c.lat - 52.51).abs() < 0.05, "lat was {}", c.lat);

    let hit = registry.find_containing(c).unwrap();
    assert_eq!(hit.map(|d| d.name.as_str()), Some("Binnenstad"));
}

#[test]
fn cache_loads_each_path_once() {
    let cache = Arc::new(RegistryCache::new());
    let src = source(write_fixture("cached.geojson", DISTRICTS));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let src = src.clone();
            std::thread::spawn(move || cache.get_or_load(&src).unwrap())
        })
        .collect();
    let registries: Vec<Arc<Registry>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(cache.len(), 1);
    assert!(registries.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}

#[test]
fn cache_does_not_remember_failures() {
    let cache = RegistryCache::new();
    let src = source(std::env::temp_dir().join("district_registry_tests/absent.geojson"));

    assert!(cache.get_or_load(&src).is_err());
    assert!(cache.is_empty());
}

#[test]
fn self_intersecting_ring_fails_the_load() {
    let path = write_fixture(
        "bowtie.geojson",
        r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"OMSCHR":"Strik"},
             "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,1],[1,0],[0,1],[0,0]]]}}
        ]}"#,
    );

    match Registry::load(&source(path)) {
        Err(RegistryError::DataLoad { reason, .. }) => assert!(reason.contains("crosses itself")),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("bowtie boundary loaded"),
    }
}

#[test]
fn numeric_name_fails_the_load() {
    let path = write_fixture(
        "numeric_name.geojson",
        r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"OMSCHR":12},
             "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}}
        ]}"#,
    );

    let err = Registry::load(&source(path)).err().unwrap();
    assert!(matches!(err, RegistryError::DataLoad { .. }));
}

#[test]
fn load_errors_name_the_dataset() {
    let path = write_fixture(
        "named_error.geojson",
        r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"OMSCHR":"A"},
             "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,1],[1,0],[0,1],[0,0]]]}}
        ]}"#,
    );

    match Registry::load(&source(path.clone())) {
        Err(RegistryError::DataLoad { path: reported, .. }) => assert_eq!(reported, path),
        _ => panic!("expected a load error"),
    }
}
