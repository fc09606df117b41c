//! Integration tests for snapshots, wreckage chains, terrain changes and
//! file-backed setup.

use std::path::PathBuf;

use tellus_shared::Vec3;
use tellus_sim::{
    FeatureDefRegistry, FeatureError, FeatureHandler, FeatureId, FeatureLoadParams, FlatTerrain,
    IdentitySnapshot, MapFeatureList, SimConfig, SpatialIndex, TerrainRegion, TickDriver,
    UnitDefId,
};

const DEFS: &str = r#"
    [[feature]]
    name = "rock"

    [[feature]]
    name = "tank_dead"
    footprint_x = 3
    footprint_z = 3
    health = 900.0
    death_feature = "tank_heap"

    [[feature]]
    name = "tank_heap"
    resurrectable = 0
    death_feature = "ash"
"#;

const GROUND: FlatTerrain = FlatTerrain::new(0.0);

fn temp_path(name: &str) -> PathBuf {
    let id = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("tellus_{name}_{id}.toml"))
}

fn config() -> SimConfig {
    SimConfig {
        max_features: 1_000,
        gravity: -1.0,
        ..SimConfig::default()
    }
}

fn setup() -> FeatureHandler {
    FeatureHandler::new(config(), FeatureDefRegistry::from_toml_str(DEFS).unwrap()).unwrap()
}

fn params(handler: &FeatureHandler, def: &str) -> FeatureLoadParams {
    FeatureLoadParams::new(handler.defs().id_of(def).unwrap(), Vec3::ZERO)
}

#[test]
fn test_snapshot_restores_identity_exactly() {
    let mut features = setup();
    let mut driver = TickDriver::new();
    let rock = params(&features, "rock");

    for _ in 0..6 {
        features.create(rock).unwrap();
    }
    features.create(rock.with_id(FeatureId(20))).unwrap();
    let mut falling = rock;
    falling.pos.y = 30.0;
    let falling = features.create(falling).unwrap();
    driver.step(&mut features, &GROUND).unwrap();

    // Deferred at snapshot time
    features.destroy(FeatureId(2)).unwrap();
    features.destroy(FeatureId(4)).unwrap();

    let snapshot = features.snapshot();
    let text = snapshot.to_toml_string().unwrap();
    let parsed = IdentitySnapshot::from_toml_str(&text).unwrap();
    assert_eq!(parsed, snapshot);

    let defs = FeatureDefRegistry::from_toml_str(DEFS).unwrap();
    let mut restored = FeatureHandler::restore(config(), defs, &parsed).unwrap();

    assert_eq!(restored.active_ids(), features.active_ids());
    assert_eq!(restored.id_space_len(), features.id_space_len());
    assert_eq!(restored.id_space_len(), 21);
    assert_eq!(restored.update_worklist(), features.update_worklist());
    assert!(restored.update_worklist().contains(&falling));
    assert_eq!(restored.frame(), features.frame());
    assert_eq!(
        restored.feature(falling).unwrap(),
        features.feature(falling).unwrap()
    );

    // Deferred IDs stay deferred until the next tick in both
    assert!(matches!(
        restored.create(rock.with_id(FeatureId(2))),
        Err(FeatureError::IdDeferred { id: 2, .. })
    ));

    // Both continue identically
    for _ in 0..3 {
        driver.step(&mut features, &GROUND).unwrap();
        driver.step(&mut restored, &GROUND).unwrap();
        let a = features.create(rock).unwrap();
        let b = restored.create(rock).unwrap();
        assert_eq!(a, b);
    }
    assert_eq!(restored.snapshot(), features.snapshot());
}

#[test]
fn test_restore_rejects_mismatched_limits() {
    let features = setup();
    let snapshot = features.snapshot();
    let defs = FeatureDefRegistry::from_toml_str(DEFS).unwrap();

    let other = SimConfig {
        max_features: 2_000,
        ..config()
    };
    assert!(matches!(
        FeatureHandler::restore(other, defs, &snapshot),
        Err(FeatureError::CorruptSnapshot(_))
    ));
}

#[test]
fn test_restore_rejects_record_without_live_id() {
    let mut features = setup();
    let rock = params(&features, "rock");
    features.create(rock).unwrap();

    let mut snapshot = features.snapshot();
    snapshot.ids.live.clear();
    let defs = FeatureDefRegistry::from_toml_str(DEFS).unwrap();

    assert!(matches!(
        FeatureHandler::restore(config(), defs, &snapshot),
        Err(FeatureError::CorruptSnapshot(_))
    ));
}

#[test]
fn test_snapshot_after_rolled_back_create() {
    let capped = SimConfig {
        max_pages: Some(2),
        ..config()
    };
    let defs = FeatureDefRegistry::from_toml_str(DEFS).unwrap();
    let mut features = FeatureHandler::new(capped.clone(), defs).unwrap();
    let rock = params(&features, "rock");

    features.create(rock).unwrap();
    features.create(rock).unwrap();
    assert!(features.create(rock).is_err());
    assert!(features.id_pool().id_space_len() > features.id_space_len());

    let snapshot = features.snapshot();
    let parsed = IdentitySnapshot::from_toml_str(&snapshot.to_toml_string().unwrap()).unwrap();
    let defs = FeatureDefRegistry::from_toml_str(DEFS).unwrap();
    let restored = FeatureHandler::restore(capped, defs, &parsed).unwrap();

    assert_eq!(restored.id_space_len(), 2);
    assert_eq!(restored.active_ids(), features.active_ids());
    assert_eq!(restored.snapshot(), snapshot);
}

#[test]
fn test_restore_rejects_oversized_object_array() {
    let mut features = setup();
    features.create(params(&features, "rock")).unwrap();

    let mut snapshot = features.snapshot();
    snapshot.id_space_len = usize::MAX / 2;
    let defs = FeatureDefRegistry::from_toml_str(DEFS).unwrap();

    assert!(matches!(
        FeatureHandler::restore(config(), defs, &snapshot),
        Err(FeatureError::CorruptSnapshot(_))
    ));
}

#[test]
fn test_restore_rejects_record_past_object_array() {
    let mut features = setup();
    features.create(params(&features, "rock").with_id(FeatureId(5))).unwrap();

    let mut snapshot = features.snapshot();
    snapshot.id_space_len = 3;
    let defs = FeatureDefRegistry::from_toml_str(DEFS).unwrap();

    assert!(matches!(
        FeatureHandler::restore(config(), defs, &snapshot),
        Err(FeatureError::CorruptSnapshot(_))
    ));
}

#[test]
fn test_restore_rejects_frame_mismatch() {
    let mut features = setup();
    let mut driver = TickDriver::new();
    features.create(params(&features, "rock")).unwrap();
    driver.run(&mut features, &GROUND, 3).unwrap();

    let mut snapshot = features.snapshot();
    assert_eq!(snapshot.frame, snapshot.ids.tick);
    snapshot.frame += 5;
    let defs = FeatureDefRegistry::from_toml_str(DEFS).unwrap();

    assert!(matches!(
        FeatureHandler::restore(config(), defs, &snapshot),
        Err(FeatureError::CorruptSnapshot(_))
    ));
}

#[test]
fn test_wreckage_chain() {
    let mut features = setup();
    let tank = params(&features, "tank_dead")
        .with_unit_def(UnitDefId(7))
        .with_smoke(30);

    let wreck = features.create_wreckage(tank, 0, true).unwrap().unwrap();
    let wreck = features.feature(wreck).unwrap();
    assert_eq!(wreck.def(), features.defs().id_of("tank_dead").unwrap());
    assert_eq!(wreck.unit_def(), Some(UnitDefId(7)));
    assert_eq!(wreck.smoke_time(), 30);

    let heap = features.create_wreckage(tank, 1, false).unwrap().unwrap();
    let heap = features.feature(heap).unwrap();
    assert_eq!(heap.def(), features.defs().id_of("tank_heap").unwrap());
    assert_eq!(heap.unit_def(), None);
    assert_eq!(heap.smoke_time(), 0);

    // "ash" is not defined, so the chain ends
    assert_eq!(features.create_wreckage(tank, 2, true), Ok(None));
    assert_eq!(features.len(), 2);
}

#[test]
fn test_terrain_change_wakes_overlapping_features() {
    let mut features = setup();
    let mut driver = TickDriver::new();
    let rock = params(&features, "rock");

    let near = features.create(rock).unwrap();
    let mut far = rock;
    far.pos = Vec3::new(500.0, 0.0, 500.0);
    let far = features.create(far).unwrap();
    driver.step(&mut features, &GROUND).unwrap();
    assert!(features.update_worklist().is_empty());

    let woken = features.terrain_changed(TerrainRegion::new(-10, -10, 10, 10));
    assert_eq!(woken, 1);
    assert!(features.update_worklist().contains(&near));
    assert!(!features.update_worklist().contains(&far));

    // Raised ground lifts the woken feature and settles it again
    driver.step(&mut features, &FlatTerrain::new(3.0)).unwrap();
    assert_eq!(features.feature(near).unwrap().pos.y, 3.0);
    assert!(features.update_worklist().is_empty());
}

struct EverythingIndex(Vec<FeatureId>);

impl SpatialIndex for EverythingIndex {
    fn features_in_region(&self, _region: &TerrainRegion) -> Vec<FeatureId> {
        self.0.clone()
    }
}

#[test]
fn test_terrain_change_rechecks_index_candidates() {
    let mut features = setup();
    let mut driver = TickDriver::new();
    let rock = params(&features, "rock");

    let near = features.create(rock).unwrap();
    let mut far = rock;
    far.pos = Vec3::new(500.0, 0.0, 500.0);
    let far = features.create(far).unwrap();
    driver.step(&mut features, &GROUND).unwrap();

    // The index over-reports and includes an ID that is not active
    let index = EverythingIndex(vec![far, FeatureId(99), near]);
    let woken = features.terrain_changed_with(TerrainRegion::new(-10, -10, 10, 10), &index);

    assert_eq!(woken, 1);
    assert!(features.update_worklist().contains(&near));
}

#[test]
fn test_setup_from_files() {
    let config_path = temp_path("config");
    let defs_path = temp_path("defs");
    let map_path = temp_path("map");

    std::fs::write(&config_path, "max_pages = 16\nrecord_events = true\n").unwrap();
    std::fs::write(&defs_path, DEFS).unwrap();
    std::fs::write(
        &map_path,
        r#"
        [[feature]]
        name = "rock"
        x = 16.0
        z = 16.0

        [[feature]]
        name = "tank_dead"
        x = 64.0
        z = 32.0
        rotation = -16384
        "#,
    )
    .unwrap();

    let config = SimConfig::from_toml_file(&config_path).unwrap();
    let defs = FeatureDefRegistry::from_toml_file(&defs_path).unwrap();
    let map = MapFeatureList::from_toml_file(&map_path).unwrap();

    let mut features = FeatureHandler::new(config, defs).unwrap();
    let report = features
        .load_features_from_map(&map, &FlatTerrain::new(2.0))
        .unwrap();
    assert_eq!(report.created, 2);
    assert_eq!(features.drain_events().count(), 2);
    assert_eq!(features.feature(FeatureId(1)).unwrap().heading(), -16384);
    assert_eq!(features.feature(FeatureId(1)).unwrap().pos.y, 2.0);

    for path in [&config_path, &defs_path, &map_path] {
        std::fs::remove_file(path).ok();
    }
}

#[test]
fn test_missing_file_is_io_error() {
    let err = SimConfig::from_toml_file(temp_path("missing")).unwrap_err();
    assert!(matches!(err, FeatureError::Io(_)));
}
