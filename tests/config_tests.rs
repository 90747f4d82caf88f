//! Config persistence through bincode files.

use std::{env, fs, path::PathBuf};

use sph_fluid::{Config, SimError};

fn temp_path(name: &str) -> PathBuf {
    env::temp_dir().join(format!("sph_fluid_{}_{name}.sph", std::process::id()))
}

#[test]
fn saved_config_loads_back() {
    let path = temp_path("roundtrip");

    let mut cfg = Config::default();
    cfg.solver.viscosity = 150.;
    cfg.solver.density_floor = Some(0.5);
    cfg.spawn.center = Some((300., 200.));
    cfg.num_workers = Some(3);
    cfg.seed = Some(99);

    cfg.save(&path).unwrap();
    let loaded = Config::load(&path).unwrap();
    fs::remove_file(&path).ok();

    assert_eq!(loaded, cfg);
}

#[test]
fn missing_file_is_io_error() {
    let result = Config::load(&temp_path("does_not_exist"));
    assert!(matches!(result, Err(SimError::Io(_))));
}

#[test]
fn truncated_file_is_decode_error() {
    let path = temp_path("truncated");
    fs::write(&path, [1u8, 2, 3]).unwrap();

    let result = Config::load(&path);
    fs::remove_file(&path).ok();

    assert!(matches!(result, Err(SimError::Decode(_))));
}

#[test]
fn invalid_values_are_rejected_on_load() {
    let path = temp_path("invalid");

    let mut cfg = Config::default();
    cfg.solver.kernel_radius = -1.;
    cfg.save(&path).unwrap();

    let result = Config::load(&path);
    fs::remove_file(&path).ok();

    assert!(matches!(result, Err(SimError::InvalidConfig(_))));
}

#[test]
fn unbounded_spawn_radius_is_rejected_on_load() {
    let path = temp_path("spawn_radius");

    let mut cfg = Config::default();
    cfg.spawn.radius = f32::INFINITY;
    cfg.save(&path).unwrap();

    let result = Config::load(&path);
    fs::remove_file(&path).ok();

    assert!(matches!(result, Err(SimError::InvalidConfig(_))));
}
