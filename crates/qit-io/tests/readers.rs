mod common;

use std::fs::{self, File};

use ndarray::Array1;
use ndarray_npy::NpzWriter;

use qit_core::error::QitError;
use qit_core::filter::SpeciesSelector;
use qit_core::trajectory::StepArrays;
use qit_io::{
    read_container_trajectory, read_trajectory_file, ArrayContainer, ContainerV2Reader,
    LegacyContainerReader, NpzContainer, SimulationProject, TrajectoryFormat, TrajectoryReader,
};

#[test]
fn v2_static_container_is_dense() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("static.npz");
    common::write_v2(&path, true, &[4, 4, 4, 4, 4], Some(&[1.0, 1.0, 2.0, 2.0]));

    let file = read_container_trajectory(&path).expect("read container trajectory");
    assert_eq!(file.file_version_id, 2);
    assert_eq!(file.format, TrajectoryFormat::Container);
    let tra = file.trajectory;
    assert!(tra.is_static_trajectory());
    assert_eq!(tra.len(), 5);
    match tra.positions() {
        StepArrays::Dense(arr) => assert_eq!(arr.shape(), &[4, 3, 5]),
        StepArrays::PerStep(_) => panic!("static file read as per-step"),
    }
    assert_eq!(
        tra.additional_attribute_names(),
        &["step".to_string(), "chemical id".to_string()]
    );
    assert_eq!(tra.masses(), Some(&[1.0, 1.0, 2.0, 2.0][..]));
}

#[test]
fn v2_variable_container_keeps_step_counts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("variable.npz");
    common::write_v2(&path, false, &[6, 5, 3], None);

    let mut reader = ContainerV2Reader::open(&path).expect("open container");
    let tra = reader.read_trajectory().expect("read trajectory").trajectory;
    assert!(!tra.is_static_trajectory());
    assert_eq!(tra.len(), 3);
    let counts: Vec<_> = (0..3)
        .map(|s| tra.particle_count(s).expect("particle count"))
        .collect();
    assert_eq!(counts, vec![6, 5, 3]);

    // "chemical id" equals the particle index, so substance 4 vanishes at step 2
    let picked = SpeciesSelector::Substance(4.0)
        .select_positions(&tra)
        .expect("select positions");
    let rows: Vec<_> = picked.steps().map(|b| b.nrows()).collect();
    assert_eq!(rows, vec![1, 1, 0]);
}

#[test]
fn legacy_containers_with_and_without_aux() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bare = dir.path().join("bare.npz");
    let aux = dir.path().join("aux.npz");
    common::write_legacy(&bare, 4, 3, false);
    common::write_legacy(&aux, 4, 3, true);

    let bare = LegacyContainerReader::open(&bare)
        .expect("open container")
        .read_trajectory()
        .expect("read trajectory");
    assert_eq!(bare.file_version_id, 1);
    assert!(bare.trajectory.additional_attributes().is_none());
    assert!(bare.trajectory.additional_attribute_names().is_empty());
    assert_eq!(bare.trajectory.step_positions(3).expect("step positions")[[2, 0]], 2.0);
    assert_eq!(bare.trajectory.step_positions(3).expect("step positions")[[2, 2]], 3.0);

    let aux = read_trajectory_file(&aux, None).expect("read trajectory file").trajectory;
    match aux.additional_attributes().expect("additional attributes") {
        StepArrays::Dense(arr) => {
            assert_eq!(arr.shape(), &[3, 1, 4]);
            assert_eq!(arr[[2, 0, 3]], 6.0);
        }
        StepArrays::PerStep(_) => panic!("legacy attributes are dense"),
    }
}

#[test]
fn compressed_and_plain_json_agree() {
    let dir = tempfile::tempdir().expect("tempdir");
    let plain = dir.path().join("run_trajectories.json");
    let gz = dir.path().join("run_trajectories.json.gz");
    common::write_text(&plain, common::JSON_TRAJECTORY);
    common::write_gz(&gz, common::JSON_TRAJECTORY);

    let a = read_trajectory_file(&plain, None).expect("read trajectory file");
    let b = read_trajectory_file(&gz, None).expect("read trajectory file");
    assert_eq!(a.format, TrajectoryFormat::Json);
    assert_eq!(a.trajectory.positions(), b.trajectory.positions());
    assert_eq!(a.trajectory.times(), b.trajectory.times());
    assert_eq!(a.trajectory.masses(), b.trajectory.masses());
    assert_eq!(a.trajectory.n_particles(), Some(3));
}

#[test]
fn truncated_files_fail() {
    let dir = tempfile::tempdir().expect("tempdir");

    let npz = dir.path().join("cut.npz");
    common::write_v2(&npz, true, &[2, 2], None);
    let bytes = fs::read(&npz).expect("read npz");
    fs::write(&npz, &bytes[..bytes.len() / 2]).expect("truncate file");
    assert!(read_trajectory_file(&npz, None).is_err());

    let gz = dir.path().join("cut_trajectories.json.gz");
    common::write_gz(&gz, common::JSON_TRAJECTORY);
    let bytes = fs::read(&gz).expect("read gz");
    fs::write(&gz, &bytes[..bytes.len() / 2]).expect("truncate file");
    assert!(read_trajectory_file(&gz, None).is_err());
}

#[test]
fn damaged_entry_reports_the_float_read() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("damaged.npz");
    let mut npz = NpzWriter::new(File::create(&path).expect("create npz"));
    npz.add_array("values", &Array1::from(vec![1.5f64; 7]))
        .expect("add values");
    npz.finish().expect("finish npz");

    // Claim more elements than stored, leaving the f64 payload short.
    let mut bytes = fs::read(&path).expect("read npz");
    let needle = b"'shape': (7,)";
    let at = bytes
        .windows(needle.len())
        .position(|w| w == needle)
        .expect("npy header in archive");
    bytes[at + needle.len() - 3] = b'9';
    fs::write(&path, &bytes).expect("rewrite npz");

    let mut container = NpzContainer::open(&path).expect("open npz");
    let err = container.read_f64("values").expect_err("short payload");
    assert!(matches!(err, QitError::Parse(_)));
    assert!(
        !err.to_string().contains("descriptor"),
        "dtype mismatch reported instead of the damaged data: {err}"
    );
}

#[test]
fn uppercase_gzip_extension_is_decompressed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("RUN_TRAJECTORIES.JSON.GZ");
    common::write_gz(&path, common::JSON_TRAJECTORY);
    let file = read_trajectory_file(&path, None).expect("read upper-case gzip json");
    assert_eq!(file.format, TrajectoryFormat::Json);
    assert_eq!(file.trajectory.len(), 3);
}

#[test]
fn unknown_extension_needs_explicit_format() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("trajectory.dat");
    common::write_text(&path, common::JSON_TRAJECTORY);
    assert!(matches!(
        read_trajectory_file(&path, None),
        Err(QitError::Unsupported(_))
    ));
    let file =
        read_trajectory_file(&path, Some(TrajectoryFormat::Json)).expect("read trajectory file");
    assert_eq!(file.trajectory.len(), 3);
}

#[test]
fn project_prefers_container_trajectory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let prefix = common::project_in(&dir, "qitSim_run");
    let project = SimulationProject::new(&prefix);
    common::write_gz(
        &project.artifact("_trajectories.json.gz"),
        common::JSON_TRAJECTORY,
    );
    assert_eq!(
        project.read_trajectory().expect("read trajectory").format,
        TrajectoryFormat::Json
    );

    common::write_v2(&project.artifact("_trajectories.npz"), true, &[2], None);
    assert_eq!(
        project.read_trajectory().expect("read trajectory").format,
        TrajectoryFormat::Container
    );

    common::write_text(
        &project.config_path(),
        r#"{"background_pressure": 0.1, "collision_gas_mass_amu": 28}"#,
    );
    assert_eq!(
        project.read_config().expect("read config").title(&project.name()).expect("title"),
        "qitSim_run p:0.1 Pa"
    );
}
