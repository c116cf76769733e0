//! Installing the global subscriber. Kept in its own test binary because
//! the subscriber can only be set once per process.

use logconf::observability::SetupError;

mod common;

#[test]
fn test_second_init_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::file_config(dir.path());

    let system = logconf::init(&config).unwrap();
    tracing::warn!(target: "master", "installed");
    assert_eq!(
        common::read_lines(&dir.path().join("master.log")),
        vec!["master WARNING installed"]
    );

    let err = logconf::init(&config).unwrap_err();
    assert!(matches!(err, SetupError::AlreadyInitialized(_)));
    assert!(system.handler("master_file").is_some());
}
