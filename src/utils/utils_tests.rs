use crate::utils::{distance_squared, pow2, TreeConfig, TreeError};

#[test]
fn test_distance_and_powers() {
    assert_eq!(distance_squared(&[1.0], &[-2.0]), 9.0);
    assert_eq!(pow2(0), 1);
    assert_eq!(pow2(10), 1024);
}

#[test]
fn test_default_config_is_valid() {
    let config = TreeConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.opening_factor(), 4.0);
}

#[test]
fn test_config_rejects_zero_leaf_capacity() {
    let config = TreeConfig::new(Some(0), None, None, None, None);
    assert_eq!(config.validate(), Err(TreeError::InvalidLeafCapacity));
}

#[test]
fn test_config_rejects_bad_values() {
    let mut config = TreeConfig::default();
    config.opening_angle = 0.0;
    assert!(matches!(config.validate(), Err(TreeError::InvalidConfig(_))));

    let mut config = TreeConfig::default();
    config.gather_tolerance = 0.5;
    assert!(config.validate().is_err());

    let mut config = TreeConfig::default();
    config.search_expansion_factor = 1.0;
    assert!(config.validate().is_err());

    let mut config = TreeConfig::default();
    config.rebuild_interval = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_rebuild_interval() {
    let config = TreeConfig::new(None, None, None, None, Some(3));
    let rebuilds: Vec<u64> = (0..10).filter(|&s| config.is_rebuild_step(s)).collect();
    assert_eq!(rebuilds, vec![0, 3, 6, 9]);
}

#[test]
fn test_error_classification() {
    assert!(TreeError::CandidateOverflow { required: 10, capacity: 4 }.is_recoverable());
    assert!(TreeError::NonConvergence { particle: 0, iterations: 150 }.is_recoverable());
    assert!(TreeError::SmoothingLengthCeiling { particle: 0, h: 2.0, h_max: 1.0 }.is_recoverable());
    let fatal = TreeError::StructuralInvariantViolation("level".to_string());
    assert!(fatal.is_fatal());
    assert!(!fatal.is_recoverable());
    assert!(!TreeError::InvalidLeafCapacity.is_fatal());
}

#[test]
fn test_error_display() {
    let err = TreeError::CandidateOverflow { required: 12, capacity: 8 };
    assert_eq!(err.to_string(), "Neighbour candidate overflow: 12 candidates for a buffer of 8");
}
