use gridstats::{init_logging_from_env, LogFormat, LoggingInitError};

#[test]
fn env_driven_init_installs_once() {
    std::env::set_var("GRIDSTATS_LOG_LEVEL", "warn");
    std::env::set_var("GRIDSTATS_LOG_FORMAT", "json");
    std::env::remove_var("GRIDSTATS_LOG_TARGET");

    let config = init_logging_from_env().expect("first init should install the subscriber");
    assert_eq!(config.level, "warn");
    assert_eq!(config.format, LogFormat::Json);
    assert!(config.include_target);

    let err = init_logging_from_env().expect_err("second init should be rejected");
    assert!(matches!(err, LoggingInitError::AlreadyInitialized(_)));
}
