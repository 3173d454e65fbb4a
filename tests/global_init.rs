//! The process-wide registry can only be initialized once per process, so
//! the whole lifecycle is exercised in a single test.

use std::fs;

use logroute::{FilterRef, HandlerName, HandlerSpec, Level, LogError, NameFilter, RefKind};
use tempfile::TempDir;

#[test]
fn test_process_wide_lifecycle() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let first_dir = first.path().join("logs");
    let second_dir = second.path().join("logs");

    // Nothing works before init
    assert!(matches!(logroute::registry(), Err(LogError::NotInitialized)));
    assert!(matches!(
        logroute::get_logger("early", Level::Info, None),
        Err(LogError::NotInitialized)
    ));
    assert!(matches!(
        logroute::new_formatter("early", "%(message)s"),
        Err(LogError::NotInitialized)
    ));

    // A failed init leaves the registry uninitialized
    assert!(matches!(
        logroute::init_logging(&first_dir, "shouty"),
        Err(LogError::InvalidLevel(_))
    ));
    assert!(logroute::registry().is_err());

    // First writer wins
    let registry = logroute::init_logging(&first_dir, "warn").unwrap();
    assert_eq!(registry.level(), Level::Warning);
    assert_eq!(registry.root().level(), Level::Warning);
    assert!(first_dir.join("info.log").exists());

    let again = logroute::init_logging(&second_dir, Level::Debug).unwrap();
    assert_eq!(again.log_dir(), first_dir.as_path());
    assert_eq!(again.level(), Level::Warning);
    assert!(!second_dir.exists());

    // Named loggers
    let child = logroute::get_logger("child", "info", Some(&["console_handler"])).unwrap();
    assert_eq!(child.handler_names(), vec![HandlerName::new("console")]);
    assert!(!child.propagate());
    child.warning("child warning stays on the console");

    let jobs = logroute::registry().unwrap().logger("jobs");
    let jobs = logroute::setup_logger(&jobs, Level::Error, None).unwrap();
    assert_eq!(jobs.level(), Level::Error);
    assert_eq!(jobs.handler_names().len(), 3);

    // Registration through the facade
    logroute::new_formatter("bare", "%(name)s %(message)s").unwrap();
    logroute::new_filter("jobs", FilterRef::instance(NameFilter::new("jobs"))).unwrap();
    logroute::new_handler(
        "jobs_file",
        HandlerSpec::new("rotating_file", "bare")
            .level(Level::Error)
            .filter("jobs_filter")
            .param("filename", "jobs.log"),
    )
    .unwrap();
    let err = logroute::new_handler("broken", HandlerSpec::new("console", "missing")).unwrap_err();
    assert!(matches!(
        err,
        LogError::UnknownReference {
            kind: RefKind::Formatter,
            ..
        }
    ));

    let jobs = logroute::get_logger("jobs", Level::Error, Some(&["jobs_file"])).unwrap();
    jobs.error("nightly export failed");

    // tracing events are routed through the installed layer
    tracing::error!(target: "billing::invoices", "invoice rendering failed");

    registry.flush();
    let errors = fs::read_to_string(first_dir.join("errors.log")).unwrap();
    assert!(errors.contains("invoice rendering failed"));
    assert!(errors.contains("nightly export failed"));
    assert!(!errors.contains("child warning"));

    let jobs_log = fs::read_to_string(first_dir.join("jobs.log")).unwrap();
    assert_eq!(jobs_log, "jobs nightly export failed\n");
}
