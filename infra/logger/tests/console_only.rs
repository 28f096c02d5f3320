use lreg_logger::{LevelFilter, Logger};

#[test]
fn init_console_only_has_no_file_writer() {
    let logger = Logger::builder("integration-console-only")
        .level(LevelFilter::INFO)
        .init()
        .expect("logger should initialize");

    assert!(!logger.writes_files(), "console-only logger should not create a file writer");
}
