use std::borrow::Cow;

use lreg_derive::lreg_error;

#[lreg_error]
pub enum SampleError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Rejected: {reason}")]
    Rejected { reason: String },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn io_failure() -> Result<(), std::io::Error> {
    Err(std::io::Error::other("disk gone"))
}

#[test]
fn source_converts_and_keeps_context() {
    let err = io_failure().context("reading snapshot").unwrap_err();
    assert!(matches!(err, SampleError::Io { .. }));
    assert_eq!(err.context_str(), Some("reading snapshot"));
    assert_eq!(err.to_string(), "IO error (reading snapshot): disk gone");
}

#[test]
fn question_mark_uses_from() {
    fn run() -> Result<(), SampleError> {
        io_failure()?;
        Ok(())
    }
    let err = run().unwrap_err();
    assert_eq!(err.to_string(), "IO error: disk gone");
}

#[test]
fn strings_become_internal() {
    let err = SampleError::from("bad state");
    assert_eq!(err.to_string(), "Internal error: bad state");

    let err: Result<(), SampleError> = Err(SampleError::from(format!("row {}", 7)));
    let err = err.context("fold").unwrap_err();
    assert_eq!(err.to_string(), "Internal error (fold): row 7");
}

#[test]
fn context_is_ignored_on_variants_without_slot() {
    let err: Result<(), SampleError> = Err(SampleError::Rejected { reason: "nope".to_owned() });
    let err = err.context("ignored").unwrap_err();
    assert_eq!(err.context_str(), None);
    assert_eq!(err.to_string(), "Rejected: nope");
}
