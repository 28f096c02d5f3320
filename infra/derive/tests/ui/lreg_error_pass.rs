use lreg_derive::lreg_error;
use std::borrow::Cow;

#[lreg_error]
pub enum LookupError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Not found: {key}")]
    NotFound { key: i64 },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn main() {
    let err: LookupError = "boom".into();
    assert!(err.context_str().is_none());
}
