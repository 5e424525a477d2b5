use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while compiling a template or driving an
/// instance. Render-time data problems are deliberately not here: missing
/// paths resolve to null and render as nothing.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown template `{0}`")]
    UnknownTemplate(String),

    #[error("template fragment must have exactly one root element, found {0}")]
    RootCount(usize),

    #[error("`{0}` is not allowed on the fragment root")]
    StructuralRoot(&'static str),

    #[error("`{second}` cannot be combined with `{first}` on the same element")]
    ConflictingDirectives {
        first: &'static str,
        second: &'static str,
    },

    #[error("`{0}` has no matching `data-if` on a preceding sibling")]
    DanglingBranch(&'static str),

    #[error("unsupported handler expression `{0}`")]
    HandlerExpr(String),

    #[error("directive `{0}` requires a non-empty value")]
    EmptyDirective(String),

    #[error("malformed directive attribute `{0}`")]
    BadDirective(String),

    #[error("include function failed: {0}")]
    IncludeFailed(String),

    #[error("include nesting exceeded {0} levels, possible cycle")]
    IncludeDepth(usize),

    #[error("instance is busy with another update")]
    UpdateInProgress,

    #[error("instance has been destroyed")]
    InstanceDestroyed,
}
