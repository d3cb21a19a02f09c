pub mod init;
pub mod trace;

pub mod prelude {
    pub use cap_std::fs_utf8::Dir;
    pub use miette;
    pub use miette::{bail, Context, Diagnostic, IntoDiagnostic, Result};
    pub use thiserror::{self, Error};
    pub use tracing::{
        debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
    };
}
