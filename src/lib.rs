//! Narrative Script — a small Ink-like dialogue language.
//!
//! Script text is compiled into a JSON intermediate representation, checked
//! by an independent validator that reports every problem at once, and
//! played back one step at a time by a session interpreter whose expression
//! evaluator only accepts a restricted grammar.
//!
//! ```no_run
//! use narrative_script::{compile, validate, Session};
//!
//! let source = "VAR coins = 0\n=== start ===\n+ Buy -> buy\n=== buy ===\n~ coins = coins + 1\n-> END";
//! assert!(validate(source).is_ok());
//! let mut session = Session::builder(compile(source)).build();
//! let turn = session.start().unwrap();
//! session.choose(turn.choices()[0].index).unwrap();
//! ```

pub mod core;
pub mod schema;

pub use crate::core::compiler::{compile, compile_to_json};
pub use crate::core::config::{ConfigError, EngineConfig};
pub use crate::core::expr::{EvalError, Evaluator};
pub use crate::core::runtime::{
    Outcome, PresentedOption, RuntimeFault, Session, SessionError, SessionEvent, SessionState,
    TranscriptEntry, Turn,
};
pub use crate::core::validator::validate;
pub use crate::schema::ir::{IrError, ScriptIr, Step};
pub use crate::schema::report::{Diagnostic, DiagnosticKind, Severity, ValidationReport};
pub use crate::schema::value::{Value, Variables};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a stderr log subscriber filtered by `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset. Safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}
