//! WASM bindings for narrative-script — powers the browser player.
//!
//! Everything crossing the boundary is a JSON string.

use wasm_bindgen::prelude::*;

use narrative_script::core::compiler::compile;
use narrative_script::core::config::EngineConfig;
use narrative_script::core::runtime::{Session, SessionState, TranscriptEntry, Turn};
use narrative_script::core::validator::validate;
use narrative_script::schema::ir::ScriptIr;
use narrative_script::schema::value::Variables;

#[derive(serde::Serialize)]
struct Snapshot<'a> {
    state: &'a SessionState,
    current: Option<&'a str>,
    vars: &'a Variables,
    history: &'a [String],
    transcript: &'a [TranscriptEntry],
}

/// Validate script text. Returns the report as JSON.
#[wasm_bindgen]
pub fn validate_script(source: &str) -> Result<String, JsError> {
    validate(source)
        .to_json()
        .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

/// Compile script text. Returns the IR as JSON.
#[wasm_bindgen]
pub fn compile_script(source: &str) -> Result<String, JsError> {
    compile(source)
        .to_json()
        .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

fn turn_json(turn: &Turn) -> Result<String, JsError> {
    serde_json::to_string(turn).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

/// One playback session for the browser host.
#[wasm_bindgen]
pub struct ScriptPlayer {
    session: Session,
}

impl ScriptPlayer {
    fn from_ir_value(ir: ScriptIr, config_ron: &str) -> Result<ScriptPlayer, JsError> {
        let config = if config_ron.trim().is_empty() {
            EngineConfig::default()
        } else {
            EngineConfig::parse_ron(config_ron)
                .map_err(|e| JsError::new(&format!("Config parse error: {e}")))?
        };
        Ok(ScriptPlayer {
            session: Session::builder(ir).config(config).build(),
        })
    }
}

#[wasm_bindgen]
impl ScriptPlayer {
    /// Compile `source` and prepare a session. `config_ron` may be empty.
    #[wasm_bindgen(constructor)]
    pub fn new(source: &str, config_ron: &str) -> Result<ScriptPlayer, JsError> {
        Self::from_ir_value(compile(source), config_ron)
    }

    /// Prepare a session from IR JSON produced by `compile_script`.
    pub fn from_ir(ir_json: &str, config_ron: &str) -> Result<ScriptPlayer, JsError> {
        let ir = ScriptIr::from_json(ir_json)
            .map_err(|e| JsError::new(&format!("Invalid IR JSON: {e}")))?;
        Self::from_ir_value(ir, config_ron)
    }

    /// Start the session. Returns the first turn as JSON.
    pub fn start(&mut self) -> Result<String, JsError> {
        let turn = self
            .session
            .start()
            .map_err(|e| JsError::new(&format!("Session error: {e}")))?;
        turn_json(&turn)
    }

    /// Pick a presented option by index. Returns the next turn as JSON.
    pub fn choose(&mut self, index: usize) -> Result<String, JsError> {
        let turn = self
            .session
            .choose(index)
            .map_err(|e| JsError::new(&format!("Session error: {e}")))?;
        turn_json(&turn)
    }

    pub fn is_finished(&self) -> bool {
        self.session.is_finished()
    }

    /// State, variables, history and transcript as JSON.
    pub fn snapshot(&self) -> Result<String, JsError> {
        let snapshot = Snapshot {
            state: self.session.state(),
            current: self.session.current_step(),
            vars: self.session.vars(),
            history: self.session.history(),
            transcript: self.session.transcript(),
        };
        serde_json::to_string(&snapshot)
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "=== start ===\nHello.\n+ Bye -> END";

    #[test]
    fn player_round() {
        let mut player = ScriptPlayer::new(SCRIPT, "").unwrap();
        let first = player.start().unwrap();
        assert!(first.contains("\"Bye\""));
        let last = player.choose(0).unwrap();
        assert!(last.contains("\"ended\""));
        assert!(player.is_finished());
        assert!(player.snapshot().unwrap().contains("\"Ended\""));
    }

    #[test]
    fn player_from_ir() {
        let ir = compile(SCRIPT).to_json().unwrap();
        let mut player = ScriptPlayer::from_ir(&ir, "(entry: \"start\")").unwrap();
        assert!(player.start().unwrap().contains("Hello."));
    }
}
