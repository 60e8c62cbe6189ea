/// Runtime interpreter — drives one interactive session over compiled IR.
///
/// A session advances from step to step until it needs a decision from the
/// player, reaches a sentinel, runs out of navigation or hits a fault. The
/// only suspension point is an open choice; [`Session::choose`] resumes it.
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::EngineConfig;
use crate::core::expr::Evaluator;
use crate::core::resolve::is_sentinel;
use crate::core::template::TextTemplate;
use crate::schema::ir::{Action, ScriptIr, Step};
use crate::schema::value::{Value, Variables};

/// Session-local failure. The session stays inspectable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RuntimeFault {
    #[error("no such step: {0}")]
    MissingStep(String),
    #[error("more than {limit} steps without player input, last at '{at}'")]
    DivertLimit { limit: usize, at: String },
}

/// Misuse of the session API by the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("a selection is pending")]
    SelectionPending,
    #[error("no selection is pending")]
    NoSelectionPending,
    #[error("invalid choice: {0}")]
    InvalidChoice(String),
    #[error("session has finished")]
    Finished,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionState {
    /// Built, not started.
    Ready,
    AwaitingChoice,
    Ended,
    /// No options, divert or terminal flag at this step.
    Stuck(String),
    Faulted(RuntimeFault),
}

/// An option offered to the player. `index` is its position in the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentedOption {
    pub index: usize,
    pub id: String,
    pub label: String,
}

/// Something that happened while the session advanced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Rendered step text for the presentation layer.
    Passage {
        step: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        speaker: Option<String>,
        text: String,
    },
    Chose { id: String, label: String },
    Assigned { var: String, value: Value },
    ActionSkipped { action: String, reason: String },
    /// `~ name(args)`; no built-in effect, the host decides.
    ExternalCall { name: String, args: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    Choices(Vec<PresentedOption>),
    Ended,
    Stuck(String),
    Fault(RuntimeFault),
}

/// Result of one call to [`Session::start`] or [`Session::choose`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub events: Vec<SessionEvent>,
    pub outcome: Outcome,
}

impl Turn {
    /// Rendered passages of this turn, in order.
    pub fn passages(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|e| match e {
            SessionEvent::Passage { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn choices(&self) -> &[PresentedOption] {
        match &self.outcome {
            Outcome::Choices(options) => options,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TranscriptEntry {
    Line {
        #[serde(skip_serializing_if = "Option::is_none")]
        speaker: Option<String>,
        text: String,
    },
    Choice { label: String },
}

pub struct SessionBuilder {
    ir: ScriptIr,
    config: EngineConfig,
    vars: Variables,
}

impl SessionBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Initial bindings layered over the IR's declared values.
    pub fn with_vars(mut self, vars: Variables) -> Self {
        self.vars = vars;
        self
    }

    pub fn build(self) -> Session {
        let mut vars = self.ir.vars;
        vars.extend(self.vars);
        let steps = self
            .ir
            .steps
            .into_iter()
            .map(|step| (step.id.clone(), step))
            .collect();
        Session {
            steps,
            evaluator: self.config.evaluator(),
            config: self.config,
            vars,
            current: None,
            history: Vec::new(),
            consumed: FxHashSet::default(),
            transcript: Vec::new(),
            pending: Vec::new(),
            state: SessionState::Ready,
        }
    }
}

/// One interactive session. Owns its variables and history.
pub struct Session {
    steps: FxHashMap<String, Step>,
    config: EngineConfig,
    evaluator: Evaluator,
    vars: Variables,
    current: Option<String>,
    history: Vec<String>,
    /// Single-use options already taken, as (step id, option id).
    consumed: FxHashSet<(String, String)>,
    transcript: Vec<TranscriptEntry>,
    pending: Vec<PresentedOption>,
    state: SessionState,
}

impl Session {
    pub fn builder(ir: ScriptIr) -> SessionBuilder {
        SessionBuilder {
            ir,
            config: EngineConfig::default(),
            vars: Variables::new(),
        }
    }

    /// Enter the configured entry step.
    pub fn start(&mut self) -> Result<Turn, SessionError> {
        match self.state {
            SessionState::Ready => {}
            SessionState::AwaitingChoice => return Err(SessionError::SelectionPending),
            _ => return Err(SessionError::Finished),
        }
        let entry = self.config.entry.clone();
        tracing::debug!(entry = %entry, "session started");
        let mut events = Vec::new();
        let outcome = self.advance(entry, &mut events);
        Ok(Turn { events, outcome })
    }

    /// Select the pending option at `index`.
    pub fn choose(&mut self, index: usize) -> Result<Turn, SessionError> {
        self.ensure_awaiting()?;
        let option = self
            .pending
            .get(index)
            .cloned()
            .ok_or_else(|| SessionError::InvalidChoice(format!("index {}", index)))?;
        self.select(option)
    }

    /// Select the pending option with this id.
    pub fn choose_id(&mut self, id: &str) -> Result<Turn, SessionError> {
        self.ensure_awaiting()?;
        let option = self
            .pending
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or_else(|| SessionError::InvalidChoice(id.to_string()))?;
        self.select(option)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_finished(&self) -> bool {
        !matches!(
            self.state,
            SessionState::Ready | SessionState::AwaitingChoice
        )
    }

    pub fn current_step(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Step ids in visiting order, including silent fallthrough steps.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn vars(&self) -> &Variables {
        &self.vars
    }

    pub fn var(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn pending(&self) -> &[PresentedOption] {
        &self.pending
    }

    fn ensure_awaiting(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::AwaitingChoice => Ok(()),
            SessionState::Ready => Err(SessionError::NoSelectionPending),
            _ => Err(SessionError::Finished),
        }
    }

    fn select(&mut self, option: PresentedOption) -> Result<Turn, SessionError> {
        let Some(step_id) = self.current.clone() else {
            return Err(SessionError::NoSelectionPending);
        };
        let Some(choice) = self
            .steps
            .get(&step_id)
            .and_then(|step| step.options.iter().find(|o| o.id == option.id))
            .cloned()
        else {
            return Err(SessionError::InvalidChoice(option.id));
        };

        if !choice.repeatable {
            self.consumed.insert((step_id.clone(), choice.id.clone()));
        }
        self.pending.clear();
        self.transcript.push(TranscriptEntry::Choice {
            label: option.label.clone(),
        });
        tracing::debug!(step = %step_id, option = %choice.id, "option chosen");

        let mut events = vec![SessionEvent::Chose {
            id: option.id,
            label: option.label,
        }];
        let next = choice.next.unwrap_or(step_id);
        let outcome = self.advance(next, &mut events);
        Ok(Turn { events, outcome })
    }

    /// Walk from `target` until the player is needed or the session stops.
    fn advance(&mut self, target: String, events: &mut Vec<SessionEvent>) -> Outcome {
        let mut next = target;
        let mut auto_steps = 0;

        loop {
            if is_sentinel(&next) {
                tracing::debug!(sentinel = %next, "session ended");
                return self.finish(SessionState::Ended, Outcome::Ended);
            }
            let Some(step) = self.steps.get(&next).cloned() else {
                return self.fault(RuntimeFault::MissingStep(next));
            };
            self.current = Some(step.id.clone());
            self.history.push(step.id.clone());

            let fallthrough = step.is_fallthrough();
            self.run_actions(&step, events);
            if !fallthrough {
                self.render(&step, events);
            }

            let options = self.available_options(&step);
            if !options.is_empty() {
                self.pending = options.clone();
                self.state = SessionState::AwaitingChoice;
                return Outcome::Choices(options);
            }

            match step.divert {
                Some(divert) => {
                    auto_steps += 1;
                    if auto_steps > self.config.max_auto_steps {
                        return self.fault(RuntimeFault::DivertLimit {
                            limit: self.config.max_auto_steps,
                            at: step.id,
                        });
                    }
                    if fallthrough {
                        tracing::debug!(knot = %step.id, to = %divert, "fallthrough");
                    }
                    next = divert;
                }
                None if step.end => {
                    return self.finish(SessionState::Ended, Outcome::Ended);
                }
                None => {
                    tracing::warn!(step = %step.id, "session stuck: no options, divert or end");
                    return self.finish(SessionState::Stuck(step.id.clone()), Outcome::Stuck(step.id));
                }
            }
        }
    }

    fn finish(&mut self, state: SessionState, outcome: Outcome) -> Outcome {
        self.pending.clear();
        self.state = state;
        outcome
    }

    fn fault(&mut self, fault: RuntimeFault) -> Outcome {
        tracing::error!(%fault, "session fault");
        self.finish(SessionState::Faulted(fault.clone()), Outcome::Fault(fault))
    }

    fn run_actions(&mut self, step: &Step, events: &mut Vec<SessionEvent>) {
        for action in &step.actions {
            match action {
                Action::Set { var, expr } => {
                    self.vars.entry(var.clone()).or_insert(Value::Int(0));
                    match self.evaluator.evaluate(expr, &self.vars) {
                        Ok(value) => {
                            tracing::debug!(var = %var, value = %value, "~ set");
                            self.vars.insert(var.clone(), value.clone());
                            events.push(SessionEvent::Assigned {
                                var: var.clone(),
                                value,
                            });
                        }
                        Err(e) => {
                            tracing::warn!(var = %var, expr = %expr, error = %e, "~ set skipped");
                            events.push(SessionEvent::ActionSkipped {
                                action: format!("{} = {}", var, expr),
                                reason: e.to_string(),
                            });
                        }
                    }
                }
                Action::Call { name, args } => {
                    tracing::info!(name = %name, args = %args, "~ call");
                    events.push(SessionEvent::ExternalCall {
                        name: name.clone(),
                        args: args.clone(),
                    });
                }
            }
        }
    }

    fn render_text(&self, raw: &str) -> String {
        TextTemplate::parse(raw).render(
            |name| self.vars.get(name).map(Value::to_string),
            |cond| self.evaluator.condition(cond, &self.vars),
        )
    }

    fn render(&mut self, step: &Step, events: &mut Vec<SessionEvent>) {
        if step.text.is_none() && step.speaker.is_none() {
            return;
        }
        let text = step
            .text
            .as_deref()
            .map(|t| self.render_text(t))
            .unwrap_or_default();
        self.transcript.push(TranscriptEntry::Line {
            speaker: step.speaker.clone(),
            text: text.clone(),
        });
        events.push(SessionEvent::Passage {
            step: step.id.clone(),
            speaker: step.speaker.clone(),
            text,
        });
    }

    fn available_options(&self, step: &Step) -> Vec<PresentedOption> {
        step.options
            .iter()
            .filter(|o| {
                o.repeatable || !self.consumed.contains(&(step.id.clone(), o.id.clone()))
            })
            .enumerate()
            .map(|(index, o)| PresentedOption {
                index,
                id: o.id.clone(),
                label: self.render_text(&o.text),
            })
            .collect()
    }
}
