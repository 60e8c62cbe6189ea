/// Script compiler — turns script text into step IR.
///
/// One forward pass classifies logical lines and accumulates content into the
/// open container; a container is flushed into a [`Step`] when the next header
/// opens or input ends. Targets are then resolved in a post-pass over the
/// complete step set, and bare knots fall through into their first stitch.
///
/// The compiler never rejects input. Malformed headers become text, content
/// outside any knot is dropped and unresolvable targets are kept verbatim for
/// the validator or the runtime to report.

use crate::core::line::{classify, Line};
use crate::core::normalize::normalize;
use crate::core::resolve::{is_sentinel, normalize_target, resolve_target, StepIds};
use crate::schema::ir::{knot_of, Action, ChoiceOption, IrError, ScriptIr, Step, IR_FORMAT};
use crate::schema::symbols::{count_args, SymbolTable};
use crate::schema::value::Value;

/// Choice as written, before target normalisation.
#[derive(Debug, Clone)]
struct RawChoice {
    label: String,
    target: Option<String>,
    repeatable: bool,
}

/// Content gathered for the open container.
#[derive(Debug, Default)]
struct StepBuffer {
    text: Vec<String>,
    choices: Vec<RawChoice>,
    divert: Option<String>,
    actions: Vec<Action>,
}

/// Compiler state for one pass. Build a fresh one per document.
#[derive(Debug, Default)]
pub struct Compiler {
    symbols: SymbolTable,
    /// Id of the open container: `knot` or `knot.stitch`.
    open: Option<String>,
    buffer: StepBuffer,
    steps: Vec<Step>,
    order: Vec<String>,
}

/// Compile script text into IR.
pub fn compile(source: &str) -> ScriptIr {
    Compiler::default().compile(source)
}

/// Compile script text straight to pretty-printed IR JSON.
pub fn compile_to_json(source: &str) -> Result<String, IrError> {
    compile(source).to_json()
}

impl Compiler {
    pub fn compile(mut self, source: &str) -> ScriptIr {
        for logical in normalize(source) {
            self.feed(&logical.text);
        }
        self.flush();

        let unresolved = self.resolve_targets();
        self.apply_fallthrough();

        tracing::debug!(
            steps = self.steps.len(),
            knots = self.symbols.knots.len(),
            unresolved,
            "compiled script"
        );

        ScriptIr {
            format: IR_FORMAT.to_string(),
            externals: self.symbols.external_signatures(),
            vars: self.symbols.vars,
            lists: self.symbols.lists,
            order: self.order,
            steps: self.steps,
        }
    }

    fn feed(&mut self, text: &str) {
        match classify(text) {
            Line::Blank => {}
            Line::KnotHeader(name) => {
                self.flush();
                self.symbols.knots.insert(name.to_string());
                self.open = Some(name.to_string());
            }
            Line::StitchHeader(name) => {
                let knot = self.open.as_deref().map(|id| knot_of(id).to_string());
                self.flush();
                match knot {
                    Some(knot) => {
                        let id = format!("{}.{}", knot, name);
                        self.symbols.stitches.insert(id.clone());
                        self.open = Some(id);
                    }
                    None => {
                        tracing::debug!(stitch = name, "stitch header outside any knot ignored");
                        self.open = None;
                    }
                }
            }
            Line::MalformedKnotHeader(_) | Line::MalformedStitchHeader(_) => {
                self.buffer.text.push(text.trim().to_string());
            }
            Line::VarDecl { name, value } => {
                self.symbols.declare_var(name, Value::parse_literal(value));
            }
            Line::ListDecl { name, items } => {
                self.symbols
                    .lists
                    .insert(name.to_string(), items.into_iter().map(str::to_string).collect());
            }
            Line::ExternalDecl { name, params } => {
                self.symbols.externals.insert(name.to_string(), count_args(params));
            }
            Line::Choice {
                repeatable,
                label,
                target,
            } => self.buffer.choices.push(RawChoice {
                label: label.to_string(),
                target: target.map(str::to_string),
                repeatable,
            }),
            Line::Divert(target) => self.buffer.divert = Some(target.to_string()),
            Line::Assignment { var, expr } => self.buffer.actions.push(Action::Set {
                var: var.to_string(),
                expr: expr.to_string(),
            }),
            Line::Call { name, args } => self.buffer.actions.push(Action::Call {
                name: name.to_string(),
                args: args.to_string(),
            }),
            Line::Text(line) => self.buffer.text.push(line.to_string()),
        }
    }

    /// Close the open container and record it as a step. Content gathered
    /// while no container is open is discarded.
    fn flush(&mut self) {
        let buffer = std::mem::take(&mut self.buffer);
        let Some(id) = self.open.take() else {
            return;
        };
        let knot = knot_of(&id).to_string();
        let normalize = |target: &str| normalize_target(target, Some(knot.as_str()), &self.symbols);

        let mut step = Step::new(id.clone());

        let raw: Vec<&str> = buffer
            .text
            .iter()
            .map(String::as_str)
            .filter(|t| !t.trim().is_empty())
            .collect();
        if !raw.is_empty() {
            let raw = raw.join("\n");
            match split_speaker(&raw) {
                Some((speaker, text)) => {
                    step.speaker = Some(speaker.to_string());
                    step.text = Some(text.to_string());
                }
                None => step.text = Some(raw.clone()),
            }
            step.text_raw = Some(raw);
        }

        step.options = buffer
            .choices
            .iter()
            .enumerate()
            .map(|(i, choice)| ChoiceOption {
                id: format!("opt_{}", i + 1),
                text: choice.label.clone(),
                next: choice.target.as_deref().map(&normalize),
                repeatable: choice.repeatable,
            })
            .collect();

        if let Some(divert) = buffer.divert.as_deref() {
            step.end = is_sentinel(divert);
            step.divert = Some(normalize(divert));
        }
        step.actions = buffer.actions;

        match self.steps.iter_mut().find(|s| s.id == id) {
            Some(existing) => *existing = step,
            None => {
                self.order.push(id);
                self.steps.push(step);
            }
        }
    }

    /// Resolve every recorded target against the full step set. Returns how
    /// many stayed unresolved.
    fn resolve_targets(&mut self) -> usize {
        let index = StepIds::new(self.steps.iter().map(|s| s.id.as_str()));
        let mut unresolved = 0;

        for step in &mut self.steps {
            let source = step.id.clone();
            let targets = step
                .options
                .iter_mut()
                .filter_map(|opt| opt.next.as_mut())
                .chain(step.divert.as_mut());
            for target in targets {
                let resolution = resolve_target(target, &source, &index);
                if !resolution.is_resolved() {
                    tracing::debug!(step = %source, to = %target, "target left unresolved");
                    unresolved += 1;
                }
                *target = resolution.into_target();
            }
        }
        unresolved
    }

    /// Give every empty knot a divert into its first stitch.
    fn apply_fallthrough(&mut self) {
        let entries: Vec<(usize, String)> = self
            .steps
            .iter()
            .enumerate()
            .filter(|(_, step)| !step.is_stitch() && step.is_empty())
            .filter_map(|(i, step)| self.first_stitch(&step.id).map(|child| (i, child)))
            .collect();

        for (i, child) in entries {
            tracing::trace!(knot = %self.steps[i].id, stitch = %child, "auto-fallthrough");
            self.steps[i].divert = Some(child);
        }
    }

    /// First stitch of a knot: one named `start`, else the first in
    /// declaration order, else the lexicographically smallest.
    fn first_stitch(&self, knot: &str) -> Option<String> {
        let prefix = format!("{}.", knot);
        let start = format!("{}start", prefix);
        if self.steps.iter().any(|s| s.id == start) {
            return Some(start);
        }
        if let Some(id) = self.order.iter().find(|id| id.starts_with(&prefix)) {
            return Some(id.clone());
        }
        self.steps
            .iter()
            .map(|s| &s.id)
            .filter(|id| id.starts_with(&prefix))
            .min()
            .cloned()
    }
}

/// Split a `Speaker: utterance` block. The label is everything before the
/// first `:` on the first line.
fn split_speaker(raw: &str) -> Option<(&str, &str)> {
    let first_line = raw.lines().next()?;
    let colon = first_line.find(':')?;
    let speaker = first_line[..colon].trim();
    if speaker.is_empty() {
        return None;
    }
    Some((speaker, raw[colon + 1..].trim()))
}
