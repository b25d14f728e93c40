use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::player::{PlayerId, PlayerRecord};

/// Declared type of a single move parameter. Button arguments arrive as
/// strings and are coerced to this type before the engine sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ParamKind {
    Int,
    Float,
    Text,
}

/// Schema for one move parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// One operation a game engine exposes, with its declared parameter schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveSpec {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
    /// Whether this move may only be made by the player whose turn it is.
    pub needs_current_turn: bool,
}

impl MoveSpec {
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// The set of named operations a game engine declares at construction time.
///
/// Moves are invoked through this table only; the session validates and
/// coerces arguments against the declared schema before calling the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoveTable {
    moves: Vec<MoveSpec>,
}

impl MoveTable {
    pub fn new(moves: Vec<MoveSpec>) -> Self {
        Self { moves }
    }

    pub fn get(&self, name: &str) -> Option<&MoveSpec> {
        self.moves.iter().find(|m| m.name == name)
    }

    pub fn moves(&self) -> &[MoveSpec] {
        &self.moves
    }
}

/// A single coerced move argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArgValue {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Argument decoding failures. These are user-visible rejections, not engine
/// faults: no state mutation has happened when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgError {
    #[error("unknown argument '{0}'")]
    UnknownParam(String),
    #[error("missing argument '{0}'")]
    MissingParam(String),
    #[error("argument '{param}' must be a {expected}, got '{got}'")]
    BadValue {
        param: String,
        expected: ParamKind,
        got: String,
    },
}

/// Typed arguments for one move invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveArgs(BTreeMap<String, ArgValue>);

impl MoveArgs {
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.0.get(name)
    }

    pub fn int(&self, name: &str) -> Result<i64, EngineError> {
        match self.get(name) {
            Some(ArgValue::Int(v)) => Ok(*v),
            _ => Err(EngineError::MissingArgument(name.to_string())),
        }
    }

    pub fn float(&self, name: &str) -> Result<f64, EngineError> {
        match self.get(name) {
            Some(ArgValue::Float(v)) => Ok(*v),
            _ => Err(EngineError::MissingArgument(name.to_string())),
        }
    }

    pub fn text(&self, name: &str) -> Result<&str, EngineError> {
        match self.get(name) {
            Some(ArgValue::Text(v)) => Ok(v),
            _ => Err(EngineError::MissingArgument(name.to_string())),
        }
    }

    /// Decode the button wire format (`key=value,key2=value2`) against the
    /// move's declared schema, coercing each string to its parameter type.
    pub fn from_button(spec: &MoveSpec, raw: &str) -> Result<Self, ArgError> {
        let mut args = BTreeMap::new();
        for pair in raw.split(',').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let param = spec
                .param(key)
                .ok_or_else(|| ArgError::UnknownParam(key.to_string()))?;
            args.insert(key.to_string(), coerce(param, value)?);
        }
        ensure_complete(spec, &args)?;
        Ok(Self(args))
    }

    /// Decode already-typed command arguments (JSON values) against the
    /// declared schema. Numbers must arrive as numbers here; only the button
    /// path performs string coercion.
    pub fn from_json(
        spec: &MoveSpec,
        raw: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, ArgError> {
        let mut args = BTreeMap::new();
        for (key, value) in raw {
            let param = spec
                .param(key)
                .ok_or_else(|| ArgError::UnknownParam(key.clone()))?;
            let coerced = match (param.kind, value) {
                (ParamKind::Int, serde_json::Value::Number(n)) => {
                    n.as_i64().map(ArgValue::Int)
                }
                (ParamKind::Float, serde_json::Value::Number(n)) => {
                    n.as_f64().map(ArgValue::Float)
                }
                (ParamKind::Text, serde_json::Value::String(s)) => {
                    Some(ArgValue::Text(s.clone()))
                }
                _ => None,
            };
            let coerced = coerced.ok_or_else(|| ArgError::BadValue {
                param: key.clone(),
                expected: param.kind,
                got: value.to_string(),
            })?;
            args.insert(key.clone(), coerced);
        }
        ensure_complete(spec, &args)?;
        Ok(Self(args))
    }
}

fn coerce(param: &ParamSpec, value: &str) -> Result<ArgValue, ArgError> {
    let bad = || ArgError::BadValue {
        param: param.name.clone(),
        expected: param.kind,
        got: value.to_string(),
    };
    match param.kind {
        ParamKind::Int => value.parse::<i64>().map(ArgValue::Int).map_err(|_| bad()),
        ParamKind::Float => value.parse::<f64>().map(ArgValue::Float).map_err(|_| bad()),
        ParamKind::Text => Ok(ArgValue::Text(value.to_string())),
    }
}

fn ensure_complete(spec: &MoveSpec, args: &BTreeMap<String, ArgValue>) -> Result<(), ArgError> {
    for param in &spec.params {
        if !args.contains_key(&param.name) {
            return Err(ArgError::MissingParam(param.name.clone()));
        }
    }
    Ok(())
}

/// Failure raised by a game engine while applying a move. Caught at the
/// session boundary and surfaced to the acting player; the session stays
/// active.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("invalid move: {0}")]
    InvalidMove(String),
    #[error("unknown move '{0}'")]
    UnknownMove(String),
    #[error("missing or mistyped argument '{0}'")]
    MissingArgument(String),
}

/// Optional structured acknowledgment an engine returns from a move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveReply {
    pub text: String,
}

impl MoveReply {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Kind tag for a render directive; each kind carries a maximum count per
/// state snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum DirectiveKind {
    Field,
    Image,
    Footer,
    Button,
}

impl DirectiveKind {
    /// Maximum number of directives of this kind a single snapshot may carry;
    /// anything beyond the limit is dropped at render time.
    pub fn limit(&self) -> usize {
        match self {
            DirectiveKind::Field => 25,
            DirectiveKind::Image => 1,
            DirectiveKind::Footer => 1,
            DirectiveKind::Button => 25,
        }
    }
}

/// One render instruction emitted by a game engine's state snapshot.
///
/// A closed set of variants: each declares its kind (and thereby its count
/// limit) and which render surface it feeds, checked exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Directive {
    /// Titled text block on the state panel.
    Field {
        name: String,
        value: String,
        inline: bool,
    },
    /// Rendered picture of the game state (PNG bytes).
    Image { png: Vec<u8> },
    /// Footer line on the state panel.
    Footer { text: String },
    /// Interactive control that fires a named move callback when clicked.
    Button {
        label: String,
        callback: String,
        args: BTreeMap<String, String>,
        row: Option<u8>,
        needs_current_turn: bool,
    },
}

impl Directive {
    pub fn kind(&self) -> DirectiveKind {
        match self {
            Directive::Field { .. } => DirectiveKind::Field,
            Directive::Image { .. } => DirectiveKind::Image,
            Directive::Footer { .. } => DirectiveKind::Footer,
            Directive::Button { .. } => DirectiveKind::Button,
        }
    }

    /// Whether this directive contributes to the state panel.
    pub fn feeds_panel(&self) -> bool {
        !matches!(self, Directive::Button { .. })
    }

    /// Whether this directive contributes to the interactive control surface.
    pub fn feeds_controls(&self) -> bool {
        matches!(self, Directive::Button { .. })
    }

    /// Wire encoding of a button's arguments (`key=value,key2=value2`).
    pub fn wire_args(args: &BTreeMap<String, String>) -> String {
        args.iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Terminal outcome reported by a game engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// One player won; everyone else is tied for last.
    Winner(PlayerId),
    /// Ordered tie-groups, best first: `[[p1, p2], [p3]]` means p1 and p2
    /// tied for first and p3 came third.
    Placements(Vec<Vec<PlayerId>>),
    /// The engine hit a game-breaking condition; fatal to the session.
    Failure(String),
}

/// The per-game rule object a session wraps. Implementations own all game
/// state and report turn order, renderable state, and terminal outcomes.
pub trait GameEngine: Send {
    /// The declared move surface, built once at construction.
    fn moves(&self) -> &MoveTable;

    /// The player whose turn it is. Expected to be cheap; it is called on
    /// every move and every repaint.
    fn current_turn(&self) -> PlayerId;

    /// Apply the named move for `player` with already-coerced arguments.
    fn invoke(
        &mut self,
        name: &str,
        player: &PlayerRecord,
        args: &MoveArgs,
    ) -> Result<Option<MoveReply>, EngineError>;

    /// Snapshot of the current game state as render directives.
    fn state(&self) -> Vec<Directive>;

    /// Non-`None` exactly once the game has reached a terminal configuration.
    fn outcome(&self) -> Option<Outcome>;
}
