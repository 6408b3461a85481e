/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Encoding rules for custom expression kinds.
 *
 * A custom expression is either emitted under a native intrinsic name, or
 * lowered at build time into the built-in algebra before being encoded.
 */

use std::fmt;

use crate::error::SerializationError;
use crate::template::value::{equals, Expr, Value, CONTAINS};

/// Most operands the interpreter accepts in one `Fn::Or`.
pub const MAX_OR_OPERANDS: usize = 10;

/// Build-time rewrite of a custom payload into built-in expressions.
pub type Lowering = fn(&str, &Value) -> Result<Value, SerializationError>;

/// How one custom tag is encoded.
#[derive(Clone, Copy)]
pub enum Encoding {
    /// `{"<name>": payload}`, payload encoded as-is.
    Intrinsic(&'static str),
    /// Rewrite the payload, then encode the result.
    Lowered(Lowering),
}

impl fmt::Debug for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Intrinsic(name) => f.debug_tuple("Intrinsic").field(name).finish(),
            Self::Lowered(_) => f.write_str("Lowered(..)"),
        }
    }
}

/// Registry of encodings keyed by custom tag.
#[derive(Debug, Clone, Default)]
pub struct Encoders {
    rules: Vec<(String, Encoding)>,
}

impl Encoders {
    /// An empty registry: every custom expression fails to encode.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Membership tests emitted as the native `Fn::Contains` rule intrinsic.
    #[must_use]
    pub fn standard() -> Self {
        Self::empty().with(CONTAINS, Encoding::Intrinsic("Fn::Contains"))
    }

    /// Membership tests lowered to `Fn::Or` over `Fn::Equals`.
    #[must_use]
    pub fn portable() -> Self {
        Self::empty().with(CONTAINS, Encoding::Lowered(lower_contains))
    }

    /// Register (or replace) the encoding of a tag.
    #[must_use]
    pub fn with(mut self, tag: &str, encoding: Encoding) -> Self {
        self.register(tag, encoding);
        self
    }

    pub fn register(&mut self, tag: &str, encoding: Encoding) {
        match self.rules.iter_mut().find(|(t, _)| t == tag) {
            Some(slot) => slot.1 = encoding,
            None => self.rules.push((tag.to_string(), encoding)),
        }
    }

    /// # Errors
    ///
    /// Returns `SerializationError::UnknownExpression` for an unregistered tag.
    pub fn get(&self, tag: &str) -> Result<Encoding, SerializationError> {
        self.rules
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, encoding)| *encoding)
            .ok_or_else(|| SerializationError::UnknownExpression(tag.to_string()))
    }
}

/// `[list, value]` to `value == list[0] || value == list[1] || ...`.
fn lower_contains(tag: &str, payload: &Value) -> Result<Value, SerializationError> {
    let malformed = |reason: &str| SerializationError::MalformedPayload {
        tag: tag.to_string(),
        reason: reason.to_string(),
    };

    let [list, value] = payload
        .as_list()
        .ok_or_else(|| malformed("expected a [list, value] pair"))?
    else {
        return Err(malformed("expected a [list, value] pair"));
    };
    let items = list
        .as_list()
        .ok_or_else(|| malformed("first operand must be a literal list"))?;
    if items.is_empty() {
        return Err(malformed("the list is empty"));
    }

    let operands = items
        .iter()
        .map(|item| equals(value.clone(), item.clone()))
        .collect();
    Ok(any_of(operands))
}

/// Disjunction of `operands`, nesting `Fn::Or` so no node exceeds the operand limit.
fn any_of(mut operands: Vec<Value>) -> Value {
    while operands.len() > MAX_OR_OPERANDS {
        operands = operands
            .chunks(MAX_OR_OPERANDS)
            .map(|chunk| collapse(chunk.to_vec()))
            .collect();
    }
    collapse(operands)
}

fn collapse(mut operands: Vec<Value>) -> Value {
    if operands.len() == 1 {
        if let Some(single) = operands.pop() {
            return single;
        }
    }
    Expr::Or(operands).into()
}
