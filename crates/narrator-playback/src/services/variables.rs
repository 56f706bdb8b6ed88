//! Custom script variables.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use narrator_core::error::EngineError;
use narrator_core::subsystem::StatefulSubsystem;
use narrator_core::value::ScriptValue;

/// Snapshot key of the variable store.
pub const VARIABLES_ID: &str = "variables";

/// Named values assigned by `@set` and read through `{name}` references.
/// Names are case-insensitive.
#[derive(Debug, Default)]
pub struct VariableStore {
    values: RwLock<BTreeMap<String, ScriptValue>>,
}

impl VariableStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ScriptValue> {
        self.read().get(&name.to_ascii_lowercase()).cloned()
    }

    /// Assigns a variable.
    pub fn set(&self, name: &str, value: impl Into<ScriptValue>) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_ascii_lowercase(), value.into());
    }

    /// Copy of every variable.
    #[must_use]
    pub fn all(&self) -> BTreeMap<String, ScriptValue> {
        self.read().clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, ScriptValue>> {
        self.values.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces every `{name}` in `text` with the variable's value.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for an unknown variable or an
    /// unclosed brace.
    pub fn substitute(&self, text: &str) -> Result<String, EngineError> {
        let values = self.read();
        let mut output = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(open) = rest.find('{') {
            output.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| {
                EngineError::Validation(format!("unclosed variable reference in `{text}`"))
            })?;
            let name = after[..close].trim().to_ascii_lowercase();
            let value = values
                .get(&name)
                .ok_or_else(|| EngineError::Validation(format!("unknown variable `{name}`")))?;
            output.push_str(&value.to_string());
            rest = &after[close + 1..];
        }
        output.push_str(rest);
        Ok(output)
    }

    /// Applies `;`-separated assignments: `x=expr`, `x+=expr`, `x-=expr`,
    /// `x++`, `x--`. Statements run in order; a failing statement stops the
    /// rest.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for malformed statements or
    /// type errors.
    pub fn apply(&self, expression: &str) -> Result<(), EngineError> {
        for statement in expression.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (name, value) = self.evaluate_statement(statement)?;
            self.set(&name, value);
        }
        Ok(())
    }

    fn evaluate_statement(&self, statement: &str) -> Result<(String, ScriptValue), EngineError> {
        let values = self.read();
        let current = |name: &str| {
            values
                .get(&name.to_ascii_lowercase())
                .cloned()
                .ok_or_else(|| EngineError::Validation(format!("unknown variable `{name}`")))
        };

        if let Some(name) = statement.strip_suffix("++") {
            let name = variable_name(name)?;
            return Ok((name.clone(), arithmetic('+', current(&name)?, 1.into())?));
        }
        if let Some(name) = statement.strip_suffix("--") {
            let name = variable_name(name)?;
            return Ok((name.clone(), arithmetic('-', current(&name)?, 1.into())?));
        }

        let equals = statement
            .find('=')
            .ok_or_else(|| EngineError::Validation(format!("not an assignment: `{statement}`")))?;
        let (target, expr) = (&statement[..equals], &statement[equals + 1..]);
        let rhs = evaluate(expr, &values)?;
        if let Some(name) = target.strip_suffix('+') {
            let name = variable_name(name)?;
            return Ok((name.clone(), arithmetic('+', current(&name)?, rhs)?));
        }
        if let Some(name) = target.strip_suffix('-') {
            let name = variable_name(name)?;
            return Ok((name.clone(), arithmetic('-', current(&name)?, rhs)?));
        }
        Ok((variable_name(target)?, rhs))
    }
}

fn variable_name(raw: &str) -> Result<String, EngineError> {
    let name = raw.trim();
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(name.to_ascii_lowercase())
    } else {
        Err(EngineError::Validation(format!("invalid variable name `{name}`")))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Value(ScriptValue),
    Name(String),
    Operator(char),
    Open,
    Close,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, EngineError> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Operator(c));
                chars.next();
            }
            '(' => {
                tokens.push(Token::Open);
                chars.next();
            }
            ')' => {
                tokens.push(Token::Close);
                chars.next();
            }
            '"' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => text.extend(chars.next()),
                        Some(c) => text.push(c),
                        None => {
                            return Err(EngineError::Validation(format!(
                                "unterminated string in `{expr}`"
                            )));
                        }
                    }
                }
                tokens.push(Token::Value(ScriptValue::Text(text)));
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut number = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        number.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match ScriptValue::parse_literal(&number) {
                    ScriptValue::Text(_) => {
                        return Err(EngineError::Validation(format!("invalid number `{number}`")));
                    }
                    value => tokens.push(Token::Value(value)),
                }
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        word.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match ScriptValue::parse_literal(&word) {
                    value @ ScriptValue::Boolean(_) => Token::Value(value),
                    _ => Token::Name(word),
                });
            }
            other => {
                return Err(EngineError::Validation(format!(
                    "unexpected `{other}` in `{expr}`"
                )));
            }
        }
    }
    Ok(tokens)
}

/// Recursive descent over `expr := term (('+'|'-') term)*`,
/// `term := factor (('*'|'/') factor)*`.
struct Evaluator<'a> {
    tokens: &'a [Token],
    position: usize,
    values: &'a BTreeMap<String, ScriptValue>,
}

impl Evaluator<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn expression(&mut self) -> Result<ScriptValue, EngineError> {
        let mut value = self.term()?;
        while let Some(Token::Operator(op @ ('+' | '-'))) = self.peek().cloned() {
            self.position += 1;
            value = arithmetic(op, value, self.term()?)?;
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<ScriptValue, EngineError> {
        let mut value = self.factor()?;
        while let Some(Token::Operator(op @ ('*' | '/'))) = self.peek().cloned() {
            self.position += 1;
            value = arithmetic(op, value, self.factor()?)?;
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<ScriptValue, EngineError> {
        match self.next() {
            Some(Token::Value(value)) => Ok(value),
            Some(Token::Name(name)) => self
                .values
                .get(&name.to_ascii_lowercase())
                .cloned()
                .ok_or_else(|| EngineError::Validation(format!("unknown variable `{name}`"))),
            Some(Token::Operator('-')) => arithmetic('-', ScriptValue::Integer(0), self.factor()?),
            Some(Token::Open) => {
                let value = self.expression()?;
                match self.next() {
                    Some(Token::Close) => Ok(value),
                    _ => Err(EngineError::Validation("missing `)`".to_owned())),
                }
            }
            other => Err(EngineError::Validation(format!(
                "unexpected token {other:?}"
            ))),
        }
    }
}

fn evaluate(
    expr: &str,
    values: &BTreeMap<String, ScriptValue>,
) -> Result<ScriptValue, EngineError> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(EngineError::Validation("empty expression".to_owned()));
    }
    let mut evaluator = Evaluator {
        tokens: &tokens,
        position: 0,
        values,
    };
    let value = evaluator.expression()?;
    if evaluator.position != tokens.len() {
        return Err(EngineError::Validation(format!(
            "unexpected trailing input in `{expr}`"
        )));
    }
    Ok(value)
}

fn arithmetic(op: char, lhs: ScriptValue, rhs: ScriptValue) -> Result<ScriptValue, EngineError> {
    use ScriptValue::{Decimal, Integer, Text};

    let overflow = || EngineError::Validation("integer overflow".to_owned());
    match (op, &lhs, &rhs) {
        ('+', Text(_), _) | ('+', _, Text(_)) => Ok(Text(format!("{lhs}{rhs}"))),
        ('+', Integer(a), Integer(b)) => a.checked_add(*b).map(Integer).ok_or_else(overflow),
        ('-', Integer(a), Integer(b)) => a.checked_sub(*b).map(Integer).ok_or_else(overflow),
        ('*', Integer(a), Integer(b)) => a.checked_mul(*b).map(Integer).ok_or_else(overflow),
        ('/', Integer(_), Integer(0)) => {
            Err(EngineError::Validation("division by zero".to_owned()))
        }
        ('/', Integer(a), Integer(b)) if a.checked_rem(*b) == Some(0) => {
            a.checked_div(*b).map(Integer).ok_or_else(overflow)
        }
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => {
                let value = match op {
                    '+' => a + b,
                    '-' => a - b,
                    '*' => a * b,
                    _ => a / b,
                };
                if value.is_finite() {
                    Ok(Decimal(value))
                } else {
                    Err(EngineError::Validation("result is not a finite number".to_owned()))
                }
            }
            _ => Err(EngineError::Validation(format!(
                "cannot apply `{op}` to `{lhs}` and `{rhs}`"
            ))),
        },
    }
}

#[async_trait]
impl StatefulSubsystem for VariableStore {
    fn subsystem_id(&self) -> &str {
        VARIABLES_ID
    }

    fn save_state(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(&*self.read())?)
    }

    async fn load_state(&self, state: &str) -> Result<(), EngineError> {
        let values: BTreeMap<String, ScriptValue> = serde_json::from_str(state)?;
        *self.values.write().unwrap_or_else(PoisonError::into_inner) = values;
        Ok(())
    }

    async fn reset_state(&self) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
