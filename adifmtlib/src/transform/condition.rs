//! Record filters written as `FIELD OP VALUE` terms.
//!
//! A [`Filter`] is a disjunction of conjunctions: `--if` and `--if-not`
//! add a term to the current group while `--or-if` and `--or-if-not`
//! start a new one. A value may list alternatives separated by `|` and
//! may name another field as `{NAME}`. An empty value matches a field
//! that is absent or blank.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::AdifError;
use crate::model::{is_valid_name, DataType, Logfile, Record};
use crate::spec::FieldComparator;
use crate::Result;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
        }
    }

    fn accepts(&self, order: Ordering) -> bool {
        match self {
            Op::Eq => order == Ordering::Equal,
            Op::Lt => order == Ordering::Less,
            Op::Le => order != Ordering::Greater,
            Op::Gt => order == Ordering::Greater,
            Op::Ge => order != Ordering::Less,
        }
    }
}

/// Right-hand side of a term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Literal(String),
    /// `{NAME}`: the value of another field in the same record
    Field(String),
}

impl Operand {
    fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        match text.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
            Some(name) => {
                let name = name.trim().to_ascii_uppercase();
                if !is_valid_name(&name) {
                    return Err(AdifError::InvalidFieldName(name));
                }
                Ok(Operand::Field(name))
            }
            None => Ok(Operand::Literal(text.to_string())),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(s) => write!(f, "{s}"),
            Operand::Field(name) => write!(f, "{{{name}}}"),
        }
    }
}

/// A single term such as `BAND=20m|40m` or `TIME_OFF={TIME_ON}`.
#[derive(Debug, Clone)]
pub struct Condition {
    pub field: String,
    pub op: Op,
    pub values: Vec<Operand>,
    pub negated: bool,
    comparator: FieldComparator,
}

impl Condition {
    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.test(record) != self.negated
    }

    fn test(&self, record: &Record) -> bool {
        let actual = record.value(&self.field).trim();
        self.values.iter().any(|operand| {
            let expected = match operand {
                Operand::Literal(s) => s.as_str(),
                Operand::Field(name) => {
                    let v = record.value(name).trim();
                    if v.is_empty() {
                        return false;
                    }
                    v
                }
            };
            if expected.is_empty() {
                return self.op == Op::Eq && actual.is_empty();
            }
            if actual.is_empty() {
                return false;
            }
            if self.op == Op::Eq && matches!(operand, Operand::Literal(_)) && expected.contains('*') {
                return wildcard_match(expected, actual);
            }
            self.op.accepts(self.comparator.compare(actual, expected))
        })
    }
}

impl FromStr for Condition {
    type Err = AdifError;

    fn from_str(s: &str) -> Result<Self> {
        let at = s
            .find(['<', '>', '='])
            .ok_or_else(|| AdifError::Config(format!("condition {s:?} has no operator")))?;
        let rest = &s[at..];
        let (op, len) = if rest.starts_with("<=") {
            (Op::Le, 2)
        } else if rest.starts_with(">=") {
            (Op::Ge, 2)
        } else if rest.starts_with('<') {
            (Op::Lt, 1)
        } else if rest.starts_with('>') {
            (Op::Gt, 1)
        } else {
            (Op::Eq, 1)
        };
        let field = s[..at].trim().to_ascii_uppercase();
        if !is_valid_name(&field) {
            return Err(AdifError::Config(format!("condition {s:?} has an invalid field name")));
        }
        let values = rest[len..]
            .split('|')
            .map(Operand::parse)
            .collect::<Result<Vec<_>>>()?;
        let comparator = FieldComparator::for_field(&field, DataType::Unspecified);
        Ok(Condition {
            field,
            op,
            values,
            negated: false,
            comparator,
        })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "NOT ")?;
        }
        let values: Vec<String> = self.values.iter().map(ToString::to_string).collect();
        write!(f, "{}{}{}", self.field, self.op.as_str(), values.join("|"))
    }
}

/// Case-insensitive match where `*` stands for any run of characters.
fn wildcard_match(pattern: &str, value: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let value = value.to_lowercase();
    let parts: Vec<&str> = pattern.split('*').collect();
    let (first, last) = (parts[0], parts[parts.len() - 1]);
    if !value.starts_with(first) || value.len() < first.len() + last.len() || !value.ends_with(last) {
        return false;
    }
    let mut rest = &value[first.len()..value.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(i) => rest = &rest[i + part.len()..],
            None => return false,
        }
    }
    true
}

/// Any of several groups, each requiring all of its conditions.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    groups: Vec<Vec<Condition>>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a term to the current group.
    pub fn and(mut self, condition: Condition) -> Self {
        match self.groups.last_mut() {
            Some(group) => group.push(condition),
            None => self.groups.push(vec![condition]),
        }
        self
    }

    /// Start a new group with this term.
    pub fn or(mut self, condition: Condition) -> Self {
        self.groups.push(vec![condition]);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// An empty filter matches everything.
    pub fn matches(&self, record: &Record) -> bool {
        self.groups.is_empty() || self.groups.iter().any(|g| g.iter().all(|c| c.matches(record)))
    }

    /// Drop records that do not match.
    pub fn apply(&self, log: &mut Logfile) {
        log.records.retain(|r| self.matches(r));
    }
}
