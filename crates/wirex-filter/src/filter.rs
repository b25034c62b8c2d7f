//! LDAP-style filter expressions over capability attributes

use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

use crate::value::Value;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Unexpected end of filter \"{filter}\"")]
    UnexpectedEnd { filter: String },
    #[error("Expected '{expected}' at position {position} in filter \"{filter}\"")]
    Expected {
        expected: char,
        position: usize,
        filter: String,
    },
    #[error("Missing attribute name at position {position} in filter \"{filter}\"")]
    MissingAttribute { position: usize, filter: String },
    #[error("Invalid operator at position {position} in filter \"{filter}\", expected one of: =, ~=, >=, <=")]
    InvalidOperator { position: usize, filter: String },
    #[error("Unexpected trailing input at position {position} in filter \"{filter}\"")]
    TrailingInput { position: usize, filter: String },
}

/// A parsed filter expression.
///
/// Leaf comparisons coerce the textual operand to the type of the attribute
/// they are evaluated against, so `(version>=1.2)` compares versions when the
/// attribute holds a [`Value::Version`] and strings otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Equal(String, String),
    Approx(String, String),
    GreaterEq(String, String),
    LessEq(String, String),
    Present(String),
    /// `attr=a*b*c`; the parts between wildcards, first and last may be empty
    Substring(String, Vec<String>),
}

impl Filter {
    /// Parse a filter string
    pub fn parse(input: &str) -> Result<Self, FilterError> {
        let mut parser = Parser { input, pos: 0 };
        parser.skip_whitespace();
        let filter = parser.filter()?;
        parser.skip_whitespace();
        if parser.pos < input.len() {
            return Err(FilterError::TrailingInput {
                position: parser.pos,
                filter: input.to_string(),
            });
        }
        Ok(filter)
    }

    /// Build an equality filter
    pub fn equals(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Equal(attribute.into(), value.into())
    }

    /// Build a conjunction, collapsing a single operand
    pub fn all(mut filters: Vec<Filter>) -> Self {
        if filters.len() == 1 {
            filters.remove(0)
        } else {
            Filter::And(filters)
        }
    }

    /// Evaluate the filter against an attribute map
    pub fn matches(&self, attributes: &IndexMap<String, Value>) -> bool {
        self.matches_with(|key| attributes.get(key))
    }

    /// Evaluate the filter using an arbitrary attribute lookup
    pub fn matches_with<'v>(&self, lookup: impl Fn(&str) -> Option<&'v Value>) -> bool {
        self.eval(&lookup)
    }

    fn eval<'v>(&self, lookup: &dyn Fn(&str) -> Option<&'v Value>) -> bool {
        match self {
            Filter::And(filters) => filters.iter().all(|f| f.eval(lookup)),
            Filter::Or(filters) => filters.iter().any(|f| f.eval(lookup)),
            Filter::Not(filter) => !filter.eval(lookup),
            Filter::Present(attr) => lookup(attr.as_str()).is_some(),
            Filter::Equal(attr, operand) => lookup(attr.as_str())
                .map_or(false, |v| compare(v, operand, |o| o == Ordering::Equal)),
            Filter::GreaterEq(attr, operand) => lookup(attr.as_str())
                .map_or(false, |v| compare(v, operand, |o| o != Ordering::Less)),
            Filter::LessEq(attr, operand) => lookup(attr.as_str())
                .map_or(false, |v| compare(v, operand, |o| o != Ordering::Greater)),
            Filter::Approx(attr, operand) => lookup(attr.as_str()).map_or(false, |v| approx(v, operand)),
            Filter::Substring(attr, parts) => {
                lookup(attr.as_str()).map_or(false, |v| substring(v, parts))
            }
        }
    }
}

fn compare(value: &Value, operand: &str, accept: fn(Ordering) -> bool) -> bool {
    match value {
        Value::List(items) => items.iter().any(|item| compare(item, operand, accept)),
        _ => value.compare_operand(operand).map_or(false, accept),
    }
}

fn approx(value: &Value, operand: &str) -> bool {
    fn normalize(s: &str) -> String {
        s.chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect()
    }

    match value {
        Value::String(s) => normalize(s) == normalize(operand),
        Value::List(items) => items.iter().any(|item| approx(item, operand)),
        _ => compare(value, operand, |o| o == Ordering::Equal),
    }
}

fn substring(value: &Value, parts: &[String]) -> bool {
    match value {
        Value::String(s) => substring_match(s, parts),
        Value::List(items) => items.iter().any(|item| substring(item, parts)),
        _ => false,
    }
}

fn substring_match(value: &str, parts: &[String]) -> bool {
    let Some((first, rest)) = parts.split_first() else {
        return false;
    };
    let Some((last, middle)) = rest.split_last() else {
        return value == first;
    };

    let Some(mut remaining) = value.strip_prefix(first.as_str()) else {
        return false;
    };
    for part in middle {
        match remaining.find(part.as_str()) {
            Some(idx) => remaining = &remaining[idx + part.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last.as_str())
}

enum Operator {
    Equal,
    Approx,
    GreaterEq,
    LessEq,
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn unexpected_end(&self) -> FilterError {
        FilterError::UnexpectedEnd {
            filter: self.input.to_string(),
        }
    }

    fn expected(&self, expected: char) -> FilterError {
        FilterError::Expected {
            expected,
            position: self.pos,
            filter: self.input.to_string(),
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), FilterError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.bump();
                Ok(())
            }
            Some(_) => Err(self.expected(expected)),
            None => Err(self.unexpected_end()),
        }
    }

    fn filter(&mut self) -> Result<Filter, FilterError> {
        self.expect('(')?;
        self.skip_whitespace();

        let filter = match self.peek() {
            Some('&') => {
                self.bump();
                Filter::And(self.filter_list()?)
            }
            Some('|') => {
                self.bump();
                Filter::Or(self.filter_list()?)
            }
            Some('!') => {
                self.bump();
                self.skip_whitespace();
                Filter::Not(Box::new(self.filter()?))
            }
            Some(_) => self.item()?,
            None => return Err(self.unexpected_end()),
        };

        self.skip_whitespace();
        self.expect(')')?;
        Ok(filter)
    }

    fn filter_list(&mut self) -> Result<Vec<Filter>, FilterError> {
        let mut filters = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() != Some('(') {
                break;
            }
            filters.push(self.filter()?);
        }

        if filters.is_empty() {
            return match self.peek() {
                Some(_) => Err(self.expected('(')),
                None => Err(self.unexpected_end()),
            };
        }
        Ok(filters)
    }

    fn item(&mut self) -> Result<Filter, FilterError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, '=' | '~' | '<' | '>' | '(' | ')') {
                break;
            }
            self.bump();
        }

        let attribute = self.input[start..self.pos].trim().to_string();
        if attribute.is_empty() {
            return Err(FilterError::MissingAttribute {
                position: start,
                filter: self.input.to_string(),
            });
        }

        let op_pos = self.pos;
        let operator = match self.bump() {
            Some('=') => Operator::Equal,
            Some(c @ ('~' | '<' | '>')) => {
                if self.bump() != Some('=') {
                    return Err(FilterError::InvalidOperator {
                        position: op_pos,
                        filter: self.input.to_string(),
                    });
                }
                match c {
                    '~' => Operator::Approx,
                    '<' => Operator::LessEq,
                    _ => Operator::GreaterEq,
                }
            }
            Some(_) => {
                return Err(FilterError::InvalidOperator {
                    position: op_pos,
                    filter: self.input.to_string(),
                })
            }
            None => return Err(self.unexpected_end()),
        };

        // Text between unescaped wildcards; a value without wildcards has one part.
        let parts = self.value()?;

        Ok(match operator {
            Operator::Equal if parts.len() == 1 => {
                Filter::Equal(attribute, parts.into_iter().next().unwrap_or_default())
            }
            Operator::Equal if parts.len() == 2 && parts.iter().all(|p| p.is_empty()) => {
                Filter::Present(attribute)
            }
            Operator::Equal => Filter::Substring(attribute, parts),
            Operator::Approx => Filter::Approx(attribute, parts.join("*")),
            Operator::GreaterEq => Filter::GreaterEq(attribute, parts.join("*")),
            Operator::LessEq => Filter::LessEq(attribute, parts.join("*")),
        })
    }

    fn value(&mut self) -> Result<Vec<String>, FilterError> {
        let mut parts = Vec::new();
        let mut current = String::new();

        loop {
            match self.peek() {
                None => return Err(self.unexpected_end()),
                Some(')') => break,
                Some('(') => return Err(self.expected(')')),
                Some('\\') => {
                    self.bump();
                    match self.bump() {
                        Some(c) => current.push(c),
                        None => return Err(self.unexpected_end()),
                    }
                }
                Some('*') => {
                    self.bump();
                    parts.push(std::mem::take(&mut current));
                }
                Some(c) => {
                    self.bump();
                    current.push(c);
                }
            }
        }

        parts.push(current);
        Ok(parts)
    }
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '(' | ')' | '*' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::And(filters) => {
                write!(f, "(&")?;
                for filter in filters {
                    write!(f, "{}", filter)?;
                }
                write!(f, ")")
            }
            Filter::Or(filters) => {
                write!(f, "(|")?;
                for filter in filters {
                    write!(f, "{}", filter)?;
                }
                write!(f, ")")
            }
            Filter::Not(filter) => write!(f, "(!{})", filter),
            Filter::Equal(attr, value) => write!(f, "({}={})", attr, escape(value)),
            Filter::Approx(attr, value) => write!(f, "({}~={})", attr, escape(value)),
            Filter::GreaterEq(attr, value) => write!(f, "({}>={})", attr, escape(value)),
            Filter::LessEq(attr, value) => write!(f, "({}<={})", attr, escape(value)),
            Filter::Present(attr) => write!(f, "({}=*)", attr),
            Filter::Substring(attr, parts) => {
                let parts: Vec<String> = parts.iter().map(|p| escape(p)).collect();
                write!(f, "({}={})", attr, parts.join("*"))
            }
        }
    }
}
