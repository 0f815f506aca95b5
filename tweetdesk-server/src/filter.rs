//! Typed row filters.
//!
//! Conditions arrive either as text (`subrace = 'Mage' AND count > 3`) or as
//! JSON triples (`[["wallet", "==", "bc1q"]]`). They are evaluated in memory
//! against CSV rows, or turned into a parameterized `WHERE` clause whose
//! columns are checked against an allowlist.

use std::cmp::Ordering;

use regex::{Regex, RegexBuilder};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("no conditions given")]
    Empty,
    #[error("malformed condition '{0}'")]
    Malformed(String),
    #[error("unsupported operator '{0}'")]
    UnknownOperator(String),
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

impl Operator {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "=" | "==" => Some(Operator::Eq),
            "!=" | "<>" => Some(Operator::Ne),
            "<" => Some(Operator::Lt),
            "<=" => Some(Operator::Le),
            ">" => Some(Operator::Gt),
            ">=" => Some(Operator::Ge),
            "like" => Some(Operator::Like),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Like => "LIKE",
        }
    }
}

/// Symbolic operators in the order they must be tried.
const SYMBOLS: [&str; 8] = ["==", "!=", "<>", "<=", ">=", "=", "<", ">"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub column: String,
    pub op: Operator,
    pub value: String,
}

impl Condition {
    pub fn new(column: impl Into<String>, op: Operator, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// Build a condition from the JSON triple form `[column, op, value]`.
    pub fn from_triple(triple: &[Value]) -> Result<Self, FilterError> {
        let [column, op, value] = triple else {
            return Err(FilterError::Malformed(Value::from(triple.to_vec()).to_string()));
        };
        let column = column
            .as_str()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| FilterError::Malformed(column.to_string()))?;
        let op_text = op
            .as_str()
            .ok_or_else(|| FilterError::Malformed(op.to_string()))?;
        let op = Operator::parse(op_text)
            .ok_or_else(|| FilterError::UnknownOperator(op_text.to_string()))?;
        let value = match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        Ok(Self::new(column.trim(), op, value))
    }

    /// Evaluate against a single cell.
    ///
    /// Both sides are compared as numbers when both parse as numbers, and as
    /// text otherwise. `LIKE` is case-insensitive with `%` and `_` wildcards.
    pub fn matches(&self, cell: &str) -> bool {
        if self.op == Operator::Like {
            return like_regex(&self.value)
                .map(|re| re.is_match(cell))
                .unwrap_or(false);
        }

        let ordering = match (cell.trim().parse::<f64>(), self.value.trim().parse::<f64>()) {
            (Ok(a), Ok(b)) => a.partial_cmp(&b),
            _ => Some(cell.cmp(self.value.as_str())),
        };
        let Some(ordering) = ordering else {
            return false;
        };

        match self.op {
            Operator::Eq => ordering == Ordering::Equal,
            Operator::Ne => ordering != Ordering::Equal,
            Operator::Lt => ordering == Ordering::Less,
            Operator::Le => ordering != Ordering::Greater,
            Operator::Gt => ordering == Ordering::Greater,
            Operator::Ge => ordering != Ordering::Less,
            Operator::Like => unreachable!("handled above"),
        }
    }
}

fn like_regex(pattern: &str) -> Option<Regex> {
    let mut expr = String::from("^");
    for c in pattern.chars() {
        match c {
            '%' => expr.push_str(".*"),
            '_' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    RegexBuilder::new(&expr)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .ok()
}

/// Parse `column op value [AND column op value ...]`.
pub fn parse_conditions(input: &str) -> Result<Vec<Condition>, FilterError> {
    if input.trim().is_empty() {
        return Err(FilterError::Empty);
    }
    split_on_and(input)?
        .iter()
        .map(|clause| parse_clause(clause))
        .collect()
}

/// Parse a list of JSON triples.
pub fn conditions_from_triples(triples: &[Value]) -> Result<Vec<Condition>, FilterError> {
    if triples.is_empty() {
        return Err(FilterError::Empty);
    }
    triples
        .iter()
        .map(|t| match t {
            Value::Array(items) => Condition::from_triple(items),
            other => Err(FilterError::Malformed(other.to_string())),
        })
        .collect()
}

fn split_on_and(input: &str) -> Result<Vec<String>, FilterError> {
    let chars: Vec<char> = input.chars().collect();
    let mut clauses = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            current.push(c);
            i += 1;
            continue;
        }
        if c == '\'' || c == '"' {
            quote = Some(c);
            current.push(c);
            i += 1;
            continue;
        }
        if c.is_whitespace() && is_and_keyword(&chars, i + 1) {
            clauses.push(std::mem::take(&mut current));
            i += 4;
            continue;
        }
        current.push(c);
        i += 1;
    }

    if quote.is_some() {
        return Err(FilterError::Malformed(input.to_string()));
    }
    clauses.push(current);
    Ok(clauses)
}

fn is_and_keyword(chars: &[char], at: usize) -> bool {
    let Some(word) = chars.get(at..at + 3) else {
        return false;
    };
    let word: String = word.iter().collect();
    word.eq_ignore_ascii_case("and")
        && chars.get(at + 3).map(|c| c.is_whitespace()).unwrap_or(false)
}

fn parse_clause(clause: &str) -> Result<Condition, FilterError> {
    let clause = clause.trim();
    let malformed = || FilterError::Malformed(clause.to_string());

    let column_len = clause
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map(|(i, _)| i)
        .unwrap_or(clause.len());
    let column = &clause[..column_len];
    if column.is_empty() || column.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(malformed());
    }

    let rest = clause[column_len..].trim_start();
    let (op, rest) = if let Some(symbol) = SYMBOLS.iter().find(|s| rest.starts_with(**s)) {
        let op = Operator::parse(symbol).ok_or_else(malformed)?;
        (op, &rest[symbol.len()..])
    } else if rest
        .get(..4)
        .map(|word| word.eq_ignore_ascii_case("like"))
        .unwrap_or(false)
        && rest[4..].starts_with(|c: char| c.is_whitespace() || c == '\'' || c == '"')
    {
        (Operator::Like, &rest[4..])
    } else {
        let word = rest.split_whitespace().next().unwrap_or(rest);
        return Err(if word.is_empty() {
            malformed()
        } else {
            FilterError::UnknownOperator(word.to_string())
        });
    };

    let value = unquote(rest.trim()).ok_or_else(malformed)?;
    Ok(Condition::new(column, op, value))
}

fn unquote(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    for q in ['\'', '"'] {
        if raw.starts_with(q) {
            if raw.len() < 2 || !raw.ends_with(q) {
                return None;
            }
            let inner = &raw[1..raw.len() - 1];
            let doubled = format!("{q}{q}");
            return Some(inner.replace(&doubled, &q.to_string()));
        }
    }
    Some(raw.to_string())
}

/// Render conditions as a parameterized `WHERE` body.
///
/// Column names are matched case-insensitively against `allowed` and the
/// canonical spelling is emitted; values are returned as bind parameters.
pub fn to_sql(conditions: &[Condition], allowed: &[&str]) -> Result<(String, Vec<String>), FilterError> {
    if conditions.is_empty() {
        return Err(FilterError::Empty);
    }
    let mut clauses = Vec::with_capacity(conditions.len());
    let mut params = Vec::with_capacity(conditions.len());
    for condition in conditions {
        let column = canonical_column(&condition.column, allowed)?;
        clauses.push(format!("{} {} ?", column, condition.op.as_sql()));
        params.push(condition.value.clone());
    }
    Ok((clauses.join(" AND "), params))
}

/// Look up a column name in an allowlist, case-insensitively.
pub fn canonical_column<'a>(column: &str, allowed: &[&'a str]) -> Result<&'a str, FilterError> {
    allowed
        .iter()
        .find(|c| c.eq_ignore_ascii_case(column.trim()))
        .copied()
        .ok_or_else(|| FilterError::UnknownColumn(column.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_single_condition() {
        let conditions = parse_conditions("subrace = 'Mage'").unwrap();
        assert_eq!(conditions, vec![Condition::new("subrace", Operator::Eq, "Mage")]);
    }

    #[test]
    fn test_parse_multiple_conditions() {
        let conditions = parse_conditions("count >= 3 and wallet != \"bc1q\" AND content LIKE '%dragon%'").unwrap();
        assert_eq!(
            conditions,
            vec![
                Condition::new("count", Operator::Ge, "3"),
                Condition::new("wallet", Operator::Ne, "bc1q"),
                Condition::new("content", Operator::Like, "%dragon%"),
            ]
        );
    }

    #[test]
    fn test_and_inside_quotes_is_part_of_value() {
        let conditions = parse_conditions("content = 'salt and pepper'").unwrap();
        assert_eq!(conditions[0].value, "salt and pepper");
    }

    #[test]
    fn test_doubled_quote_is_unescaped() {
        let conditions = parse_conditions("content = 'it''s'").unwrap();
        assert_eq!(conditions[0].value, "it's");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_conditions("   "), Err(FilterError::Empty));
        assert!(matches!(parse_conditions("1=1"), Err(FilterError::Malformed(_))));
        assert!(matches!(parse_conditions("wallet = 'open"), Err(FilterError::Malformed(_))));
        assert!(matches!(
            parse_conditions("wallet ~ 'x'"),
            Err(FilterError::UnknownOperator(_))
        ));
        assert!(matches!(parse_conditions("wallet ="), Err(FilterError::Malformed(_))));
    }

    #[test]
    fn test_injection_attempt_stays_a_value() {
        let conditions = parse_conditions("wallet = 'x; DROP TABLE count; --'").unwrap();
        let (sql, params) = to_sql(&conditions, &["wallet"]).unwrap();
        assert_eq!(sql, "wallet = ?");
        assert_eq!(params, vec!["x; DROP TABLE count; --".to_string()]);
    }

    #[test]
    fn test_to_sql_uses_allowlist() {
        let conditions = parse_conditions("SUBRACE = 'Mage' AND count > 2").unwrap();
        let (sql, params) = to_sql(&conditions, &["subrace", "count"]).unwrap();
        assert_eq!(sql, "subrace = ? AND count > ?");
        assert_eq!(params, vec!["Mage".to_string(), "2".to_string()]);

        let bad = parse_conditions("secret = 1").unwrap();
        assert_eq!(
            to_sql(&bad, &["subrace"]),
            Err(FilterError::UnknownColumn("secret".to_string()))
        );
    }

    #[test]
    fn test_triples() {
        let triples = vec![json!(["holders", ">", 10]), json!(["name", "==", "Satoshi"])];
        let conditions = conditions_from_triples(&triples).unwrap();
        assert_eq!(conditions[0], Condition::new("holders", Operator::Gt, "10"));
        assert_eq!(conditions[1], Condition::new("name", Operator::Eq, "Satoshi"));

        assert!(conditions_from_triples(&[json!(["a", "b"])]).is_err());
        assert!(conditions_from_triples(&[json!("a = b")]).is_err());
        assert_eq!(
            conditions_from_triples(&[json!(["a", "~", "b"])]),
            Err(FilterError::UnknownOperator("~".to_string()))
        );
    }

    #[test]
    fn test_matches_numeric_and_text() {
        assert!(Condition::new("n", Operator::Gt, "9").matches("10"));
        assert!(!Condition::new("n", Operator::Gt, "9").matches("8.5"));
        assert!(Condition::new("n", Operator::Eq, "10").matches("10.0"));
        assert!(Condition::new("s", Operator::Lt, "b").matches("a"));
        assert!(Condition::new("s", Operator::Ne, "a").matches("b"));
        assert!(Condition::new("s", Operator::Le, "a").matches("a"));
    }

    #[test]
    fn test_like_matching() {
        let like = Condition::new("s", Operator::Like, "%DRAGON_");
        assert!(like.matches("red dragons"));
        assert!(!like.matches("red dragon"));
        assert!(Condition::new("s", Operator::Like, "a.c").matches("A.C"));
        assert!(!Condition::new("s", Operator::Like, "a.c").matches("abc"));
    }
}
