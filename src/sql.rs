//! Minimal SQL support: table identifiers and single-table SELECT detection.
//!
//! This is deliberately not a SQL parser. The tokenizer here knows just
//! enough to skip string literals, quoted identifiers, comments and
//! parenthesized subqueries so it can read the FROM clause object list of a
//! SELECT statement. Anything referencing more than one table makes the
//! result non-updatable.

use std::fmt;

/// A possibly qualified table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableIdentifier {
    /// Catalog (database) part, if any.
    pub catalog: Option<String>,
    /// Schema part, if any.
    pub schema: Option<String>,
    /// Object name.
    pub name: String,
}

impl TableIdentifier {
    /// Create an unqualified identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            catalog: None,
            schema: None,
            name: name.into(),
        }
    }

    /// Create a schema-qualified identifier.
    pub fn with_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            catalog: None,
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// Parse a dotted identifier: `name`, `schema.name` or
    /// `catalog.schema.name`.
    pub fn parse(text: &str) -> Self {
        let parts: Vec<&str> = text.trim().split('.').collect();
        match parts.as_slice() {
            [catalog, schema, name] => Self {
                catalog: Some(catalog.to_string()),
                schema: Some(schema.to_string()),
                name: name.to_string(),
            },
            [schema, name] => Self::with_schema(*schema, *name),
            _ => Self::new(text.trim()),
        }
    }

    /// Whether the identifier carries a schema.
    pub fn is_qualified(&self) -> bool {
        self.schema.is_some()
    }

    /// Return a copy qualified with the given schema (no-op when already
    /// qualified).
    pub fn qualified_with(&self, schema: &str) -> Self {
        if self.is_qualified() {
            self.clone()
        } else {
            Self {
                catalog: self.catalog.clone(),
                schema: Some(schema.to_string()),
                name: self.name.clone(),
            }
        }
    }

    /// Fully qualified dotted name.
    pub fn qualified_name(&self) -> String {
        let mut out = String::new();
        if let Some(catalog) = &self.catalog {
            out.push_str(catalog);
            out.push('.');
        }
        if let Some(schema) = &self.schema {
            out.push_str(schema);
            out.push('.');
        }
        out.push_str(&self.name);
        out
    }

    /// Case-insensitive comparison on all parts.
    pub fn matches(&self, other: &TableIdentifier) -> bool {
        fn eq_opt(a: &Option<String>, b: &Option<String>) -> bool {
            match (a, b) {
                (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
                (None, None) => true,
                _ => false,
            }
        }
        self.name.eq_ignore_ascii_case(&other.name)
            && eq_opt(&self.schema, &other.schema)
            && eq_opt(&self.catalog, &other.catalog)
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}

/// One object referenced in a FROM clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReference {
    /// The referenced table.
    pub table: TableIdentifier,
    /// Alias, when one was given.
    pub alias: Option<String>,
}

/// Lexer token kinds we distinguish.
#[derive(Debug, PartialEq)]
enum Token {
    Word(String),
    Comma,
    OpenParen,
    CloseParen,
    Other,
}

/// Tokenize just enough SQL: words, commas, parens. String literals,
/// quoted identifiers and comments are consumed as single tokens.
fn tokenize(sql: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' => tokens.push(Token::OpenParen),
            ')' => tokens.push(Token::CloseParen),
            ',' => tokens.push(Token::Comma),
            '\'' => {
                // String literal, '' escapes a quote.
                while let Some(c) = chars.next() {
                    if c == '\'' {
                        if chars.peek() == Some(&'\'') {
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
                tokens.push(Token::Other);
            }
            '"' => {
                let mut word = String::new();
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                    word.push(c);
                }
                tokens.push(Token::Word(word));
            }
            '-' if chars.peek() == Some(&'-') => {
                // Line comment.
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            c if c.is_alphanumeric() || c == '_' || c == '.' || c == '$' => {
                let mut word = String::new();
                word.push(c);
                while let Some(&next) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' || next == '.' || next == '$' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Word(word));
            }
            _ => tokens.push(Token::Other),
        }
    }
    tokens
}

const JOIN_KEYWORDS: &[&str] = &[
    "join", "inner", "left", "right", "full", "cross", "natural", "outer",
];

const FROM_TERMINATORS: &[&str] = &[
    "where", "group", "having", "order", "limit", "offset", "union", "intersect", "except",
    "fetch", "for", "window",
];

/// Extract the FROM clause object references of a SELECT statement.
///
/// Returns an empty list when the statement is not a SELECT. Joins count as
/// additional references; subqueries in the FROM clause yield none.
pub fn table_references(sql: &str) -> Vec<TableReference> {
    let tokens = tokenize(sql);
    let mut refs = Vec::new();

    let is_select = matches!(tokens.first(), Some(Token::Word(w)) if w.eq_ignore_ascii_case("select") || w.eq_ignore_ascii_case("with"));
    if !is_select {
        return refs;
    }

    // Find the FROM of the outermost SELECT (depth 0).
    let mut depth = 0usize;
    let mut idx = None;
    for (i, tok) in tokens.iter().enumerate() {
        match tok {
            Token::OpenParen => depth += 1,
            Token::CloseParen => depth = depth.saturating_sub(1),
            Token::Word(w) if depth == 0 && w.eq_ignore_ascii_case("from") => {
                idx = Some(i + 1);
                break;
            }
            _ => {}
        }
    }
    let Some(mut i) = idx else {
        return refs;
    };

    // Read the object list: name [alias] [, name [alias]]... and any JOINs.
    let mut expect_table = true;
    while i < tokens.len() {
        match &tokens[i] {
            Token::Word(w) => {
                let lower = w.to_lowercase();
                if FROM_TERMINATORS.contains(&lower.as_str()) {
                    break;
                }
                if JOIN_KEYWORDS.contains(&lower.as_str()) {
                    expect_table = lower == "join";
                    i += 1;
                    continue;
                }
                if lower == "on" || lower == "using" {
                    // Skip join conditions until the next JOIN keyword or
                    // terminator.
                    i += 1;
                    while i < tokens.len() {
                        if let Token::Word(w) = &tokens[i] {
                            let lw = w.to_lowercase();
                            if JOIN_KEYWORDS.contains(&lw.as_str())
                                || FROM_TERMINATORS.contains(&lw.as_str())
                            {
                                break;
                            }
                        }
                        i += 1;
                    }
                    continue;
                }
                if expect_table {
                    refs.push(TableReference {
                        table: TableIdentifier::parse(w),
                        alias: None,
                    });
                    expect_table = false;
                } else if lower != "as" {
                    // Alias for the previous reference.
                    if let Some(last) = refs.last_mut() {
                        if last.alias.is_none() {
                            last.alias = Some(w.clone());
                        }
                    }
                }
                i += 1;
            }
            Token::Comma => {
                expect_table = true;
                i += 1;
            }
            Token::OpenParen => {
                // Subquery or derived table: skip it, it is not an updatable
                // base object but still counts as a reference.
                let mut depth = 1usize;
                i += 1;
                while i < tokens.len() && depth > 0 {
                    match &tokens[i] {
                        Token::OpenParen => depth += 1,
                        Token::CloseParen => depth -= 1,
                        _ => {}
                    }
                    i += 1;
                }
                refs.push(TableReference {
                    table: TableIdentifier::new(""),
                    alias: None,
                });
                expect_table = false;
            }
            _ => {
                i += 1;
            }
        }
    }
    refs
}

/// The single table of a single-table SELECT, if there is exactly one.
pub fn table_of_select(sql: &str) -> Option<TableIdentifier> {
    let refs = table_references(sql);
    match refs.as_slice() {
        [single] if !single.table.name.is_empty() => Some(single.table.clone()),
        _ => None,
    }
}

/// Number of objects referenced by the FROM clause.
pub fn referenced_table_count(sql: &str) -> usize {
    table_references(sql).len()
}
