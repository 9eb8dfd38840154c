//! SQL Token definitions
//!
//! This module defines all tokens that can appear in SQL statements.

use rust_decimal::Decimal;
use std::fmt;

/// SQL Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // ========== Keywords ==========
    // DDL Keywords
    Create,
    Drop,
    Alter,
    Table,
    Index,

    // DML Keywords
    Select,
    Insert,
    Update,
    Delete,
    Into,
    Values,
    Set,
    From,
    Where,

    // Clauses
    And,
    Or,
    Not,
    As,
    On,
    Join,
    Inner,
    Left,
    Right,
    Outer,
    Full,
    Cross,
    Union,

    // Ordering & Grouping
    Order,
    By,
    Asc,
    Desc,
    Group,
    Having,
    Limit,
    Offset,

    // Constraints
    Primary,
    Foreign,
    Key,
    References,
    Unique,
    Check,
    Default,
    Constraint,
    Null,
    Identity,

    // Boolean Literals
    True,
    False,

    // Other Keywords
    Distinct,
    All,
    Exists,
    In,
    Between,
    Like,
    Escape,
    Is,
    If,

    // Session Keywords
    Begin,
    Commit,
    Rollback,
    Transaction,
    Work,
    Declare,
    Autocommit,

    // ========== Literals ==========
    /// Integer literal
    IntegerLiteral(i64),
    /// Exact decimal literal (digits with a fractional part)
    DecimalLiteral(Decimal),
    /// Float literal (scientific notation)
    FloatLiteral(f64),
    /// String literal (single-quoted)
    StringLiteral(String),
    /// Binary literal (X'0AFF')
    HexLiteral(Vec<u8>),
    /// Identifier (table name, column name, etc.)
    Identifier(String),
    /// Declared variable (@name)
    Variable(String),

    // ========== Operators ==========
    /// =
    Eq,
    /// <> or !=
    Neq,
    /// <
    Lt,
    /// >
    Gt,
    /// <=
    Lte,
    /// >=
    Gte,
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Asterisk,
    /// /
    Slash,
    /// %
    Percent,
    /// ||
    Concat,

    // ========== Delimiters ==========
    /// (
    LParen,
    /// )
    RParen,
    /// ,
    Comma,
    /// ;
    Semicolon,
    /// .
    Dot,

    // ========== Special ==========
    /// End of input
    Eof,
}

/// A token with the character position it starts at
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub position: usize,
}

/// Keyword spellings, looked up case-insensitively
const KEYWORDS: &[(&str, Token)] = &[
    ("CREATE", Token::Create),
    ("DROP", Token::Drop),
    ("ALTER", Token::Alter),
    ("TABLE", Token::Table),
    ("INDEX", Token::Index),
    ("SELECT", Token::Select),
    ("INSERT", Token::Insert),
    ("UPDATE", Token::Update),
    ("DELETE", Token::Delete),
    ("INTO", Token::Into),
    ("VALUES", Token::Values),
    ("SET", Token::Set),
    ("FROM", Token::From),
    ("WHERE", Token::Where),
    ("AND", Token::And),
    ("OR", Token::Or),
    ("NOT", Token::Not),
    ("AS", Token::As),
    ("ON", Token::On),
    ("JOIN", Token::Join),
    ("INNER", Token::Inner),
    ("LEFT", Token::Left),
    ("RIGHT", Token::Right),
    ("OUTER", Token::Outer),
    ("FULL", Token::Full),
    ("CROSS", Token::Cross),
    ("UNION", Token::Union),
    ("ORDER", Token::Order),
    ("BY", Token::By),
    ("ASC", Token::Asc),
    ("DESC", Token::Desc),
    ("GROUP", Token::Group),
    ("HAVING", Token::Having),
    ("LIMIT", Token::Limit),
    ("OFFSET", Token::Offset),
    ("PRIMARY", Token::Primary),
    ("FOREIGN", Token::Foreign),
    ("KEY", Token::Key),
    ("REFERENCES", Token::References),
    ("UNIQUE", Token::Unique),
    ("CHECK", Token::Check),
    ("DEFAULT", Token::Default),
    ("CONSTRAINT", Token::Constraint),
    ("NULL", Token::Null),
    ("IDENTITY", Token::Identity),
    ("TRUE", Token::True),
    ("FALSE", Token::False),
    ("DISTINCT", Token::Distinct),
    ("ALL", Token::All),
    ("EXISTS", Token::Exists),
    ("IN", Token::In),
    ("BETWEEN", Token::Between),
    ("LIKE", Token::Like),
    ("ESCAPE", Token::Escape),
    ("IS", Token::Is),
    ("IF", Token::If),
    ("BEGIN", Token::Begin),
    ("COMMIT", Token::Commit),
    ("ROLLBACK", Token::Rollback),
    ("TRANSACTION", Token::Transaction),
    ("WORK", Token::Work),
    ("DECLARE", Token::Declare),
    ("AUTOCOMMIT", Token::Autocommit),
];

impl Token {
    /// Check if this token is a keyword
    pub fn is_keyword(&self) -> bool {
        self.keyword().is_some()
    }

    /// Spelling of a keyword token
    pub fn keyword(&self) -> Option<&'static str> {
        KEYWORDS
            .iter()
            .find(|(_, token)| token == self)
            .map(|(word, _)| *word)
    }

    /// Try to parse a keyword from a string
    pub fn from_keyword(s: &str) -> Option<Token> {
        KEYWORDS
            .iter()
            .find(|(word, _)| word.eq_ignore_ascii_case(s))
            .map(|(_, token)| token.clone())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(word) = self.keyword() {
            return f.write_str(word);
        }
        match self {
            Token::IntegerLiteral(n) => write!(f, "{}", n),
            Token::DecimalLiteral(d) => write!(f, "{}", d),
            Token::FloatLiteral(n) => write!(f, "{:e}", n),
            Token::StringLiteral(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Token::HexLiteral(b) => write!(f, "X'{}'", hex::encode_upper(b)),
            Token::Identifier(s) => write!(f, "{}", s),
            Token::Variable(s) => write!(f, "@{}", s),
            Token::Eq => write!(f, "="),
            Token::Neq => write!(f, "<>"),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Lte => write!(f, "<="),
            Token::Gte => write!(f, ">="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Asterisk => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Concat => write!(f, "||"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
            Token::Dot => write!(f, "."),
            Token::Eof => write!(f, "end of input"),
            keyword => write!(f, "{:?}", keyword),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_parsing() {
        assert_eq!(Token::from_keyword("SELECT"), Some(Token::Select));
        assert_eq!(Token::from_keyword("select"), Some(Token::Select));
        assert_eq!(Token::from_keyword("AutoCommit"), Some(Token::Autocommit));
        assert_eq!(Token::from_keyword("varchar"), None);
        assert_eq!(Token::from_keyword("unknown"), None);
    }

    #[test]
    fn test_is_keyword() {
        assert!(Token::Select.is_keyword());
        assert!(Token::Declare.is_keyword());
        assert!(!Token::Asterisk.is_keyword());
        assert!(!Token::IntegerLiteral(42).is_keyword());
        assert!(!Token::Variable("p1".into()).is_keyword());
    }

    #[test]
    fn test_display() {
        assert_eq!(Token::Variable("x".into()).to_string(), "@x");
        assert_eq!(Token::HexLiteral(vec![0x0a, 0xff]).to_string(), "X'0AFF'");
        assert_eq!(Token::Autocommit.to_string(), "AUTOCOMMIT");
        assert_eq!(Token::StringLiteral("it's".into()).to_string(), "'it''s'");
    }
}
