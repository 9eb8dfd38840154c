//! SQL Parser
//!
//! This module parses SQL tokens into an AST. A batch is parsed completely
//! before anything runs, so a syntax error anywhere rejects the whole batch.

use bytes::Bytes;

use super::ast::*;
use super::lexer::Lexer;
use super::token::{SpannedToken, Token};
use crate::catalog::DataType;
use crate::error::{Error, Result};
use crate::storage::Value;
use crate::transaction::IsolationLevel;

/// Scalar functions the executor knows how to evaluate
const FUNCTIONS: &[&str] = &[
    "UPPER", "LOWER", "LENGTH", "LEN", "COALESCE", "IDENTITY", "NEWID", "NOW", "GETDATE",
];

/// SQL Parser
pub struct Parser {
    tokens: Vec<SpannedToken>,
    position: usize,
}

impl Parser {
    /// Create a new parser from a SQL string
    pub fn new(sql: &str) -> Result<Self> {
        let mut lexer = Lexer::new(sql);
        let tokens = lexer.tokenize()?;

        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Parse a single SQL statement
    pub fn parse(&mut self) -> Result<Statement> {
        let stmt = self.parse_statement()?;

        match self.current() {
            Token::Semicolon => {
                self.advance();
                Ok(stmt)
            }
            Token::Eof => Ok(stmt),
            _ => Err(self.unexpected("';' or end of input")),
        }
    }

    /// Parse every `;`-separated statement of a batch. Empty statements are
    /// skipped.
    pub fn parse_all(&mut self) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();

        loop {
            while self.check(&Token::Semicolon) {
                self.advance();
            }
            if self.is_at_end() {
                break;
            }
            statements.push(self.parse()?);
        }

        Ok(statements)
    }

    /// Parse a single statement
    fn parse_statement(&mut self) -> Result<Statement> {
        match self.current() {
            Token::Select => self.parse_select().map(Statement::Select),
            Token::Insert => self.parse_insert().map(Statement::Insert),
            Token::Update => self.parse_update().map(Statement::Update),
            Token::Delete => self.parse_delete().map(Statement::Delete),
            Token::Create => self.parse_create(),
            Token::Drop => self.parse_drop(),
            Token::Begin => self.parse_begin(),
            Token::Commit => self.parse_commit(),
            Token::Rollback => self.parse_rollback(),
            Token::Set => self.parse_set(),
            Token::Declare => self.parse_declare(),
            Token::Alter => Err(self.unsupported("ALTER")),
            _ => Err(self.unexpected(
                "SELECT, INSERT, UPDATE, DELETE, CREATE, DROP, BEGIN, COMMIT, ROLLBACK, SET or DECLARE",
            )),
        }
    }

    // ========== SELECT Statement ==========

    fn parse_select(&mut self) -> Result<SelectStatement> {
        self.expect(&Token::Select)?;

        let mut stmt = SelectStatement::default();

        // DISTINCT
        if self.check(&Token::Distinct) {
            self.advance();
            stmt.distinct = true;
        } else if self.check(&Token::All) {
            self.advance();
        }

        // Select list
        stmt.columns = self.parse_select_list()?;

        // FROM clause
        if self.check(&Token::From) {
            stmt.from = Some(self.parse_from_clause()?);
        }

        // WHERE clause
        if self.check(&Token::Where) {
            self.advance();
            stmt.where_clause = Some(self.parse_expr()?);
        }

        if self.check(&Token::Group) {
            return Err(self.unsupported("GROUP BY"));
        }
        if self.check(&Token::Having) {
            return Err(self.unsupported("HAVING"));
        }

        // ORDER BY clause
        if self.check(&Token::Order) {
            self.advance();
            self.expect(&Token::By)?;
            stmt.order_by = self.parse_order_by_list()?;
        }

        // LIMIT clause
        if self.check(&Token::Limit) {
            self.advance();
            stmt.limit = Some(self.parse_expr()?);

            // OFFSET clause
            if self.check(&Token::Offset) {
                self.advance();
                stmt.offset = Some(self.parse_expr()?);
            }
        }

        if self.check(&Token::Union) {
            return Err(self.unsupported("UNION"));
        }

        Ok(stmt)
    }

    fn parse_select_list(&mut self) -> Result<Vec<SelectItem>> {
        let mut items = Vec::new();

        loop {
            items.push(self.parse_select_item()?);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance(); // consume comma
        }

        Ok(items)
    }

    fn parse_select_item(&mut self) -> Result<SelectItem> {
        // Check for *
        if self.check(&Token::Asterisk) {
            self.advance();
            return Ok(SelectItem::Wildcard);
        }

        // Check for table.*
        if let Token::Identifier(name) = self.current().clone() {
            if self.peek() == Some(&Token::Dot) && self.peek_nth(2) == Some(&Token::Asterisk) {
                self.advance(); // identifier
                self.advance(); // dot
                self.advance(); // asterisk
                return Ok(SelectItem::QualifiedWildcard(name));
            }
        }

        // Parse as expression
        let expr = self.parse_expr()?;

        // Column alias, with or without AS
        let alias = if self.check(&Token::As) {
            self.advance();
            Some(self.expect_identifier()?)
        } else if let Token::Identifier(name) = self.current().clone() {
            self.advance();
            Some(name)
        } else {
            None
        };

        Ok(SelectItem::Expr { expr, alias })
    }

    /// FROM names exactly one table, without an alias
    fn parse_from_clause(&mut self) -> Result<String> {
        self.expect(&Token::From)?;

        if self.check(&Token::LParen) {
            return Err(self.unsupported("derived table"));
        }
        let table = self.expect_identifier()?;

        match self.current() {
            Token::As | Token::Identifier(_) => Err(self.unsupported("table alias")),
            Token::Comma => Err(self.unsupported("multiple tables in FROM")),
            Token::Join | Token::Inner | Token::Left | Token::Right | Token::Full | Token::Cross => {
                Err(self.unsupported("JOIN"))
            }
            _ => Ok(table),
        }
    }

    fn parse_order_by_list(&mut self) -> Result<Vec<OrderByItem>> {
        let mut items = Vec::new();

        loop {
            let expr = self.parse_expr()?;
            let ascending = if self.check(&Token::Desc) {
                self.advance();
                false
            } else {
                if self.check(&Token::Asc) {
                    self.advance();
                }
                true
            };

            items.push(OrderByItem { expr, ascending });

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(items)
    }

    // ========== INSERT Statement ==========

    fn parse_insert(&mut self) -> Result<InsertStatement> {
        self.expect(&Token::Insert)?;
        self.expect(&Token::Into)?;

        let table_name = self.expect_identifier()?;

        // Optional column list
        let columns = if self.check(&Token::LParen) {
            self.advance();
            let cols = self.parse_identifier_list()?;
            self.expect(&Token::RParen)?;
            Some(cols)
        } else {
            None
        };

        if self.check(&Token::Select) {
            return Err(self.unsupported("INSERT ... SELECT"));
        }
        self.expect(&Token::Values)?;

        // Parse value rows
        let mut values = Vec::new();
        loop {
            self.expect(&Token::LParen)?;
            let row = self.parse_expr_list()?;
            self.expect(&Token::RParen)?;
            values.push(row);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(InsertStatement {
            table_name,
            columns,
            values,
        })
    }

    // ========== UPDATE Statement ==========

    fn parse_update(&mut self) -> Result<UpdateStatement> {
        self.expect(&Token::Update)?;

        let table_name = self.expect_identifier()?;

        self.expect(&Token::Set)?;

        let mut assignments = Vec::new();
        loop {
            let column = self.expect_identifier()?;
            self.expect(&Token::Eq)?;
            let value = self.parse_expr()?;
            assignments.push(Assignment { column, value });

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        let where_clause = self.parse_optional_where()?;

        Ok(UpdateStatement {
            table_name,
            assignments,
            where_clause,
        })
    }

    // ========== DELETE Statement ==========

    fn parse_delete(&mut self) -> Result<DeleteStatement> {
        self.expect(&Token::Delete)?;
        self.expect(&Token::From)?;

        let table_name = self.expect_identifier()?;
        let where_clause = self.parse_optional_where()?;

        Ok(DeleteStatement {
            table_name,
            where_clause,
        })
    }

    fn parse_optional_where(&mut self) -> Result<Option<Expr>> {
        if self.check(&Token::Where) {
            self.advance();
            Ok(Some(self.parse_expr()?))
        } else {
            Ok(None)
        }
    }

    // ========== CREATE Statement ==========

    fn parse_create(&mut self) -> Result<Statement> {
        self.expect(&Token::Create)?;

        match self.current() {
            Token::Table => self.parse_create_table().map(Statement::CreateTable),
            Token::Index | Token::Unique => self.parse_create_index().map(Statement::CreateIndex),
            _ => Err(self.unexpected("TABLE or INDEX")),
        }
    }

    fn parse_create_table(&mut self) -> Result<CreateTableStatement> {
        self.expect(&Token::Table)?;

        let if_not_exists = if self.check(&Token::If) {
            self.advance();
            self.expect(&Token::Not)?;
            self.expect(&Token::Exists)?;
            true
        } else {
            false
        };

        let table_name = self.expect_identifier()?;

        self.expect(&Token::LParen)?;

        let mut columns = Vec::new();
        let mut constraints = Vec::new();

        loop {
            // Check for table constraint
            if self.check(&Token::Primary)
                || self.check(&Token::Foreign)
                || self.check(&Token::Unique)
                || self.check(&Token::Check)
                || self.check(&Token::Constraint)
            {
                constraints.push(self.parse_table_constraint()?);
            } else {
                columns.push(self.parse_column_def()?);
            }

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        self.expect(&Token::RParen)?;

        Ok(CreateTableStatement {
            table_name,
            columns,
            constraints,
            if_not_exists,
        })
    }

    fn parse_create_index(&mut self) -> Result<CreateIndexStatement> {
        let unique = if self.check(&Token::Unique) {
            self.advance();
            true
        } else {
            false
        };

        self.expect(&Token::Index)?;

        let index_name = self.expect_identifier()?;
        self.expect(&Token::On)?;
        let table_name = self.expect_identifier()?;

        self.expect(&Token::LParen)?;
        let columns = self.parse_identifier_list()?;
        self.expect(&Token::RParen)?;

        Ok(CreateIndexStatement {
            index_name,
            table_name,
            columns,
            unique,
        })
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef> {
        let name = self.expect_identifier()?;
        let data_type = self.parse_data_type()?;

        let mut def = ColumnDef {
            name,
            data_type,
            not_null: false,
            default: None,
            primary_key: false,
            unique: false,
            identity: false,
        };

        // Parse column constraints
        loop {
            match self.current() {
                Token::Not => {
                    self.advance();
                    self.expect(&Token::Null)?;
                    def.not_null = true;
                }
                Token::Null => {
                    self.advance();
                }
                Token::Default => {
                    self.advance();
                    def.default = Some(self.parse_unary_expr()?);
                }
                Token::Primary => {
                    self.advance();
                    self.expect(&Token::Key)?;
                    def.primary_key = true;
                    def.not_null = true;
                }
                Token::Unique => {
                    self.advance();
                    def.unique = true;
                }
                Token::Identity => {
                    self.advance();
                    // IDENTITY(seed, increment) is accepted only as (1, 1)
                    if self.check(&Token::LParen) {
                        self.advance();
                        let seed = self.expect_integer()?;
                        self.expect(&Token::Comma)?;
                        let step = self.expect_integer()?;
                        self.expect(&Token::RParen)?;
                        if seed != 1 || step != 1 {
                            return Err(self.unsupported("IDENTITY seed or increment"));
                        }
                    }
                    def.identity = true;
                    def.primary_key = true;
                    def.not_null = true;
                }
                Token::References | Token::Check => {
                    return Err(self.unsupported(&self.current().to_string()));
                }
                _ => break,
            }
        }

        Ok(def)
    }

    fn parse_data_type(&mut self) -> Result<DataType> {
        let position = self.current_position();
        let name = match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                name
            }
            _ => return Err(self.unexpected("data type")),
        };

        let mut args = Vec::new();
        if self.check(&Token::LParen) {
            self.advance();
            loop {
                match self.current().clone() {
                    Token::IntegerLiteral(n) if n >= 0 => {
                        self.advance();
                        args.push(n as u64);
                    }
                    // VARCHAR(MAX)
                    Token::Identifier(ref word) if word.eq_ignore_ascii_case("MAX") => {
                        self.advance();
                    }
                    _ => return Err(self.unexpected("type length")),
                }
                if !self.check(&Token::Comma) {
                    break;
                }
                self.advance();
            }
            self.expect(&Token::RParen)?;
        }

        DataType::from_name(&name, &args).map_err(|what| Error::Unsupported { what, position })
    }

    fn parse_table_constraint(&mut self) -> Result<TableConstraint> {
        let name = if self.check(&Token::Constraint) {
            self.advance();
            Some(self.expect_identifier()?)
        } else {
            None
        };

        match self.current() {
            Token::Primary => {
                self.advance();
                self.expect(&Token::Key)?;
                self.expect(&Token::LParen)?;
                let columns = self.parse_identifier_list()?;
                self.expect(&Token::RParen)?;
                Ok(TableConstraint::PrimaryKey { name, columns })
            }
            Token::Unique => {
                self.advance();
                self.expect(&Token::LParen)?;
                let columns = self.parse_identifier_list()?;
                self.expect(&Token::RParen)?;
                Ok(TableConstraint::Unique { name, columns })
            }
            Token::Foreign => Err(self.unsupported("FOREIGN KEY")),
            Token::Check => Err(self.unsupported("CHECK")),
            _ => Err(self.unexpected("PRIMARY KEY or UNIQUE")),
        }
    }

    // ========== DROP Statement ==========

    fn parse_drop(&mut self) -> Result<Statement> {
        self.expect(&Token::Drop)?;
        self.expect(&Token::Table)?;

        let if_exists = if self.check(&Token::If) {
            self.advance();
            self.expect(&Token::Exists)?;
            true
        } else {
            false
        };

        let table_name = self.expect_identifier()?;

        Ok(Statement::DropTable(DropTableStatement {
            table_name,
            if_exists,
        }))
    }

    // ========== Session Statements ==========

    fn parse_set(&mut self) -> Result<Statement> {
        self.expect(&Token::Set)?;

        match self.current().clone() {
            Token::Autocommit => {
                self.advance();
                // SET AUTOCOMMIT = TRUE is accepted too
                if self.check(&Token::Eq) {
                    self.advance();
                }
                match self.current() {
                    Token::True => {
                        self.advance();
                        Ok(Statement::SetAutocommit(true))
                    }
                    Token::False => {
                        self.advance();
                        Ok(Statement::SetAutocommit(false))
                    }
                    _ => Err(self.unexpected("TRUE or FALSE")),
                }
            }
            Token::Variable(name) => {
                self.advance();
                self.expect(&Token::Eq)?;
                let value = self.parse_expr()?;
                Ok(Statement::SetVariable { name, value })
            }
            _ => Err(self.unexpected("AUTOCOMMIT or @variable")),
        }
    }

    fn parse_declare(&mut self) -> Result<Statement> {
        self.expect(&Token::Declare)?;

        let name = match self.current().clone() {
            Token::Variable(name) => {
                self.advance();
                name
            }
            _ => return Err(self.unexpected("@variable")),
        };
        if self.check(&Token::As) {
            self.advance();
        }
        let data_type = self.parse_data_type()?;

        Ok(Statement::Declare { name, data_type })
    }

    fn parse_begin(&mut self) -> Result<Statement> {
        self.expect(&Token::Begin)?;
        if self.check(&Token::Transaction) || self.check(&Token::Work) {
            self.advance();
        }

        let isolation = if self.check_word("ISOLATION") {
            self.advance();
            self.expect_word("LEVEL")?;
            Some(self.parse_isolation_level()?)
        } else {
            None
        };

        Ok(Statement::BeginTransaction(isolation))
    }

    fn parse_isolation_level(&mut self) -> Result<IsolationLevel> {
        if self.check_word("READ") {
            self.advance();
            if self.check_word("UNCOMMITTED") {
                self.advance();
                return Ok(IsolationLevel::ReadUncommitted);
            }
            self.expect_word("COMMITTED")?;
            return Ok(IsolationLevel::ReadCommitted);
        }
        if self.check_word("REPEATABLE") {
            self.advance();
            self.expect_word("READ")?;
            return Ok(IsolationLevel::RepeatableRead);
        }
        self.expect_word("SERIALIZABLE")?;
        Ok(IsolationLevel::Serializable)
    }

    fn parse_commit(&mut self) -> Result<Statement> {
        self.expect(&Token::Commit)?;
        if self.check(&Token::Transaction) || self.check(&Token::Work) {
            self.advance();
        }
        Ok(Statement::Commit)
    }

    fn parse_rollback(&mut self) -> Result<Statement> {
        self.expect(&Token::Rollback)?;
        if self.check(&Token::Transaction) || self.check(&Token::Work) {
            self.advance();
        }
        Ok(Statement::Rollback)
    }

    // ========== Expressions ==========

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_and_expr()?;

        while self.check(&Token::Or) {
            self.advance();
            let right = self.parse_and_expr()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::Or,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_not_expr()?;

        while self.check(&Token::And) {
            self.advance();
            let right = self.parse_not_expr()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::And,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_not_expr(&mut self) -> Result<Expr> {
        if self.check(&Token::Not) {
            self.advance();
            let expr = self.parse_not_expr()?;
            Ok(Expr::UnaryOp {
                op: UnaryOperator::Not,
                expr: Box::new(expr),
            })
        } else {
            self.parse_comparison_expr()
        }
    }

    fn parse_comparison_expr(&mut self) -> Result<Expr> {
        let left = self.parse_additive_expr()?;

        // IS NULL / IS NOT NULL
        if self.check(&Token::Is) {
            self.advance();
            if self.check(&Token::Not) {
                self.advance();
                self.expect(&Token::Null)?;
                return Ok(Expr::IsNotNull(Box::new(left)));
            }
            self.expect(&Token::Null)?;
            return Ok(Expr::IsNull(Box::new(left)));
        }

        // NOT BETWEEN, NOT IN, NOT LIKE
        let negated = if self.check(&Token::Not)
            && matches!(
                self.peek(),
                Some(Token::Between) | Some(Token::In) | Some(Token::Like)
            ) {
            self.advance();
            true
        } else {
            false
        };

        match self.current() {
            Token::Between => {
                self.advance();
                let low = self.parse_additive_expr()?;
                self.expect(&Token::And)?;
                let high = self.parse_additive_expr()?;
                return Ok(Expr::Between {
                    expr: Box::new(left),
                    low: Box::new(low),
                    high: Box::new(high),
                    negated,
                });
            }
            Token::In => {
                self.advance();
                self.expect(&Token::LParen)?;
                if self.check(&Token::Select) {
                    let subquery = self.parse_select()?;
                    self.expect(&Token::RParen)?;
                    return Ok(Expr::InSubquery {
                        expr: Box::new(left),
                        subquery: Box::new(subquery),
                        negated,
                    });
                }
                let list = self.parse_expr_list()?;
                self.expect(&Token::RParen)?;
                return Ok(Expr::InList {
                    expr: Box::new(left),
                    list,
                    negated,
                });
            }
            Token::Like => {
                self.advance();
                let pattern = self.parse_additive_expr()?;
                let escape = if self.check(&Token::Escape) {
                    self.advance();
                    Some(self.parse_escape_char()?)
                } else {
                    None
                };
                return Ok(Expr::Like {
                    expr: Box::new(left),
                    pattern: Box::new(pattern),
                    escape,
                    negated,
                });
            }
            _ => {}
        }

        // Comparison operators
        let op = match self.current() {
            Token::Eq => Some(BinaryOperator::Eq),
            Token::Neq => Some(BinaryOperator::Neq),
            Token::Lt => Some(BinaryOperator::Lt),
            Token::Gt => Some(BinaryOperator::Gt),
            Token::Lte => Some(BinaryOperator::Lte),
            Token::Gte => Some(BinaryOperator::Gte),
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            let right = self.parse_additive_expr()?;
            Ok(Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            })
        } else {
            Ok(left)
        }
    }

    fn parse_escape_char(&mut self) -> Result<char> {
        if let Token::StringLiteral(s) = self.current().clone() {
            let mut chars = s.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                self.advance();
                return Ok(c);
            }
        }
        Err(self.unexpected("single-character escape string"))
    }

    fn parse_additive_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative_expr()?;

        loop {
            let op = match self.current() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Sub,
                Token::Concat => BinaryOperator::Concat,
                _ => break,
            };

            self.advance();
            let right = self.parse_multiplicative_expr()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary_expr()?;

        loop {
            let op = match self.current() {
                Token::Asterisk => BinaryOperator::Mul,
                Token::Slash => BinaryOperator::Div,
                Token::Percent => BinaryOperator::Mod,
                _ => break,
            };

            self.advance();
            let right = self.parse_unary_expr()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr> {
        match self.current() {
            Token::Minus => {
                self.advance();
                let expr = self.parse_unary_expr()?;
                // fold negative numeric literals so -2147483648 stays an INT
                if let Expr::Literal(value) = &expr {
                    if let Ok(negated) = value.negate() {
                        return Ok(Expr::Literal(narrow_integer(negated)));
                    }
                }
                Ok(Expr::UnaryOp {
                    op: UnaryOperator::Minus,
                    expr: Box::new(expr),
                })
            }
            Token::Plus => {
                self.advance();
                let expr = self.parse_unary_expr()?;
                Ok(Expr::UnaryOp {
                    op: UnaryOperator::Plus,
                    expr: Box::new(expr),
                })
            }
            _ => self.parse_primary_expr(),
        }
    }

    fn parse_primary_expr(&mut self) -> Result<Expr> {
        match self.current().clone() {
            // Literals
            Token::IntegerLiteral(n) => {
                self.advance();
                Ok(Expr::Literal(narrow_integer(Value::BigInt(n))))
            }
            Token::DecimalLiteral(d) => {
                self.advance();
                Ok(Expr::Literal(Value::Decimal(d)))
            }
            Token::FloatLiteral(n) => {
                self.advance();
                Ok(Expr::Literal(Value::Float(n)))
            }
            Token::StringLiteral(s) => {
                self.advance();
                Ok(Expr::Literal(Value::String(s)))
            }
            Token::HexLiteral(b) => {
                self.advance();
                Ok(Expr::Literal(Value::Blob(Bytes::from(b))))
            }
            Token::True => {
                self.advance();
                Ok(Expr::Literal(Value::Bit(true)))
            }
            Token::False => {
                self.advance();
                Ok(Expr::Literal(Value::Bit(false)))
            }
            Token::Null => {
                self.advance();
                Ok(Expr::Literal(Value::Null))
            }
            Token::Variable(name) => {
                self.advance();
                Ok(Expr::Variable(name))
            }

            // IDENTITY() is a keyword used as a function
            Token::Identity => {
                self.advance();
                self.parse_function("IDENTITY".to_string())
            }

            // Column reference or function call
            Token::Identifier(name) => {
                self.advance();

                if self.check(&Token::LParen) {
                    return self.parse_function(name);
                }

                if self.check(&Token::Dot) {
                    self.advance();
                    let column = self.expect_identifier()?;
                    return Ok(Expr::Column(ColumnRef {
                        table: Some(name),
                        column,
                    }));
                }

                Ok(Expr::Column(ColumnRef::from(name)))
            }

            // EXISTS (subquery)
            Token::Exists => {
                self.advance();
                self.expect(&Token::LParen)?;
                let subquery = self.parse_select()?;
                self.expect(&Token::RParen)?;
                Ok(Expr::Exists(Box::new(subquery)))
            }

            // Parenthesized expression or scalar subquery
            Token::LParen => {
                self.advance();
                if self.check(&Token::Select) {
                    let subquery = self.parse_select()?;
                    self.expect(&Token::RParen)?;
                    return Ok(Expr::Subquery(Box::new(subquery)));
                }
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(Expr::Nested(Box::new(expr)))
            }

            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_function(&mut self, name: String) -> Result<Expr> {
        let position = self.current_position();
        let upper = name.to_ascii_uppercase();
        if !FUNCTIONS.contains(&upper.as_str()) {
            return Err(Error::Unsupported {
                what: format!("function {}", upper),
                position,
            });
        }

        self.expect(&Token::LParen)?;
        let args = if self.check(&Token::RParen) {
            Vec::new()
        } else {
            self.parse_expr_list()?
        };
        self.expect(&Token::RParen)?;

        Ok(Expr::Function { name: upper, args })
    }

    fn parse_expr_list(&mut self) -> Result<Vec<Expr>> {
        let mut exprs = Vec::new();

        loop {
            exprs.push(self.parse_expr()?);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(exprs)
    }

    fn parse_identifier_list(&mut self) -> Result<Vec<String>> {
        let mut identifiers = Vec::new();

        loop {
            identifiers.push(self.expect_identifier()?);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(identifiers)
    }

    // ========== Token helpers ==========

    fn current(&self) -> &Token {
        self.tokens
            .get(self.position)
            .map(|t| &t.token)
            .unwrap_or(&Token::Eof)
    }

    fn current_position(&self) -> usize {
        self.tokens
            .get(self.position)
            .or_else(|| self.tokens.last())
            .map_or(0, |t| t.position)
    }

    fn peek(&self) -> Option<&Token> {
        self.peek_nth(1)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n).map(|t| &t.token)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(token)
    }

    /// Is the current token the given non-reserved word?
    fn check_word(&self, word: &str) -> bool {
        matches!(self.current(), Token::Identifier(s) if s.eq_ignore_ascii_case(word))
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<()> {
        if self.check_word(word) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(word))
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn expect_integer(&mut self) -> Result<i64> {
        match self.current().clone() {
            Token::IntegerLiteral(n) => {
                self.advance();
                Ok(n)
            }
            _ => Err(self.unexpected("integer")),
        }
    }

    fn unexpected(&self, expected: &str) -> Error {
        if self.is_at_end() {
            return Error::UnexpectedEof(expected.to_string());
        }
        Error::UnexpectedToken {
            expected: expected.to_string(),
            found: self.current().to_string(),
            position: self.current_position(),
        }
    }

    fn unsupported(&self, what: &str) -> Error {
        Error::Unsupported {
            what: what.to_string(),
            position: self.current_position(),
        }
    }
}

/// Integer literals that fit are typed INT, wider ones BIGINT
fn narrow_integer(value: Value) -> Value {
    match value {
        Value::BigInt(n) => match i32::try_from(n) {
            Ok(n) => Value::Int(n),
            Err(_) => Value::BigInt(n),
        },
        other => other,
    }
}

/// Parse a batch of `;`-separated statements
pub fn parse_batch(sql: &str) -> Result<Vec<Statement>> {
    Parser::new(sql)?.parse_all()
}
