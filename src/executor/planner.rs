//! Query Planner for QuillDB
//!
//! This module binds parsed statements against the catalog: table and
//! column names become ordinals, variables and `IDENTITY()` become
//! literals, literals compared with typed columns are coerced, and result
//! column types are inferred.

use std::collections::HashSet;

use tracing::trace;

use super::context::Variables;
use super::eval::{like_regex, BoundExpr, Function};
use super::result::ColumnDescriptor;
use crate::catalog::{Catalog, Column, DataType, Schema, TableDef};
use crate::error::{Error, Result};
use crate::sql::ast::*;
use crate::storage::{Store, Value};
use crate::transaction::TxnId;

/// One ORDER BY key, evaluated against the source row
#[derive(Debug, Clone)]
pub struct SortKey {
    pub expr: BoundExpr,
    pub ascending: bool,
}

/// A bound SELECT
#[derive(Debug, Clone)]
pub struct SelectPlan {
    /// Table read, `None` for `SELECT` without `FROM`
    pub table: Option<String>,
    pub filter: Option<BoundExpr>,
    /// One expression per result column
    pub projection: Vec<BoundExpr>,
    pub columns: Vec<ColumnDescriptor>,
    pub distinct: bool,
    pub order_by: Vec<SortKey>,
    pub limit: Option<usize>,
    pub offset: usize,
}

/// A bound INSERT. Every row holds one expression per table column;
/// omitted columns carry their default.
#[derive(Debug, Clone)]
pub struct InsertPlan {
    pub table_name: String,
    pub rows: Vec<Vec<BoundExpr>>,
}

/// A bound UPDATE
#[derive(Debug, Clone)]
pub struct UpdatePlan {
    pub table_name: String,
    /// Column ordinal and its new value
    pub assignments: Vec<(usize, BoundExpr)>,
    pub filter: Option<BoundExpr>,
}

/// A bound DELETE
#[derive(Debug, Clone)]
pub struct DeletePlan {
    pub table_name: String,
    pub filter: Option<BoundExpr>,
}

/// A validated CREATE TABLE
#[derive(Debug, Clone)]
pub struct CreateTablePlan {
    pub name: String,
    pub schema: Schema,
    /// Multi-column UNIQUE constraints, created as indexes
    pub unique_sets: Vec<Vec<String>>,
    pub if_not_exists: bool,
}

/// Logical plan node
#[derive(Debug, Clone)]
pub enum LogicalPlan {
    Select(SelectPlan),
    Insert(InsertPlan),
    Update(UpdatePlan),
    Delete(DeletePlan),
    CreateTable(CreateTablePlan),
    DropTable {
        table_name: String,
        if_exists: bool,
    },
    CreateIndex {
        index_name: String,
        table_name: String,
        columns: Vec<String>,
        unique: bool,
    },
    /// `SET @name = expr`
    SetVariable { name: String, value: BoundExpr },
}

/// Type given to a bare NULL literal
fn null_type() -> DataType {
    DataType::Other("NULL".to_string())
}

/// Types that are not checked at bind time
fn is_untyped(dt: &DataType) -> bool {
    matches!(dt, DataType::Other(_))
}

fn literal_type(value: &Value) -> DataType {
    value.data_type().unwrap_or_else(null_type)
}

fn type_mismatch(from: &DataType, to: &DataType) -> Error {
    Error::TypeMismatch {
        from: from.to_string(),
        to: to.to_string(),
    }
}

/// Result type of an arithmetic operator
fn arithmetic_type(op: BinaryOperator, left: &DataType, right: &DataType) -> Result<DataType> {
    if is_untyped(left) {
        return Ok(right.clone());
    }
    if is_untyped(right) {
        return Ok(left.clone());
    }
    if op == BinaryOperator::Add && left.is_string() && right.is_string() {
        return Ok(DataType::Varchar(None));
    }
    if !(left.is_numeric() && right.is_numeric()) {
        return Err(Error::TypeMismatch {
            from: format!("{} {:?} {}", left, op, right),
            to: "a numeric value".to_string(),
        });
    }

    let dt = match (left, right) {
        (DataType::Float | DataType::Real, _) | (_, DataType::Float | DataType::Real) => {
            DataType::Float
        }
        (DataType::Decimal(_, a), DataType::Decimal(_, b)) => DataType::Decimal(28, (*a).max(*b)),
        (DataType::Decimal(_, s), _) | (_, DataType::Decimal(_, s)) => DataType::Decimal(28, *s),
        (DataType::BigInt, _) | (_, DataType::BigInt) => DataType::BigInt,
        _ => DataType::Int,
    };
    Ok(dt)
}

/// Re-label a length error with the column it was raised for
pub(crate) fn relabel(error: Error, column: &str) -> Error {
    match error {
        Error::ValueTooLarge(_) => Error::ValueTooLarge(column.to_string()),
        other => other,
    }
}

/// Query planner
pub struct Planner<'a> {
    store: &'a Store,
    viewer: Option<TxnId>,
    variables: &'a Variables,
    last_identity: Option<i64>,
}

impl<'a> Planner<'a> {
    /// Create a new planner. `viewer` decides which pending tables are
    /// visible; `last_identity` is what `IDENTITY()` returns.
    pub fn new(
        store: &'a Store,
        viewer: Option<TxnId>,
        variables: &'a Variables,
        last_identity: Option<i64>,
    ) -> Self {
        Self {
            store,
            viewer,
            variables,
            last_identity,
        }
    }

    fn catalog(&self) -> &Catalog {
        &self.store.catalog
    }

    /// Plan a statement. Transaction control and DECLARE are handled by
    /// the session and never reach the planner.
    pub fn plan(&self, stmt: Statement) -> Result<LogicalPlan> {
        trace!(kind = stmt.kind(), "binding statement");
        match stmt {
            Statement::Select(select) => Ok(LogicalPlan::Select(self.bind_select(&select)?)),
            Statement::Insert(insert) => Ok(LogicalPlan::Insert(self.bind_insert(&insert)?)),
            Statement::Update(update) => Ok(LogicalPlan::Update(self.bind_update(&update)?)),
            Statement::Delete(delete) => {
                let def = self.catalog().resolve_table(&delete.table_name, self.viewer)?;
                let filter = self.bind_filter(delete.where_clause.as_ref(), Some(&*def))?;
                Ok(LogicalPlan::Delete(DeletePlan {
                    table_name: def.name().to_string(),
                    filter,
                }))
            }
            Statement::CreateTable(create) => {
                Ok(LogicalPlan::CreateTable(self.bind_create_table(create)?))
            }
            Statement::DropTable(drop) => Ok(LogicalPlan::DropTable {
                table_name: drop.table_name,
                if_exists: drop.if_exists,
            }),
            Statement::CreateIndex(index) => Ok(LogicalPlan::CreateIndex {
                index_name: index.index_name,
                table_name: index.table_name,
                columns: index.columns,
                unique: index.unique,
            }),
            Statement::SetVariable { name, value } => {
                let var = self.variables.get(&name)?;
                let (value, _) = self.bind_expr(&value, None)?;
                Ok(LogicalPlan::SetVariable {
                    name: var.name.clone(),
                    value,
                })
            }
            other => Err(Error::Internal(format!(
                "{} cannot be planned",
                other.kind()
            ))),
        }
    }

    // ========== SELECT ==========

    /// Bind a SELECT. Subqueries are bound on their own: columns of an
    /// enclosing query are not visible inside them.
    pub fn bind_select(&self, stmt: &SelectStatement) -> Result<SelectPlan> {
        let def = match &stmt.from {
            Some(name) => Some(self.catalog().resolve_table(name, self.viewer)?),
            None => None,
        };
        let scope = def.as_deref();

        let mut projection = Vec::new();
        let mut columns = Vec::new();
        for item in &stmt.columns {
            match item {
                SelectItem::Wildcard => {
                    let def = scope.ok_or_else(|| {
                        Error::ExecutionError("SELECT * requires a FROM clause".to_string())
                    })?;
                    expand_wildcard(def, &mut projection, &mut columns);
                }
                SelectItem::QualifiedWildcard(table) => {
                    let def = scope
                        .filter(|d| d.name().eq_ignore_ascii_case(table))
                        .ok_or_else(|| Error::TableNotFound(table.clone()))?;
                    expand_wildcard(def, &mut projection, &mut columns);
                }
                SelectItem::Expr { expr, alias } => {
                    let (bound, data_type) = self.bind_expr(expr, scope)?;
                    let (default_name, source_table) = match (unnest(expr), scope) {
                        (Expr::Column(c), Some(def)) => {
                            let (_, column) = Catalog::resolve_column(def, &c.column)?;
                            (column.name.clone(), Some(def.name().to_string()))
                        }
                        (Expr::Variable(name), _) => (format!("@{}", name), None),
                        _ => (format!("C{}", columns.len() + 1), None),
                    };
                    let name = alias.clone().unwrap_or(default_name);
                    projection.push(bound);
                    columns.push(ColumnDescriptor::new(name, source_table, data_type));
                }
            }
        }

        let filter = self.bind_filter(stmt.where_clause.as_ref(), scope)?;

        let mut order_by = Vec::with_capacity(stmt.order_by.len());
        for item in &stmt.order_by {
            let expr = self.bind_sort_key(&item.expr, scope, &projection, &columns)?;
            order_by.push(SortKey {
                expr,
                ascending: item.ascending,
            });
        }

        let limit = stmt
            .limit
            .as_ref()
            .map(|e| self.bind_count(e, "LIMIT"))
            .transpose()?;
        let offset = stmt
            .offset
            .as_ref()
            .map(|e| self.bind_count(e, "OFFSET"))
            .transpose()?
            .unwrap_or(0);

        Ok(SelectPlan {
            table: def.map(|d| d.name().to_string()),
            filter,
            projection,
            columns,
            distinct: stmt.distinct,
            order_by,
            limit,
            offset,
        })
    }

    /// ORDER BY accepts a select-list position, an output column name or
    /// any expression over the table.
    fn bind_sort_key(
        &self,
        expr: &Expr,
        scope: Option<&TableDef>,
        projection: &[BoundExpr],
        columns: &[ColumnDescriptor],
    ) -> Result<BoundExpr> {
        match expr {
            Expr::Literal(v) if v.as_i64().is_some() => {
                let position = v.as_i64().unwrap_or(0);
                if position < 1 || position as usize > projection.len() {
                    return Err(Error::ExecutionError(format!(
                        "ORDER BY position {} is out of range",
                        position
                    )));
                }
                Ok(projection[position as usize - 1].clone())
            }
            Expr::Column(ColumnRef {
                table: None,
                column,
            }) => match columns.iter().position(|c| c.name.eq_ignore_ascii_case(column)) {
                Some(i) => Ok(projection[i].clone()),
                None => Ok(self.bind_expr(expr, scope)?.0),
            },
            _ => Ok(self.bind_expr(expr, scope)?.0),
        }
    }

    /// LIMIT and OFFSET take constant non-negative integers
    fn bind_count(&self, expr: &Expr, clause: &str) -> Result<usize> {
        let (bound, _) = self.bind_expr(expr, None)?;
        if !bound.is_constant() {
            return Err(Error::ExecutionError(format!("{} must be a constant", clause)));
        }
        bound
            .eval_const()?
            .as_i64()
            .filter(|n| *n >= 0)
            .map(|n| n as usize)
            .ok_or_else(|| {
                Error::ExecutionError(format!("{} must be a non-negative integer", clause))
            })
    }

    fn bind_filter(&self, expr: Option<&Expr>, scope: Option<&TableDef>) -> Result<Option<BoundExpr>> {
        expr.map(|e| self.bind_expr(e, scope).map(|(bound, _)| bound))
            .transpose()
    }

    /// Bind a subquery used as a value: it must produce one column
    fn bind_value_subquery(&self, stmt: &SelectStatement) -> Result<SelectPlan> {
        let plan = self.bind_select(stmt)?;
        if plan.columns.len() != 1 {
            return Err(Error::ExecutionError(format!(
                "subquery returns {} columns, expected 1",
                plan.columns.len()
            )));
        }
        Ok(plan)
    }

    // ========== DML ==========

    fn bind_insert(&self, stmt: &InsertStatement) -> Result<InsertPlan> {
        let def = self.catalog().resolve_table(&stmt.table_name, self.viewer)?;
        let schema = def.schema();
        let count = schema.column_count();
        let identity = schema.identity_position();

        let listed = match &stmt.columns {
            Some(names) => {
                let mut seen = HashSet::new();
                let mut targets = Vec::with_capacity(names.len());
                for name in names {
                    let (position, _) = Catalog::resolve_column(&def, name)?;
                    if !seen.insert(position) {
                        return Err(Error::ExecutionError(format!(
                            "column '{}' is listed more than once",
                            name
                        )));
                    }
                    targets.push(position);
                }
                Some(targets)
            }
            None => None,
        };

        let mut rows = Vec::with_capacity(stmt.values.len());
        for values in &stmt.values {
            let targets: Vec<usize> = match &listed {
                Some(targets) => targets.clone(),
                // without a column list the identity column may be left out
                None if identity.is_some() && values.len() + 1 == count => {
                    (0..count).filter(|&i| Some(i) != identity).collect()
                }
                None => (0..count).collect(),
            };
            if values.len() != targets.len() {
                return Err(Error::ExecutionError(format!(
                    "INSERT into '{}' has {} values for {} columns",
                    def.name(),
                    values.len(),
                    targets.len()
                )));
            }

            let mut row: Vec<BoundExpr> = schema
                .columns()
                .iter()
                .map(|c| BoundExpr::Literal(c.default.clone().unwrap_or(Value::Null)))
                .collect();
            for (value, &position) in values.iter().zip(&targets) {
                row[position] = self.bind_expr(value, None)?.0;
            }
            rows.push(row);
        }

        Ok(InsertPlan {
            table_name: def.name().to_string(),
            rows,
        })
    }

    fn bind_update(&self, stmt: &UpdateStatement) -> Result<UpdatePlan> {
        let def = self.catalog().resolve_table(&stmt.table_name, self.viewer)?;
        let mut seen = HashSet::new();
        let mut assignments = Vec::with_capacity(stmt.assignments.len());
        for assignment in &stmt.assignments {
            let (position, column) = Catalog::resolve_column(&def, &assignment.column)?;
            if column.identity {
                return Err(Error::ConstraintViolation(format!(
                    "identity column '{}' cannot be updated",
                    column.name
                )));
            }
            if !seen.insert(position) {
                return Err(Error::ExecutionError(format!(
                    "column '{}' is assigned more than once",
                    column.name
                )));
            }
            let (value, _) = self.bind_expr(&assignment.value, Some(&*def))?;
            assignments.push((position, value));
        }

        Ok(UpdatePlan {
            table_name: def.name().to_string(),
            assignments,
            filter: self.bind_filter(stmt.where_clause.as_ref(), Some(&*def))?,
        })
    }

    // ========== DDL ==========

    fn bind_create_table(&self, stmt: CreateTableStatement) -> Result<CreateTablePlan> {
        let table = &stmt.table_name;
        let mut names = HashSet::new();
        let mut columns: Vec<Column> = Vec::with_capacity(stmt.columns.len());

        for (position, def) in stmt.columns.iter().enumerate() {
            if !names.insert(def.name.to_lowercase()) {
                return Err(Error::ColumnAlreadyExists(def.name.clone(), table.clone()));
            }
            if def.identity && !def.data_type.is_integer() {
                return Err(Error::ExecutionError(format!(
                    "identity column '{}' must have an integer type",
                    def.name
                )));
            }

            let mut column = Column::new(def.name.clone(), def.data_type.clone(), position)
                .nullable(!def.not_null)
                .primary_key(def.primary_key)
                .unique(def.unique)
                .identity(def.identity);

            if let Some(expr) = &def.default {
                let (bound, _) = self.bind_expr(expr, None)?;
                if !bound.is_constant() {
                    return Err(Error::ExecutionError(format!(
                        "DEFAULT of column '{}' must be a constant",
                        def.name
                    )));
                }
                let value = bound
                    .eval_const()?
                    .cast(&def.data_type)
                    .map_err(|e| relabel(e, &def.name))?;
                if !value.is_null() {
                    column = column.default(value);
                }
            }
            columns.push(column);
        }

        if columns.iter().filter(|c| c.primary_key).count() > 1 {
            return Err(Error::ExecutionError(format!(
                "table '{}' declares more than one primary key",
                table
            )));
        }

        let mut unique_sets = Vec::new();
        for constraint in &stmt.constraints {
            match constraint {
                TableConstraint::PrimaryKey { columns: keys, .. } => {
                    if columns.iter().any(|c| c.primary_key) {
                        return Err(Error::ExecutionError(format!(
                            "table '{}' declares more than one primary key",
                            table
                        )));
                    }
                    for key in keys {
                        let position = find_column(&columns, key, table)?;
                        columns[position] = columns[position].clone().primary_key(true);
                    }
                }
                TableConstraint::Unique { columns: keys, .. } => {
                    if let [key] = keys.as_slice() {
                        let position = find_column(&columns, key, table)?;
                        columns[position].unique = true;
                    } else {
                        for key in keys {
                            find_column(&columns, key, table)?;
                        }
                        unique_sets.push(keys.clone());
                    }
                }
            }
        }

        Ok(CreateTablePlan {
            name: stmt.table_name,
            schema: Schema::from_columns(columns),
            unique_sets,
            if_not_exists: stmt.if_not_exists,
        })
    }

    // ========== Expressions ==========

    /// Bind an expression, returning it with its inferred type
    pub fn bind_expr(&self, expr: &Expr, scope: Option<&TableDef>) -> Result<(BoundExpr, DataType)> {
        match expr {
            Expr::Literal(v) => Ok((BoundExpr::Literal(v.clone()), literal_type(v))),

            Expr::Variable(name) => {
                let var = self.variables.get(name)?;
                Ok((BoundExpr::Literal(var.value.clone()), var.data_type.clone()))
            }

            Expr::Column(c) => {
                let def = scope
                    .ok_or_else(|| Error::ColumnNotFound(c.column.clone(), "(none)".to_string()))?;
                if let Some(table) = &c.table {
                    if !table.eq_ignore_ascii_case(def.name()) {
                        return Err(Error::ColumnNotFound(
                            format!("{}.{}", table, c.column),
                            def.name().to_string(),
                        ));
                    }
                }
                let (ordinal, column) = Catalog::resolve_column(def, &c.column)?;
                Ok((BoundExpr::Column(ordinal), column.data_type.clone()))
            }

            Expr::Nested(inner) => self.bind_expr(inner, scope),

            Expr::BinaryOp { left, op, right } => {
                let (l, lt) = self.bind_expr(left, scope)?;
                let (r, rt) = self.bind_expr(right, scope)?;
                let (l, r, dt) = match op {
                    BinaryOperator::And | BinaryOperator::Or => (l, r, DataType::Bit),
                    BinaryOperator::Concat => (l, r, DataType::Varchar(None)),
                    op if op.is_comparison() => {
                        let (l, r) = coerce_pair(l, &lt, r, &rt)?;
                        (l, r, DataType::Bit)
                    }
                    op => {
                        let dt = arithmetic_type(*op, &lt, &rt)?;
                        (l, r, dt)
                    }
                };
                Ok((
                    BoundExpr::Binary {
                        left: Box::new(l),
                        op: *op,
                        right: Box::new(r),
                    },
                    dt,
                ))
            }

            Expr::UnaryOp { op, expr } => {
                let (inner, dt) = self.bind_expr(expr, scope)?;
                match op {
                    UnaryOperator::Not => Ok((BoundExpr::Not(Box::new(inner)), DataType::Bit)),
                    UnaryOperator::Minus | UnaryOperator::Plus => {
                        if !(dt.is_numeric() || is_untyped(&dt)) {
                            return Err(Error::TypeMismatch {
                                from: dt.to_string(),
                                to: "a numeric value".to_string(),
                            });
                        }
                        if *op == UnaryOperator::Minus {
                            Ok((BoundExpr::Negate(Box::new(inner)), dt))
                        } else {
                            Ok((inner, dt))
                        }
                    }
                }
            }

            Expr::Function { name, args } => self.bind_function(name, args, scope),

            Expr::IsNull(inner) | Expr::IsNotNull(inner) => {
                let (inner, _) = self.bind_expr(inner, scope)?;
                Ok((
                    BoundExpr::IsNull {
                        expr: Box::new(inner),
                        negated: matches!(expr, Expr::IsNotNull(_)),
                    },
                    DataType::Bit,
                ))
            }

            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let (value, vt) = self.bind_expr(expr, scope)?;
                let (low, lt) = self.bind_expr(low, scope)?;
                let (high, ht) = self.bind_expr(high, scope)?;
                let (value, low) = coerce_pair(value, &vt, low, &lt)?;
                let (value, high) = coerce_pair(value, &vt, high, &ht)?;
                Ok((
                    BoundExpr::Between {
                        expr: Box::new(value),
                        low: Box::new(low),
                        high: Box::new(high),
                        negated: *negated,
                    },
                    DataType::Bit,
                ))
            }

            Expr::InList {
                expr,
                list,
                negated,
            } => {
                let (mut value, vt) = self.bind_expr(expr, scope)?;
                let mut items = Vec::with_capacity(list.len());
                for item in list {
                    let (item, it) = self.bind_expr(item, scope)?;
                    let (v, item) = coerce_pair(value, &vt, item, &it)?;
                    value = v;
                    items.push(item);
                }
                Ok((
                    BoundExpr::InList {
                        expr: Box::new(value),
                        list: items,
                        negated: *negated,
                    },
                    DataType::Bit,
                ))
            }

            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => {
                let (value, vt) = self.bind_expr(expr, scope)?;
                let plan = self.bind_value_subquery(subquery)?;
                let st = &plan.columns[0].data_type;
                if !(is_untyped(&vt) || is_untyped(st) || vt.is_comparable_with(st)) {
                    return Err(type_mismatch(&vt, st));
                }
                Ok((
                    BoundExpr::InSubquery {
                        expr: Box::new(value),
                        subquery: Box::new(plan),
                        negated: *negated,
                    },
                    DataType::Bit,
                ))
            }

            Expr::Like {
                expr,
                pattern,
                escape,
                negated,
            } => {
                let (value, _) = self.bind_expr(expr, scope)?;
                let (pattern, _) = self.bind_expr(pattern, scope)?;
                let compiled = match &pattern {
                    BoundExpr::Literal(p) => match p.to_text() {
                        Some(text) => Some(like_regex(&text, *escape)?),
                        None => None,
                    },
                    _ => None,
                };
                Ok((
                    BoundExpr::Like {
                        expr: Box::new(value),
                        pattern: Box::new(pattern),
                        escape: *escape,
                        compiled,
                        negated: *negated,
                    },
                    DataType::Bit,
                ))
            }

            Expr::Subquery(subquery) => {
                let plan = self.bind_value_subquery(subquery)?;
                let dt = plan.columns[0].data_type.clone();
                Ok((BoundExpr::Subquery(Box::new(plan)), dt))
            }

            Expr::Exists(subquery) => {
                let plan = self.bind_select(subquery)?;
                Ok((BoundExpr::Exists(Box::new(plan)), DataType::Bit))
            }
        }
    }

    fn bind_function(
        &self,
        name: &str,
        args: &[Expr],
        scope: Option<&TableDef>,
    ) -> Result<(BoundExpr, DataType)> {
        if name.eq_ignore_ascii_case("IDENTITY") {
            if !args.is_empty() {
                return Err(Error::ExecutionError(
                    "IDENTITY() takes no arguments".to_string(),
                ));
            }
            let value = self.last_identity.map(Value::BigInt).unwrap_or(Value::Null);
            return Ok((BoundExpr::Literal(value), DataType::BigInt));
        }

        let func = Function::from_name(name)
            .ok_or_else(|| Error::ExecutionError(format!("unknown function {}", name)))?;
        let (min, max) = func.arity();
        if args.len() < min || args.len() > max {
            return Err(Error::ExecutionError(format!(
                "wrong number of arguments to {}: {}",
                name.to_ascii_uppercase(),
                args.len()
            )));
        }

        let mut bound = Vec::with_capacity(args.len());
        let mut types = Vec::with_capacity(args.len());
        for arg in args {
            let (b, t) = self.bind_expr(arg, scope)?;
            bound.push(b);
            types.push(t);
        }

        let dt = match func {
            Function::Upper | Function::Lower => DataType::Varchar(None),
            Function::Length => DataType::Int,
            Function::Coalesce => types
                .into_iter()
                .find(|t| !is_untyped(t))
                .unwrap_or_else(null_type),
            Function::NewId => DataType::Guid,
            Function::Now => DataType::DateTime,
        };
        Ok((BoundExpr::Function { func, args: bound }, dt))
    }
}

fn unnest(expr: &Expr) -> &Expr {
    match expr {
        Expr::Nested(inner) => unnest(inner),
        other => other,
    }
}

fn expand_wildcard(
    def: &TableDef,
    projection: &mut Vec<BoundExpr>,
    columns: &mut Vec<ColumnDescriptor>,
) {
    for column in def.schema().columns() {
        projection.push(BoundExpr::Column(column.position));
        columns.push(ColumnDescriptor::new(
            column.name.clone(),
            Some(def.name().to_string()),
            column.data_type.clone(),
        ));
    }
}

fn find_column(columns: &[Column], name: &str, table: &str) -> Result<usize> {
    columns
        .iter()
        .position(|c| c.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| Error::ColumnNotFound(name.to_string(), table.to_string()))
}

/// Check that two operands can be compared. A literal compared with a
/// typed non-string operand is converted to that operand's type, so
/// `flag = 1` and `price = '12.50'` compare as BIT and DECIMAL.
fn coerce_pair(
    left: BoundExpr,
    lt: &DataType,
    right: BoundExpr,
    rt: &DataType,
) -> Result<(BoundExpr, BoundExpr)> {
    if is_untyped(lt) || is_untyped(rt) || lt.is_comparable_with(rt) {
        return Ok((left, right));
    }
    if let BoundExpr::Literal(v) = &right {
        if !lt.is_string() {
            let cast = v.cast(lt).map_err(|_| type_mismatch(rt, lt))?;
            return Ok((left, BoundExpr::Literal(cast)));
        }
    }
    if let BoundExpr::Literal(v) = &left {
        if !rt.is_string() {
            let cast = v.cast(rt).map_err(|_| type_mismatch(lt, rt))?;
            return Ok((BoundExpr::Literal(cast), right));
        }
    }
    Err(type_mismatch(lt, rt))
}
