//! Query Executor for QuillDB
//!
//! Runs bound plans against a [`Store`]. Every change is recorded in the
//! context's undo log so a failing statement or a rollback can revert it.

use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::debug;

use super::context::ExecContext;
use super::eval::BoundExpr;
use super::planner::{
    relabel, CreateTablePlan, DeletePlan, InsertPlan, LogicalPlan, SelectPlan, SortKey,
    UpdatePlan,
};
use super::result::QueryResult;
use crate::catalog::{Column, DataType, Schema};
use crate::error::{Error, Result};
use crate::storage::{Store, Tuple, Value};
use crate::transaction::{LockMode, UndoRecord};

/// Coerce a value to a column's declared type
fn coerce(column: &Column, value: Value, pad_char: bool) -> Result<Value> {
    let value = value
        .cast(&column.data_type)
        .map_err(|e| relabel(e, &column.name))?;
    if !pad_char {
        if let (DataType::Char(_), Value::String(s)) = (&column.data_type, &value) {
            return Ok(Value::String(s.trim_end_matches(' ').to_string()));
        }
    }
    Ok(value)
}

fn check_not_null(schema: &Schema, values: &[Value]) -> Result<()> {
    for (column, value) in schema.columns().iter().zip(values) {
        if !column.nullable && value.is_null() {
            return Err(Error::NullNotAllowed(column.name.clone()));
        }
    }
    Ok(())
}

fn compare_keys(a: &[Value], b: &[Value], order_by: &[SortKey]) -> Ordering {
    for ((x, y), key) in a.iter().zip(b).zip(order_by) {
        let ord = x.sort_cmp(y);
        let ord = if key.ascending { ord } else { ord.reverse() };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Statement executor
pub struct Executor<'a> {
    ctx: ExecContext<'a>,
}

impl<'a> Executor<'a> {
    pub fn new(ctx: ExecContext<'a>) -> Self {
        Self { ctx }
    }

    /// Identity value generated last, including by this executor
    pub fn last_identity(&self) -> Option<i64> {
        self.ctx.last_identity
    }

    /// Execute a logical plan
    pub fn execute(&mut self, store: &mut Store, plan: LogicalPlan) -> Result<QueryResult> {
        match plan {
            LogicalPlan::Select(select) => self.query(store, select),
            LogicalPlan::Insert(insert) => self.execute_insert(store, insert),
            LogicalPlan::Update(update) => self.execute_update(store, update),
            LogicalPlan::Delete(delete) => self.execute_delete(store, delete),
            LogicalPlan::CreateTable(create) => self.execute_create_table(store, create),
            LogicalPlan::DropTable {
                table_name,
                if_exists,
            } => self.execute_drop_table(store, &table_name, if_exists),
            LogicalPlan::CreateIndex {
                index_name,
                table_name,
                columns,
                unique,
            } => self.execute_create_index(store, &index_name, &table_name, &columns, unique),
            LogicalPlan::SetVariable { .. } => Err(Error::Internal(
                "variable assignment is evaluated by the session".to_string(),
            )),
        }
    }

    /// Run a SELECT and materialize its rows
    pub fn query(&mut self, store: &Store, plan: SelectPlan) -> Result<QueryResult> {
        let columns = plan.columns.clone();
        let rows = self.run_select(store, plan)?;
        debug!(rows = rows.len(), "query materialized");
        Ok(QueryResult::with_rows(columns, rows))
    }

    /// Evaluate a row-independent expression, running its subqueries
    pub fn evaluate(&mut self, store: &Store, expr: BoundExpr) -> Result<Value> {
        self.materialize(store, expr)?.eval_const()
    }

    fn run_select(&mut self, store: &Store, plan: SelectPlan) -> Result<Vec<Tuple>> {
        let SelectPlan {
            table,
            filter,
            projection,
            distinct,
            order_by,
            limit,
            offset,
            ..
        } = plan;

        let filter = filter.map(|f| self.materialize(store, f)).transpose()?;
        let projection = projection
            .into_iter()
            .map(|e| self.materialize(store, e))
            .collect::<Result<Vec<_>>>()?;
        let mut keys = Vec::with_capacity(order_by.len());
        for key in order_by {
            keys.push(SortKey {
                expr: self.materialize(store, key.expr)?,
                ascending: key.ascending,
            });
        }

        // (projected values, sort key values)
        let mut rows: Vec<(Vec<Value>, Vec<Value>)> = Vec::new();
        let mut emit = |source: &[Value]| -> Result<()> {
            if let Some(f) = &filter {
                if !f.matches(source)? {
                    return Ok(());
                }
            }
            let values = projection
                .iter()
                .map(|e| e.eval(source))
                .collect::<Result<Vec<_>>>()?;
            let sort = keys
                .iter()
                .map(|k| k.expr.eval(source))
                .collect::<Result<Vec<_>>>()?;
            rows.push((values, sort));
            Ok(())
        };

        match &table {
            Some(name) => {
                self.ctx.lock(name, LockMode::Shared)?;
                let storage = store.table(name, self.ctx.viewer())?;
                for (_, tuple) in storage.scan() {
                    emit(tuple.values())?;
                }
            }
            // a single row without columns
            None => emit(&[])?,
        }

        if !keys.is_empty() {
            rows.sort_by(|a, b| compare_keys(&a.1, &b.1, &keys));
        }

        let mut values: Vec<Vec<Value>> = rows.into_iter().map(|(v, _)| v).collect();
        if distinct {
            let mut seen = HashSet::new();
            values.retain(|row| {
                let key: Vec<Value> = row.iter().map(Value::equality_key).collect();
                seen.insert(key)
            });
        }

        Ok(values
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .map(Tuple::new)
            .collect())
    }

    /// Replace subqueries by their results
    fn materialize(&mut self, store: &Store, expr: BoundExpr) -> Result<BoundExpr> {
        let boxed = |this: &mut Self, e: Box<BoundExpr>| -> Result<Box<BoundExpr>> {
            Ok(Box::new(this.materialize(store, *e)?))
        };

        let expr = match expr {
            BoundExpr::Subquery(plan) => {
                let mut rows = self.run_select(store, *plan)?;
                if rows.len() > 1 {
                    return Err(Error::ExecutionError(
                        "scalar subquery returned more than one row".to_string(),
                    ));
                }
                let value = rows
                    .pop()
                    .and_then(|row| row.into_values().into_iter().next())
                    .unwrap_or(Value::Null);
                BoundExpr::Literal(value)
            }
            BoundExpr::InSubquery {
                expr,
                subquery,
                negated,
            } => {
                let expr = boxed(self, expr)?;
                let list = self
                    .run_select(store, *subquery)?
                    .into_iter()
                    .map(|row| {
                        BoundExpr::Literal(row.into_values().into_iter().next().unwrap_or(Value::Null))
                    })
                    .collect();
                BoundExpr::InList {
                    expr,
                    list,
                    negated,
                }
            }
            BoundExpr::Exists(plan) => {
                let found = !self.run_select(store, *plan)?.is_empty();
                BoundExpr::Literal(Value::Bit(found))
            }
            BoundExpr::Binary { left, op, right } => BoundExpr::Binary {
                left: boxed(self, left)?,
                op,
                right: boxed(self, right)?,
            },
            BoundExpr::Not(inner) => BoundExpr::Not(boxed(self, inner)?),
            BoundExpr::Negate(inner) => BoundExpr::Negate(boxed(self, inner)?),
            BoundExpr::IsNull { expr, negated } => BoundExpr::IsNull {
                expr: boxed(self, expr)?,
                negated,
            },
            BoundExpr::Between {
                expr,
                low,
                high,
                negated,
            } => BoundExpr::Between {
                expr: boxed(self, expr)?,
                low: boxed(self, low)?,
                high: boxed(self, high)?,
                negated,
            },
            BoundExpr::InList {
                expr,
                list,
                negated,
            } => BoundExpr::InList {
                expr: boxed(self, expr)?,
                list: list
                    .into_iter()
                    .map(|e| self.materialize(store, e))
                    .collect::<Result<Vec<_>>>()?,
                negated,
            },
            BoundExpr::Like {
                expr,
                pattern,
                escape,
                compiled,
                negated,
            } => BoundExpr::Like {
                expr: boxed(self, expr)?,
                pattern: boxed(self, pattern)?,
                escape,
                compiled,
                negated,
            },
            BoundExpr::Function { func, args } => BoundExpr::Function {
                func,
                args: args
                    .into_iter()
                    .map(|e| self.materialize(store, e))
                    .collect::<Result<Vec<_>>>()?,
            },
            leaf @ (BoundExpr::Literal(_) | BoundExpr::Column(_)) => leaf,
        };
        Ok(expr)
    }

    fn execute_insert(&mut self, store: &mut Store, plan: InsertPlan) -> Result<QueryResult> {
        self.ctx.lock(&plan.table_name, LockMode::Exclusive)?;

        let mut rows = Vec::with_capacity(plan.rows.len());
        for row in plan.rows {
            let mut values = Vec::with_capacity(row.len());
            for expr in row {
                values.push(self.evaluate(store, expr)?);
            }
            rows.push(values);
        }

        let pad_char = self.ctx.pad_char;
        let table = store.table_mut(&plan.table_name, self.ctx.viewer())?;
        let def = table.definition().clone();
        let schema = def.schema();
        let identity = schema.identity_position();

        let count = rows.len();
        for values in rows {
            let mut tuple = Vec::with_capacity(values.len());
            for (column, value) in schema.columns().iter().zip(values) {
                tuple.push(coerce(column, value, pad_char)?);
            }

            let mut generated = None;
            if let Some(position) = identity {
                let column = &schema.columns()[position];
                if !tuple[position].is_null() {
                    return Err(Error::ConstraintViolation(format!(
                        "explicit value for identity column '{}'",
                        column.name
                    )));
                }
                let id = table.next_identity();
                tuple[position] = Value::BigInt(id).cast(&column.data_type)?;
                generated = Some(id);
            }

            check_not_null(schema, &tuple)?;
            let row_id = table.insert(Tuple::new(tuple))?;
            self.ctx.undo.push(UndoRecord::Insert {
                table: def.name().to_string(),
                row_id,
            });
            if generated.is_some() {
                self.ctx.last_identity = generated;
            }
        }

        debug!(table = def.name(), count, "rows inserted");
        Ok(QueryResult::with_update_count(count))
    }

    fn execute_update(&mut self, store: &mut Store, plan: UpdatePlan) -> Result<QueryResult> {
        self.ctx.lock(&plan.table_name, LockMode::Exclusive)?;

        let filter = plan
            .filter
            .map(|f| self.materialize(store, f))
            .transpose()?;
        let mut assignments = Vec::with_capacity(plan.assignments.len());
        for (position, expr) in plan.assignments {
            assignments.push((position, self.materialize(store, expr)?));
        }

        let pad_char = self.ctx.pad_char;
        let table = store.table_mut(&plan.table_name, self.ctx.viewer())?;
        let def = table.definition().clone();
        let columns = def.schema().columns();

        let mut changes = Vec::new();
        for (row_id, tuple) in table.scan() {
            if let Some(f) = &filter {
                if !f.matches(tuple.values())? {
                    continue;
                }
            }
            let mut updated = tuple.clone();
            for (position, expr) in &assignments {
                let column = columns
                    .get(*position)
                    .ok_or_else(|| Error::Internal(format!("column ordinal {} out of range", position)))?;
                let value = coerce(column, expr.eval(tuple.values())?, pad_char)?;
                if !column.nullable && value.is_null() {
                    return Err(Error::NullNotAllowed(column.name.clone()));
                }
                updated.set(*position, value);
            }
            changes.push((row_id, updated));
        }

        let count = changes.len();
        for (row_id, before) in table.update(changes)? {
            self.ctx.undo.push(UndoRecord::Update {
                table: def.name().to_string(),
                row_id,
                before,
            });
        }

        debug!(table = def.name(), count, "rows updated");
        Ok(QueryResult::with_update_count(count))
    }

    fn execute_delete(&mut self, store: &mut Store, plan: DeletePlan) -> Result<QueryResult> {
        self.ctx.lock(&plan.table_name, LockMode::Exclusive)?;

        let filter = plan
            .filter
            .map(|f| self.materialize(store, f))
            .transpose()?;

        let table = store.table_mut(&plan.table_name, self.ctx.viewer())?;
        let mut doomed = Vec::new();
        for (row_id, tuple) in table.scan() {
            let selected = match &filter {
                Some(f) => f.matches(tuple.values())?,
                None => true,
            };
            if selected {
                doomed.push(row_id);
            }
        }

        let name = table.name().to_string();
        for row_id in &doomed {
            let before = table.delete(*row_id)?;
            self.ctx.undo.push(UndoRecord::Delete {
                table: name.clone(),
                row_id: *row_id,
                before,
            });
        }

        debug!(table = %name, count = doomed.len(), "rows deleted");
        Ok(QueryResult::with_update_count(doomed.len()))
    }

    fn execute_create_table(
        &mut self,
        store: &mut Store,
        plan: CreateTablePlan,
    ) -> Result<QueryResult> {
        let viewer = self.ctx.viewer();
        if plan.if_not_exists && store.catalog.table_exists(&plan.name, viewer) {
            return Ok(QueryResult::with_update_count(0));
        }

        self.ctx.lock(&plan.name, LockMode::Exclusive)?;
        store.create_table(&plan.name, plan.schema, self.ctx.owner)?;
        self.ctx.undo.push(UndoRecord::CreateTable {
            table: plan.name.clone(),
        });

        for columns in &plan.unique_sets {
            let index_name = format!(
                "uq_{}_{}",
                plan.name.to_lowercase(),
                columns.join("_").to_lowercase()
            );
            store.create_index(&index_name, &plan.name, columns, true, viewer)?;
            self.ctx.undo.push(UndoRecord::CreateIndex {
                table: plan.name.clone(),
                index: index_name,
            });
        }

        debug!(table = %plan.name, "table created");
        Ok(QueryResult::with_update_count(0))
    }

    fn execute_drop_table(
        &mut self,
        store: &mut Store,
        table_name: &str,
        if_exists: bool,
    ) -> Result<QueryResult> {
        let viewer = self.ctx.viewer();
        if !store.catalog.table_exists(table_name, viewer) {
            if if_exists {
                return Ok(QueryResult::with_update_count(0));
            }
            return Err(Error::TableNotFound(table_name.to_string()));
        }

        self.ctx.lock(table_name, LockMode::Exclusive)?;
        let record = store.drop_table(table_name, viewer, self.ctx.owner)?;
        self.ctx.undo.push(record);

        debug!(table = table_name, "table dropped");
        Ok(QueryResult::with_update_count(0))
    }

    fn execute_create_index(
        &mut self,
        store: &mut Store,
        index_name: &str,
        table_name: &str,
        columns: &[String],
        unique: bool,
    ) -> Result<QueryResult> {
        let viewer = self.ctx.viewer();
        let def = store.catalog.resolve_table(table_name, viewer)?;

        self.ctx.lock(def.name(), LockMode::Exclusive)?;
        store.create_index(index_name, def.name(), columns, unique, viewer)?;
        self.ctx.undo.push(UndoRecord::CreateIndex {
            table: def.name().to_string(),
            index: index_name.to_string(),
        });

        debug!(index = index_name, table = def.name(), "index created");
        Ok(QueryResult::with_update_count(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::context::Variables;
    use crate::executor::planner::Planner;
    use crate::sql::parse_batch;
    use crate::transaction::{LockManager, UndoLog};

    struct Fixture {
        store: Store,
        locks: LockManager,
        undo: UndoLog,
        vars: Variables,
        last_identity: Option<i64>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: Store::new(),
                locks: LockManager::new(),
                undo: UndoLog::new(),
                vars: Variables::new(),
                last_identity: None,
            }
        }

        fn run(&mut self, sql: &str) -> Result<QueryResult> {
            let mut last = QueryResult::with_update_count(0);
            for stmt in parse_batch(sql)? {
                let plan = Planner::new(&self.store, Some(1), &self.vars, self.last_identity)
                    .plan(stmt)?;
                let ctx = ExecContext {
                    txn_id: 1,
                    owner: None,
                    lock_reads: true,
                    pad_char: true,
                    locks: &self.locks,
                    undo: &mut self.undo,
                    last_identity: self.last_identity,
                };
                let mut executor = Executor::new(ctx);
                last = executor.execute(&mut self.store, plan)?;
                self.last_identity = executor.last_identity();
            }
            Ok(last)
        }

        fn rows(&mut self, sql: &str) -> Vec<Vec<Value>> {
            self.run(sql).unwrap().row_values()
        }
    }

    fn people() -> Fixture {
        let mut f = Fixture::new();
        f.run(
            "CREATE TABLE People (Id INT IDENTITY, Name VARCHAR(20) NOT NULL, Age INT);
             INSERT INTO People (Name, Age) VALUES ('Carol', 41), ('alice', 30), ('Bob', NULL);",
        )
        .unwrap();
        f
    }

    #[test]
    fn test_identity_values_and_insertion_order() {
        let mut f = people();
        let rows = f.rows("SELECT Id, Name FROM People");
        assert_eq!(
            rows,
            vec![
                vec![Value::Int(1), Value::from("Carol")],
                vec![Value::Int(2), Value::from("alice")],
                vec![Value::Int(3), Value::from("Bob")],
            ]
        );
        assert_eq!(f.last_identity, Some(3));
        assert_eq!(f.rows("SELECT IDENTITY()"), vec![vec![Value::BigInt(3)]]);
    }

    #[test]
    fn test_null_predicate_filters_row() {
        let mut f = people();
        assert_eq!(f.rows("SELECT Name FROM People WHERE Age > 20").len(), 2);
        assert_eq!(f.rows("SELECT Name FROM People WHERE NOT (Age > 20)").len(), 0);
        assert_eq!(
            f.rows("SELECT Name FROM People WHERE Age IS NULL"),
            vec![vec![Value::from("Bob")]]
        );
    }

    #[test]
    fn test_order_by_is_stable_and_nulls_first() {
        let mut f = people();
        f.run("INSERT INTO People (Name, Age) VALUES ('Dave', 30)").unwrap();
        let rows = f.rows("SELECT Name FROM People ORDER BY Age");
        let names: Vec<_> = rows.into_iter().map(|r| r[0].clone()).collect();
        assert_eq!(
            names,
            vec![
                Value::from("Bob"),
                Value::from("alice"),
                Value::from("Dave"),
                Value::from("Carol")
            ]
        );

        let rows = f.rows("SELECT Name FROM People ORDER BY Age DESC LIMIT 2 OFFSET 1");
        assert_eq!(rows, vec![vec![Value::from("alice")], vec![Value::from("Dave")]]);
    }

    #[test]
    fn test_distinct_keeps_first_occurrence() {
        let mut f = people();
        f.run("INSERT INTO People (Name, Age) VALUES ('Eve', 30)").unwrap();
        let rows = f.rows("SELECT DISTINCT Age FROM People");
        assert_eq!(
            rows,
            vec![vec![Value::Int(41)], vec![Value::Int(30)], vec![Value::Null]]
        );
    }

    #[test]
    fn test_update_keeps_position_and_counts() {
        let mut f = people();
        let result = f.run("UPDATE People SET Age = Age + 1 WHERE Age IS NOT NULL").unwrap();
        assert_eq!(result.update_count, 2);
        let result = f.run("UPDATE People SET Age = 1 WHERE Name = 'nobody'").unwrap();
        assert_eq!(result.update_count, 0);

        let rows = f.rows("SELECT Name, Age FROM People");
        assert_eq!(rows[0], vec![Value::from("Carol"), Value::Int(42)]);
        assert_eq!(rows[2], vec![Value::from("Bob"), Value::Null]);
    }

    #[test]
    fn test_not_null_and_identity_violations() {
        let mut f = people();
        assert!(matches!(
            f.run("INSERT INTO People (Name) VALUES (NULL)"),
            Err(Error::NullNotAllowed(_))
        ));
        assert!(matches!(
            f.run("INSERT INTO People (Id, Name) VALUES (9, 'x')"),
            Err(Error::ConstraintViolation(_))
        ));
        assert!(matches!(
            f.run("INSERT INTO People (Name) VALUES ('a name that is far too long')"),
            Err(Error::ValueTooLarge(col)) if col == "Name"
        ));
    }

    #[test]
    fn test_delete_and_undo() {
        let mut f = people();
        let mark = f.undo.mark();
        let result = f.run("DELETE FROM People WHERE Age < 35").unwrap();
        assert_eq!(result.update_count, 1);
        assert_eq!(f.rows("SELECT * FROM People").len(), 2);

        let records = f.undo.split_off(mark);
        f.store.undo(records);
        let names: Vec<_> = f
            .rows("SELECT Name FROM People")
            .into_iter()
            .map(|r| r[0].clone())
            .collect();
        assert_eq!(
            names,
            vec![Value::from("Carol"), Value::from("alice"), Value::from("Bob")]
        );
    }

    #[test]
    fn test_scalar_and_in_subqueries() {
        let mut f = people();
        f.run("CREATE TABLE Picks (Who VARCHAR(20))").unwrap();
        f.run("INSERT INTO Picks VALUES ('Bob'), ('Carol')").unwrap();

        let rows = f.rows("SELECT Id FROM People WHERE Name IN (SELECT Who FROM Picks)");
        assert_eq!(rows, vec![vec![Value::Int(1)], vec![Value::Int(3)]]);

        let rows = f.rows("SELECT (SELECT Age FROM People WHERE Id = 2) AS a");
        assert_eq!(rows, vec![vec![Value::Int(30)]]);

        let rows = f.rows("SELECT 1 WHERE EXISTS (SELECT * FROM Picks WHERE Who = 'Zed')");
        assert!(rows.is_empty());

        let err = f.run("SELECT (SELECT Who FROM Picks)").unwrap_err();
        assert!(matches!(err, Error::ExecutionError(_)));
    }

    #[test]
    fn test_like_and_functions() {
        let mut f = people();
        let rows = f.rows("SELECT UPPER(Name) FROM People WHERE Name LIKE '%o%' ORDER BY 1");
        assert_eq!(rows, vec![vec![Value::from("BOB")], vec![Value::from("CAROL")]]);
        let rows = f.rows("SELECT COALESCE(Age, -1) FROM People WHERE Name = 'Bob'");
        assert_eq!(rows, vec![vec![Value::Int(-1)]]);
    }

    #[test]
    fn test_unique_constraint_set_and_index() {
        let mut f = Fixture::new();
        f.run("CREATE TABLE Pairs (A INT, B INT, UNIQUE (A, B))").unwrap();
        f.run("INSERT INTO Pairs VALUES (1, 1), (1, 2)").unwrap();
        assert!(matches!(
            f.run("INSERT INTO Pairs VALUES (1, 2)"),
            Err(Error::UniqueViolation(_))
        ));

        f.run("CREATE INDEX ix_b ON Pairs (B)").unwrap();
        assert!(matches!(
            f.run("CREATE UNIQUE INDEX ux_a ON Pairs (A)"),
            Err(Error::UniqueViolation(_))
        ));
    }

    #[test]
    fn test_ddl_if_exists_variants() {
        let mut f = people();
        assert_eq!(
            f.run("CREATE TABLE IF NOT EXISTS people (x INT)").unwrap().update_count,
            0
        );
        assert!(matches!(
            f.run("CREATE TABLE PEOPLE (x INT)"),
            Err(Error::TableAlreadyExists(_))
        ));
        assert_eq!(f.run("DROP TABLE IF EXISTS nothing").unwrap().update_count, 0);
        assert!(matches!(
            f.run("DROP TABLE nothing"),
            Err(Error::TableNotFound(_))
        ));
        f.run("DROP TABLE People").unwrap();
        assert!(f.run("SELECT * FROM People").is_err());
    }
}
