// ============================================================================
// src/executor/plugins/order_by.rs - ORDER BY sorting plugin
// ============================================================================

use crate::parser::ast::{Expr, OrderByExpr, BinaryOp};
use crate::core::{Result, Value, Row, Schema, DbError};
use crate::evaluator::EvaluationContext;
use std::cmp::Ordering;

/// Trait для сортировщиков (plugin interface)
pub trait RowSorter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Сортировать строки согласно ORDER BY выражениям
    fn sort(
        &self,
        rows: Vec<Row>,
        order_by: &[OrderByExpr],
        schema: &Schema,
        eval_ctx: &EvaluationContext,
    ) -> Result<Vec<Row>>;
}

// ============================================================================
// ORDER BY SORTER - Основная реализация
// ============================================================================

pub struct OrderBySorter;

impl OrderBySorter {
    pub fn new() -> Self {
        Self
    }

    /// Сравнить два значения с учётом NULL (NULL LAST по умолчанию)
    fn compare_values(&self, a: &Value, b: &Value) -> Ordering {
        match (a, b) {
            // NULL handling: NULL считается "больше" всех значений (NULL LAST)
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Greater,
            (_, Value::Null) => Ordering::Less,

            // Integer comparison
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),

            // Float comparison
            (Value::Float(a), Value::Float(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }

            // Text comparison
            (Value::Text(a), Value::Text(b)) => a.cmp(b),

            // Boolean comparison (false < true)
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),

            // Mixed numeric types
            (Value::Integer(a), Value::Float(b)) => {
                (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Value::Float(a), Value::Integer(b)) => {
                a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal)
            }

            // Type mismatch - compare as strings
            _ => format!("{:?}", a).cmp(&format!("{:?}", b)),
        }
    }

    /// Сравнить две строки по списку ORDER BY выражений
    fn compare_rows(
        &self,
        row_a: &Row,
        row_b: &Row,
        order_by: &[OrderByExpr],
        schema: &Schema,
        eval_ctx: &EvaluationContext,
    ) -> Result<Ordering> {
        for order_expr in order_by {
            // Вычисляем значения выражения для обеих строк
            let val_a = eval_ctx.evaluate(&order_expr.expr, row_a, schema)?;
            let val_b = eval_ctx.evaluate(&order_expr.expr, row_b, schema)?;

            // Сравниваем
            let mut cmp = self.compare_values(&val_a, &val_b);

            // Инвертируем порядок для DESC
            if order_expr.descending {
                cmp = cmp.reverse();
            }

            // Если не равны - возвращаем результат
            if cmp != Ordering::Equal {
                return Ok(cmp);
            }
            // Иначе переходим к следующему ORDER BY выражению
        }

        // Все выражения равны
        Ok(Ordering::Equal)
    }
}

impl Default for OrderBySorter {
    fn default() -> Self {
        Self::new()
    }
}

impl RowSorter for OrderBySorter {
    fn name(&self) -> &'static str {
        "ORDER BY"
    }

    fn sort(
        &self,
        mut rows: Vec<Row>,
        order_by: &[OrderByExpr],
        schema: &Schema,
        eval_ctx: &EvaluationContext,
    ) -> Result<Vec<Row>> {
        // Если нет ORDER BY - возвращаем как есть
        if order_by.is_empty() {
            return Ok(rows);
        }

        // Собираем ошибки сортировки (если будут)
        let mut sort_error: Option<DbError> = None;

        rows.sort_by(|a, b| {
            // Если уже была ошибка - не продолжаем вычисления
            if sort_error.is_some() {
                return Ordering::Equal;
            }

            match self.compare_rows(a, b, order_by, schema, eval_ctx) {
                Ok(ordering) => ordering,
                Err(e) => {
                    sort_error = Some(e);
                    Ordering::Equal
                }
            }
        });

        // Если была ошибка во время сортировки - возвращаем её
        if let Some(err) = sort_error {
            return Err(err);
        }

        Ok(rows)
    }
}

// ============================================================================
// NULLS FIRST / NULLS LAST SORTER - Расширенная версия
// ============================================================================

/// Политика обработки NULL при сортировке
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullOrdering {
    NullsFirst,
    NullsLast,
}

/// Расширенное выражение ORDER BY с поддержкой NULLS FIRST/LAST
#[derive(Debug, Clone)]
pub struct ExtendedOrderByExpr {
    pub expr: Expr,
    pub descending: bool,
    pub null_ordering: NullOrdering,
}

impl From<OrderByExpr> for ExtendedOrderByExpr {
    fn from(expr: OrderByExpr) -> Self {
        Self {
            expr: expr.expr,
            descending: expr.descending,
            // По умолчанию: ASC = NULLS LAST, DESC = NULLS FIRST
            null_ordering: if expr.descending {
                NullOrdering::NullsFirst
            } else {
                NullOrdering::NullsLast
            },
        }
    }
}

pub struct ExtendedOrderBySorter;

impl ExtendedOrderBySorter {
    pub fn new() -> Self {
        Self
    }

    /// Сравнить два значения с настраиваемой обработкой NULL
    fn compare_values_with_nulls(
        &self,
        a: &Value,
        b: &Value,
        null_ordering: NullOrdering,
    ) -> Ordering {
        match (a, b) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => match null_ordering {
                NullOrdering::NullsFirst => Ordering::Less,
                NullOrdering::NullsLast => Ordering::Greater,
            },
            (_, Value::Null) => match null_ordering {
                NullOrdering::NullsFirst => Ordering::Greater,
                NullOrdering::NullsLast => Ordering::Less,
            },
            // Остальное - стандартное сравнение
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Integer(a), Value::Float(b)) => {
                (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Value::Float(a), Value::Integer(b)) => {
                a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal)
            }
            _ => format!("{:?}", a).cmp(&format!("{:?}", b)),
        }
    }

    /// Сортировать с расширенными опциями
    pub fn sort_extended(
        &self,
        mut rows: Vec<Row>,
        order_by: &[ExtendedOrderByExpr],
        schema: &Schema,
        eval_ctx: &EvaluationContext,
    ) -> Result<Vec<Row>> {
        if order_by.is_empty() {
            return Ok(rows);
        }

        let mut sort_error: Option<DbError> = None;

        rows.sort_by(|row_a, row_b| {
            if sort_error.is_some() {
                return Ordering::Equal;
            }

            for order_expr in order_by {
                let val_a = match eval_ctx.evaluate(&order_expr.expr, row_a, schema) {
                    Ok(v) => v,
                    Err(e) => {
                        sort_error = Some(e);
                        return Ordering::Equal;
                    }
                };
                let val_b = match eval_ctx.evaluate(&order_expr.expr, row_b, schema) {
                    Ok(v) => v,
                    Err(e) => {
                        sort_error = Some(e);
                        return Ordering::Equal;
                    }
                };

                let mut cmp = self.compare_values_with_nulls(
                    &val_a,
                    &val_b,
                    order_expr.null_ordering,
                );

                if order_expr.descending {
                    cmp = cmp.reverse();
                }

                if cmp != Ordering::Equal {
                    return cmp;
                }
            }

            Ordering::Equal
        });

        if let Some(err) = sort_error {
            return Err(err);
        }

        Ok(rows)
    }
}

impl Default for ExtendedOrderBySorter {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// VALUE COMPARATOR - Утилита для сравнения значений (переиспользуемая)
// ============================================================================

/// Компаратор значений для переиспользования в других модулях
pub struct ValueComparator;

impl ValueComparator {
    /// Сравнить два Value, возвращая Ordering
    pub fn compare(a: &Value, b: &Value) -> Ordering {
        match (a, b) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Greater,
            (_, Value::Null) => Ordering::Less,
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Integer(a), Value::Float(b)) => {
                (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Value::Float(a), Value::Integer(b)) => {
                a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal)
            }
            _ => Ordering::Equal,
        }
    }

    /// Проверить отношение согласно BinaryOp
    pub fn compare_with_op(a: &Value, b: &Value, op: &BinaryOp) -> bool {
        let ordering = Self::compare(a, b);
        match op {
            BinaryOp::Eq => ordering == Ordering::Equal,
            BinaryOp::NotEq => ordering != Ordering::Equal,
            BinaryOp::Lt => ordering == Ordering::Less,
            BinaryOp::LtEq => ordering != Ordering::Greater,
            BinaryOp::Gt => ordering == Ordering::Greater,
            BinaryOp::GtEq => ordering != Ordering::Less,
            _ => false,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
