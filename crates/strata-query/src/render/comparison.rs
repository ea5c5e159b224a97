//! Comparison compiler.
//!
//! Properties are stored as arrays (a scalar is a one-element array), so
//! every value comparison is an `any(value IN alias.prop WHERE ...)`
//! predicate. `$type` consults the per-record type map instead of the value.

use crate::error::{ParseError, ParseResult};
use crate::ir::{
    Condition, DatetimeParts, Expression, Operand, PropertyType, Threshold, VectorSearch,
};
use crate::options::CompileOptions;
use crate::render::literal::{list, literal, member, string};
use crate::syntax::decode_expression;
use serde_json::Value;

/// Decode and compile `key: value` against `alias`.
///
/// Returns one fragment per conjunct; the caller joins them with AND.
pub fn compile_comparison(
    alias: &str,
    key: &str,
    value: &Value,
    options: &CompileOptions,
) -> ParseResult<Vec<String>> {
    let expression = decode_expression(key, value)?;
    Ok(ComparisonCompiler::new(alias, key, options).compile(&expression))
}

/// Compile the `$id` pseudo-key against the scalar identity property.
pub fn compile_identity(
    alias: &str,
    value: &Value,
    options: &CompileOptions,
) -> ParseResult<Vec<String>> {
    let id = member(alias, &options.id_key);
    let expression = decode_expression("$id", value)?;

    let conditions = match expression {
        Expression::Equals(Operand::Literal(v)) => {
            return Ok(vec![format!("{id} = {}", literal(&v))]);
        }
        Expression::Equals(Operand::Null) => return Ok(vec![format!("{id} IS NULL")]),
        Expression::Equals(Operand::Datetime(_)) => {
            return Err(ParseError::operand("$id", "$eq", value));
        }
        Expression::Conditions(conditions) => conditions,
    };

    conditions
        .iter()
        .map(|condition| match condition {
            Condition::Compare(op, Operand::Literal(v)) => {
                Ok(format!("{id} {} {}", op.symbol(), literal(v)))
            }
            Condition::In(items) => Ok(format!("{id} IN {}", list(items))),
            Condition::NotIn(items) => Ok(format!("NOT {id} IN {}", list(items))),
            _ => Err(ParseError::operand("$id", "$id", value)),
        })
        .collect()
}

/// Renders one decoded expression for one property of one alias.
pub struct ComparisonCompiler<'a> {
    alias: &'a str,
    key: &'a str,
    options: &'a CompileOptions,
    property: String,
}

impl<'a> ComparisonCompiler<'a> {
    pub fn new(alias: &'a str, key: &'a str, options: &'a CompileOptions) -> Self {
        Self {
            alias,
            key,
            options,
            property: member(alias, key),
        }
    }

    pub fn compile(&self, expression: &Expression) -> Vec<String> {
        let mut fragments = Vec::new();
        match expression {
            Expression::Equals(Operand::Datetime(parts)) => {
                self.push(&mut fragments, self.type_check(PropertyType::Datetime));
                self.push(&mut fragments, self.any(&self.components_match(parts)));
            }
            Expression::Equals(operand) => {
                self.push(&mut fragments, self.any(&format!("value = {}", self.operand(operand))));
            }
            Expression::Conditions(conditions) => {
                for condition in conditions {
                    for fragment in self.condition(condition) {
                        self.push(&mut fragments, fragment);
                    }
                }
            }
        }
        fragments
    }

    fn push(&self, fragments: &mut Vec<String>, fragment: String) {
        if !fragments.contains(&fragment) {
            fragments.push(fragment);
        }
    }

    fn condition(&self, condition: &Condition) -> Vec<String> {
        match condition {
            Condition::Compare(op, operand @ Operand::Datetime(_)) => vec![
                self.type_check(PropertyType::Datetime),
                self.any(&format!("value {} {}", op.symbol(), self.operand(operand))),
            ],
            Condition::Compare(op, operand) => {
                vec![self.any(&format!("value {} {}", op.symbol(), self.operand(operand)))]
            }
            Condition::In(items) => vec![self.any(&format!("value IN {}", list(items)))],
            Condition::NotIn(items) => vec![format!(
                "none(value IN {} WHERE value IN {})",
                self.property,
                list(items)
            )],
            Condition::Text(op, needle) => vec![self.any(&format!(
                "toLower(value) {} {}",
                op.keyword(),
                string(&needle.to_lowercase())
            ))],
            Condition::Exists(true) => vec![self.present()],
            Condition::Exists(false) => vec![format!("NOT {}", self.present())],
            Condition::Type(property_type) => vec![self.type_check(*property_type)],
            Condition::Vector(vector) => self.vector(vector),
        }
    }

    fn any(&self, predicate: &str) -> String {
        format!("any(value IN {} WHERE {})", self.property, predicate)
    }

    fn present(&self) -> String {
        format!(
            "({prop} IS NOT NULL AND size({prop}) > 0)",
            prop = self.property
        )
    }

    fn type_check(&self, property_type: PropertyType) -> String {
        format!(
            "{} = {}",
            member(&self.options.types_expr(self.alias), self.key),
            string(property_type.name())
        )
    }

    fn operand(&self, operand: &Operand) -> String {
        match operand {
            Operand::Null => string(&self.options.null_sentinel),
            Operand::Literal(value) => literal(value),
            Operand::Datetime(parts) => datetime_map(parts),
        }
    }

    fn components_match(&self, parts: &DatetimeParts) -> String {
        parts
            .components
            .iter()
            .map(|(component, amount)| format!("value.{} = {}", component.name(), amount))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    fn vector(&self, vector: &VectorSearch) -> Vec<String> {
        let similarity = format!(
            "{}({}, {})",
            vector.function,
            self.property,
            list(&vector.query)
        );
        match &vector.threshold {
            Threshold::AtLeast(bound) => vec![format!("{similarity} >= {bound}")],
            Threshold::Range(bounds) => bounds
                .iter()
                .map(|(op, bound)| format!("{similarity} {} {bound}", op.symbol()))
                .collect(),
        }
    }
}

/// `datetime({year: 2024, month: 3})`
fn datetime_map(parts: &DatetimeParts) -> String {
    let fields: Vec<String> = parts
        .components
        .iter()
        .map(|(component, amount)| format!("{}: {}", component.name(), amount))
        .collect();
    format!("datetime({{{}}})", fields.join(", "))
}
