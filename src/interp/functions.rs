//! Built-in functions

use crate::parser::ast::Function;
use crate::value::Value;

/// Apply a built-in to its evaluated argument
///
/// Returns the runtime type name of the argument when a string function is
/// given something other than a string.
pub(super) fn apply(function: Function, value: Value) -> Result<Value, String> {
    if function.requires_string() {
        return match value {
            Value::Absent => Ok(Value::Absent),
            Value::Str(s) => Ok(match function {
                Function::Trim => Value::Str(s.trim().to_string()),
                _ => Value::from(s.chars().count()),
            }),
            other => Err(other.type_name()),
        };
    }

    let mut items = value.into_elements();
    Ok(match function {
        Function::First => first(items),
        Function::Last => items.pop().unwrap_or_default(),
        Function::Rest => {
            if !items.is_empty() {
                items.remove(0);
            }
            Value::List(items)
        }
        Function::Trunc => {
            items.pop();
            Value::List(items)
        }
        Function::Reverse => {
            items.reverse();
            Value::List(items)
        }
        Function::Strip => Value::List(items.into_iter().filter(|v| !v.is_absent()).collect()),
        Function::Length => Value::from(items.len()),
        Function::Trim | Function::Strlen => Value::Absent,
    })
}

fn first(items: Vec<Value>) -> Value {
    items.into_iter().next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> Value {
        vec!["a", "b", "c"].into()
    }

    fn texts(value: Value) -> Vec<String> {
        value
            .into_elements()
            .iter()
            .filter_map(|v| v.as_text())
            .collect()
    }

    #[test]
    fn test_list_functions() {
        assert_eq!(texts(apply(Function::First, list()).unwrap()), vec!["a"]);
        assert_eq!(texts(apply(Function::Last, list()).unwrap()), vec!["c"]);
        assert_eq!(texts(apply(Function::Rest, list()).unwrap()), vec!["b", "c"]);
        assert_eq!(texts(apply(Function::Trunc, list()).unwrap()), vec!["a", "b"]);
        assert_eq!(
            texts(apply(Function::Reverse, list()).unwrap()),
            vec!["c", "b", "a"]
        );
        assert_eq!(texts(apply(Function::Length, list()).unwrap()), vec!["3"]);
    }

    #[test]
    fn test_scalars_act_as_single_element_lists() {
        assert_eq!(texts(apply(Function::First, "x".into()).unwrap()), vec!["x"]);
        assert_eq!(texts(apply(Function::Length, "x".into()).unwrap()), vec!["1"]);
        assert!(apply(Function::First, Value::Absent).unwrap().is_absent());
        assert_eq!(texts(apply(Function::Length, Value::Absent).unwrap()), vec!["0"]);
    }

    #[test]
    fn test_strip_removes_absent() {
        let value = Value::List(vec!["a".into(), Value::Absent, "b".into()]);
        assert_eq!(texts(apply(Function::Strip, value).unwrap()), vec!["a", "b"]);
    }

    #[test]
    fn test_string_functions() {
        assert_eq!(texts(apply(Function::Trim, "  x ".into()).unwrap()), vec!["x"]);
        assert_eq!(texts(apply(Function::Strlen, "héllo".into()).unwrap()), vec!["5"]);
        assert!(apply(Function::Trim, Value::Absent).unwrap().is_absent());
    }

    #[test]
    fn test_string_functions_reject_other_types() {
        assert_eq!(apply(Function::Trim, 34.into()).unwrap_err(), "i64");
        assert_eq!(apply(Function::Strlen, vec!["a"].into()).unwrap_err(), "List");
    }
}
