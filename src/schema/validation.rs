//! Input constraints checked by the validator extension

use regex::Regex;
use serde_json::Value;

/// A single rule applied to an argument or input-object field value
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Value must be present and not an empty string / list / object
    NotBlank,
    /// String character count or list length bounds
    Length {
        min: Option<usize>,
        max: Option<usize>,
    },
    /// Numeric bounds
    Range { min: Option<f64>, max: Option<f64> },
    /// String must match the pattern
    Regex { pattern: String },
    /// Value must be one of the listed choices
    Choice { choices: Vec<Value> },
}

impl Constraint {
    /// Check `value`, returning a violation message on failure
    ///
    /// Only `NotBlank` rejects null; the other rules ignore absent values.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            Constraint::NotBlank => {
                let blank = match value {
                    Value::Null => true,
                    Value::String(s) => s.trim().is_empty(),
                    Value::Array(items) => items.is_empty(),
                    Value::Object(map) => map.is_empty(),
                    _ => false,
                };
                if blank {
                    Err("This value should not be blank.".to_string())
                } else {
                    Ok(())
                }
            }
            Constraint::Length { min, max } => {
                let len = match value {
                    Value::String(s) => s.chars().count(),
                    Value::Array(items) => items.len(),
                    _ => return Ok(()),
                };
                if let Some(min) = min
                    && len < *min
                {
                    return Err(format!(
                        "This value is too short. It should have {} characters or more.",
                        min
                    ));
                }
                if let Some(max) = max
                    && len > *max
                {
                    return Err(format!(
                        "This value is too long. It should have {} characters or less.",
                        max
                    ));
                }
                Ok(())
            }
            Constraint::Range { min, max } => {
                let Some(number) = value.as_f64() else {
                    return Ok(());
                };
                if let Some(min) = min
                    && number < *min
                {
                    return Err(format!("This value should be {} or more.", min));
                }
                if let Some(max) = max
                    && number > *max
                {
                    return Err(format!("This value should be {} or less.", max));
                }
                Ok(())
            }
            Constraint::Regex { pattern } => {
                let Some(s) = value.as_str() else {
                    return Ok(());
                };
                let regex = Regex::new(pattern)
                    .map_err(|e| format!("Invalid pattern '{}': {}", pattern, e))?;
                if regex.is_match(s) {
                    Ok(())
                } else {
                    Err("This value is not valid.".to_string())
                }
            }
            Constraint::Choice { choices } => {
                if value.is_null() || choices.contains(value) {
                    Ok(())
                } else {
                    Err("The value you selected is not a valid choice.".to_string())
                }
            }
        }
    }
}
