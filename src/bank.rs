//! Tolerant parser for question-bank documents.
//!
//! Banks are published either as a bare JSON array of questions or as an
//! object wrapping that array under `data`. Both shapes normalize to a plain
//! `Vec<Question>` here.

use serde_json::Value;

use crate::loader::LoadError;
use crate::question::Question;

const DATA_FIELD: &str = "data";

pub fn parse_bank(bytes: &[u8]) -> Result<Vec<Question>, LoadError> {
    let document: Value = serde_json::from_slice(bytes).map_err(LoadError::Parse)?;
    let records = match document {
        Value::Array(records) => records,
        Value::Object(mut map) => match map.remove(DATA_FIELD) {
            Some(Value::Array(records)) => records,
            Some(_) => {
                return Err(LoadError::UnexpectedShape(format!(
                    "`{DATA_FIELD}` is not an array"
                )))
            }
            None => {
                return Err(LoadError::UnexpectedShape(format!(
                    "object without a `{DATA_FIELD}` array"
                )))
            }
        },
        other => {
            return Err(LoadError::UnexpectedShape(format!(
                "expected an array or object, found {}",
                json_kind(&other)
            )))
        }
    };

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            serde_json::from_value::<Question>(record)
                .map_err(|source| LoadError::InvalidQuestion { index, source })
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
