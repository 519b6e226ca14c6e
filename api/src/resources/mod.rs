pub mod datastore;
pub mod package;
pub mod resource;
pub mod search;

use crate::error::{Error, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

/// The envelope every CKAN action endpoint wraps its payload in.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Response<SuccessT> {
    success: bool,
    result: Option<SuccessT>,
    error: Option<ActionError>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ActionError {
    message: Option<String>,

    #[serde(rename = "__type")]
    kind: Option<String>,
}

impl ActionError {
    fn message(&self) -> String {
        match (&self.kind, &self.message) {
            (Some(kind), Some(message)) => format!("{kind}: {message}"),
            (None, Some(message)) => message.clone(),
            (Some(kind), None) => kind.clone(),
            (None, None) => String::new(),
        }
    }
}

impl<SuccessT> Response<SuccessT> {
    pub fn into_result(self, status_code: StatusCode) -> Result<SuccessT> {
        let message = self
            .error
            .as_ref()
            .map(ActionError::message)
            .unwrap_or_default();

        match (self.success, self.result) {
            (true, Some(result)) if status_code.is_success() => Ok(result),
            (true, None) => Err(Error::BadProtocol {
                status_code,
                message: "`success` is true but the response has no `result`".to_owned(),
            }),
            (true, Some(_)) => Err(Error::BadProtocol {
                status_code,
                message,
            }),
            (false, _) if status_code.is_success() => Err(Error::BadProtocol {
                status_code,
                message,
            }),
            (false, _) => Err(Error::Api {
                status_code,
                message,
            }),
        }
    }
}

/// Renders a loosely typed CKAN field (string, number, bool or null) as text.
///
/// `null` and missing values become the empty string.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(string) => string.clone(),
        Value::Bool(true) => "True".to_owned(),
        Value::Bool(false) => "False".to_owned(),
        Value::Number(number) => number.to_string(),
        other => other.to_string(),
    }
}

/// Deserializes a string that CKAN may send as `null`.
pub(crate) fn nullable_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parse(value: Value) -> Response<Vec<String>> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_success_envelope() {
        let response = parse(json!({
            "help": "https://portal/api/3/action/help_show?name=package_list",
            "success": true,
            "result": ["a", "b"]
        }));
        assert_eq!(
            response.into_result(StatusCode::OK).unwrap(),
            vec!["a".to_owned(), "b".to_owned()]
        );
    }

    #[test]
    fn test_error_envelope() {
        let response = parse(json!({
            "success": false,
            "error": {"message": "Not found", "__type": "Not Found Error"}
        }));
        match response.into_result(StatusCode::NOT_FOUND) {
            Err(Error::Api {
                status_code,
                message,
            }) => {
                assert_eq!(status_code, StatusCode::NOT_FOUND);
                assert_eq!(message, "Not Found Error: Not found");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_inconsistent_envelope() {
        let response = parse(json!({"success": false, "error": {"message": "boom"}}));
        assert!(matches!(
            response.into_result(StatusCode::OK),
            Err(Error::BadProtocol { .. })
        ));

        let response = parse(json!({"success": true}));
        assert!(matches!(
            response.into_result(StatusCode::OK),
            Err(Error::BadProtocol { .. })
        ));
    }

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(&Value::Null), "");
        assert_eq!(value_to_string(&json!("abc")), "abc");
        assert_eq!(value_to_string(&json!(12)), "12");
        assert_eq!(value_to_string(&json!(1.5)), "1.5");
        assert_eq!(value_to_string(&json!(true)), "True");
        assert_eq!(value_to_string(&json!([1, 2])), "[1,2]");
    }
}
