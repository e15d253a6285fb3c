use std::fmt;

use serde::{Deserialize, Serialize};

/// JSON envelope for façade responses: the success body as-is, or
/// `{"error": "..."}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiResponse<T> {
    Ok(T),
    Error { error: String },
}

impl<T> ApiResponse<T> {
    pub fn error(message: impl Into<String>) -> Self {
        ApiResponse::Error {
            error: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ApiResponse::Ok(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            ApiResponse::Ok(body) => Some(body),
            ApiResponse::Error { .. } => None,
        }
    }
}

impl<T, E: fmt::Display> From<Result<T, E>> for ApiResponse<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(body) => ApiResponse::Ok(body),
            Err(err) => ApiResponse::error(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Body {
        update_id: String,
    }

    #[test]
    fn serialises_both_shapes() {
        let ok: ApiResponse<Body> = Ok::<_, String>(Body { update_id: "update-000001".into() }).into();
        assert_eq!(serde_json::to_value(&ok).unwrap(), json!({"update_id": "update-000001"}));

        let err: ApiResponse<Body> = Err::<Body, _>("not enough nodes").into();
        assert_eq!(serde_json::to_value(&err).unwrap(), json!({"error": "not enough nodes"}));
        assert!(!err.is_ok());

        let parsed: ApiResponse<Body> = serde_json::from_value(json!({"error": "boom"})).unwrap();
        assert_eq!(parsed, ApiResponse::error("boom"));
    }
}
