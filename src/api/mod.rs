use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;

pub mod inbox;

const X_DEPARTMENT_ID: &str = "X-Department-ID";

/// Department the connector routes the email to, from `X-Department-ID`.
/// A missing or blank header means no department.
#[derive(Debug)]
pub struct ExtractDepartment(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for ExtractDepartment
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, (StatusCode, &'static str)> {
        let Some(department) = parts.headers.get(X_DEPARTMENT_ID) else {
            return Ok(ExtractDepartment(None));
        };

        let department = department
            .to_str()
            .map_err(|_| (StatusCode::BAD_REQUEST, "invalid department id"))?
            .trim();

        Ok(ExtractDepartment(
            Some(department.to_owned()).filter(|d| !d.is_empty()),
        ))
    }
}

pub async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}
