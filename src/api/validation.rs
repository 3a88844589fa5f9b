use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use validator::Validate;

use crate::api::error::ApiError;
use crate::logic::FieldErrors;

/// JSON body that has been deserialized and validated.
///
/// Malformed JSON and type mismatches become form errors, failed field rules
/// become field errors; either way the handler is never reached.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonObject(object) = JsonObject::from_request(req, state).await?;
        let value: T = serde_json::from_value(Value::Object(object)).map_err(FieldErrors::from)?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// A JSON object body without a fixed schema
#[derive(Debug, Clone)]
pub struct JsonObject(pub Map<String, Value>);

#[async_trait]
impl<S> FromRequest<S> for JsonObject
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| FieldErrors::form(rejection.body_text()))?;

        match value {
            Value::Object(object) => Ok(JsonObject(object)),
            _ => Err(FieldErrors::form("Expected a JSON object").into()),
        }
    }
}
