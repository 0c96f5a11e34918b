use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Deserializer};

use super::Message;
use super::extract::{AuthenticatedCaller, JsonBody};
use crate::error::Result;
use crate::state::AppState;
use crate::telemetry::NewReading;

#[derive(Debug, Deserialize)]
pub struct ReadingBody {
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub value: f64,
    pub name: String,
    pub unit: String,
    #[serde(default, alias = "time")]
    pub timestamp: Option<i64>,
}

/// Accept `11`, `11.5` or `"11.5"`.
fn number_or_numeric_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid number: {text:?}"))),
    }
}

impl From<ReadingBody> for NewReading {
    fn from(body: ReadingBody) -> Self {
        Self {
            value: body.value,
            name: body.name,
            unit: body.unit,
            timestamp: body.timestamp,
        }
    }
}

/// `POST /data`
pub async fn submit(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    JsonBody(body): JsonBody<ReadingBody>,
) -> Result<(StatusCode, Json<Message>)> {
    state.telemetry.submit(&caller, body.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(Message {
            message: "New data added successfully",
        }),
    ))
}
