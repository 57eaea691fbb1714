//! Response mapping.
//!
//! After the rest of the chain returns, the mapper writes exactly one
//! response:
//!
//! | Situation | Response |
//! |-----------|----------|
//! | downstream error | the error rendering |
//! | a non-nil error return (last one wins) | the error rendering |
//! | first payload is a [`ResponseModifier`] | whatever the modifier writes |
//! | first payload present | `200`, the payload as JSON |
//! | first payload nil | `200`, `[]` for sequences, `{}` otherwise |
//! | no payload | nothing |
//!
//! An error renders with its own status and message when it has an HTTP
//! rendering, and as `500 {"code":500,"message":"<display>"}` otherwise. In
//! debug mode JSON is indented by two spaces.
//!
//! [`ResponseModifier`]: archytas_core::ResponseModifier

use archytas_core::{
    BoxFuture, ChainError, ChainResult, Exchange, HttpError, ReturnValue, JSON_CONTENT_TYPE,
};
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use tracing::{debug, error};

use crate::bubble::Bubble;
use crate::middleware::Middleware;

/// Renders handler results and chain errors as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseMapper;

impl Middleware for ResponseMapper {
    fn name(&self) -> &'static str {
        "response_mapper"
    }

    fn process<'a>(&'a self, bubble: &'a mut Bubble) -> BoxFuture<'a, ChainResult> {
        Box::pin(async move {
            if let Err(err) = bubble.next().await {
                return write_error(bubble.exchange(), &err);
            }

            if let Some(err) = bubble.returns().iter().rev().find_map(ReturnValue::error) {
                return write_error(bubble.exchange(), err);
            }

            match bubble.returns().iter().find(|rv| !rv.is_error()) {
                Some(ReturnValue::Payload { sequence, value }) => match value {
                    Some(payload) => match payload.response_modifier() {
                        Some(modifier) => modifier.handle(bubble.exchange()),
                        None => match payload.to_json(bubble.debug()) {
                            Ok(body) => {
                                bubble.writer().write_json_bytes(StatusCode::OK, &body);
                                Ok(())
                            }
                            Err(e) => Err(serialization_failure(bubble.exchange(), &e)),
                        },
                    },
                    None => {
                        let empty: &[u8] = if *sequence { b"[]" } else { b"{}" };
                        bubble.writer().write_json_bytes(StatusCode::OK, empty);
                        Ok(())
                    }
                },
                _ => Ok(()),
            }
        })
    }
}

/// Writes the rendering of `err`.
///
/// Fails only when the error body itself cannot be serialized, after
/// writing a plain-text 500.
pub fn write_error(exchange: &Exchange, err: &ChainError) -> ChainResult {
    let status = err.status_code();
    debug!(status = status.as_u16(), error = %err, "writing error response");

    let body = err.body();
    let encoded = if exchange.debug() {
        serde_json::to_vec_pretty(&body)
    } else {
        serde_json::to_vec(&body)
    };
    match encoded {
        Ok(bytes) => {
            let writer = exchange.writer();
            writer.set_header(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
            writer.write_header(status);
            writer.write(&bytes);
            Ok(())
        }
        Err(e) => Err(serialization_failure(exchange, &e)),
    }
}

fn serialization_failure(exchange: &Exchange, err: &serde_json::Error) -> ChainError {
    error!(error = %err, "response serialization failed");
    exchange
        .writer()
        .write_text(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string());
    HttpError::internal(err.to_string()).into()
}
