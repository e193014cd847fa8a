//! Envelope framing: one JSON document per line.
//!
//! Decoding inspects the `kind` and `body.type` discriminants before
//! building the typed value, so an unknown variant is reported as
//! [`CodecError::UnsupportedVariant`] rather than as garbage input.

use crate::protocol::{Envelope, Request, Response};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("peer closed without sending a message")]
    Closed,
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported variant: {0}")]
    UnsupportedVariant(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, CodecError> {
    let mut out = serde_json::to_vec(envelope)?;
    out.push(b'\n');
    Ok(out)
}

pub fn decode(bytes: &[u8]) -> Result<Envelope, CodecError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(CodecError::Closed);
    }
    let value: Value = serde_json::from_slice(bytes)?;
    check_registered(&value)?;
    Ok(serde_json::from_value(value)?)
}

/// Rejects envelopes whose discriminants name no known variant. Shapes that
/// lack the discriminants entirely are left for serde to report as malformed.
fn check_registered(value: &Value) -> Result<(), CodecError> {
    let Some(kind) = value.get("kind").and_then(Value::as_str) else {
        return Ok(());
    };
    if !Envelope::KINDS.contains(&kind) {
        return Err(CodecError::UnsupportedVariant(kind.to_string()));
    }
    let Some(tag) = value
        .get("body")
        .and_then(|body| body.get("type"))
        .and_then(Value::as_str)
    else {
        return Ok(());
    };
    let known = match kind {
        "request" => Request::TAGS,
        _ => Response::TAGS,
    };
    if !known.contains(&tag) {
        return Err(CodecError::UnsupportedVariant(format!("{kind}/{tag}")));
    }
    Ok(())
}

/// Reads exactly one envelope. A peer that hangs up before sending anything
/// yields [`CodecError::Closed`].
pub async fn read_envelope<R>(reader: &mut R) -> Result<Envelope, CodecError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let n = reader.read_until(b'\n', &mut line).await?;
    if n == 0 {
        return Err(CodecError::Closed);
    }
    decode(&line)
}

pub async fn write_envelope<W>(writer: &mut W, envelope: &Envelope) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
{
    let bytes = encode(envelope)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}
