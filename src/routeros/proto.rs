//! RouterOS API wire format.
//!
//! A sentence is a sequence of length-prefixed words terminated by an empty
//! word. Lengths use a 1-5 byte variable encoding where the high bits of the
//! first byte say how many bytes follow.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{ApiError, Record, Reply};

/// Largest word we accept from a device.
const MAX_WORD_LEN: usize = 16 * 1024 * 1024;

pub fn encode_length(len: usize) -> Vec<u8> {
    let len = len as u32;
    match len {
        0..=0x7F => vec![len as u8],
        0x80..=0x3FFF => {
            let v = len | 0x8000;
            vec![(v >> 8) as u8, v as u8]
        }
        0x4000..=0x1F_FFFF => {
            let v = len | 0xC0_0000;
            vec![(v >> 16) as u8, (v >> 8) as u8, v as u8]
        }
        0x20_0000..=0x0FFF_FFFF => {
            let v = len | 0xE000_0000;
            vec![(v >> 24) as u8, (v >> 16) as u8, (v >> 8) as u8, v as u8]
        }
        _ => vec![0xF0, (len >> 24) as u8, (len >> 16) as u8, (len >> 8) as u8, len as u8],
    }
}

async fn read_length<R: AsyncRead + Unpin>(reader: &mut R) -> Result<usize, ApiError> {
    let first = reader.read_u8().await?;
    let (extra, mut value) = match first {
        b if b & 0x80 == 0x00 => (0, u32::from(b)),
        b if b & 0xC0 == 0x80 => (1, u32::from(b & 0x3F)),
        b if b & 0xE0 == 0xC0 => (2, u32::from(b & 0x1F)),
        b if b & 0xF0 == 0xE0 => (3, u32::from(b & 0x0F)),
        0xF0 => (4, 0),
        b => {
            return Err(ApiError::Protocol(format!(
                "invalid length prefix 0x{:02x}",
                b
            )))
        }
    };
    for _ in 0..extra {
        value = (value << 8) | u32::from(reader.read_u8().await?);
    }
    Ok(value as usize)
}

async fn read_word<R: AsyncRead + Unpin>(reader: &mut R) -> Result<String, ApiError> {
    let len = read_length(reader).await?;
    if len > MAX_WORD_LEN {
        return Err(ApiError::Protocol(format!("word of {} bytes is too long", len)));
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    // RouterOS is not strict about encodings; comments may be latin-1.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub async fn read_sentence<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<String>, ApiError> {
    let mut words = Vec::new();
    loop {
        let word = read_word(reader).await?;
        if word.is_empty() {
            return Ok(words);
        }
        words.push(word);
    }
}

pub async fn write_sentence<W, S>(writer: &mut W, words: &[S]) -> Result<(), ApiError>
where
    W: AsyncWrite + Unpin,
    S: AsRef<str>,
{
    let mut buf = Vec::new();
    for word in words {
        let bytes = word.as_ref().as_bytes();
        buf.extend_from_slice(&encode_length(bytes.len()));
        buf.extend_from_slice(bytes);
    }
    buf.push(0);
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Split an attribute word `=key=value` into its parts.
///
/// Keys never contain `=`, values may (`=comment=a=b`).
fn parse_attribute(word: &str) -> Option<(String, String)> {
    let rest = word.strip_prefix('=')?;
    let (key, value) = rest.split_once('=')?;
    Some((key.to_string(), value.to_string()))
}

fn attributes(words: &[String]) -> Record {
    words.iter().filter_map(|w| parse_attribute(w)).collect()
}

/// Read sentences until the command completes.
pub async fn read_reply<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Reply, ApiError> {
    let mut reply = Reply::default();
    let mut trap: Option<ApiError> = None;

    loop {
        let sentence = read_sentence(reader).await?;
        let Some((kind, rest)) = sentence.split_first() else {
            continue;
        };
        match kind.as_str() {
            "!re" => reply.records.push(attributes(rest)),
            "!done" => {
                reply.done = attributes(rest);
                return match trap {
                    Some(err) => Err(err),
                    None => Ok(reply),
                };
            }
            "!trap" => {
                let attrs = attributes(rest);
                // keep the first trap, the device may send several
                if trap.is_none() {
                    trap = Some(ApiError::Trap {
                        message: attrs.get("message").cloned().unwrap_or_default(),
                        category: attrs.get("category").and_then(|c| c.parse().ok()),
                    });
                }
            }
            "!fatal" => {
                let message = rest.first().cloned().unwrap_or_default();
                return Err(ApiError::Fatal(message));
            }
            "!empty" => {}
            other => {
                return Err(ApiError::Protocol(format!(
                    "unexpected reply word '{}'",
                    other
                )))
            }
        }
    }
}
