//! TCP 帧编解码
//!
//! ```text
//! ┌──────────┬──────────────────┬──────────────────┐
//! │ kind: u8 │ len: u32 (LE)    │ payload (JSON)   │
//! └──────────┴──────────────────┴──────────────────┘
//! ```
//!
//! | kind | 方向 | payload |
//! |------|------|---------|
//! | 0 Publish | client → server | [`BusMessage`] |
//! | 1 Subscribe | client → server | `{"pattern": "..."}` |
//! | 2 Unsubscribe | client → server | `{"pattern": "..."}` |
//! | 3 Message | server → client | [`BusMessage`] |

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::BusMessage;

/// 单帧载荷上限 (1 MiB)
pub const MAX_FRAME_LEN: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    Publish = 0,
    Subscribe = 1,
    Unsubscribe = 2,
    Message = 3,
}

impl TryFrom<u8> for FrameKind {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FrameKind::Publish),
            1 => Ok(FrameKind::Subscribe),
            2 => Ok(FrameKind::Unsubscribe),
            3 => Ok(FrameKind::Message),
            other => Err(FrameError::UnknownKind(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PatternBody {
    pattern: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Publish(BusMessage),
    Subscribe(String),
    Unsubscribe(String),
    Message(BusMessage),
}

impl Frame {
    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Publish(_) => FrameKind::Publish,
            Frame::Subscribe(_) => FrameKind::Subscribe,
            Frame::Unsubscribe(_) => FrameKind::Unsubscribe,
            Frame::Message(_) => FrameKind::Message,
        }
    }

    fn encode_payload(&self) -> Result<Vec<u8>, FrameError> {
        let bytes = match self {
            Frame::Publish(msg) | Frame::Message(msg) => serde_json::to_vec(msg)?,
            Frame::Subscribe(pattern) | Frame::Unsubscribe(pattern) => {
                serde_json::to_vec(&PatternBody {
                    pattern: pattern.clone(),
                })?
            }
        };
        Ok(bytes)
    }

    fn decode(kind: FrameKind, payload: &[u8]) -> Result<Self, FrameError> {
        let frame = match kind {
            FrameKind::Publish => Frame::Publish(serde_json::from_slice(payload)?),
            FrameKind::Message => Frame::Message(serde_json::from_slice(payload)?),
            FrameKind::Subscribe => {
                Frame::Subscribe(serde_json::from_slice::<PatternBody>(payload)?.pattern)
            }
            FrameKind::Unsubscribe => {
                Frame::Unsubscribe(serde_json::from_slice::<PatternBody>(payload)?.pattern)
            }
        };
        Ok(frame)
    }
}

#[derive(Debug, Error)]
pub enum FrameError {
    /// 对端正常关闭连接
    #[error("peer disconnected")]
    Disconnected,

    #[error("unknown frame kind: {0}")]
    UnknownKind(u8),

    #[error("frame too large: {0} bytes")]
    TooLarge(usize),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid frame payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// 从异步流读取一帧
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Frame, FrameError> {
    let mut kind_buf = [0u8; 1];
    match reader.read_exact(&mut kind_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(FrameError::Disconnected);
        }
        Err(e) => return Err(e.into()),
    }
    let kind = FrameKind::try_from(kind_buf[0])?;

    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Frame::decode(kind, &payload)
}

/// 向异步流写入一帧
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    frame: &Frame,
) -> Result<(), FrameError> {
    let payload = frame.encode_payload()?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(payload.len()));
    }

    let mut data = Vec::with_capacity(5 + payload.len());
    data.push(frame.kind() as u8);
    data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    data.extend_from_slice(&payload);

    writer.write_all(&data).await?;
    writer.flush().await?;
    Ok(())
}
