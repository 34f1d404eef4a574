//! Length-prefixed framing: a 4-byte big-endian length, then the bytes.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use agentwire_core::{AgentError, AgentResult};

/// Write one frame and flush.
pub async fn write_frame<S>(stream: &mut S, bytes: &[u8], max_size: usize) -> AgentResult<()>
where
    S: AsyncWrite + Unpin,
{
    if bytes.len() > max_size {
        return Err(AgentError::Io(format!(
            "Message too large: {} > {}",
            bytes.len(),
            max_size
        )));
    }
    let len = u32::try_from(bytes.len())
        .map_err(|_| AgentError::Io(format!("Message too large: {}", bytes.len())))?;

    stream
        .write_all(&len.to_be_bytes())
        .await
        .map_err(|e| AgentError::Io(format!("Write error: {}", e)))?;
    stream
        .write_all(bytes)
        .await
        .map_err(|e| AgentError::Io(format!("Write error: {}", e)))?;
    stream
        .flush()
        .await
        .map_err(|e| AgentError::Io(format!("Flush error: {}", e)))?;
    Ok(())
}

/// Read one frame. `Ok(None)` on a clean end of stream.
pub async fn read_frame<S>(stream: &mut S, max_size: usize) -> AgentResult<Option<Vec<u8>>>
where
    S: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    let first = stream
        .read(&mut len_buf[..1])
        .await
        .map_err(|e| AgentError::Io(format!("Read error: {}", e)))?;
    if first == 0 {
        return Ok(None);
    }
    stream.read_exact(&mut len_buf[1..]).await.map_err(|e| {
        AgentError::Io(format!("Read error: truncated frame header: {}", e))
    })?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_size {
        return Err(AgentError::Io(format!(
            "Message too large: {} > {}",
            len, max_size
        )));
    }

    let mut msg_buf = vec![0u8; len];
    stream
        .read_exact(&mut msg_buf)
        .await
        .map_err(|e| AgentError::Io(format!("Read error: {}", e)))?;
    Ok(Some(msg_buf))
}
