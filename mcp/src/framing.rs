// Content-Length framing (LSP style), shared by the host transport and the
// server loop: a `Content-Length: N` header line, a blank line, then exactly
// N bytes of JSON payload.

use log::{debug, error};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::errors::{McpError, McpResult};

// A header section larger than this means the peer is not speaking the
// protocol.
const MAX_HEADER_BYTES: usize = 4096;

/// Reads one complete framed message. `Ok(None)` is a clean EOF (peer
/// closed between messages); EOF mid-frame is a transport error.
pub async fn read_message<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buffer: &mut Vec<u8>,
) -> McpResult<Option<String>> {
    let mut content_length: Option<usize> = None;

    buffer.clear();

    // Read headers line by line
    loop {
        let start = buffer.len();
        let bytes_read = reader
            .read_until(b'\n', buffer)
            .await
            .map_err(|e| McpError::Transport(format!("Failed to read headers: {}", e)))?;

        if bytes_read == 0 {
            return if buffer.is_empty() {
                Ok(None) // Clean EOF
            } else {
                Err(McpError::Transport(
                    "Connection closed mid-headers".to_string(),
                ))
            };
        }

        let line_cow = String::from_utf8_lossy(&buffer[start..]);
        let line = line_cow.trim_end();

        // Blank line ends the header section
        if line.is_empty() {
            break;
        }

        if let Some(rest) = line
            .strip_prefix("Content-Length:")
            .or_else(|| line.strip_prefix("content-length:"))
        {
            let len = rest.trim().parse::<usize>().map_err(|_| {
                McpError::Protocol(format!("Invalid Content-Length value: {}", rest.trim()))
            })?;
            content_length = Some(len);
        }
        // Other headers (Content-Type) are tolerated and ignored.

        if buffer.len() > MAX_HEADER_BYTES {
            return Err(McpError::Protocol("Header section too large".to_string()));
        }
    }

    let length =
        content_length.ok_or_else(|| McpError::Protocol("Missing Content-Length header".into()))?;

    // Read the exact content length
    buffer.clear();
    buffer.resize(length, 0);
    reader
        .read_exact(buffer)
        .await
        .map_err(|e| McpError::Transport(format!("Failed to read {} byte payload: {}", length, e)))?;

    let payload = String::from_utf8(std::mem::take(buffer))
        .map_err(|e| McpError::Protocol(format!("Payload is not UTF-8: {}", e)))?;
    debug!("<- {}", payload);
    Ok(Some(payload))
}

/// Writes one framed message and flushes, so delivery is never stalled in a
/// buffer while the peer awaits a response.
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, payload: &str) -> McpResult<()> {
    debug!("-> {}", payload);
    let framed = format!("Content-Length: {}\r\n\r\n{}", payload.len(), payload);
    writer.write_all(framed.as_bytes()).await.map_err(|e| {
        error!("Failed to write frame: {}", e);
        McpError::Transport(format!("Failed to write frame: {}", e))
    })?;
    writer
        .flush()
        .await
        .map_err(|e| McpError::Transport(format!("Failed to flush frame: {}", e)))
}
