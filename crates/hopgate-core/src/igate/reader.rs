//! APRS-IS server stream reader.

use super::{Igate, IgateCounters};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Longest server line kept; the rest of a longer line is discarded
pub const MAX_SERVER_LINE: usize = 1000;

/// Feed every line from the server to [`Igate::xmit_line`] until EOF
///
/// Lines end at LF; a trailing CR is removed. Lines starting with `#` are
/// server comments and are only logged.
///
/// # Errors
///
/// Returns the underlying I/O error if reading fails.
pub async fn read_server_lines<R>(mut reader: R, igate: &Igate) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::with_capacity(MAX_SERVER_LINE);
    loop {
        line.clear();
        let n = read_capped_line(&mut reader, &mut line).await?;
        if n == 0 {
            tracing::info!("IGate: server stream closed");
            return Ok(());
        }
        IgateCounters::bump(&igate.stats.server_lines);
        IgateCounters::add(&igate.stats.server_bytes, n as u64);

        handle_server_line(&mut line, igate);
    }
}

/// Read up to and including the next LF, keeping at most
/// [`MAX_SERVER_LINE`] bytes of it in `line` (LF excluded)
///
/// Returns the number of bytes consumed from `reader`; 0 means EOF.
async fn read_capped_line<R>(reader: &mut R, line: &mut Vec<u8>) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut consumed = 0;
    let mut discarded = 0;
    loop {
        let (used, done) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                break;
            }
            let (content, used, done) = match available.iter().position(|&b| b == b'\n') {
                Some(i) => (&available[..i], i + 1, true),
                None => (available, available.len(), false),
            };
            let keep = content.len().min(MAX_SERVER_LINE - line.len());
            line.extend_from_slice(&content[..keep]);
            discarded += content.len() - keep;
            (used, done)
        };
        reader.consume(used);
        consumed += used;
        if done {
            break;
        }
    }

    if discarded > 0 {
        tracing::debug!("IGate: server line truncated, {} bytes discarded", discarded);
    }
    Ok(consumed)
}

fn handle_server_line(line: &mut Vec<u8>, igate: &Igate) {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    if line.is_empty() {
        return;
    }

    let text = String::from_utf8_lossy(line);
    if line.first() == Some(&b'#') {
        tracing::debug!("[ig] {}", text);
        return;
    }
    tracing::debug!("[ig>] {}", text);

    igate.xmit_line(line);
}
