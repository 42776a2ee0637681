//! Console framing: one command per line, LF or CRLF terminated.

/// Longest line a client may send, terminator included.
pub const MAX_LINE: usize = 1024;

/// Splits off the first complete line, without its terminator.
pub fn line(buf: &[u8]) -> Option<(&[u8], &[u8])> {
    let end = buf.iter().position(|&b| b == b'\n')?;
    let (line, rem) = (&buf[..end], &buf[end + 1..]);
    Some((line.strip_suffix(b"\r").unwrap_or(line), rem))
}

pub fn encode_line(buf: &mut Vec<u8>, prefix: &str, text: &str) {
    buf.extend_from_slice(prefix.as_bytes());
    // a message may not smuggle in extra lines
    buf.extend(text.bytes().map(|b| if b == b'\n' || b == b'\r' { b' ' } else { b }));
    buf.extend_from_slice(b"\r\n");
}
