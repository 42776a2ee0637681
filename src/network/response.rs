use super::wire;

/// Something queued for a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Output of the client's own command
    Reply(String),
    /// A refused command
    Refusal(String),
    /// Unprompted, e.g. a transfer finishing
    Notice(String),
}
impl Response {
    pub fn write(&self, buf: &mut Vec<u8>) {
        match self {
            Response::Reply(text) => wire::encode_line(buf, "", text),
            Response::Refusal(text) => wire::encode_line(buf, "! ", text),
            Response::Notice(text) => wire::encode_line(buf, "* ", text),
        }
    }
}
