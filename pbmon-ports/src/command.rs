//! Inbound operator commands.

/// A slash command received from the messaging channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundCommand {
    /// Chat the command was sent from
    pub chat_id: String,
    /// Message id, used to thread the reply
    pub message_id: i64,
    /// Command name without the leading slash or `@bot` suffix
    pub name: String,
    /// Whitespace separated arguments
    pub args: Vec<String>,
}

impl InboundCommand {
    /// Parse `/name[@bot] arg1 arg2 ...`.
    ///
    /// Returns `None` for text that is not a command.
    pub fn parse(chat_id: impl Into<String>, message_id: i64, text: &str) -> Option<Self> {
        let mut words = text.split_whitespace();
        let head = words.next()?.strip_prefix('/')?;
        let name = head.split('@').next().unwrap_or_default();
        if name.is_empty() {
            return None;
        }

        Some(Self {
            chat_id: chat_id.into(),
            message_id,
            name: name.to_string(),
            args: words.map(str::to_string).collect(),
        })
    }
}
