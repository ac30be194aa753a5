//! Extraction of routing discriminators from update content.

/// A `/command` at the start of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<'a> {
    /// Command name without the slash or bot suffix.
    pub name: &'a str,
    /// Bot named in `/command@bot`, if any.
    pub bot_name: Option<&'a str>,
    /// Everything after the command token, leading whitespace trimmed.
    pub payload: &'a str,
}

impl Command<'_> {
    /// Whether this command is meant for the bot called `username`.
    ///
    /// Unaddressed commands are meant for every bot in the chat.
    pub fn is_for(&self, username: Option<&str>) -> bool {
        match (self.bot_name, username) {
            (None, _) => true,
            (Some(target), Some(me)) => target.eq_ignore_ascii_case(me),
            (Some(_), None) => false,
        }
    }
}

/// Parse a leading `/command[@bot] [payload]`.
///
/// Returns `None` when `text` does not start with a slash or the command
/// name is empty.
pub fn parse_command(text: &str) -> Option<Command<'_>> {
    let rest = text.strip_prefix('/')?;
    let (token, payload) = match rest.find(char::is_whitespace) {
        Some(i) => (&rest[..i], rest[i..].trim_start()),
        None => (rest, ""),
    };
    let (name, bot_name) = match token.split_once('@') {
        Some((name, bot)) => (name, Some(bot)),
        None => (token, None),
    };
    if name.is_empty() {
        return None;
    }
    Some(Command {
        name,
        bot_name,
        payload,
    })
}

/// Split callback data into `(key, payload)`.
///
/// Data is `key|payload`; a leading form feed (written by some keyboard
/// builders as a unique-button marker) is ignored. Data without a separator
/// is all key.
pub fn parse_callback_data(data: &str) -> (&str, &str) {
    let data = data.strip_prefix('\u{c}').unwrap_or(data);
    data.split_once('|').unwrap_or((data, ""))
}
