#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Sender {
    You,
    Bot,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Message {
    pub(crate) sender: Sender,
    pub(crate) text: String,
    pub(crate) is_typing: bool,
}

impl Message {
    pub(crate) fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::You,
            text: text.into(),
            is_typing: false,
        }
    }

    pub(crate) fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
            is_typing: false,
        }
    }

    fn placeholder() -> Self {
        Self {
            sender: Sender::Bot,
            text: String::new(),
            is_typing: true,
        }
    }
}

/// Append-only conversation log. At most one typing placeholder exists and it
/// is always the last entry.
#[derive(Debug, Default)]
pub(crate) struct Transcript {
    entries: Vec<Message>,
}

impl Transcript {
    pub(crate) fn entries(&self) -> &[Message] {
        &self.entries
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn has_placeholder(&self) -> bool {
        self.entries.last().is_some_and(|m| m.is_typing)
    }

    /// Appends a finalized message. Refused while a placeholder is pending,
    /// since the placeholder must stay last.
    pub(crate) fn push(&mut self, msg: Message) -> bool {
        if msg.is_typing || self.has_placeholder() {
            return false;
        }
        self.entries.push(msg);
        true
    }

    /// Returns false if a placeholder is already pending.
    pub(crate) fn push_placeholder(&mut self) -> bool {
        if self.has_placeholder() {
            return false;
        }
        self.entries.push(Message::placeholder());
        true
    }

    /// Removes a pending placeholder that will never be settled.
    pub(crate) fn discard_placeholder(&mut self) -> bool {
        if self.has_placeholder() {
            self.entries.pop();
            return true;
        }
        false
    }

    /// Drops the placeholder (if any) and appends the final message.
    pub(crate) fn settle(&mut self, msg: Message) {
        self.entries.retain(|m| !m.is_typing);
        self.entries.push(msg);
    }
}
