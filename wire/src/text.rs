//! `key|value` lines, the shape of most text-bearing payloads.
//!
//! ```text
//! action|input
//! |text|!warp start
//! ```
//! A single leading `|` on a line is tolerated, as seen in chat input.

/// Parsed fields of a text payload, in the order they appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextFields<'a> {
    pairs: Vec<(&'a str, &'a str)>,
}

impl<'a> TextFields<'a> {
    pub fn parse(text: &'a str) -> Self {
        let pairs = text
            .split('\n')
            .map(|line| line.strip_prefix('|').unwrap_or(line))
            .filter(|line| !line.is_empty())
            .map(|line| line.split_once('|').unwrap_or((line, "")))
            .collect();
        Self { pairs }
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.pairs.iter().find(|(k, _)| *k == key).map(|&(_, v)| v)
    }

    pub fn action(&self) -> Option<&'a str> {
        self.get("action")
    }

    /// The typed line, if this is a chat submission.
    pub fn chat_input(&self) -> Option<&'a str> {
        match self.action() {
            Some("input") => self.get("text"),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.pairs.iter().copied()
    }
}
