//! # IRC Parser
//!
//! This module parses the IRCv3 lines Twitch chat delivers over its websocket
//! transport, including the message tags that carry cheer metadata such as
//! `bits` and `display-name`.

use std::{collections::HashMap, str::FromStr};

use crate::error::Error;

/// A single parsed IRC line.
///
/// The trailing parameter (the part after ` :`) is stored as the last entry
/// of `params`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IrcMessage {
    pub tags: HashMap<String, String>,
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl IrcMessage {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Nickname part of a `nick!user@host` prefix
    pub fn nick(&self) -> Option<&str> {
        self.prefix
            .as_deref()
            .map(|prefix| prefix.split('!').next().unwrap_or(prefix))
            .filter(|nick| !nick.is_empty())
    }

    pub fn param(&self, idx: usize) -> Option<&str> {
        self.params.get(idx).map(String::as_str)
    }

    /// Last parameter, which for `PRIVMSG` is the chat text
    pub fn trailing(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }

    /// Bits attached to the message, if it is a cheer.
    ///
    /// A missing, malformed or zero `bits` tag is not a cheer.
    pub fn bits(&self) -> Option<u32> {
        self.tag("bits")
            .and_then(|bits| bits.parse::<u32>().ok())
            .filter(|bits| *bits > 0)
    }

    /// The `display-name` tag, falling back to the prefix nick
    pub fn display_name(&self) -> Option<&str> {
        self.tag("display-name")
            .filter(|name| !name.is_empty())
            .or_else(|| self.nick())
    }
}

impl FromStr for IrcMessage {
    type Err = Error;

    /// Parses one IRC line (without or with its trailing CRLF).
    ///
    /// # Returns
    /// * `Ok(IrcMessage)` for any syntactically valid line.
    /// * `Err(Error::ParseError)` for empty lines or lines without a command.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut rest = line.trim_end_matches(['\r', '\n']);
        if rest.trim().is_empty() {
            return Err(Error::ParseError("Empty IRC line"));
        }

        let mut message = IrcMessage::default();

        if let Some(tagged) = rest.strip_prefix('@') {
            let (raw_tags, remainder) = tagged
                .split_once(' ')
                .ok_or(Error::ParseError("IRC line has tags but no command"))?;
            message.tags = parse_tags(raw_tags);
            rest = remainder.trim_start_matches(' ');
        }

        if let Some(prefixed) = rest.strip_prefix(':') {
            let (prefix, remainder) = prefixed
                .split_once(' ')
                .ok_or(Error::ParseError("IRC line has a prefix but no command"))?;
            message.prefix = Some(prefix.to_string());
            rest = remainder.trim_start_matches(' ');
        }

        let (command, mut remainder) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            return Err(Error::ParseError("IRC line has no command"));
        }
        message.command = command.to_ascii_uppercase();

        loop {
            remainder = remainder.trim_start_matches(' ');
            if remainder.is_empty() {
                break;
            }
            if let Some(trailing) = remainder.strip_prefix(':') {
                message.params.push(trailing.to_string());
                break;
            }
            match remainder.split_once(' ') {
                Some((param, next)) => {
                    message.params.push(param.to_string());
                    remainder = next;
                }
                None => {
                    message.params.push(remainder.to_string());
                    break;
                }
            }
        }

        Ok(message)
    }
}

fn parse_tags(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter(|tag| !tag.is_empty())
        .map(|tag| match tag.split_once('=') {
            Some((key, value)) => (key.to_string(), unescape_tag_value(value)),
            None => (tag.to_string(), String::new()),
        })
        .collect()
}

/// Decodes IRCv3 tag value escapes (`\:`, `\s`, `\\`, `\r`, `\n`)
fn unescape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            // a lone trailing backslash is dropped
            None => {}
        }
    }
    out
}
