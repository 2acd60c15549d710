//! Match rules used to select messages from the bus.

use core::fmt;
use std::error;

use crate::proto::MessageType;
use crate::signature;
use crate::{Message, MessageKind, Serial, Signature};

#[cfg(test)]
mod tests;

/// The highest argument index a match rule may constrain.
const MAX_ARG: usize = 63;

/// A parsed match rule.
///
/// A field which is absent matches anything; a present field matches when
/// the message carries an equal value.
///
/// # Examples
///
/// ```
/// use corebus::MatchRule;
///
/// let rule = MatchRule::parse("type='signal',interface='com.example.Foo',arg0='bar'")?;
/// assert_eq!(
///     rule.to_string(),
///     "type='signal',interface='com.example.Foo',arg0='bar'"
/// );
/// # Ok::<_, corebus::MatchRuleError>(())
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MatchRule {
    pub(crate) kind: Option<MessageType>,
    pub(crate) reply_serial: Option<Serial>,
    pub(crate) sender: Option<Box<str>>,
    pub(crate) interface: Option<Box<str>>,
    pub(crate) member: Option<Box<str>>,
    pub(crate) path: Option<Box<str>>,
    pub(crate) destination: Option<Box<str>>,
    pub(crate) error_name: Option<Box<str>>,
    pub(crate) args: Vec<Option<Box<str>>>,
}

impl MatchRule {
    /// Construct an empty rule which matches every message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only match messages of the given kind.
    #[must_use]
    pub fn with_type(mut self, kind: MessageType) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Only match replies to the given serial.
    ///
    /// This constraint has no counterpart in the match string grammar; it
    /// exists for locally registered filters.
    #[must_use]
    pub fn with_reply_serial(mut self, serial: Serial) -> Self {
        self.reply_serial = Some(serial);
        self
    }

    /// Only match messages from the given sender.
    #[must_use]
    pub fn with_sender(mut self, sender: &str) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Only match messages carrying the given interface.
    #[must_use]
    pub fn with_interface(mut self, interface: &str) -> Self {
        self.interface = Some(interface.into());
        self
    }

    /// Only match messages carrying the given member.
    #[must_use]
    pub fn with_member(mut self, member: &str) -> Self {
        self.member = Some(member.into());
        self
    }

    /// Only match messages carrying the given path.
    #[must_use]
    pub fn with_path(mut self, path: &str) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Only match messages for the given destination.
    #[must_use]
    pub fn with_destination(mut self, destination: &str) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Only match error messages carrying the given error name.
    ///
    /// This constraint has no counterpart in the match string grammar; it
    /// exists for locally registered filters.
    #[must_use]
    pub fn with_error_name(mut self, error_name: &str) -> Self {
        self.error_name = Some(error_name.into());
        self
    }

    /// Only match messages whose string argument at `index` equals
    /// `value`. Indices up to 63 are supported.
    ///
    /// # Panics
    ///
    /// Panics if `index` is greater than 63.
    #[must_use]
    pub fn with_arg(mut self, index: usize, value: &str) -> Self {
        assert!(index <= MAX_ARG, "argument index out of range");

        if self.args.len() <= index {
            self.args.resize(index + 1, None);
        }

        self.args[index] = Some(value.into());
        self
    }

    /// Parse a match rule string.
    ///
    /// The grammar is a comma separated list of `key='value'` pairs with
    /// the keys `type`, `sender`, `interface`, `member`, `path`,
    /// `destination` and `arg0` through `arg63`. Unknown keys are
    /// rejected; values may not contain a quote.
    pub fn parse(string: &str) -> Result<Self, MatchRuleError> {
        let mut rule = Self::new();
        let mut rest = string.as_bytes();

        while !rest.is_empty() {
            let Some(eq) = rest.iter().position(|&b| b == b'=') else {
                return Err(MatchRuleError::new(string, "missing `=`"));
            };

            let key = &rest[..eq];

            if rest.get(eq + 1) != Some(&b'\'') {
                return Err(MatchRuleError::new(string, "value must be quoted"));
            }

            let value_start = eq + 2;

            let Some(quote) = rest[value_start..].iter().position(|&b| b == b'\'') else {
                return Err(MatchRuleError::new(string, "unterminated value"));
            };

            let value = &rest[value_start..value_start + quote];

            let Ok(value) = core::str::from_utf8(value) else {
                return Err(MatchRuleError::new(string, "value is not UTF-8"));
            };

            rest = &rest[value_start + quote + 1..];

            match rest.first() {
                None => {}
                Some(b',') => rest = &rest[1..],
                Some(..) => {
                    return Err(MatchRuleError::new(string, "expected `,` between pairs"));
                }
            }

            match key {
                b"type" => {
                    rule.kind = Some(match value {
                        "method_call" => MessageType::METHOD_CALL,
                        "method_return" => MessageType::METHOD_RETURN,
                        "error" => MessageType::ERROR,
                        "signal" => MessageType::SIGNAL,
                        _ => return Err(MatchRuleError::new(string, "unknown message type")),
                    });
                }
                b"sender" => rule.sender = Some(value.into()),
                b"interface" => rule.interface = Some(value.into()),
                b"member" => rule.member = Some(value.into()),
                b"path" => rule.path = Some(value.into()),
                b"destination" => rule.destination = Some(value.into()),
                _ => {
                    let Some(index) = arg_index(key) else {
                        return Err(MatchRuleError::new(string, "unknown key"));
                    };

                    if rule.args.len() <= index {
                        rule.args.resize(index + 1, None);
                    }

                    rule.args[index] = Some(value.into());
                }
            }
        }

        Ok(rule)
    }

    /// Test the rule against a message.
    ///
    /// Rules are order-invariant; argument constraints compare against
    /// the leading arguments of the body, where a non-string argument or
    /// one past the end of the body never matches.
    pub fn matches(&self, message: &Message<'_>) -> bool {
        if let Some(kind) = self.kind {
            if message.message_type() != kind {
                return false;
            }
        }

        if let Some(serial) = self.reply_serial {
            let reply_serial = match message.kind() {
                MessageKind::MethodReturn { reply_serial } => Some(reply_serial),
                MessageKind::Error { reply_serial, .. } => Some(reply_serial),
                _ => None,
            };

            if reply_serial != Some(serial) {
                return false;
            }
        }

        let (path, member, error_name) = match message.kind() {
            MessageKind::MethodCall { path, member } => (Some(path), Some(member), None),
            MessageKind::Signal { path, member } => (Some(path), Some(member), None),
            MessageKind::Error { error_name, .. } => (None, None, Some(error_name)),
            MessageKind::MethodReturn { .. } => (None, None, None),
        };

        if !field_matches(self.sender.as_deref(), message.sender()) {
            return false;
        }

        if !field_matches(self.destination.as_deref(), message.destination()) {
            return false;
        }

        if !field_matches(self.interface.as_deref(), message.interface()) {
            return false;
        }

        if !field_matches(self.path.as_deref(), path.map(|p| p.as_str())) {
            return false;
        }

        if !field_matches(self.member.as_deref(), member) {
            return false;
        }

        if !field_matches(self.error_name.as_deref(), error_name) {
            return false;
        }

        if !self.args.is_empty() && !self.args_match(message) {
            return false;
        }

        true
    }

    fn args_match(&self, message: &Message<'_>) -> bool {
        let mut body = message.body();
        let mut sig = body.signature().as_bytes();

        for wanted in &self.args {
            let Some(n) = signature::next_type(sig) else {
                // The argument vector always ends in a constraint, so
                // running out of arguments here means no match.
                return false;
            };

            let ty = &sig[..n];
            sig = &sig[n..];

            match wanted {
                Some(wanted) => {
                    if ty != b"s" {
                        return false;
                    }

                    match body.read::<str>() {
                        Ok(value) if value == wanted.as_ref() => {}
                        _ => return false,
                    }
                }
                None => {
                    let Ok(ty) = Signature::new(ty) else {
                        return false;
                    };

                    if signature::skip(ty, &mut body).is_err() {
                        return false;
                    }
                }
            }
        }

        true
    }
}

fn field_matches(rule: Option<&str>, message: Option<&str>) -> bool {
    match (rule, message) {
        (None, _) => true,
        (Some(..), None) => false,
        (Some(a), Some(b)) => a == b,
    }
}

/// Parse an `arg<N>` key with N in `0..=63`.
fn arg_index(key: &[u8]) -> Option<usize> {
    let digits = key.strip_prefix(b"arg")?;

    if digits.is_empty() || digits.len() > 2 || digits[0] == b'0' && digits.len() > 1 {
        return None;
    }

    let mut index = 0usize;

    for &b in digits {
        if !b.is_ascii_digit() {
            return None;
        }

        index = index * 10 + usize::from(b - b'0');
    }

    (index <= MAX_ARG).then_some(index)
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";

        if let Some(kind) = self.kind {
            let name = match kind {
                MessageType::METHOD_CALL => "method_call",
                MessageType::METHOD_RETURN => "method_return",
                MessageType::ERROR => "error",
                _ => "signal",
            };

            write!(f, "type='{name}'")?;
            sep = ",";
        }

        for (key, value) in [
            ("sender", &self.sender),
            ("interface", &self.interface),
            ("member", &self.member),
            ("path", &self.path),
            ("destination", &self.destination),
        ] {
            if let Some(value) = value {
                write!(f, "{sep}{key}='{value}'")?;
                sep = ",";
            }
        }

        for (index, value) in self.args.iter().enumerate() {
            if let Some(value) = value {
                write!(f, "{sep}arg{index}='{value}'")?;
                sep = ",";
            }
        }

        Ok(())
    }
}

/// Error raised when parsing a match rule fails.
#[derive(Debug, PartialEq, Eq)]
pub struct MatchRuleError {
    rule: Box<str>,
    reason: &'static str,
}

impl MatchRuleError {
    fn new(rule: &str, reason: &'static str) -> Self {
        Self {
            rule: rule.into(),
            reason,
        }
    }
}

impl fmt::Display for MatchRuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid match rule {:?}: {}", self.rule, self.reason)
    }
}

impl error::Error for MatchRuleError {}
