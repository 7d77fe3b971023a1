//! Pads: the endpoints a filter node reads from.

use std::fmt;

/// Media type selector of an input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    pub fn specifier(self) -> &'static str {
        match self {
            Self::Video => "v",
            Self::Audio => "a",
        }
    }
}

/// A stream of one of the engine inputs, e.g. `0:v`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamRef {
    pub input: usize,
    pub kind: StreamKind,
}

impl StreamRef {
    pub fn video(input: usize) -> Self {
        Self {
            input,
            kind: StreamKind::Video,
        }
    }

    pub fn audio(input: usize) -> Self {
        Self {
            input,
            kind: StreamKind::Audio,
        }
    }
}

impl fmt::Display for StreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.input, self.kind.specifier())
    }
}

/// Name of an intermediate pad written by a node.
///
/// Only ASCII alphanumerics and `_` survive; anything else is dropped so a
/// label can never break out of its brackets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(String);

impl Label {
    pub fn new(name: impl AsRef<str>) -> Self {
        let cleaned: String = name
            .as_ref()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        if cleaned.is_empty() {
            Self("_".to_string())
        } else {
            Self(cleaned)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `[name]` form used by `-map`.
    pub fn bracketed(&self) -> String {
        format!("[{}]", self.0)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anything a node can read: an input stream or a previously written label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pad {
    Stream(StreamRef),
    Label(Label),
}

impl Pad {
    pub(crate) fn render(&self, out: &mut String) {
        out.push('[');
        match self {
            Self::Stream(stream) => out.push_str(&stream.to_string()),
            Self::Label(label) => out.push_str(label.as_str()),
        }
        out.push(']');
    }

    pub fn as_label(&self) -> Option<&Label> {
        match self {
            Self::Label(label) => Some(label),
            Self::Stream(_) => None,
        }
    }
}

impl From<StreamRef> for Pad {
    fn from(stream: StreamRef) -> Self {
        Self::Stream(stream)
    }
}

impl From<Label> for Pad {
    fn from(label: Label) -> Self {
        Self::Label(label)
    }
}

impl From<&Label> for Pad {
    fn from(label: &Label) -> Self {
        Self::Label(label.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_ref_display() {
        assert_eq!(StreamRef::video(0).to_string(), "0:v");
        assert_eq!(StreamRef::audio(3).to_string(), "3:a");
    }

    #[test]
    fn test_label_is_sanitized() {
        assert_eq!(Label::new("v0").as_str(), "v0");
        assert_eq!(Label::new("a];[x").as_str(), "ax");
        assert_eq!(Label::new("]]").as_str(), "_");
    }

    #[test]
    fn test_pad_render() {
        let mut out = String::new();
        Pad::from(StreamRef::video(1)).render(&mut out);
        Pad::from(Label::new("bg")).render(&mut out);
        assert_eq!(out, "[1:v][bg]");
    }
}
