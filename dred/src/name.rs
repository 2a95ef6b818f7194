use std::fmt;

/// Printed for objects that have neither a narrow nor a wide debug name.
pub const NO_NAME: &str = "<no name>";

/// The debug name of a command list, queue or allocation.
///
/// The runtime records both a narrow and a wide copy of each name, either of
/// which may be missing. The narrow one wins when it has any content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugName {
    Narrow(String),
    Wide(String),
    Unnamed,
}

impl DebugName {
    pub fn select(narrow: Option<String>, wide: Option<String>) -> DebugName {
        match (narrow, wide) {
            (Some(narrow), _) if !narrow.is_empty() => DebugName::Narrow(narrow),
            (_, Some(wide)) => DebugName::Wide(wide),
            _ => DebugName::Unnamed,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DebugName::Narrow(name) | DebugName::Wide(name) => name,
            DebugName::Unnamed => NO_NAME,
        }
    }

    pub fn is_named(&self) -> bool {
        *self != DebugName::Unnamed
    }
}

impl fmt::Display for DebugName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn s(v: &str) -> Option<String> {
        Some(v.to_owned())
    }

    #[test]
    fn test_select_name() {
        assert_eq!(
            DebugName::select(None, s("queue")),
            DebugName::Wide("queue".to_owned())
        );
        assert_eq!(
            DebugName::select(s(""), s("queue")),
            DebugName::Wide("queue".to_owned())
        );
        assert_eq!(
            DebugName::select(s("list"), s("queue")),
            DebugName::Narrow("list".to_owned())
        );
        assert_eq!(
            DebugName::select(s("list"), None),
            DebugName::Narrow("list".to_owned())
        );
        assert_eq!(DebugName::select(None, None), DebugName::Unnamed);
        assert_eq!(DebugName::select(s(""), None).as_str(), NO_NAME);
        assert!(!DebugName::select(None, None).is_named());
        assert_eq!(DebugName::select(s("list"), None).to_string(), "list");
    }
}
