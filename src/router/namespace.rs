use std::fmt;

/// A namespace path such as `/` or `/admin`.
///
/// Always starts with `/` and never ends with one, except for the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(String);

impl Namespace {
    pub fn root() -> Self {
        Namespace("/".to_string())
    }

    /// Normalizes a request path into a namespace: `admin`, `/admin` and
    /// `/admin/` are all `/admin`; an empty path is the root.
    pub fn parse(path: &str) -> Self {
        let trimmed = path.trim().trim_matches('/');
        if trimmed.is_empty() {
            Self::root()
        } else {
            Namespace(format!("/{trimmed}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
