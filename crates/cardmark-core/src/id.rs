use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, path::Path, str::FromStr};
use uuid::Uuid;

/// Identifier of a task (UUID v5 derived from its location).
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Derive the identifier of the task starting at `line` in `path`.
    ///
    /// The same file position always yields the same id, so a re-scan of an
    /// unchanged file reproduces the ids handed out before.
    #[must_use]
    pub fn from_location(path: &Path, line: usize) -> Self {
        let key = format!("{}#L{line}", path.to_string_lossy());
        Self(Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes()))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Serialize for TaskId {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_uses_uuid_v5() {
        let id = TaskId::from_location(Path::new("notes/todo.md"), 3);
        assert_eq!(id.0.get_version_num(), 5);
    }

    #[test]
    fn task_id_is_stable_per_location() {
        let a = TaskId::from_location(Path::new("a.md"), 1);
        let b = TaskId::from_location(Path::new("a.md"), 1);
        let c = TaskId::from_location(Path::new("a.md"), 2);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn task_id_roundtrip() {
        let id = TaskId::from_location(Path::new("src/lib.rs"), 42);
        let parsed: TaskId = id.to_string().parse().expect("must parse task id");
        assert_eq!(parsed, id);
    }
}
