use crate::task::Task;

/// Matcher for virtual-list filter queries.
///
/// A query is whitespace separated terms that must all match: `+tag` and
/// `@context` match exactly, `key:value` matches a metadata value, and any
/// other word is a case-insensitive substring of the title or body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFilter {
    terms: Vec<Term>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Term {
    Tag(String),
    Context(String),
    Meta(String, String),
    List(String),
    Text(String),
}

impl TaskFilter {
    /// Parse a query string. Returns `None` for blank inputs.
    pub fn new(query: &str) -> Option<Self> {
        let terms: Vec<Term> = query.split_whitespace().map(parse_term).collect();
        if terms.is_empty() {
            return None;
        }
        Some(Self { terms })
    }

    /// Determine whether every term of the query matches `task`.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.terms.iter().all(|term| match term {
            Term::Tag(tag) => task.tags.iter().any(|t| t == tag),
            Term::Context(ctx) => task.context.iter().any(|c| c == ctx),
            Term::Meta(key, value) => task.meta.get(key).iter().any(|v| v == value),
            Term::List(list) => task.list == *list,
            Term::Text(needle) => {
                contains_folded(&task.text, needle)
                    || task.description.iter().any(|line| contains_folded(line, needle))
            }
        })
    }
}

fn parse_term(raw: &str) -> Term {
    if let Some(tag) = raw.strip_prefix('+').filter(|t| !t.is_empty()) {
        return Term::Tag(tag.to_owned());
    }
    if let Some(ctx) = raw.strip_prefix('@').filter(|c| !c.is_empty()) {
        return Term::Context(ctx.to_owned());
    }
    if let Some((key, value)) = raw.split_once(':')
        && !key.is_empty()
        && !value.is_empty()
    {
        if key == "list" {
            return Term::List(value.to_owned());
        }
        return Term::Meta(key.to_owned(), value.trim_matches('"').to_owned());
    }
    Term::Text(raw.to_lowercase())
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::reader::extract_tasks;
    use std::path::Path;

    fn task(text: &str) -> Task {
        extract_tasks(Path::new("f.md"), text, &Config::default())
            .into_iter()
            .next()
            .unwrap_or_else(|| panic!("fixture must hold a task"))
    }

    #[test]
    fn filter_skips_blank_queries() {
        assert!(TaskFilter::new("").is_none());
        assert!(TaskFilter::new("   ").is_none());
        assert!(TaskFilter::new("\n").is_none());
    }

    #[test]
    fn filter_matches_all_terms() {
        let task = task("#DOING Lamport Clock +urgent @work\nowner:ann\nRefactor filters\n");

        let hit = |query: &str| {
            TaskFilter::new(query)
                .unwrap_or_else(|| panic!("filter must exist for queries with content"))
                .matches(&task)
        };
        assert!(hit("clock"));
        assert!(hit("REFACTOR"));
        assert!(hit("+urgent"));
        assert!(hit("@work owner:ann"));
        assert!(hit("list:DOING +urgent"));
        assert!(!hit("+urgent list:TODO"));
        assert!(!hit("owner:bob"));
        assert!(!hit("missing"));
    }
}
