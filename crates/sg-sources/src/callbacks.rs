//! Change callbacks and global ignore rules.

use std::fmt;
use std::sync::Arc;

use sg_core::{PathMatcher, SourceFile, SourceType};

/// Handler invoked with the updated and removed files of one routed batch.
pub type ChangeHandler = Arc<dyn Fn(&[SourceFile], &[SourceFile]) + Send + Sync>;

/// Predicate deciding whether a file is globally ignored.
pub type IgnorePredicate = Arc<dyn Fn(&SourceFile) -> bool + Send + Sync>;

/// Which files a callback or ignore rule cares about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Interest {
    /// Every file, whatever its collection.
    All,
    /// Files tagged with this collection.
    Type(SourceType),
}

impl Interest {
    /// Returns `true` if `file` falls under this interest.
    #[must_use]
    pub fn matches(&self, file: &SourceFile) -> bool {
        match self {
            Self::All => true,
            Self::Type(source_type) => file.has_type(source_type),
        }
    }
}

impl From<SourceType> for Interest {
    fn from(source_type: SourceType) -> Self {
        Self::Type(source_type)
    }
}

impl fmt::Display for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Type(source_type) => write!(f, "{source_type}"),
        }
    }
}

/// A registered change callback.
#[derive(Clone)]
pub struct CallbackDescriptor {
    /// Files this callback is told about.
    pub interest: Interest,
    /// The handler.
    pub handler: ChangeHandler,
}

impl CallbackDescriptor {
    /// Invokes the handler with the part of the batch it is interested in.
    ///
    /// A typed callback is skipped when neither half of its subset has
    /// anything in it.
    pub(crate) fn dispatch(&self, updated: &[SourceFile], removed: &[SourceFile]) {
        match &self.interest {
            Interest::All => (self.handler)(updated, removed),
            Interest::Type(_) => {
                let updated: Vec<SourceFile> = updated
                    .iter()
                    .filter(|f| self.interest.matches(f))
                    .cloned()
                    .collect();
                let removed: Vec<SourceFile> = removed
                    .iter()
                    .filter(|f| self.interest.matches(f))
                    .cloned()
                    .collect();
                if updated.is_empty() && removed.is_empty() {
                    return;
                }
                (self.handler)(&updated, &removed);
            }
        }
    }
}

impl fmt::Debug for CallbackDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackDescriptor")
            .field("interest", &self.interest)
            .finish_non_exhaustive()
    }
}

/// How a global ignore decides whether a file is ignored.
#[derive(Clone)]
pub enum IgnoreRule {
    /// Tested against the file's relative path.
    Matcher(PathMatcher),
    /// Arbitrary test on the whole file record.
    Predicate(IgnorePredicate),
}

impl IgnoreRule {
    /// Wraps a closure as a predicate rule.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&SourceFile) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    fn is_match(&self, file: &SourceFile) -> bool {
        match self {
            Self::Matcher(matcher) => matcher.is_match(file.relative_path().as_str()),
            Self::Predicate(predicate) => predicate(file),
        }
    }
}

impl From<PathMatcher> for IgnoreRule {
    fn from(matcher: PathMatcher) -> Self {
        Self::Matcher(matcher)
    }
}

impl fmt::Debug for IgnoreRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matcher(matcher) => f.debug_tuple("Matcher").field(matcher).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// A named global ignore.
#[derive(Debug, Clone)]
pub(crate) struct GlobalIgnore {
    pub(crate) name: String,
    pub(crate) interest: Interest,
    pub(crate) rule: IgnoreRule,
}

impl GlobalIgnore {
    pub(crate) fn ignores(&self, file: &SourceFile) -> bool {
        self.interest.matches(file) && self.rule.is_match(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn file(path: &str, source_type: SourceType) -> SourceFile {
        SourceFile::new(path, format!("/site/{path}"), source_type)
    }

    fn recording(interest: Interest) -> (CallbackDescriptor, Arc<Mutex<Vec<(usize, usize)>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&calls);
        let descriptor = CallbackDescriptor {
            interest,
            handler: Arc::new(move |updated, removed| {
                seen.lock().push((updated.len(), removed.len()));
            }),
        };
        (descriptor, calls)
    }

    #[test]
    fn test_all_interest_gets_everything() {
        let (cb, calls) = recording(Interest::All);
        cb.dispatch(
            &[file("a.html", SourceType::Source), file("x.yml", SourceType::Data)],
            &[],
        );
        assert_eq!(*calls.lock(), vec![(2, 0)]);
    }

    #[test]
    fn test_typed_interest_gets_subset() {
        let (cb, calls) = recording(Interest::Type(SourceType::Data));
        cb.dispatch(
            &[file("a.html", SourceType::Source), file("x.yml", SourceType::Data)],
            &[file("y.yml", SourceType::Data)],
        );
        assert_eq!(*calls.lock(), vec![(1, 1)]);
    }

    #[test]
    fn test_typed_interest_skipped_when_empty() {
        let (cb, calls) = recording(Interest::Type(SourceType::Locales));
        cb.dispatch(&[file("a.html", SourceType::Source)], &[]);
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn test_multi_typed_file_matches_each_type() {
        let shared = file("a.yml", SourceType::Data).with_type(SourceType::Reload);
        assert!(Interest::Type(SourceType::Data).matches(&shared));
        assert!(Interest::Type(SourceType::Reload).matches(&shared));
        assert!(!Interest::Type(SourceType::Source).matches(&shared));
    }

    #[test]
    fn test_global_ignore_rules() {
        let by_path = GlobalIgnore {
            name: "drafts".to_owned(),
            interest: Interest::Type(SourceType::Source),
            rule: PathMatcher::parse("drafts/*").unwrap().into(),
        };
        assert!(by_path.ignores(&file("drafts/wip.md", SourceType::Source)));
        assert!(!by_path.ignores(&file("drafts/wip.md", SourceType::Data)));
        assert!(!by_path.ignores(&file("posts/done.md", SourceType::Source)));

        let by_predicate = GlobalIgnore {
            name: "dirs".to_owned(),
            interest: Interest::All,
            rule: IgnoreRule::predicate(SourceFile::is_directory),
        };
        assert!(!by_predicate.ignores(&file("a.html", SourceType::Source)));
        assert!(by_predicate.ignores(&file("blog", SourceType::Source).into_directory()));
        assert_eq!(format!("{:?}", by_predicate.rule), "Predicate(..)");
    }

    #[test]
    fn test_interest_display() {
        assert_eq!(Interest::All.to_string(), "all");
        assert_eq!(Interest::from(SourceType::Data).to_string(), "data");
    }
}
