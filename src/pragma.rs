//! Pragma metadata and the region kinds of a task graph.

use std::fmt;
use std::str::FromStr;

/// The directive of a pragma-annotated region.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PragmaKind {
    For,
    Parallel,
    Barrier,
    Single,
    Task,
    TaskWait,
}

impl PragmaKind {
    pub fn name(self) -> &'static str {
        match self {
            PragmaKind::For => "for",
            PragmaKind::Parallel => "parallel",
            PragmaKind::Barrier => "barrier",
            PragmaKind::Single => "single",
            PragmaKind::Task => "task",
            PragmaKind::TaskWait => "taskwait",
        }
    }
}

impl fmt::Display for PragmaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
#[error("unknown pragma directive '{0}'")]
pub struct UnknownPragma(pub String);

impl FromStr for PragmaKind {
    type Err = UnknownPragma;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "for" => Ok(PragmaKind::For),
            "parallel" => Ok(PragmaKind::Parallel),
            "barrier" => Ok(PragmaKind::Barrier),
            "single" => Ok(PragmaKind::Single),
            "task" => Ok(PragmaKind::Task),
            "taskwait" | "task-wait" => Ok(PragmaKind::TaskWait),
            _ => Err(UnknownPragma(s.to_string())),
        }
    }
}

/// Source location of a pragma: file id and inclusive line range.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct SourceSpan {
    pub file_id: u32,
    pub start_line: u32,
    pub end_line: u32,
}

impl SourceSpan {
    pub fn new(file_id: u32, start_line: u32, end_line: u32) -> Self {
        assert!(start_line <= end_line, "Span must not end before it starts");
        Self {
            file_id,
            start_line,
            end_line,
        }
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.file_id, self.start_line, self.end_line)
    }
}

/// What a task-graph node stands for.
///
/// Exactly one kind per node. `Root` is the synthetic top of the graph and
/// carries no pragma; `Unrecognized` keeps directives this crate does not
/// know about, so they can be reported instead of dropped.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Region {
    Root,
    For(SourceSpan),
    Parallel(SourceSpan),
    Barrier(SourceSpan),
    Single(SourceSpan),
    Task(SourceSpan),
    TaskWait(SourceSpan),
    Unrecognized { directive: String, span: SourceSpan },
}

impl Region {
    pub fn new(kind: PragmaKind, span: SourceSpan) -> Self {
        match kind {
            PragmaKind::For => Region::For(span),
            PragmaKind::Parallel => Region::Parallel(span),
            PragmaKind::Barrier => Region::Barrier(span),
            PragmaKind::Single => Region::Single(span),
            PragmaKind::Task => Region::Task(span),
            PragmaKind::TaskWait => Region::TaskWait(span),
        }
    }

    /// Region for a directive given by name; unknown names are kept as
    /// [`Region::Unrecognized`].
    pub fn parse(directive: &str, span: SourceSpan) -> Self {
        match directive.parse::<PragmaKind>() {
            Ok(kind) => Region::new(kind, span),
            Err(UnknownPragma(directive)) => Region::Unrecognized { directive, span },
        }
    }

    pub fn kind(&self) -> Option<PragmaKind> {
        match self {
            Region::Root | Region::Unrecognized { .. } => None,
            Region::For(_) => Some(PragmaKind::For),
            Region::Parallel(_) => Some(PragmaKind::Parallel),
            Region::Barrier(_) => Some(PragmaKind::Barrier),
            Region::Single(_) => Some(PragmaKind::Single),
            Region::Task(_) => Some(PragmaKind::Task),
            Region::TaskWait(_) => Some(PragmaKind::TaskWait),
        }
    }

    pub fn span(&self) -> Option<SourceSpan> {
        match self {
            Region::Root => None,
            Region::For(span)
            | Region::Parallel(span)
            | Region::Barrier(span)
            | Region::Single(span)
            | Region::Task(span)
            | Region::TaskWait(span)
            | Region::Unrecognized { span, .. } => Some(*span),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Region::Root)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Region::Root => return write!(f, "Root"),
            Region::For(_) => "For",
            Region::Parallel(_) => "Parallel",
            Region::Barrier(_) => "Barrier",
            Region::Single(_) => "Single",
            Region::Task(_) => "Task",
            Region::TaskWait(_) => "TaskWait",
            Region::Unrecognized { directive, span } => return write!(f, "'{}' {}", directive, span),
        };
        match self.span() {
            Some(span) => write!(f, "{} {}", name, span),
            None => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kinds() {
        assert_eq!("for".parse::<PragmaKind>(), Ok(PragmaKind::For));
        assert_eq!(" Parallel ".parse::<PragmaKind>(), Ok(PragmaKind::Parallel));
        assert_eq!("taskwait".parse::<PragmaKind>(), Ok(PragmaKind::TaskWait));
        assert_eq!("task-wait".parse::<PragmaKind>(), Ok(PragmaKind::TaskWait));
        assert_eq!(
            "critical".parse::<PragmaKind>(),
            Err(UnknownPragma("critical".to_string()))
        );
    }

    #[test]
    fn test_kind_roundtrip_names() {
        for kind in [
            PragmaKind::For,
            PragmaKind::Parallel,
            PragmaKind::Barrier,
            PragmaKind::Single,
            PragmaKind::Task,
            PragmaKind::TaskWait,
        ] {
            assert_eq!(kind.name().parse::<PragmaKind>(), Ok(kind));
            assert_eq!(Region::new(kind, SourceSpan::default()).kind(), Some(kind));
        }
    }

    #[test]
    fn test_region_parse_unknown() {
        let span = SourceSpan::new(1, 10, 12);
        let region = Region::parse("atomic", span);
        assert_eq!(region.kind(), None);
        assert_eq!(region.span(), Some(span));
        assert_eq!(region.to_string(), "'atomic' 1:10-12");
    }

    #[test]
    fn test_region_label() {
        let region = Region::parse("for", SourceSpan::new(1, 3, 5));
        assert_eq!(region.to_string(), "For 1:3-5");
        assert_eq!(Region::Root.to_string(), "Root");
        assert!(Region::Root.is_root());
        assert_eq!(Region::Root.span(), None);
    }

    #[test]
    #[should_panic(expected = "Span must not end before it starts")]
    fn test_span_order() {
        SourceSpan::new(0, 5, 4);
    }
}
