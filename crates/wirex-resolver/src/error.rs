use std::fmt;

use thiserror::Error;
use wirex_filter::{FilterError, VersionError};

use crate::model::{RequirementId, ResourceId};

/// Why a resolve call failed.
#[derive(Error, Debug, Clone)]
pub enum ResolutionError {
    #[error("Unable to resolve {resource}: missing requirement {requirement}{}", caused_by(.cause))]
    UnresolvedRequirement {
        resource: String,
        requirement: String,
        requirement_id: RequirementId,
        cause: Option<Box<ResolutionError>>,
    },

    #[error("{0}")]
    UsesConflict(Box<UsesConflict>),

    #[error("Fragment {fragment} was not selected for attachment")]
    FragmentNotSelected { fragment: String },

    #[error("Resource {resource} was rejected: {reason}")]
    Rejected { resource: String, reason: String },

    #[error("Dynamic requirement {requirement} of {resource} has no usable provider{}", caused_by(.cause))]
    DynamicImportFailed {
        resource: String,
        requirement: String,
        requirement_id: RequirementId,
        cause: Option<Box<ResolutionError>>,
    },

    #[error("Resource {resource} must be resolved before resolving its dynamic requirements")]
    NotResolved { resource: String },

    #[error("Resolution search exhausted after {attempts} attempts{}", caused_by(.last))]
    SearchExhausted {
        attempts: usize,
        last: Option<Box<ResolutionError>>,
    },
}

impl ResolutionError {
    /// The requirement blamed for this failure, if any.
    ///
    /// The driver drops optional resources owning this requirement and retries.
    pub fn faulty_requirement(&self) -> Option<RequirementId> {
        match self {
            ResolutionError::UnresolvedRequirement { requirement_id, .. } => Some(*requirement_id),
            ResolutionError::UsesConflict(conflict) => conflict.requirement,
            _ => None,
        }
    }
}

fn caused_by(cause: &Option<Box<ResolutionError>>) -> String {
    match cause {
        Some(cause) => format!(" [caused by: {}]", cause),
        None => String::new(),
    }
}

/// The shape of a uses-constraint violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Two different providers imported for the same package
    AmbiguousImport,
    /// An exported package clashes with one reachable through uses
    ExportConflict,
    /// An imported package clashes with one reachable through uses
    ImportConflict,
}

/// A uses-constraint violation with the dependency chains that caused it.
#[derive(Debug, Clone)]
pub struct UsesConflict {
    pub resource: ResourceId,
    pub package: String,
    pub kind: ConflictKind,
    /// The requirement blamed for the conflict
    pub requirement: Option<RequirementId>,
    /// Human-readable dependency chains, one per side of the conflict
    pub chains: Vec<String>,
    pub message: String,
}

impl fmt::Display for UsesConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for (idx, chain) in self.chains.iter().enumerate() {
            write!(f, "\n\nChain {}:\n{}", idx + 1, chain)?;
        }
        Ok(())
    }
}

/// Errors raised while building a repository from a description.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid filter in requirement of {resource}: {source}")]
    InvalidFilter { resource: String, source: FilterError },

    #[error("Invalid version for {resource}: {source}")]
    InvalidVersion { resource: String, source: VersionError },

    #[error("Unsupported value for attribute \"{attribute}\" of {resource}")]
    UnsupportedAttribute { resource: String, attribute: String },

    #[error("Unknown resource \"{0}\"")]
    UnknownResource(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_requirement_message_includes_cause() {
        let cause = ResolutionError::UnresolvedRequirement {
            resource: "b 1.0.0".to_string(),
            requirement: "wiring.package; (wiring.package=bar)".to_string(),
            requirement_id: RequirementId(1),
            cause: None,
        };
        let err = ResolutionError::UnresolvedRequirement {
            resource: "a 1.0.0".to_string(),
            requirement: "wiring.package; (wiring.package=foo)".to_string(),
            requirement_id: RequirementId(0),
            cause: Some(Box::new(cause)),
        };

        assert_eq!(
            err.to_string(),
            "Unable to resolve a 1.0.0: missing requirement wiring.package; (wiring.package=foo) \
             [caused by: Unable to resolve b 1.0.0: missing requirement wiring.package; (wiring.package=bar)]"
        );
        assert_eq!(err.faulty_requirement(), Some(RequirementId(0)));
    }

    #[test]
    fn test_uses_conflict_display_lists_chains() {
        let conflict = UsesConflict {
            resource: ResourceId(0),
            package: "foo".to_string(),
            kind: ConflictKind::ImportConflict,
            requirement: Some(RequirementId(2)),
            chains: vec!["  a\n    import: x".to_string(), "  a\n    import: y".to_string()],
            message: "Uses constraint violation.".to_string(),
        };
        let err = ResolutionError::UsesConflict(Box::new(conflict));

        let text = err.to_string();
        assert!(text.starts_with("Uses constraint violation."));
        assert!(text.contains("Chain 1:\n  a\n    import: x"));
        assert!(text.contains("Chain 2:\n  a\n    import: y"));
        assert_eq!(err.faulty_requirement(), Some(RequirementId(2)));
    }

    #[test]
    fn test_search_exhausted_has_no_faulty_requirement() {
        let err = ResolutionError::SearchExhausted { attempts: 3, last: None };
        assert_eq!(err.to_string(), "Resolution search exhausted after 3 attempts");
        assert!(err.faulty_requirement().is_none());
    }
}
