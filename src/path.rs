//! Tenant-scoped addressing into the remote store.

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A location in the remote store: alternating collection/document segments.
///
/// An odd number of segments addresses a collection, an even number a
/// document. Construction never fails; malformed paths are rejected by the
/// store when they are used.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_collection(&self) -> bool {
        self.segments.len() % 2 == 1
    }

    pub fn is_document(&self) -> bool {
        !self.segments.is_empty() && self.segments.len() % 2 == 0
    }

    /// Append one segment.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// Drop the last segment.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    /// Last segment, i.e. the document id for document paths.
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn starts_with(&self, prefix: &StorePath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Check every segment is non-empty and free of separators.
    pub fn validate(&self) -> Result<()> {
        if self.segments.is_empty() {
            return Err(SyncError::InvalidPath("empty path".to_string()));
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if segment.is_empty() {
                return Err(SyncError::InvalidPath(format!(
                    "{}: segment {} is empty",
                    self, i
                )));
            }
            if segment.contains('/') {
                return Err(SyncError::InvalidPath(format!(
                    "{}: segment {} contains '/'",
                    self, i
                )));
            }
        }
        Ok(())
    }

    /// Validate and require a collection path.
    pub fn validate_collection(&self) -> Result<()> {
        self.validate()?;
        if !self.is_collection() {
            return Err(SyncError::InvalidPath(format!(
                "{} is not a collection path",
                self
            )));
        }
        Ok(())
    }

    /// Validate and require a document path.
    pub fn validate_document(&self) -> Result<()> {
        self.validate()?;
        if !self.is_document() {
            return Err(SyncError::InvalidPath(format!(
                "{} is not a document path",
                self
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorePath({})", self)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Builds tenant-scoped paths: `<root>/<tenant>/<resource>[/<document>]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathResolver {
    root: String,
    tenant_id: String,
}

impl PathResolver {
    pub fn new(root: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            tenant_id: tenant_id.into(),
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// The tenant's own document; every resource lives beneath it.
    pub fn tenant(&self) -> StorePath {
        StorePath::new([self.root.as_str(), self.tenant_id.as_str()])
    }

    /// Collection path for a resource.
    pub fn collection(&self, resource: &str) -> StorePath {
        self.tenant().child(resource)
    }

    /// Document path for one document of a resource.
    pub fn document(&self, resource: &str, document_id: &str) -> StorePath {
        self.collection(resource).child(document_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_collection_and_document_paths() {
        let resolver = PathResolver::new("teams", "t1");
        let col = resolver.collection("tasks");
        assert_eq!(col.to_string(), "teams/t1/tasks");
        assert!(col.is_collection());

        let doc = resolver.document("settings", "default");
        assert_eq!(doc.to_string(), "teams/t1/settings/default");
        assert!(doc.is_document());
        assert_eq!(doc.last(), Some("default"));
        assert_eq!(doc.parent(), Some(resolver.collection("settings")));
    }

    #[test]
    fn test_validate_rejects_bad_segments() {
        let resolver = PathResolver::new("teams", "");
        assert!(matches!(
            resolver.collection("tasks").validate_collection(),
            Err(SyncError::InvalidPath(_))
        ));

        let resolver = PathResolver::new("teams", "t1");
        assert!(resolver.collection("a/b").validate().is_err());
        assert!(resolver.collection("tasks").validate_document().is_err());
        assert!(resolver.document("tasks", "x").validate_collection().is_err());
        assert!(StorePath::new(Vec::<String>::new()).validate().is_err());
    }

    #[test]
    fn test_starts_with() {
        let resolver = PathResolver::new("teams", "t1");
        let doc = resolver.document("tasks", "a");
        assert!(doc.starts_with(&resolver.tenant()));
        assert!(!doc.starts_with(&PathResolver::new("teams", "t2").tenant()));
    }

    proptest! {
        #[test]
        fn prop_document_paths_are_even_and_scoped(
            tenant in "[a-z0-9]{1,12}",
            resource in "[a-zA-Z]{1,12}",
            doc in "[a-zA-Z0-9]{1,20}",
        ) {
            let resolver = PathResolver::new("teams", tenant.clone());
            let path = resolver.document(&resource, &doc);
            prop_assert_eq!(path.len() % 2, 0);
            prop_assert!(path.validate_document().is_ok());
            prop_assert_eq!(&path.segments()[1], &tenant);
            prop_assert_eq!(path.clone(), resolver.document(&resource, &doc));
        }
    }
}
