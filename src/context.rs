//! Per-request context.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use crate::{AtomStore, HookRegistry, Model, Resource, ResourceError};

/// A file received with a request, waiting to be moved into place by a creation hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Where the upload was spooled.
    pub tmp_path: PathBuf,
    /// The file name the client sent.
    pub original_name: String,
}

/// Everything a request needs: the model snapshot, the store, the creation hooks, the
/// caller's active roles and an optional uploaded file.
///
/// Resources borrow from the context, so the context outlives every resource and list
/// created while handling the request.
pub struct RequestContext {
    model: Arc<Model>,
    store: Arc<dyn AtomStore>,
    hooks: Arc<HookRegistry>,
    roles: Vec<String>,
    upload: Option<UploadedFile>,
    stored_files: RefCell<Vec<PathBuf>>,
}

impl RequestContext {
    pub fn new(model: Arc<Model>, store: Arc<dyn AtomStore>, hooks: Arc<HookRegistry>) -> Self {
        Self {
            model,
            store,
            hooks,
            roles: Vec::new(),
            upload: None,
            stored_files: RefCell::new(Vec::new()),
        }
    }

    /// Sets the caller's active roles.
    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    /// Attaches an uploaded file.
    pub fn with_upload(mut self, upload: UploadedFile) -> Self {
        self.upload = Some(upload);
        self
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn store(&self) -> &dyn AtomStore {
        self.store.as_ref()
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn upload(&self) -> Option<&UploadedFile> {
        self.upload.as_ref()
    }

    /// Remembers a file written on behalf of this request.
    pub fn record_stored_file(&self, path: PathBuf) {
        self.stored_files.borrow_mut().push(path);
    }

    /// Removes every file written on behalf of this request, as after a rollback.
    pub fn discard_stored_files(&self) {
        for path in self.stored_files.borrow_mut().drain(..) {
            if let Err(err) = std::fs::remove_file(&path) {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "could not remove stored file"
                );
            }
        }
    }

    /// The entry resource `id[concept]`.
    ///
    /// Fails with Not Found for unknown concepts and Bad Request for scalar concepts. The
    /// atom itself need not exist yet; walking a path materializes it when permitted.
    pub fn resource(&self, concept: &str, id: &str) -> Result<Rc<Resource<'_>>, ResourceError> {
        let concept = self.model.concept_or_not_found(concept)?;
        Resource::entry(self, concept, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::test_utils::test_helpers::sample_context;

    #[test]
    fn entry_resource_paths() {
        let ctx = sample_context(&[]);
        let person = ctx.resource("Person", "p1").unwrap();
        assert_eq!(person.path(), "resource/Person/p1");
        let session = ctx.resource("SESSION", "s1").unwrap();
        assert_eq!(session.path(), "session");
    }

    #[test]
    fn discarding_removes_recorded_files() {
        let dir = tempfile::tempdir().unwrap();
        let stored = dir.path().join("1700000000_report.txt");
        std::fs::write(&stored, b"numbers").unwrap();
        let ctx = sample_context(&[]);
        ctx.record_stored_file(stored.clone());
        ctx.discard_stored_files();
        assert!(!stored.exists());
        // A second discard has nothing left to remove.
        ctx.discard_stored_files();
    }

    #[test]
    fn unknown_or_scalar_concepts_are_rejected() {
        let ctx = sample_context(&[]);
        let err = ctx.resource("Ghost", "g1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = ctx.resource("Name", "Ann").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }
}
