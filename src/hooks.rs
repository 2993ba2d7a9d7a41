//! # Target-Creation Hooks
//!
//! Some concepts need side effects when a new atom is created through `POST`. Instead of
//! special-casing them inside the collection verbs, a [`CreationHook`] is registered per
//! concept in a [`HookRegistry`] and run right after the new atom was created, linked and
//! populated from the request body.
//!
//! The one hook shipped here is [`FileUploadHook`]: it moves the uploaded file into the
//! upload directory and records where it went.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;

use crate::{Atom, RequestContext, ResourceError};

/// A side effect run after an atom of a concept was created through `POST`.
pub trait CreationHook: Send + Sync {
    /// Called with the freshly created atom.
    fn after_create(&self, ctx: &RequestContext, atom: &Atom) -> Result<(), ResourceError>;
}

/// Creation hooks by concept name.
#[derive(Default, Clone)]
pub struct HookRegistry {
    hooks: HashMap<String, Vec<Arc<dyn CreationHook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `hook` for atoms of `concept`.
    pub fn register(&mut self, concept: impl Into<String>, hook: Arc<dyn CreationHook>) {
        self.hooks.entry(concept.into()).or_default().push(hook);
    }

    /// Hooks registered for `concept`, in registration order.
    pub fn for_concept(&self, concept: &str) -> &[Arc<dyn CreationHook>] {
        self.hooks.get(concept).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Runs every hook registered for the atom's concept.
    pub fn run(&self, ctx: &RequestContext, atom: &Atom) -> Result<(), ResourceError> {
        for hook in self.for_concept(&atom.concept) {
            hook.after_create(ctx, atom)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut concepts: Vec<&String> = self.hooks.keys().collect();
        concepts.sort();
        f.debug_struct("HookRegistry")
            .field("concepts", &concepts)
            .finish()
    }
}

/////////////////////////////////////////////// FileUploadHook /////////////////////////////////////////

/// Stores the request's uploaded file for a new file object.
///
/// The stored name is the upload time in seconds, an underscore and the original file name.
/// The file moves to `absolute_dir`; the file object gets `filePath` set to the stored name
/// under `relative_dir` and `originalFileName` set to the name the client sent.
#[derive(Debug, Clone)]
pub struct FileUploadHook {
    absolute_dir: PathBuf,
    relative_dir: String,
}

impl FileUploadHook {
    pub fn new(absolute_dir: impl Into<PathBuf>, relative_dir: impl Into<String>) -> Self {
        Self {
            absolute_dir: absolute_dir.into(),
            relative_dir: relative_dir.into(),
        }
    }

    fn stored_name(original: &str) -> String {
        let base = Path::new(original)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload");
        format!("{}_{}", Utc::now().timestamp(), base)
    }

    fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
        if std::fs::rename(from, to).is_ok() {
            return Ok(());
        }
        std::fs::copy(from, to)?;
        std::fs::remove_file(from)
    }
}

impl CreationHook for FileUploadHook {
    fn after_create(&self, ctx: &RequestContext, atom: &Atom) -> Result<(), ResourceError> {
        let upload = ctx
            .upload()
            .filter(|u| u.tmp_path.is_file())
            .ok_or_else(|| ResourceError::internal("No file uploaded"))?;

        let stored = Self::stored_name(&upload.original_name);
        std::fs::create_dir_all(&self.absolute_dir)
            .map_err(|e| ResourceError::internal(format!("Error in file upload: {}", e)))?;
        let target = self.absolute_dir.join(&stored);
        Self::move_file(&upload.tmp_path, &target)
            .map_err(|e| ResourceError::internal(format!("Error in file upload: {}", e)))?;
        ctx.record_stored_file(target.clone());

        let relative = if self.relative_dir.is_empty() {
            stored.clone()
        } else {
            format!("{}/{}", self.relative_dir.trim_end_matches('/'), stored)
        };
        let model = ctx.model();
        let file_path = model
            .relation_between("filePath", &atom.concept, "FilePath")
            .ok_or_else(|| {
                ResourceError::internal(format!(
                    "Relation filePath[{}*FilePath] is not defined",
                    atom.concept
                ))
            })?;
        let file_name = model
            .relation_between("originalFileName", &atom.concept, "FileName")
            .ok_or_else(|| {
                ResourceError::internal(format!(
                    "Relation originalFileName[{}*FileName] is not defined",
                    atom.concept
                ))
            })?;
        ctx.store().add_link(file_path, &atom.id, &relative)?;
        ctx.store()
            .add_link(file_name, &atom.id, &upload.original_name)?;
        tracing::info!(atom = %atom, path = %target.display(), "stored uploaded file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_helpers::{sample_context, sample_context_with};
    use crate::{AtomStore, ErrorKind, UploadedFile};

    #[test]
    fn registry_runs_hooks_for_concept_only() {
        struct Count(std::sync::Mutex<u32>);
        impl CreationHook for Count {
            fn after_create(&self, _: &RequestContext, _: &Atom) -> Result<(), ResourceError> {
                *self.0.lock().unwrap() += 1;
                Ok(())
            }
        }
        let count = Arc::new(Count(std::sync::Mutex::new(0)));
        let mut registry = HookRegistry::new();
        registry.register("Project", count.clone());
        let ctx = sample_context(&[]);
        registry.run(&ctx, &Atom::new("x", "Project")).unwrap();
        registry.run(&ctx, &Atom::new("p", "Person")).unwrap();
        assert_eq!(*count.0.lock().unwrap(), 1);
        assert_eq!(registry.for_concept("Person").len(), 0);
    }

    #[test]
    fn missing_upload_is_internal_error() {
        let dir = tempfile::tempdir().unwrap();
        let hook = FileUploadHook::new(dir.path(), "uploads");
        let ctx = sample_context(&[]);
        let err = hook
            .after_create(&ctx, &Atom::new("f1", "FileObject"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.message(), "No file uploaded");
    }

    #[test]
    fn upload_is_moved_and_linked() {
        let spool = tempfile::tempdir().unwrap();
        let uploads = tempfile::tempdir().unwrap();
        let tmp = spool.path().join("php123");
        std::fs::write(&tmp, b"hello").unwrap();

        let hook = FileUploadHook::new(uploads.path(), "uploads");
        let ctx = sample_context_with(&[], |ctx| {
            ctx.with_upload(UploadedFile {
                tmp_path: tmp.clone(),
                original_name: "report.pdf".to_string(),
            })
        });
        hook.after_create(&ctx, &Atom::new("f1", "FileObject"))
            .unwrap();

        assert!(!tmp.exists());
        let model = ctx.model();
        let path_rel = model.relation("filePath[FileObject*FilePath]").unwrap();
        let name_rel = model
            .relation("originalFileName[FileObject*FileName]")
            .unwrap();
        let stored = ctx.store().targets(path_rel, "f1", false).unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].starts_with("uploads/"));
        assert!(stored[0].ends_with("_report.pdf"));
        let file = uploads.path().join(stored[0].trim_start_matches("uploads/"));
        assert_eq!(std::fs::read(&file).unwrap(), b"hello");
        assert_eq!(
            ctx.store().targets(name_rel, "f1", false).unwrap(),
            vec!["report.pdf"]
        );

        ctx.discard_stored_files();
        assert!(!file.exists());
    }
}
