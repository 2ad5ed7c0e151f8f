//! Policy file loading.
//!
//! Every entry point runs the same pipeline: decode the YAML into a
//! [`PolicyDocument`], check it structurally and resolve blueprints.

use std::fs;
use std::path::Path;

use tagpatrol_core::{PolicyDocument, ResourceDefinition};
use tracing::{debug, info};

use crate::error::{PolicyError, Result};
use crate::resolver::resolve;

/// Loader for YAML tag policies.
///
/// # Examples
///
/// ```rust,no_run
/// use tagpatrol_policy::PolicyParser;
///
/// let definitions = PolicyParser::new().parse_file("policy.yaml")?;
/// for definition in &definitions {
///     println!("{definition}: {} rules", definition.policy.rules.len());
/// }
/// # Ok::<(), tagpatrol_policy::PolicyError>(())
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct PolicyParser;

impl PolicyParser {
    /// Creates a new parser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Loads and resolves a policy file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// fails structural validation.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Vec<ResourceDefinition>> {
        let path = path.as_ref();
        debug!(?path, "Parsing policy file");

        let bytes = fs::read(path).map_err(|e| PolicyError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let definitions = self.parse_bytes(&bytes)?;
        info!(
            ?path,
            definitions = definitions.len(),
            "Loaded policy"
        );
        Ok(definitions)
    }

    /// Decodes and resolves a policy held in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not valid YAML or the document
    /// fails structural validation.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Vec<ResourceDefinition>> {
        let doc: PolicyDocument =
            serde_yaml::from_slice(bytes).map_err(|source| PolicyError::Decode { source })?;
        self.parse_document(&doc)
    }

    /// Decodes and resolves a policy from a string.
    ///
    /// # Errors
    ///
    /// Same as [`PolicyParser::parse_bytes`].
    pub fn parse_str(&self, source: &str) -> Result<Vec<ResourceDefinition>> {
        self.parse_bytes(source.as_bytes())
    }

    /// Validates and resolves an already decoded document.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Invalid`] listing every structural violation.
    pub fn parse_document(&self, doc: &PolicyDocument) -> Result<Vec<ResourceDefinition>> {
        debug!(
            blueprints = doc.blueprints.len(),
            "Resolving policy document"
        );
        resolve(doc)
    }
}
