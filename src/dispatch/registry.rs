//! Servant registry - identity + facet to dispatch table.
//!
//! The registry is the in-process stand-in for an object adapter's active
//! servant map: the dispatch engine resolves request targets against it.
//! Registration under the empty identity or over an existing entry is
//! rejected rather than silently replaced.

use std::collections::HashMap;

use crate::error::{ObjwireError, Result};
use crate::identity::Identity;

use super::table::DispatchTable;

/// Maps identities (and their facets) to servant dispatch tables.
///
/// Not internally synchronized: the registry is confined to the thread
/// that dispatches on it.
#[derive(Default)]
pub struct ServantRegistry {
    servants: HashMap<Identity, HashMap<String, DispatchTable>>,
}

impl ServantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a servant under an identity's default facet.
    pub fn add(&mut self, identity: Identity, table: DispatchTable) -> Result<()> {
        self.add_facet(identity, None, table)
    }

    /// Register a servant under an identity and facet.
    ///
    /// # Errors
    ///
    /// [`Protocol`](ObjwireError::Protocol) if the identity is empty or the
    /// (identity, facet) pair is already taken.
    pub fn add_facet(
        &mut self,
        identity: Identity,
        facet: Option<&str>,
        table: DispatchTable,
    ) -> Result<()> {
        if identity.is_empty() {
            return Err(ObjwireError::Protocol(
                "cannot register a servant under the empty identity".to_string(),
            ));
        }
        let facet_key = facet.unwrap_or_default().to_string();
        let facets = self.servants.entry(identity.clone()).or_default();
        if facets.contains_key(&facet_key) {
            return Err(ObjwireError::Protocol(format!(
                "servant already registered: identity `{identity}`, facet `{facet_key}`"
            )));
        }
        facets.insert(facet_key, table);
        Ok(())
    }

    /// Remove a servant, returning its table if it was present.
    pub fn remove(&mut self, identity: &Identity, facet: Option<&str>) -> Option<DispatchTable> {
        let facets = self.servants.get_mut(identity)?;
        let removed = facets.remove(facet.unwrap_or_default());
        if facets.is_empty() {
            self.servants.remove(identity);
        }
        removed
    }

    /// Whether any servant is registered under this identity.
    pub fn contains_identity(&self, identity: &Identity) -> bool {
        self.servants.contains_key(identity)
    }

    /// Resolve a servant by identity and facet.
    pub fn find(&self, identity: &Identity, facet: Option<&str>) -> Option<&DispatchTable> {
        self.servants
            .get(identity)?
            .get(facet.unwrap_or_default())
    }

    /// Number of registered servants across all identities and facets.
    pub fn len(&self) -> usize {
        self.servants.values().map(HashMap::len).sum()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.servants.is_empty()
    }
}
