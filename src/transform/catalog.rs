//! Registration of transform implementations across all kinds.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::action::{ActionInputs, ActionInstantiator, DefaultTransformer};
use super::builtin;
use super::error::{InstantiationError, TransformError};
use super::fingerprint::Normalization;
use super::identity::{ImmutableAttributes, ImplementationId};
use super::legacy::{LegacyInstantiator, LegacyTransformer};
use super::params::ParameterSnapshot;
use super::transformer::Transformer;

/// Kind of a registered implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    Legacy,
    Action(ActionInputs),
}

/// Every known implementation, keyed by id.
pub struct TransformCatalog {
    legacy: Arc<LegacyInstantiator>,
    actions: Arc<ActionInstantiator>,
    action_inputs: BTreeMap<ImplementationId, ActionInputs>,
}

impl TransformCatalog {
    pub fn new(
        legacy: LegacyInstantiator,
        actions: ActionInstantiator,
        action_inputs: BTreeMap<ImplementationId, ActionInputs>,
    ) -> Self {
        Self {
            legacy: Arc::new(legacy),
            actions: Arc::new(actions),
            action_inputs,
        }
    }

    /// Catalog of the built-in implementations.
    pub fn builtin() -> Self {
        let mut legacy = LegacyInstantiator::new();
        builtin::register_legacy(&mut legacy);

        let mut actions = ActionInstantiator::new();
        builtin::register_actions(&mut actions);

        let mut action_inputs = BTreeMap::new();
        action_inputs.insert(
            ImplementationId::new(builtin::MANIFEST),
            ActionInputs {
                primary_normalization: Normalization::NameOnly,
                requires_dependencies: true,
                dependencies_normalization: Normalization::NameOnly,
            },
        );

        Self::new(legacy, actions, action_inputs)
    }

    pub fn kind(&self, id: &ImplementationId) -> Option<TransformKind> {
        if self.legacy.contains(id) {
            Some(TransformKind::Legacy)
        } else if self.actions.contains(id) {
            Some(TransformKind::Action(
                self.action_inputs.get(id).copied().unwrap_or_default(),
            ))
        } else {
            None
        }
    }

    /// All registered ids with their kinds, sorted by id.
    pub fn entries(&self) -> Vec<(ImplementationId, TransformKind)> {
        let mut entries: Vec<_> = self
            .legacy
            .ids()
            .chain(self.actions.ids())
            .filter_map(|id| self.kind(id).map(|kind| (id.clone(), kind)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.dedup_by(|a, b| a.0 == b.0);
        entries
    }

    /// Configure a transform step for `id`.
    pub fn transformer(
        &self,
        id: ImplementationId,
        parameters: ParameterSnapshot,
        from_attributes: ImmutableAttributes,
    ) -> Result<Arc<dyn Transformer>, TransformError> {
        match self.kind(&id) {
            Some(TransformKind::Legacy) => Ok(Arc::new(LegacyTransformer::configure(
                id,
                parameters,
                self.legacy.clone(),
                from_attributes,
            )?)),
            Some(TransformKind::Action(inputs)) => Ok(Arc::new(DefaultTransformer::configure(
                id,
                parameters,
                inputs,
                self.actions.clone(),
                from_attributes,
            )?)),
            None => Err(InstantiationError::Unresolved(id).into()),
        }
    }
}
