//! Componentes de origen → components destino.

use log::debug;

use mig_core::MigrationContext;
use mig_domain::{ArtifactPayload, ComponentPayload, ComponentRecord, StagedArtifact};

pub fn components_from_source(ctx: &MigrationContext,
                              components: &[ComponentRecord])
                              -> Vec<StagedArtifact> {
    components.iter()
              .filter(|component| {
                  if ctx.component_id_by_name(&component.name).is_some() {
                      debug!("component '{}' already in target, skipping", component.name);
                      return false;
                  }
                  true
              })
              .map(|component| {
                  let payload = ComponentPayload { name:       component.name.clone(),
                                                   is_active:  !component.archived,
                                                   is_deleted: component.deleted };
                  StagedArtifact::new(ArtifactPayload::Component(payload))
              })
              .collect()
}
