//! Infraestructura común de las pasadas de transformación.
//!
//! Una pasada procesa un único tipo de issue de origen contra un
//! transformador de una clase destino. El driver `run_pass` filtra la
//! elegibilidad y delega; los módulos por clase arman el payload.

use log::warn;
use serde_json::Value;

use mig_core::{CorrelationIndex, CustomPropertyEncoder, MappingConfig, MarkupRenderer,
               MigrationContext, TypeMappingResolver};
use mig_domain::{ArtifactKind, SourceRecord, StagedArtifact};

pub mod capability;
pub mod component;
pub mod customlist;
pub mod elements;
pub mod incident;
pub mod milestone;
pub mod release;
pub mod requirement;
pub mod task;

pub use capability::CapabilityTransformer;
pub use incident::IncidentTransformer;
pub use requirement::RequirementTransformer;
pub use task::TaskTransformer;

/// Campos configurables de origen con significado fijo para la jerarquía.
const PARENT_LINK_FIELD: &str = "Parent Link";
const EPIC_LINK_FIELD: &str = "Epic Link";

/// Todo lo que una pasada necesita, por referencia. Los índices vienen del
/// snapshot al inicio de la pasada.
pub struct TransformContext<'a> {
    pub ctx: &'a MigrationContext,
    pub config: &'a MappingConfig,
    pub renderer: Option<&'a dyn MarkupRenderer>,
    /// Requirements ya presentes en destino, para resolver padres de tasks.
    pub requirement_index: &'a CorrelationIndex,
    /// Capabilities ya presentes a nivel de programa: lo capturado ahí no se
    /// vuelve a migrar como artefacto de producto.
    pub capability_index: &'a CorrelationIndex,
}

/// Transformador de una clase de artefacto para un tipo de issue concreto.
pub trait RecordTransformer {
    fn kind(&self) -> ArtifactKind;

    /// Decide si el registro pertenece a esta pasada.
    fn eligible(&self, record: &SourceRecord) -> bool;

    /// Arma el artefacto staged. No falla: degrada campo a campo.
    fn transform(&mut self, record: &SourceRecord) -> StagedArtifact;
}

/// Corre una pasada completa sobre el export, en orden de origen.
pub fn run_pass<T: RecordTransformer>(transformer: &mut T,
                                      records: &[SourceRecord])
                                      -> Vec<StagedArtifact> {
    records.iter()
           .filter_map(|r| {
               if transformer.eligible(r) {
                   Some(transformer.transform(r))
               } else {
                   None
               }
           })
           .collect()
}

/// Elegibilidad estándar de las pasadas de producto: no capturado como
/// capability, con tipo destino mapeado y del tipo de la pasada actual.
pub(crate) fn product_eligible(tc: &TransformContext<'_>,
                               kind_key: &str,
                               current_type: &str,
                               record: &SourceRecord)
                               -> bool {
    if let Some(key) = record.key() {
        if tc.capability_index.contains(key) {
            return false;
        }
    }
    let Some(issue_type) = record.issue_type() else {
        return false;
    };
    if issue_type != current_type {
        return false;
    }
    tc.config
      .types_for(kind_key)
      .map(|table| TypeMappingResolver::mapped_target_type_name(table, issue_type).is_some())
      .unwrap_or(false)
}

pub(crate) fn resolve_status(tc: &TransformContext<'_>,
                             kind_key: &str,
                             kind: ArtifactKind,
                             record: &SourceRecord)
                             -> i64 {
    match (tc.config.statuses_for(kind_key), record.status_name()) {
        (Some(table), Some(name)) => {
            TypeMappingResolver::resolve_status(table, tc.ctx.statuses_for(kind), name)
        }
        _ => 0,
    }
}

pub(crate) fn resolve_type(tc: &TransformContext<'_>,
                           kind_key: &str,
                           kind: ArtifactKind,
                           record: &SourceRecord)
                           -> i64 {
    match tc.config.types_for(kind_key) {
        Some(table) => {
            TypeMappingResolver::resolve_type(table, tc.ctx.types_for(kind), record.issue_type())
        }
        None => 0,
    }
}

pub(crate) fn resolve_priority(tc: &TransformContext<'_>,
                               kind_key: &str,
                               kind: ArtifactKind,
                               record: &SourceRecord)
                               -> i64 {
    match tc.config.priorities_for(kind_key) {
        Some(table) => TypeMappingResolver::resolve_priority(table,
                                                             tc.ctx.priorities_for(kind),
                                                             record.priority_name()),
        None => {
            warn!("no priority mapping configured for {kind_key}, must be set manually");
            0
        }
    }
}

/// Id de usuario destino para un campo de persona del origen.
pub(crate) fn person_id(tc: &TransformContext<'_>,
                        record: &SourceRecord,
                        person_field: &str)
                        -> Option<i64> {
    tc.ctx
      .user_by_email(record.person_email(person_field)?)
      .map(|u| u.user_id)
}

/// Puntos de estimación destino desde la estimación agregada en segundos
/// (jornadas de 8 horas, dos decimales).
pub(crate) fn estimate_points(seconds: Option<i64>) -> Option<f64> {
    seconds.map(|s| ((s as f64 / 3600.0 / 8.0) * 100.0).round() / 100.0)
}

pub(crate) fn version_name(version: &Value) -> Option<&str> {
    version.get("name").and_then(Value::as_str)
}

fn warn_unhandled_versions(key: Option<&str>, label: &str, extra: &[&Value]) {
    if !extra.is_empty() {
        let names: Vec<&str> = extra.iter().filter_map(|v| version_name(v)).collect();
        warn!("{}: only one {label} is supported, not handled: {names:?}",
              key.unwrap_or("(no key)"));
    }
}

/// Release destino desde la primera fix version del registro. Las versiones
/// afectadas y las fix versions extra no se migran acá, solo se avisan.
pub(crate) fn fix_release_id(tc: &TransformContext<'_>, record: &SourceRecord) -> Option<i64> {
    let affected = record.affected_versions();
    warn_unhandled_versions(record.key(), "affected version", &affected);

    let fixes = record.fix_versions();
    if fixes.len() > 1 {
        warn_unhandled_versions(record.key(), "fix version", &fixes[1..]);
    }
    tc.ctx.release_id_by_name(version_name(fixes.first()?)?)
}

/// Releases de un incidente: detectada desde la primera versión afectada; la
/// primera fix version cuenta como verificada si el registro tiene
/// resolución, como planificada si no.
pub(crate) fn incident_release_ids(tc: &TransformContext<'_>,
                                   record: &SourceRecord)
                                   -> (Option<i64>, Option<i64>, Option<i64>) {
    let affected = record.affected_versions();
    if affected.len() > 1 {
        warn_unhandled_versions(record.key(), "affected version", &affected[1..]);
    }
    let fixes = record.fix_versions();
    if fixes.len() > 1 {
        warn_unhandled_versions(record.key(), "fix version", &fixes[1..]);
    }

    let detected = affected.first()
                           .and_then(|v| version_name(v))
                           .and_then(|n| tc.ctx.release_id_by_name(n));
    let fix = fixes.first()
                   .and_then(|v| version_name(v))
                   .and_then(|n| tc.ctx.release_id_by_name(n));

    if record.resolution().is_some() {
        (detected, None, fix)
    } else {
        (detected, fix, None)
    }
}

/// Componente destino del primer componente de origen. El payload admite uno
/// solo; los demás se avisan.
pub(crate) fn first_component_id(tc: &TransformContext<'_>, record: &SourceRecord) -> Option<i64> {
    let components = record.components();
    if components.len() > 1 {
        let names: Vec<&str> = components[1..].iter().filter_map(|c| version_name(c)).collect();
        warn!("{}: only one component is supported, not handled: {names:?}",
              record.key().unwrap_or("(no key)"));
    }
    tc.ctx.component_id_by_name(version_name(components.first()?)?)
}

/// Todos los componentes del registro resueltos a ids destino.
pub(crate) fn component_ids(tc: &TransformContext<'_>, record: &SourceRecord) -> Vec<i64> {
    record.components()
          .iter()
          .filter_map(|c| tc.ctx.component_id_by_name(version_name(c)?))
          .collect()
}

/// Fecha de un campo configurable de origen, normalizada al formato destino.
pub(crate) fn custom_field_date(tc: &TransformContext<'_>,
                                record: &SourceRecord,
                                field_name: &str)
                                -> Option<String> {
    record.custom_field(&tc.ctx.source_fields, field_name)
          .and_then(Value::as_str)
          .map(mig_core::normalize_datetime)
}

/// Pistas de jerarquía del registro, como claves de correlación sin resolver.
pub(crate) fn hierarchy_links(tc: &TransformContext<'_>,
                              record: &SourceRecord)
                              -> (Option<String>, Option<String>) {
    let link = |name: &str| {
        record.custom_field(&tc.ctx.source_fields, name)
              .and_then(Value::as_str)
              .map(str::to_string)
    };
    (link(PARENT_LINK_FIELD), link(EPIC_LINK_FIELD))
}

/// Propiedades configurables del registro más la clave de correlación.
pub(crate) fn custom_properties(tc: &TransformContext<'_>,
                                encoder: &mut CustomPropertyEncoder<'_>,
                                kind_key: &str,
                                record: &SourceRecord)
                                -> Vec<mig_domain::PropertyValue> {
    let mut values = encoder.encode_all(tc.config.custom_props_for(kind_key),
                                        record,
                                        &tc.ctx.source_fields);
    if let Some(key) = record.correlation_key() {
        if let Some(value) = encoder.correlation_value(&tc.config.correlation_property,
                                                       key.as_str())
        {
            values.push(value);
        }
    }
    values
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use mig_core::{NamedId, TargetUser};
    use mig_domain::{CustomPropertyDefinition, FieldDescriptor};
    use serde_json::json;

    /// Contexto y configuración en memoria compartidos por los tests de los
    /// transformadores.
    pub(crate) struct FixtureBundle {
        pub ctx: MigrationContext,
        pub config: MappingConfig,
        pub requirement_index: CorrelationIndex,
        pub capability_index: CorrelationIndex,
    }

    fn text_property(name: &str) -> CustomPropertyDefinition {
        serde_json::from_value(json!({
            "Name": name,
            "PropertyNumber": 1,
            "CustomPropertyId": 42,
            "ArtifactTypeId": 1,
            "CustomPropertyFieldName": "Custom_01",
            "CustomPropertyTypeId": 1
        })).unwrap()
    }

    pub(crate) fn correlation_snapshot(entries: &[(&str, i64)]) -> CorrelationIndex {
        let snapshot: Vec<Value> =
            entries.iter()
                   .map(|(key, id)| {
                       json!({
                           "RequirementId": id,
                           "CapabilityId": id,
                           "ArtifactTypeId": 1,
                           "CustomProperties": [
                               {"Definition": {"Name": "Jira Id"}, "StringValue": key}
                           ]
                       })
                   })
                   .collect();
        CorrelationIndex::build(&snapshot, "Jira Id")
    }

    impl FixtureBundle {
        pub(crate) fn standard() -> Self {
            let mut ctx = MigrationContext::default();
            ctx.project.project_id = 1;
            ctx.project.project_template_id = Some(9);
            ctx.project.project_group_id = Some(3);

            for kind in [ArtifactKind::Requirement,
                         ArtifactKind::Task,
                         ArtifactKind::Incident,
                         ArtifactKind::Capability,
                         ArtifactKind::Milestone,
                         ArtifactKind::Document]
            {
                ctx.statuses.insert(kind,
                                    vec![NamedId::new(1, "Requested"),
                                         NamedId::new(2, "In Progress"),
                                         NamedId::new(3, "Completed")]);
                ctx.priorities.insert(kind,
                                      vec![NamedId::new(1, "1 - Critical"),
                                           NamedId::new(2, "2 - High")]);
                ctx.custom_properties.insert(kind, vec![text_property("Jira Id")]);
            }
            ctx.types.insert(ArtifactKind::Requirement,
                             vec![NamedId::new(4, "Feature"), NamedId::new(5, "Epic")]);
            ctx.types.insert(ArtifactKind::Task, vec![NamedId::new(7, "Development")]);
            ctx.types.insert(ArtifactKind::Incident, vec![NamedId::new(8, "Bug")]);
            ctx.types.insert(ArtifactKind::Capability, vec![NamedId::new(9, "Initiative")]);

            ctx.users = vec![serde_json::from_value::<TargetUser>(json!({
                                 "UserId": 501,
                                 "EmailAddress": "dev@example.com",
                                 "FirstName": "Dev",
                                 "LastName": "Uno"
                             })).unwrap(),
                             serde_json::from_value::<TargetUser>(json!({
                                 "UserId": 502,
                                 "EmailAddress": "po@example.com",
                                 "FirstName": "Pia",
                                 "LastName": "Dos"
                             })).unwrap()];
            ctx.releases = vec![NamedId::new(11, "1.2"), NamedId::new(12, "1.2.3")];
            ctx.components = vec![NamedId::new(21, "UI"), NamedId::new(22, "Backend")];
            ctx.milestones = vec![NamedId::new(31, "1.2")];
            ctx.document_folders = vec![NamedId::new(41, "Attachments")];
            ctx.source_fields = vec![FieldDescriptor { id: "customfield_200".into(),
                                                       name: "Epic Link".into() },
                                     FieldDescriptor { id: "customfield_201".into(),
                                                       name: "Parent Link".into() },
                                     FieldDescriptor { id: "customfield_210".into(),
                                                       name: "Target start".into() },
                                     FieldDescriptor { id: "customfield_211".into(),
                                                       name: "Target end".into() }];

            let config: MappingConfig = serde_json::from_value(json!({
                "artifact_type_order": ["Story", "Sub-task", "Bug"],
                "capability_type_order": ["Initiative"],
                "types": {
                    "requirements": {"Feature": ["Story", "Improvement"], "Epic": "Epic"},
                    "tasks": {"Development": "Sub-task"},
                    "incidents": {"Bug": "Bug"},
                    "capabilities": {"Initiative": "Initiative"}
                },
                "statuses": {
                    "requirements": {"To Do": "Requested", "In Progress": "In Progress",
                                     "Done": "Completed"},
                    "tasks": {"To Do": "Requested", "In Progress": "In Progress"},
                    "incidents": {"To Do": "Requested", "In Progress": "In Progress"},
                    "capabilities": {"In Progress": "In Progress"}
                },
                "priorities": {
                    "requirements": {"Highest": "1 - Critical", "High": "2 - High"},
                    "tasks": {"Highest": "1 - Critical"},
                    "incidents": {"Highest": "1 - Critical"},
                    "capabilities": {"Highest": "1 - Critical"}
                },
                "release_statuses": {
                    "not_archived_and_not_released": "Planned",
                    "not_archived_and_released": "Completed",
                    "archived_and_not_released": "Cancelled",
                    "archived_and_released": "Closed"
                },
                "milestone_statuses": {
                    "not_archived_and_not_released": "Requested",
                    "not_archived_and_released": "Completed",
                    "archived_and_not_released": "Requested",
                    "archived_and_released": "Completed"
                }
            })).unwrap();

            Self { ctx,
                   config,
                   requirement_index: correlation_snapshot(&[]),
                   capability_index: correlation_snapshot(&[]) }
        }

        pub(crate) fn with_capability(key: &str) -> Self {
            let mut bundle = Self::standard();
            bundle.capability_index = correlation_snapshot(&[(key, 900)]);
            bundle
        }
    }

    pub(crate) fn fixture_context<'a>(bundle: &'a FixtureBundle) -> TransformContext<'a> {
        TransformContext { ctx: &bundle.ctx,
                           config: &bundle.config,
                           renderer: None,
                           requirement_index: &bundle.requirement_index,
                           capability_index: &bundle.capability_index }
    }

    /// Issue de origen mínimo con los campos dados mezclados en `fields`.
    pub(crate) fn issue(key: &str, issue_type: &str, extra_fields: Value) -> SourceRecord {
        let mut fields = json!({"issuetype": {"name": issue_type}});
        if let (Some(base), Some(extra)) = (fields.as_object_mut(), extra_fields.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        SourceRecord::new(json!({"key": key, "fields": fields}))
    }

    #[test]
    fn estimate_points_uses_eight_hour_days() {
        assert_eq!(estimate_points(Some(28_800)), Some(1.0));
        assert_eq!(estimate_points(Some(14_400)), Some(0.5));
        assert_eq!(estimate_points(Some(10_000)), Some(0.35));
        assert_eq!(estimate_points(None), None);
    }

    #[test]
    fn incident_fix_version_counts_as_verified_only_with_resolution() {
        let bundle = FixtureBundle::standard();
        let tc = fixture_context(&bundle);

        let unresolved = issue("PROJ-1", "Bug", json!({
            "versions": [{"name": "1.2"}],
            "fixVersions": [{"name": "1.2.3"}],
            "resolution": null
        }));
        assert_eq!(incident_release_ids(&tc, &unresolved), (Some(11), Some(12), None));

        let resolved = issue("PROJ-2", "Bug", json!({
            "versions": [],
            "fixVersions": [{"name": "1.2.3"}],
            "resolution": {"name": "Fixed"}
        }));
        assert_eq!(incident_release_ids(&tc, &resolved), (None, None, Some(12)));
    }
}
