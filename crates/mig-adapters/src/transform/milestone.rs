//! Versiones de origen → milestones a nivel de programa.
//!
//! Solo se migran las versiones que alguna capability referencia como fix
//! version: el programa no necesita el resto.

use log::{debug, warn};

use mig_core::{normalize_datetime, MigrationContext, VersionStatusTable};
use mig_domain::{ArtifactKind, ArtifactPayload, MilestonePayload, SourceRecord, StagedArtifact,
                 VersionRecord};

use super::version_name;

const FALLBACK_DATE: &str = "1970-01-01T00:00:00";

/// Nombres de versión referenciados por las capabilities, en orden de
/// primera aparición y sin duplicados.
fn referenced_version_names(capability_records: &[SourceRecord]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for record in capability_records {
        let affected = record.affected_versions();
        if !affected.is_empty() {
            let unhandled: Vec<&str> = affected.iter().filter_map(|v| version_name(v)).collect();
            warn!("{}: affected versions are not migrated as milestones: {unhandled:?}",
                  record.key().unwrap_or("(no key)"));
        }
        let fixes = record.fix_versions();
        if fixes.len() > 1 {
            let unhandled: Vec<&str> = fixes[1..].iter().filter_map(|v| version_name(v)).collect();
            warn!("{}: only one fix version is supported, not handled: {unhandled:?}",
                  record.key().unwrap_or("(no key)"));
        }
        if let Some(name) = fixes.first().and_then(|v| version_name(v)) {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

fn milestone_status_id(ctx: &MigrationContext,
                       table: Option<&VersionStatusTable>,
                       version: &VersionRecord)
                       -> i64 {
    let Some(table) = table else {
        return 0;
    };
    let status_name = table.status_name(version.archived, version.released);
    ctx.statuses_for(ArtifactKind::Milestone)
       .iter()
       .find(|s| s.name == status_name)
       .map(|s| s.id)
       .unwrap_or(0)
}

pub fn milestones_from_versions(ctx: &MigrationContext,
                                status_table: Option<&VersionStatusTable>,
                                capability_records: &[SourceRecord],
                                versions: &[VersionRecord])
                                -> Vec<StagedArtifact> {
    referenced_version_names(capability_records)
        .iter()
        .filter_map(|name| {
            if ctx.milestone_id_by_name(name).is_some() {
                debug!("milestone '{name}' already in target, skipping");
                return None;
            }
            let Some(version) = versions.iter().find(|v| &v.name == name) else {
                warn!("version '{name}' referenced by a capability but missing from export");
                return None;
            };
            let payload = MilestonePayload {
                status_id:   milestone_status_id(ctx, status_table, version),
                name:        version.name.clone(),
                description: version.description
                                    .clone()
                                    .unwrap_or_else(|| " ".to_string()),
                start_date:  version.start_date
                                    .as_deref()
                                    .map(normalize_datetime)
                                    .unwrap_or_else(|| FALLBACK_DATE.to_string()),
                end_date:    version.release_date
                                    .as_deref()
                                    .map(normalize_datetime)
                                    .unwrap_or_else(|| FALLBACK_DATE.to_string()),
            };
            Some(StagedArtifact::new(ArtifactPayload::Milestone(payload)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::tests::{issue, FixtureBundle};
    use serde_json::json;

    fn version(name: &str, released: bool) -> VersionRecord {
        serde_json::from_value(json!({
            "name": name,
            "archived": false,
            "released": released,
            "startDate": "2023-03-01",
            "releaseDate": "2023-09-01"
        })).unwrap()
    }

    #[test]
    fn only_versions_referenced_by_capabilities_become_milestones() {
        let bundle = FixtureBundle::standard();
        let capabilities = vec![issue("INIT-1", "Initiative",
                                      json!({"fixVersions": [{"name": "2.0"}]})),
                                issue("INIT-2", "Initiative",
                                      json!({"fixVersions": [{"name": "2.0"}]})),
                                issue("INIT-3", "Initiative", json!({"fixVersions": []}))];
        let versions = vec![version("2.0", true), version("9.9", false)];

        let staged = milestones_from_versions(&bundle.ctx,
                                              bundle.config.milestone_statuses.as_ref(),
                                              &capabilities,
                                              &versions);
        assert_eq!(staged.len(), 1);
        let ArtifactPayload::Milestone(payload) = &staged[0].payload else {
            panic!("expected milestone payload");
        };
        assert_eq!(payload.name, "2.0");
        // released -> "Completed" en la tabla de la config de prueba
        assert_eq!(payload.status_id, 3);
        assert_eq!(payload.start_date, "2023-03-01T00:00:00");
        assert_eq!(payload.end_date, "2023-09-01T00:00:00");
    }

    #[test]
    fn existing_milestones_are_not_duplicated() {
        let bundle = FixtureBundle::standard();
        // "1.2" ya existe como milestone en el contexto de prueba
        let capabilities = vec![issue("INIT-1", "Initiative",
                                      json!({"fixVersions": [{"name": "1.2"}]}))];
        let versions = vec![version("1.2", false)];
        let staged = milestones_from_versions(&bundle.ctx,
                                              bundle.config.milestone_statuses.as_ref(),
                                              &capabilities,
                                              &versions);
        assert!(staged.is_empty());
    }
}
