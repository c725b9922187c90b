//! Versiones de origen → releases destino.
//!
//! La clasificación raíz/hijo y la inserción en dos fases las hace el
//! aplicador; acá solo se arma el payload. Una versión cuyo nombre ya existe
//! como release en destino se salta, las releases no llevan propiedad de
//! correlación.

use log::{debug, warn};

use mig_core::{normalize_datetime, MigrationContext, VersionStatusTable};
use mig_domain::{ArtifactPayload, ReleasePayload, StagedArtifact, VersionRecord};

/// Fecha que viaja cuando el origen no registró ninguna.
const FALLBACK_DATE: &str = "1970-01-01T00:00:00";

/// Ids de estado de release fijos del destino.
fn release_status_id(status_name: &str) -> i64 {
    match status_name {
        "Planned" => 1,
        "InProgress" => 2,
        "Completed" => 3,
        "Closed" => 4,
        "Deferred" => 5,
        "Cancelled" => 6,
        other => {
            warn!("unknown release status '{other}', must be set manually");
            0
        }
    }
}

fn normalized_or_fallback(date: Option<&str>) -> String {
    date.map(normalize_datetime).unwrap_or_else(|| FALLBACK_DATE.to_string())
}

pub fn releases_from_versions(ctx: &MigrationContext,
                              status_table: Option<&VersionStatusTable>,
                              versions: &[VersionRecord])
                              -> Vec<StagedArtifact> {
    versions.iter()
            .filter(|version| {
                if ctx.release_id_by_name(&version.name).is_some() {
                    debug!("release '{}' already in target, skipping", version.name);
                    return false;
                }
                true
            })
            .map(|version| {
                let status_id = status_table.map(|table| {
                                                 release_status_id(table.status_name(
                                                     version.archived, version.released))
                                             })
                                            .unwrap_or(0);
                let payload = ReleasePayload {
                    name:              version.name.clone(),
                    description:       version.description
                                              .clone()
                                              .unwrap_or_else(|| " ".to_string()),
                    version_number:    version.name.clone(),
                    release_status_id: status_id,
                    release_type_id:   1,
                    start_date:        normalized_or_fallback(version.start_date.as_deref()),
                    end_date:          normalized_or_fallback(version.release_date.as_deref()),
                };
                StagedArtifact::new(ArtifactPayload::Release(payload))
            })
            .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::tests::FixtureBundle;

    fn version(name: &str, archived: bool, released: bool) -> VersionRecord {
        serde_json::from_value(serde_json::json!({
            "name": name,
            "archived": archived,
            "released": released,
            "startDate": "2023-01-15",
        })).unwrap()
    }

    #[test]
    fn status_follows_flag_table_and_dates_get_normalized() {
        let bundle = FixtureBundle::standard();
        let versions = vec![version("2.0", false, false), version("3.0", true, true)];
        let staged = releases_from_versions(&bundle.ctx,
                                            bundle.config.release_statuses.as_ref(),
                                            &versions);
        assert_eq!(staged.len(), 2);
        let ArtifactPayload::Release(first) = &staged[0].payload else {
            panic!("expected release payload");
        };
        assert_eq!(first.release_status_id, 1);
        assert_eq!(first.release_type_id, 1);
        assert_eq!(first.start_date, "2023-01-15T00:00:00");
        assert_eq!(first.end_date, FALLBACK_DATE);
        let ArtifactPayload::Release(second) = &staged[1].payload else {
            panic!("expected release payload");
        };
        assert_eq!(second.release_status_id, 4);
    }

    #[test]
    fn versions_already_in_target_are_skipped() {
        let bundle = FixtureBundle::standard();
        // "1.2" ya existe como release en el contexto de prueba
        let versions = vec![version("1.2", false, false), version("4.0", false, false)];
        let staged = releases_from_versions(&bundle.ctx,
                                            bundle.config.release_statuses.as_ref(),
                                            &versions);
        assert_eq!(staged.len(), 1);
        assert_eq!(staged[0].payload.display_name(), "4.0");
    }
}
