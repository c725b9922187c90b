//! mig-domain: modelo de datos de la migración.
//!
//! Este crate define los tipos que viajan entre las fases del pipeline:
//! - `SourceRecord` y sus accesores de solo lectura sobre el JSON de origen.
//! - `PropertyValue` / `CustomPropertyDefinition`: propiedades configurables
//!   tipadas del sistema destino (invariante de exclusividad verificable).
//! - `ArtifactPayload`: variantes fuertemente tipadas por clase de artefacto.
//! - `StagingDocument`: formato de checkpoint entre transformación y carga.
//! - `MigrationResult`: agregado de éxito/fallo por lote.
//!
//! No contiene lógica de resolución ni de aplicación; eso vive en `mig-core`.

pub mod errors;
pub mod payload;
pub mod property;
pub mod result;
pub mod source;
pub mod staging;

pub use errors::DomainError;
pub use payload::{
    ArtifactKind, ArtifactPayload, AssociationPayload, AttachedArtifactRef, CapabilityPayload,
    CommentPayload, ComponentPayload, CustomListPayload, CustomListValuePayload, DocumentPayload,
    IncidentPayload, MilestonePayload, ReleasePayload, RequirementPayload, TaskPayload,
};
pub use property::{
    CustomListDefinition, CustomListValue, CustomPropertyDefinition, PropertyDefinitionRef,
    PropertyKind, PropertyValue,
};
pub use result::{FailureDiagnostic, MigrationResult};
pub use source::{ComponentRecord, CorrelationKey, FieldDescriptor, SourceRecord, VersionRecord};
pub use staging::{StagedArtifact, StagingDocument};
