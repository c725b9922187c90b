//! Documento de staging: checkpoint entre transformación y carga.
//!
//! El transformador escribe este documento a disco (`temp/to_spira.json` en
//! la CLI) y el aplicador lo lee. Permite inspección manual y reanudar la
//! carga sin repetir la transformación.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;
use crate::payload::ArtifactPayload;

/// Un artefacto transformado más sus pistas de jerarquía de origen. Las
/// pistas son claves de correlación del origen, todavía sin resolver a ids
/// destino (eso ocurre en la fase de aplicación).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedArtifact {
    #[serde(flatten)]
    pub payload: ArtifactPayload,
    pub parentlink: Option<String>,
    pub epiclink: Option<String>,
}

impl StagedArtifact {
    pub fn new(payload: ArtifactPayload) -> Self {
        Self { payload,
               parentlink: None,
               epiclink: None }
    }

    pub fn with_links(payload: ArtifactPayload,
                      parentlink: Option<String>,
                      epiclink: Option<String>)
                      -> Self {
        Self { payload,
               parentlink,
               epiclink }
    }
}

/// Documento de staging completo de una pasada.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingDocument {
    /// Identificador de la corrida que produjo el documento.
    pub run_id: Uuid,
    pub product: Vec<StagedArtifact>,
}

impl StagingDocument {
    pub fn new(product: Vec<StagedArtifact>) -> Self {
        Self { run_id: Uuid::new_v4(),
               product }
    }

    pub fn len(&self) -> usize {
        self.product.len()
    }

    pub fn is_empty(&self) -> bool {
        self.product.is_empty()
    }

    /// Serializa el documento al formato de checkpoint en disco.
    pub fn to_json(&self) -> Result<String, DomainError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Relee un documento de checkpoint.
    pub fn from_json(raw: &str) -> Result<Self, DomainError> {
        let document: Self = serde_json::from_str(raw)?;
        document.validate()?;
        Ok(document)
    }

    /// El checkpoint es editable a mano entre transformación y carga; un
    /// valor de propiedad con más de un slot poblado es una edición inválida.
    pub fn validate(&self) -> Result<(), DomainError> {
        for artifact in &self.product {
            let Some(properties) = artifact.payload.custom_properties() else {
                continue;
            };
            for property in properties {
                if !property.is_exclusive() {
                    return Err(DomainError::ValidationError(format!(
                        "'{}': property {} has more than one value slot populated",
                        artifact.payload.display_name(),
                        property.property_number
                    )));
                }
            }
        }
        Ok(())
    }
}
