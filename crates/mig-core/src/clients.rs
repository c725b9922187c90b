//! Contratos de colaboradores externos.
//!
//! El transporte HTTP real queda fuera del motor; estos traits son la
//! costura. Los tests y el binario de demostración usan dobles en memoria.

use serde_json::Value;

use crate::errors::EngineError;
use mig_domain::{ArtifactKind, StagedArtifact};

/// Colaborador de renderizado de markup de origen a HTML destino.
pub trait MarkupRenderer {
    fn render(&self, markup: &str) -> Result<String, EngineError>;
}

/// Artefacto recién creado en el destino.
#[derive(Debug, Clone)]
pub struct CreatedArtifact {
    pub id: i64,
    /// Registro completo que devolvió el destino.
    pub raw: Value,
}

/// Operación de escritura contra el destino. Una llamada por registro,
/// estrictamente secuencial: el aplicador emite la siguiente solo cuando la
/// anterior terminó.
pub trait ArtifactWriter {
    /// Crea el artefacto, como hijo de `parent_id` cuando se indica.
    fn create(&mut self,
              staged: &StagedArtifact,
              parent_id: Option<i64>)
              -> Result<CreatedArtifact, EngineError>;

    /// Vínculo post-creación requirement → capability (nivel de programa).
    fn associate_capability(&mut self,
                            capability_id: i64,
                            requirement_id: i64)
                            -> Result<(), EngineError>;

    /// Crea una carpeta de documentos bajo la raíz del producto y devuelve
    /// su id destino.
    fn create_document_folder(&mut self, name: &str) -> Result<i64, EngineError>;
}

/// Operación de borrado contra el destino, para las pasadas de limpieza.
/// Mismo contrato secuencial que `ArtifactWriter`.
pub trait ArtifactRemover {
    /// Borra el registro indicado por clase e id destino.
    fn delete(&mut self, kind: ArtifactKind, id: i64) -> Result<(), EngineError>;

    /// Desvincula un documento de un artefacto. Corre antes del borrado de
    /// los artefactos del producto.
    fn remove_document_association(&mut self,
                                   artifact_type_id: i64,
                                   artifact_id: i64,
                                   document_id: i64)
                                   -> Result<(), EngineError>;

    /// Borra una carpeta de documentos del producto.
    fn delete_document_folder(&mut self, folder_id: i64) -> Result<(), EngineError>;
}
