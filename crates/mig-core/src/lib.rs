//! mig-core: motor de transformación, correlación y aplicación por lotes.
//!
//! Componentes en orden de dependencia:
//! - `mapping`: valor categórico de origen → id numérico destino.
//! - `encode`: encoder con dispatch por tipo para propiedades configurables.
//! - `correlate`: índice clave de correlación → id destino ya creado.
//! - `hierarchy`: resolución de padre (epic > parent) y clasificación de
//!   releases con inserción en dos fases.
//! - `apply`: aplicador secuencial con aislamiento de fallos por registro.
//! - `clean`: pasadas de limpieza del destino, con el mismo aislamiento.
//!
//! Todo es síncrono y de un solo hilo: los lookups de correlación y la
//! inserción en dos fases dependen de que cada escritura sea visible antes
//! del siguiente lookup en orden de programa.

pub mod apply;
pub mod clean;
pub mod clients;
pub mod context;
pub mod correlate;
pub mod encode;
pub mod errors;
pub mod hierarchy;
pub mod mapping;

pub use apply::{BatchApplier, ATTACHMENTS_FOLDER};
pub use clean::{BatchCleaner, TargetInventory};
pub use clients::{ArtifactRemover, ArtifactWriter, CreatedArtifact, MarkupRenderer};
pub use context::{CustomPropMapping, MappingConfig, MigrationContext, NamedId, ProjectInfo,
                  SourceNames, TargetUser, TypeTable, VersionStatusTable};
pub use correlate::{CorrelationIndex, ExistingArtifact};
pub use encode::{normalize_datetime, render_rich_text, CustomPropertyEncoder};
pub use errors::EngineError;
pub use hierarchy::{classify, HierarchyResolver, ReleaseRole, ReleaseTable};
pub use mapping::TypeMappingResolver;
