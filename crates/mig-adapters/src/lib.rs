//! mig-adapters: transformadores de registros de origen a payloads destino.
//!
//! Cada clase de artefacto tiene su transformador; todos comparten la
//! resolución de personas, versiones, componentes y propiedades
//! configurables de `mig-core`. La transformación nunca aborta por un
//! registro: lo que no resuelve degrada a id 0, `None` o centinela, con
//! warning.

pub mod transform;

pub use transform::{run_pass, RecordTransformer, TransformContext};
