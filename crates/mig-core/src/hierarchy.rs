//! Jerarquías: padre de un registro (epic > parent) y clasificación de
//! releases con inserción en dos fases.
//!
//! Las versiones de origen son planas; el destino exige árbol. La convención
//! de nombres decide el rol: un nombre con dos componentes numéricos y final
//! dígito ("2", "2.1") es raíz, todo lo demás ("1.2.3", "Release-X") cuelga
//! del padre que comparte sus dos primeros componentes.

use crate::correlate::CorrelationIndex;

/// Rol de una versión de origen en el árbol de releases destino.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseRole {
    Parent,
    Child,
}

/// Corridas de dígitos del nombre, en orden de aparición ("2.0.1-rc3" da
/// ["2", "0", "1", "3"]).
fn numeric_components(name: &str) -> Vec<&str> {
    let bytes = name.as_bytes();
    let mut runs = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            runs.push(&name[start..i]);
        } else {
            i += 1;
        }
    }
    runs
}

/// Clasifica un nombre de versión. Final no numérico o tres o más corridas
/// de dígitos significa hijo.
pub fn classify(name: &str) -> ReleaseRole {
    match name.chars().last() {
        Some(c) if c.is_ascii_digit() => {}
        _ => return ReleaseRole::Child,
    }
    if numeric_components(name).len() >= 3 {
        ReleaseRole::Child
    } else {
        ReleaseRole::Parent
    }
}

/// Releases raíz ya creadas, consultables por los hijos en la segunda fase.
#[derive(Debug, Clone, Default)]
pub struct ReleaseTable {
    parents: Vec<(String, i64)>,
}

impl ReleaseTable {
    pub fn insert(&mut self, name: &str, release_id: i64) {
        self.parents.push((name.to_string(), release_id));
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Padre de un nombre hijo: la raíz que comparte sus dos primeros
    /// componentes numéricos. `None` deja al hijo en el nivel superior.
    pub fn find_parent(&self, child_name: &str) -> Option<i64> {
        let child = numeric_components(child_name);
        if child.len() < 2 {
            return None;
        }
        self.parents.iter().find_map(|(name, id)| {
                               let parent = numeric_components(name);
                               (parent.len() >= 2 && parent[..2] == child[..2]).then_some(*id)
                           })
    }
}

/// Resolución de padre contra el índice de correlación de la pasada. La
/// precedencia difiere por clase de artefacto.
pub struct HierarchyResolver<'a> {
    index: &'a CorrelationIndex,
}

impl<'a> HierarchyResolver<'a> {
    pub fn new(index: &'a CorrelationIndex) -> Self {
        Self { index }
    }

    fn lookup(&self, key: Option<&str>) -> Option<i64> {
        self.index.find(key?).map(|a| a.primary_id)
    }

    /// Padre de un requirement: el vínculo de epic gana sobre el padre
    /// directo cuando ambos existen y resuelven.
    pub fn resolve_requirement_parent(&self,
                                      epiclink: Option<&str>,
                                      parentlink: Option<&str>)
                                      -> Option<i64> {
        self.lookup(epiclink).or_else(|| self.lookup(parentlink))
    }

    /// Capability destino de un requirement recién creado: acá el padre
    /// directo gana sobre el epic.
    pub fn resolve_capability_link(&self,
                                   epiclink: Option<&str>,
                                   parentlink: Option<&str>)
                                   -> Option<i64> {
        self.lookup(parentlink).or_else(|| self.lookup(epiclink))
    }
}
