//! Compiled-template cache keyed by source text and by template id

use std::collections::HashMap;
use std::sync::Arc;

use crate::compiler::Program;

/// One compile pass: the node tree plus its generated representation
#[derive(Debug)]
pub struct CompiledTemplate {
    source: String,
    program: Program,
    generated: String,
}

impl CompiledTemplate {
    pub(crate) fn new(source: &str, program: Program) -> Self {
        let generated = program.to_string();
        Self {
            source: source.to_string(),
            program,
            generated,
        }
    }

    /// Template source this was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Indented dump of the node tree
    pub fn generated(&self) -> &str {
        &self.generated
    }
}

/// Both indices share the same `Arc`; an id entry never holds its own copy.
#[derive(Debug, Default)]
pub(crate) struct CompileCache {
    by_source: HashMap<String, Arc<CompiledTemplate>>,
    by_id: HashMap<String, Arc<CompiledTemplate>>,
}

impl CompileCache {
    pub fn by_source(&self, source: &str) -> Option<Arc<CompiledTemplate>> {
        self.by_source.get(source).cloned()
    }

    pub fn by_id(&self, id: &str) -> Option<Arc<CompiledTemplate>> {
        self.by_id.get(id).cloned()
    }

    /// Store a fresh compile; an artifact already cached for the same
    /// source wins and is returned instead.
    pub fn insert(&mut self, compiled: Arc<CompiledTemplate>) -> Arc<CompiledTemplate> {
        Arc::clone(
            self.by_source
                .entry(compiled.source().to_string())
                .or_insert(compiled),
        )
    }

    /// Index an artifact under `id`, keeping an existing entry
    pub fn insert_id(&mut self, id: &str, compiled: Arc<CompiledTemplate>) -> Arc<CompiledTemplate> {
        Arc::clone(self.by_id.entry(id.to_string()).or_insert(compiled))
    }

    pub fn clear(&mut self) {
        self.by_source.clear();
        self.by_id.clear();
    }

    pub fn len(&self) -> usize {
        self.by_source.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;

    fn compiled(source: &str) -> Arc<CompiledTemplate> {
        Arc::new(CompiledTemplate::new(source, compile(source).expect("Should compile")))
    }

    #[test]
    fn test_first_insert_wins() {
        let mut cache = CompileCache::default();
        let first = compiled("a{b}");
        let second = compiled("a{b}");
        let kept = cache.insert(Arc::clone(&first));
        assert!(Arc::ptr_eq(&kept, &first));
        let kept = cache.insert(second);
        assert!(Arc::ptr_eq(&kept, &first));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_id_index_shares_artifact() {
        let mut cache = CompileCache::default();
        let artifact = cache.insert(compiled("x"));
        cache.insert_id("row", Arc::clone(&artifact));
        let by_id = cache.by_id("row").expect("indexed");
        let by_source = cache.by_source("x").expect("cached");
        assert!(Arc::ptr_eq(&by_id, &by_source));
    }

    #[test]
    fn test_clear_drops_both_indices() {
        let mut cache = CompileCache::default();
        let artifact = cache.insert(compiled("x"));
        cache.insert_id("row", artifact);
        cache.clear();
        assert!(cache.by_source("x").is_none());
        assert!(cache.by_id("row").is_none());
    }

    #[test]
    fn test_generated_representation() {
        let artifact = compiled("Hi {name}");
        assert_eq!(artifact.generated(), "text \"Hi \"\ninsert name\n");
        assert_eq!(artifact.source(), "Hi {name}");
    }
}
