//! `ToolSpec` catalogue — the per-agent lookup table the policy engine and
//! dispatcher consult (spec §3 "ToolSpec", §4.3).

use std::collections::HashMap;

use crate::spec::ToolSpec;

/// An immutable, cloneable catalogue of tool specs keyed by qualified
/// name (`<toolset>.<tool>`).
#[derive(Debug, Clone, Default)]
pub struct ToolCatalogue {
    specs: HashMap<String, ToolSpec>,
}

impl ToolCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, spec: ToolSpec) {
        self.specs.insert(spec.qualified_name(), spec);
    }

    pub fn get(&self, qualified_name: &str) -> Option<&ToolSpec> {
        self.specs.get(qualified_name)
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.specs.contains_key(qualified_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
