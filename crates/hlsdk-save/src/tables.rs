// tables.rs — process-lifetime string pool and function registry
// Converted from: the engine-side string pool (ALLOC_STRING/STRING) and
// hlsdk-original/game/server/util.cpp (UTIL_FunctionFromName /
// UTIL_NameFromFunction over the entity DataMap function tables).

use hlsdk_common::token::token_hash;

use crate::context::{FuncId, FunctionRegistry, GameStrings, StringId};

// ============================================================
// String pool
// ============================================================

/// Interning string pool. Id 0 is reserved for the empty string so a
/// zeroed String field means "no string" and gets dropped by the
/// empty-field rule.
#[derive(Debug)]
pub struct StringTable {
    strings: Vec<String>,
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StringTable {
    pub fn new() -> Self {
        StringTable {
            strings: vec![String::new()],
        }
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl GameStrings for StringTable {
    fn string(&self, id: StringId) -> &str {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.strings.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }

    fn alloc_string(&mut self, s: &str) -> StringId {
        if s.is_empty() {
            return 0;
        }
        if let Some(i) = self.strings.iter().position(|existing| existing == s) {
            return i as StringId;
        }
        self.strings.push(s.to_owned());
        (self.strings.len() - 1) as StringId
    }

    fn string_from_token(&self, token: u16) -> Option<StringId> {
        self.strings
            .iter()
            .position(|s| !s.is_empty() && token_hash(s) == token)
            .map(|i| i as StringId)
    }
}

// ============================================================
// Function registry
// ============================================================

/// Name registry for function fields, populated once at startup. Ids start
/// at 1; 0 always means "no function".
#[derive(Debug, Default)]
pub struct FunctionTable {
    names: Vec<String>,
}

impl FunctionTable {
    pub fn new() -> Self {
        FunctionTable { names: Vec::new() }
    }

    /// Register a function name, returning its id. Registering the same
    /// name twice returns the same id.
    pub fn register(&mut self, name: &str) -> FuncId {
        if let Some(i) = self.names.iter().position(|existing| existing == name) {
            return (i + 1) as FuncId;
        }
        self.names.push(name.to_owned());
        self.names.len() as FuncId
    }
}

impl FunctionRegistry for FunctionTable {
    fn function_name(&self, func: FuncId) -> Option<&str> {
        if func <= 0 {
            return None;
        }
        self.names.get(func as usize - 1).map(String::as_str)
    }

    fn function_from_name(&self, name: &str) -> Option<FuncId> {
        self.names
            .iter()
            .position(|existing| existing == name)
            .map(|i| (i + 1) as FuncId)
    }
}
