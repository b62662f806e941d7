// context.rs — per-operation context and collaborator interfaces
// Converted from: hlsdk-original/game/shared/engine/SAVERESTOREDATA.h plus
// the engine callbacks the save code reaches through (EntityIndex,
// UTIL_NameFromFunction, string pool access).

use hlsdk_common::shared::Vec3;

/// Entity handle as stored inside object state. 0 means "no entity".
pub type EntHandle = i32;

/// Id into the game string pool. 0 is the null/empty string.
pub type StringId = i32;

/// Id into the function registry. 0 means "no function"; registries hand
/// out ids starting at 1 so the all-zero emptiness rule coincides with
/// "no reference".
pub type FuncId = i32;

/// Context for one save or restore operation. Created per call, never
/// persisted itself.
///
/// `time` re-bases Time fields between the saving and restoring simulation
/// clocks; `landmark_offset` shifts PositionVector fields so level-local
/// coordinates survive a transition into a different level's frame.
#[derive(Debug, Clone, Copy)]
pub struct SaveRestoreData {
    pub time: f32,
    pub landmark_offset: Option<Vec3>,
}

impl SaveRestoreData {
    pub fn new(time: f32) -> Self {
        SaveRestoreData {
            time,
            landmark_offset: None,
        }
    }

    pub fn with_landmark(time: f32, landmark_offset: Vec3) -> Self {
        SaveRestoreData {
            time,
            landmark_offset: Some(landmark_offset),
        }
    }
}

// ============================================================
// Collaborator interfaces
// ============================================================

/// The simulation's entity table. Handles are only meaningful within one
/// running level, so the wire carries stable indices instead.
pub trait EntityTable {
    /// Stable index for a live handle, -1 when the handle is dead or null.
    fn entity_index(&self, ent: EntHandle) -> i32;

    /// Handle for a saved index, 0 when the entity no longer exists
    /// (an expected condition on restore, not an error).
    fn entity_from_index(&self, index: i32) -> EntHandle;
}

/// Maps function ids to the stable names that go on the wire. Populated at
/// startup, lives for the process.
pub trait FunctionRegistry {
    fn function_name(&self, func: FuncId) -> Option<&str>;
    fn function_from_name(&self, name: &str) -> Option<FuncId>;
}

/// The game string pool. String fields store ids; the pooled text is what
/// gets serialized.
pub trait GameStrings {
    fn string(&self, id: StringId) -> &str;
    fn alloc_string(&mut self, s: &str) -> StringId;
    /// Resolve a 16-bit name token back to a pooled string, for streams
    /// written in token-compaction mode.
    fn string_from_token(&self, token: u16) -> Option<StringId>;
}
