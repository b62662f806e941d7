// schema.rs — typed field descriptors for the save/restore system
// Converted from: hlsdk-original/game/server/saverestore/CSaveRestore.h
// (TYPEDESCRIPTION / DEFINE_FIELD)

use bitflags::bitflags;

use hlsdk_common::token::token_hash;

// ============================================================
// Field types
// ============================================================

/// Type tag for one saved field. Drives both the per-element storage size
/// and the wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// One f32.
    Float,
    /// One f32 holding a simulation time, stored as a delta from the
    /// in-flight operation's clock so it can be re-based on load.
    Time,
    /// Three f32, raw.
    Vector,
    /// Three f32 in level coordinates, shifted through the landmark offset
    /// when one is active so the value survives a level transition.
    PositionVector,
    /// An i32 id into the game string pool; the pooled text goes on the wire.
    String,
    /// Entity reference kinds. All are an i32 handle in storage (0 = none)
    /// and a stable entity index on the wire.
    Entity,
    ClassPtr,
    Edict,
    EHandle,
    /// An i32 id into the function registry; the registered name goes on
    /// the wire.
    Function,
    /// One byte, 0 or 1.
    Boolean,
    /// One i16.
    Short,
    /// One i32.
    Integer,
    /// One raw byte (fixed-size character arrays use a count).
    Character,
}

impl FieldType {
    /// Per-element storage size in bytes.
    pub const fn element_size(self) -> usize {
        match self {
            FieldType::Float => 4,
            FieldType::Time => 4,
            FieldType::Vector => 12,
            FieldType::PositionVector => 12,
            FieldType::String => 4,
            FieldType::Entity => 4,
            FieldType::ClassPtr => 4,
            FieldType::Edict => 4,
            FieldType::EHandle => 4,
            FieldType::Function => 4,
            FieldType::Boolean => 1,
            FieldType::Short => 2,
            FieldType::Integer => 4,
            FieldType::Character => 1,
        }
    }
}

bitflags! {
    /// Per-descriptor behavior flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FieldFlags: u32 {
        /// Field is persisted. Fields without this flag are never written
        /// and are left untouched on restore.
        const SAVE = 1 << 0;
    }
}

// ============================================================
// Field descriptors
// ============================================================

/// Describes one field of one object type: where it lives in the object's
/// flat storage block and how to encode it. Plain data, built once per type
/// at startup and shared by every instance.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub field_type: FieldType,
    /// Byte offset into the object's storage block
    /// (callers typically use `std::mem::offset_of!`).
    pub offset: usize,
    /// Element count; 1 for scalars.
    pub count: usize,
    pub flags: FieldFlags,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, field_type: FieldType, offset: usize, count: usize) -> Self {
        FieldDescriptor {
            name,
            field_type,
            offset,
            count,
            flags: FieldFlags::SAVE,
        }
    }

    pub const fn with_flags(
        name: &'static str,
        field_type: FieldType,
        offset: usize,
        count: usize,
        flags: FieldFlags,
    ) -> Self {
        FieldDescriptor {
            name,
            field_type,
            offset,
            count,
            flags,
        }
    }

    /// Total backing-storage size of this field in bytes.
    pub const fn storage_size(&self) -> usize {
        self.count * self.field_type.element_size()
    }

    /// Wire token for this field's name.
    pub fn token(&self) -> u16 {
        token_hash(self.name)
    }

    /// This field's slice of the object storage block, or None when the
    /// descriptor does not fit (a schema bug; callers log and skip).
    pub fn storage<'a>(&self, base: &'a [u8]) -> Option<&'a [u8]> {
        base.get(self.offset..self.offset + self.storage_size())
    }

    pub fn storage_mut<'a>(&self, base: &'a mut [u8]) -> Option<&'a mut [u8]> {
        base.get_mut(self.offset..self.offset + self.storage_size())
    }
}

// ============================================================
// Object schemas
// ============================================================

/// Ordered field-descriptor table for one object type.
#[derive(Debug, Clone)]
pub struct ObjectSchema {
    fields: Vec<FieldDescriptor>,
}

impl ObjectSchema {
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        ObjectSchema { fields }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check every descriptor against the object's storage size and warn
    /// about token collisions inside this schema. Returns false when some
    /// descriptor falls outside the storage block; colliding tokens only
    /// warn, since the save side still works and the restore side resolves
    /// the first match.
    pub fn validate(&self, object_size: usize) -> bool {
        let mut ok = true;
        for field in &self.fields {
            if field.offset + field.storage_size() > object_size {
                log::error!(
                    "field `{}` ({} bytes at offset {}) outside object storage ({} bytes)",
                    field.name,
                    field.storage_size(),
                    field.offset,
                    object_size
                );
                ok = false;
            }
            if field.count == 0 {
                log::warn!("field `{}` has a zero element count", field.name);
            }
        }
        for (i, a) in self.fields.iter().enumerate() {
            for b in &self.fields[i + 1..] {
                if a.token() == b.token() {
                    log::warn!(
                        "fields `{}` and `{}` share token {:#06x}; restore will always pick `{}`",
                        a.name,
                        b.name,
                        a.token(),
                        a.name
                    );
                }
            }
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_sizes() {
        assert_eq!(FieldType::Float.element_size(), 4);
        assert_eq!(FieldType::Vector.element_size(), 12);
        assert_eq!(FieldType::PositionVector.element_size(), 12);
        assert_eq!(FieldType::Short.element_size(), 2);
        assert_eq!(FieldType::Boolean.element_size(), 1);
        assert_eq!(FieldType::Character.element_size(), 1);
        assert_eq!(FieldType::EHandle.element_size(), 4);
    }

    #[test]
    fn test_storage_size_counts_elements() {
        let f = FieldDescriptor::new("ammo", FieldType::Integer, 8, 4);
        assert_eq!(f.storage_size(), 16);
    }

    #[test]
    fn test_storage_slice() {
        let base = [0u8, 1, 2, 3, 4, 5, 6, 7];
        let f = FieldDescriptor::new("x", FieldType::Integer, 4, 1);
        assert_eq!(f.storage(&base), Some(&base[4..8]));
    }

    #[test]
    fn test_storage_out_of_bounds() {
        let base = [0u8; 8];
        let f = FieldDescriptor::new("x", FieldType::Vector, 4, 1);
        assert_eq!(f.storage(&base), None);
    }

    #[test]
    fn test_validate_bounds() {
        let schema = ObjectSchema::new(vec![
            FieldDescriptor::new("health", FieldType::Integer, 0, 1),
            FieldDescriptor::new("origin", FieldType::Vector, 4, 1),
        ]);
        assert!(schema.validate(16));
        assert!(!schema.validate(12));
    }

    #[test]
    fn test_default_flags_persist() {
        let f = FieldDescriptor::new("health", FieldType::Integer, 0, 1);
        assert!(f.flags.contains(FieldFlags::SAVE));
    }
}
