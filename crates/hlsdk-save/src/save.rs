// save.rs — buffered field-table save writer
// Converted from: hlsdk-original/game/server/saverestore/CSave.cpp

use bytemuck::pod_read_unaligned;

use hlsdk_common::shared::{vector_subtract, Vec3};
use hlsdk_common::token::token_hash;

use crate::buffer::SaveBuffer;
use crate::context::{EntHandle, EntityTable, FuncId, FunctionRegistry, GameStrings, SaveRestoreData, StringId};
use crate::error::SaveError;
use crate::schema::{FieldDescriptor, FieldFlags, FieldType, ObjectSchema};

/// Entity-reference arrays larger than this are clamped; the on-wire format
/// has always used a fixed scratch array of this size.
pub const MAX_ENTITY_ARRAY: usize = 64;

/// Size of one record header on the wire: u16 payload size + u16 name token.
pub const HEADER_SIZE: usize = 4;

/// True when every byte of a field's backing storage is zero. Empty fields
/// are skipped entirely on save and restored to their zero default.
pub fn data_empty(data: &[u8]) -> bool {
    data.iter().all(|&b| b == 0)
}

// ============================================================
// Storage decoding helpers
// ============================================================

fn read_f32s(raw: &[u8]) -> Vec<f32> {
    raw.chunks_exact(4).map(pod_read_unaligned::<f32>).collect()
}

fn read_i32s(raw: &[u8]) -> Vec<i32> {
    raw.chunks_exact(4).map(pod_read_unaligned::<i32>).collect()
}

fn read_vec3s(raw: &[u8]) -> Vec<Vec3> {
    raw.chunks_exact(12)
        .map(|chunk| {
            [
                pod_read_unaligned::<f32>(&chunk[0..4]),
                pod_read_unaligned::<f32>(&chunk[4..8]),
                pod_read_unaligned::<f32>(&chunk[8..12]),
            ]
        })
        .collect()
}

// ============================================================
// Save writer
// ============================================================

/// Walks field-descriptor tables and emits length-prefixed, token-keyed
/// records into a `SaveBuffer`. One writer per save operation; all writes
/// are strictly sequential.
pub struct Save<'a> {
    buffer: &'a mut SaveBuffer,
    data: &'a SaveRestoreData,
    entities: &'a dyn EntityTable,
    functions: &'a dyn FunctionRegistry,
    strings: &'a dyn GameStrings,
    tokenize: bool,
}

impl<'a> Save<'a> {
    pub fn new(
        buffer: &'a mut SaveBuffer,
        data: &'a SaveRestoreData,
        entities: &'a dyn EntityTable,
        functions: &'a dyn FunctionRegistry,
        strings: &'a dyn GameStrings,
    ) -> Self {
        Save {
            buffer,
            data,
            entities,
            functions,
            strings,
            tokenize: false,
        }
    }

    /// Switch String fields to token-compaction mode: the 16-bit name token
    /// goes on the wire instead of the string bytes. Mutually exclusive with
    /// the default mode for the whole stream; the reader must agree.
    pub fn with_string_tokens(mut self) -> Self {
        self.tokenize = true;
        self
    }

    // ============================================================
    // Record primitives
    // ============================================================

    fn buffer_header(&mut self, name: &str, size: usize) {
        if size > u16::MAX as usize {
            log::error!("field `{}` payload ({} bytes) exceeds the 16-bit record size", name, size);
        }
        self.buffer.write_bytes(&(size as u16).to_le_bytes());
        self.buffer.write_bytes(&token_hash(name).to_le_bytes());
    }

    fn buffer_field(&mut self, name: &str, bytes: &[u8]) {
        self.buffer_header(name, bytes.len());
        self.buffer.write_bytes(bytes);
    }

    // ============================================================
    // Per-type writers
    // ============================================================

    /// Raw bytes, exactly as stored. Also covers fixed-size character arrays.
    pub fn write_data(&mut self, name: &str, bytes: &[u8]) {
        self.buffer_field(name, bytes);
    }

    pub fn write_short(&mut self, name: &str, values: &[i16]) {
        self.buffer_header(name, 2 * values.len());
        for &v in values {
            self.buffer.write_bytes(&v.to_le_bytes());
        }
    }

    pub fn write_int(&mut self, name: &str, values: &[i32]) {
        self.buffer_header(name, 4 * values.len());
        for &v in values {
            self.buffer.write_bytes(&v.to_le_bytes());
        }
    }

    pub fn write_float(&mut self, name: &str, values: &[f32]) {
        self.buffer_header(name, 4 * values.len());
        for &v in values {
            self.buffer.write_bytes(&v.to_le_bytes());
        }
    }

    pub fn write_boolean(&mut self, name: &str, values: &[bool]) {
        self.buffer_header(name, values.len());
        for &v in values {
            self.buffer.write_bytes(&[v as u8]);
        }
    }

    /// Times are always encoded as a delta from the operation clock so they
    /// can be re-based when loaded under a different clock. Times of 0 are
    /// never written at all (empty-field rule), so they restore as 0, not as
    /// a relative time.
    pub fn write_time(&mut self, name: &str, values: &[f32]) {
        self.buffer_header(name, 4 * values.len());
        for &v in values {
            let rebased = v - self.data.time;
            self.buffer.write_bytes(&rebased.to_le_bytes());
        }
    }

    pub fn write_vector(&mut self, name: &str, value: &Vec3) {
        self.write_vectors(name, std::slice::from_ref(value));
    }

    pub fn write_vectors(&mut self, name: &str, values: &[Vec3]) {
        self.buffer_header(name, 12 * values.len());
        for v in values {
            for component in v {
                self.buffer.write_bytes(&component.to_le_bytes());
            }
        }
    }

    /// Level coordinates: shifted out of the landmark frame when a landmark
    /// is active, so the restoring level can shift them back into its own.
    pub fn write_position_vectors(&mut self, name: &str, values: &[Vec3]) {
        self.buffer_header(name, 12 * values.len());
        for v in values {
            let shifted = match self.data.landmark_offset {
                Some(landmark) => vector_subtract(v, &landmark),
                None => *v,
            };
            for component in shifted {
                self.buffer.write_bytes(&component.to_le_bytes());
            }
        }
    }

    pub fn write_string(&mut self, name: &str, ids: &[StringId]) {
        let strings = self.strings;
        if self.tokenize {
            self.buffer_header(name, 2 * ids.len());
            for &id in ids {
                let token = token_hash(strings.string(id));
                self.buffer.write_bytes(&token.to_le_bytes());
            }
            return;
        }

        let size: usize = ids.iter().map(|&id| strings.string(id).len() + 1).sum();
        self.buffer_header(name, size);
        for &id in ids {
            self.buffer.write_bytes(strings.string(id).as_bytes());
            self.buffer.write_bytes(&[0]); // terminator
        }
    }

    /// Entity handles go on the wire as stable indices; dead handles become
    /// -1 and resolve to "no entity" on restore.
    pub fn write_entity_array(&mut self, name: &str, handles: &[EntHandle]) {
        let handles = if handles.len() > MAX_ENTITY_ARRAY {
            log::error!(
                "can't save more than {} entities in an array (field `{}`)",
                MAX_ENTITY_ARRAY,
                name
            );
            &handles[..MAX_ENTITY_ARRAY]
        } else {
            handles
        };
        let entities = self.entities;
        let indices: Vec<i32> = handles.iter().map(|&h| entities.entity_index(h)).collect();
        self.write_int(name, &indices);
    }

    /// Function fields are written as registered names. An unregistered
    /// function is a hard error: the schema is corrupt or startup never
    /// registered it, and silently dropping it would corrupt restored
    /// behavior.
    pub fn write_function(&mut self, name: &str, funcs: &[FuncId]) -> Result<(), SaveError> {
        let functions = self.functions;
        let mut size = 0;
        for &func in funcs {
            match functions.function_name(func) {
                Some(fn_name) => size += fn_name.len() + 1,
                None => {
                    log::error!("invalid function pointer in field `{}`", name);
                    return Err(SaveError::UnregisteredFunction {
                        field: name.to_owned(),
                    });
                }
            }
        }
        self.buffer_header(name, size);
        for &func in funcs {
            // Checked above; an unknown id can no longer appear here.
            let fn_name = functions.function_name(func).unwrap_or_default();
            self.buffer.write_bytes(fn_name.as_bytes());
            self.buffer.write_bytes(&[0]);
        }
        Ok(())
    }

    // ============================================================
    // Field-table walk
    // ============================================================

    /// Serialize one object: a count record named after the object, then one
    /// record per retained field. Retained = flagged SAVE and not all-zero.
    pub fn write_fields(
        &mut self,
        name: &str,
        base: &[u8],
        schema: &ObjectSchema,
    ) -> Result<(), SaveError> {
        // Precalculate how many fields will actually be written; empty ones
        // are neither counted nor emitted.
        let retained = schema
            .fields()
            .iter()
            .filter(|field| self.field_retained(field, base))
            .count() as i32;
        self.write_int(name, &[retained]);

        for field in schema.fields() {
            if self.field_retained(field, base) {
                self.write_field(base, field)?;
            }
        }
        Ok(())
    }

    fn field_retained(&self, field: &FieldDescriptor, base: &[u8]) -> bool {
        if !field.flags.contains(FieldFlags::SAVE) {
            return false;
        }
        match field.storage(base) {
            Some(raw) => !data_empty(raw),
            None => false,
        }
    }

    fn write_field(&mut self, base: &[u8], field: &FieldDescriptor) -> Result<(), SaveError> {
        let Some(raw) = field.storage(base) else {
            log::error!("field `{}` lies outside the object's storage block", field.name);
            return Ok(());
        };

        match field.field_type {
            FieldType::Float
            | FieldType::Integer
            | FieldType::Short
            | FieldType::Boolean
            | FieldType::Character
            | FieldType::Vector => {
                // Host-native storage already is the wire form.
                self.write_data(field.name, raw);
            }
            FieldType::Time => {
                let values = read_f32s(raw);
                self.write_time(field.name, &values);
            }
            FieldType::PositionVector => {
                let values = read_vec3s(raw);
                self.write_position_vectors(field.name, &values);
            }
            FieldType::String => {
                let ids = read_i32s(raw);
                self.write_string(field.name, &ids);
            }
            FieldType::Entity | FieldType::ClassPtr | FieldType::Edict | FieldType::EHandle => {
                let handles = read_i32s(raw);
                self.write_entity_array(field.name, &handles);
            }
            FieldType::Function => {
                let funcs = read_i32s(raw);
                self.write_function(field.name, &funcs)?;
            }
        }
        Ok(())
    }
}
