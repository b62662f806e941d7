// restore.rs — field-table restore reader, the symmetric half of save.rs
// Converted from: hlsdk-original/game/server/saverestore/CRestore (ReadFields
// / ReadField), which the save-side sources imply.

use bytemuck::pod_read_unaligned;

use hlsdk_common::shared::vector_add;
use hlsdk_common::token::token_hash;

use crate::buffer::SaveBuffer;
use crate::context::{EntityTable, FunctionRegistry, GameStrings, SaveRestoreData};
use crate::error::SaveError;
use crate::save::HEADER_SIZE;
use crate::schema::{FieldDescriptor, FieldFlags, FieldType, ObjectSchema};

/// Walks a record stream produced by `Save` and decodes it back into object
/// storage. Records are matched to descriptors by name token; the scan
/// starts one past the previously matched descriptor, so a stream whose
/// fields arrive in schema order matches each one in a single step.
/// Unmatched records (the schema changed since the save) are skipped by
/// their payload size, which is what makes added, removed and reordered
/// fields tolerable across versions.
pub struct Restore<'a> {
    buffer: &'a mut SaveBuffer,
    data: &'a SaveRestoreData,
    entities: &'a dyn EntityTable,
    functions: &'a dyn FunctionRegistry,
    strings: &'a mut dyn GameStrings,
    tokenize: bool,
    last_field: usize,
}

impl<'a> Restore<'a> {
    pub fn new(
        buffer: &'a mut SaveBuffer,
        data: &'a SaveRestoreData,
        entities: &'a dyn EntityTable,
        functions: &'a dyn FunctionRegistry,
        strings: &'a mut dyn GameStrings,
    ) -> Self {
        Restore {
            buffer,
            data,
            entities,
            functions,
            strings,
            tokenize: false,
            last_field: 0,
        }
    }

    /// Read String fields as 16-bit name tokens. Must match the mode the
    /// stream was written with.
    pub fn with_string_tokens(mut self) -> Self {
        self.tokenize = true;
        self
    }

    fn read_header(&mut self) -> Result<(usize, u16), SaveError> {
        let size = pod_read_unaligned::<u16>(self.buffer.read_bytes(2)?) as usize;
        let token = pod_read_unaligned::<u16>(self.buffer.read_bytes(2)?);
        Ok((size, token))
    }

    // ============================================================
    // Field-table walk
    // ============================================================

    /// Decode one object. Fields absent from the stream are left at their
    /// zero default; that is how the empty-field compaction on the save
    /// side round-trips.
    pub fn read_fields(
        &mut self,
        name: &str,
        base: &mut [u8],
        schema: &ObjectSchema,
    ) -> Result<(), SaveError> {
        let (size, token) = self.read_header()?;
        if token != token_hash(name) {
            // Not this object's block; put the header back so the caller
            // can retry against the right schema.
            self.buffer.rewind(HEADER_SIZE);
            return Err(SaveError::HeaderMismatch {
                expected: name.to_owned(),
            });
        }
        if size != 4 {
            return Err(SaveError::BadCount {
                expected: name.to_owned(),
            });
        }
        let count = pod_read_unaligned::<i32>(self.buffer.read_bytes(4)?);
        if count < 0 {
            return Err(SaveError::BadCount {
                expected: name.to_owned(),
            });
        }

        // Clear out persisted fields first: a field that never shows up in
        // the stream restores to zero, never to stale data.
        for field in schema.fields() {
            if field.flags.contains(FieldFlags::SAVE) {
                if let Some(storage) = field.storage_mut(base) {
                    storage.fill(0);
                }
            }
        }

        self.last_field = 0;
        for _ in 0..count {
            self.read_field(base, schema)?;
        }
        Ok(())
    }

    /// Skip one object's whole record run using only the headers, without
    /// resolving any field names. Used by the save driver to step over
    /// objects it has no schema for.
    pub fn skip_fields(&mut self, name: &str) -> Result<(), SaveError> {
        let (size, token) = self.read_header()?;
        if token != token_hash(name) {
            self.buffer.rewind(HEADER_SIZE);
            return Err(SaveError::HeaderMismatch {
                expected: name.to_owned(),
            });
        }
        if size != 4 {
            return Err(SaveError::BadCount {
                expected: name.to_owned(),
            });
        }
        let count = pod_read_unaligned::<i32>(self.buffer.read_bytes(4)?);
        for _ in 0..count.max(0) {
            let (size, _token) = self.read_header()?;
            self.buffer.skip(size)?;
        }
        Ok(())
    }

    fn read_field(&mut self, base: &mut [u8], schema: &ObjectSchema) -> Result<(), SaveError> {
        let (size, token) = self.read_header()?;

        let field_count = schema.len();
        let mut matched = None;
        for i in 0..field_count {
            let idx = (self.last_field + i) % field_count;
            let field = &schema.fields()[idx];
            if field.token() == token && field.flags.contains(FieldFlags::SAVE) {
                matched = Some(idx);
                break;
            }
        }

        match matched {
            Some(idx) => {
                self.last_field = idx + 1;
                let field = &schema.fields()[idx];
                self.decode_field(base, field, size)
            }
            None => {
                // Schema evolved since this was saved; step over the payload.
                log::debug!(
                    "skipping unmatched field record (token {:#06x}, {} bytes)",
                    token,
                    size
                );
                self.buffer.skip(size)
            }
        }
    }

    // ============================================================
    // Per-type decoders
    // ============================================================

    fn decode_field(
        &mut self,
        base: &mut [u8],
        field: &FieldDescriptor,
        size: usize,
    ) -> Result<(), SaveError> {
        let Some(storage) = field.storage_mut(base) else {
            log::error!("field `{}` lies outside the object's storage block", field.name);
            return self.buffer.skip(size);
        };

        match field.field_type {
            FieldType::Float
            | FieldType::Integer
            | FieldType::Short
            | FieldType::Boolean
            | FieldType::Character
            | FieldType::Vector => {
                if size != storage.len() {
                    log::warn!(
                        "field `{}`: payload is {} bytes, expected {}; leaving default",
                        field.name,
                        size,
                        storage.len()
                    );
                    return self.buffer.skip(size);
                }
                let payload = self.buffer.read_bytes(size)?;
                storage.copy_from_slice(payload);
            }
            FieldType::Time => {
                if size != storage.len() {
                    log::warn!(
                        "field `{}`: payload is {} bytes, expected {}; leaving default",
                        field.name,
                        size,
                        storage.len()
                    );
                    return self.buffer.skip(size);
                }
                // Deltas on the wire; re-base onto this operation's clock.
                let time = self.data.time;
                for i in 0..field.count {
                    let v = pod_read_unaligned::<f32>(self.buffer.read_bytes(4)?) + time;
                    storage[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
                }
            }
            FieldType::PositionVector => {
                if size != storage.len() {
                    log::warn!(
                        "field `{}`: payload is {} bytes, expected {}; leaving default",
                        field.name,
                        size,
                        storage.len()
                    );
                    return self.buffer.skip(size);
                }
                let landmark = self.data.landmark_offset;
                for i in 0..field.count {
                    let chunk = self.buffer.read_bytes(12)?;
                    let v = [
                        pod_read_unaligned::<f32>(&chunk[0..4]),
                        pod_read_unaligned::<f32>(&chunk[4..8]),
                        pod_read_unaligned::<f32>(&chunk[8..12]),
                    ];
                    let v = match landmark {
                        Some(offset) => vector_add(&v, &offset),
                        None => v,
                    };
                    for (j, component) in v.iter().enumerate() {
                        storage[i * 12 + j * 4..i * 12 + j * 4 + 4]
                            .copy_from_slice(&component.to_le_bytes());
                    }
                }
            }
            FieldType::String => {
                if self.tokenize {
                    self.decode_string_tokens(storage, field, size)?;
                } else {
                    self.decode_strings(storage, field, size)?;
                }
            }
            FieldType::Entity | FieldType::ClassPtr | FieldType::Edict | FieldType::EHandle => {
                if size != storage.len() {
                    log::warn!(
                        "field `{}`: payload is {} bytes, expected {}; leaving default",
                        field.name,
                        size,
                        storage.len()
                    );
                    return self.buffer.skip(size);
                }
                let entities = self.entities;
                for i in 0..field.count {
                    let index = pod_read_unaligned::<i32>(self.buffer.read_bytes(4)?);
                    let handle = if index < 0 { 0 } else { entities.entity_from_index(index) };
                    if index >= 0 && handle == 0 {
                        log::info!(
                            "field `{}`: entity {} no longer exists, restoring as none",
                            field.name,
                            index
                        );
                    }
                    storage[i * 4..i * 4 + 4].copy_from_slice(&handle.to_le_bytes());
                }
            }
            FieldType::Function => {
                let payload = self.buffer.read_bytes(size)?.to_vec();
                let functions = self.functions;
                let mut rest: &[u8] = &payload;
                for i in 0..field.count {
                    let Some(nul) = rest.iter().position(|&b| b == 0) else {
                        log::warn!("field `{}`: truncated function name list", field.name);
                        break;
                    };
                    let fn_name = String::from_utf8_lossy(&rest[..nul]);
                    rest = &rest[nul + 1..];
                    let func = if fn_name.is_empty() {
                        0
                    } else {
                        match functions.function_from_name(&fn_name) {
                            Some(func) => func,
                            None => {
                                log::error!(
                                    "field `{}`: function `{}` is not registered, restoring as none",
                                    field.name,
                                    fn_name
                                );
                                0
                            }
                        }
                    };
                    storage[i * 4..i * 4 + 4].copy_from_slice(&func.to_le_bytes());
                }
            }
        }
        Ok(())
    }

    fn decode_strings(
        &mut self,
        storage: &mut [u8],
        field: &FieldDescriptor,
        size: usize,
    ) -> Result<(), SaveError> {
        let payload = self.buffer.read_bytes(size)?.to_vec();
        let mut rest: &[u8] = &payload;
        for i in 0..field.count {
            let Some(nul) = rest.iter().position(|&b| b == 0) else {
                log::warn!("field `{}`: truncated string list", field.name);
                break;
            };
            let s = String::from_utf8_lossy(&rest[..nul]);
            rest = &rest[nul + 1..];
            let id = if s.is_empty() { 0 } else { self.strings.alloc_string(&s) };
            storage[i * 4..i * 4 + 4].copy_from_slice(&id.to_le_bytes());
        }
        Ok(())
    }

    fn decode_string_tokens(
        &mut self,
        storage: &mut [u8],
        field: &FieldDescriptor,
        size: usize,
    ) -> Result<(), SaveError> {
        if size != 2 * field.count {
            log::warn!(
                "field `{}`: tokenized payload is {} bytes, expected {}; leaving default",
                field.name,
                size,
                2 * field.count
            );
            return self.buffer.skip(size);
        }
        for i in 0..field.count {
            let token = pod_read_unaligned::<u16>(self.buffer.read_bytes(2)?);
            let id = match self.strings.string_from_token(token) {
                Some(id) => id,
                None => {
                    log::warn!(
                        "field `{}`: no pooled string for token {:#06x}, restoring as none",
                        field.name,
                        token
                    );
                    0
                }
            };
            storage[i * 4..i * 4 + 4].copy_from_slice(&id.to_le_bytes());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EntHandle;
    use crate::save::Save;
    use crate::tables::{FunctionTable, StringTable};
    use bytemuck::{Pod, Zeroable};
    use std::mem::offset_of;

    // ============================================================
    // Fixtures
    // ============================================================

    /// Flat persistent state for a test monster; no padding so the whole
    /// struct can be viewed as bytes.
    #[repr(C)]
    #[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
    struct MonsterState {
        health: i32,
        speed: f32,
        attack_finished: f32, // Time
        origin: [f32; 3],     // PositionVector
        velocity: [f32; 3],   // Vector
        enemy: i32,           // EHandle
        netname: i32,         // String id
        think: i32,           // Function id
        ammo: [i32; 4],
        script: [u8; 8], // Character array
    }

    fn monster_schema() -> ObjectSchema {
        ObjectSchema::new(vec![
            FieldDescriptor::new("health", FieldType::Integer, offset_of!(MonsterState, health), 1),
            FieldDescriptor::new("speed", FieldType::Float, offset_of!(MonsterState, speed), 1),
            FieldDescriptor::new(
                "attack_finished",
                FieldType::Time,
                offset_of!(MonsterState, attack_finished),
                1,
            ),
            FieldDescriptor::new(
                "origin",
                FieldType::PositionVector,
                offset_of!(MonsterState, origin),
                1,
            ),
            FieldDescriptor::new("velocity", FieldType::Vector, offset_of!(MonsterState, velocity), 1),
            FieldDescriptor::new("enemy", FieldType::EHandle, offset_of!(MonsterState, enemy), 1),
            FieldDescriptor::new("netname", FieldType::String, offset_of!(MonsterState, netname), 1),
            FieldDescriptor::new("think", FieldType::Function, offset_of!(MonsterState, think), 1),
            FieldDescriptor::new("ammo", FieldType::Integer, offset_of!(MonsterState, ammo), 4),
            FieldDescriptor::new("script", FieldType::Character, offset_of!(MonsterState, script), 8),
        ])
    }

    /// Entity table where a handle is live iff it appears in `live`; its
    /// saved index is its position in the vec.
    struct EntityList {
        live: Vec<EntHandle>,
    }

    impl EntityTable for EntityList {
        fn entity_index(&self, ent: EntHandle) -> i32 {
            if ent == 0 {
                return -1;
            }
            self.live
                .iter()
                .position(|&h| h == ent)
                .map(|i| i as i32)
                .unwrap_or(-1)
        }

        fn entity_from_index(&self, index: i32) -> EntHandle {
            usize::try_from(index)
                .ok()
                .and_then(|i| self.live.get(i))
                .copied()
                .unwrap_or(0)
        }
    }

    fn save_monster(
        monster: &MonsterState,
        data: &SaveRestoreData,
        entities: &EntityList,
        functions: &FunctionTable,
        strings: &StringTable,
    ) -> Vec<u8> {
        let mut buffer = SaveBuffer::new(1024);
        let mut save = Save::new(&mut buffer, data, entities, functions, strings);
        save.write_fields("monster", bytemuck::bytes_of(monster), &monster_schema())
            .unwrap();
        buffer.finish().unwrap()
    }

    // ============================================================
    // Round-trip
    // ============================================================

    #[test]
    fn test_round_trip_all_field_types() {
        let mut strings = StringTable::new();
        let netname = strings.alloc_string("barney");
        let mut functions = FunctionTable::new();
        let think = functions.register("CMonster::Think");
        let entities = EntityList { live: vec![30] };

        let monster = MonsterState {
            health: 42,
            speed: 220.5,
            attack_finished: 105.0,
            origin: [10.0, 10.0, 10.0],
            velocity: [1.0, -2.0, 3.5],
            enemy: 30,
            netname,
            think,
            ammo: [1, 0, 2, 9],
            script: *b"patrol\0\0",
        };

        let save_data = SaveRestoreData::with_landmark(100.0, [5.0, 0.0, 0.0]);
        let blob = save_monster(&monster, &save_data, &entities, &functions, &strings);

        // Restore under a different clock, the same landmark, and a fresh
        // string pool (names get re-interned from the stream).
        let restore_data = SaveRestoreData::with_landmark(200.0, [5.0, 0.0, 0.0]);
        let mut restored_strings = StringTable::new();
        let mut buffer = SaveBuffer::from_vec(blob);
        let mut restore = Restore::new(
            &mut buffer,
            &restore_data,
            &entities,
            &functions,
            &mut restored_strings,
        );

        let mut out = MonsterState::zeroed();
        restore
            .read_fields("monster", bytemuck::bytes_of_mut(&mut out), &monster_schema())
            .unwrap();

        assert_eq!(out.health, 42);
        assert_eq!(out.speed, 220.5);
        assert_eq!(out.attack_finished, 205.0); // 105 - 100 + 200
        assert_eq!(out.origin, [10.0, 10.0, 10.0]); // landmark shift reversed
        assert_eq!(out.velocity, [1.0, -2.0, 3.5]);
        assert_eq!(out.enemy, 30);
        assert_eq!(restored_strings.string(out.netname), "barney");
        assert_eq!(out.think, think);
        assert_eq!(out.ammo, [1, 0, 2, 9]);
        assert_eq!(out.script, *b"patrol\0\0");
    }

    #[test]
    fn test_landmark_mismatch_leaves_shifted_coordinates() {
        let strings = StringTable::new();
        let functions = FunctionTable::new();
        let entities = EntityList { live: vec![] };

        let monster = MonsterState {
            origin: [10.0, 10.0, 10.0],
            ..MonsterState::zeroed()
        };
        let save_data = SaveRestoreData::with_landmark(0.0, [5.0, 0.0, 0.0]);
        let blob = save_monster(&monster, &save_data, &entities, &functions, &strings);

        // No landmark on restore: the payload comes through un-shifted.
        let restore_data = SaveRestoreData::new(0.0);
        let mut restored_strings = StringTable::new();
        let mut buffer = SaveBuffer::from_vec(blob);
        let mut restore = Restore::new(
            &mut buffer,
            &restore_data,
            &entities,
            &functions,
            &mut restored_strings,
        );
        let mut out = MonsterState::zeroed();
        restore
            .read_fields("monster", bytemuck::bytes_of_mut(&mut out), &monster_schema())
            .unwrap();

        assert_eq!(out.origin, [5.0, 10.0, 10.0]);
    }

    #[test]
    fn test_absent_fields_restore_to_zero() {
        let strings = StringTable::new();
        let functions = FunctionTable::new();
        let entities = EntityList { live: vec![] };

        // Only health is non-empty; everything else is dropped on save.
        let monster = MonsterState {
            health: 7,
            ..MonsterState::zeroed()
        };
        let data = SaveRestoreData::new(0.0);
        let blob = save_monster(&monster, &data, &entities, &functions, &strings);

        // Restore over a dirtied target; skipped fields must come back zero,
        // not stale.
        let mut out = MonsterState {
            health: 999,
            speed: 1.0,
            ammo: [5, 5, 5, 5],
            script: *b"garbage\0",
            ..MonsterState::zeroed()
        };
        let mut restored_strings = StringTable::new();
        let mut buffer = SaveBuffer::from_vec(blob);
        let mut restore = Restore::new(
            &mut buffer,
            &data,
            &entities,
            &functions,
            &mut restored_strings,
        );
        restore
            .read_fields("monster", bytemuck::bytes_of_mut(&mut out), &monster_schema())
            .unwrap();

        assert_eq!(out.health, 7);
        assert_eq!(out.speed, 0.0);
        assert_eq!(out.ammo, [0; 4]);
        assert_eq!(out.script, [0; 8]);
    }

    // ============================================================
    // Schema evolution
    // ============================================================

    #[test]
    fn test_unmatched_fields_skipped() {
        // Writer schema: fields a, b, c.
        let base: Vec<u8> = [1i32, 2, 3].iter().flat_map(|v| v.to_le_bytes()).collect();
        let writer_schema = ObjectSchema::new(vec![
            FieldDescriptor::new("a", FieldType::Integer, 0, 1),
            FieldDescriptor::new("b", FieldType::Integer, 4, 1),
            FieldDescriptor::new("c", FieldType::Integer, 8, 1),
        ]);

        let strings = StringTable::new();
        let functions = FunctionTable::new();
        let entities = EntityList { live: vec![] };
        let data = SaveRestoreData::new(0.0);

        let mut buffer = SaveBuffer::new(256);
        let mut save = Save::new(&mut buffer, &data, &entities, &functions, &strings);
        save.write_fields("thing", &base, &writer_schema).unwrap();
        let blob = buffer.finish().unwrap();

        // Reader schema dropped b; its record must be stepped over.
        let reader_schema = ObjectSchema::new(vec![
            FieldDescriptor::new("a", FieldType::Integer, 0, 1),
            FieldDescriptor::new("c", FieldType::Integer, 4, 1),
        ]);
        let mut out = [0u8; 8];
        let mut restored_strings = StringTable::new();
        let mut buffer = SaveBuffer::from_vec(blob);
        let mut restore = Restore::new(
            &mut buffer,
            &data,
            &entities,
            &functions,
            &mut restored_strings,
        );
        restore.read_fields("thing", &mut out, &reader_schema).unwrap();

        assert_eq!(i32::from_le_bytes(out[0..4].try_into().unwrap()), 1);
        assert_eq!(i32::from_le_bytes(out[4..8].try_into().unwrap()), 3);
    }

    #[test]
    fn test_reordered_schema_still_matches() {
        let base: Vec<u8> = [1i32, 2].iter().flat_map(|v| v.to_le_bytes()).collect();
        let writer_schema = ObjectSchema::new(vec![
            FieldDescriptor::new("a", FieldType::Integer, 0, 1),
            FieldDescriptor::new("b", FieldType::Integer, 4, 1),
        ]);

        let strings = StringTable::new();
        let functions = FunctionTable::new();
        let entities = EntityList { live: vec![] };
        let data = SaveRestoreData::new(0.0);

        let mut buffer = SaveBuffer::new(256);
        let mut save = Save::new(&mut buffer, &data, &entities, &functions, &strings);
        save.write_fields("thing", &base, &writer_schema).unwrap();
        let blob = buffer.finish().unwrap();

        // Matching is by token, so swapping descriptor order is harmless.
        let reader_schema = ObjectSchema::new(vec![
            FieldDescriptor::new("b", FieldType::Integer, 4, 1),
            FieldDescriptor::new("a", FieldType::Integer, 0, 1),
        ]);
        let mut out = [0u8; 8];
        let mut restored_strings = StringTable::new();
        let mut buffer = SaveBuffer::from_vec(blob);
        let mut restore = Restore::new(
            &mut buffer,
            &data,
            &entities,
            &functions,
            &mut restored_strings,
        );
        restore.read_fields("thing", &mut out, &reader_schema).unwrap();

        assert_eq!(i32::from_le_bytes(out[0..4].try_into().unwrap()), 1);
        assert_eq!(i32::from_le_bytes(out[4..8].try_into().unwrap()), 2);
    }

    // ============================================================
    // References
    // ============================================================

    #[test]
    fn test_missing_entity_restores_as_none() {
        let strings = StringTable::new();
        let functions = FunctionTable::new();
        let save_entities = EntityList { live: vec![30] };

        let monster = MonsterState {
            enemy: 30,
            ..MonsterState::zeroed()
        };
        let data = SaveRestoreData::new(0.0);
        let blob = save_monster(&monster, &data, &save_entities, &functions, &strings);

        // The enemy died between save and load.
        let restore_entities = EntityList { live: vec![] };
        let mut out = MonsterState::zeroed();
        let mut restored_strings = StringTable::new();
        let mut buffer = SaveBuffer::from_vec(blob);
        let mut restore = Restore::new(
            &mut buffer,
            &data,
            &restore_entities,
            &functions,
            &mut restored_strings,
        );
        restore
            .read_fields("monster", bytemuck::bytes_of_mut(&mut out), &monster_schema())
            .unwrap();

        assert_eq!(out.enemy, 0);
    }

    #[test]
    fn test_unknown_function_restores_as_none() {
        let strings = StringTable::new();
        let mut save_functions = FunctionTable::new();
        let think = save_functions.register("CMonster::Think");
        let entities = EntityList { live: vec![] };

        let monster = MonsterState {
            think,
            ..MonsterState::zeroed()
        };
        let data = SaveRestoreData::new(0.0);
        let blob = save_monster(&monster, &data, &entities, &save_functions, &strings);

        // A build without that function registered: tolerated on restore.
        let restore_functions = FunctionTable::new();
        let mut out = MonsterState::zeroed();
        let mut restored_strings = StringTable::new();
        let mut buffer = SaveBuffer::from_vec(blob);
        let mut restore = Restore::new(
            &mut buffer,
            &data,
            &entities,
            &restore_functions,
            &mut restored_strings,
        );
        restore
            .read_fields("monster", bytemuck::bytes_of_mut(&mut out), &monster_schema())
            .unwrap();

        assert_eq!(out.think, 0);
    }

    #[test]
    fn test_tokenized_strings_round_trip() {
        let mut strings = StringTable::new();
        let netname = strings.alloc_string("barney");
        let functions = FunctionTable::new();
        let entities = EntityList { live: vec![] };
        let data = SaveRestoreData::new(0.0);

        let monster = MonsterState {
            netname,
            ..MonsterState::zeroed()
        };
        let mut buffer = SaveBuffer::new(256);
        let mut save =
            Save::new(&mut buffer, &data, &entities, &functions, &strings).with_string_tokens();
        save.write_fields("monster", bytemuck::bytes_of(&monster), &monster_schema())
            .unwrap();
        let blob = buffer.finish().unwrap();

        // Token mode can only resolve strings the pool already knows.
        let mut pool = StringTable::new();
        let expected = pool.alloc_string("barney");
        let mut out = MonsterState::zeroed();
        let mut buffer = SaveBuffer::from_vec(blob);
        let mut restore =
            Restore::new(&mut buffer, &data, &entities, &functions, &mut pool).with_string_tokens();
        restore
            .read_fields("monster", bytemuck::bytes_of_mut(&mut out), &monster_schema())
            .unwrap();

        assert_eq!(out.netname, expected);
    }

    // ============================================================
    // Stream-level behavior
    // ============================================================

    #[test]
    fn test_header_mismatch_rewinds_for_retry() {
        let strings = StringTable::new();
        let functions = FunctionTable::new();
        let entities = EntityList { live: vec![] };
        let data = SaveRestoreData::new(0.0);

        let monster = MonsterState {
            health: 5,
            ..MonsterState::zeroed()
        };
        let blob = save_monster(&monster, &data, &entities, &functions, &strings);

        let mut restored_strings = StringTable::new();
        let mut buffer = SaveBuffer::from_vec(blob);
        let mut restore = Restore::new(
            &mut buffer,
            &data,
            &entities,
            &functions,
            &mut restored_strings,
        );

        let mut out = MonsterState::zeroed();
        let err = restore
            .read_fields("weapon", bytemuck::bytes_of_mut(&mut out), &monster_schema())
            .unwrap_err();
        assert_eq!(
            err,
            SaveError::HeaderMismatch {
                expected: "weapon".to_owned()
            }
        );

        // The header was rewound; the right name succeeds.
        restore
            .read_fields("monster", bytemuck::bytes_of_mut(&mut out), &monster_schema())
            .unwrap();
        assert_eq!(out.health, 5);
    }

    #[test]
    fn test_skip_fields_steps_over_whole_object() {
        let strings = StringTable::new();
        let functions = FunctionTable::new();
        let entities = EntityList { live: vec![] };
        let data = SaveRestoreData::new(0.0);

        let first = MonsterState {
            health: 1,
            ammo: [4, 4, 4, 4],
            ..MonsterState::zeroed()
        };
        let second = MonsterState {
            health: 2,
            ..MonsterState::zeroed()
        };

        let mut buffer = SaveBuffer::new(1024);
        let mut save = Save::new(&mut buffer, &data, &entities, &functions, &strings);
        save.write_fields("monster", bytemuck::bytes_of(&first), &monster_schema())
            .unwrap();
        save.write_fields("monster", bytemuck::bytes_of(&second), &monster_schema())
            .unwrap();
        let blob = buffer.finish().unwrap();

        let mut restored_strings = StringTable::new();
        let mut buffer = SaveBuffer::from_vec(blob);
        let mut restore = Restore::new(
            &mut buffer,
            &data,
            &entities,
            &functions,
            &mut restored_strings,
        );

        restore.skip_fields("monster").unwrap();
        let mut out = MonsterState::zeroed();
        restore
            .read_fields("monster", bytemuck::bytes_of_mut(&mut out), &monster_schema())
            .unwrap();
        assert_eq!(out.health, 2);
    }

    #[test]
    fn test_truncated_stream_is_underflow() {
        let strings = StringTable::new();
        let functions = FunctionTable::new();
        let entities = EntityList { live: vec![] };
        let data = SaveRestoreData::new(0.0);

        let monster = MonsterState {
            health: 5,
            speed: 1.0,
            ..MonsterState::zeroed()
        };
        let mut blob = save_monster(&monster, &data, &entities, &functions, &strings);
        blob.truncate(blob.len() - 2);

        let mut restored_strings = StringTable::new();
        let mut buffer = SaveBuffer::from_vec(blob);
        let mut restore = Restore::new(
            &mut buffer,
            &data,
            &entities,
            &functions,
            &mut restored_strings,
        );
        let mut out = MonsterState::zeroed();
        let err = restore
            .read_fields("monster", bytemuck::bytes_of_mut(&mut out), &monster_schema())
            .unwrap_err();
        assert_eq!(err, SaveError::Underflow);
    }
}
