// token.rs — 16-bit field-name token hash
// Converted from: hlsdk-original/game/server/saverestore/CSaveRestoreBuffer.cpp
// (TokenHash). Delegates to the `crc` crate (CRC-16/IBM-3740 == CRC-16/CCITT-FALSE).

use crc::{Crc, CRC_16_IBM_3740};

const TOKEN_CALC: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Hash a field name down to a 16-bit token.
///
/// Save files embed this token in every record header, and the restore path
/// matches records back to field descriptors by comparing tokens. It must
/// therefore be stable across process runs and builds: same name, same token,
/// no seeding. Collisions are not resolved here; schema validation warns when
/// two field names in one schema collide.
pub fn token_hash(name: &str) -> u16 {
    TOKEN_CALC.checksum(name.as_bytes())
}
