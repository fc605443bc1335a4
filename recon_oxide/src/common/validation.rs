//! Validation utilities for constructor parameters and deserialization

use crate::common::{ReconError, Result};

/// Maximum block size for any filter (2^28 cells)
pub const MAX_BLOCK_SIZE: u64 = 1 << 28;

/// Maximum serialized sketch size (256MB) to prevent resource exhaustion
pub const MAX_BYTE_SIZE: usize = 256 * 1024 * 1024;

/// Maximum number of hash functions per filter
pub const MAX_HASH_COUNT: u32 = 16;

/// Validate that a hash-function count is usable (1..=16; 3 or 4 in practice)
pub fn validate_hash_count(hash_count: u32) -> Result<()> {
    if hash_count == 0 || hash_count > MAX_HASH_COUNT {
        return Err(ReconError::InvalidParameter {
            param: "hash_count".to_string(),
            value: hash_count.to_string(),
            constraint: format!("must be in range [1, {}]", MAX_HASH_COUNT),
        });
    }
    Ok(())
}

/// Validate a filter block size against its hash-function count
///
/// A filter needs at least `hash_count` cells so the position generator can
/// produce distinct positions.
pub fn validate_block_size(block_size: u64, hash_count: u32) -> Result<()> {
    if block_size == 0 {
        return Err(ReconError::InvalidParameter {
            param: "block_size".to_string(),
            value: block_size.to_string(),
            constraint: "must be greater than 0".to_string(),
        });
    }
    if block_size < u64::from(hash_count) {
        return Err(ReconError::InvalidParameter {
            param: "block_size".to_string(),
            value: block_size.to_string(),
            constraint: format!("must be at least hash_count ({})", hash_count),
        });
    }
    if block_size > MAX_BLOCK_SIZE {
        return Err(ReconError::InvalidParameter {
            param: "block_size".to_string(),
            value: block_size.to_string(),
            constraint: format!("must not exceed {}", MAX_BLOCK_SIZE),
        });
    }
    Ok(())
}

/// Validate that a capacity is positive
pub fn validate_capacity(capacity: u64) -> Result<()> {
    if capacity == 0 {
        return Err(ReconError::InvalidParameter {
            param: "capacity".to_string(),
            value: capacity.to_string(),
            constraint: "must be greater than 0".to_string(),
        });
    }
    Ok(())
}

/// Validate that a deserialized byte size doesn't exceed safety limits
pub fn validate_byte_size(size: usize) -> Result<()> {
    if size > MAX_BYTE_SIZE {
        return Err(ReconError::DeserializationError(format!(
            "Serialized sketch size {} exceeds maximum allowed size {}",
            size, MAX_BYTE_SIZE
        )));
    }
    Ok(())
}

/// Validate minimum available bytes while walking a serialized layout
pub fn validate_min_size(actual: usize, required: usize) -> Result<()> {
    if actual < required {
        return Err(ReconError::DeserializationError(format!(
            "Insufficient data: need at least {} bytes, got {}",
            required, actual
        )));
    }
    Ok(())
}

/// Read a byte from a serialized layout, advancing the cursor
pub(crate) fn read_u8(bytes: &[u8], offset: &mut usize) -> Result<u8> {
    validate_min_size(bytes.len(), *offset + 1)?;
    let v = bytes[*offset];
    *offset += 1;
    Ok(v)
}

/// Read a little-endian u32, advancing the cursor
pub(crate) fn read_u32(bytes: &[u8], offset: &mut usize) -> Result<u32> {
    validate_min_size(bytes.len(), *offset + 4)?;
    let v = u32::from_le_bytes(
        bytes[*offset..*offset + 4]
            .try_into()
            .map_err(|_| ReconError::DeserializationError("Invalid u32 field".to_string()))?,
    );
    *offset += 4;
    Ok(v)
}

/// Read a little-endian u64, advancing the cursor
pub(crate) fn read_u64(bytes: &[u8], offset: &mut usize) -> Result<u64> {
    validate_min_size(bytes.len(), *offset + 8)?;
    let v = u64::from_le_bytes(
        bytes[*offset..*offset + 8]
            .try_into()
            .map_err(|_| ReconError::DeserializationError("Invalid u64 field".to_string()))?,
    );
    *offset += 8;
    Ok(v)
}

/// Read a little-endian i64, advancing the cursor
pub(crate) fn read_i64(bytes: &[u8], offset: &mut usize) -> Result<i64> {
    validate_min_size(bytes.len(), *offset + 8)?;
    let v = i64::from_le_bytes(
        bytes[*offset..*offset + 8]
            .try_into()
            .map_err(|_| ReconError::DeserializationError("Invalid i64 field".to_string()))?,
    );
    *offset += 8;
    Ok(v)
}
