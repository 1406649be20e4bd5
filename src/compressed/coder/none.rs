//! NONE coder: pass-through. Backing length equals logical length.

use crate::error::{HdfError, Result};

pub fn encode(plain: &[u8]) -> Vec<u8> {
    plain.to_vec()
}

pub fn decode(backing: &[u8], logical_len: usize) -> Result<Vec<u8>> {
    if backing.len() < logical_len {
        return Err(HdfError::Range("NONE payload shorter than logical length".into()));
    }
    Ok(backing[..logical_len].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_identity() {
        let data = b"arbitrary bytes".to_vec();
        let encoded = encode(&data);
        assert_eq!(encoded, data);
        assert_eq!(decode(&encoded, data.len()).unwrap(), data);
    }
}
