//! Coinbase payload layout.
//!
//! All integers little endian:
//!
//! | field               | size            |
//! |---------------------|-----------------|
//! | blue score          | 8               |
//! | subsidy             | 8               |
//! | script version      | 2               |
//! | script length       | 1               |
//! | script              | script length   |
//! | extra data          | remainder       |

use serde::{Deserialize, Serialize};

use crate::errors::CoinbaseError;
use crate::tx::ScriptPublicKey;

const UINT64_LEN: usize = 8;
const UINT16_LEN: usize = 2;
const LENGTH_OF_SUBSIDY: usize = UINT64_LEN;
const LENGTH_OF_SCRIPT_PUB_KEY_LENGTH: usize = 1;
const LENGTH_OF_VERSION_SCRIPT_PUB_KEY: usize = UINT16_LEN;

/// Shortest well-formed payload: every fixed-size field and an empty script
pub const MIN_PAYLOAD_LENGTH: usize = UINT64_LEN
    + LENGTH_OF_SUBSIDY
    + LENGTH_OF_VERSION_SCRIPT_PUB_KEY
    + LENGTH_OF_SCRIPT_PUB_KEY_LENGTH;

/// The miner-supplied part of a coinbase: where to pay this block's reward, plus free-form data
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinbaseData {
    pub script_public_key: ScriptPublicKey,
    pub extra_data: Vec<u8>,
}

impl CoinbaseData {
    pub fn new(script_public_key: ScriptPublicKey, extra_data: Vec<u8>) -> Self {
        Self { script_public_key, extra_data }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoinbasePayload {
    pub blue_score: u64,
    pub subsidy: u64,
    pub coinbase_data: CoinbaseData,
}

/// Serializes a coinbase payload. `max_script_len` is the network's script public key length limit.
pub fn serialize_coinbase_payload(
    blue_score: u64,
    subsidy: u64,
    coinbase_data: &CoinbaseData,
    max_script_len: u8,
) -> Result<Vec<u8>, CoinbaseError> {
    let script = coinbase_data.script_public_key.script();
    if script.len() > max_script_len as usize {
        return Err(CoinbaseError::PayloadScriptPublicKeyLenAboveMax(script.len(), max_script_len));
    }
    Ok(encode_payload(blue_score, subsidy, coinbase_data))
}

/// Writes the payload without checking the script length limit.
/// Callers ensure the script fits in a `u8` length.
pub(crate) fn encode_payload(blue_score: u64, subsidy: u64, data: &CoinbaseData) -> Vec<u8> {
    let script = data.script_public_key.script();
    let capacity = MIN_PAYLOAD_LENGTH + script.len() + data.extra_data.len();
    let mut payload = Vec::with_capacity(capacity);
    payload.extend(blue_score.to_le_bytes());
    payload.extend(subsidy.to_le_bytes());
    payload.extend(data.script_public_key.version().to_le_bytes());
    payload.push(script.len() as u8);
    payload.extend_from_slice(script);
    payload.extend_from_slice(&data.extra_data);
    payload
}

pub fn deserialize_coinbase_payload(
    payload: &[u8],
    max_script_len: u8,
) -> Result<CoinbasePayload, CoinbaseError> {
    if payload.len() < MIN_PAYLOAD_LENGTH {
        return Err(CoinbaseError::PayloadLenBelowMin(payload.len(), MIN_PAYLOAD_LENGTH));
    }
    let (blue_score, rest) = payload.split_at(UINT64_LEN);
    let (subsidy, rest) = rest.split_at(LENGTH_OF_SUBSIDY);
    let (version, rest) = rest.split_at(LENGTH_OF_VERSION_SCRIPT_PUB_KEY);
    let script_len = rest[0];
    let rest = &rest[LENGTH_OF_SCRIPT_PUB_KEY_LENGTH..];

    let script_len = script_len as usize;
    if script_len > max_script_len as usize {
        return Err(CoinbaseError::PayloadScriptPublicKeyLenAboveMax(script_len, max_script_len));
    }
    if rest.len() < script_len {
        let needed = MIN_PAYLOAD_LENGTH + script_len;
        return Err(CoinbaseError::PayloadCantContainScriptPublicKey(payload.len(), needed));
    }
    let (script, extra_data) = rest.split_at(script_len);

    Ok(CoinbasePayload {
        blue_score: u64::from_le_bytes(to_array(blue_score)),
        subsidy: u64::from_le_bytes(to_array(subsidy)),
        coinbase_data: CoinbaseData {
            script_public_key: ScriptPublicKey::from_slice(
                u16::from_le_bytes(to_array(version)),
                script,
            ),
            extra_data: extra_data.to_vec(),
        },
    })
}

fn to_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    out
}
