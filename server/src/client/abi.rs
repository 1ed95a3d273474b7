//! Minimal contract ABI support for the static types the flight surety contracts use.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};

pub const ORACLE_REGISTERED_EVENT: &str = "OracleRegistered(address,uint8[3])";
pub const ORACLE_REQUEST_EVENT: &str = "OracleRequest(uint8,address,bytes32,uint256)";

pub const REGISTER_ORACLE: &str = "registerOracle()";
pub const SUBMIT_ORACLE_RESPONSE: &str = "submitOracleResponse(uint8,address,bytes32,uint256,uint8)";
pub const REGISTRATION_FEE: &str = "REGISTRATION_FEE()";
pub const AM_I_AUTHORIZED: &str = "amIAuthorized()";
pub const AUTHORIZE_CONTRACT: &str = "authorizeContract(address)";

const WORD: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Uint(U256),
    Address(Address),
    FixedBytes(B256),
}

impl Token {
    fn word(&self) -> [u8; WORD] {
        match self {
            Token::Uint(value) => value.to_be_bytes::<WORD>(),
            Token::Address(address) => {
                let mut word = [0u8; WORD];
                word[12..].copy_from_slice(address.as_slice());
                word
            }
            Token::FixedBytes(value) => value.0,
        }
    }
}

pub fn event_topic(signature: &str) -> B256 {
    keccak256(signature.as_bytes())
}

pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Head-encodes static tokens, one word each.
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let mut out = Vec::with_capacity(tokens.len() * WORD);
    for token in tokens {
        out.extend_from_slice(&token.word());
    }
    out
}

pub fn encode_call(signature: &str, tokens: &[Token]) -> Bytes {
    let mut out = selector(signature).to_vec();
    out.extend(encode(tokens));
    out.into()
}

/// Reads head words out of ABI encoded return data or event data.
pub struct WordReader<'a> {
    data: &'a [u8],
}

impl<'a> WordReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn word(&self, position: usize) -> Option<&'a [u8]> {
        let start = position.checked_mul(WORD)?;
        self.data.get(start..start + WORD)
    }

    pub fn uint(&self, position: usize) -> Option<U256> {
        self.word(position).map(U256::from_be_slice)
    }

    /// Fails when the value does not fit into a byte.
    pub fn uint8(&self, position: usize) -> Option<u8> {
        let word = self.word(position)?;
        if word[..WORD - 1].iter().any(|b| *b != 0) {
            return None;
        }
        Some(word[WORD - 1])
    }

    pub fn bool(&self, position: usize) -> Option<bool> {
        match self.uint8(position)? {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        }
    }

    pub fn address(&self, position: usize) -> Option<Address> {
        let word = self.word(position)?;
        if word[..12].iter().any(|b| *b != 0) {
            return None;
        }
        Some(Address::from_slice(&word[12..]))
    }

    pub fn fixed_bytes(&self, position: usize) -> Option<B256> {
        self.word(position).map(B256::from_slice)
    }
}
