//! Directory and entry credit block structures

use crate::{sha256, BlockHeight, CoreError, CoreResult, Hash, Timestamp};
use serde::{Deserialize, Serialize};

/// Chain id of the admin block chain
pub const ADMIN_CHAIN_ID: Hash = well_known_chain(0x0a);
/// Chain id of the entry credit block chain
pub const ENTRY_CREDIT_CHAIN_ID: Hash = well_known_chain(0x0c);
/// Chain id of the factoid block chain
pub const FACTOID_CHAIN_ID: Hash = well_known_chain(0x0f);

const fn well_known_chain(last: u8) -> Hash {
    let mut bytes = [0u8; 32];
    bytes[31] = last;
    Hash::new(bytes)
}

fn bincode_config() -> bincode::config::Configuration {
    bincode::config::standard()
}

/// Directory block header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirBlockHeader {
    /// Network the block belongs to
    pub network_id: u32,
    /// Key Merkle root of the previous directory block
    pub prev_key_mr: Hash,
    /// Block timestamp
    pub timestamp: Timestamp,
    /// Height in the directory chain
    pub height: BlockHeight,
}

/// One chain referenced by a directory block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirBlockEntry {
    pub chain_id: Hash,
    /// Key Merkle root of the referenced sub-block
    pub key_mr: Hash,
}

impl DirBlockEntry {
    pub fn new(chain_id: Hash, key_mr: Hash) -> Self {
        Self { chain_id, key_mr }
    }
}

/// Top-level block whose entries reference every other block of its period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryBlock {
    pub header: DirBlockHeader,
    pub entries: Vec<DirBlockEntry>,
}

impl DirectoryBlock {
    pub fn new(header: DirBlockHeader, entries: Vec<DirBlockEntry>) -> Self {
        Self { header, entries }
    }

    pub fn genesis(network_id: u32) -> Self {
        Self {
            header: DirBlockHeader {
                network_id,
                prev_key_mr: Hash::zero(),
                timestamp: 0,
                height: 0,
            },
            entries: Vec::new(),
        }
    }

    pub fn height(&self) -> BlockHeight {
        self.header.height
    }

    pub fn marshal_binary(&self) -> CoreResult<Vec<u8>> {
        Ok(bincode::serde::encode_to_vec(self, bincode_config())?)
    }

    pub fn unmarshal_binary(data: &[u8]) -> CoreResult<Self> {
        let (block, read): (Self, usize) =
            bincode::serde::decode_from_slice(data, bincode_config())?;
        if read != data.len() {
            return Err(CoreError::Deserialization(format!(
                "{} trailing bytes after directory block",
                data.len() - read
            )));
        }
        Ok(block)
    }

    /// SHA-256 of the marshaled block
    pub fn hash(&self) -> CoreResult<Hash> {
        Ok(sha256(&self.marshal_binary()?))
    }
}

/// ECID of [`ServerIndexNumber`] entries
pub const ECID_SERVER_INDEX_NUMBER: u8 = 0x00;
/// ECID of minute marker entries
pub const ECID_MINUTE_NUMBER: u8 = 0x01;

/// Marks which server produced the entries that follow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerIndexNumber {
    pub number: u8,
}

impl ServerIndexNumber {
    /// Marshaled size in bytes
    pub const SIZE: usize = 1;

    pub fn new(number: u8) -> Self {
        Self { number }
    }

    pub fn marshal_binary(&self) -> Vec<u8> {
        vec![self.number]
    }

    /// Decode from the front of `data`, returning the remaining bytes
    pub fn unmarshal_binary_data(data: &[u8]) -> CoreResult<(Self, &[u8])> {
        match data.split_first() {
            Some((&number, rest)) => Ok((Self { number }, rest)),
            None => Err(CoreError::Deserialization(
                "server index number needs 1 byte".to_string(),
            )),
        }
    }

    pub fn hash(&self) -> Hash {
        sha256(&self.marshal_binary())
    }

    pub fn interpret(&self) -> String {
        format!("ServerIndexNumber {}", self.number)
    }
}

/// Entry of an entry credit block, tagged on the wire by its ECID byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EcEntry {
    ServerIndexNumber(ServerIndexNumber),
    MinuteNumber(u8),
}

impl EcEntry {
    pub fn ecid(&self) -> u8 {
        match self {
            EcEntry::ServerIndexNumber(_) => ECID_SERVER_INDEX_NUMBER,
            EcEntry::MinuteNumber(_) => ECID_MINUTE_NUMBER,
        }
    }

    fn marshal_into(&self, out: &mut Vec<u8>) {
        out.push(self.ecid());
        match self {
            EcEntry::ServerIndexNumber(sin) => out.extend(sin.marshal_binary()),
            EcEntry::MinuteNumber(minute) => out.push(*minute),
        }
    }

    fn unmarshal_from(data: &[u8]) -> CoreResult<(Self, &[u8])> {
        let (&ecid, rest) = data
            .split_first()
            .ok_or_else(|| CoreError::Deserialization("missing ECID".to_string()))?;
        match ecid {
            ECID_SERVER_INDEX_NUMBER => {
                let (sin, rest) = ServerIndexNumber::unmarshal_binary_data(rest)?;
                Ok((EcEntry::ServerIndexNumber(sin), rest))
            }
            ECID_MINUTE_NUMBER => match rest.split_first() {
                Some((&minute, rest)) => Ok((EcEntry::MinuteNumber(minute), rest)),
                None => Err(CoreError::Deserialization(
                    "minute number needs 1 byte".to_string(),
                )),
            },
            other => Err(CoreError::UnknownEcId(other)),
        }
    }
}

/// Entry credit block header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcBlockHeader {
    pub prev_hash: Hash,
    pub height: BlockHeight,
}

/// Entry credit block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryCreditBlock {
    pub header: EcBlockHeader,
    pub entries: Vec<EcEntry>,
}

impl EntryCreditBlock {
    pub fn new(header: EcBlockHeader, entries: Vec<EcEntry>) -> Self {
        Self { header, entries }
    }

    /// Header as bincode, followed by each entry as `ECID || payload`
    pub fn marshal_binary(&self) -> CoreResult<Vec<u8>> {
        let mut out = bincode::serde::encode_to_vec(&self.header, bincode_config())?;
        for entry in &self.entries {
            entry.marshal_into(&mut out);
        }
        Ok(out)
    }

    pub fn unmarshal_binary(data: &[u8]) -> CoreResult<Self> {
        let (header, read): (EcBlockHeader, usize) =
            bincode::serde::decode_from_slice(data, bincode_config())?;
        let mut rest = &data[read..];
        let mut entries = Vec::new();
        while !rest.is_empty() {
            let (entry, next) = EcEntry::unmarshal_from(rest)?;
            entries.push(entry);
            rest = next;
        }
        Ok(Self { header, entries })
    }

    pub fn hash(&self) -> CoreResult<Hash> {
        Ok(sha256(&self.marshal_binary()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dir_block() -> DirectoryBlock {
        DirectoryBlock::new(
            DirBlockHeader {
                network_id: 0xfa92e5a2,
                prev_key_mr: Hash::new([9u8; 32]),
                timestamp: 1_440_000_000,
                height: 12,
            },
            vec![
                DirBlockEntry::new(ENTRY_CREDIT_CHAIN_ID, Hash::new([1u8; 32])),
                DirBlockEntry::new(FACTOID_CHAIN_ID, Hash::new([2u8; 32])),
            ],
        )
    }

    #[test]
    fn test_well_known_chain_ids() {
        assert_eq!(
            ENTRY_CREDIT_CHAIN_ID.to_hex(),
            "000000000000000000000000000000000000000000000000000000000000000c"
        );
        assert_ne!(ADMIN_CHAIN_ID, FACTOID_CHAIN_ID);
    }

    #[test]
    fn test_dir_block_hash_is_deterministic() {
        let block = sample_dir_block();
        let bytes = block.marshal_binary().unwrap();
        assert_eq!(block.hash().unwrap(), sha256(&bytes));
        assert_eq!(block.hash().unwrap(), block.clone().hash().unwrap());

        let mut other = block.clone();
        other.header.height = 13;
        assert_ne!(block.hash().unwrap(), other.hash().unwrap());
    }

    #[test]
    fn test_dir_block_unmarshal() {
        let block = sample_dir_block();
        let bytes = block.marshal_binary().unwrap();
        assert_eq!(DirectoryBlock::unmarshal_binary(&bytes).unwrap(), block);

        let mut padded = bytes.clone();
        padded.push(0);
        assert!(DirectoryBlock::unmarshal_binary(&padded).is_err());
        assert!(DirectoryBlock::unmarshal_binary(&bytes[..bytes.len() / 2]).is_err());
    }

    #[test]
    fn test_server_index_number() {
        let sin = ServerIndexNumber::new(3);
        assert_eq!(sin.marshal_binary(), vec![3]);
        assert_eq!(sin.marshal_binary().len(), ServerIndexNumber::SIZE);
        assert_eq!(sin.interpret(), "ServerIndexNumber 3");
        assert_eq!(sin.hash(), sha256(&[3]));

        let (decoded, rest) = ServerIndexNumber::unmarshal_binary_data(&[5, 6, 7]).unwrap();
        assert_eq!(decoded.number, 5);
        assert_eq!(rest, &[6, 7]);
        assert!(ServerIndexNumber::unmarshal_binary_data(&[]).is_err());
    }

    #[test]
    fn test_ec_block_entries_are_ecid_tagged() {
        let block = EntryCreditBlock::new(
            EcBlockHeader {
                prev_hash: Hash::zero(),
                height: 4,
            },
            vec![
                EcEntry::ServerIndexNumber(ServerIndexNumber::new(1)),
                EcEntry::MinuteNumber(2),
            ],
        );
        let bytes = block.marshal_binary().unwrap();
        assert_eq!(&bytes[bytes.len() - 4..], &[0x00, 1, 0x01, 2]);
        assert_eq!(EntryCreditBlock::unmarshal_binary(&bytes).unwrap(), block);
    }

    #[test]
    fn test_ec_block_rejects_unknown_ecid() {
        let block = EntryCreditBlock::new(
            EcBlockHeader {
                prev_hash: Hash::zero(),
                height: 0,
            },
            vec![],
        );
        let mut bytes = block.marshal_binary().unwrap();
        bytes.extend([0x7f, 0]);
        assert!(matches!(
            EntryCreditBlock::unmarshal_binary(&bytes),
            Err(CoreError::UnknownEcId(0x7f))
        ));
    }
}
