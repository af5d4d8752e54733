//! Journal record format
//!
//! Every committed snapshot is appended to the journal as one record:
//!
//! ```text
//! +------------------+
//! | Record Length    | (u32 LE)
//! +------------------+
//! | Uri              | (length-prefixed string)
//! +------------------+
//! | Collection       | (length-prefixed string)
//! +------------------+
//! | Owner ID         | (length-prefixed string)
//! +------------------+
//! | Version Token    | (length-prefixed string)
//! +------------------+
//! | Commit ID        | (u64 LE)
//! +------------------+
//! | Created At       | (i64 LE secs, u32 LE nanos)
//! +------------------+
//! | Last Modified    | (i64 LE secs, u32 LE nanos)
//! +------------------+
//! | Tombstone Flag   | (u8: 0 = live, 1 = deleted)
//! +------------------+
//! | Content          | (length-prefixed bytes)
//! +------------------+
//! | Checksum         | (u32 LE, CRC32)
//! +------------------+
//! ```
//!
//! Record length counts the whole record, itself and the checksum included.
//! The checksum covers all bytes except the checksum itself.

use std::io::{self, Cursor, Read};

use chrono::{DateTime, Utc};
use crc32fast::Hasher;

use super::errors::{AdapterError, AdapterResult};
use crate::mvcc::{CommitId, Snapshot, VersionPayload, VersionToken};

/// Length prefix + four empty strings + commit + two timestamps + flag +
/// empty content + checksum.
pub const MIN_RECORD_SIZE: usize = 4 + 4 * 4 + 8 + 12 + 12 + 1 + 4 + 4;

/// CRC32 (IEEE) over `data`.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
}

fn put_time(buf: &mut Vec<u8>, at: DateTime<Utc>) {
    buf.extend_from_slice(&at.timestamp().to_le_bytes());
    buf.extend_from_slice(&at.timestamp_subsec_nanos().to_le_bytes());
}

/// Serialize a snapshot into one framed journal record.
pub fn encode(snapshot: &Snapshot) -> AdapterResult<Vec<u8>> {
    let mut body = Vec::with_capacity(64 + snapshot.content().len());

    put_bytes(&mut body, snapshot.uri().as_bytes());
    put_bytes(&mut body, snapshot.collection().as_bytes());
    put_bytes(&mut body, snapshot.owner_id().as_bytes());
    put_bytes(&mut body, snapshot.version_token().as_str().as_bytes());
    body.extend_from_slice(&snapshot.commit_id().value().to_le_bytes());
    put_time(&mut body, snapshot.created_at());
    put_time(&mut body, snapshot.last_modified());
    body.push(u8::from(snapshot.is_deleted()));
    put_bytes(&mut body, snapshot.content());

    let record_length = u32::try_from(4 + body.len() + 4).map_err(|_| {
        AdapterError::Serialization(format!(
            "record for {} exceeds the maximum record size",
            snapshot.uri()
        ))
    })?;

    let mut record = Vec::with_capacity(record_length as usize);
    record.extend_from_slice(&record_length.to_le_bytes());
    record.extend_from_slice(&body);
    let checksum = compute_checksum(&record);
    record.extend_from_slice(&checksum.to_le_bytes());

    Ok(record)
}

/// Deserialize one record from the front of `data`, verifying its checksum.
///
/// `offset` is the record's position in the journal, used for error
/// reporting. Returns the snapshot and the number of bytes consumed.
pub fn decode(data: &[u8], offset: u64) -> AdapterResult<(Snapshot, usize)> {
    if data.len() < 4 {
        return Err(AdapterError::corruption(
            offset,
            format!("truncated record header: {} bytes", data.len()),
        ));
    }

    let record_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;

    if record_length < MIN_RECORD_SIZE {
        return Err(AdapterError::corruption(
            offset,
            format!("invalid record length: {}", record_length),
        ));
    }

    if data.len() < record_length {
        return Err(AdapterError::corruption(
            offset,
            format!(
                "record truncated: expected {} bytes, got {}",
                record_length,
                data.len()
            ),
        ));
    }

    let checksum_offset = record_length - 4;
    let stored = u32::from_le_bytes([
        data[checksum_offset],
        data[checksum_offset + 1],
        data[checksum_offset + 2],
        data[checksum_offset + 3],
    ]);
    let computed = compute_checksum(&data[..checksum_offset]);

    if computed != stored {
        return Err(AdapterError::corruption(
            offset,
            format!(
                "checksum mismatch: computed {:08x}, stored {:08x}",
                computed, stored
            ),
        ));
    }

    let snapshot = parse_body(&data[4..checksum_offset])
        .map_err(|e| AdapterError::corruption(offset, format!("malformed record body: {}", e)))?;

    Ok((snapshot, record_length))
}

fn parse_body(body: &[u8]) -> io::Result<Snapshot> {
    let mut cursor = Cursor::new(body);

    let uri = read_string(&mut cursor)?;
    let collection = read_string(&mut cursor)?;
    let owner_id = read_string(&mut cursor)?;
    let token = read_string(&mut cursor)?;
    let commit_id = CommitId::new(u64::from_le_bytes(read_array(&mut cursor)?));
    let created_at = read_time(&mut cursor)?;
    let last_modified = read_time(&mut cursor)?;
    let [flag] = read_array::<1>(&mut cursor)?;
    let content = read_bytes(&mut cursor)?;

    let payload = match flag {
        0 => VersionPayload::Document(content),
        1 => VersionPayload::Tombstone,
        other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid tombstone flag: {}", other),
            ))
        }
    };

    Ok(Snapshot::from_parts(
        uri,
        collection,
        owner_id,
        payload,
        VersionToken::new(token),
        commit_id,
        created_at,
        last_modified,
    ))
}

fn read_array<const N: usize>(reader: &mut impl Read) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_bytes(reader: &mut impl Read) -> io::Result<Vec<u8>> {
    let len = u32::from_le_bytes(read_array(reader)?) as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_string(reader: &mut impl Read) -> io::Result<String> {
    String::from_utf8(read_bytes(reader)?)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("invalid UTF-8: {}", e)))
}

fn read_time(reader: &mut impl Read) -> io::Result<DateTime<Utc>> {
    let secs = i64::from_le_bytes(read_array(reader)?);
    let nanos = u32::from_le_bytes(read_array(reader)?);
    DateTime::from_timestamp(secs, nanos).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("timestamp out of range: {}.{}", secs, nanos),
        )
    })
}
