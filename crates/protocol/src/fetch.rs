//! Event fetch requests
//!
//! ```text
//! FetchRequest: 0x01 offset (u8), 0x02 limit (u8, optional), 0x03 predicate (optional)
//! Predicate:    0x01 keys (n × 16B, optional), 0x02 start (date, optional), 0x03 end (date, optional)
//! ```

use crate::binary::{invalid_data, wire_date, BinaryRead, BinaryWrite};
use crate::event::LockEvent;
use crate::tlv::{read_all, record_size, uuid_from_slice, TlvFields, TlvWriter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use uuid::Uuid;

/// Page of events to return, newest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub offset: u8,
    pub limit: Option<u8>,
    pub predicate: Option<Predicate>,
}

/// Filter applied to a page of events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    /// Only events performed by one of these keys
    pub keys: Option<Vec<Uuid>>,
    /// Only events on or after this date
    pub start: Option<DateTime<Utc>>,
    /// Only events before this date
    pub end: Option<DateTime<Utc>>,
}

impl Predicate {
    /// Bounds are truncated to wire precision
    pub fn new(
        keys: Option<Vec<Uuid>>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        Predicate {
            keys,
            start: start.map(wire_date),
            end: end.map(wire_date),
        }
    }

    pub fn matches(&self, event: &LockEvent) -> bool {
        if let Some(keys) = &self.keys {
            if !keys.contains(&event.key()) {
                return false;
            }
        }
        let date = event.date();
        if let Some(start) = &self.start {
            if date < *start {
                return false;
            }
        }
        if let Some(end) = &self.end {
            if date >= *end {
                return false;
            }
        }
        true
    }
}

mod request_tag {
    pub const OFFSET: u8 = 0x01;
    pub const LIMIT: u8 = 0x02;
    pub const PREDICATE: u8 = 0x03;
    pub const ALL: &[u8] = &[OFFSET, LIMIT, PREDICATE];
}

mod predicate_tag {
    pub const KEYS: u8 = 0x01;
    pub const START: u8 = 0x02;
    pub const END: u8 = 0x03;
    pub const ALL: &[u8] = &[KEYS, START, END];
}

impl BinaryRead for FetchRequest {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let bytes = read_all(reader)?;
        let fields = TlvFields::parse(&bytes, request_tag::ALL)?;
        Ok(FetchRequest {
            offset: fields.u8(request_tag::OFFSET, "offset")?,
            limit: fields.optional_u8(request_tag::LIMIT, "limit")?,
            predicate: fields.optional_value(request_tag::PREDICATE)?,
        })
    }
}

impl BinaryWrite for FetchRequest {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut tlv = TlvWriter::new(writer);
        tlv.u8(request_tag::OFFSET, self.offset)?;
        if let Some(limit) = self.limit {
            tlv.u8(request_tag::LIMIT, limit)?;
        }
        if let Some(predicate) = &self.predicate {
            tlv.value(request_tag::PREDICATE, predicate)?;
        }
        Ok(())
    }

    fn serialized_size(&self) -> usize {
        record_size(1)
            + self.limit.map_or(0, |_| record_size(1))
            + self
                .predicate
                .as_ref()
                .map_or(0, |p| record_size(p.serialized_size()))
    }
}

impl BinaryRead for Predicate {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let bytes = read_all(reader)?;
        let fields = TlvFields::parse(&bytes, predicate_tag::ALL)?;
        let keys = match fields.get(predicate_tag::KEYS) {
            Some(raw) => {
                if raw.len() % 16 != 0 {
                    return Err(invalid_data(format!(
                        "key list length {} is not a multiple of 16",
                        raw.len()
                    )));
                }
                Some(
                    raw.chunks(16)
                        .map(uuid_from_slice)
                        .collect::<Result<Vec<_>, _>>()?,
                )
            }
            None => None,
        };
        Ok(Predicate {
            keys,
            start: fields.optional_date(predicate_tag::START, "start")?,
            end: fields.optional_date(predicate_tag::END, "end")?,
        })
    }
}

impl BinaryWrite for Predicate {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut tlv = TlvWriter::new(writer);
        if let Some(keys) = &self.keys {
            let raw: Vec<u8> = keys.iter().flat_map(|k| *k.as_bytes()).collect();
            tlv.bytes(predicate_tag::KEYS, &raw)?;
        }
        if let Some(start) = &self.start {
            tlv.date(predicate_tag::START, start)?;
        }
        if let Some(end) = &self.end {
            tlv.date(predicate_tag::END, end)?;
        }
        Ok(())
    }

    fn serialized_size(&self) -> usize {
        self.keys.as_ref().map_or(0, |k| record_size(16 * k.len()))
            + self.start.map_or(0, |_| record_size(8))
            + self.end.map_or(0, |_| record_size(8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap()
    }

    fn event(key: Uuid, date: DateTime<Utc>) -> LockEvent {
        LockEvent::setup(date, key)
    }

    #[test]
    fn test_fetch_request_roundtrip() {
        let requests = [
            FetchRequest::default(),
            FetchRequest {
                offset: 4,
                limit: Some(10),
                predicate: Some(Predicate::default()),
            },
            FetchRequest {
                offset: 0,
                limit: None,
                predicate: Some(Predicate {
                    keys: Some(vec![Uuid::new_v4(), Uuid::new_v4()]),
                    start: Some(base()),
                    end: Some(base() + Duration::days(2)),
                }),
            },
        ];
        for request in requests {
            let bytes = request.to_bytes().unwrap();
            assert_eq!(bytes.len(), request.serialized_size());
            assert_eq!(FetchRequest::from_bytes(&bytes).unwrap(), request);
        }
    }

    #[test]
    fn test_predicate_with_nanosecond_bounds() {
        let start = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let predicate = Predicate::new(None, Some(start), Some(start + Duration::hours(1)));
        assert_eq!(predicate.start.map(|d| d.timestamp_subsec_nanos()), Some(123_456_000));
        let request = FetchRequest {
            offset: 0,
            limit: Some(5),
            predicate: Some(predicate.clone()),
        };
        let bytes = request.to_bytes().unwrap();
        assert_eq!(FetchRequest::from_bytes(&bytes).unwrap(), request);
        // an event stamped at the same instant falls inside the decoded bounds
        assert!(predicate.matches(&event(Uuid::new_v4(), start)));
    }

    #[test]
    fn test_empty_key_list_is_distinct_from_none() {
        let predicate = Predicate {
            keys: Some(Vec::new()),
            ..Predicate::default()
        };
        let bytes = predicate.to_bytes().unwrap();
        assert_eq!(Predicate::from_bytes(&bytes).unwrap(), predicate);
        assert!(!predicate.matches(&event(Uuid::new_v4(), base())));
    }

    #[test]
    fn test_offset_required() {
        assert!(FetchRequest::from_bytes(&[]).is_err());
    }

    #[test]
    fn test_misaligned_key_list_rejected() {
        let mut buf = Vec::new();
        TlvWriter::new(&mut buf)
            .bytes(predicate_tag::KEYS, &[0u8; 20])
            .unwrap();
        assert!(Predicate::from_bytes(&buf).is_err());
    }

    #[test]
    fn test_predicate_bounds() {
        let key = Uuid::new_v4();
        let predicate = Predicate {
            keys: None,
            start: Some(base()),
            end: Some(base() + Duration::days(1)),
        };
        assert!(predicate.matches(&event(key, base())));
        assert!(!predicate.matches(&event(key, base() - Duration::seconds(1))));
        assert!(!predicate.matches(&event(key, base() + Duration::days(1))));
    }

    #[test]
    fn test_predicate_keys() {
        let key = Uuid::new_v4();
        let predicate = Predicate {
            keys: Some(vec![key]),
            ..Predicate::default()
        };
        assert!(predicate.matches(&event(key, base())));
        assert!(!predicate.matches(&event(Uuid::new_v4(), base())));
    }
}
