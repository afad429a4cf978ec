//! Key permissions and schedules
//!
//! Permission encoding:
//!
//! ```text
//! [type (1B)]                                        owner / admin / anytime
//! [type (1B)][expiry (8B)][start (2B)][end (2B)][weekdays (1B)]   scheduled
//! ```

use crate::binary::{
    invalid_data, read_date, read_u16_le, read_u8, wire_date, write_date, write_u16_le,
    write_u8, BinaryRead, BinaryWrite,
};
use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};

/// Minutes in a day, the upper bound of a schedule interval
pub const MINUTES_PER_DAY: u16 = 1440;

/// What a key is permitted to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Permission {
    /// Created once at setup; may manage keys and cannot be removed
    Owner,
    /// May manage keys
    Admin,
    /// May unlock at any time
    Anytime,
    /// May unlock within the schedule window
    Scheduled(Schedule),
}

/// Discriminant of a [`Permission`] as carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionType {
    Owner,
    Admin,
    Anytime,
    Scheduled,
}

impl PermissionType {
    pub fn from_byte(byte: u8) -> io::Result<Self> {
        match byte {
            0x00 => Ok(PermissionType::Owner),
            0x01 => Ok(PermissionType::Admin),
            0x02 => Ok(PermissionType::Anytime),
            0x03 => Ok(PermissionType::Scheduled),
            _ => Err(invalid_data(format!("invalid permission type: {}", byte))),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            PermissionType::Owner => 0x00,
            PermissionType::Admin => 0x01,
            PermissionType::Anytime => 0x02,
            PermissionType::Scheduled => 0x03,
        }
    }
}

impl Permission {
    pub fn permission_type(&self) -> PermissionType {
        match self {
            Permission::Owner => PermissionType::Owner,
            Permission::Admin => PermissionType::Admin,
            Permission::Anytime => PermissionType::Anytime,
            Permission::Scheduled(_) => PermissionType::Scheduled,
        }
    }

    /// Owners and admins may create, share and remove keys
    pub fn is_administrator(&self) -> bool {
        matches!(self, Permission::Owner | Permission::Admin)
    }

    /// Whether a key with this permission may unlock at `now`
    pub fn can_unlock<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        match self {
            Permission::Owner | Permission::Admin | Permission::Anytime => true,
            Permission::Scheduled(schedule) => schedule.is_valid(now),
        }
    }

    /// The same permission with its schedule expiry truncated to wire precision
    pub fn at_wire_precision(self) -> Self {
        match self {
            Permission::Scheduled(schedule) => Permission::Scheduled(Schedule::new(
                schedule.expiry,
                schedule.interval,
                schedule.weekdays,
            )),
            other => other,
        }
    }
}

impl BinaryRead for Permission {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(match PermissionType::from_byte(read_u8(reader)?)? {
            PermissionType::Owner => Permission::Owner,
            PermissionType::Admin => Permission::Admin,
            PermissionType::Anytime => Permission::Anytime,
            PermissionType::Scheduled => Permission::Scheduled(Schedule::read_from(reader)?),
        })
    }
}

impl BinaryWrite for Permission {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_u8(writer, self.permission_type().to_byte())?;
        if let Permission::Scheduled(schedule) = self {
            schedule.write_to(writer)?;
        }
        Ok(())
    }

    fn serialized_size(&self) -> usize {
        match self {
            Permission::Scheduled(_) => 1 + Schedule::LENGTH,
            _ => 1,
        }
    }
}

/// Time window restricting when a scheduled key may unlock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// The key stops working at this instant
    pub expiry: DateTime<Utc>,
    /// Allowed minutes of the day
    pub interval: Interval,
    /// Allowed days of the week
    pub weekdays: Weekdays,
}

impl Schedule {
    pub const LENGTH: usize = 8 + 2 + 2 + 1;

    /// Expiry is truncated to the microsecond precision of the wire date
    pub fn new(expiry: DateTime<Utc>, interval: Interval, weekdays: Weekdays) -> Self {
        Self {
            expiry: wire_date(expiry),
            interval,
            weekdays,
        }
    }

    /// `now < expiry`, minute of day within the interval and weekday allowed
    ///
    /// Minute of day and weekday are taken in `now`'s time zone.
    pub fn is_valid<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        if now.with_timezone(&Utc) >= self.expiry {
            return false;
        }
        let minute = (now.hour() * 60 + now.minute()) as u16;
        self.interval.contains(minute) && self.weekdays.contains(now.weekday())
    }
}

impl BinaryRead for Schedule {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let expiry = read_date(reader)?;
        let start = read_u16_le(reader)?;
        let end = read_u16_le(reader)?;
        let interval = Interval::new(start, end).map_err(invalid_data)?;
        let weekdays = Weekdays::try_from(read_u8(reader)?).map_err(invalid_data)?;
        Ok(Self {
            expiry,
            interval,
            weekdays,
        })
    }
}

impl BinaryWrite for Schedule {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_date(writer, &self.expiry)?;
        write_u16_le(writer, self.interval.start())?;
        write_u16_le(writer, self.interval.end())?;
        write_u8(writer, self.weekdays.bits())
    }

    fn serialized_size(&self) -> usize {
        Self::LENGTH
    }
}

/// Inclusive range of minutes within `[0, 1440]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(u16, u16)", into = "(u16, u16)")]
pub struct Interval {
    start: u16,
    end: u16,
}

impl Interval {
    /// The whole day
    pub const ANYTIME: Interval = Interval {
        start: 0,
        end: MINUTES_PER_DAY,
    };

    pub fn new(start: u16, end: u16) -> Result<Self, String> {
        if start > end || end > MINUTES_PER_DAY {
            return Err(format!("invalid schedule interval: {}..={}", start, end));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn end(&self) -> u16 {
        self.end
    }

    pub fn contains(&self, minute: u16) -> bool {
        self.start <= minute && minute <= self.end
    }
}

impl TryFrom<(u16, u16)> for Interval {
    type Error = String;

    fn try_from((start, end): (u16, u16)) -> Result<Self, Self::Error> {
        Interval::new(start, end)
    }
}

impl From<Interval> for (u16, u16) {
    fn from(interval: Interval) -> Self {
        (interval.start, interval.end)
    }
}

/// Set of weekdays, bit 0 = Sunday through bit 6 = Saturday
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Weekdays(u8);

impl Weekdays {
    pub const NONE: Weekdays = Weekdays(0);
    pub const ALL: Weekdays = Weekdays(0b0111_1111);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & Self::bit(day) != 0
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= Self::bit(day);
    }

    pub fn remove(&mut self, day: Weekday) {
        self.0 &= !Self::bit(day);
    }

    fn bit(day: Weekday) -> u8 {
        1 << day.num_days_from_sunday()
    }
}

impl TryFrom<u8> for Weekdays {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        if bits & !Self::ALL.0 != 0 {
            return Err(format!("invalid weekday bits: {:#010b}", bits));
        }
        Ok(Weekdays(bits))
    }
}

impl From<Weekdays> for u8 {
    fn from(weekdays: Weekdays) -> Self {
        weekdays.0
    }
}

impl FromIterator<Weekday> for Weekdays {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut weekdays = Weekdays::NONE;
        for day in iter {
            weekdays.insert(day);
        }
        weekdays
    }
}
