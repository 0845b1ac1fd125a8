use std::fmt;

/// A point in a video, rounded to a tenth of a second.
///
/// Stored as an integer count of tenths so that equality and ordering are exact, which
/// makes it usable both as a sort key and as a dedup key.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    tenths: u64,
}

impl Timestamp {
    pub const ZERO: Self = Timestamp { tenths: 0 };

    pub const fn from_tenths(tenths: u64) -> Self {
        Self { tenths }
    }

    /// Rounds to the nearest tenth. Negative and non-finite inputs clamp to zero.
    pub fn from_secs_f64(secs: f64) -> Self {
        let tenths = (secs * 10.0).round();
        if tenths.is_finite() && tenths > 0.0 {
            Self {
                tenths: tenths as u64,
            }
        } else {
            Self::ZERO
        }
    }

    pub fn tenths(self) -> u64 {
        self.tenths
    }

    pub fn as_secs_f64(self) -> f64 {
        self.tenths as f64 / 10.0
    }

    /// Seconds in the plain decimal form ffmpeg's `-ss` expects.
    pub fn to_seek_arg(self) -> String {
        format!("{}.{}", self.tenths / 10, self.tenths % 10)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = self.tenths * 100;
        let subsec = millis % 1000;
        let total = millis / 1000;

        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let seconds = total % 60;

        write!(f, "{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, subsec)
    }
}

impl serde::Serialize for Timestamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_secs_f64())
    }
}

/// An always sorted set of timestamps without duplicates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimestampSet {
    sorted: Vec<Timestamp>,
}

impl TimestampSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if it already was present.
    pub fn insert(&mut self, ts: Timestamp) -> bool {
        match self.sorted.binary_search(&ts) {
            Ok(_) => false,
            Err(pos) => {
                self.sorted.insert(pos, ts);
                true
            }
        }
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        self.sorted.binary_search(&ts).is_ok()
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    pub fn as_slice(&self) -> &[Timestamp] {
        &self.sorted
    }

    pub fn into_vec(self) -> Vec<Timestamp> {
        self.sorted
    }
}

impl Extend<Timestamp> for TimestampSet {
    fn extend<T: IntoIterator<Item = Timestamp>>(&mut self, iter: T) {
        iter.into_iter().for_each(|ts| {
            self.insert(ts);
        })
    }
}

impl FromIterator<Timestamp> for TimestampSet {
    fn from_iter<T: IntoIterator<Item = Timestamp>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}
