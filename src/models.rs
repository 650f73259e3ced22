use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Format used for the stored completion date
pub const COMPLETED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,                          // 0 until the store assigns one
    pub title: String,
    pub notes: Option<String>,
    pub date: Option<String>,             // ISO 8601: YYYY-MM-DD
    pub date_completed: Option<String>,   // YYYY-MM-DD HH:MM:SS
    pub time: Option<String>,             // HH:MM, 24h
    pub time_category: Option<TimeCategory>,
    pub timestamp: i64,                   // millis since epoch at insert
    pub flag: bool,
    pub is_completed: bool,
}

impl Task {
    pub fn new(title: String) -> Self {
        Self {
            id: 0,
            title,
            notes: None,
            date: None,
            date_completed: None,
            time: None,
            time_category: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
            flag: false,
            is_completed: false,
        }
    }

    /// Hour component of `time`, if it parses
    pub fn hour(&self) -> Option<u32> {
        self.time
            .as_deref()
            .and_then(|t| t.split(':').next())
            .and_then(|h| h.trim().parse::<u32>().ok())
            .filter(|h| *h < 24)
    }

    /// Re-derive `time_category` from `time`
    pub fn refresh_time_category(&mut self) {
        self.time_category = self.hour().map(TimeCategory::from_hour);
    }
}

/// Time-of-day bucket derived from a task's time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeCategory {
    Morning,
    Afternoon,
    Tonight,
}

impl TimeCategory {
    /// 05-11 morning, 12-17 afternoon, anything else tonight
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeCategory::Morning,
            12..=17 => TimeCategory::Afternoon,
            _ => TimeCategory::Tonight,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeCategory::Morning => "morning",
            TimeCategory::Afternoon => "afternoon",
            TimeCategory::Tonight => "tonight",
        }
    }

    pub fn heading(&self) -> &'static str {
        match self {
            TimeCategory::Morning => "Morning",
            TimeCategory::Afternoon => "Afternoon",
            TimeCategory::Tonight => "Tonight",
        }
    }
}

impl fmt::Display for TimeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(TimeCategory::Morning),
            "afternoon" => Ok(TimeCategory::Afternoon),
            "tonight" => Ok(TimeCategory::Tonight),
            other => Err(format!("Unknown time category: {}", other)),
        }
    }
}

/// Input for creating a task; the store fills in id and timestamp
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub notes: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub flag: bool,
}

/// Live counters shown on the home screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub today: i64,
    pub scheduled: i64,
    pub flagged: i64,
    pub incomplete: i64,
    pub completed: i64,
    pub total: i64,
}
