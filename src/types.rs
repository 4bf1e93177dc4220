use std::fmt;
use std::str::FromStr;

/// Declared image size: a positive integer with a G/M/K suffix, e.g. "10G".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    count: u64,
    unit: SizeUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeUnit {
    Gibi,
    Mebi,
    Kibi,
}

impl ImageSize {
    pub fn gibibytes(count: u64) -> Self {
        ImageSize {
            count,
            unit: SizeUnit::Gibi,
        }
    }

    pub fn bytes(&self) -> u64 {
        match self.unit {
            SizeUnit::Gibi => self.count * 1024 * 1024 * 1024,
            SizeUnit::Mebi => self.count * 1024 * 1024,
            SizeUnit::Kibi => self.count * 1024,
        }
    }
}

impl FromStr for ImageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() < 2 {
            return Err(format!("size {:?} must match <digits><G|M|K>", s));
        }
        let (digits, suffix) = s.split_at(s.len() - 1);
        let unit = match suffix {
            "G" => SizeUnit::Gibi,
            "M" => SizeUnit::Mebi,
            "K" => SizeUnit::Kibi,
            _ => return Err(format!("size {:?} must end in G, M, or K", s)),
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("size {:?} must match <digits><G|M|K>", s));
        }
        let count = digits
            .parse::<u64>()
            .map_err(|_| format!("size {:?} is out of range", s))?;
        if count == 0 {
            return Err(format!("size {:?} must be non-zero", s));
        }
        Ok(ImageSize { count, unit })
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.unit {
            SizeUnit::Gibi => "G",
            SizeUnit::Mebi => "M",
            SizeUnit::Kibi => "K",
        };
        write!(f, "{}{}", self.count, suffix)
    }
}

/// A 5-field cron expression. Field contents are cron's business; this only
/// enforces the field count so a malformed entry never reaches the crontab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule(String);

impl CronSchedule {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CronSchedule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(format!(
                "schedule {:?} must have exactly 5 fields, got {}",
                s,
                fields.len()
            ));
        }
        Ok(CronSchedule(fields.join(" ")))
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What kicked off a backup run. The cron entry invokes the plain verb, so
/// `Scheduled` is the unattended path the disable marker suppresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupTrigger {
    Scheduled,
    Forced,
}

impl BackupTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupTrigger::Scheduled => "scheduled",
            BackupTrigger::Forced => "forced",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunMode {
    pub dry_run: bool,
    pub verbose: bool,
    pub assume_yes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_size_parse() {
        let size = "10G".parse::<ImageSize>().expect("parse");
        assert_eq!(size.bytes(), 10 * 1024 * 1024 * 1024);
        assert_eq!(size.to_string(), "10G");
        assert_eq!("512M".parse::<ImageSize>().expect("parse").bytes(), 512 * 1024 * 1024);
        assert_eq!("4K".parse::<ImageSize>().expect("parse").bytes(), 4096);
    }

    #[test]
    fn image_size_rejects_bad_input() {
        assert!("".parse::<ImageSize>().is_err());
        assert!("G".parse::<ImageSize>().is_err());
        assert!("10".parse::<ImageSize>().is_err());
        assert!("10T".parse::<ImageSize>().is_err());
        assert!("10g".parse::<ImageSize>().is_err());
        assert!("1.5G".parse::<ImageSize>().is_err());
        assert!("0G".parse::<ImageSize>().is_err());
    }

    #[test]
    fn cron_schedule_field_count() {
        assert!("0 3 * * *".parse::<CronSchedule>().is_ok());
        assert!("*/5  *  * * 1-5".parse::<CronSchedule>().is_ok());
        assert!("0 3 * *".parse::<CronSchedule>().is_err());
        assert!("0 3 * * * *".parse::<CronSchedule>().is_err());
        assert!("".parse::<CronSchedule>().is_err());
    }

    #[test]
    fn cron_schedule_normalizes_whitespace() {
        let schedule = " 0  3 * * * ".parse::<CronSchedule>().expect("parse");
        assert_eq!(schedule.as_str(), "0 3 * * *");
    }
}
