use crate::types::traits::types::{Month, StartEndDate, Year};
use crate::types::traits::utils::{days_in_month, parse_calendar_date};
use chrono::NaiveDate;

/// Anything that resolves to an inclusive span of calendar days.
pub trait AnyDate {
    fn get_date_range(self) -> Option<StartEndDate>;
}

impl AnyDate for NaiveDate {
    fn get_date_range(self) -> Option<StartEndDate> {
        Some(StartEndDate {
            start: self,
            end: self,
        })
    }
}

impl AnyDate for &str {
    fn get_date_range(self) -> Option<StartEndDate> {
        parse_calendar_date(self)?.get_date_range()
    }
}

impl AnyDate for String {
    fn get_date_range(self) -> Option<StartEndDate> {
        self.as_str().get_date_range()
    }
}

impl AnyDate for Year {
    fn get_date_range(self) -> Option<StartEndDate> {
        Some(StartEndDate {
            start: NaiveDate::from_ymd_opt(self.0, 1, 1)?,
            end: NaiveDate::from_ymd_opt(self.0, 12, 31)?,
        })
    }
}

impl AnyDate for Month {
    fn get_date_range(self) -> Option<StartEndDate> {
        let year = self.year();
        let month = self.month();
        Some(StartEndDate {
            start: NaiveDate::from_ymd_opt(year, month, 1)?,
            end: NaiveDate::from_ymd_opt(year, month, days_in_month(year, month)?)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_and_month_ranges() {
        let year = Year(2008).get_date_range().unwrap();
        assert_eq!(year.start, NaiveDate::from_ymd_opt(2008, 1, 1).unwrap());
        assert_eq!(year.end, NaiveDate::from_ymd_opt(2008, 12, 31).unwrap());

        let feb = Month(2024, 2).get_date_range().unwrap();
        assert_eq!(feb.end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert!(Month(2024, 13).get_date_range().is_none());
    }

    #[test]
    fn test_str_accepts_power_format() {
        let range = "20240101".get_date_range().unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(range.start, range.end);
        assert!("2024-99-01".get_date_range().is_none());
    }
}
