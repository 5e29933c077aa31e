//! A1 notation
//!
//! Columns are 0-based internally, rows are 1-based like the sheet.
//! A range may be open-ended downward (`B2:C`), in which case the store
//! decides where the data stops.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// "A" -> 0, "Z" -> 25, "AA" -> 26
pub fn column_index(letters: &str) -> Result<u32> {
    if letters.is_empty() {
        return Err(Error::Range("empty column".into()));
    }
    let mut index: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return Err(Error::Range(format!("bad column: {}", letters)));
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
        index = index
            .checked_mul(26)
            .and_then(|i| i.checked_add(digit))
            .ok_or_else(|| Error::Range(format!("column out of range: {}", letters)))?;
    }
    Ok(index - 1)
}

/// 0 -> "A", 26 -> "AA"
pub fn column_letters(index: u32) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

fn split_cell(text: &str) -> (&str, &str) {
    let pos = text
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(text.len());
    text.split_at(pos)
}

/// Single cell, e.g. `H2`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellRef {
    pub col: u32,
    pub row: u32,
}

impl CellRef {
    pub fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }
}

impl FromStr for CellRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (letters, digits) = split_cell(s);
        let col = column_index(letters)?;
        let row: u32 = digits
            .parse()
            .map_err(|_| Error::Range(format!("bad cell reference: {}", s)))?;
        if row == 0 {
            return Err(Error::Range(format!("rows start at 1: {}", s)));
        }
        Ok(Self { col, row })
    }
}

impl TryFrom<String> for CellRef {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CellRef> for String {
    fn from(value: CellRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row)
    }
}

/// Rectangular range; `end_row == None` means "down to the last data row"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RangeRef {
    pub start: CellRef,
    pub end_col: u32,
    pub end_row: Option<u32>,
}

impl RangeRef {
    /// Bounded block of `rows` x `cols` starting at `start`
    pub fn block(start: CellRef, rows: u32, cols: u32) -> Self {
        Self {
            start,
            end_col: start.col + cols.max(1) - 1,
            end_row: Some(start.row + rows.max(1) - 1),
        }
    }

    /// Same columns, unbounded rows from `start`
    pub fn open_block(start: CellRef, cols: u32) -> Self {
        Self {
            start,
            end_col: start.col + cols.max(1) - 1,
            end_row: None,
        }
    }

    pub fn width(&self) -> usize {
        (self.end_col - self.start.col + 1) as usize
    }

    pub fn height(&self) -> Option<usize> {
        self.end_row.map(|end| (end - self.start.row + 1) as usize)
    }

    pub fn contains_column(&self, col: u32) -> bool {
        col >= self.start.col && col <= self.end_col
    }

    /// True when the two ranges share at least one cell
    pub fn intersects(&self, other: &RangeRef) -> bool {
        let cols = self.start.col <= other.end_col && other.start.col <= self.end_col;
        let self_end = self.end_row.unwrap_or(u32::MAX);
        let other_end = other.end_row.unwrap_or(u32::MAX);
        let rows = self.start.row <= other_end && other.start.row <= self_end;
        cols && rows
    }

    /// `'Sheet name'!B2:C` as the Sheets API expects it
    pub fn qualified(&self, worksheet: &str) -> String {
        format!("'{}'!{}", worksheet.replace('\'', "''"), self)
    }
}

impl FromStr for RangeRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (first, second) = match s.split_once(':') {
            Some((a, b)) => (a, Some(b)),
            None => (s, None),
        };

        let (start_letters, start_digits) = split_cell(first);
        let start = CellRef {
            col: column_index(start_letters)?,
            row: if start_digits.is_empty() {
                1
            } else {
                start_digits
                    .parse()
                    .map_err(|_| Error::Range(format!("bad range: {}", s)))?
            },
        };
        if start.row == 0 {
            return Err(Error::Range(format!("rows start at 1: {}", s)));
        }

        let (end_col, end_row) = match second {
            None => (start.col, Some(start.row)),
            Some(end) => {
                let (letters, digits) = split_cell(end);
                let col = column_index(letters)?;
                let row = if digits.is_empty() {
                    None
                } else {
                    Some(
                        digits
                            .parse::<u32>()
                            .map_err(|_| Error::Range(format!("bad range: {}", s)))?,
                    )
                };
                (col, row)
            }
        };

        if end_col < start.col {
            return Err(Error::Range(format!("columns reversed: {}", s)));
        }
        if let Some(row) = end_row {
            if row < start.row {
                return Err(Error::Range(format!("rows reversed: {}", s)));
            }
        }

        Ok(Self {
            start,
            end_col,
            end_row,
        })
    }
}

impl TryFrom<String> for RangeRef {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<RangeRef> for String {
    fn from(value: RangeRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for RangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, column_letters(self.end_col))?;
        if let Some(row) = self.end_row {
            write!(f, "{}", row)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_conversions() {
        assert_eq!(column_index("A").unwrap(), 0);
        assert_eq!(column_index("h").unwrap(), 7);
        assert_eq!(column_index("Z").unwrap(), 25);
        assert_eq!(column_index("AA").unwrap(), 26);
        assert_eq!(column_index("AZ").unwrap(), 51);
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(18), "S");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(701), "ZZ");
        assert!(column_index("").is_err());
        assert!(column_index("A1").is_err());
    }

    #[test]
    fn test_cell_ref_parse() {
        let cell: CellRef = "H2".parse().unwrap();
        assert_eq!(cell, CellRef::new(7, 2));
        assert_eq!(cell.to_string(), "H2");
        assert!("H0".parse::<CellRef>().is_err());
        assert!("H".parse::<CellRef>().is_err());
        assert!("2H".parse::<CellRef>().is_err());
    }

    #[test]
    fn test_range_parse_open_ended() {
        let range: RangeRef = "B2:C".parse().unwrap();
        assert_eq!(range.start, CellRef::new(1, 2));
        assert_eq!(range.end_col, 2);
        assert_eq!(range.end_row, None);
        assert_eq!(range.width(), 2);
        assert_eq!(range.height(), None);
        assert_eq!(range.to_string(), "B2:C");
    }

    #[test]
    fn test_range_parse_bounded_and_single() {
        let range: RangeRef = "H1:S1".parse().unwrap();
        assert_eq!(range.width(), 12);
        assert_eq!(range.height(), Some(1));

        let single: RangeRef = "A1".parse().unwrap();
        assert_eq!(single.width(), 1);
        assert_eq!(single.height(), Some(1));

        let columns: RangeRef = "A:C".parse().unwrap();
        assert_eq!(columns.start.row, 1);
        assert_eq!(columns.end_row, None);

        assert!("C2:B5".parse::<RangeRef>().is_err());
        assert!("B5:C2".parse::<RangeRef>().is_err());
    }

    #[test]
    fn test_range_block() {
        let block = RangeRef::block(CellRef::new(7, 1), 3, 12);
        assert_eq!(block.to_string(), "H1:S3");
    }

    #[test]
    fn test_range_intersects() {
        let input: RangeRef = "B2:C".parse().unwrap();
        let output = RangeRef::open_block("H2".parse().unwrap(), 12);
        assert!(!input.intersects(&output));

        let clash = RangeRef::open_block("C2".parse().unwrap(), 3);
        assert!(input.intersects(&clash));

        // header row above the input never touches it
        let header: RangeRef = "B1:C1".parse().unwrap();
        assert!(!input.intersects(&header));
    }

    #[test]
    fn test_range_qualified_quotes_sheet() {
        let range: RangeRef = "A2:A".parse().unwrap();
        assert_eq!(range.qualified("17-11"), "'17-11'!A2:A");
        assert_eq!(range.qualified("Bob's"), "'Bob''s'!A2:A");
    }

    #[test]
    fn test_range_serde_as_string() {
        let range: RangeRef = serde_json::from_str("\"B2:C\"").unwrap();
        assert_eq!(range.width(), 2);
        assert_eq!(serde_json::to_string(&range).unwrap(), "\"B2:C\"");
        assert!(serde_json::from_str::<RangeRef>("\"??\"").is_err());
    }
}
