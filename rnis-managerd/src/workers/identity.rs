use std::fmt;
use std::str::FromStr;

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// PLMN identity, MCC followed by a 2 or 3 digit MNC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlmnId(String);

impl PlmnId {
    pub fn from_parts(mcc: &str, mnc: &str) -> Result<Self, String> {
        format!("{}{}", mcc, mnc).parse()
    }
}

impl FromStr for PlmnId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !all_digits(s) || !(5..=6).contains(&s.len()) {
            return Err(format!("Invalid PLMN id: {}", s));
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for PlmnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Subscriber identity, up to 15 digits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Imsi(String);

impl FromStr for Imsi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !all_digits(s) || !(6..=15).contains(&s.len()) {
            return Err(format!("Invalid IMSI: {}", s));
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for Imsi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
