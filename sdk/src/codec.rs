//! Amount and time conversions between what a guest types and what the
//! escrow program stores.
//!
//! Excess fractional digits are truncated, never rounded.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

use crate::core::{SdkError, SdkResult, MAX_MINT_DECIMALS};

/// `datetime-local` input format
const LOCAL_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";
const LOCAL_INPUT_FORMAT_SECONDS: &str = "%Y-%m-%dT%H:%M:%S";

fn scale(decimals: u8) -> SdkResult<u128> {
    if decimals > MAX_MINT_DECIMALS {
        return Err(SdkError::InvalidAmount(format!(
            "{} decimals exceeds the supported maximum of {}",
            decimals, MAX_MINT_DECIMALS
        )));
    }
    Ok(10u128.pow(decimals as u32))
}

fn ensure_digits(segment: &str, text: &str) -> SdkResult<()> {
    if segment.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(SdkError::InvalidAmount(format!("'{}' is not a decimal number", text)))
    }
}

fn parse_digits(segment: &str, text: &str) -> SdkResult<u128> {
    ensure_digits(segment, text)?;
    if segment.is_empty() {
        return Ok(0);
    }
    segment
        .parse::<u128>()
        .map_err(|_| SdkError::InvalidAmount(format!("'{}' is too large", text)))
}

/// Convert decimal text such as `"120.5"` into base units, as a decimal string.
///
/// The fraction is right-padded with zeros or truncated to exactly `decimals`
/// digits; whatever lies past that is never read. A missing integer part
/// (`".5"`) counts as zero, a leading `+` is accepted and `-` is not. Only the
/// first two `.`-separated segments are read.
pub fn decimal_to_base_units(text: &str, decimals: u8) -> SdkResult<String> {
    decimal_to_base_units_u128(text, decimals).map(|v| v.to_string())
}

fn decimal_to_base_units_u128(text: &str, decimals: u8) -> SdkResult<u128> {
    let unit = scale(decimals)?;
    let mut parts = text.trim().split('.');
    let int_part = parts.next().unwrap_or("");
    let int_part = int_part.strip_prefix('+').unwrap_or(int_part);
    let frac_part = parts.next().unwrap_or("");

    let frac: String = frac_part
        .chars()
        .chain(std::iter::repeat('0'))
        .take(decimals as usize)
        .collect();

    let whole = parse_digits(int_part, text)?;
    let fraction = parse_digits(&frac, text)?;

    whole
        .checked_mul(unit)
        .and_then(|v| v.checked_add(fraction))
        .ok_or_else(|| SdkError::InvalidAmount(format!("'{}' is too large", text)))
}

/// Same conversion as [`decimal_to_base_units`], narrowed to the program's `u64`
pub fn parse_amount(text: &str, decimals: u8) -> SdkResult<u64> {
    let value = decimal_to_base_units_u128(text, decimals)?;
    u64::try_from(value).map_err(|_| {
        SdkError::InvalidAmount(format!("'{}' does not fit in a u64 of base units", text))
    })
}

/// Render base units as decimal text. Trailing fractional zeros are dropped.
pub fn base_units_to_decimal(base_units: u128, decimals: u8) -> String {
    if decimals == 0 {
        return base_units.to_string();
    }
    let width = decimals as usize;
    let digits = format!("{:0>width$}", base_units, width = width + 1);
    let (whole, frac) = digits.split_at(digits.len() - width);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, frac)
    }
}

fn parse_local_input(text: &str) -> SdkResult<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, LOCAL_INPUT_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, LOCAL_INPUT_FORMAT_SECONDS))
        .map_err(|e| SdkError::InvalidDateTime(format!("'{}': {}", text, e)))
}

/// Interpret `YYYY-MM-DDTHH:MM` in the host's local zone as unix seconds
pub fn local_datetime_to_unix_seconds(text: &str) -> SdkResult<i64> {
    local_datetime_to_unix_seconds_in(text, &Local)
}

/// Same as [`local_datetime_to_unix_seconds`] for an explicit zone.
///
/// Ambiguous wall-clock times (DST fall-back) resolve to the earlier instant.
pub fn local_datetime_to_unix_seconds_in<Tz: TimeZone>(text: &str, tz: &Tz) -> SdkResult<i64> {
    let naive = parse_local_input(text)?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
        .ok_or_else(|| {
            SdkError::InvalidDateTime(format!("'{}' does not exist in the local time zone", text))
        })
}

/// Render unix seconds as `YYYY-MM-DDTHH:MM` in the host's local zone
pub fn unix_seconds_to_local_datetime(secs: i64) -> SdkResult<String> {
    unix_seconds_to_local_datetime_in(secs, &Local)
}

pub fn unix_seconds_to_local_datetime_in<Tz: TimeZone>(secs: i64, tz: &Tz) -> SdkResult<String>
where
    Tz::Offset: std::fmt::Display,
{
    let utc = DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| SdkError::InvalidDateTime(format!("{} is out of range", secs)))?;
    Ok(utc
        .with_timezone(tz)
        .format(LOCAL_INPUT_FORMAT)
        .to_string())
}
