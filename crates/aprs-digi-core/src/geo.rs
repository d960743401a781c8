//! APRS coordinate formatting
//!
//! APRS position reports carry coordinates as degrees plus decimal
//! minutes in a fixed-width ASCII form: `DDMM.mm` followed by the
//! hemisphere letter for latitude, `DDDMM.mm` for longitude.

/// Format a latitude as `DDMM.mm` + `N`/`S`.
///
/// Degrees are the integer part of the absolute value, zero-padded to
/// two digits; minutes are the fractional part times 60, zero-padded to
/// `MM.mm`.
pub fn format_latitude(lat: f64) -> String {
    let hemisphere = if lat < 0.0 { 'S' } else { 'N' };
    let abs = lat.abs();
    let degrees = abs.trunc() as u32;
    let minutes = abs.fract() * 60.0;
    format!("{:02}{:05.2}{}", degrees, minutes, hemisphere)
}

/// Format a longitude as `DDDMM.mm` + `E`/`W` (three-digit degrees).
pub fn format_longitude(lng: f64) -> String {
    let hemisphere = if lng < 0.0 { 'W' } else { 'E' };
    let abs = lng.abs();
    let degrees = abs.trunc() as u32;
    let minutes = abs.fract() * 60.0;
    format!("{:03}{:05.2}{}", degrees, minutes, hemisphere)
}
