//! `WIFI:` QR payload parsing.
//!
//! Payloads look like `WIFI:S:myssid;T:WPA2;P:secret;H:false;;` with the
//! fields in any order. `\;`, `\:`, `\\` and `\,` escape the delimiters
//! inside field values.

use heapless::String;

/// Maximum SSID length in bytes (802.11 limit).
pub const MAX_SSID_LEN: usize = 32;
/// Maximum passphrase length in bytes (one above the 63-byte WPA2 limit,
/// leaving room for a 64-digit raw PSK).
pub const MAX_PSK_LEN: usize = 64;

/// Security type advertised in the payload's `T:` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WifiSecurity {
    /// Open network (`nopass`, an empty field, or anything unrecognized).
    #[default]
    Open,
    Wep,
    Wpa,
    Wpa2,
    Wpa3,
}

impl WifiSecurity {
    fn from_field(field: &str) -> Self {
        if field.eq_ignore_ascii_case("WEP") {
            WifiSecurity::Wep
        } else if field.eq_ignore_ascii_case("WPA") {
            WifiSecurity::Wpa
        } else if field.eq_ignore_ascii_case("WPA2") {
            WifiSecurity::Wpa2
        } else if field.eq_ignore_ascii_case("WPA3") || field.eq_ignore_ascii_case("SAE") {
            WifiSecurity::Wpa3
        } else {
            WifiSecurity::Open
        }
    }
}

/// Why a payload failed to parse as Wi-Fi credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WifiParseError {
    /// Payload does not start with `WIFI:`.
    NotWifi,
    /// No (or empty) `S:` field.
    MissingSsid,
    /// A field value exceeds its buffer.
    FieldTooLong,
}

/// Credentials carried by a `WIFI:` QR payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WifiCredentials {
    pub ssid: String<MAX_SSID_LEN>,
    /// Empty for open networks.
    pub password: String<MAX_PSK_LEN>,
    pub security: WifiSecurity,
    pub hidden: bool,
}

impl WifiCredentials {
    /// Parse a `WIFI:` payload.
    ///
    /// Unknown fields are ignored, a missing `P:` field means an open
    /// network, and a missing or empty `S:` field rejects the payload.
    ///
    /// ```
    /// use keepsake::WifiCredentials;
    ///
    /// let creds = WifiCredentials::parse("WIFI:S:cam\\;net;P:hunter2;;").unwrap();
    /// assert_eq!(creds.ssid.as_str(), "cam;net");
    /// assert_eq!(creds.password.as_str(), "hunter2");
    /// ```
    pub fn parse(payload: &str) -> Result<Self, WifiParseError> {
        let mut body = payload.strip_prefix("WIFI:").ok_or(WifiParseError::NotWifi)?;
        let mut creds = WifiCredentials::default();
        let mut found_ssid = false;
        while !body.is_empty() {
            let (field, rest) = split_field(body);
            body = rest;
            let Some((key, raw)) = field.split_once(':') else {
                continue;
            };
            match key {
                "S" => {
                    unescape_into(raw, &mut creds.ssid)?;
                    found_ssid = true;
                }
                "P" => unescape_into(raw, &mut creds.password)?,
                "T" => creds.security = WifiSecurity::from_field(raw),
                "H" => creds.hidden = raw.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }
        if !found_ssid || creds.ssid.is_empty() {
            return Err(WifiParseError::MissingSsid);
        }
        Ok(creds)
    }
}

/// Split at the first unescaped `;`. Both delimiters are ASCII, so the
/// byte scan never lands inside a multi-byte character.
fn split_field(s: &str) -> (&str, &str) {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() => i += 2,
            b';' => return (&s[..i], &s[i + 1..]),
            _ => i += 1,
        }
    }
    (s, "")
}

/// Copy `raw` into `out`, dropping the backslash from every escape pair.
fn unescape_into<const N: usize>(raw: &str, out: &mut String<N>) -> Result<(), WifiParseError> {
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        let c = if c == '\\' {
            chars.next().unwrap_or('\\')
        } else {
            c
        };
        out.push(c).map_err(|_| WifiParseError::FieldTooLong)?;
    }
    Ok(())
}
