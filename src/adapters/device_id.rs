//! Device identity derived from the ESP32 factory MAC address.
//!
//! The session token that prefixes every per-unit topic is derived from
//! the MAC with HMAC-SHA256, so it is stable across reboots of one unit,
//! distinct between units, and never exposes the MAC itself.

use core::fmt::Write;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Session token characters: topic-safe, case-sensitive.
const TOKEN_ALPHABET: &[u8; 62] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Token length; matches the printed MAC (`AA:BB:CC:DD:EE:FF`).
pub const TOKEN_LEN: usize = 17;

const TOKEN_KEY: &[u8] = b"smartlocker-session";

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// `AA:BB:CC:DD:EE:FF`, uppercase.
pub fn mac_string(mac: &MacAddress) -> heapless::String<17> {
    let mut s = heapless::String::<17>::new();
    for (i, b) in mac.iter().enumerate() {
        let sep = if i == 0 { "" } else { ":" };
        let _ = write!(s, "{}{:02X}", sep, b);
    }
    s
}

/// Derive the alphanumeric session token for `mac`.
pub fn session_token(mac: &MacAddress) -> heapless::String<TOKEN_LEN> {
    let digest = hmac_sha256::HMAC::mac(mac_string(mac).as_bytes(), TOKEN_KEY);
    let mut token = heapless::String::<TOKEN_LEN>::new();
    for b in &digest[..TOKEN_LEN] {
        let _ = token.push(char::from(TOKEN_ALPHABET[usize::from(*b) % TOKEN_ALPHABET.len()]));
    }
    token
}
