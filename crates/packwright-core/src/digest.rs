//! Digests and size of a finished archive file.
//!
//! These functions must run after the archiving session is closed; reading a
//! file that is still being written yields partial results.

use md5::Md5;
use sha2::Digest;
use sha2::Sha256;
use std::fs;
use std::io;
use std::io::Read;
use std::path::Path;

/// Computes the hex-encoded MD5 digest of everything `reader` yields.
///
/// MD5 is kept for fingerprinting and deduplication only; use
/// [`sha256_hex`] where tampering matters.
///
/// # Errors
///
/// Returns an error if reading fails.
///
/// # Examples
///
/// ```
/// use packwright_core::digest::md5_hex;
///
/// let digest = md5_hex(&mut "hello".as_bytes())?;
/// assert_eq!(digest, "5d41402abc4b2a76b9719d911017c592");
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn md5_hex<R: Read + ?Sized>(reader: &mut R) -> io::Result<String> {
    let mut hasher = Md5::new();
    io::copy(reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Computes the hex-encoded SHA-256 digest of everything `reader` yields.
///
/// # Errors
///
/// Returns an error if reading fails.
///
/// # Examples
///
/// ```
/// use packwright_core::digest::sha256_hex;
///
/// let digest = sha256_hex(&mut "hello".as_bytes())?;
/// assert_eq!(
///     digest,
///     "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
/// );
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn sha256_hex<R: Read + ?Sized>(reader: &mut R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    io::copy(reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Returns the size of the file at `path` in bytes without reading it.
///
/// # Errors
///
/// Returns an error if the path cannot be stat'ed.
pub fn file_size(path: &Path) -> io::Result<u64> {
    fs::metadata(path).map(|metadata| metadata.len())
}
