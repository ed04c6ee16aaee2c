use strata_core::StrataError;

/// Compress a byte payload as a self-contained zstd frame at `level`.
pub fn compress(data: &[u8], level: i32) -> Result<Vec<u8>, StrataError> {
    Ok(zstd::encode_all(data, level)?)
}

/// Decompress a zstd frame produced by [`compress`].
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, StrataError> {
    zstd::decode_all(data).map_err(|e| StrataError::decompression(e.to_string()))
}
