//! PARTUUID synthesis for DOS (MBR) partition tables.

/// Builds the `SSSSSSSS-NN` identifier Linux assigns to MBR partitions:
/// the disk signature as 8 lowercase hex digits and the 1-based slot number
/// as 2 decimal digits.
///
/// Ordinals above 99 would widen the second field; primary tables never get there.
pub fn synthesize_partuuid(signature: u32, ordinal: u32) -> String {
    format!("{:08x}-{:02}", signature, ordinal)
}
