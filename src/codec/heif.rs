//! ISO-BMFF `ftyp` sniffing for HEIC/HEIF images.

/// Upper bound on the bytes inspected; the `ftyp` box sits at the start of the file.
pub const SNIFF_LIMIT: usize = 4096;

const HEIC_BRANDS: &[&[u8; 4]] =
    &[b"heic", b"heix", b"hevc", b"hevx", b"heim", b"heis", b"hevm", b"hevs"];
const GENERIC_BRANDS: &[&[u8; 4]] = &[b"mif1", b"msf1"];
const AVIF_BRANDS: &[&[u8; 4]] = &[b"avif", b"avis"];

/// Major brand plus compatible brands of a leading `ftyp` box.
pub fn ftyp_brands(bytes: &[u8]) -> Option<([u8; 4], Vec<[u8; 4]>)> {
    let bytes = &bytes[..bytes.len().min(SNIFF_LIMIT)];
    if bytes.len() < 16 || &bytes[4..8] != b"ftyp" {
        return None;
    }

    let declared = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    // 0 means "to end of data", 1 means a 64-bit size follows; both just mean "use what we have"
    let box_end = match declared {
        0 | 1 => bytes.len(),
        size if size < 16 => return None,
        size => size.min(bytes.len()),
    };

    let major = [bytes[8], bytes[9], bytes[10], bytes[11]];
    let compatible = bytes[16..box_end]
        .chunks_exact(4)
        .map(|chunk| [chunk[0], chunk[1], chunk[2], chunk[3]])
        .collect();

    Some((major, compatible))
}

pub fn is_heif_container(bytes: &[u8]) -> bool {
    let Some((major, compatible)) = ftyp_brands(bytes) else {
        return false;
    };

    let in_set = |brand: &[u8; 4], set: &[&[u8; 4]]| set.iter().any(|b| *b == brand);

    if in_set(&major, AVIF_BRANDS) {
        return false;
    }
    if in_set(&major, HEIC_BRANDS) {
        return true;
    }
    if in_set(&major, GENERIC_BRANDS) {
        return !compatible.iter().any(|brand| in_set(brand, AVIF_BRANDS));
    }

    compatible.iter().any(|brand| in_set(brand, HEIC_BRANDS))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A minimal `ftyp` box followed by a few bytes of payload.
    pub(crate) fn ftyp(major: &[u8; 4], compatible: &[&[u8; 4]]) -> Vec<u8> {
        let size = 16 + 4 * compatible.len();
        let mut bytes = Vec::with_capacity(size + 8);
        bytes.extend_from_slice(&(size as u32).to_be_bytes());
        bytes.extend_from_slice(b"ftyp");
        bytes.extend_from_slice(major);
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        for brand in compatible {
            bytes.extend_from_slice(*brand);
        }
        bytes.extend_from_slice(b"\0\0\0\x08meta");
        bytes
    }

    #[test]
    fn test_detects_heic_brands() {
        assert!(is_heif_container(&ftyp(b"heic", &[b"mif1", b"heic"])));
        assert!(is_heif_container(&ftyp(b"heix", &[])));
        assert!(is_heif_container(&ftyp(b"mif1", &[b"heic"])));
        assert!(is_heif_container(&ftyp(b"msf1", &[b"hevc"])));
        assert!(is_heif_container(&ftyp(b"isom", &[b"heic"])));
    }

    #[test]
    fn test_rejects_other_containers() {
        assert!(!is_heif_container(&ftyp(b"avif", &[b"mif1"])));
        assert!(!is_heif_container(&ftyp(b"mif1", &[b"avif"])));
        assert!(!is_heif_container(&ftyp(b"isom", &[b"mp41"])));
        assert!(!is_heif_container(b"\xFF\xD8\xFF\xE0 jpeg data"));
        assert!(!is_heif_container(b""));
    }

    #[test]
    fn test_brand_extraction() {
        let (major, compatible) = ftyp_brands(&ftyp(b"heic", &[b"mif1", b"heic"])).unwrap();
        assert_eq!(&major, b"heic");
        assert_eq!(compatible, vec![*b"mif1", *b"heic"]);

        let mut truncated = ftyp(b"heic", &[b"mif1"]);
        truncated[3] = 8; // Declared size below the fixed header
        assert!(ftyp_brands(&truncated).is_none());
    }
}
