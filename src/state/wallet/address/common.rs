use sha3::digest::ExtendableOutput;
use sha3::digest::Update;
use sha3::Digest;
use sha3::Sha3_256;
use sha3::Shake256;

/// Shake256 with a caller-chosen output length.
pub fn shake256<const NUM_OUT_BYTES: usize>(input: impl AsRef<[u8]>) -> [u8; NUM_OUT_BYTES] {
    let mut hasher = Shake256::default();
    hasher.update(input.as_ref());

    let mut result = [0u8; NUM_OUT_BYTES];
    hasher.finalize_xof_into(&mut result);
    result
}

pub fn sha3_256(input: impl AsRef<[u8]>) -> [u8; 32] {
    Sha3_256::digest(input.as_ref()).into()
}

/// Keyed pseudo-random function separating derived values by `domain`.
pub(crate) fn prf(domain: u8, key: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    Digest::update(&mut hasher, [domain]);
    Digest::update(&mut hasher, key);
    hasher.finalize().into()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
pub(super) mod tests {
    use super::*;

    #[test]
    fn shake256_output_length_is_respected() {
        let short = shake256::<20>(b"input");
        let long = shake256::<64>(b"input");

        assert_eq!(short, long[..20]);
    }

    #[test]
    fn prf_domains_are_separated() {
        let key = [3u8; 32];
        assert_ne!(prf(0, &key), prf(1, &key));
        assert_eq!(prf(0, &key), prf(0, &key));
    }

    #[test]
    fn sha3_256_differs_from_prf() {
        let key = [3u8; 32];
        assert_ne!(sha3_256(key), prf(0, &key));
    }
}
