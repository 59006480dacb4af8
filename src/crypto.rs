// Copyright 2023-2025 StorSwift Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cryptographic primitives consumed by the verifier.
//!
//! Verification is delegated to [energon], messages are built by the beacon
//! digest of the scheme:
//!  - v1: digest of the scheme itself, chained schemes bind the previous signature.
//!  - v2: unchained digest, the previous signature is not part of the message.
pub use energon::drand::traits::DrandScheme as Scheme;
pub use energon::points::KeyPoint;
pub use energon::points::SigPoint;

use energon::drand::schemes::SigsOnG1Scheme;
use energon::drand::traits::BeaconDigest;
use energon::traits::Affine;
use sha2::Digest;
use sha2::Sha256;
use std::fmt::Display;
use std::marker::PhantomData;

/// Digest of rounds which do not depend on the previous signature.
type UnchainedBeacon = <SigsOnG1Scheme as Scheme>::Beacon;

const SHORT_SIG_BYTES: usize = 3;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CryptoError {
    #[error("failed to deserialize signature")]
    InvalidSignatureEncoding,
    #[error("failed to deserialize public key")]
    InvalidKeyEncoding,
    #[error("invalid signature")]
    InvalidSignature,
}

/// Ephemeral record binding a round signature to the previous one.
pub struct BeaconLink<'a> {
    pub previous_sig: &'a [u8],
    pub round: u64,
    pub signature: &'a [u8],
}

impl Display for BeaconLink<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ round: {}, sig: {}, prev_sig: {} }}",
            self.round,
            short_hex(self.signature),
            short_hex(self.previous_sig)
        )
    }
}

pub fn short_hex(bytes: &[u8]) -> String {
    hex::encode(bytes.get(..SHORT_SIG_BYTES).unwrap_or(bytes))
}

/// Primitive operations over the verification key of a chain.
pub trait Primitives: Send + Sync + 'static {
    type Key: Clone + Send + Sync + 'static;

    fn verify_v1(&self, key: &Self::Key, link: &BeaconLink) -> Result<(), CryptoError>;

    fn verify_v2(&self, key: &Self::Key, link: &BeaconLink) -> Result<(), CryptoError>;

    /// Randomness is the hash of a verified signature.
    fn randomness_from(&self, signature: &[u8]) -> Vec<u8> {
        Sha256::digest(signature).to_vec()
    }

    fn clone_key(&self, key: &Self::Key) -> Self::Key {
        key.clone()
    }

    fn decode_key(&self, bytes: &[u8]) -> Result<Self::Key, CryptoError>;
}

/// BLS primitives for drand scheme `S`.
pub struct Bls<S: Scheme> {
    _scheme: PhantomData<fn() -> S>,
}

impl<S: Scheme> Bls<S> {
    pub fn new() -> Self {
        Self {
            _scheme: PhantomData,
        }
    }

    fn check(key: &KeyPoint<S>, signature: &[u8], msg: &[u8]) -> Result<(), CryptoError> {
        let sig: SigPoint<S> =
            Affine::deserialize(signature).map_err(|_| CryptoError::InvalidSignatureEncoding)?;

        S::bls_verify(key, &sig, msg).map_err(|_| CryptoError::InvalidSignature)
    }
}

impl<S: Scheme> Default for Bls<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Scheme> Primitives for Bls<S>
where
    KeyPoint<S>: Clone + Send + Sync + 'static,
{
    type Key = KeyPoint<S>;

    fn verify_v1(&self, key: &Self::Key, link: &BeaconLink) -> Result<(), CryptoError> {
        let msg = S::Beacon::digest(link.previous_sig, link.round);
        Self::check(key, link.signature, &msg)
    }

    fn verify_v2(&self, key: &Self::Key, link: &BeaconLink) -> Result<(), CryptoError> {
        let msg = UnchainedBeacon::digest(&[], link.round);
        Self::check(key, link.signature, &msg)
    }

    fn decode_key(&self, bytes: &[u8]) -> Result<Self::Key, CryptoError> {
        Affine::deserialize(bytes).map_err(|_| CryptoError::InvalidKeyEncoding)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use energon::drand::schemes::DefaultScheme;
    use energon::traits::ScalarField;

    fn sign<S: Scheme>(msg: &[u8], private: &S::Scalar) -> Vec<u8> {
        let sig = S::bls_sign(msg, private).unwrap();
        Affine::serialize(&sig).unwrap().into()
    }

    #[test]
    fn bls_links() {
        let private = <DefaultScheme as Scheme>::Scalar::random();
        let key = DefaultScheme::sk_to_pk(&private);
        let bls = Bls::<DefaultScheme>::new();
        let prev = vec![7u8; 32];

        let msg = <DefaultScheme as Scheme>::Beacon::digest(&prev, 5);
        let sig = sign::<DefaultScheme>(&msg, &private);
        let link = BeaconLink {
            previous_sig: &prev,
            round: 5,
            signature: &sig,
        };
        assert!(bls.verify_v1(&key, &link).is_ok());
        // Same signature does not hold for another round or under the v2 message.
        let shifted = BeaconLink { round: 6, ..link };
        assert_eq!(
            bls.verify_v1(&key, &shifted),
            Err(CryptoError::InvalidSignature)
        );
        assert!(bls.verify_v2(&key, &shifted).is_err());

        let msg = UnchainedBeacon::digest(&[], 9);
        let sig_v2 = sign::<DefaultScheme>(&msg, &private);
        let any_prev = BeaconLink {
            previous_sig: &prev,
            round: 9,
            signature: &sig_v2,
        };
        assert!(bls.verify_v2(&key, &any_prev).is_ok());

        let garbage = BeaconLink {
            previous_sig: &prev,
            round: 5,
            signature: &[1, 2, 3],
        };
        assert_eq!(
            bls.verify_v1(&key, &garbage),
            Err(CryptoError::InvalidSignatureEncoding)
        );
    }

    #[test]
    fn unchained_scheme_ignores_previous_signature() {
        assert!(<DefaultScheme as Scheme>::Beacon::is_chained());
        assert!(!UnchainedBeacon::is_chained());

        let private = <SigsOnG1Scheme as Scheme>::Scalar::random();
        let key = SigsOnG1Scheme::sk_to_pk(&private);
        let bls = Bls::<SigsOnG1Scheme>::new();

        let msg = <SigsOnG1Scheme as Scheme>::Beacon::digest(&[], 3);
        let sig = sign::<SigsOnG1Scheme>(&msg, &private);
        for prev in [&[][..], &[1u8; 48][..]] {
            let link = BeaconLink {
                previous_sig: prev,
                round: 3,
                signature: &sig,
            };
            assert!(bls.verify_v1(&key, &link).is_ok());
            assert!(bls.verify_v2(&key, &link).is_ok());
        }
    }

    #[test]
    fn randomness_is_sha256_of_signature() {
        let bls = Bls::<DefaultScheme>::new();
        let r = bls.randomness_from(b"signature");
        assert_eq!(r, Sha256::digest(b"signature").to_vec());
        assert_eq!(short_hex(&[0xab, 0xcd, 0xef, 0x01]), "abcdef");
        assert_eq!(short_hex(&[0xab]), "ab");
    }
}
