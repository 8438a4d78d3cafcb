//! ECDSA keys and transfer signatures over secp256k1.
//!
//! An address is the hex of a compressed public key, so the `sender` field
//! of a transaction doubles as its verification key.

use rand::rngs::OsRng;
use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};

use crate::error::CryptoError;

/// Hex-encoded keypair. `address` is the compressed public key.
#[derive(Clone, Debug)]
pub struct Keypair {
    pub secret_hex: String,
    pub address: String,
}

pub fn generate_keypair() -> Keypair {
    let secp = Secp256k1::new();
    let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
    Keypair {
        secret_hex: hex::encode(secret_key.secret_bytes()),
        address: hex::encode(public_key.serialize()),
    }
}

/// Canonical signing payload for a transfer, shared by signer and verifier.
pub fn transfer_message(sender: &str, receiver: &str, amount: i64) -> String {
    format!("{sender}|{receiver}|{amount}")
}

fn message_digest(message: &str) -> Message {
    let mut hasher = Sha256::new();
    hasher.update(message.as_bytes());
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    Message::from_digest(digest)
}

/// Sign `message` with a hex secret key; returns the DER signature as hex.
pub fn sign_transfer(secret_hex: &str, message: &str) -> Result<String, CryptoError> {
    let bytes = hex::decode(secret_hex).map_err(|_| CryptoError::InvalidKey)?;
    let secret_key = SecretKey::from_slice(&bytes).map_err(|_| CryptoError::InvalidKey)?;
    let secp = Secp256k1::new();
    let signature = secp.sign_ecdsa(&message_digest(message), &secret_key);
    Ok(hex::encode(signature.serialize_der()))
}

/// Check `signature_hex` against `address` over `message`.
pub fn verify_transfer(
    address: &str,
    signature_hex: &str,
    message: &str,
) -> Result<(), CryptoError> {
    let signature_bytes = hex::decode(signature_hex).map_err(|_| CryptoError::InvalidSignature)?;
    let signature =
        Signature::from_der(&signature_bytes).map_err(|_| CryptoError::InvalidSignature)?;
    let key_bytes = hex::decode(address).map_err(|_| CryptoError::InvalidKey)?;
    let public_key = PublicKey::from_slice(&key_bytes).map_err(|_| CryptoError::InvalidKey)?;
    let secp = Secp256k1::verification_only();
    secp.verify_ecdsa(&message_digest(message), &signature, &public_key)
        .map_err(|_| CryptoError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let keypair = generate_keypair();
        let message = transfer_message(&keypair.address, "bob", 10);
        let signature = sign_transfer(&keypair.secret_hex, &message).unwrap();
        assert!(verify_transfer(&keypair.address, &signature, &message).is_ok());
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let keypair = generate_keypair();
        let other = generate_keypair();
        let message = transfer_message(&keypair.address, "bob", 10);
        let signature = sign_transfer(&keypair.secret_hex, &message).unwrap();
        assert_eq!(
            verify_transfer(&other.address, &signature, &message),
            Err(CryptoError::VerificationFailed)
        );
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let keypair = generate_keypair();
        let message = transfer_message(&keypair.address, "bob", 10);
        let signature = sign_transfer(&keypair.secret_hex, &message).unwrap();
        let tampered = transfer_message(&keypair.address, "bob", 1000);
        assert_eq!(
            verify_transfer(&keypair.address, &signature, &tampered),
            Err(CryptoError::VerificationFailed)
        );
    }

    #[test]
    fn garbage_material_is_classified() {
        let keypair = generate_keypair();
        let message = transfer_message(&keypair.address, "bob", 10);
        let signature = sign_transfer(&keypair.secret_hex, &message).unwrap();
        assert_eq!(
            verify_transfer(&keypair.address, "zz-not-hex", &message),
            Err(CryptoError::InvalidSignature)
        );
        assert_eq!(
            verify_transfer("zz-not-hex", &signature, &message),
            Err(CryptoError::InvalidKey)
        );
        assert_eq!(
            sign_transfer("zz-not-hex", &message),
            Err(CryptoError::InvalidKey)
        );
    }
}
