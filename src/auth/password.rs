use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::task::spawn_blocking;

use crate::AppResult;

type HmacSha256 = Hmac<Sha256>;

const ROUNDS: u32 = 10_000;
const SALT_LEN: usize = 16;

fn stretch(salt: &[u8], password: &str) -> [u8; 32] {
    let mut digest = [0u8; 32];
    let mut input = password.as_bytes().to_vec();
    for _ in 0..ROUNDS {
        let mut mac = HmacSha256::new_from_slice(salt).expect("hmac accepts any key length");
        mac.update(&input);
        digest.copy_from_slice(&mac.finalize().into_bytes());
        input = digest.to_vec();
    }
    digest
}

/// Hashes on the blocking pool; the stretch loop is too slow for the executor.
pub async fn hash_password(password: String) -> AppResult<String> {
    Ok(spawn_blocking(move || hash(&password)).await?)
}

pub async fn verify_password(password: String, stored: String) -> AppResult<bool> {
    Ok(spawn_blocking(move || verify(&password, &stored)).await?)
}

/// `salt$digest`, both hex.
fn hash(password: &str) -> String {
    let salt: [u8; SALT_LEN] = rand::random();
    let digest = stretch(&salt, password);
    format!("{}${}", hex::encode(salt), hex::encode(digest))
}

fn verify(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt), hex::decode(expected)) else {
        return false;
    };
    let actual = stretch(&salt, password);

    expected.len() == actual.len()
        && expected
            .iter()
            .zip(actual.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_password_verifies() {
        let stored = hash("hunter22");
        assert!(verify("hunter22", &stored));
        assert!(!verify("hunter23", &stored));
    }

    #[test]
    fn same_password_gets_different_salts() {
        assert_ne!(hash("hunter22"), hash("hunter22"));
    }

    #[test]
    fn garbage_hashes_never_verify() {
        assert!(!verify("x", "not-a-hash"));
        assert!(!verify("x", "zz$zz"));
    }

    #[tokio::test]
    async fn hashing_runs_off_the_executor() {
        let stored = hash_password("hunter22".into()).await.unwrap();
        assert!(verify_password("hunter22".into(), stored.clone()).await.unwrap());
        assert!(!verify_password("hunter23".into(), stored).await.unwrap());
    }
}
