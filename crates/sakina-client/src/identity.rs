use rand::seq::IndexedRandom;
use sha2::{Digest, Sha256};
use tracing::debug;

use sakina_types::models::{Identity, MAX_AUTHOR_CHARS};

use crate::error::{BoardError, Result};
use crate::profile::LocalProfileStore;
use crate::store::check_length;

/// Shortest accepted secret word, in characters after trimming.
pub const MIN_SECRET_CHARS: usize = 4;

const ADJECTIVES: [&str; 8] = [
    "Sincere", "Humble", "Grateful", "Patient", "Hopeful", "Faithful", "Peaceful", "Devoted",
];
const NOUNS: [&str; 8] = [
    "Servant", "Believer", "Soul", "Heart", "Brother", "Sister", "Traveller", "Seeker",
];

/// One-way digest of a secret word: lowercase hex SHA-256 of the trimmed,
/// lowercased word. Posting and delete confirmation must both use this.
pub fn hash_secret(word: &str) -> String {
    let normalized = word.trim().to_lowercase();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// A pseudonym such as "Patient Seeker".
pub fn generate_pseudonym() -> String {
    let mut rng = rand::rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("Sincere");
    let noun = NOUNS.choose(&mut rng).copied().unwrap_or("Soul");
    format!("{} {}", adjective, noun)
}

/// Produces and persists the local author identity.
#[derive(Clone)]
pub struct IdentityGate {
    profile: LocalProfileStore,
}

impl IdentityGate {
    pub fn new(profile: LocalProfileStore) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &LocalProfileStore {
        &self.profile
    }

    /// The persisted identity, if one was ever saved on this device.
    pub fn get_identity(&self) -> Result<Option<Identity>> {
        self.profile.load_identity()
    }

    /// Validate, digest and persist a new identity, replacing any previous one.
    ///
    /// Anonymous identities with no name get a generated pseudonym. The
    /// plaintext secret word is never stored.
    pub fn save_identity(&self, name: &str, secret_word: &str, anonymous: bool) -> Result<Identity> {
        let identity = build_identity(name, secret_word, anonymous)?;
        self.profile.save_identity(&identity)?;
        Ok(identity)
    }
}

fn build_identity(name: &str, secret_word: &str, anonymous: bool) -> Result<Identity> {
    if secret_word.trim().chars().count() < MIN_SECRET_CHARS {
        return Err(BoardError::validation(format!(
            "secret word must be at least {} characters",
            MIN_SECRET_CHARS
        )));
    }

    let name = name.trim();
    let name = match (name.is_empty(), anonymous) {
        (true, false) => return Err(BoardError::validation("name is required unless posting anonymously")),
        (true, true) => {
            let generated = generate_pseudonym();
            debug!("Generated pseudonym '{}'", generated);
            generated
        }
        (false, _) => name.to_string(),
    };
    check_length(&name, MAX_AUTHOR_CHARS, "name")?;

    Ok(Identity {
        name,
        secret_hash: hash_secret(secret_word),
        anonymous,
    })
}
