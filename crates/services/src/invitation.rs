//! Classroom invitation codes.
//!
//! A code is 8 uppercase base-36 characters derived from 6 random bytes:
//! each byte is rendered as two base-36 digits, the 12 digits are cut to 8
//! and uppercased.

use std::sync::Arc;

use bson::doc;
use rand::{CryptoRng, Rng};
use studyx_db::models::Classroom;
use tracing::debug;

use crate::dao::base::{Backend, BaseDao, DaoResult};

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const RANDOM_BYTES: usize = 6;

pub fn generate_code<R: Rng + CryptoRng + ?Sized>(rng: &mut R) -> String {
    let mut bytes = [0u8; RANDOM_BYTES];
    rng.fill_bytes(&mut bytes);

    let mut rendered = String::with_capacity(RANDOM_BYTES * 2);
    for b in bytes {
        // 255 < 36 * 36, so two digits always suffice.
        rendered.push(DIGITS[(b / 36) as usize] as char);
        rendered.push(DIGITS[(b % 36) as usize] as char);
    }
    rendered.truncate(Classroom::CODE_LEN);
    rendered.to_uppercase()
}

/// Trim + uppercase, as applied to user-entered codes before lookup.
pub fn normalize_code(input: &str) -> String {
    input.trim().to_uppercase()
}

type Generator = Arc<dyn Fn() -> String + Send + Sync>;

/// Issues codes not yet held by any classroom.
#[derive(Clone)]
pub struct InvitationCodeIssuer {
    classrooms: Arc<BaseDao<Classroom>>,
    generator: Generator,
}

impl InvitationCodeIssuer {
    pub fn new(backend: &Backend) -> Self {
        Self::with_generator(backend, Arc::new(|| generate_code(&mut rand::rng())))
    }

    pub fn with_generator(backend: &Backend, generator: Generator) -> Self {
        Self {
            classrooms: Arc::new(BaseDao::new(backend, Classroom::COLLECTION)),
            generator,
        }
    }

    /// Draws codes until one is unused. The store's unique key on
    /// `invitation_code` still guards the window before the classroom insert.
    pub async fn issue(&self) -> DaoResult<String> {
        loop {
            let code = (self.generator)();
            let taken = self
                .classrooms
                .count(doc! { "invitation_code": code.as_str() })
                .await?
                > 0;
            if !taken {
                return Ok(code);
            }
            debug!(%code, "Invitation code collision, regenerating");
        }
    }
}
