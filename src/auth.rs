//! Thin seam over the password hasher. The rest of the core treats the
//! verifier's answer as authoritative and never sees raw digests.

use crate::error::AppError;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

pub fn verify_password(password: &str, digest: &str) -> Result<bool, AppError> {
    Ok(bcrypt::verify(password, digest)?)
}
