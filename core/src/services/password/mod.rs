//! Password hashing with bcrypt

mod hasher;

pub use hasher::{PasswordHasher, BCRYPT_MAX_PASSWORD_BYTES};
