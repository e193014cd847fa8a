use crate::error::{Result, VaultError};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// In-memory lock gate. While armed, the store refuses every entry
/// operation. Only a digest of the master password is kept.
#[derive(Debug, Default)]
pub struct LockGate {
    armed: Mutex<Option<Zeroizing<Vec<u8>>>>,
}

impl LockGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self) -> bool {
        self.armed.lock().is_some()
    }

    pub fn ensure_unlocked(&self) -> Result<()> {
        if self.is_locked() {
            return Err(VaultError::Locked);
        }
        Ok(())
    }

    pub fn lock(&self, password: &str) -> Result<()> {
        if password.is_empty() {
            return Err(VaultError::InvalidMasterPassword);
        }
        let mut armed = self.armed.lock();
        if armed.is_some() {
            return Err(VaultError::AlreadyLocked);
        }
        *armed = Some(digest(password));
        Ok(())
    }

    /// Unlocking an unlocked gate succeeds.
    pub fn unlock(&self, password: &str) -> Result<()> {
        let mut armed = self.armed.lock();
        let matches = match armed.as_ref() {
            None => return Ok(()),
            Some(expected) => constant_time_eq(expected, &digest(password)),
        };
        if !matches {
            return Err(VaultError::InvalidMasterPassword);
        }
        *armed = None;
        Ok(())
    }
}

fn digest(password: &str) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(Sha256::digest(password.as_bytes()).to_vec())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_then_unlock() {
        let gate = LockGate::new();
        assert!(gate.ensure_unlocked().is_ok());
        gate.lock("master").unwrap();
        assert!(matches!(gate.ensure_unlocked(), Err(VaultError::Locked)));
        assert!(matches!(gate.unlock("wrong"), Err(VaultError::InvalidMasterPassword)));
        assert!(gate.is_locked());
        gate.unlock("master").unwrap();
        assert!(!gate.is_locked());
    }

    #[test]
    fn double_lock_rejected() {
        let gate = LockGate::new();
        gate.lock("a").unwrap();
        assert!(matches!(gate.lock("b"), Err(VaultError::AlreadyLocked)));
    }

    #[test]
    fn empty_master_password_rejected() {
        let gate = LockGate::new();
        assert!(matches!(gate.lock(""), Err(VaultError::InvalidMasterPassword)));
        assert!(!gate.is_locked());
    }

    #[test]
    fn unlock_when_open_is_noop() {
        assert!(LockGate::new().unlock("anything").is_ok());
    }
}
