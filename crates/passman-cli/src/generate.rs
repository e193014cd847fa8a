use anyhow::{anyhow, Result};
use rand::Rng;

const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SYMBOLS: &str = "!@#$%^&*()-_=+{}[]|:;<>,.?/";
const DIGITS: &str = "0123456789";

#[derive(Debug, Clone, Default)]
pub struct Charset {
    pub uppercase: bool,
    pub symbols: bool,
    pub numbers: bool,
    pub exclude: String,
}

impl Charset {
    fn alphabet(&self) -> Vec<char> {
        let mut chars: String = LOWERCASE.to_string();
        if self.uppercase {
            chars.push_str(UPPERCASE);
        }
        if self.symbols {
            chars.push_str(SYMBOLS);
        }
        if self.numbers {
            chars.push_str(DIGITS);
        }
        chars.chars().filter(|c| !self.exclude.contains(*c)).collect()
    }
}

pub fn generate_password(length: usize, charset: &Charset) -> Result<String> {
    let alphabet = charset.alphabet();
    if alphabet.is_empty() {
        return Err(anyhow!("every candidate character is excluded"));
    }
    let mut rng = rand::thread_rng();
    Ok((0..length)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
        .collect())
}
