//! Random names for jobs, databases and helm releases, and secure passwords

use anyhow::{Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use rand::seq::IndexedRandom;

const MAX_UNIQUE_NAME_ATTEMPTS: usize = 10;

const ADJECTIVES: &str = include_str!("../../resources/adjectives.txt");
const ANIMALS: &str = include_str!("../../resources/animals.txt");

fn words(list: &'static str) -> Vec<&'static str> {
    list.lines()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .collect()
}

/// Generate an `<adjective>-<animal>` name not present in `existing`
pub fn unique_name(existing: &[String]) -> Result<String> {
    let adjectives = words(ADJECTIVES);
    let animals = words(ANIMALS);
    let mut rng = rand::rng();

    pick_unique(existing, || {
        let adjective = adjectives.choose(&mut rng).copied().unwrap_or("plain");
        let animal = animals.choose(&mut rng).copied().unwrap_or("animal");
        format!("{}-{}", adjective, animal)
    })
}

fn pick_unique(existing: &[String], mut candidate: impl FnMut() -> String) -> Result<String> {
    for _ in 0..MAX_UNIQUE_NAME_ATTEMPTS {
        let name = candidate();
        if !existing.contains(&name) && !unallowed_name(&name) {
            return Ok(name);
        }
    }

    Err(anyhow!("Too many failed unique name attempts"))
}

fn unallowed_name(name: &str) -> bool {
    // Robin always keeps his cool
    name == "exasperated-robin"
}

/// 32 random bytes encoded as URL-safe base64, safe to embed in URLs and expect scripts
pub fn secure_password() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
