use std::io::{self, BufRead, Write};

use color_eyre::Result;
use keepsafe_core::{credentials::CredentialRecord, storage::CredentialRepository};
use keepsafe_vault::{
    generator::{generate_password, DEFAULT_PASSWORD_LENGTH},
    Vault,
};
use serde::Serialize;
use tracing::info;

use crate::config::Config;

/// How the password for `add` is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordSource {
    Given(String),
    Generate(usize),
    Stdin,
}

/// Listing row; the password stays an encrypted token.
#[derive(Debug, Serialize)]
struct ListedCredential<'a> {
    id: i64,
    website: &'a str,
    username: &'a str,
    ciphertext: &'a str,
    created_at: String,
}

impl<'a> From<&'a CredentialRecord> for ListedCredential<'a> {
    fn from(record: &'a CredentialRecord) -> Self {
        Self {
            id: record.id,
            website: &record.website,
            username: &record.username,
            ciphertext: &record.ciphertext,
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

/// Generated password length: explicit flag, then config, then the default.
pub fn generator_length(flag: Option<usize>, config: &Config) -> usize {
    flag.or_else(|| config.generator.as_ref().and_then(|g| g.length))
        .unwrap_or(DEFAULT_PASSWORD_LENGTH)
}

pub fn add<R: CredentialRepository>(
    vault: &Vault<R>,
    website: &str,
    username: &str,
    source: PasswordSource,
    out: &mut impl Write,
) -> Result<i64> {
    let (password, generated) = match source {
        PasswordSource::Given(password) => (password, false),
        PasswordSource::Generate(length) => (generate_password(length).to_string(), true),
        PasswordSource::Stdin => (read_password(&mut io::stdin().lock())?, false),
    };

    let id = vault.add_credential(website, username, &password)?;
    writeln!(out, "Added credential {id} for {}", website.trim())?;
    if generated {
        writeln!(out, "Generated password: {password}")?;
    }
    Ok(id)
}

pub fn list<R: CredentialRepository>(
    vault: &Vault<R>,
    query: Option<&str>,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let records = match query {
        Some(q) => vault.search_credentials(q)?,
        None => vault.list_credentials()?,
    };

    if json {
        let rows: Vec<ListedCredential<'_>> = records.iter().map(ListedCredential::from).collect();
        writeln!(out, "{}", serde_json::to_string_pretty(&rows)?)?;
        return Ok(());
    }

    if records.is_empty() {
        writeln!(
            out,
            "No credentials found. Add one with `keepsafe add <website> <username>`."
        )?;
        return Ok(());
    }
    for record in &records {
        writeln!(
            out,
            "{:>5}  {:<30} {:<30} {}",
            record.id,
            record.website,
            record.username,
            record.created_at.format("%Y-%m-%d %H:%M")
        )?;
    }
    Ok(())
}

/// Print the decrypted password, or the sentinel if it cannot be decrypted.
pub fn reveal<R: CredentialRepository>(
    vault: &Vault<R>,
    id: i64,
    out: &mut impl Write,
) -> Result<()> {
    let record = vault
        .find_credential(id)?
        .ok_or_else(|| color_eyre::eyre::eyre!("no credential with id {id}"))?;
    let password = vault.reveal_or_sentinel(&record.ciphertext);
    writeln!(out, "{}", password.as_str())?;
    Ok(())
}

pub fn delete<R: CredentialRepository>(
    vault: &Vault<R>,
    id: i64,
    out: &mut impl Write,
) -> Result<()> {
    vault.delete_credential(id)?;
    writeln!(out, "Deleted credential {id}")?;
    Ok(())
}

/// Store, reveal and delete a probe credential.
pub fn health<R: CredentialRepository>(vault: &Vault<R>) -> Result<()> {
    let probe = generate_password(DEFAULT_PASSWORD_LENGTH);
    let id = vault.add_credential("keepsafe-health-probe", "probe", &probe)?;
    let stored = vault.find_credential(id)?;
    vault.delete_credential(id)?;

    let record = stored.ok_or_else(|| color_eyre::eyre::eyre!("probe credential vanished"))?;
    let revealed = vault.reveal_password(&record.ciphertext)?;
    if revealed != probe {
        color_eyre::eyre::bail!("vault round-trip failed");
    }
    info!("health probe succeeded");
    Ok(())
}

/// Read one line, dropping the trailing newline only.
fn read_password(reader: &mut impl BufRead) -> Result<String> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    let trimmed = line.trim_end_matches(['\n', '\r']).len();
    line.truncate(trimmed);
    Ok(line)
}
