//! Decode command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use passkey_core::encoding::decode;
use passkey_core::{EncodedAssertion, EncodedRegistration};
use serde_json::Value;
use tracing::info;

use crate::utils::{
    algorithm_name, authenticator_data_summary, describe_flags, parse_submission, read_input,
    Submission,
};

/// Execute the decode command.
pub fn execute(input: PathBuf, webauthn: bool) -> Result<()> {
    let bytes = read_input(&input)?;
    info!(path = %input.display(), bytes = bytes.len(), "Read submission");

    let submission = parse_submission(&bytes)?;

    if webauthn {
        let json = match submission {
            Submission::Registration(r) => serde_json::to_string_pretty(
                &r.into_register_credential()
                    .context("Failed to decode registration for webauthn")?,
            )?,
            Submission::Assertion(a) => serde_json::to_string_pretty(
                &a.into_public_key_credential()
                    .context("Failed to decode assertion for webauthn")?,
            )?,
        };
        println!("{json}");
        return Ok(());
    }

    match submission {
        Submission::Registration(r) => print_registration(&r),
        Submission::Assertion(a) => print_assertion(&a),
    }
}

fn field(text: &str, name: &str) -> Result<Vec<u8>> {
    decode(text).with_context(|| format!("Failed to decode {name}"))
}

fn print_header(kind: &str, id: &str, raw_id: &str, attachment: Option<&str>) -> Result<()> {
    let raw_id = field(raw_id, "rawId")?;
    println!();
    println!("{}", kind.green().bold());
    println!("   {} {}", "Id:".dimmed(), id);
    println!("   {} {}", "Raw id:".dimmed(), hex::encode(&raw_id));
    println!(
        "   {} {}",
        "Attachment:".dimmed(),
        attachment.unwrap_or("unknown")
    );
    Ok(())
}

fn print_client_data(encoded: &str) -> Result<()> {
    let client_data = field(encoded, "clientDataJSON")?;
    let parsed: Value =
        serde_json::from_slice(&client_data).context("Failed to parse clientDataJSON")?;
    let get = |key: &str| parsed.get(key).and_then(Value::as_str).unwrap_or("-").to_string();
    println!("   {} {}", "Client data:".dimmed(), get("type"));
    println!("   {} {}", "Origin:".dimmed(), get("origin"));
    println!("   {} {}", "Challenge:".dimmed(), get("challenge"));
    Ok(())
}

fn print_authenticator_data(encoded: &str) -> Result<()> {
    let data = field(encoded, "authenticatorData")?;
    match authenticator_data_summary(&data) {
        Some((flags, counter)) => {
            println!("   {} {}", "Flags:".dimmed(), describe_flags(flags));
            println!("   {} {}", "Sign count:".dimmed(), counter);
        }
        None => println!(
            "   {} {} bytes (truncated)",
            "Authenticator data:".dimmed(),
            data.len().to_string().yellow()
        ),
    }
    Ok(())
}

fn print_registration(r: &EncodedRegistration) -> Result<()> {
    print_header(
        "Registration",
        &r.id,
        &r.raw_id,
        r.authenticator_attachment.as_deref(),
    )?;
    let response = &r.response;
    println!(
        "   {} {} ({})",
        "Algorithm:".dimmed(),
        response.public_key_algorithm,
        algorithm_name(response.public_key_algorithm)
    );
    let transports = if response.transports.is_empty() {
        "none".to_string()
    } else {
        response.transports.join(", ")
    };
    println!("   {} {}", "Transports:".dimmed(), transports);
    println!(
        "   {} {} bytes",
        "Attestation:".dimmed(),
        field(&response.attestation_object, "attestationObject")?.len()
    );
    println!(
        "   {} {} bytes",
        "Public key:".dimmed(),
        field(&response.public_key, "publicKey")?.len()
    );
    print_authenticator_data(&response.authenticator_data)?;
    print_client_data(&response.client_data_json)?;
    if !r.client_extension_results.is_empty() {
        println!(
            "   {} {}",
            "Extensions:".dimmed(),
            Value::Object(r.client_extension_results.clone())
        );
    }
    Ok(())
}

fn print_assertion(a: &EncodedAssertion) -> Result<()> {
    print_header(
        "Assertion",
        &a.id,
        &a.raw_id,
        a.authenticator_attachment.as_deref(),
    )?;
    let response = &a.response;
    println!(
        "   {} {} bytes",
        "Signature:".dimmed(),
        field(&response.signature, "signature")?.len()
    );
    let user_handle = field(&response.user_handle, "userHandle")?;
    if user_handle.is_empty() {
        println!("   {} {}", "User handle:".dimmed(), "none".yellow());
    } else {
        println!("   {} {}", "User handle:".dimmed(), hex::encode(&user_handle));
    }
    print_authenticator_data(&response.authenticator_data)?;
    print_client_data(&response.client_data_json)?;
    Ok(())
}
